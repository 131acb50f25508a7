use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;

use age::secrecy::ExposeSecret;

/// Run sealdir inside `dir`, isolated from any user config.
fn sealdir(dir: &assert_fs::TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("sealdir");
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join(".config"))
        .env_remove("SEALDIR_JOBS")
        .env_remove("RUST_LOG");
    cmd
}

/// Generate an age identity; writes `<name>.pub` (recipient) and
/// `<name>.key` (identity) into `dir`.
fn generate_age_key(dir: &assert_fs::TempDir, name: &str) {
    let identity = age::x25519::Identity::generate();
    dir.child(format!("{name}.pub"))
        .write_str(&format!("{} # {name}\n", identity.to_public()))
        .unwrap();
    dir.child(format!("{name}.key"))
        .write_str(&format!("{}\n", identity.to_string().expose_secret()))
        .unwrap();
}

fn sample_tree(dir: &assert_fs::TempDir) {
    dir.child("src/a.txt").write_str("hi").unwrap();
    dir.child("src/sub/b.txt").write_str("bye").unwrap();
}

fn encrypt(dir: &assert_fs::TempDir) -> assert_cmd::assert::Assert {
    sealdir(dir)
        .args(["--cipher", "age", "encrypt", "--source", "src", "--target", "out"])
        .args(["--key", "alice.pub", "--key", "bob.pub"])
        .assert()
}

fn encrypt_json(dir: &assert_fs::TempDir) -> serde_json::Value {
    let output = sealdir(dir)
        .args(["--cipher", "age", "encrypt", "--source", "src", "--target", "out"])
        .args(["--key", "alice.pub", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

fn statuses(report: &serde_json::Value) -> Vec<(String, String)> {
    let mut all: Vec<_> = report["outcomes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| {
            let source = o["source"].as_str().unwrap().replace('\\', "/");
            (source, o["status"].as_str().unwrap().to_string())
        })
        .collect();
    all.sort();
    all
}

#[test]
fn age_backend_round_trip() {
    let dir = assert_fs::TempDir::new().unwrap();
    generate_age_key(&dir, "alice");
    generate_age_key(&dir, "bob");
    sample_tree(&dir);

    encrypt(&dir).success();
    dir.child("out/a.age")
        .assert(predicate::str::contains("BEGIN AGE ENCRYPTED FILE"));
    dir.child("out/sub/b.age").assert(predicate::path::exists());

    sealdir(&dir)
        .args(["--cipher", "age", "decrypt", "--key", "bob.key"])
        .args(["--file", "out/sub/b.age", "--target", "plain"])
        .assert()
        .success();
    dir.child("plain/decrypted").assert("bye");
}

#[test]
fn rerun_skips_existing_targets() {
    let dir = assert_fs::TempDir::new().unwrap();
    generate_age_key(&dir, "alice");
    generate_age_key(&dir, "bob");
    sample_tree(&dir);

    encrypt(&dir).success();
    let first = std::fs::read(dir.child("out/a.age").path()).unwrap();

    encrypt(&dir)
        .success()
        .stdout(predicate::str::contains("0 written"))
        .stdout(predicate::str::contains("2 skipped"));

    let second = std::fs::read(dir.child("out/a.age").path()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn rerun_fills_in_deleted_target() {
    let dir = assert_fs::TempDir::new().unwrap();
    generate_age_key(&dir, "alice");
    sample_tree(&dir);

    encrypt_json(&dir);
    std::fs::remove_file(dir.child("out/sub/b.age").path()).unwrap();

    let report = encrypt_json(&dir);
    assert_eq!(
        statuses(&report),
        [
            ("src/a.txt".to_string(), "skipped_existing".to_string()),
            ("src/sub/b.txt".to_string(), "written".to_string()),
        ]
    );
    dir.child("out/sub/b.age").assert(predicate::path::exists());
}

#[test]
fn json_report_describes_the_batch() {
    let dir = assert_fs::TempDir::new().unwrap();
    generate_age_key(&dir, "alice");
    sample_tree(&dir);

    let report = encrypt_json(&dir);
    assert_eq!(report["cipher"], "age");
    assert!(report["started_at"].is_string());
    assert!(report["finished_at"].is_string());
    assert_eq!(
        statuses(&report),
        [
            ("src/a.txt".to_string(), "written".to_string()),
            ("src/sub/b.txt".to_string(), "written".to_string()),
        ]
    );
    for outcome in report["outcomes"].as_array().unwrap() {
        assert!(outcome["bytes"].as_u64().unwrap() > 0);
    }
}

#[test]
fn existing_encrypted_files_in_source_are_ignored() {
    let dir = assert_fs::TempDir::new().unwrap();
    generate_age_key(&dir, "alice");
    sample_tree(&dir);
    dir.child("src/old.age").write_str("already sealed").unwrap();

    let report = encrypt_json(&dir);
    assert_eq!(report["outcomes"].as_array().unwrap().len(), 2);
    dir.child("out/old.age").assert(predicate::path::missing());
}

#[test]
fn failed_file_makes_the_run_fail_but_others_finish() {
    let dir = assert_fs::TempDir::new().unwrap();
    generate_age_key(&dir, "alice");
    sample_tree(&dir);
    // notes.md and notes.txt both map to out/notes.age; the second loses.
    dir.child("src/notes.md").write_str("md").unwrap();
    dir.child("src/notes.txt").write_str("txt").unwrap();

    sealdir(&dir)
        .args(["--cipher", "age", "encrypt", "--source", "src", "--target", "out"])
        .args(["--key", "alice.pub"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("notes.txt"))
        .stderr(predicate::str::contains("1 of 4 file(s) could not be encrypted"));

    dir.child("out/a.age").assert(predicate::path::exists());
    dir.child("out/sub/b.age").assert(predicate::path::exists());
    dir.child("out/notes.age").assert(predicate::path::exists());
}

#[test]
fn config_file_supplies_cipher_and_keys() {
    let dir = assert_fs::TempDir::new().unwrap();
    generate_age_key(&dir, "alice");
    sample_tree(&dir);
    dir.child("sealdir.toml")
        .write_str(
            "[sealdir]\ncipher = \"age\"\nconcurrency = 2\n\n[keys]\nrecipients = [\"alice.pub\"]\n",
        )
        .unwrap();

    sealdir(&dir)
        .args(["encrypt", "--source", "src", "--target", "out"])
        .assert()
        .success();
    dir.child("out/a.age").assert(predicate::path::exists());
}

#[test]
fn invalid_config_is_reported() {
    let dir = assert_fs::TempDir::new().unwrap();
    sample_tree(&dir);
    dir.child("custom.toml")
        .write_str("[sealdir]\nchunk_size = 0\n")
        .unwrap();

    sealdir(&dir)
        .args(["--config", "custom.toml", "encrypt", "--source", "src", "--target", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk_size"));
}

#[test]
fn zero_jobs_is_rejected() {
    let dir = assert_fs::TempDir::new().unwrap();
    generate_age_key(&dir, "alice");
    sample_tree(&dir);

    sealdir(&dir)
        .args(["--cipher", "age", "encrypt", "--source", "src", "--target", "out"])
        .args(["--key", "alice.pub"])
        .env("SEALDIR_JOBS", "0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--jobs"));
}

#[test]
fn quiet_mode_prints_nothing_on_success() {
    let dir = assert_fs::TempDir::new().unwrap();
    generate_age_key(&dir, "alice");
    sample_tree(&dir);

    sealdir(&dir)
        .args(["-q", "--cipher", "age", "encrypt", "--source", "src", "--target", "out"])
        .args(["--key", "alice.pub"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn unknown_cipher_is_rejected() {
    let dir = assert_fs::TempDir::new().unwrap();
    sample_tree(&dir);

    sealdir(&dir)
        .args(["--cipher", "rot13", "encrypt", "--source", "src", "--target", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rot13"));
}
