use std::io::{self, Read, Write};
use std::path::Path;

use age::armor::{ArmoredReader, ArmoredWriter, Format};
use age::stream::StreamWriter;

use crate::core::errors::{Result, SealError};
use crate::core::traits::cipher::{CipherBackend, EnvelopeWriter};

/// Age encryption backend using X25519 + ChaCha20-Poly1305.
///
/// Key rings are text files with one `age1...` public key per line;
/// blank lines, `#` comments and inline `# label` suffixes are ignored.
/// Output is ASCII-armored so envelopes stay text-friendly.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgeBackend;

impl AgeBackend {
    pub fn new() -> Self {
        Self
    }

    /// Strip comments and inline labels from one key-ring line.
    fn key_from_line(line: &str) -> Option<&str> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }

        // "age1... # label"
        let key = match trimmed.split_once('#') {
            Some((k, _label)) => k.trim(),
            None => trimmed,
        };
        (!key.is_empty()).then_some(key)
    }
}

struct AgeEnvelope<'a> {
    stream: StreamWriter<ArmoredWriter<&'a mut Vec<u8>>>,
}

impl Write for AgeEnvelope<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl EnvelopeWriter for AgeEnvelope<'_> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let armored = self.stream.finish()?;
        armored.finish()?;
        Ok(())
    }
}

impl CipherBackend for AgeBackend {
    type Recipient = age::x25519::Recipient;

    fn name(&self) -> &str {
        "age"
    }

    fn marker_extension(&self) -> &str {
        "age"
    }

    fn parse_key_ring(
        &self,
        source: &Path,
        contents: &[u8],
    ) -> Result<Vec<age::x25519::Recipient>> {
        let text = std::str::from_utf8(contents).map_err(|e| SealError::KeyLoadFailure {
            path: source.to_path_buf(),
            detail: format!("not a text key ring: {e}"),
        })?;

        text.lines()
            .filter_map(Self::key_from_line)
            .map(|key| {
                key.parse::<age::x25519::Recipient>()
                    .map_err(|e: &str| SealError::KeyLoadFailure {
                        path: source.to_path_buf(),
                        detail: format!("invalid recipient key '{key}': {e}"),
                    })
            })
            .collect()
    }

    fn envelope_writer<'a>(
        &self,
        recipients: &'a [age::x25519::Recipient],
        sink: &'a mut Vec<u8>,
    ) -> io::Result<Box<dyn EnvelopeWriter + 'a>> {
        let encryptor =
            age::Encryptor::with_recipients(recipients.iter().map(|r| r as &dyn age::Recipient))
                .map_err(|e| io::Error::other(e.to_string()))?;

        let armored = ArmoredWriter::wrap_output(sink, Format::AsciiArmor)?;
        let stream = encryptor.wrap_output(armored)?;

        Ok(Box::new(AgeEnvelope { stream }))
    }

    fn decrypt(&self, identity: &Path, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let path_str = identity.to_string_lossy().to_string();
        let identity_file =
            age::IdentityFile::from_file(path_str).map_err(|e| SealError::DecryptionFailed {
                reason: format!(
                    "Failed to read identity file '{}': {e}",
                    identity.display()
                ),
            })?;
        let identities = identity_file
            .into_identities()
            .map_err(|_| SealError::DecryptionNoKey)?;

        let decryptor = age::Decryptor::new(ArmoredReader::new(ciphertext)).map_err(|e| {
            SealError::DecryptionFailed {
                reason: format!("Invalid encrypted file: {e}"),
            }
        })?;

        let mut reader = decryptor
            .decrypt(identities.iter().map(|i| i.as_ref() as &dyn age::Identity))
            .map_err(|e| match e {
                age::DecryptError::NoMatchingKeys => SealError::DecryptionNoKey,
                other => SealError::DecryptionFailed {
                    reason: format!("Invalid encrypted file: {other}"),
                },
            })?;

        let mut plaintext = Vec::new();
        reader
            .read_to_end(&mut plaintext)
            .map_err(|e| SealError::DecryptionFailed {
                reason: format!("Read decrypted data failed: {e}"),
            })?;

        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use age::secrecy::ExposeSecret;

    use crate::core::models::recipient_set::RecipientSet;
    use crate::core::services::encryption_engine::{DEFAULT_CHUNK_SIZE, EncryptionEngine};

    /// Write a fresh identity file and return (path, public key).
    fn generate_identity(dir: &Path, name: &str) -> (PathBuf, String) {
        let identity = age::x25519::Identity::generate();
        let public_key = identity.to_public().to_string();
        let path = dir.join(name);
        let contents = format!(
            "# public key: {public_key}\n{}\n",
            identity.to_string().expose_secret()
        );
        std::fs::write(&path, contents).unwrap();
        (path, public_key)
    }

    fn encrypt(keys: &[&str], plaintext: &[u8]) -> Vec<u8> {
        let ring = keys.join("\n");
        let recipients = AgeBackend
            .parse_key_ring(Path::new("ring.txt"), ring.as_bytes())
            .unwrap();
        let set = RecipientSet::new(recipients, Vec::new());
        EncryptionEngine::new(&AgeBackend, DEFAULT_CHUNK_SIZE)
            .encrypt(Path::new("test.env"), &set, plaintext)
            .unwrap()
            .as_bytes()
            .to_vec()
    }

    #[test]
    fn key_line_with_label() {
        assert_eq!(
            AgeBackend::key_from_line("age1abc123 # dev-team"),
            Some("age1abc123")
        );
    }

    #[test]
    fn key_line_skips_comments() {
        assert!(AgeBackend::key_from_line("# this is a comment").is_none());
        assert!(AgeBackend::key_from_line("").is_none());
        assert!(AgeBackend::key_from_line("  ").is_none());
    }

    #[test]
    fn parses_ring_with_comments() {
        let dir = tempfile::tempdir().unwrap();
        let (_, pub1) = generate_identity(dir.path(), "k1.txt");
        let (_, pub2) = generate_identity(dir.path(), "k2.txt");
        let ring = format!("# team\n{pub1} # dev1\n\n{pub2}\n");

        let parsed = AgeBackend
            .parse_key_ring(Path::new("ring.txt"), ring.as_bytes())
            .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].to_string(), pub1);
    }

    #[test]
    fn invalid_key_names_the_file() {
        let err = AgeBackend
            .parse_key_ring(Path::new("team.txt"), b"age1notakey\n")
            .unwrap_err();
        assert!(matches!(err, SealError::KeyLoadFailure { .. }));
        assert!(err.to_string().contains("team.txt"));
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (key_path, public_key) = generate_identity(dir.path(), "keys.txt");

        let plaintext = b"DATABASE_URL=postgres://localhost/mydb\nAPI_KEY=secret123";
        let ciphertext = encrypt(&[&public_key], plaintext);

        let armored_str = String::from_utf8_lossy(&ciphertext);
        assert!(armored_str.contains("BEGIN AGE ENCRYPTED FILE"));

        let decrypted = AgeBackend.decrypt(&key_path, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn encrypt_multiple_recipients() {
        let dir = tempfile::tempdir().unwrap();
        let (key1, pub1) = generate_identity(dir.path(), "key1.txt");
        let (key2, pub2) = generate_identity(dir.path(), "key2.txt");

        let plaintext = b"SHARED_SECRET=multi_recipient_test";
        let ciphertext = encrypt(&[&pub1, &pub2], plaintext);

        assert_eq!(AgeBackend.decrypt(&key1, &ciphertext).unwrap(), plaintext);
        assert_eq!(AgeBackend.decrypt(&key2, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn decrypt_wrong_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (_, pub1) = generate_identity(dir.path(), "key1.txt");
        let (key2, _) = generate_identity(dir.path(), "key2.txt");

        let ciphertext = encrypt(&[&pub1], b"secret");
        let err = AgeBackend.decrypt(&key2, &ciphertext).unwrap_err();
        assert!(matches!(err, SealError::DecryptionNoKey));
    }

    #[test]
    fn no_recipients_fails_setup() {
        let mut sink = Vec::new();
        assert!(AgeBackend.envelope_writer(&[], &mut sink).is_err());
    }
}
