mod adapters;
mod cli;
mod config;
mod core;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::commands::encrypt::EncryptArgs;
use cli::{Cli, Commands};
use config::app_config::AppConfig;

fn main() {
    let args = Cli::parse();

    init_tracing(args.verbose);
    cli::output::set_quiet(args.quiet);

    let result = AppConfig::load(args.config.as_deref()).and_then(|config| {
        let cipher = args.cipher.as_deref();
        match &args.command {
            Commands::Encrypt {
                source,
                target,
                keys,
                jobs,
                json,
            } => cli::commands::encrypt::execute(
                &config,
                cipher,
                &EncryptArgs {
                    source,
                    target,
                    keys,
                    jobs: *jobs,
                    json: *json,
                },
            ),
            Commands::Decrypt {
                key,
                file,
                target,
                name,
            } => cli::commands::decrypt::execute(&config, cipher, key, file, target, name),
        }
    });

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "sealdir=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
