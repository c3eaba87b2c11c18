use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use pwdfile::{Outcome, Verifier, VerifyOptions, bigcrypt};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit code for "service unavailable" conditions, kept apart from plain
/// authentication failure (1).
const EXIT_UNAVAILABLE: u8 = 2;

const FAIL_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "pwdfile")]
#[command(
    version,
    about = "Checks passphrases against a flat username:hash credential file."
)]
struct Cli {
    /// Path to the credential file
    #[arg(long, global = true, value_name = "PATH", env = "PWDFILE_PATH")]
    pwdfile: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Verifies a user's passphrase against the credential file
    #[command(arg_required_else_help = true)]
    Check {
        user: String,

        /// Take a shared advisory lock on the credential file
        #[arg(long)]
        flock: bool,

        /// Disable the bigcrypt / broken-MD5 compatibility retries
        #[arg(long = "no-legacy-crypt")]
        no_legacy_crypt: bool,

        /// Skip the delay after a failed attempt
        #[arg(long)]
        nodelay: bool,

        /// Reject users whose stored hash field is empty
        #[arg(long = "disallow-empty")]
        disallow_empty: bool,
    },

    /// Prints a credential-file hash for a passphrase
    #[command(arg_required_else_help = true)]
    Hash {
        /// Salt: 2 characters for crypt/bigcrypt, up to 8 for MD5-crypt
        #[arg(long, value_name = "SALT")]
        salt: String,

        /// Produce an MD5-crypt hash instead of crypt/bigcrypt
        #[arg(long)]
        md5: bool,
    },
}

fn main() -> ExitCode {
    let args = Cli::parse();
    init_tracing(args.debug);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("pwdfile: {e:#}");
            ExitCode::from(EXIT_UNAVAILABLE)
        }
    }
}

fn run(args: Cli) -> Result<ExitCode> {
    match args.command {
        Commands::Check {
            user,
            flock,
            no_legacy_crypt,
            nodelay,
            disallow_empty,
        } => {
            let Some(path) = args.pwdfile else {
                bail!("credential file not specified (--pwdfile or PWDFILE_PATH)");
            };
            let passphrase = auth::read_passphrase()?;

            let options = VerifyOptions {
                use_file_locking: flock,
                legacy_compatibility: !no_legacy_crypt,
                disallow_empty_credential: disallow_empty,
            };
            let outcome = Verifier::with_options(path, options).verify(&user, &passphrase)?;

            match outcome {
                Outcome::Success => {
                    println!("access granted for '{user}'");
                    Ok(ExitCode::SUCCESS)
                }
                // the two failure shapes stay collapsed on the outside so a
                // caller cannot probe for account existence
                Outcome::WrongCredential | Outcome::UserNotFound => {
                    debug!(?outcome, "authentication failed");
                    if !nodelay {
                        thread::sleep(FAIL_DELAY);
                    }
                    eprintln!("authentication failure for '{user}'");
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::Hash { salt, md5 } => {
            let passphrase = auth::read_passphrase()?;
            let hash = if md5 {
                #[allow(deprecated)]
                let hash = pwhash::md5_crypt::hash_with(
                    pwhash::HashSetup {
                        salt: Some(&salt),
                        rounds: None,
                    },
                    passphrase.as_str(),
                )
                .context("failed to compute MD5-crypt hash")?;
                hash
            } else {
                bigcrypt(&passphrase, &salt).context("failed to compute bigcrypt hash")?
            };
            println!("{hash}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "pwdfile=debug" } else { "pwdfile=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
