//! `seccookie`: seal and open envelopes from the command line.
//!
//! Startup sequence for `seal` and `open`:
//! 1. Load and validate [`Config`](config::Config) from environment variables.
//! 2. Initialise structured JSON logging on stderr.
//! 3. Build the codec and run the command over stdin/stdout.
//!
//! `keygen` needs no configuration. `open` exits with status 2 when the
//! envelope is rejected.

mod commands;
mod config;
mod telemetry;

use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use seccookie::SecCookieCodec;
use tracing::info;

/// Exit status for an envelope that failed to open. Setup errors exit with 1.
const REJECTED_EXIT_CODE: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "seccookie", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read raw bytes from stdin and print a URL-safe envelope.
    Seal,
    /// Read an envelope from stdin and write the plaintext to stdout.
    Open,
    /// Print a new random key, standard base64.
    Keygen {
        /// Key size in bytes: 16, 24 or 32.
        #[arg(long, default_value_t = 16, value_parser = commands::parse_key_size)]
        bytes: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Keygen { bytes } => {
            println!("{}", commands::keygen(bytes));
        }
        Command::Seal => {
            let codec = setup()?;
            let mut input = Vec::new();
            io::stdin()
                .read_to_end(&mut input)
                .context("failed to read stdin")?;
            println!("{}", commands::seal(&codec, &input)?);
        }
        Command::Open => {
            let codec = setup()?;
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
            let plaintext = match commands::open(&codec, &input) {
                Ok(plaintext) => plaintext,
                Err(e) if commands::is_rejection(&e) => {
                    eprintln!("ERROR: {e:#}");
                    std::process::exit(REJECTED_EXIT_CODE);
                }
                Err(e) => return Err(e),
            };
            let mut out = io::stdout().lock();
            out.write_all(&plaintext).context("failed to write stdout")?;
            out.flush().context("failed to write stdout")?;
        }
    }
    Ok(())
}

fn setup() -> Result<SecCookieCodec<Vec<u8>>> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::from_env().map_err(|e| {
        eprintln!("ERROR: seccookie configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;

    // -----------------------------------------------------------------------
    // 3. Codec
    // -----------------------------------------------------------------------
    let codec = commands::build_codec(&cfg)?;
    info!(
        algorithm = %cfg.algorithm,
        tag_length_bits = cfg.tag_length_bits,
        min_envelope_len = codec.min_envelope_len(),
        "codec ready"
    );
    Ok(codec)
}
