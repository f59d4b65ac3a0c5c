//! `notes-cipher`: seal or open note records on stdin, one JSON object per line.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured JSON logging on stderr.
//! 3. Build the [`field_cipher::FieldCipher`] from the configured passphrase and KDF parameters.
//! 4. Stream stdin through the filter to stdout.

use anyhow::Result;
use tokio::io::{self, BufReader};
use tracing::{error, info};

use field_cipher::config::Config;
use field_cipher::{pipeline, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    let mode = cfg.mode()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = ?mode,
        kdf_iterations = cfg.kdf_iterations,
        key_cache = cfg.key_cache,
        "notes-cipher starting"
    );

    // -----------------------------------------------------------------------
    // 3. Cipher
    // -----------------------------------------------------------------------
    let cipher = cfg.build_cipher()?;
    let paths = cfg.field_paths()?;

    // -----------------------------------------------------------------------
    // 4. Filter
    // -----------------------------------------------------------------------
    let stdin = BufReader::new(io::stdin());
    match pipeline::run(mode, &cipher, &paths, stdin, io::stdout()).await {
        Ok(summary) => {
            info!(
                records = summary.records,
                fields_sealed = summary.fields_sealed,
                fields_recovered = summary.fields_recovered,
                fields_passed_through = summary.fields_passed_through,
                invalid_lines = summary.invalid_lines,
                "notes-cipher finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, code = e.code(), "notes-cipher aborted");
            std::process::exit(e.exit_code());
        }
    }
}
