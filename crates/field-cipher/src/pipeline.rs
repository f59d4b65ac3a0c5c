//! Line-delimited JSON filter: one note record in, one record out.
//!
//! For each non-blank input line the filter:
//! 1. Parses the line as a JSON value.
//! 2. Seals or opens the configured fields in place.
//! 3. Writes the record back as a single line.
//!
//! Lines that are not JSON are answered with an [`ErrorLine`] so output stays
//! aligned with input. In seal mode an encryption failure stops the run: a
//! record with unsealed fields is never written.

use common::protocol::{ErrorLine, Mode, RunSummary};
use common::ServiceError;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, warn};

use crate::crypto::{EncryptionError, FieldCipher};
use crate::notes::{open_fields, seal_fields, FieldPaths};

/// Run the filter until `reader` is exhausted.
///
/// # Errors
///
/// Returns [`ServiceError::EncryptionFailure`] on the first field that cannot be
/// sealed, [`ServiceError::Unavailable`] if there is no passphrase to seal with,
/// or [`ServiceError::Internal`] on I/O failure.
pub async fn run<R, W>(
    mode: Mode,
    cipher: &FieldCipher,
    paths: &FieldPaths,
    reader: R,
    mut writer: W,
) -> Result<RunSummary, ServiceError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut summary = RunSummary::default();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await.map_err(io_error)? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let out = match serde_json::from_str::<Value>(&line) {
            Ok(mut record) => {
                if let Err(e) = process(mode, cipher, paths, &mut record, &mut summary).await {
                    error!(line = line_no, error = %e, "aborting: field could not be sealed");
                    return Err(e);
                }
                summary.records += 1;
                debug!(line = line_no, "record processed");
                serde_json::to_string(&record)
            }
            Err(e) => {
                summary.invalid_lines += 1;
                let err = ServiceError::InvalidRecord(e.to_string());
                warn!(line = line_no, error = %err, "skipping invalid record");
                serde_json::to_string(&ErrorLine::new(err.code(), err.to_string(), line_no))
            }
        }
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

        writer.write_all(out.as_bytes()).await.map_err(io_error)?;
        writer.write_all(b"\n").await.map_err(io_error)?;
    }

    writer.flush().await.map_err(io_error)?;
    Ok(summary)
}

async fn process(
    mode: Mode,
    cipher: &FieldCipher,
    paths: &FieldPaths,
    record: &mut Value,
    summary: &mut RunSummary,
) -> Result<(), ServiceError> {
    match mode {
        Mode::Seal => {
            summary.fields_sealed += seal_fields(cipher, record, paths)
                .await
                .map_err(seal_error)?;
        }
        Mode::Open => {
            let report = open_fields(cipher, record, paths).await;
            summary.fields_recovered += report.recovered;
            summary.fields_passed_through += report.passed_through;
        }
    }
    Ok(())
}

fn seal_error(e: EncryptionError) -> ServiceError {
    match e {
        EncryptionError::NoPassphrase => ServiceError::Unavailable(e.to_string()),
        e => ServiceError::EncryptionFailure(e.to_string()),
    }
}

fn io_error(e: std::io::Error) -> ServiceError {
    ServiceError::Internal(format!("i/o error: {e}"))
}
