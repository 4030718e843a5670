mod logic;
pub(crate) mod decode;
pub(crate) mod records;
pub(crate) mod verification;

use anyhow::{Context, Result};
use tracing::warn;

use crate::config::RestoreConfig;
pub use logic::{load_table_dump, RestoreSummary};
use verification::{verify_records, VerificationReport};

/// Public entry point for the restore process.
pub async fn run_restore_flow(restore_config: &RestoreConfig) -> Result<RestoreSummary> {
    logic::perform_restore_orchestration(restore_config).await
}

/// Checks every attachment in a dump without uploading anything.
pub fn run_verify_flow(restore_config: &RestoreConfig) -> Result<VerificationReport> {
    let records = load_table_dump(&restore_config.table_dump_path)
        .context("Failed to load table dump for verification")?;
    let report = verify_records(&records);
    for corrupted in &report.corrupted {
        warn!(
            record = corrupted.record_index,
            field = %corrupted.field,
            filename = corrupted.filename.as_deref().unwrap_or("<unknown>"),
            reason = %corrupted.reason,
            "attachment failed verification"
        );
    }
    Ok(report)
}
