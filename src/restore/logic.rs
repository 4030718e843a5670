// airtabletool/src/restore/logic.rs
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use futures::StreamExt;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

use super::records::{prepare_records, RestoreOptions};
use crate::config::{RestoreConfig, StorageConfig};
use crate::descriptor::Record;
use crate::storage::{directory_url, AttachmentSink, LocalSink, S3Sink};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub records: usize,
}

/// Reads a table dump: either a JSON array of records or JSON Lines.
/// Files ending in `.gz` are decompressed on the fly.
pub fn load_table_dump(dump_path: &Path) -> Result<Vec<Record>> {
    let file = File::open(dump_path)
        .with_context(|| format!("Failed to open table dump: {}", dump_path.display()))?;
    let mut reader: Box<dyn Read> = if dump_path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .with_context(|| format!("Failed to read table dump: {}", dump_path.display()))?;

    parse_table_dump(&content)
        .with_context(|| format!("Failed to parse table dump: {}", dump_path.display()))
}

fn parse_table_dump(content: &str) -> Result<Vec<Record>> {
    if content.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(content)?);
    }
    serde_json::Deserializer::from_str(content)
        .into_iter::<Record>()
        .enumerate()
        .map(|(index, record)| record.with_context(|| format!("Invalid record #{}", index + 1)))
        .collect()
}

/// Builds the attachment sink described by the storage configuration.
pub async fn build_sink(storage: &StorageConfig) -> Result<Box<dyn AttachmentSink>> {
    match storage {
        StorageConfig::S3(spaces_config) => {
            info!(
                bucket = %spaces_config.bucket_name,
                endpoint = spaces_config.endpoint_url.as_deref().unwrap_or("aws"),
                "using S3 attachment storage"
            );
            let sink = S3Sink::connect(spaces_config)
                .await
                .context("Failed to configure S3 attachment storage")?;
            Ok(Box::new(sink))
        }
        StorageConfig::Local(local_config) => {
            info!(root = %local_config.root_dir.display(), "using local attachment storage");
            let base_url = local_config
                .base_url
                .as_deref()
                .map(directory_url)
                .transpose()
                .context("Invalid local_storage.base_url")?;
            let sink = LocalSink::new(&local_config.root_dir, base_url)
                .context("Failed to configure local attachment storage")?;
            Ok(Box::new(sink))
        }
    }
}

/// Restores one table dump: prepares every record and writes the results as
/// JSON Lines to the configured output (stdout when none is set).
pub async fn perform_restore_orchestration(restore_config: &RestoreConfig) -> Result<RestoreSummary> {
    let records = load_table_dump(&restore_config.table_dump_path)?;
    info!(
        records = records.len(),
        dump = %restore_config.table_dump_path.display(),
        "loaded table dump"
    );

    let sink = match &restore_config.storage {
        Some(storage) => Some(build_sink(storage).await?),
        None => {
            info!("no attachment storage configured; attachment fields will be omitted");
            None
        }
    };

    let writer: Box<dyn Write> = match &restore_config.output_path {
        Some(output_path) => {
            if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
            Box::new(File::create(output_path).with_context(|| {
                format!("Failed to create output file: {}", output_path.display())
            })?)
        }
        None => Box::new(io::stdout().lock()),
    };

    let options = RestoreOptions {
        storage: sink.as_deref(),
        check_integrity: restore_config.check_integrity,
        prefix: &restore_config.prefix,
    };
    let summary = write_prepared_records(records, options, writer).await?;

    info!(records = summary.records, "restore finished");
    Ok(summary)
}

async fn write_prepared_records(
    records: Vec<Record>,
    options: RestoreOptions<'_>,
    writer: impl Write,
) -> Result<RestoreSummary> {
    let mut writer = BufWriter::new(writer);
    let mut summary = RestoreSummary::default();

    let mut prepared = std::pin::pin!(prepare_records(records, options));
    while let Some(record) = prepared.next().await {
        let record = record.with_context(|| format!("Failed to restore record #{}", summary.records + 1))?;
        serde_json::to_writer(&mut writer, &record).context("Failed to serialize restored record")?;
        writer.write_all(b"\n").context("Failed to write restored record")?;
        summary.records += 1;
    }
    writer.flush().context("Failed to flush restored records")?;

    Ok(summary)
}
