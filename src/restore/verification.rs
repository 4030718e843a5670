// airtabletool/src/restore/verification.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

use super::decode::decode_file;
use crate::descriptor::{FileDescriptor, Record, FILENAME_KEY};
use crate::utils::contains_key;

/// An attachment that could not be restored intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorruptedAttachment {
    pub record_index: usize,
    pub field: String,
    /// `None` when the descriptor itself could not be parsed.
    pub filename: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub records: usize,
    pub attachments: usize,
    pub corrupted: Vec<CorruptedAttachment>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.corrupted.is_empty()
    }

    /// Writes the report as pretty-printed JSON followed by a newline.
    pub fn write_json<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)
    }
}

/// Decodes every attachment in a dump with integrity checking and collects
/// the failures, so a single run reports every damaged file.
///
/// Nothing is uploaded; this is the dry run of a restore.
pub fn verify_records<'a, I>(records: I) -> VerificationReport
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut report = VerificationReport::default();

    for (record_index, record) in records.into_iter().enumerate() {
        report.records += 1;
        for (field, value) in record {
            if !contains_key(value, FILENAME_KEY) {
                continue;
            }
            let Value::Array(items) = value else {
                // Restore rejects the whole field, so it counts as one attachment.
                report.attachments += 1;
                report.corrupted.push(CorruptedAttachment {
                    record_index,
                    field: field.clone(),
                    filename: value
                        .get(FILENAME_KEY)
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    reason: "Malformed attachment field: expected a list of descriptors".to_string(),
                });
                continue;
            };
            for item in items {
                report.attachments += 1;
                let descriptor = match FileDescriptor::deserialize(item) {
                    Ok(descriptor) => descriptor,
                    Err(e) => {
                        report.corrupted.push(CorruptedAttachment {
                            record_index,
                            field: field.clone(),
                            filename: item
                                .get(FILENAME_KEY)
                                .and_then(Value::as_str)
                                .map(str::to_string),
                            reason: format!("Malformed descriptor: {}", e),
                        });
                        continue;
                    }
                };
                if let Err(e) = decode_file(&descriptor, true) {
                    report.corrupted.push(CorruptedAttachment {
                        record_index,
                        field: field.clone(),
                        filename: Some(descriptor.filename.clone()),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    report
}
