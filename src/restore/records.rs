// airtabletool/src/restore/records.rs
use futures::stream::{self, Stream};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::decode::decode_file;
use crate::descriptor::{AttachmentRef, FileDescriptor, Record, FILENAME_KEY};
use crate::errors::{DecodeError, Result};
use crate::storage::AttachmentSink;
use crate::utils::contains_key;

/// How attachment fields are materialized during restore.
#[derive(Clone, Copy)]
pub struct RestoreOptions<'a> {
    /// Where decoded attachments are uploaded. Without a sink, attachment
    /// fields cannot be relinked and are left out of the output.
    pub storage: Option<&'a dyn AttachmentSink>,
    pub check_integrity: bool,
    /// Prepended verbatim to each generated object name; include a trailing
    /// `/` to place objects in a folder.
    pub prefix: &'a str,
}

impl Default for RestoreOptions<'_> {
    fn default() -> Self {
        Self {
            storage: None,
            check_integrity: true,
            prefix: "",
        }
    }
}

/// Lazily prepares table records for insertion into Airtable.
///
/// Each record is decoded, uploaded and yielded before the next one is pulled
/// from `records`, so dropping the stream stops all further work. Errors are
/// yielded on the step that hit them; uploads already made are not rolled back.
pub fn prepare_records<'a, I>(
    records: I,
    options: RestoreOptions<'a>,
) -> impl Stream<Item = Result<Record>> + 'a
where
    I: IntoIterator<Item = Record>,
    I::IntoIter: 'a,
{
    stream::unfold(records.into_iter(), move |mut records| async move {
        let record = records.next()?;
        Some((prepare_record(record, options).await, records))
    })
}

/// Rewrites one record's attachment fields as `{url, filename}` lists.
///
/// Fields that hold no `filename` key at any depth are copied unchanged.
pub async fn prepare_record(record: Record, options: RestoreOptions<'_>) -> Result<Record> {
    let mut prepared = Record::with_capacity(record.len());
    for (field, value) in record {
        if !contains_key(&value, FILENAME_KEY) {
            prepared.insert(field, value);
            continue;
        }

        let Some(storage) = options.storage else {
            debug!(field = %field, "no attachment storage configured, dropping field");
            continue;
        };

        // Descriptors are parsed one at a time so that uploads made before a
        // malformed entry stay in place.
        let items: Vec<Value> = serde_json::from_value(value).map_err(DecodeError::from)?;
        let mut attachments = Vec::with_capacity(items.len());
        for item in items {
            let descriptor: FileDescriptor =
                serde_json::from_value(item).map_err(DecodeError::from)?;
            let filedata = decode_file(&descriptor, options.check_integrity)?;
            let path = format!("{}{}", options.prefix, Uuid::new_v4());
            storage.write_text(&path, &filedata.data).await?;
            let url = storage.url(&path).await?;
            debug!(field = %field, filename = %filedata.filename, path = %path, "uploaded attachment");
            attachments.push(Value::from(AttachmentRef {
                url,
                filename: filedata.filename,
            }));
        }
        prepared.insert(field, Value::Array(attachments));
    }
    Ok(prepared)
}
