// airtabletool/src/descriptor.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of table data: field name to arbitrary JSON value.
pub type Record = Map<String, Value>;

/// Key whose presence marks a field as holding attachment descriptors.
pub const FILENAME_KEY: &str = "filename";

/// Encoded form of one attachment file inside a table dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub filename: String,
    /// Base64 of the (optionally LZMA-compressed) body.
    pub data: String,
    pub compressed: bool,
    /// Lowercase hex MD5 of the uncompressed body.
    pub md5hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFile {
    pub filename: String,
    pub data: String,
}

/// Attachment entry in the shape the Airtable write API accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub url: String,
    pub filename: String,
}

impl From<AttachmentRef> for Value {
    fn from(attachment: AttachmentRef) -> Self {
        let mut map = Map::with_capacity(2);
        map.insert("url".to_string(), Value::String(attachment.url));
        map.insert("filename".to_string(), Value::String(attachment.filename));
        Value::Object(map)
    }
}
