use thiserror::Error;

/// Structurally invalid attachment data in a table dump.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Attachment descriptor has an unexpected shape: {0}")]
    Descriptor(#[from] serde_json::Error),

    #[error("Attachment data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Attachment data is not a valid LZMA stream: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("Failed to compress attachment data: {0}")]
    Compress(#[source] std::io::Error),

    #[error("Attachment body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Failures reported by an attachment sink.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AWS SDK S3 error: {0}")]
    S3Sdk(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("file: {filename} failed the data integrity check, and may be corrupted (expected md5 {expected}, got {actual})")]
    DataCorruption {
        filename: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, RestoreError>;
