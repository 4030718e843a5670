// airtabletool/src/backup/encode.rs
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::io::Write;
use std::path::Path;
use xz2::write::XzEncoder;

use crate::descriptor::FileDescriptor;
use crate::errors::DecodeError;
use crate::restore::decode::md5_hex;

const XZ_PRESET: u32 = 6;

/// Encodes raw attachment bytes into a dump descriptor.
///
/// The stored hash is taken over the uncompressed body so that restore can
/// verify what it hands back, independent of the compression setting.
pub fn encode_file(
    filename: &str,
    body: &[u8],
    compress: bool,
) -> std::result::Result<FileDescriptor, DecodeError> {
    let payload = if compress {
        let mut encoder = XzEncoder::new(Vec::new(), XZ_PRESET);
        encoder.write_all(body).map_err(DecodeError::Compress)?;
        encoder.finish().map_err(DecodeError::Compress)?
    } else {
        body.to_vec()
    };

    Ok(FileDescriptor {
        filename: filename.to_string(),
        data: STANDARD.encode(payload),
        compressed: compress,
        md5hash: md5_hex(body),
    })
}

/// Reads a file from disk and encodes it under its own file name.
pub fn encode_path(path: &Path, compress: bool) -> Result<FileDescriptor> {
    let filename = path
        .file_name()
        .with_context(|| format!("Path has no file name: {}", path.display()))?
        .to_string_lossy()
        .to_string();
    let body = std::fs::read(path)
        .with_context(|| format!("Failed to read attachment file: {}", path.display()))?;
    encode_file(&filename, &body, compress)
        .with_context(|| format!("Failed to encode attachment file: {}", path.display()))
}
