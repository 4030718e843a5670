// airtabletool/src/restore/decode.rs
use base64::{engine::general_purpose::STANDARD, Engine};
use md5::{Digest, Md5};
use std::io::Read;
use xz2::read::XzDecoder;
use xz2::stream::{Stream, CONCATENATED};

use crate::descriptor::{DecodedFile, FileDescriptor};
use crate::errors::{DecodeError, RestoreError, Result};

/// Decodes one attachment descriptor from a backup dump.
///
/// Reverses base64 and, for compressed descriptors, LZMA (`.xz` or legacy
/// `.lzma`). With `check_integrity` the MD5 of the body must match the stored
/// hash, otherwise [`RestoreError::DataCorruption`] is returned.
///
/// # Arguments
/// * `descriptor` - The encoded file as stored in the dump.
/// * `check_integrity` - Whether to verify the body against `md5hash`.
pub fn decode_file(descriptor: &FileDescriptor, check_integrity: bool) -> Result<DecodedFile> {
    let filedata = decode_base64(&descriptor.data)?;
    let body = if descriptor.compressed {
        decompress(&filedata)?
    } else {
        filedata
    };

    if check_integrity {
        let actual = md5_hex(&body);
        if !actual.eq_ignore_ascii_case(descriptor.md5hash.trim()) {
            return Err(RestoreError::DataCorruption {
                filename: descriptor.filename.clone(),
                expected: descriptor.md5hash.clone(),
                actual,
            });
        }
    }

    let data = String::from_utf8(body).map_err(DecodeError::from)?;
    Ok(DecodedFile {
        filename: descriptor.filename.clone(),
        data,
    })
}

/// Hex MD5 digest, the hash format stored in dumps.
pub fn md5_hex(body: &[u8]) -> String {
    hex::encode(Md5::digest(body))
}

fn decode_base64(data: &str) -> std::result::Result<Vec<u8>, DecodeError> {
    // Tolerate line-wrapped base64.
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact.as_bytes())?)
}

fn decompress(compressed: &[u8]) -> std::result::Result<Vec<u8>, DecodeError> {
    let stream = Stream::new_auto_decoder(u64::MAX, CONCATENATED)
        .map_err(|e| DecodeError::Decompress(e.into()))?;
    let mut decoder = XzDecoder::new_stream(compressed, stream);
    let mut body = Vec::new();
    decoder
        .read_to_end(&mut body)
        .map_err(DecodeError::Decompress)?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::encode::encode_file;
    use std::io::Write;
    use xz2::stream::LzmaOptions;
    use xz2::write::XzEncoder;

    fn plain_descriptor(filename: &str, body: &[u8], md5hash: &str) -> FileDescriptor {
        FileDescriptor {
            filename: filename.to_string(),
            data: STANDARD.encode(body),
            compressed: false,
            md5hash: md5hash.to_string(),
        }
    }

    #[test]
    fn test_decode_hello() -> anyhow::Result<()> {
        let descriptor = plain_descriptor("a.txt", b"hello", "5d41402abc4b2a76b9719d911017c592");
        let decoded = decode_file(&descriptor, true)?;
        assert_eq!(
            decoded,
            DecodedFile {
                filename: "a.txt".to_string(),
                data: "hello".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn test_decode_compressed_xz() -> anyhow::Result<()> {
        let body = "line one\nline two\n".repeat(50);
        let mut encoder = XzEncoder::new(Vec::new(), 6);
        encoder.write_all(body.as_bytes())?;
        let compressed = encoder.finish()?;

        let descriptor = FileDescriptor {
            filename: "notes.txt".to_string(),
            data: STANDARD.encode(&compressed),
            compressed: true,
            md5hash: md5_hex(body.as_bytes()),
        };
        assert_eq!(decode_file(&descriptor, true)?.data, body);
        Ok(())
    }

    #[test]
    fn test_decode_concatenated_xz_streams() -> anyhow::Result<()> {
        let parts = ["first stream\n", "second stream\n"];
        let mut joined = Vec::new();
        for part in parts {
            let mut encoder = XzEncoder::new(Vec::new(), 6);
            encoder.write_all(part.as_bytes())?;
            joined.extend(encoder.finish()?);
        }

        let body = parts.concat();
        let descriptor = FileDescriptor {
            filename: "joined.txt".to_string(),
            data: STANDARD.encode(&joined),
            compressed: true,
            md5hash: md5_hex(body.as_bytes()),
        };
        assert_eq!(decode_file(&descriptor, true)?.data, "first stream\nsecond stream\n");
        Ok(())
    }

    #[test]
    fn test_decode_compressed_legacy_lzma() -> anyhow::Result<()> {
        let body = "legacy lzma_alone container";
        let stream = Stream::new_lzma_encoder(&LzmaOptions::new_preset(6)?)?;
        let mut encoder = XzEncoder::new_stream(Vec::new(), stream);
        encoder.write_all(body.as_bytes())?;
        let compressed = encoder.finish()?;

        let descriptor = FileDescriptor {
            filename: "old.txt".to_string(),
            data: STANDARD.encode(&compressed),
            compressed: true,
            md5hash: md5_hex(body.as_bytes()),
        };
        assert_eq!(decode_file(&descriptor, true)?.data, body);
        Ok(())
    }

    #[test]
    fn test_hash_mismatch_is_corruption() {
        let descriptor = plain_descriptor("a.txt", b"hello", "00000000000000000000000000000000");
        match decode_file(&descriptor, true) {
            Err(RestoreError::DataCorruption { filename, actual, .. }) => {
                assert_eq!(filename, "a.txt");
                assert_eq!(actual, "5d41402abc4b2a76b9719d911017c592");
            }
            other => panic!("expected DataCorruption, got {:?}", other),
        }
    }

    #[test]
    fn test_hash_mismatch_ignored_without_integrity_check() -> anyhow::Result<()> {
        let descriptor = plain_descriptor("a.txt", b"hello", "not-a-hash");
        assert_eq!(decode_file(&descriptor, false)?.data, "hello");
        Ok(())
    }

    #[test]
    fn test_uppercase_hash_accepted() -> anyhow::Result<()> {
        let descriptor = plain_descriptor("a.txt", b"hello", "5D41402ABC4B2A76B9719D911017C592");
        assert_eq!(decode_file(&descriptor, true)?.data, "hello");
        Ok(())
    }

    #[test]
    fn test_corruption_message_names_file() {
        let descriptor = plain_descriptor("report.csv", b"1,2,3", "deadbeef");
        let err = decode_file(&descriptor, true).unwrap_err();
        assert!(err.to_string().contains("file: report.csv failed the data integrity check"));
    }

    #[test]
    fn test_malformed_base64() {
        let descriptor = FileDescriptor {
            filename: "a.txt".to_string(),
            data: "not base64!!".to_string(),
            compressed: false,
            md5hash: String::new(),
        };
        assert!(matches!(
            decode_file(&descriptor, false),
            Err(RestoreError::Decode(DecodeError::Base64(_)))
        ));
    }

    #[test]
    fn test_line_wrapped_base64() -> anyhow::Result<()> {
        let descriptor = plain_descriptor("a.txt", b"hello", "5d41402abc4b2a76b9719d911017c592");
        let wrapped = FileDescriptor {
            data: format!("{}\n{}", &descriptor.data[..4], &descriptor.data[4..]),
            ..descriptor
        };
        assert_eq!(decode_file(&wrapped, true)?.data, "hello");
        Ok(())
    }

    #[test]
    fn test_malformed_compressed_stream() {
        let descriptor = FileDescriptor {
            filename: "a.txt".to_string(),
            data: STANDARD.encode([0xFFu8; 32]),
            compressed: true,
            md5hash: String::new(),
        };
        assert!(matches!(
            decode_file(&descriptor, false),
            Err(RestoreError::Decode(DecodeError::Decompress(_)))
        ));
    }

    #[test]
    fn test_invalid_utf8_body() {
        let body = [0xC3u8, 0x28];
        let descriptor = plain_descriptor("bin.dat", &body, &md5_hex(&body));
        assert!(matches!(
            decode_file(&descriptor, true),
            Err(RestoreError::Decode(DecodeError::Utf8(_)))
        ));
    }

    #[test]
    fn test_round_trip_through_encoder() -> anyhow::Result<()> {
        let text = "Grüße, Airtable ✓\n".repeat(20);
        for compress in [false, true] {
            let descriptor = encode_file("greeting.txt", text.as_bytes(), compress)?;
            let decoded = decode_file(&descriptor, true)?;
            assert_eq!(decoded.filename, "greeting.txt");
            assert_eq!(decoded.data, text);
        }
        Ok(())
    }
}
