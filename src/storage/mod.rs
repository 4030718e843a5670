// airtabletool/src/storage/mod.rs
pub(crate) mod s3;

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::errors::StorageError;

pub use s3::S3Sink;

/// Destination for restored attachment bodies.
///
/// Any object store or filesystem that can take a text write at a path and
/// hand back a URL Airtable can fetch from can act as a sink.
#[async_trait]
pub trait AttachmentSink: Send + Sync {
    /// Writes `contents` (UTF-8) at `path`, replacing anything already there.
    async fn write_text(&self, path: &str, contents: &str) -> Result<(), StorageError>;

    /// Returns a retrievable URL for an object previously written at `path`.
    async fn url(&self, path: &str) -> Result<String, StorageError>;
}

/// Sink backed by a local directory.
///
/// URLs are `file://` URLs unless a `base_url` is given, in which case the
/// object path is joined onto it (useful when the directory is served over HTTP).
#[derive(Debug, Clone)]
pub struct LocalSink {
    root: PathBuf,
    base_url: Option<Url>,
}

impl LocalSink {
    pub fn new(root: impl AsRef<Path>, base_url: Option<Url>) -> Result<Self, StorageError> {
        let root = std::path::absolute(root.as_ref())?;
        Ok(Self { root, base_url })
    }

    fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let is_plain = relative.components().next().is_some()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AttachmentSink for LocalSink {
    async fn write_text(&self, path: &str, contents: &str) -> Result<(), StorageError> {
        let full_path = self.full_path(path)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, contents.as_bytes()).await?;
        debug!(storage_path = %path, full_path = %full_path.display(), size = contents.len(), "local sink: write");
        Ok(())
    }

    async fn url(&self, path: &str) -> Result<String, StorageError> {
        let full_path = self.full_path(path)?;
        match &self.base_url {
            Some(base) => Ok(object_url(base, path)?.to_string()),
            None => Url::from_file_path(&full_path)
                .map(|url| url.to_string())
                .map_err(|()| StorageError::InvalidPath(full_path.display().to_string())),
        }
    }
}

/// Ensures a base URL ends in `/` so that joining appends instead of replacing
/// the last segment.
pub fn directory_url(raw: &str) -> Result<Url, StorageError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Appends an object key to a directory URL, percent-encoding each key
/// segment so characters like `#`, `?` or `:` stay part of the path.
pub fn object_url(base: &Url, key: &str) -> Result<Url, StorageError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| StorageError::InvalidPath(base.to_string()))?
        .pop_if_empty()
        .extend(key.split('/'));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_sink_writes_nested_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let sink = LocalSink::new(dir.path(), None)?;

        sink.write_text("attachments/abc", "hello").await?;
        let written = std::fs::read_to_string(dir.path().join("attachments/abc"))?;
        assert_eq!(written, "hello");

        let url = sink.url("attachments/abc").await?;
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/attachments/abc"));
        Ok(())
    }

    #[tokio::test]
    async fn test_local_sink_base_url() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let sink = LocalSink::new(dir.path(), Some(directory_url("https://files.example.com/restored")?))?;
        assert_eq!(
            sink.url("x/y.txt").await?,
            "https://files.example.com/restored/x/y.txt"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_local_sink_rejects_escaping_paths() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let sink = LocalSink::new(dir.path(), None)?;
        for bad in ["../outside", "/etc/passwd", "a/../../b", ""] {
            assert!(
                matches!(sink.write_text(bad, "x").await, Err(StorageError::InvalidPath(_))),
                "path {:?} should be rejected",
                bad
            );
        }
        Ok(())
    }

    #[test]
    fn test_object_url_encodes_key_segments() -> anyhow::Result<()> {
        let base = directory_url("https://files.example.com/restored")?;
        assert_eq!(
            object_url(&base, "a#b?c/mailto:x/1234")?.as_str(),
            "https://files.example.com/restored/a%23b%3Fc/mailto:x/1234"
        );
        assert!(matches!(
            object_url(&Url::parse("mailto:someone@example.com")?, "x"),
            Err(StorageError::InvalidPath(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_local_sink_url_matches_key_with_special_characters() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let sink = LocalSink::new(dir.path(), Some(directory_url("https://files.example.com")?))?;
        sink.write_text("q?1#frag/obj", "x").await?;
        assert_eq!(sink.url("q?1#frag/obj").await?, "https://files.example.com/q%3F1%23frag/obj");
        Ok(())
    }

    #[test]
    fn test_directory_url_appends_slash() -> anyhow::Result<()> {
        assert_eq!(directory_url("https://cdn.example.com/a")?.as_str(), "https://cdn.example.com/a/");
        assert_eq!(directory_url("https://cdn.example.com/a/")?.as_str(), "https://cdn.example.com/a/");
        Ok(())
    }
}
