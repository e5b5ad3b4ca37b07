//! Content-addressed image cache inside the notes vault.
//!
//! Images are stored once under `Cache/<sha256>.<ext>`; identical bytes
//! always resolve to the same file and an existing file is never rewritten.

use super::file_ops;
use crate::channels::gateway::ChatGateway;
use crate::config::defaults;
use crate::error::CaptureError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Image extensions recognised from a source path
const ALLOWED_EXTENSIONS: &[&str] = &["png", "svg", "jpg", "jpeg", "gif", "webp"];

pub struct ImageCache {
    notes_dir: PathBuf,
    cache_dir: PathBuf,
    fetch_timeout: Duration,
}

impl ImageCache {
    pub fn new(notes_dir: PathBuf, fetch_timeout: Duration) -> Self {
        let cache_dir = notes_dir.join(defaults::CACHE_DIR);
        Self {
            notes_dir,
            cache_dir,
            fetch_timeout,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Store image bytes and return their vault-relative path.
    ///
    /// `source_hint` is the original resource path, used only for the extension.
    pub fn store(&self, bytes: &[u8], source_hint: Option<&str>) -> Result<String, CaptureError> {
        let digest = hex::encode(Sha256::digest(bytes));
        let ext = extension_for(source_hint);
        let path = self.cache_dir.join(format!("{}.{}", digest, ext));
        let rel = file_ops::relative_path(&self.notes_dir, &path)
            .unwrap_or_else(|| format!("{}/{}.{}", defaults::CACHE_DIR, digest, ext));

        if path.exists() {
            log::debug!("[IMAGE_CACHE] Hit for {}", rel);
            return Ok(rel);
        }

        std::fs::create_dir_all(&self.cache_dir)
            .map_err(|e| CaptureError::persist(&self.cache_dir, e))?;
        // Racing writers of the same digest hold identical bytes, so either rename wins.
        file_ops::atomic_write(&path, bytes).map_err(|e| CaptureError::persist(&path, e))?;

        log::info!("[IMAGE_CACHE] Stored {} ({} bytes)", rel, bytes.len());
        Ok(rel)
    }

    /// Download an attachment through the gateway and store it.
    ///
    /// The download is bounded by the configured timeout; expiry is a fetch error.
    pub async fn fetch_and_store(
        &self,
        gateway: &dyn ChatGateway,
        locator: &str,
    ) -> Result<String, CaptureError> {
        let fetched = match tokio::time::timeout(self.fetch_timeout, gateway.fetch_file(locator)).await {
            Ok(Ok(file)) => file,
            Ok(Err(e)) => return Err(CaptureError::Fetch(e.to_string())),
            Err(_) => {
                return Err(CaptureError::Fetch(format!(
                    "timed out after {}s fetching {}",
                    self.fetch_timeout.as_secs_f32(),
                    locator
                )));
            }
        };

        self.store(&fetched.bytes, fetched.source_path.as_deref())
    }
}

/// Lower-cased image extension of `source`, or the default
fn extension_for(source: Option<&str>) -> String {
    source
        .and_then(|s| Path::new(s).extension())
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or_else(|| defaults::IMAGE_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::mock::MockGateway;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn cache_in(dir: &Path) -> ImageCache {
        ImageCache::new(dir.to_path_buf(), Duration::from_secs(5))
    }

    #[test]
    fn test_store_is_content_addressed() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());

        let rel = cache.store(b"jpeg bytes", None).unwrap();
        let digest = hex::encode(Sha256::digest(b"jpeg bytes"));
        assert_eq!(rel, format!("Cache/{}.jpg", digest));
        assert_eq!(fs::read(dir.path().join(&rel)).unwrap(), b"jpeg bytes");

        let other = cache.store(b"other bytes", None).unwrap();
        assert_ne!(rel, other);
    }

    #[test]
    fn test_store_is_write_once() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());

        let first = cache.store(b"photo", None).unwrap();
        // Tamper with the stored file; a second store must not rewrite it
        fs::write(dir.path().join(&first), b"tampered").unwrap();
        let second = cache.store(b"photo", None).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(dir.path().join(&second)).unwrap(), b"tampered");
        assert_eq!(fs::read_dir(cache.cache_dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_extension_from_source() {
        assert_eq!(extension_for(Some("photos/file_12.PNG")), "png");
        assert_eq!(extension_for(Some("photos/file_12.webp")), "webp");
        assert_eq!(extension_for(Some("photos/file_12")), "jpg");
        assert_eq!(extension_for(Some("docs/report.exe")), "jpg");
        assert_eq!(extension_for(None), "jpg");
    }

    #[test]
    fn test_concurrent_store_same_bytes() {
        let dir = tempdir().unwrap();
        let cache = Arc::new(cache_in(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.store(b"same image", None).unwrap())
            })
            .collect();
        let paths: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(paths.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(fs::read(dir.path().join(&paths[0])).unwrap(), b"same image");
        assert_eq!(fs::read_dir(cache.cache_dir()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_and_store() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        let gateway = MockGateway::new();
        gateway.add_file("file-1", b"png bytes", Some("photos/file_1.png"));

        let rel = cache.fetch_and_store(&gateway, "file-1").await.unwrap();
        assert!(rel.starts_with("Cache/"));
        assert!(rel.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fetch_error() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        let gateway = MockGateway::new();

        let err = cache.fetch_and_store(&gateway, "missing").await.unwrap_err();
        assert!(matches!(err, CaptureError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_fetch_error() {
        let dir = tempdir().unwrap();
        let cache = ImageCache::new(dir.path().to_path_buf(), Duration::from_millis(20));
        let gateway = MockGateway::new().with_fetch_delay(Duration::from_millis(500));
        gateway.add_file("slow", b"bytes", None);

        let err = cache.fetch_and_store(&gateway, "slow").await.unwrap_err();
        assert!(matches!(err, CaptureError::Fetch(ref msg) if msg.contains("timed out")));
        assert!(!cache.cache_dir().exists());
    }
}
