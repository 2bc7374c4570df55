//! Filesystem-backed store for downloaded assets.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::domain::entities::CacheKey;
use crate::domain::errors::{CacheError, CacheResult};

use super::extension::KNOWN_EXTENSIONS;

/// Durable storage mapping a cache key to bytes under a single root.
///
/// Files are named `<key><extension>`. Keys are trusted: whoever assigns them
/// must keep them free of path separators.
#[derive(Debug)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    /// Opens the store, creating the root directory if needed.
    ///
    /// # Errors
    /// Returns `CacheError::Io` if the root cannot be created, resolved, or is
    /// not a directory.
    pub async fn open(root: impl AsRef<Path>) -> CacheResult<Self> {
        let root = root.as_ref();

        fs::create_dir_all(root)
            .await
            .map_err(|e| CacheError::io(format!("Failed to create cache dir: {e}")))?;

        let root = fs::canonicalize(root)
            .await
            .map_err(|e| CacheError::io(format!("Failed to resolve cache dir: {e}")))?;

        let meta = fs::metadata(&root)
            .await
            .map_err(|e| CacheError::io(format!("Failed to stat cache dir: {e}")))?;
        if !meta.is_dir() {
            return Err(CacheError::io(format!(
                "Cache root {} is not a directory",
                root.display()
            )));
        }

        debug!(root = %root.display(), "Opened asset store");
        Ok(Self { root })
    }

    /// Returns the canonical cache root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path an asset with this key and extension is stored at.
    #[must_use]
    pub fn path_for(&self, key: &CacheKey, extension: &str) -> PathBuf {
        self.root.join(format!("{}{extension}", key.as_str()))
    }

    /// Finds the stored file for `key`.
    ///
    /// With a hint only `<key><hint>` is checked; without one the known image
    /// extensions are tried in order.
    pub async fn locate(&self, key: &CacheKey, extension_hint: Option<&str>) -> Option<PathBuf> {
        if let Some(ext) = extension_hint {
            let path = self.path_for(key, ext);
            return is_file(&path).await.then_some(path);
        }

        for ext in KNOWN_EXTENSIONS {
            let path = self.path_for(key, ext);
            if is_file(&path).await {
                return Some(path);
            }
        }

        trace!(key = %key, "Asset not on disk");
        None
    }

    /// Returns true if an asset for `key` is stored.
    pub async fn exists(&self, key: &CacheKey, extension_hint: Option<&str>) -> bool {
        self.locate(key, extension_hint).await.is_some()
    }

    /// Reads the raw bytes stored for `key`, if any.
    ///
    /// # Errors
    /// Returns `CacheError::Io` if the file exists but cannot be read.
    pub async fn read(
        &self,
        key: &CacheKey,
        extension_hint: Option<&str>,
    ) -> CacheResult<Option<Vec<u8>>> {
        let Some(path) = self.locate(key, extension_hint).await else {
            return Ok(None);
        };

        let bytes = fs::read(&path)
            .await
            .map_err(|e| CacheError::io(format!("Failed to read {}: {e}", path.display())))?;
        Ok(Some(bytes))
    }

    /// Writes `bytes` as `<key><extension>` and returns the stored path.
    ///
    /// A partially written file is removed before the error is returned.
    ///
    /// # Errors
    /// Returns `CacheError::Io` if the file cannot be created or written.
    pub async fn write(
        &self,
        key: &CacheKey,
        extension: &str,
        bytes: &[u8],
    ) -> CacheResult<PathBuf> {
        let path = self.path_for(key, extension);

        let file = fs::File::create(&path)
            .await
            .map_err(|e| CacheError::io(format!("Failed to create cache file: {e}")))?;

        write_or_remove(&path, file, bytes).await?;

        debug!(key = %key, path = %path.display(), size = bytes.len(), "Stored asset");
        Ok(path)
    }
}

/// Writes and flushes `bytes` into `writer`, which must be backed by `path`.
/// On failure the writer is closed and `path` removed.
async fn write_or_remove<W>(path: &Path, mut writer: W, bytes: &[u8]) -> CacheResult<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        writer.write_all(bytes).await?;
        writer.flush().await
    }
    .await;

    let Err(e) = written else {
        return Ok(());
    };

    drop(writer);
    if let Err(remove_err) = fs::remove_file(path).await {
        warn!(
            path = %path.display(),
            error = %remove_err,
            "Failed to remove partial cache file"
        );
    }
    Err(CacheError::io(format!("Failed to write cache file: {e}")))
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;

    async fn create_test_store() -> (AssetStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = AssetStore::open(temp_dir.path().join("images"))
            .await
            .unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_open_creates_nested_root() {
        let (store, temp) = create_test_store().await;
        assert!(store.root().is_dir());
        assert!(store.root().starts_with(temp.path().canonicalize().unwrap()));
    }

    #[tokio::test]
    async fn test_open_rejects_file_root() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let result = AssetStore::open(&file).await;
        assert!(matches!(result, Err(CacheError::Io { .. })));
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (store, _temp) = create_test_store().await;
        let key = CacheKey::new("map_a_splash");

        let path = store.write(&key, ".png", b"png bytes").await.unwrap();

        assert_eq!(path, store.root().join("map_a_splash.png"));
        assert!(store.exists(&key, Some(".png")).await);
        assert_eq!(
            store.read(&key, Some(".png")).await.unwrap().as_deref(),
            Some(&b"png bytes"[..])
        );
    }

    #[tokio::test]
    async fn test_hint_is_exact() {
        let (store, _temp) = create_test_store().await;
        let key = CacheKey::new("map_a_icon");
        store.write(&key, ".webp", b"x").await.unwrap();

        assert!(!store.exists(&key, Some(".png")).await);
        assert!(store.exists(&key, Some(".webp")).await);
    }

    #[tokio::test]
    async fn test_lookup_without_hint() {
        let (store, _temp) = create_test_store().await;
        let key = CacheKey::new("map_b_icon");
        store.write(&key, ".gif", b"x").await.unwrap();

        let found = store.locate(&key, None).await;
        assert_eq!(found, Some(store.root().join("map_b_icon.gif")));
    }

    #[tokio::test]
    async fn test_missing_asset() {
        let (store, _temp) = create_test_store().await;
        let key = CacheKey::new("nope");

        assert!(!store.exists(&key, None).await);
        assert!(store.read(&key, None).await.unwrap().is_none());
    }

    /// Accepts `limit` bytes, then fails every write.
    struct ShortWriter {
        limit: usize,
    }

    impl AsyncWrite for ShortWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.limit == 0 {
                return Poll::Ready(Err(io::Error::other("disk full")));
            }
            let n = buf.len().min(self.limit);
            self.limit -= n;
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_create_failure_is_io_error() {
        let (store, _temp) = create_test_store().await;
        let key = CacheKey::new("missing_dir/asset");

        let result = store.write(&key, ".png", b"x").await;

        assert!(matches!(result, Err(CacheError::Io { .. })));
        assert!(!store.root().join("missing_dir").exists());
    }

    #[tokio::test]
    async fn test_failed_write_removes_partial_file() {
        let (store, _temp) = create_test_store().await;
        let path = store.path_for(&CacheKey::new("map_d_splash"), ".png");
        std::fs::write(&path, b"half").unwrap();

        let result = write_or_remove(&path, ShortWriter { limit: 4 }, b"half of the body").await;

        assert!(matches!(result, Err(CacheError::Io { .. })));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_successful_write_keeps_file() {
        let (store, _temp) = create_test_store().await;
        let path = store.path_for(&CacheKey::new("map_e_splash"), ".png");
        std::fs::write(&path, b"body").unwrap();

        let result = write_or_remove(&path, ShortWriter { limit: 64 }, b"body").await;

        assert!(result.is_ok());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_rewrite_is_idempotent() {
        let (store, _temp) = create_test_store().await;
        let key = CacheKey::new("map_c_splash");

        let first = store.write(&key, ".jpg", b"same").await.unwrap();
        let second = store.write(&key, ".jpg", b"same").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(first).unwrap(), b"same");
    }
}
