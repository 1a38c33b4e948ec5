//! Persistent on-disk image cache
//!
//! Files live directly in the cache directory, named after their
//! [`ImageKey`]. Writes go to a temporary file in the same directory and are
//! renamed into place, so a path returned by [`ImageCache::get`] always points
//! at a complete image, even while other processes are writing.

use crate::types::{FetchError, ImageKey, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Prefix for in-flight temporary files; never served by `get`
const TEMP_PREFIX: &str = ".partial-";

/// Cache entry metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub key: ImageKey,
    pub path: PathBuf,
    pub fetched_at: SystemTime,
}

#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    /// Open (and create if needed) a cache directory
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_owned();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| FetchError::CacheIo(format!("{}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &ImageKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Look up a key. Never touches the network.
    pub async fn get(&self, key: &ImageKey) -> Option<PathBuf> {
        let path = self.path_for(key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    pub async fn record(&self, key: &ImageKey) -> Option<CacheRecord> {
        let path = self.path_for(key);
        let meta = tokio::fs::metadata(&path).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        Some(CacheRecord {
            key: key.clone(),
            fetched_at: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            path,
        })
    }

    /// Store image bytes under `key` and return the final path.
    ///
    /// Bytes that do not decode as an image are rejected. Storing identical
    /// bytes twice leaves a single file.
    pub async fn put(&self, key: &ImageKey, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.dir.clone();
        let path = self.path_for(key);
        let bytes = bytes.to_vec();

        // Decoding and file writes are blocking, spawn blocking
        tokio::task::spawn_blocking(move || {
            validate_image(&bytes)?;

            let unchanged = std::fs::read(&path)
                .map(|existing| existing == bytes)
                .unwrap_or(false);
            if unchanged {
                return Ok(path);
            }

            write_atomic(&dir, &path, &bytes)?;
            Ok(path)
        })
        .await?
    }

    /// Delete the files for `keys` only; returns how many were removed.
    pub async fn purge(&self, keys: &[ImageKey]) -> Result<usize> {
        let mut removed = 0;
        for key in keys {
            match tokio::fs::remove_file(self.path_for(key)).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(FetchError::CacheIo(e.to_string())),
            }
        }
        Ok(removed)
    }
}

fn validate_image(bytes: &[u8]) -> Result<()> {
    image::load_from_memory(bytes)
        .map(|_| ())
        .map_err(|e| FetchError::ValidationFailure(format!("not a valid image: {e}")))
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| FetchError::CacheIo(e.to_string()))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| FetchError::CacheIo(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| FetchError::CacheIo(e.error.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Face;

    fn png_bytes(shade: u8) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 6, image::Rgb([shade, shade, shade]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ImageCache::open(tmp.path()).await.unwrap();
        assert!(cache.get(&ImageKey::new("abc", Face::Front)).await.is_none());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ImageCache::open(tmp.path()).await.unwrap();
        let key = ImageKey::new("abc", Face::Front);

        let path = cache.put(&key, &png_bytes(10)).await.unwrap();
        assert_eq!(cache.get(&key).await, Some(path.clone()));
        assert_eq!(std::fs::read(&path).unwrap(), png_bytes(10));
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ImageCache::open(tmp.path()).await.unwrap();
        let key = ImageKey::new("abc", Face::Front);

        let first = cache.put(&key, &png_bytes(10)).await.unwrap();
        let second = cache.put(&key, &png_bytes(10)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(file_count(tmp.path()), 1);
        assert_eq!(cache.get(&key).await, Some(first));
    }

    #[tokio::test]
    async fn test_put_rejects_non_image() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ImageCache::open(tmp.path()).await.unwrap();
        let key = ImageKey::new("abc", Face::Front);

        let result = cache.put(&key, b"<html>error</html>").await;
        assert!(matches!(result, Err(FetchError::ValidationFailure(_))));
        assert!(cache.get(&key).await.is_none());
        assert_eq!(file_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_front_and_back_are_distinct() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ImageCache::open(tmp.path()).await.unwrap();
        let front = ImageKey::new("abc", Face::Front);
        let back = ImageKey::new("abc", Face::Back);

        cache.put(&front, &png_bytes(1)).await.unwrap();
        assert!(cache.get(&back).await.is_none());
        cache.put(&back, &png_bytes(2)).await.unwrap();
        assert_ne!(cache.get(&front).await, cache.get(&back).await);
    }

    #[tokio::test]
    async fn test_purge_only_listed_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ImageCache::open(tmp.path()).await.unwrap();
        let keep = ImageKey::new("keep", Face::Front);
        let drop = ImageKey::new("drop", Face::Front);
        let never_stored = ImageKey::new("ghost", Face::Back);

        cache.put(&keep, &png_bytes(1)).await.unwrap();
        cache.put(&drop, &png_bytes(2)).await.unwrap();

        let removed = cache.purge(&[drop.clone(), never_stored]).await.unwrap();
        assert_eq!(removed, 1);
        assert!(cache.get(&drop).await.is_none());
        assert!(cache.get(&keep).await.is_some());
    }

    #[tokio::test]
    async fn test_record_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ImageCache::open(tmp.path()).await.unwrap();
        let key = ImageKey::new("abc", Face::Back);
        let path = cache.put(&key, &png_bytes(3)).await.unwrap();

        let record = cache.record(&key).await.unwrap();
        assert_eq!(record.path, path);
        assert_eq!(record.key, key);
    }
}
