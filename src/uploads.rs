//! On-disk storage for report photos.
//!
//! Files land in `<root>/originals/<stem><ext>` and are served back under
//! `/uploads/originals/`. A freshly written photo is owned by a
//! [`StoredPhoto`] guard: unless the caller commits it after the database
//! insert succeeds, dropping the guard deletes the file again.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

pub const UPLOADS_URL_PREFIX: &str = "/uploads";
const ORIGINALS_DIR: &str = "originals";
const DEFAULT_EXTENSION: &str = ".jpg";

#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write `bytes` as `<stem><ext>`, where the extension is taken from the
    /// client's original file name.
    ///
    /// Fails with `AlreadyExists` rather than overwriting another photo. The
    /// returned guard owns the file from the moment it is created, so an
    /// error or a dropped future mid-write leaves nothing behind.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save(
        &self,
        stem: &str,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> std::io::Result<StoredPhoto> {
        let dir = self.root.join(ORIGINALS_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{stem}{}", extension_for(original_name));
        let path = dir.join(&file_name);

        // No await between creating the file and arming the guard
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        let photo = StoredPhoto {
            url: format!("{UPLOADS_URL_PREFIX}/{ORIGINALS_DIR}/{file_name}"),
            path,
            committed: false,
        };

        let mut file = tokio::fs::File::from_std(file);
        file.write_all(bytes).await?;
        file.flush().await?;
        debug!("Stored photo at {}", photo.path.display());

        Ok(photo)
    }
}

/// A photo written to disk but not yet referenced by a saved report
#[derive(Debug)]
pub struct StoredPhoto {
    path: PathBuf,
    url: String,
    committed: bool,
}

impl StoredPhoto {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file; call once the owning report is persisted
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for StoredPhoto {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed orphaned photo {}", self.path.display()),
            Err(e) => warn!("Failed to remove orphaned photo {}: {}", self.path.display(), e),
        }
    }
}

/// `.ext` from the original file name, or `.jpg` when absent or odd-looking
fn extension_for(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for(Some("IMG_0001.png")), ".png");
        assert_eq!(extension_for(Some("photo.tar.HEIC")), ".HEIC");
        assert_eq!(extension_for(Some("no_extension")), ".jpg");
        assert_eq!(extension_for(Some("weird.p/g")), ".jpg");
        assert_eq!(extension_for(Some("")), ".jpg");
        assert_eq!(extension_for(None), ".jpg");
    }

    #[tokio::test]
    async fn test_uncommitted_photo_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path());

        let photo = store.save("1700000000000", Some("a.png"), b"png").await.unwrap();
        let path = photo.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(photo.url(), "/uploads/originals/1700000000000.png");

        drop(photo);
        assert!(!path.exists());
    }

    fn originals_entries(dir: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(dir.join(ORIGINALS_DIR)) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_cancelled_save_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path());
        let bytes = vec![7u8; 64 * 1024 * 1024];

        let result = tokio::time::timeout(
            std::time::Duration::from_micros(50),
            store.save("1700000000002", Some("a.jpg"), &bytes),
        )
        .await;
        // Either the save was cut short or it finished and the guard was dropped
        drop(result);

        // Let any in-flight blocking write drain
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        assert!(originals_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_save_refuses_to_overwrite_existing_photo() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path());

        let first = store.save("1700000000003", Some("a.jpg"), b"first").await.unwrap();
        let err = store
            .save("1700000000003", Some("b.jpg"), b"second")
            .await
            .expect_err("second save with the same name should fail");
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);

        // The failed save did not touch the existing photo
        assert_eq!(std::fs::read(first.path()).unwrap(), b"first");
        first.commit();
        assert_eq!(originals_entries(dir.path()).len(), 1);
    }

    #[tokio::test]
    async fn test_committed_photo_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path());

        let photo = store.save("1700000000001", None, b"jpeg").await.unwrap();
        let path = photo.path().to_path_buf();
        photo.commit();

        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg");
        assert!(path.ends_with("originals/1700000000001.jpg"));
    }
}
