//! Artifact storage for detection images.
//!
//! Artifacts are write-once, read-many JPEG blobs addressed by an opaque
//! reference string. Names are collision-resistant UUIDs rather than
//! content- or time-derived values, so rapid consecutive writes cannot race
//! on a name. Writes go through a temp file and rename so a concurrent
//! reader never observes a partially written blob.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use uuid::Uuid;

use crate::frame::Frame;

/// Blob sink for annotated detection frames.
///
/// A trait seam so tests can inject write failures without touching the
/// filesystem.
pub trait ArtifactStore: Send {
    /// Persist the frame, returning the reference needed to read or delete it.
    fn write(&self, frame: &Frame) -> Result<String>;

    /// Read a blob back by reference.
    fn read(&self, reference: &str) -> Result<Vec<u8>>;

    /// Delete a blob by reference. Deleting a missing blob is an error the
    /// caller may downgrade to a warning.
    fn delete(&self, reference: &str) -> Result<()>;

    fn contains(&self, reference: &str) -> bool;
}

/// Directory-backed artifact store.
pub struct DirArtifactStore {
    dir: PathBuf,
}

impl DirArtifactStore {
    /// Open the store, creating the directory if absent.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create artifact directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, reference: &str) -> Result<PathBuf> {
        validate_reference(reference)?;
        Ok(self.dir.join(reference))
    }
}

impl ArtifactStore for DirArtifactStore {
    fn write(&self, frame: &Frame) -> Result<String> {
        let reference = format!("{}.jpg", Uuid::new_v4().simple());
        let bytes = frame.encode_jpeg()?;

        let final_path = self.dir.join(&reference);
        let tmp_path = self.dir.join(format!(".{}.tmp", reference));
        std::fs::write(&tmp_path, &bytes)
            .with_context(|| format!("failed to write artifact {}", tmp_path.display()))?;
        if let Err(err) = std::fs::rename(&tmp_path, &final_path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(anyhow::Error::new(err)
                .context(format!("failed to finalize artifact {}", final_path.display())));
        }

        Ok(reference)
    }

    fn read(&self, reference: &str) -> Result<Vec<u8>> {
        let path = self.path_for(reference)?;
        std::fs::read(&path)
            .with_context(|| format!("failed to read artifact {}", path.display()))
    }

    fn delete(&self, reference: &str) -> Result<()> {
        let path = self.path_for(reference)?;
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to delete artifact {}", path.display()))
    }

    fn contains(&self, reference: &str) -> bool {
        match self.path_for(reference) {
            Ok(path) => path.is_file(),
            Err(_) => false,
        }
    }
}

/// A reference must be a single plain file name; anything that could walk out
/// of the artifact directory is rejected before touching the filesystem.
fn validate_reference(reference: &str) -> Result<()> {
    if reference.is_empty()
        || reference.starts_with('.')
        || reference.contains('/')
        || reference.contains('\\')
    {
        return Err(anyhow!("invalid artifact reference: {:?}", reference));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_frame() -> Frame {
        Frame::new(vec![128u8; 16 * 16 * 3], 16, 16).unwrap()
    }

    #[test]
    fn write_read_delete_roundtrip() -> Result<()> {
        let dir = TempDir::new()?;
        let store = DirArtifactStore::open(dir.path())?;

        let reference = store.write(&test_frame())?;
        assert!(reference.ends_with(".jpg"));
        assert!(store.contains(&reference));

        let bytes = store.read(&reference)?;
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        store.delete(&reference)?;
        assert!(!store.contains(&reference));
        Ok(())
    }

    #[test]
    fn consecutive_writes_get_distinct_references() -> Result<()> {
        let dir = TempDir::new()?;
        let store = DirArtifactStore::open(dir.path())?;

        let a = store.write(&test_frame())?;
        let b = store.write(&test_frame())?;
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn delete_of_missing_blob_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        let store = DirArtifactStore::open(dir.path())?;
        assert!(store.delete("missing.jpg").is_err());
        Ok(())
    }

    #[test]
    fn rejects_path_traversal_references() -> Result<()> {
        let dir = TempDir::new()?;
        let store = DirArtifactStore::open(dir.path())?;
        assert!(store.read("../etc/passwd").is_err());
        assert!(store.delete(".hidden").is_err());
        assert!(!store.contains("a/b.jpg"));
        Ok(())
    }

    #[test]
    fn no_temp_files_remain_after_write() -> Result<()> {
        let dir = TempDir::new()?;
        let store = DirArtifactStore::open(dir.path())?;
        store.write(&test_frame())?;

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        Ok(())
    }
}
