//! Evidence storage for receipt images. Submissions carry an opaque
//! reference; only this module knows how references map to bytes.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Evidence not found: {0}")]
    NotFound(String),

    #[error("Invalid evidence reference: {0}")]
    InvalidReference(String),
}

pub trait EvidenceStore: Send + Sync {
    /// Persist an image and return its reference.
    fn save(&self, unit_hint: Option<&str>, image: &[u8]) -> Result<String, StorageError>;

    /// Load the bytes behind a reference produced by `save`.
    fn load(&self, reference: &str) -> Result<Vec<u8>, StorageError>;
}

/// Flat-directory store. References are bare filenames of the form
/// `{unit}_{timestamp}_{uuid}.jpg`, with the unit's slash flattened.
pub struct FsEvidenceStore {
    root: PathBuf,
}

impl FsEvidenceStore {
    pub fn new(root: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }
}

impl EvidenceStore for FsEvidenceStore {
    fn save(&self, unit_hint: Option<&str>, image: &[u8]) -> Result<String, StorageError> {
        let unit = unit_hint.map_or_else(|| "anon".to_string(), |u| u.replace('/', "-"));
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let reference = format!("{unit}_{stamp}_{}.jpg", Uuid::new_v4().simple());
        std::fs::write(self.root.join(&reference), image)?;
        Ok(reference)
    }

    fn load(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        // References are filenames, never paths.
        if reference.contains('/') || reference.contains('\\') || reference.contains("..") {
            return Err(StorageError::InvalidReference(reference.to_string()));
        }
        std::fs::read(self.root.join(reference)).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(reference.to_string())
            } else {
                StorageError::Io(err)
            }
        })
    }
}

/// In-memory store for tests.
#[cfg(test)]
pub struct MemoryEvidenceStore {
    items: std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

#[cfg(test)]
impl MemoryEvidenceStore {
    pub fn new() -> Self {
        Self {
            items: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[cfg(test)]
impl EvidenceStore for MemoryEvidenceStore {
    fn save(&self, unit_hint: Option<&str>, image: &[u8]) -> Result<String, StorageError> {
        let mut items = self.items.lock().unwrap();
        let reference = format!(
            "{}_{}.jpg",
            unit_hint.unwrap_or("anon").replace('/', "-"),
            items.len()
        );
        items.insert(reference.clone(), image.to_vec());
        Ok(reference)
    }

    fn load(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        self.items
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(reference.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsEvidenceStore::new(dir.path().to_path_buf()).unwrap();

        let reference = store.save(Some("88/07"), b"image bytes").unwrap();
        assert!(reference.starts_with("88-07_"));
        assert!(reference.ends_with(".jpg"));
        assert_eq!(store.load(&reference).unwrap(), b"image bytes");
    }

    #[test]
    fn anonymous_submission_gets_anon_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsEvidenceStore::new(dir.path().to_path_buf()).unwrap();
        let reference = store.save(None, b"x").unwrap();
        assert!(reference.starts_with("anon_"));
    }

    #[test]
    fn load_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsEvidenceStore::new(dir.path().to_path_buf()).unwrap();
        for bad in ["../secret.jpg", "a/b.jpg", "..\\win.jpg"] {
            assert!(matches!(
                store.load(bad),
                Err(StorageError::InvalidReference(_))
            ));
        }
    }

    #[test]
    fn missing_reference_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsEvidenceStore::new(dir.path().to_path_buf()).unwrap();
        assert!(matches!(
            store.load("88-07_nothere.jpg"),
            Err(StorageError::NotFound(_))
        ));
    }
}
