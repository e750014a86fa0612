//! File store
//!
//! Filesystem access for both ends of a transfer. Names are resolved
//! relative to the store root exactly as given; no path sanitization is
//! performed.

use crate::transfer::{TransferError, TransferResult};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Directory-rooted file access
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a store rooted at an existing directory
    pub fn new<P: AsRef<Path>>(base_path: P) -> io::Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        let metadata = fs::metadata(&base_path)?;
        if !metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a directory: {}", base_path.display()),
            ));
        }
        Ok(Self { base_path })
    }

    /// Store rooted at the process working directory
    pub fn current_dir() -> Self {
        Self {
            base_path: PathBuf::from("."),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a file name against the root
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Create a new file, failing if the name is already taken
    pub fn create_new(&self, name: &str) -> TransferResult<File> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_of(name))
            .map_err(|e| classify(name, e))
    }

    /// Size of an existing regular file
    pub fn size_of(&self, name: &str) -> TransferResult<u64> {
        let metadata = fs::metadata(self.path_of(name)).map_err(|e| classify(name, e))?;
        if metadata.is_dir() {
            return Err(TransferError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", name),
            )));
        }
        Ok(metadata.len())
    }

    pub fn open(&self, name: &str) -> TransferResult<File> {
        File::open(self.path_of(name)).map_err(|e| classify(name, e))
    }

    pub fn exists(&self, name: &str) -> bool {
        // symlink_metadata so a dangling link still counts as taken
        fs::symlink_metadata(self.path_of(name)).is_ok()
    }

    /// Delete a file. Returns true if the file was deleted, false if it
    /// didn't exist.
    pub fn remove(&self, name: &str) -> io::Result<bool> {
        match fs::remove_file(self.path_of(name)) {
            Ok(()) => {
                log::debug!("Removed {:?}", name);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove an artifact left by a failed transfer, logging instead of
    /// failing so the transfer error is the one reported
    pub fn discard(&self, name: &str) {
        if let Err(e) = self.remove(name) {
            log::error!("Failed to remove partial file {:?}: {}", name, e);
        }
    }
}

/// Map filesystem errors onto the transfer error taxonomy
pub fn classify(name: &str, e: io::Error) -> TransferError {
    match e.kind() {
        io::ErrorKind::NotFound => TransferError::NotFound(name.to_string()),
        io::ErrorKind::AlreadyExists => TransferError::AlreadyExists(name.to_string()),
        _ => TransferError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    #[test]
    fn test_create_new_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();

        let mut file = store.create_new("a.txt").unwrap();
        file.write_all(b"hello").unwrap();
        drop(file);

        assert_eq!(store.size_of("a.txt").unwrap(), 5);

        let mut data = String::new();
        store.open("a.txt").unwrap().read_to_string(&mut data).unwrap();
        assert_eq!(data, "hello");
    }

    #[test]
    fn test_create_new_refuses_existing() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"original").unwrap();

        let result = store.create_new("a.txt");
        assert!(matches!(result, Err(TransferError::AlreadyExists(name)) if name == "a.txt"));

        // Untouched
        assert_eq!(fs::read(temp_dir.path().join("a.txt")).unwrap(), b"original");
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();

        assert!(matches!(store.size_of("nope"), Err(TransferError::NotFound(_))));
        assert!(matches!(store.open("nope"), Err(TransferError::NotFound(_))));
        assert!(!store.exists("nope"));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();

        assert!(matches!(store.size_of("sub"), Err(TransferError::Io(_))));
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();
        store.create_new("gone").unwrap();

        assert!(store.remove("gone").unwrap());
        assert!(!store.remove("gone").unwrap());
        assert!(!store.exists("gone"));
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("plain");
        fs::write(&file_path, b"x").unwrap();

        assert!(FileStore::new(&file_path).is_err());
        assert!(FileStore::new(temp_dir.path().join("missing")).is_err());
    }
}
