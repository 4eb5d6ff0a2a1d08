//! # Blob Stores — Where Templates Live
//!
//! The template store only needs a flat key → bytes mapping. [`BlobStore`] is
//! that seam. Two implementations ship here:
//!
//! - [`MemoryBlobStore`] — a sorted in-memory map, for tests and tools.
//! - [`DirBlobStore`] — one file per key in a directory (feature `fs`).
//!
//! ## Atomic Writes
//!
//! [`DirBlobStore`] writes to a temporary sibling file and renames it over the
//! target, so a reader never sees a half-written template.

use std::collections::BTreeMap;
use std::io;

/// Abstract key → blob persistence.
///
/// [`read`](BlobStore::read) returns `Ok(None)` for a missing key; errors are
/// reserved for I/O failures.
pub trait BlobStore {
    fn exists(&self, key: &str) -> bool;
    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>>;
    fn write(&mut self, key: &str, blob: &[u8]) -> io::Result<()>;
    fn list_keys(&self) -> io::Result<Vec<String>>;
}

impl<S: BlobStore + ?Sized> BlobStore for Box<S> {
    fn exists(&self, key: &str) -> bool {
        (**self).exists(key)
    }

    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, blob: &[u8]) -> io::Result<()> {
        (**self).write(key, blob)
    }

    fn list_keys(&self) -> io::Result<Vec<String>> {
        (**self).list_keys()
    }
}

/// In-memory blob store. Keys are listed in sorted order.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.blobs.remove(key)
    }
}

impl BlobStore for MemoryBlobStore {
    fn exists(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }

    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn write(&mut self, key: &str, blob: &[u8]) -> io::Result<()> {
        self.blobs.insert(key.to_string(), blob.to_vec());
        Ok(())
    }

    fn list_keys(&self) -> io::Result<Vec<String>> {
        Ok(self.blobs.keys().cloned().collect())
    }
}

#[cfg(feature = "fs")]
pub use dir::DirBlobStore;

#[cfg(feature = "fs")]
mod dir {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    use super::BlobStore;

    /// One file per key, named `<key>.<extension>`, in a single directory.
    #[derive(Debug, Clone)]
    pub struct DirBlobStore {
        dir: PathBuf,
        extension: String,
    }

    impl DirBlobStore {
        /// Open (and create if needed) a store rooted at `dir`.
        pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
            let dir = dir.into();
            fs::create_dir_all(&dir)?;
            Ok(Self {
                dir,
                extension: "json".to_string(),
            })
        }

        /// Use a different file extension (default `json`).
        pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
            self.extension = extension.into();
            self
        }

        pub fn dir(&self) -> &Path {
            &self.dir
        }

        fn path_for(&self, key: &str) -> io::Result<PathBuf> {
            let bad = key.is_empty()
                || key.starts_with('.')
                || key.contains(['/', '\\'])
                || key.contains("..");
            if bad {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("'{key}' is not a valid blob key"),
                ));
            }
            Ok(self.dir.join(format!("{key}.{}", self.extension)))
        }
    }

    impl BlobStore for DirBlobStore {
        fn exists(&self, key: &str) -> bool {
            self.path_for(key).is_ok_and(|path| path.is_file())
        }

        fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
            match fs::read(self.path_for(key)?) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e),
            }
        }

        fn write(&mut self, key: &str, blob: &[u8]) -> io::Result<()> {
            let path = self.path_for(key)?;
            let tmp = self.dir.join(format!(".{key}.{}.tmp", self.extension));
            fs::write(&tmp, blob)?;
            fs::rename(&tmp, &path)
        }

        fn list_keys(&self) -> io::Result<Vec<String>> {
            let mut keys = Vec::new();
            for entry in fs::read_dir(&self.dir)? {
                let path = entry?.path();
                if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    log::warn!("skipping non-utf8 blob file '{}'", path.display());
                    continue;
                };
                if !stem.starts_with('.') {
                    keys.push(stem.to_string());
                }
            }
            keys.sort();
            Ok(keys)
        }
    }
}
