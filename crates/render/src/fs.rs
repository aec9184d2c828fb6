//! Filesystem seam for staging HTML content.
//!
//! [`Pdf`](crate::Pdf) only ever needs three operations on its staging
//! directory, so they're abstracted here to let tests (and callers with
//! unusual storage) swap the implementation out.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::Path;

pub trait Filesystem {
    fn exists(&self, path: &Path) -> bool;

    /// Writes `contents` to `path`, replacing any existing file.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Removes `path`. Removing a file that doesn't exist is not an error.
    fn remove(&self, path: &Path) -> Result<()>;
}

impl<F: Filesystem + ?Sized> Filesystem for &F {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        (**self).write(path, contents)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        (**self).remove(path)
    }
}

/// The host filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
        }
        std::fs::write(path, contents).or_raise(|| ErrorKind::Io(path.to_path_buf()))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            result => result.or_raise(|| ErrorKind::Io(path.to_path_buf())),
        }
    }
}

#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockFilesystem;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use super::Filesystem;
    use crate::error::{ErrorKind, Result};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// In-memory filesystem for testing.
    ///
    /// Writes and removals can be made to fail on demand, to exercise the
    /// error paths around staging files.
    #[derive(Debug, Default)]
    pub struct MockFilesystem {
        files: Mutex<HashMap<PathBuf, Vec<u8>>>,
        fail_writes: bool,
        fail_removes: bool,
    }

    impl MockFilesystem {
        pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
            let files = files.into_iter().map(|(path, data)| (path.into(), data.into())).collect();
            Self { files: Mutex::new(files), ..Self::default() }
        }

        /// Every subsequent write fails with [`ErrorKind::Io`].
        pub fn failing_writes(mut self) -> Self {
            self.fail_writes = true;
            self
        }

        /// Every subsequent removal fails with [`ErrorKind::Io`].
        pub fn failing_removes(mut self) -> Self {
            self.fail_removes = true;
            self
        }

        pub fn read(&self, path: &Path) -> Option<Vec<u8>> {
            self.files().get(path).cloned()
        }

        pub fn paths(&self) -> Vec<PathBuf> {
            let mut paths: Vec<_> = self.files().keys().cloned().collect();
            paths.sort();
            paths
        }

        fn files(&self) -> MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
            self.files.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl Filesystem for MockFilesystem {
        fn exists(&self, path: &Path) -> bool {
            self.files().contains_key(path)
        }

        fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
            if self.fail_writes {
                exn::bail!(ErrorKind::Io(path.to_path_buf()));
            }
            self.files().insert(path.to_path_buf(), contents.to_vec());
            Ok(())
        }

        fn remove(&self, path: &Path) -> Result<()> {
            if self.fail_removes {
                exn::bail!(ErrorKind::Io(path.to_path_buf()));
            }
            self.files().remove(path);
            Ok(())
        }
    }
}
