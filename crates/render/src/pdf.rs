use crate::error::Result;
use crate::filename::unique_path;
use crate::fs::{Filesystem, LocalFilesystem};
use crate::{Generate, Generator, Options, Output};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Content-oriented front end to a [`Generate`] implementation.
///
/// Besides rendering files directly, a `Pdf` can render raw HTML: the content
/// is staged in a uniquely-named file inside its temp directory, rendered,
/// then removed again whether or not the render succeeded.
pub struct Pdf<G = Generator, F = LocalFilesystem> {
    generator: G,
    filesystem: F,
    temp_dir: PathBuf,
}
impl<G: Generate> Pdf<G> {
    /// Wraps `generator`, staging content in the platform temp directory.
    pub fn new(generator: G) -> Self {
        Self { generator, filesystem: LocalFilesystem, temp_dir: std::env::temp_dir() }
    }
}
impl<G: Generate, F: Filesystem> Pdf<G, F> {
    /// Directory in which staging HTML files are created.
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    /// Replaces the filesystem used for staging files.
    pub fn with_filesystem<F2: Filesystem>(self, filesystem: F2) -> Pdf<G, F2> {
        Pdf { generator: self.generator, filesystem, temp_dir: self.temp_dir }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut G {
        &mut self.generator
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Renders the HTML file at `origin`. Delegates straight to the generator.
    pub fn generate(&self, origin: impl AsRef<Path>, target: Option<&Path>, options: &Options) -> Result<Output> {
        self.generator.generate(origin.as_ref(), target, options)
    }

    /// Renders raw HTML `content`.
    ///
    /// The staging file is always removed. If rendering fails, that error is
    /// returned unchanged and a failure to clean up is only logged; if
    /// rendering succeeds, a failure to clean up is returned instead.
    #[instrument(skip_all, fields(bytes = content.as_ref().len()))]
    pub fn generate_from_content(
        &self,
        content: impl AsRef<[u8]>,
        target: Option<&Path>,
        options: &Options,
    ) -> Result<Output> {
        let staging = StagingFile::new(&self.filesystem, self.unique_staging_path());
        self.filesystem.write(staging.path(), content.as_ref())?;
        tracing::debug!(staging = %staging.path().display(), "HTML content staged for rendering");
        let output = self.generate(staging.path(), target, options)?;
        staging.close()?;
        Ok(output)
    }

    fn unique_staging_path(&self) -> PathBuf {
        unique_path(&self.temp_dir, ".html", |path| self.filesystem.exists(path))
    }
}

/// Removes its file when dropped, unless [`close`](Self::close) already did.
struct StagingFile<'a, F: Filesystem> {
    filesystem: &'a F,
    path: PathBuf,
    removed: bool,
}
impl<'a, F: Filesystem> StagingFile<'a, F> {
    fn new(filesystem: &'a F, path: PathBuf) -> Self {
        Self { filesystem, path, removed: false }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file now, reporting any failure.
    fn close(mut self) -> Result<()> {
        self.removed = true;
        self.filesystem.remove(&self.path)
    }
}
impl<F: Filesystem> Drop for StagingFile<'_, F> {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = self.filesystem.remove(&self.path) {
            tracing::warn!(staging = %self.path.display(), error = ?e, "Failed to remove staging file");
        }
    }
}
