//! HTML to PDF rendering through a headless Chrome/Chromium subprocess.
//!
//! [`Generator`] knows how to invoke Chrome; [`Pdf`] layers a content-oriented
//! API on top, staging raw HTML in a temporary file for the duration of a render.
//!
//! ```no_run
//! use chromepdf_render::{Generator, Options, Pdf};
//!
//! # fn example() -> chromepdf_render::error::Result<()> {
//! let pdf = Pdf::new(Generator::discover()?);
//! let output = pdf.generate_from_content("<html><body>hi</body></html>", None, &Options::new())?;
//! println!("{}", output.path().display());
//! # Ok(())
//! # }
//! ```

mod chrome;
pub mod error;
mod filename;
pub mod fs;
mod generator;
mod options;
mod pdf;
mod process;

use crate::error::Result;
pub use crate::error::ProcessFailure;
pub use crate::generator::Generator;
pub use crate::options::{DEFAULT_FLAGS, Options};
pub use crate::pdf::Pdf;
use std::path::{Path, PathBuf};

/// Turns an HTML file into a PDF file.
///
/// Implemented by [`Generator`]; [`Pdf`] accepts any implementation, which
/// makes it easy to decorate or stub out the Chrome invocation.
pub trait Generate {
    /// Renders `origin` to `target`, or to a generated path when `target` is
    /// `None`. Per-call `options` take precedence over any defaults.
    fn generate(&self, origin: &Path, target: Option<&Path>, options: &Options) -> Result<Output>;
}

impl<G: Generate + ?Sized> Generate for &G {
    fn generate(&self, origin: &Path, target: Option<&Path>, options: &Options) -> Result<Output> {
        (**self).generate(origin, target, options)
    }
}

impl<G: Generate + ?Sized> Generate for Box<G> {
    fn generate(&self, origin: &Path, target: Option<&Path>, options: &Options) -> Result<Output> {
        (**self).generate(origin, target, options)
    }
}

/// Adapts a closure into a [`Generate`] implementation.
///
/// ```
/// use chromepdf_render::{Output, Pdf, generate_fn};
/// use std::path::Path;
///
/// let pdf = Pdf::new(generate_fn(|_origin, target, _options| {
///     Ok(Output::new(target.unwrap_or(Path::new("/dev/null"))))
/// }));
/// # let _ = pdf;
/// ```
pub fn generate_fn<F>(f: F) -> GenerateFn<F>
where
    F: Fn(&Path, Option<&Path>, &Options) -> Result<Output>,
{
    GenerateFn(f)
}

/// A [`Generate`] implementation backed by a closure, see [`generate_fn`].
#[derive(Clone, Copy)]
pub struct GenerateFn<F>(F);

impl<F> Generate for GenerateFn<F>
where
    F: Fn(&Path, Option<&Path>, &Options) -> Result<Output>,
{
    fn generate(&self, origin: &Path, target: Option<&Path>, options: &Options) -> Result<Output> {
        (self.0)(origin, target, options)
    }
}

impl<F> std::fmt::Debug for GenerateFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateFn").finish_non_exhaustive()
    }
}

/// A generated PDF on disk.
///
/// Only the location is tracked. The file belongs to the caller and is never
/// removed by this crate; nor is its existence verified after Chrome exits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Output {
    path: PathBuf,
}
impl Output {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}
impl AsRef<Path> for Output {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
impl From<Output> for PathBuf {
    fn from(output: Output) -> Self {
        output.path
    }
}
