use crate::chrome::Chrome;
use crate::error::{ErrorKind, ProcessFailure, Result};
use crate::filename::{ensure_pdf_extension, unique_path};
use crate::options::{Options, render_flag};
use crate::process::{self, Failure};
use crate::{Generate, Output};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::instrument;

const PRINT_TO_PDF: &str = "print-to-pdf";

/// Outcome of the one-off `--version` self-check.
#[derive(Debug)]
enum Validation {
    Unknown,
    Valid,
    Invalid(ProcessFailure),
}

/// Renders HTML files to PDF by shelling out to Chrome.
///
/// A generator is configured once and reused for many renders. Its binary is
/// checked with `--version` the first time [`generate`](Generate::generate) is
/// called, and that verdict sticks for the lifetime of the instance.
///
/// # Example
///
/// ```no_run
/// use chromepdf_render::{Generate, Generator, Options};
/// use std::path::Path;
///
/// # fn example() -> chromepdf_render::error::Result<()> {
/// let mut generator = Generator::new("/usr/bin/chromium").with_temp_dir("/var/tmp");
/// generator.set_option("window-size", Some("1280,720".to_string()));
/// let output = generator.generate(Path::new("invoice.html"), None, &Options::new())?;
/// println!("{}", output.path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Generator {
    chrome: Chrome,
    temp_dir: PathBuf,
    options: Options,
    timeout: Option<Duration>,
    validation: Mutex<Validation>,
}
impl Generator {
    /// Creates a generator for the Chrome binary at `binary`, with the
    /// built-in default flags and the platform temp directory.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self::from_chrome(Chrome::Binary { path: binary.into() })
    }

    /// Searches `PATH` (and Flatpak) for a Chrome/Chromium installation.
    pub fn discover() -> Result<Self> {
        Ok(Self::from_chrome(Chrome::discover()?))
    }

    fn from_chrome(chrome: Chrome) -> Self {
        Self {
            chrome,
            temp_dir: std::env::temp_dir(),
            options: Options::defaults(),
            timeout: None,
            validation: Mutex::new(Validation::Unknown),
        }
    }

    /// Directory in which output files are placed when no target is given.
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    /// Applies `options` over the current instance defaults.
    pub fn with_options(mut self, options: &Options) -> Self {
        self.options.merge(options);
        self
    }

    /// Kills Chrome and fails the call if it runs for longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn set_option(&mut self, name: impl Into<String>, value: Option<String>) -> &mut Self {
        self.options.insert(name, value);
        self
    }

    pub fn set_options<K, V>(&mut self, options: impl IntoIterator<Item = (K, Option<V>)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.options.extend(options);
        self
    }

    /// Instance defaults: the built-in flags plus everything set since.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Mutable access to the instance defaults, e.g. to remove a built-in flag.
    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// The executable that will be spawned.
    pub fn binary(&self) -> &Path {
        self.chrome.program()
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Where a render should be written: `target` or a fresh temp name, with
    /// `.pdf` appended unless the path already mentions it.
    fn resolve_target(&self, target: Option<&Path>) -> PathBuf {
        let target = match target {
            Some(target) if !target.as_os_str().is_empty() => target.to_path_buf(),
            _ => unique_path(&self.temp_dir, ".pdf", Path::exists),
        };
        ensure_pdf_extension(target)
    }

    /// Flags for a render, lowest precedence first: instance defaults, the
    /// mandatory print flags, then per-call `options`.
    fn render_options(&self, target: &Path, options: &Options) -> Options {
        let mut merged = self.options.clone();
        merged.set_flag("print-to-pdf-no-header");
        merged.set(PRINT_TO_PDF, target.to_string_lossy());
        merged.merge(options);
        merged
    }

    /// Like [`Options::to_args`], except that the target is passed through
    /// as raw OS bytes so Chrome writes exactly where [`Output`] points.
    fn render_args(&self, target: &Path, options: &Options) -> Vec<OsString> {
        let target_overridden = options.contains(PRINT_TO_PDF);
        self.render_options(target, options)
            .iter()
            .map(|(name, value)| match name {
                PRINT_TO_PDF if !target_overridden => {
                    let mut arg = OsString::from(format!("--{PRINT_TO_PDF}="));
                    arg.push(target.as_os_str());
                    arg
                },
                _ => render_flag(name, value).into(),
            })
            .collect()
    }

    fn render_command(&self, origin: &Path, target: &Path, options: &Options) -> Command {
        self.chrome.command(self.render_args(target, options), [origin])
    }

    fn validate_binary(&self) -> Result<()> {
        // Held across the probe so concurrent first calls only probe once.
        let mut validation = self.validation.lock().unwrap_or_else(PoisonError::into_inner);
        match &*validation {
            Validation::Valid => return Ok(()),
            Validation::Invalid(failure) => exn::bail!(ErrorKind::InvalidBinary(failure.clone())),
            Validation::Unknown => {},
        }
        let mut probe = self.options.clone();
        probe.set_flag("version");
        let mut command = self.chrome.command(probe.to_args(), std::iter::empty::<&Path>());
        match process::run(&mut command, self.timeout) {
            Ok(captured) => {
                tracing::debug!(binary = %self.binary().display(), version = captured.stdout.trim(), "Chrome binary validated");
                *validation = Validation::Valid;
                Ok(())
            },
            Err(Failure::Process(failure)) => {
                *validation = Validation::Invalid(failure.clone());
                exn::bail!(ErrorKind::InvalidBinary(failure))
            },
            // Inconclusive; the next call probes again.
            Err(Failure::Timeout(limit)) => exn::bail!(ErrorKind::ChromeTimeout(limit)),
        }
    }
}

impl Generate for Generator {
    #[instrument(skip_all, fields(origin = %origin.display()))]
    fn generate(&self, origin: &Path, target: Option<&Path>, options: &Options) -> Result<Output> {
        self.validate_binary()?;
        let target = self.resolve_target(target);
        let mut command = self.render_command(origin, &target, options);
        tracing::debug!(command = %process::describe(&command), "Spawning Chrome");
        match process::run(&mut command, self.timeout) {
            Ok(captured) => {
                tracing::trace!(stdout = captured.stdout.as_str(), stderr = captured.stderr.as_str(), "Chrome output");
                tracing::info!(output = %target.display(), "PDF generated");
                Ok(Output::new(target))
            },
            Err(Failure::Process(failure)) => exn::bail!(ErrorKind::RenderFailed(failure)),
            Err(Failure::Timeout(limit)) => exn::bail!(ErrorKind::ChromeTimeout(limit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args(command: &Command) -> Vec<String> {
        command.get_args().map(|arg| arg.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_new_uses_builtin_defaults() {
        let generator = Generator::new("/usr/bin/chromium");
        assert_eq!(generator.options(), &Options::defaults());
        assert_eq!(generator.binary(), Path::new("/usr/bin/chromium"));
        assert_eq!(generator.temp_dir(), std::env::temp_dir());
        assert_eq!(generator.timeout(), None);
    }

    #[test]
    fn test_set_option_last_write_wins() {
        let mut generator = Generator::new("chrome");
        generator.set_option("window-size", Some("800,600".into()));
        generator.set_option("window-size", Some("1280,720".into()));
        generator.set_options([("lang", Some("fr")), ("headless", Some("new"))]);
        assert_eq!(generator.options().get("window-size"), Some(Some("1280,720")));
        assert_eq!(generator.options().get("lang"), Some(Some("fr")));
        assert_eq!(generator.options().get("headless"), Some(Some("new")));
        assert_eq!(generator.options().len(), Options::defaults().len() + 2);
    }

    #[test]
    fn test_render_command_layout() {
        let generator = Generator::new("/opt/chrome/chrome").with_options(&Options::new().with("lang", "en"));
        let command = generator.render_command(Path::new("/tmp/in.html"), Path::new("/tmp/out.pdf"), &Options::new());
        let args = args(&command);
        assert_eq!(command.get_program(), "/opt/chrome/chrome");
        assert_eq!(args.first().map(String::as_str), Some("--headless"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/in.html"));
        let tail = &args[args.len() - 4..];
        assert_eq!(tail, ["--lang=en", "--print-to-pdf-no-header", "--print-to-pdf=/tmp/out.pdf", "/tmp/in.html"]);
    }

    #[test]
    fn test_per_call_options_take_precedence() {
        let generator = Generator::new("chrome");
        let overrides = Options::new().with("headless", "false").with("print-to-pdf", "/elsewhere.pdf");
        let args = args(&generator.render_command(Path::new("in.html"), Path::new("/tmp/out.pdf"), &overrides));
        assert!(args.contains(&"--headless=false".to_string()));
        assert!(!args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--disable-gpu".to_string()));
        assert!(args.contains(&"--print-to-pdf=/elsewhere.pdf".to_string()));
        assert!(!args.contains(&"--print-to-pdf=/tmp/out.pdf".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_render_command_keeps_raw_target_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let target = Path::new(OsStr::from_bytes(b"/tmp/caf\xff.pdf"));
        let command = Generator::new("chrome").render_command(Path::new("in.html"), target, &Options::new());
        let expected = OsStr::from_bytes(b"--print-to-pdf=/tmp/caf\xff.pdf");
        assert!(command.get_args().any(|arg| arg == expected));
    }

    #[test]
    fn test_instance_options_override_builtins() {
        let mut generator = Generator::new("chrome");
        generator.set_option("disable-gpu", Some("".into()));
        generator.options_mut().remove("incognito");
        let args = args(&generator.render_command(Path::new("in.html"), Path::new("out.pdf"), &Options::new()));
        assert!(args.contains(&"--disable-gpu".to_string()));
        assert!(!args.contains(&"--incognito".to_string()));
    }

    #[rstest]
    #[case(Some("/srv/out/report"), "/srv/out/report.pdf")]
    #[case(Some("/srv/out/report.pdf"), "/srv/out/report.pdf")]
    #[case(Some("/srv/out/report.pdf.part"), "/srv/out/report.pdf.part")]
    fn test_resolve_explicit_target(#[case] target: Option<&str>, #[case] expected: &str) {
        let generator = Generator::new("chrome");
        assert_eq!(generator.resolve_target(target.map(Path::new)), PathBuf::from(expected));
    }

    #[test]
    fn test_resolve_derived_target() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new("chrome").with_temp_dir(dir.path());
        for target in [None, Some(Path::new(""))] {
            let resolved = generator.resolve_target(target);
            assert_eq!(resolved.parent(), Some(dir.path()));
            assert!(resolved.to_string_lossy().ends_with(".pdf"));
            assert!(!resolved.exists());
        }
    }
}
