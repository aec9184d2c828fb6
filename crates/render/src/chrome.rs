use crate::error::{ErrorKind, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Represents a Chrome/Chromium executable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Chrome {
    /// A directly executable binary.
    Binary { path: PathBuf },
    /// A Flatpak-installed application.
    Flatpak { flatpak: PathBuf, app_id: String },
}

/// Names looked up on `PATH`, most specific first. `which` adds `.exe` on Windows.
const EXECUTABLES: [&str; 6] = ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser", "chrome", "msedge"];

const FLATPAK_APPS: [&str; 3] = ["com.google.Chrome", "org.chromium.Chromium", "com.microsoft.Edge"];

/// Default install locations of browsers that don't put themselves on `PATH`.
fn install_locations() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        ["Google Chrome", "Chromium", "Microsoft Edge"]
            .iter()
            .map(|app| PathBuf::from(format!("/Applications/{app}.app/Contents/MacOS/{app}")))
            .collect()
    } else if cfg!(windows) {
        let roots = ["ProgramFiles", "ProgramFiles(x86)", "LocalAppData"].into_iter().filter_map(std::env::var_os);
        roots
            .flat_map(|root| {
                let root = PathBuf::from(root);
                [root.join(r"Google\Chrome\Application\chrome.exe"), root.join(r"Microsoft\Edge\Application\msedge.exe")]
            })
            .collect()
    } else {
        Vec::new()
    }
}

/// First executable found via `lookup`, falling back to the first of `installed` that exists.
fn find_binary(lookup: impl Fn(&str) -> Option<PathBuf>, installed: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    EXECUTABLES.into_iter().find_map(lookup).or_else(|| installed.into_iter().find(|path| path.is_file()))
}

impl Chrome {
    pub(crate) fn discover() -> Result<Self> {
        if let Some(path) = find_binary(|exe| which::which(exe).ok(), install_locations()) {
            tracing::debug!(path = %path.display(), "Discovered Chrome executable");
            return Ok(Self::Binary { path });
        }
        tracing::info!("Chrome executable not found in PATH or default install locations");
        let Ok(flatpak) = which::which("flatpak") else {
            tracing::info!("Flatpak not found; no containerized Chrome to fall back on");
            exn::bail!(ErrorKind::ChromeNotFound);
        };
        tracing::trace!(flatpak = %flatpak.display(), "Searching installed Flatpak apps");
        for app_id in FLATPAK_APPS {
            if Command::new(&flatpak).args(["info", app_id]).output().is_ok_and(|o| o.status.success()) {
                tracing::debug!(app_id, "Discovered Chrome Flatpak");
                return Ok(Self::Flatpak { flatpak, app_id: app_id.to_string() });
            }
        }
        exn::bail!(ErrorKind::ChromeNotFound);
    }

    /// The executable to spawn (`argv[0]`).
    pub(crate) fn program(&self) -> &Path {
        match self {
            Self::Binary { path } => path,
            Self::Flatpak { flatpak, .. } => flatpak,
        }
    }

    /// Builds a command for this executable with `flags`, then any trailing positional arguments.
    pub(crate) fn command<F, I>(&self, flags: F, positional: I) -> Command
    where
        F: IntoIterator,
        F::Item: AsRef<OsStr>,
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        let mut command = Command::new(self.program());
        if let Self::Flatpak { app_id, .. } = self {
            command.args(["run", app_id.as_str()]);
        }
        command.args(flags);
        command.args(positional.into_iter().map(Into::into));
        command
    }
}
