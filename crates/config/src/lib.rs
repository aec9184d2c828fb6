//! Configuration loading for chromepdf.
//!
//! Sources are layered with [`figment`], later ones overriding earlier ones:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. the per-user file at [`default_path`], if it exists,
//! 3. an explicitly requested file (TOML, YAML or JSON, chosen by extension),
//! 4. environment variables prefixed with [`ENV_PREFIX`], nested with `__`
//!    (e.g. `CHROMEPDF_CHROME__BINARY=/usr/bin/chromium`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "CHROMEPDF_";
const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub chrome: ChromeConfig,
}

/// How to find and run Chrome.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChromeConfig {
    /// Chrome executable; discovered on the system when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<PathBuf>,
    /// Where staging and auto-named output files go; the platform temp directory when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    /// Seconds before an unresponsive Chrome is killed. No limit when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Extra flags for every invocation. An empty value means a bare `--flag`.
    pub options: BTreeMap<String, String>,
}
impl ChromeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Configured flags, with empty values mapped to `None`.
    pub fn options(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.options.iter().map(|(name, value)| (name.as_str(), Some(value.as_str()).filter(|v| !v.is_empty())))
    }
}

impl Config {
    /// Loads configuration from every source, see the [crate docs](crate).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(explicit)?.extract().or_raise(|| ErrorKind::Invalid)?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// The layered [`Figment`] that [`load`](Self::load) extracts from.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = default_path().filter(|path| path.is_file()) {
            tracing::trace!(path = %path.display(), "Merging user configuration file");
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }
}

/// Per-user configuration file, e.g. `~/.config/chromepdf/config.toml` on Linux.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "chromepdf").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
