//! Layered configuration for epdf.
//!
//! Values are resolved lowest to highest priority:
//!
//! 1. Built-in defaults (the same as [`Settings::default()`]).
//! 2. A config file: TOML, YAML or JSON, picked by extension. Without an
//!    explicit path, `config.toml` in the platform config directory (e.g.
//!    `~/.config/epdf/config.toml`) is used if it exists.
//! 3. Environment variables prefixed with `EPDF_`, e.g. `EPDF_MARGINS=minimum`.
//!
//! ```toml
//! executable = "/opt/electron-pdf/cli.js"
//! proxy_with_runtime = true
//! margins = "minimum"
//! timeout = 60
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use epdf_render::{Generator, MarginsMode, Settings, Xvfb};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "EPDF_";

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub executable: String,
    pub proxy_with_runtime: bool,
    pub runtime: String,
    pub graphical_environment: bool,
    pub margins: MarginsMode,
    /// Seconds before the renderer is killed; `0` waits forever.
    pub timeout: u64,
    pub display: String,
    pub display_wrapper: String,
    /// Seconds to wait for a freshly started Xvfb; `0` doesn't wait.
    pub wait_for_display: u64,
}
impl Default for Config {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            executable: settings.executable,
            proxy_with_runtime: settings.proxy_with_runtime,
            runtime: settings.runtime,
            graphical_environment: settings.graphical_environment,
            margins: settings.margins,
            timeout: settings.timeout.map_or(0, |t| t.as_secs()),
            display: settings.display,
            display_wrapper: settings.display_wrapper,
            wait_for_display: 0,
        }
    }
}
impl Config {
    /// Loads the configuration, reading `path` if given (it must exist) or
    /// the default config file if there is one.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.exists() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };
        Self::layered(file.as_deref())
    }

    /// `<platform config dir>/epdf/config.toml`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "epdf").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn layered(file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "Loading config file");
            figment = match file.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX)).extract().or_raise(|| ErrorKind::Invalid)
    }

    pub fn settings(&self) -> Settings {
        Settings::default()
            .with_executable(&self.executable)
            .with_runtime_proxy(self.proxy_with_runtime)
            .with_runtime(&self.runtime)
            .with_graphical_environment(self.graphical_environment)
            .with_margins(self.margins)
            .with_timeout(seconds(self.timeout))
            .with_display(&self.display)
            .with_display_wrapper(&self.display_wrapper)
    }

    pub fn display_server(&self) -> Xvfb {
        Xvfb::new().with_readiness_timeout(seconds(self.wait_for_display))
    }

    /// A ready-to-use generator for this configuration.
    pub fn generator(&self) -> Generator {
        Generator::new(self.settings()).with_display_server(self.display_server())
    }
}
