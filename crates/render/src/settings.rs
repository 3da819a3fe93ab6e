//! Renderer settings.
//!
//! [`Settings`] are fixed for the lifetime of a [`Generator`](crate::Generator)
//! and describe *how* to invoke the renderer, never *what* to render.

use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_EXECUTABLE: &str = "electron-pdf";
pub const DEFAULT_RUNTIME: &str = "node";
pub const DEFAULT_DISPLAY: &str = ":99.0";
pub const DEFAULT_DISPLAY_WRAPPER: &str = "xvfb-run";
/// electron-pdf has no upper bound of its own; a page that never finishes
/// loading would otherwise block the caller forever.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Page margins as understood by electron-pdf's `--marginsType` flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginsMode {
    /// The renderer's default margins (`--marginsType=0`).
    Default,
    /// No margins at all (`--marginsType=1`). This is also what electron-pdf
    /// does without the flag, so it is never passed explicitly.
    #[default]
    None,
    /// Minimum printable margins (`--marginsType=2`).
    Minimum,
}
impl MarginsMode {
    pub fn as_flag_value(&self) -> u8 {
        match self {
            Self::Default => 0,
            Self::None => 1,
            Self::Minimum => 2,
        }
    }

    /// The command-line flag for this mode, if one needs to be passed.
    pub fn flag(&self) -> Option<String> {
        match self {
            Self::None => None,
            other => Some(format!("--marginsType={}", other.as_flag_value())),
        }
    }
}

/// How the renderer is invoked.
///
/// Start from [`Settings::default()`] and override what differs; every field
/// has a sensible default so partial configuration merges over the defaults.
///
/// ```
/// use epdf_render::{MarginsMode, Settings};
///
/// let settings = Settings::default()
///     .with_runtime_proxy(true)
///     .with_margins(MarginsMode::Minimum);
/// assert_eq!(settings.executable, "electron-pdf");
/// assert!(!settings.graphical_environment);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Renderer executable name or path.
    pub executable: String,
    /// Invoke the renderer through [`runtime`](Self::runtime). Needed on some
    /// hosts where the renderer's shebang fails with `env: node: command not found`.
    pub proxy_with_runtime: bool,
    pub runtime: String,
    /// When `false`, the renderer is wrapped in a virtual display.
    pub graphical_environment: bool,
    pub margins: MarginsMode,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    /// Value of `DISPLAY` handed to the renderer on headless hosts.
    pub display: String,
    /// Launcher that provides a virtual X server for the renderer.
    pub display_wrapper: String,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            proxy_with_runtime: false,
            runtime: DEFAULT_RUNTIME.to_string(),
            graphical_environment: false,
            margins: MarginsMode::default(),
            timeout: Some(DEFAULT_TIMEOUT),
            display: DEFAULT_DISPLAY.to_string(),
            display_wrapper: DEFAULT_DISPLAY_WRAPPER.to_string(),
        }
    }
}
impl Settings {
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn with_runtime_proxy(mut self, enabled: bool) -> Self {
        self.proxy_with_runtime = enabled;
        self
    }

    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    pub fn with_graphical_environment(mut self, graphical: bool) -> Self {
        self.graphical_environment = graphical;
        self
    }

    pub fn with_margins(mut self, margins: MarginsMode) -> Self {
        self.margins = margins;
        self
    }

    pub fn with_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    pub fn with_display_wrapper(mut self, wrapper: impl Into<String>) -> Self {
        self.display_wrapper = wrapper.into();
        self
    }

    /// Whether the renderer needs a virtual display to run.
    pub fn is_headless(&self) -> bool {
        !self.graphical_environment
    }
}
