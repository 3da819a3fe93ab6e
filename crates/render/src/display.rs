//! Virtual displays for headless hosts.
//!
//! electron-pdf needs an X server even when it never shows a window. On hosts
//! without one, a [`DisplayServer`] makes a virtual framebuffer available
//! before the renderer starts. This is best effort: the renderer is also
//! wrapped in `xvfb-run`, which brings up its own server when it can.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Something that can make an X display available to the renderer.
pub trait DisplayServer: Send + Sync {
    /// Ensure `display` (e.g. `:99.0`) is, or is about to be, served.
    fn ensure_available(&self, display: &str) -> Result<()>;
}

/// Does nothing; for graphical hosts, or when the `xvfb-run` wrapper is
/// trusted to provide the display on its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDisplay;
impl DisplayServer for NoDisplay {
    fn ensure_available(&self, _display: &str) -> Result<()> {
        Ok(())
    }
}

/// Starts an `Xvfb` server in the background.
///
/// By default the server is launched fire-and-forget: nothing waits for it to
/// accept connections, so there is a short window where the renderer may
/// start before the display is ready. Use
/// [`with_readiness_timeout`](Self::with_readiness_timeout) to poll for the
/// server's socket instead.
#[derive(Clone, Debug)]
pub struct Xvfb {
    executable: String,
    screen: String,
    /// Where X keeps its lock files and `.X11-unix` sockets.
    runtime_dir: PathBuf,
    readiness: Option<Duration>,
}
impl Default for Xvfb {
    fn default() -> Self {
        Self {
            executable: "Xvfb".to_string(),
            screen: "1280x1024x24".to_string(),
            runtime_dir: PathBuf::from("/tmp"),
            readiness: None,
        }
    }
}
impl Xvfb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Screen geometry as `WIDTHxHEIGHTxDEPTH`.
    pub fn with_screen(mut self, screen: impl Into<String>) -> Self {
        self.screen = screen.into();
        self
    }

    pub fn with_runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = dir.into();
        self
    }

    /// Wait up to `timeout` for the server socket to appear after launching.
    pub fn with_readiness_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.readiness = timeout.into();
        self
    }

    fn lock_file(&self, server: u32) -> PathBuf {
        self.runtime_dir.join(format!(".X{server}-lock"))
    }

    fn socket(&self, server: u32) -> PathBuf {
        self.runtime_dir.join(".X11-unix").join(format!("X{server}"))
    }

    fn wait_for(&self, socket: &Path, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while !socket.exists() {
            if Instant::now() >= deadline {
                exn::bail!(ErrorKind::DisplayUnavailable(format!(
                    "{} not ready after {}ms",
                    socket.display(),
                    timeout.as_millis()
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }
}
impl DisplayServer for Xvfb {
    fn ensure_available(&self, name: &str) -> Result<()> {
        let server = server_number(name)?;
        if self.lock_file(server).exists() {
            tracing::debug!(display = name, "X server already running");
            return Ok(());
        }
        let executable = which::which(&self.executable)
            .or_raise(|| ErrorKind::DisplayUnavailable(format!("{} not found in PATH", self.executable)))?;
        let mut child = Command::new(&executable)
            .arg(format!(":{server}"))
            .args(["-screen", "0", &self.screen])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ErrorKind::DisplayUnavailable(format!("{}: {e}", executable.display())))?;
        tracing::info!(display = name, pid = child.id(), "Started virtual framebuffer");
        // Never joined. Only here to reap the server once it exits (it loses
        // the race to another instance, or the host shuts it down).
        thread::spawn(move || child.wait());
        if let Some(timeout) = self.readiness {
            self.wait_for(&self.socket(server), timeout)?;
        }
        Ok(())
    }
}

/// Extracts the server number from a display name: `:99.0` -> `99`.
fn server_number(display: &str) -> Result<u32> {
    display
        .rsplit_once(':')
        .and_then(|(_, rest)| rest.split('.').next())
        .and_then(|n| n.parse().ok())
        .ok_or_raise(|| ErrorKind::DisplayUnavailable(format!("invalid display name `{display}`")))
}
