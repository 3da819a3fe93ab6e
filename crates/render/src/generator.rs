use crate::command::CommandLine;
use crate::display::{DisplayServer, Xvfb};
use crate::error::{ErrorKind, Result};
use crate::process;
use crate::request::{Request, Source};
use crate::settings::Settings;
use exn::ResultExt;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::instrument;

const TEMP_PREFIX: &str = "epp";

/// Runs the renderer for [`Request`]s.
///
/// A generator only holds its [`Settings`] and display server, so one
/// instance can serve any number of requests, including from several
/// threads at once.
pub struct Generator {
    settings: Settings,
    display: Box<dyn DisplayServer>,
}
impl Generator {
    /// A generator that starts `Xvfb` (fire-and-forget) on headless hosts.
    pub fn new(settings: Settings) -> Self {
        Self { settings, display: Box::new(Xvfb::default()) }
    }

    pub fn with_display_server(mut self, display: impl DisplayServer + 'static) -> Self {
        self.display = Box::new(display);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Renders the request into its destination, returning that path.
    ///
    /// Fails with [`ErrorKind::MissingDestination`] before touching anything
    /// if the request has no destination.
    pub fn generate(&self, request: &Request) -> Result<PathBuf> {
        let destination = request.require_destination()?;
        self.render(request.source(), destination)?;
        Ok(destination.to_path_buf())
    }

    /// Renders the request into a temporary file and returns its bytes. Any
    /// destination on the request is ignored.
    pub fn content(&self, request: &Request) -> Result<Vec<u8>> {
        // Created (empty) up front so the path is reserved for us; removed on drop.
        let output = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile()
            .or_raise(|| ErrorKind::Io)?
            .into_temp_path();
        self.render(request.source(), &output)?;
        fs::read(&output).or_raise(|| ErrorKind::Io)
    }

    #[instrument(skip_all, fields(destination = %destination.display()))]
    fn render(&self, source: &Source, destination: &Path) -> Result<()> {
        debug_assert!(!source.is_empty(), "RequestBuilder::build rejects empty sources");
        let (input, staged): (OsString, Option<TempPath>) = match source {
            Source::Url(url) => (url.into(), None),
            Source::Html(html) => {
                let staged = stage_html(html)?;
                (staged.as_os_str().to_os_string(), Some(staged))
            },
        };
        let outcome = self.execute(&input, destination);
        if let Some(staged) = staged {
            let path = staged.to_path_buf();
            if let Err(e) = staged.close() {
                tracing::warn!(path = %path.display(), error = %e, "Could not remove staged HTML");
            }
        }
        outcome
    }

    fn execute(&self, input: &OsStr, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).or_raise(|| ErrorKind::Io)?;
        }
        if self.settings.is_headless()
            && let Err(e) = self.display.ensure_available(&self.settings.display)
        {
            tracing::warn!(error = ?e, "Virtual display not prepared; relying on the display wrapper");
        }

        let cmd = CommandLine::build(&self.settings, input, destination);
        tracing::debug!(command = %cmd, "Running renderer");
        let finished = process::run(&cmd, self.settings.timeout)?;
        if !finished.stdout.is_empty() {
            tracing::debug!(stdout = %String::from_utf8_lossy(&finished.stdout).trim_end(), "Renderer output");
        }
        if !finished.status.success() {
            exn::bail!(ErrorKind::GenerationFailed {
                input: input.to_string_lossy().into_owned(),
                output: destination.to_path_buf(),
                command: cmd.to_string(),
                stderr: finished.stderr_lossy(),
                status: finished.status.code(),
            });
        }
        tracing::info!("PDF generated");
        Ok(())
    }
}

/// Writes inline HTML to `<tmp>/epp<random>.html`.
fn stage_html(html: &str) -> Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".html")
        .tempfile()
        .or_raise(|| ErrorKind::Io)?;
    file.write_all(html.as_bytes()).or_raise(|| ErrorKind::Io)?;
    file.flush().or_raise(|| ErrorKind::Io)?;
    tracing::debug!(path = %file.path().display(), bytes = html.len(), "Staged inline HTML");
    Ok(file.into_temp_path())
}
