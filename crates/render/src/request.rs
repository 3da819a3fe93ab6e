//! Conversion requests.
//!
//! A [`Request`] is an immutable description of one conversion: what to
//! render and (optionally) where to save it. Requests are assembled with
//! [`RequestBuilder`], which validates the source up front so an invalid
//! request can never reach the renderer.

use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};

/// What to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// Anything the renderer can load itself: a URL or a local file path.
    Url(String),
    /// Inline HTML; staged to a temporary file before rendering.
    Html(String),
}
impl Source {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Url(s) | Self::Html(s) => s.is_empty(),
        }
    }
}

/// An immutable, validated conversion request.
///
/// ```
/// use epdf_render::Request;
///
/// let request = Request::builder()
///     .from_url("https://example.com")
///     .to("/tmp/out/example.pdf")
///     .build()
///     .unwrap();
/// assert!(request.destination().is_some());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    source: Source,
    destination: Option<PathBuf>,
}
impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    /// The destination for file-mode generation, failing with
    /// [`ErrorKind::MissingDestination`] if there isn't one.
    pub(crate) fn require_destination(&self) -> Result<&Path> {
        match self.destination() {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => exn::bail!(ErrorKind::MissingDestination),
        }
    }
}

/// Collects the parts of a [`Request`].
///
/// URL and HTML sources are mutually exclusive: whichever setter is called
/// last replaces the other.
#[derive(Clone, Debug, Default)]
pub struct RequestBuilder {
    source: Option<Source>,
    destination: Option<PathBuf>,
}
impl RequestBuilder {
    /// Render a URL or a file path the renderer can open directly.
    pub fn from_url(mut self, url: impl Into<String>) -> Self {
        self.source = Some(Source::Url(url.into()));
        self
    }

    /// Render inline HTML.
    pub fn from_html(mut self, html: impl Into<String>) -> Self {
        self.source = Some(Source::Html(html.into()));
        self
    }

    /// Where the PDF should be saved. Not needed when only the content is wanted.
    pub fn to(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Returns [`ErrorKind::MissingSource`] if no (non-empty) source was set.
    pub fn build(self) -> Result<Request> {
        match self.source {
            Some(source) if !source.is_empty() => Ok(Request { source, destination: self.destination }),
            _ => exn::bail!(ErrorKind::MissingSource),
        }
    }
}
