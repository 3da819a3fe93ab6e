//! Render URLs and HTML to PDF by driving [electron-pdf].
//!
//! The renderer is an external executable; this crate only prepares its
//! inputs, builds the command line and interprets the outcome:
//!
//! - Inline HTML is staged to a temporary `.html` file, deleted again once the
//!   renderer finishes, whether it succeeded or not.
//! - Missing destination directories are created.
//! - On headless hosts a virtual X display is prepared ([`DisplayServer`]) and
//!   the renderer is wrapped in `xvfb-run`.
//! - Failures carry the full command line and the renderer's stderr.
//!
//! ```no_run
//! use epdf_render::{Generator, MarginsMode, Request, Settings};
//! # use epdf_render::error::Result;
//!
//! # fn main() -> Result<()> {
//! let generator = Generator::new(Settings::default().with_margins(MarginsMode::Minimum));
//! let request = Request::builder().from_html("<h1>Hello</h1>").to("/tmp/out/hello.pdf").build()?;
//! generator.generate(&request)?;
//!
//! let request = Request::builder().from_url("https://example.com").build()?;
//! let bytes = generator.content(&request)?;
//! assert!(bytes.starts_with(b"%PDF"));
//! # Ok(())
//! # }
//! ```
//!
//! [electron-pdf]: https://github.com/fraserxu/electron-pdf

mod command;
mod display;
pub mod error;
mod generator;
mod process;
mod request;
mod settings;

pub use crate::command::CommandLine;
pub use crate::display::{DisplayServer, NoDisplay, Xvfb};
pub use crate::generator::Generator;
pub use crate::request::{Request, RequestBuilder, Source};
pub use crate::settings::{MarginsMode, Settings};
