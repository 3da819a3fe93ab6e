mod cli;
mod error;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use epdf_config::Config;
use epdf_render::Request;
use exn::ResultExt;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

/// Logs go to stderr so a PDF written to stdout stays clean. `RUST_LOG`
/// takes precedence over `-v`.
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    cli.apply(&mut config);
    let generator = config.generator();

    let builder = Request::builder();
    let builder = if cli.html {
        builder.from_html(read_html(&cli.source)?)
    } else {
        builder.from_url(&cli.source)
    };

    match &cli.destination {
        Some(destination) => {
            let request = builder.to(destination).build().or_raise(|| ErrorKind::Render)?;
            let saved = generator.generate(&request).or_raise(|| ErrorKind::Render)?;
            tracing::info!(path = %saved.display(), "Saved PDF");
        },
        None => {
            let request = builder.build().or_raise(|| ErrorKind::Render)?;
            let pdf = generator.content(&request).or_raise(|| ErrorKind::Render)?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(&pdf).or_raise(|| ErrorKind::Output)?;
            stdout.flush().or_raise(|| ErrorKind::Output)?;
        },
    }
    Ok(())
}

fn read_html(source: &str) -> Result<String> {
    if source == "-" {
        let mut html = String::new();
        io::stdin().read_to_string(&mut html).or_raise(|| ErrorKind::Input)?;
        return Ok(html);
    }
    std::fs::read_to_string(Path::new(source)).or_raise(|| ErrorKind::Input)
}
