use clap::{ArgAction, Parser, ValueEnum};
use epdf_config::Config;
use epdf_render::MarginsMode;
use std::path::PathBuf;

/// Convert a URL, a file or inline HTML to PDF with electron-pdf.
#[derive(Debug, Parser)]
#[command(name = "epdf", version)]
pub struct Cli {
    /// URL or file to convert. With --html, a file containing HTML (`-` reads stdin).
    pub source: String,
    /// Where to save the PDF. Written to stdout when omitted.
    pub destination: Option<PathBuf>,
    /// Treat SOURCE as HTML content to read rather than something to load.
    #[arg(long)]
    pub html: bool,
    /// Config file (TOML, YAML or JSON).
    #[arg(short, long, env = "EPDF_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Renderer executable.
    #[arg(long)]
    pub executable: Option<String>,
    /// Run the renderer through node (`--proxy-with-runtime=false` to turn off).
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub proxy_with_runtime: Option<bool>,
    /// The host has an X display; don't wrap the renderer in xvfb-run
    /// (`--graphical=false` to force the wrapper).
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub graphical: Option<bool>,
    #[arg(long, value_enum)]
    pub margins: Option<Margins>,
    /// Kill the renderer after this many seconds (0 waits forever).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// More logging; repeat for more detail.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
impl Cli {
    /// Command-line flags win over everything in the config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(executable) = &self.executable {
            config.executable = executable.clone();
        }
        if let Some(proxy) = self.proxy_with_runtime {
            config.proxy_with_runtime = proxy;
        }
        if let Some(graphical) = self.graphical {
            config.graphical_environment = graphical;
        }
        if let Some(margins) = self.margins {
            config.margins = margins.into();
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Margins {
    Default,
    None,
    Minimum,
}
impl From<Margins> for MarginsMode {
    fn from(value: Margins) -> Self {
        match value {
            Margins::Default => MarginsMode::Default,
            Margins::None => MarginsMode::None,
            Margins::Minimum => MarginsMode::Minimum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn source_only() {
        let cli = Cli::try_parse_from(["epdf", "https://example.com"]).unwrap();
        assert_eq!(cli.source, "https://example.com");
        assert_eq!(cli.destination, None);
        assert!(!cli.html);
    }

    #[test]
    fn source_is_required() {
        assert!(Cli::try_parse_from(["epdf"]).is_err());
    }

    #[rstest]
    #[case("default", MarginsMode::Default)]
    #[case("none", MarginsMode::None)]
    #[case("minimum", MarginsMode::Minimum)]
    fn margins(#[case] value: &str, #[case] expected: MarginsMode) {
        let cli = Cli::try_parse_from(["epdf", "--margins", value, "in.html", "out.pdf"]).unwrap();
        assert_eq!(cli.margins.map(MarginsMode::from), Some(expected));
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "epdf",
            "--executable",
            "/opt/electron-pdf",
            "--proxy-with-runtime",
            "--graphical",
            "--margins",
            "minimum",
            "--timeout",
            "0",
            "-vv",
            "in.html",
            "out.pdf",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.executable, "/opt/electron-pdf");
        assert!(config.proxy_with_runtime);
        assert!(config.graphical_environment);
        assert_eq!(config.margins, MarginsMode::Minimum);
        assert_eq!(config.timeout, 0);
        assert_eq!(cli.verbose, 2);
    }

    #[rstest]
    #[case(&[], None)]
    #[case(&["--graphical"], Some(true))]
    #[case(&["--graphical=true"], Some(true))]
    #[case(&["--graphical=false"], Some(false))]
    fn boolean_flags(#[case] flags: &[&str], #[case] expected: Option<bool>) {
        let args = ["epdf"].iter().chain(flags).chain(&["in.html", "out.pdf"]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.graphical, expected);
    }

    #[test]
    fn flags_can_switch_config_off() {
        let cli =
            Cli::try_parse_from(["epdf", "--proxy-with-runtime=false", "--graphical=false", "in.html"]).unwrap();
        let mut config = Config { proxy_with_runtime: true, graphical_environment: true, ..Config::default() };
        cli.apply(&mut config);
        assert!(!config.proxy_with_runtime);
        assert!(!config.graphical_environment);
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let cli = Cli::try_parse_from(["epdf", "in.html"]).unwrap();
        let mut config = Config { timeout: 42, proxy_with_runtime: true, ..Config::default() };
        cli.apply(&mut config);
        assert_eq!(config, Config { timeout: 42, proxy_with_runtime: true, ..Config::default() });
    }
}
