//! Renderer command-line construction.

use crate::settings::Settings;
use std::ffi::{OsStr, OsString};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::process::Command;

/// Flag telling `xvfb-run` to pick a free server number by itself.
pub const AUTO_SERVERNUM: &str = "--auto-servernum";

/// The full argument vector for one renderer invocation.
///
/// Order matters to the wrappers: `xvfb-run` runs whatever follows its own
/// flags, and `node` runs the script given as its first argument. Built from
/// the innermost invocation outwards:
///
/// ```text
/// [xvfb-run --auto-servernum] [node] electron-pdf <source> <destination> [--marginsType=N]
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    args: Vec<OsString>,
    /// Extra environment for the child only.
    env: Vec<(OsString, OsString)>,
}
impl CommandLine {
    pub fn build(settings: &Settings, source: impl AsRef<OsStr>, destination: impl AsRef<Path>) -> Self {
        let mut args: Vec<OsString> = vec![
            settings.executable.clone().into(),
            source.as_ref().to_os_string(),
            destination.as_ref().as_os_str().to_os_string(),
        ];
        if let Some(flag) = settings.margins.flag() {
            args.push(flag.into());
        }
        if settings.proxy_with_runtime {
            args.insert(0, settings.runtime.clone().into());
        }
        let mut env = Vec::new();
        if settings.is_headless() {
            let mut wrapped: Vec<OsString> = vec![settings.display_wrapper.clone().into(), AUTO_SERVERNUM.into()];
            wrapped.append(&mut args);
            args = wrapped;
            env.push(("DISPLAY".into(), settings.display.clone().into()));
        }
        Self { args, env }
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn env(&self) -> &[(OsString, OsString)] {
        &self.env
    }

    /// The program that is actually executed (the outermost wrapper).
    pub fn program(&self) -> &OsStr {
        // Infallible: build() always pushes the executable, source and destination.
        &self.args[0]
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(self.program());
        command.args(&self.args[1..]);
        command.envs(self.env.iter().map(|(k, v)| (k, v)));
        command
    }
}
impl Display for CommandLine {
    /// Renders the argument vector as a shell-escaped command line, for error
    /// messages and logs. Never fed back to a shell.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&shell_quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}

fn shell_quote(arg: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "-_./:=,@%+".contains(c);
    if !arg.is_empty() && arg.chars().all(safe) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MarginsMode;
    use rstest::rstest;

    fn args(cmd: &CommandLine) -> Vec<String> {
        cmd.args().iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn everything_enabled() {
        let settings = Settings::default()
            .with_runtime_proxy(true)
            .with_graphical_environment(false)
            .with_margins(MarginsMode::Minimum);
        let cmd = CommandLine::build(&settings, "https://example.com", "/out/file.pdf");
        assert_eq!(
            args(&cmd),
            [
                "xvfb-run",
                "--auto-servernum",
                "node",
                "electron-pdf",
                "https://example.com",
                "/out/file.pdf",
                "--marginsType=2"
            ]
        );
    }

    #[rstest]
    #[case(false, false)]
    #[case(false, true)]
    #[case(true, false)]
    #[case(true, true)]
    fn no_margins_never_adds_flag(#[case] proxy: bool, #[case] graphical: bool) {
        let settings = Settings::default()
            .with_runtime_proxy(proxy)
            .with_graphical_environment(graphical)
            .with_margins(MarginsMode::None);
        let cmd = CommandLine::build(&settings, "https://example.com", "/out/file.pdf");
        assert!(!args(&cmd).iter().any(|a| a.starts_with("--marginsType")));
    }

    #[rstest]
    #[case(false, false, MarginsMode::Default, &["electron-pdf", "in.html", "out.pdf", "--marginsType=0"])]
    #[case(true, false, MarginsMode::None, &["node", "electron-pdf", "in.html", "out.pdf"])]
    #[case(false, true, MarginsMode::None, &["xvfb-run", "--auto-servernum", "electron-pdf", "in.html", "out.pdf"])]
    fn prefixes_and_flags(
        #[case] proxy: bool,
        #[case] headless: bool,
        #[case] margins: MarginsMode,
        #[case] expected: &[&str],
    ) {
        let settings = Settings::default()
            .with_runtime_proxy(proxy)
            .with_graphical_environment(!headless)
            .with_margins(margins);
        assert_eq!(args(&CommandLine::build(&settings, "in.html", "out.pdf")), expected);
    }

    #[test]
    fn display_only_set_when_headless() {
        let headless = CommandLine::build(&Settings::default(), "a", "b");
        assert_eq!(headless.env(), [(OsString::from("DISPLAY"), OsString::from(":99.0"))]);

        let graphical = CommandLine::build(&Settings::default().with_graphical_environment(true), "a", "b");
        assert!(graphical.env().is_empty());
    }

    #[test]
    fn to_command_uses_outermost_program() {
        let cmd = CommandLine::build(&Settings::default().with_runtime_proxy(true), "a", "b");
        let command = cmd.to_command();
        assert_eq!(command.get_program(), "xvfb-run");
        let rest: Vec<_> = command.get_args().collect();
        assert_eq!(rest, ["--auto-servernum", "node", "electron-pdf", "a", "b"]);
        assert!(command.get_envs().any(|(k, v)| k == "DISPLAY" && v == Some(OsStr::new(":99.0"))));
    }

    #[test]
    fn display_is_shell_escaped() {
        let settings = Settings::default().with_graphical_environment(true);
        let cmd = CommandLine::build(&settings, "/tmp/my page.html", "/out/it's.pdf");
        assert_eq!(cmd.to_string(), r"electron-pdf '/tmp/my page.html' '/out/it'\''s.pdf'");
    }
}
