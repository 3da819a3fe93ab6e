//! Synchronous child-process execution with an optional deadline.

use crate::command::CommandLine;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{self, Read};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Everything observable about a finished renderer run.
#[derive(Debug)]
pub(crate) struct Finished {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}
impl Finished {
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim_end().to_string()
    }
}

enum Stream {
    Stdout,
    Stderr,
}

type Chunk = (Stream, io::Result<Vec<u8>>);

/// Runs `cmd` to completion, capturing both output streams.
///
/// Both pipes are drained on their own threads while the child is polled, so
/// a renderer that writes a lot to either stream cannot deadlock against us.
///
/// The child leads its own process group. `xvfb-run`, `node` and electron all
/// fork, and those descendants inherit the pipes; the run only counts as done
/// once the pipes close. If `timeout` elapses first, for the child or for its
/// descendants, the whole group is killed and [`ErrorKind::Timeout`] returned.
pub(crate) fn run(cmd: &CommandLine, timeout: Option<Duration>) -> Result<Finished> {
    let mut command = cmd.to_command();
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .or_raise(|| ErrorKind::Spawn(cmd.program().to_string_lossy().into_owned()))?;
    tracing::debug!(pid = child.id(), "Renderer started");

    let deadline = timeout.map(|t| Instant::now() + t);
    let (tx, rx) = mpsc::channel();
    drain(Stream::Stdout, child.stdout.take(), tx.clone());
    drain(Stream::Stderr, child.stderr.take(), tx);

    let timed_out = |child: &mut Child| {
        terminate(child);
        let timeout = timeout.unwrap_or_default();
        tracing::warn!(timeout_secs = timeout.as_secs_f32(), "Renderer timed out and was killed");
        ErrorKind::Timeout { command: cmd.to_string(), timeout }
    };

    let status = match wait(&mut child, deadline) {
        Ok(Some(status)) => status,
        Ok(None) => exn::bail!(timed_out(&mut child)),
        Err(e) => {
            terminate(&mut child);
            return Err(e);
        },
    };

    let (mut stdout, mut stderr) = (None, None);
    while stdout.is_none() || stderr.is_none() {
        match receive(&rx, deadline) {
            Ok((Stream::Stdout, output)) => stdout = Some(output.or_raise(|| ErrorKind::Io)?),
            Ok((Stream::Stderr, output)) => stderr = Some(output.or_raise(|| ErrorKind::Io)?),
            // Only descendants can still be holding the pipes open.
            Err(RecvTimeoutError::Timeout) => exn::bail!(timed_out(&mut child)),
            Err(RecvTimeoutError::Disconnected) => exn::bail!(ErrorKind::Io),
        }
    }

    Ok(Finished {
        status,
        stdout: stdout.unwrap_or_default(),
        stderr: stderr.unwrap_or_default(),
    })
}

/// `Ok(None)` means the deadline passed with the child still running.
fn wait(child: &mut Child, deadline: Option<Instant>) -> Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return Ok(Some(child.wait().or_raise(|| ErrorKind::Io)?));
    };
    loop {
        if let Some(status) = child.try_wait().or_raise(|| ErrorKind::Io)? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn receive(rx: &Receiver<Chunk>, deadline: Option<Instant>) -> std::result::Result<Chunk, RecvTimeoutError> {
    match deadline {
        Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    }
}

/// Kills the child's whole process group, then reaps the child itself.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;
        // The group outlives its leader for as long as any member is alive.
        if let Ok(pgid) = i32::try_from(child.id())
            && let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL)
        {
            tracing::debug!(error = %e, "Renderer process group already gone");
        }
    }
    // Killing can race with the child exiting on its own; either way it's
    // gone once wait() returns.
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(stream: Stream, pipe: Option<R>, tx: Sender<Chunk>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        // The receiver is gone if the run already timed out.
        let _ = tx.send((stream, result));
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use std::fs;
    use std::path::Path;
    use std::process::Command;

    fn sh(script: &str) -> CommandLine {
        // Runs `sh -c <script> <destination>`; the script doubles as the "source".
        let settings = Settings::default().with_executable("sh").with_graphical_environment(true);
        CommandLine::build(&settings, "-c", script)
    }

    fn is_alive(pid: &str) -> bool {
        if let Ok(stat) = fs::read_to_string(format!("/proc/{pid}/stat")) {
            // Zombies are dead, just not reaped yet.
            return !stat.rsplit_once(')').is_some_and(|(_, rest)| rest.trim_start().starts_with('Z'));
        }
        if Path::new("/proc/self").exists() {
            return false;
        }
        Command::new("kill").args(["-0", pid]).stderr(Stdio::null()).status().is_ok_and(|s| s.success())
    }

    #[test]
    fn captures_output_and_status() {
        let finished = run(&sh("echo out; echo err >&2; exit 3"), Some(Duration::from_secs(10))).unwrap();
        assert_eq!(finished.status.code(), Some(3));
        assert_eq!(finished.stdout, b"out\n");
        assert_eq!(finished.stderr_lossy(), "err");
    }

    #[test]
    fn waits_without_timeout() {
        let finished = run(&sh("exit 0"), None).unwrap();
        assert!(finished.status.success());
    }

    #[test]
    fn large_output_does_not_deadlock() {
        let script = "i=0; while [ $i -lt 20000 ]; do echo 'some fairly chatty renderer output' >&2; i=$((i+1)); done";
        let finished = run(&sh(script), Some(Duration::from_secs(30))).unwrap();
        assert!(finished.status.success());
        assert!(finished.stderr.len() > 65536);
    }

    #[test]
    fn timeout_kills_child() {
        let started = Instant::now();
        let err = run(&sh("sleep 30"), Some(Duration::from_millis(200))).unwrap_err();
        assert!(matches!(*err, ErrorKind::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn descendants_holding_pipes_are_bound_by_timeout() {
        let started = Instant::now();
        let err = run(&sh("sleep 30 & exit 0"), Some(Duration::from_millis(500))).unwrap_err();
        assert!(matches!(*err, ErrorKind::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn timeout_kills_the_whole_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pid");
        // The grandchild doesn't hold our pipes, so only the group kill reaches it.
        let script = format!("sleep 30 >/dev/null 2>&1 & echo $! > '{}'; wait", pidfile.display());
        let err = run(&sh(&script), Some(Duration::from_millis(500))).unwrap_err();
        assert!(matches!(*err, ErrorKind::Timeout { .. }));

        let pid = fs::read_to_string(&pidfile).unwrap();
        let pid = pid.trim();
        let deadline = Instant::now() + Duration::from_secs(5);
        while is_alive(pid) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(50));
        }
        assert!(!is_alive(pid), "grandchild {pid} survived the timeout");
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let settings = Settings::default().with_executable("definitely-not-electron-pdf").with_graphical_environment(true);
        let err = run(&CommandLine::build(&settings, "a", "b"), None).unwrap_err();
        assert!(matches!(*err, ErrorKind::Spawn(_)));
    }
}
