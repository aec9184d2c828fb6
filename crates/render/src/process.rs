//! Blocking subprocess execution with captured output and an optional deadline.

use crate::error::ProcessFailure;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub(crate) enum Failure {
    /// The process could not be started, or exited unsuccessfully.
    Process(ProcessFailure),
    /// The deadline passed; the process has been killed.
    Timeout(Duration),
}

/// Output of a successful run.
pub(crate) struct Captured {
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

/// Human-readable command line, for logs and diagnostics.
pub(crate) fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `command` to completion, waiting at most `timeout` if one is given.
pub(crate) fn run(command: &mut Command, timeout: Option<Duration>) -> Result<Captured, Failure> {
    let description = describe(command);
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn().map_err(|e| Failure::Process(ProcessFailure::not_started(description.clone(), &e)))?;
    // Drain both pipes off-thread; a full pipe buffer would otherwise stall the child forever.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match timeout {
        None => child.wait(),
        Some(limit) => match wait_until(&mut child, Instant::now() + limit) {
            Ok(Some(status)) => Ok(status),
            Ok(None) => {
                tracing::warn!(command = %description, timeout_ms = limit.as_millis(), "Killing unresponsive process");
                let _ = child.kill();
                let _ = child.wait();
                // Grandchildren may still hold the pipes open, so the reader threads are left detached.
                return Err(Failure::Timeout(limit));
            },
            Err(e) => Err(e),
        },
    };
    let status = status.map_err(|e| Failure::Process(ProcessFailure::not_started(description.clone(), &e)))?;
    let stdout = collect(stdout);
    let stderr = collect(stderr);
    if status.success() {
        return Ok(Captured { stdout, stderr });
    }
    Err(Failure::Process(ProcessFailure { command: description, exit_code: status.code(), stdout, stderr }))
}

fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            // Whatever was read before an error is still useful for diagnostics.
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    })
}

fn collect(handle: JoinHandle<Vec<u8>>) -> String {
    let bytes = handle.join().unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut command = Command::new("/bin/sh");
        command.args(["-c", script]);
        command
    }

    #[test]
    fn test_describe() {
        let mut command = Command::new("chrome");
        command.args(["--headless", "--print-to-pdf=/tmp/out.pdf", "/tmp/in.html"]);
        assert_eq!(describe(&command), "chrome --headless --print-to-pdf=/tmp/out.pdf /tmp/in.html");
    }

    #[test]
    fn test_success_captures_stdout() {
        let Ok(captured) = run(&mut sh("echo hello; echo oops >&2"), None) else {
            panic!("expected success");
        };
        assert_eq!(captured.stdout, "hello\n");
        assert_eq!(captured.stderr, "oops\n");
    }

    #[test]
    fn test_failure_captures_exit_code_and_stderr() {
        let Err(Failure::Process(failure)) = run(&mut sh("echo partial; echo broken >&2; exit 3"), None) else {
            panic!("expected process failure");
        };
        assert_eq!(failure.exit_code, Some(3));
        assert_eq!(failure.stdout, "partial\n");
        assert_eq!(failure.stderr, "broken\n");
        assert!(failure.command.starts_with("/bin/sh -c"));
    }

    #[test]
    fn test_spawn_failure() {
        let Err(Failure::Process(failure)) = run(&mut Command::new("/definitely/not/a/binary"), None) else {
            panic!("expected spawn failure");
        };
        assert_eq!(failure.exit_code, None);
        assert!(!failure.stderr.is_empty());
    }

    #[test]
    fn test_timeout_kills_process() {
        let started = Instant::now();
        let result = run(&mut sh("exec sleep 5"), Some(Duration::from_millis(100)));
        assert!(matches!(result, Err(Failure::Timeout(limit)) if limit == Duration::from_millis(100)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_timeout_not_reached() {
        assert!(run(&mut sh("exit 0"), Some(Duration::from_secs(10))).is_ok());
    }
}
