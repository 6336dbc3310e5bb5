//! Real process runner built on `std::process`.
//!
//! Drops to the requested uid/gid before exec, applies environment edits,
//! and enforces the timeout with `wait-timeout`. The child leads its own
//! process group so a timeout kills everything it spawned. Output is
//! drained on background threads, and collecting it is bounded by the same
//! deadline: descendants still holding the pipes at the deadline are killed.

use super::{CommandOutput, CommandRunner, RunOptions, RunOutcome};
use crate::error::{Error, Result};
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// How long to wait for pipes to close after killing stragglers.
const KILL_GRACE: Duration = Duration::from_secs(1);

/// Runner that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &Path, args: &[String], options: &RunOptions) -> Result<RunOutcome> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        for key in &options.env_remove {
            cmd.env_remove(key);
        }
        for (key, value) in &options.env_set {
            cmd.env(key, value);
        }
        if let Some(gid) = options.gid {
            cmd.gid(gid);
        }
        if let Some(uid) = options.uid {
            cmd.uid(uid);
        }

        let deadline = options.timeout.map(|t| Instant::now() + t);
        let mut child = cmd.spawn().map_err(|source| Error::Spawn {
            program: program.display().to_string(),
            source,
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match options.timeout {
            Some(timeout) => match child.wait_timeout(timeout)? {
                Some(status) => status,
                None => {
                    kill_group(&child);
                    let _ = child.wait();
                    return Ok(RunOutcome::TimedOut);
                }
            },
            None => child.wait()?,
        };

        let mut out = collect(stdout.as_ref(), deadline);
        let mut err = collect(stderr.as_ref(), deadline);
        if out.is_none() || err.is_none() {
            log::debug!(
                "{} exited but its descendants still hold the output; killing them",
                program.display()
            );
            kill_group(&child);
            let grace = Some(Instant::now() + KILL_GRACE);
            out = out.or_else(|| collect(stdout.as_ref(), grace));
            err = err.or_else(|| collect(stderr.as_ref(), grace));
        }

        Ok(RunOutcome::Finished(CommandOutput {
            stdout: out.unwrap_or_default(),
            stderr: err.unwrap_or_default(),
            code: status.code(),
        }))
    }
}

/// SIGKILL the child's whole process group.
fn kill_group(child: &Child) {
    if let Err(e) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
        log::debug!("killpg({}) failed: {e}", child.id());
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// Drained output, or `None` if the pipe is still open at `deadline`.
fn collect(rx: Option<&Receiver<Vec<u8>>>, deadline: Option<Instant>) -> Option<Vec<u8>> {
    let Some(rx) = rx else {
        return Some(Vec::new());
    };
    let received = match deadline {
        Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(buf) => Some(buf),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(script: &str, options: &RunOptions) -> RunOutcome {
        ProcessRunner::new()
            .run(
                Path::new("/bin/sh"),
                &["-c".to_string(), script.to_string()],
                options,
            )
            .unwrap()
    }

    #[test]
    fn test_captures_output_and_code() {
        match sh("echo out; echo err >&2; exit 3", &RunOptions::default()) {
            RunOutcome::Finished(out) => {
                assert_eq!(out.stdout_str(), "out\n");
                assert_eq!(out.stderr_str(), "err\n");
                assert_eq!(out.code, Some(3));
            }
            RunOutcome::TimedOut => panic!("unexpected timeout"),
        }
    }

    #[test]
    fn test_env_edits() {
        let options = RunOptions {
            env_set: vec![("BREWKIT_TEST_OWNER".to_string(), "alice".to_string())],
            env_remove: vec!["HOME".to_string()],
            ..Default::default()
        };
        match sh("echo \"$BREWKIT_TEST_OWNER|${HOME:-unset}\"", &options) {
            RunOutcome::Finished(out) => assert_eq!(out.stdout_str(), "alice|unset\n"),
            RunOutcome::TimedOut => panic!("unexpected timeout"),
        }
    }

    #[test]
    fn test_timeout_kills() {
        let options = RunOptions {
            timeout: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        assert_eq!(sh("sleep 5", &options), RunOutcome::TimedOut);
    }

    #[test]
    fn test_timeout_kills_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let options = RunOptions {
            timeout: Some(Duration::from_millis(300)),
            ..Default::default()
        };
        let script = format!("(sleep 1; touch '{}') & sleep 30", marker.display());

        assert_eq!(sh(&script, &options), RunOutcome::TimedOut);
        std::thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }

    #[test]
    fn test_background_descendant_does_not_extend_timeout() {
        let options = RunOptions {
            timeout: Some(Duration::from_millis(300)),
            ..Default::default()
        };
        let started = std::time::Instant::now();
        match sh("sleep 5 & echo started; exit 0", &options) {
            RunOutcome::Finished(out) => {
                assert_eq!(out.code, Some(0));
                assert_eq!(out.stdout_str(), "started\n");
            }
            RunOutcome::TimedOut => panic!("unexpected timeout"),
        }
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_large_output_does_not_block() {
        let options = RunOptions {
            timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        match sh("head -c 1000000 /dev/zero", &options) {
            RunOutcome::Finished(out) => assert_eq!(out.stdout.len(), 1_000_000),
            RunOutcome::TimedOut => panic!("unexpected timeout"),
        }
    }

    #[test]
    fn test_spawn_failure() {
        let err = ProcessRunner::new()
            .run(Path::new("/nonexistent/brew"), &[], &RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
