use sdlc_gates_core::config::ProbeSpec;
use sdlc_gates_core::probe::{ProbeOutcome, ValidationProbe};
use std::collections::BTreeMap;
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

/// Runs each validation check as the shell command configured for it,
/// from the project root.
pub struct ShellProbe {
    root: PathBuf,
    probes: BTreeMap<String, ProbeSpec>,
}

impl ShellProbe {
    pub fn new(root: &Path, probes: BTreeMap<String, ProbeSpec>) -> Self {
        Self {
            root: root.to_path_buf(),
            probes,
        }
    }
}

impl ValidationProbe for ShellProbe {
    fn run(&self, check: &str, timeout: Duration) -> ProbeOutcome {
        let Some(spec) = self.probes.get(check) else {
            return ProbeOutcome::Unavailable {
                reason: format!("no probe configured for '{check}'"),
            };
        };
        if let Some(program) = bare_program(&spec.command) {
            if which::which(program).is_err() {
                return ProbeOutcome::Unavailable {
                    reason: format!("'{program}' not found on PATH"),
                };
            }
        }
        tracing::debug!(check, command = %spec.command, ?timeout, "running probe");
        execute(&spec.command, &self.root, timeout)
    }
}

/// First word of `command` when it names a program to look up on PATH.
/// Paths, env assignments and shell syntax are left for the shell to judge.
fn bare_program(command: &str) -> Option<&str> {
    let first = command.split_whitespace().next()?;
    let plain = first
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    plain.then_some(first)
}

/// Run `command` under `sh -c` and wait at most `timeout`.
///
/// stdout/stderr are drained on their own threads so a chatty probe cannot
/// fill a pipe and stall; the wait happens on a third thread so the timeout
/// is a plain `recv_timeout`. The shell leads its own process group, so a
/// timeout kills everything it started.
fn execute(command: &str, cwd: &Path, timeout: Duration) -> ProbeOutcome {
    let mut child = match Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .spawn()
    {
        Ok(c) => c,
        Err(e) => {
            return ProbeOutcome::Unavailable {
                reason: format!("failed to spawn: {e}"),
            }
        }
    };

    let child_pid = child.id();
    let stdout_thread = drain(child.stdout.take());
    let stderr_thread = drain(child.stderr.take());

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(child.wait());
    });

    let status = match rx.recv_timeout(timeout) {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            return ProbeOutcome::Unavailable {
                reason: format!("wait failed: {e}"),
            }
        }
        Err(_) => {
            // Readers get EOF once the killed group exits.
            kill_process_group(child_pid);
            return ProbeOutcome::TimedOut {
                after_secs: timeout.as_secs(),
            };
        }
    };

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();
    if status.success() {
        ProbeOutcome::Passed
    } else {
        let code = status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        ProbeOutcome::Failed {
            detail: format!("exit {code}: {}", tail(&stdout, &stderr)),
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut r) = pipe {
            let _ = r.read_to_string(&mut buf);
        }
        buf
    })
}

/// Last part of the combined output, for log lines.
fn tail(stdout: &str, stderr: &str) -> String {
    const MAX_DETAIL: usize = 512;
    let combined = if stderr.trim().is_empty() { stdout } else { stderr }.trim();
    if combined.len() <= MAX_DETAIL {
        return combined.to_string();
    }
    let mut start = combined.len() - MAX_DETAIL;
    while !combined.is_char_boundary(start) {
        start += 1;
    }
    combined[start..].to_string()
}

/// SIGKILL every process in the group led by `pgid`. Errors are ignored.
fn kill_process_group(pgid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg("--")
        .arg(format!("-{pgid}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}
