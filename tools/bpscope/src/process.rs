//! Running external programs under a wall-clock deadline.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    /// Non-zero exit code or terminated by a signal.
    Failed {
        code: Option<i32>,
        signal: Option<i32>,
    },
    /// Still running at the deadline; the process group was killed.
    TimedOut,
}

/// Result of [`run_with_timeout`].
#[derive(Debug)]
pub struct Outcome {
    pub exit: Exit,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
}

/// Run `cmd` to completion, killing it once `timeout` has elapsed.
///
/// On Unix the child leads a new process group and the whole group is
/// killed, which also stops any program the child itself started. The group
/// is killed once the child exits as well, so a leftover background process
/// cannot hold the output pipes open. Output is captured in full. Only a failure to start or wait for the process is
/// an error.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Outcome> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|err| Error::Spawn {
        program: program.clone(),
        source: err,
    })?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                kill_group(&mut child);
                break Some(status);
            }
            Ok(None) if start.elapsed() >= timeout => {
                kill_group(&mut child);
                let _ = child.wait();
                break None;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => {
                kill_group(&mut child);
                let _ = child.wait();
                return Err(Error::Spawn {
                    program,
                    source: err,
                });
            }
        }
    };
    let elapsed = start.elapsed();

    Ok(Outcome {
        exit: status.map_or(Exit::TimedOut, exit_of),
        stdout: collect(stdout),
        stderr: collect(stderr),
        elapsed,
    })
}

fn exit_of(status: ExitStatus) -> Exit {
    if status.success() {
        return Exit::Success;
    }
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;
    Exit::Failed {
        code: status.code(),
        signal,
    }
}

#[cfg(unix)]
fn kill_group(child: &mut Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions. A pid is not reused
    // while a process group with that id exists, so this only reaches the
    // child's group, or nothing once the group is empty.
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.kill();
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
