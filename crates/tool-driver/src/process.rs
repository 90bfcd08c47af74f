use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

// ─── RawRun ───────────────────────────────────────────────────────────────

/// The unclassified outcome of one child process run.
#[derive(Debug)]
pub(crate) struct RawRun {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

/// How long a timed-out child gets to exit after SIGTERM before SIGKILL.
const TERM_GRACE: Duration = Duration::from_secs(2);

// ─── run_command ──────────────────────────────────────────────────────────

/// Spawn `bin argv…` and wait for it under a hard timeout.
///
/// Stdin is null; all input travels as argv. Stdout and stderr are piped
/// and drained by background tasks while the child runs, so a chatty tool
/// can never fill its pipes and stall.
///
/// On timeout the child receives a graceful terminate signal, then a
/// force-kill after [`TERM_GRACE`]; the run comes back with
/// `timed_out = true` and whatever output was captured up to that point.
pub(crate) async fn run_command(
    bin: &str,
    argv: &[String],
    timeout: Duration,
) -> std::io::Result<RawRun> {
    let start = Instant::now();

    let mut cmd = Command::new(bin);
    cmd.args(argv)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;

    let (stdout_buf, stdout_task) = drain(child.stdout.take());
    let (stderr_buf, stderr_task) = drain(child.stderr.take());

    let (status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => (status.ok(), false),
        Err(_) => {
            tracing::debug!(bin, timeout_ms = timeout.as_millis() as u64, "child timed out");
            (terminate(&mut child).await, true)
        }
    };

    if let Some(task) = stdout_task {
        let _ = task.await;
    }
    if let Some(task) = stderr_task {
        let _ = task.await;
    }

    Ok(RawRun {
        exit_code: status.and_then(|s| s.code()),
        stdout: take_buf(&stdout_buf),
        stderr: take_buf(&stderr_buf),
        duration_ms: start.elapsed().as_millis() as u64,
        timed_out,
    })
}

// ─── Termination ──────────────────────────────────────────────────────────

/// Graceful-then-forced shutdown of a timed-out child.
async fn terminate(child: &mut Child) -> Option<std::process::ExitStatus> {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: pid belongs to a live child this function owns.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
        if let Ok(status) = tokio::time::timeout(TERM_GRACE, child.wait()).await {
            return status.ok();
        }
        tracing::debug!(pid, "grace window elapsed; force-killing");
    }

    let _ = child.kill().await;
    child.try_wait().ok().flatten()
}

// ─── Stream draining ──────────────────────────────────────────────────────

type SharedBuf = Arc<Mutex<String>>;

/// Drain an output stream into a shared buffer on a background task.
fn drain<R>(stream: Option<R>) -> (SharedBuf, Option<JoinHandle<()>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf: SharedBuf = Arc::new(Mutex::new(String::new()));
    let Some(stream) = stream else {
        return (buf, None);
    };

    let task = tokio::spawn({
        let buf = Arc::clone(&buf);
        async move {
            let mut reader = BufReader::new(stream).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                let mut b = buf.lock().unwrap_or_else(PoisonError::into_inner);
                if !b.is_empty() {
                    b.push('\n');
                }
                b.push_str(&line);
            }
        }
    });
    (buf, Some(task))
}

fn take_buf(buf: &SharedBuf) -> String {
    std::mem::take(&mut *buf.lock().unwrap_or_else(PoisonError::into_inner))
}

// ─── Tests ────────────────────────────────────────────────────────────────
