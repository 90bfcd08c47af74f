use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use switchyard_core::failure::ErrorKind;
use switchyard_core::{ExecutionResult, ProbeFailure, ProbeReason, ToolExecutor, ToolProber};

use crate::process::{run_command, RawRun};

// ─── CliDriver ────────────────────────────────────────────────────────────

/// The real prober/executor: talks to external binaries on PATH.
///
/// Help discovery tries the conventional forms in order and stops at the
/// first one producing non-empty output; some CLIs print help to stderr, so
/// stdout is preferred but stderr is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliDriver;

const HELP_FORMS: [&str; 2] = ["--help", "-h"];

impl CliDriver {
    pub fn new() -> Self {
        Self
    }
}

static VERSION_RE: OnceLock<Regex> = OnceLock::new();

fn version_re() -> &'static Regex {
    VERSION_RE.get_or_init(|| Regex::new(r"\d+\.\d+(?:\.\d+)?(?:[-+][0-9A-Za-z.-]+)?").unwrap())
}

fn extract_version(text: &str) -> Option<String> {
    version_re().find(text).map(|m| m.as_str().to_string())
}

// ─── ToolProber ───────────────────────────────────────────────────────────

impl ToolProber for CliDriver {
    async fn help_text(&self, bin: &str, timeout: Duration) -> Result<String, ProbeFailure> {
        if which::which(bin).is_err() {
            return Err(ProbeFailure::new(
                bin,
                ProbeReason::NotFound,
                format!("'{bin}' not found on PATH"),
            ));
        }

        for form in HELP_FORMS {
            let run = run_command(bin, &[form.to_string()], timeout)
                .await
                .map_err(|e| ProbeFailure::new(bin, ProbeReason::Spawn, e.to_string()))?;

            if run.timed_out {
                return Err(ProbeFailure::new(
                    bin,
                    ProbeReason::Timeout,
                    format!("'{bin} {form}' exceeded {}ms", timeout.as_millis()),
                ));
            }

            let text = if run.stdout.trim().is_empty() {
                run.stderr
            } else {
                run.stdout
            };
            if !text.trim().is_empty() {
                tracing::debug!(bin, form, bytes = text.len(), "help captured");
                return Ok(text);
            }
        }

        Err(ProbeFailure::new(
            bin,
            ProbeReason::EmptyOutput,
            "help invocations produced no output",
        ))
    }

    async fn installed_version(&self, bin: &str, timeout: Duration) -> Option<String> {
        let run = run_command(bin, &["--version".to_string()], timeout)
            .await
            .ok()?;
        if run.timed_out {
            return None;
        }
        extract_version(&run.stdout).or_else(|| extract_version(&run.stderr))
    }
}

// ─── ToolExecutor ─────────────────────────────────────────────────────────

impl ToolExecutor for CliDriver {
    async fn execute(
        &self,
        tool_name: &str,
        bin: &str,
        argv: &[String],
        timeout: Duration,
    ) -> ExecutionResult {
        tracing::info!(tool = tool_name, ?argv, "executing");
        match run_command(bin, argv, timeout).await {
            Ok(run) => classify(tool_name, run),
            Err(e) => ExecutionResult {
                tool_name: tool_name.to_string(),
                exit_code: None,
                stdout: String::new(),
                stderr: format!("failed to spawn '{bin}': {e}"),
                duration_ms: 0,
                success: false,
                error_kind: Some(ErrorKind::Execution),
            },
        }
    }
}

/// A zero exit code is success regardless of stderr content; a timeout and
/// a non-zero exit are failures with their respective kinds.
fn classify(tool_name: &str, run: RawRun) -> ExecutionResult {
    let success = !run.timed_out && run.exit_code == Some(0);
    let error_kind = if run.timed_out {
        Some(ErrorKind::Timeout)
    } else if success {
        None
    } else {
        Some(ErrorKind::Execution)
    };
    ExecutionResult {
        tool_name: tool_name.to_string(),
        exit_code: run.exit_code,
        stdout: run.stdout,
        stderr: run.stderr,
        duration_ms: run.duration_ms,
        success,
        error_kind,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[cfg(unix)]
    fn fake_tool(dir: &tempfile::TempDir, name: &str, script: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "#!/bin/sh").unwrap();
        write!(f, "{script}").unwrap();
        drop(f);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn probe_of_missing_binary_reports_not_found() {
        let driver = CliDriver::new();
        let err = driver
            .help_text("definitely-not-a-real-binary", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.reason, ProbeReason::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_captures_help_from_stdout() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = fake_tool(
            &dir,
            "helpful",
            "echo 'Usage: helpful [options]'\necho '  -p, --print  Print and exit'\n",
        );
        let driver = CliDriver::new();
        let text = driver.help_text(&bin, Duration::from_secs(5)).await.unwrap();
        assert!(text.contains("--print"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_accepts_help_on_stderr() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = fake_tool(&dir, "grumpy", "echo 'usage: grumpy <prompt>' >&2\nexit 1\n");
        let driver = CliDriver::new();
        let text = driver.help_text(&bin, Duration::from_secs(5)).await.unwrap();
        assert!(text.contains("usage: grumpy"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_with_no_output_reports_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = fake_tool(&dir, "silent", "exit 0\n");
        let driver = CliDriver::new();
        let err = driver
            .help_text(&bin, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.reason, ProbeReason::EmptyOutput);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn version_is_extracted_from_noise() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = fake_tool(&dir, "versioned", "echo 'versioned v2.3.1 (build abc)'\n");
        let driver = CliDriver::new();
        let version = driver
            .installed_version(&bin, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(version, "2.3.1");
    }

    #[tokio::test]
    async fn execute_success_keeps_stderr_warnings() {
        let driver = CliDriver::new();
        let argv = vec!["-c".to_string(), "echo done; echo warn >&2".to_string()];
        let result = driver
            .execute("shell", "sh", &argv, Duration::from_secs(5))
            .await;
        assert!(result.success);
        assert_eq!(result.stdout, "done");
        assert_eq!(result.stderr, "warn");
        assert!(result.error_kind.is_none());
    }

    #[tokio::test]
    async fn execute_nonzero_exit_is_execution_failure() {
        let driver = CliDriver::new();
        let argv = vec!["-c".to_string(), "echo bad >&2; exit 2".to_string()];
        let result = driver
            .execute("shell", "sh", &argv, Duration::from_secs(5))
            .await;
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(2));
        assert_eq!(result.error_kind, Some(ErrorKind::Execution));
        assert_eq!(result.stderr, "bad");
    }

    #[tokio::test]
    async fn execute_timeout_is_classified() {
        let driver = CliDriver::new();
        let argv = vec!["30".to_string()];
        let result = driver
            .execute("sleeper", "sleep", &argv, Duration::from_millis(100))
            .await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn execute_spawn_failure_is_reported_not_panicked() {
        let driver = CliDriver::new();
        let result = driver
            .execute("ghost", "definitely-not-a-real-binary", &[], Duration::from_secs(1))
            .await;
        assert!(!result.success);
        assert!(result.stderr.contains("failed to spawn"));
    }
}
