//! The routing orchestrator.
//!
//! Drives one task through `Scoring → Synthesizing → Executing`, falling
//! back to a tool's configured partner exactly once per task, and dispatches
//! batches of subtasks concurrently under non-blocking resource locks.
//!
//! Failure discipline: a probe failure degrades to the built-in template
//! (never fatal); a synthesis failure skips that candidate only; an
//! execution failure or timeout triggers the single fallback step; only
//! `Exhausted` ends the whole task, surfacing the last result verbatim.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::CapabilityCache;
use crate::error::{Result, RouterError};
use crate::exec::{ExecutionResult, ToolExecutor};
use crate::failure::{ErrorKind, FailureLog, FailureRecord};
use crate::locks::ResourceLocks;
use crate::probe::ToolProber;
use crate::registry::{ToolRegistry, ToolSpec};
use crate::scorer::{self, ScoreParams};
use crate::synth;
use crate::task::{Subtask, Task};

// ---------------------------------------------------------------------------
// RouterConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Hard timeout for one external tool execution.
    pub exec_timeout: Duration,
    /// Concurrently running subtasks in `dispatch`.
    pub max_parallel: usize,
    pub score: ScoreParams,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            exec_timeout: Duration::from_secs(300),
            max_parallel: 3,
            score: ScoreParams::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// RouteOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStage {
    Scoring,
    Synthesizing,
    Executing,
}

impl RouteStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStage::Scoring => "scoring",
            RouteStage::Synthesizing => "synthesizing",
            RouteStage::Executing => "executing",
        }
    }
}

impl fmt::Display for RouteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub tool_name: String,
    pub stage: RouteStage,
    pub detail: String,
}

/// What the caller gets back from a routed task: the (possibly failed)
/// execution result plus the attempt trail that led to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteOutcome {
    pub tool_name: String,
    pub result: ExecutionResult,
    pub fallback_used: bool,
    /// True when the result is a failure and no fallback remains.
    pub exhausted: bool,
    pub attempts: Vec<AttemptRecord>,
}

// ---------------------------------------------------------------------------
// Dispatch reporting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubtaskStatus {
    Completed(Box<RouteOutcome>),
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskReport {
    pub subtask_id: Uuid,
    pub prompt: String,
    #[serde(flatten)]
    pub status: SubtaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub reports: Vec<SubtaskReport>,
}

impl DispatchSummary {
    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, SubtaskStatus::Completed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, SubtaskStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, SubtaskStatus::Failed { .. }))
    }

    fn count(&self, pred: fn(&SubtaskStatus) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.status)).count()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct Router<P, E> {
    registry: ToolRegistry,
    cache: CapabilityCache<P>,
    executor: E,
    failures: FailureLog,
    locks: ResourceLocks,
    config: RouterConfig,
}

impl<P: ToolProber, E: ToolExecutor> Router<P, E> {
    pub fn new(
        registry: ToolRegistry,
        cache: CapabilityCache<P>,
        executor: E,
        failures: FailureLog,
        config: RouterConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            executor,
            failures,
            locks: ResourceLocks::new(),
            config,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CapabilityCache<P> {
        &self.cache
    }

    pub fn failures(&self) -> &FailureLog {
        &self.failures
    }

    /// Route a single task with the configured execution timeout.
    pub async fn route(&self, task: &Task) -> Result<RouteOutcome> {
        self.route_with_timeout(task, self.config.exec_timeout).await
    }

    /// Dispatch subtasks concurrently, bounded by `max_parallel`.
    ///
    /// Each subtask must acquire all its resource locks before executing;
    /// on conflict it is skipped immediately, never queued. An overall
    /// deadline shrinks each subtask's execution timeout.
    pub async fn dispatch(
        &self,
        subtasks: Vec<Subtask>,
        overall_timeout: Option<Duration>,
    ) -> DispatchSummary {
        let deadline = overall_timeout.map(|t| tokio::time::Instant::now() + t);
        let reports = futures::stream::iter(
            subtasks
                .into_iter()
                .map(|subtask| self.run_subtask(subtask, deadline)),
        )
        .buffered(self.config.max_parallel.max(1))
        .collect::<Vec<_>>()
        .await;

        DispatchSummary { reports }
    }

    // -----------------------------------------------------------------------
    // Subtask driving
    // -----------------------------------------------------------------------

    async fn run_subtask(
        &self,
        subtask: Subtask,
        deadline: Option<tokio::time::Instant>,
    ) -> SubtaskReport {
        let prompt = subtask.task.raw_prompt.clone();
        let report = |status| SubtaskReport {
            subtask_id: subtask.id,
            prompt: prompt.clone(),
            status,
        };

        let exec_timeout = match deadline {
            Some(deadline) => {
                let now = tokio::time::Instant::now();
                if now >= deadline {
                    return report(SubtaskStatus::Skipped {
                        reason: "task deadline exceeded".into(),
                    });
                }
                self.config.exec_timeout.min(deadline - now)
            }
            None => self.config.exec_timeout,
        };

        // All-or-nothing, non-blocking: a conflict means skip, not wait.
        let _locks = match self.locks.try_acquire(subtask.id, &subtask.required_resources) {
            Ok(locks) => locks,
            Err(conflict) => {
                tracing::info!(subtask = %subtask.id, %conflict, "subtask skipped");
                return report(SubtaskStatus::Skipped {
                    reason: conflict.to_string(),
                });
            }
        };

        match self.route_with_timeout(&subtask.task, exec_timeout).await {
            Ok(outcome) => report(SubtaskStatus::Completed(Box::new(outcome))),
            Err(e) => report(SubtaskStatus::Failed {
                error: e.to_string(),
            }),
        }
        // _locks drops here; released on success, failure, and timeout alike
    }

    // -----------------------------------------------------------------------
    // The pipeline
    // -----------------------------------------------------------------------

    async fn route_with_timeout(&self, task: &Task, exec_timeout: Duration) -> Result<RouteOutcome> {
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut queue = self.candidate_queue(task, &mut attempts).await?;

        let mut fallback_used = false;
        let mut last_result: Option<ExecutionResult> = None;

        while let Some(name) = queue.pop_front() {
            let Some(spec) = self.registry.get(&name) else {
                continue;
            };

            tracing::debug!(tool = %name, "state: synthesizing");
            let model = self.cache.get(spec, &self.failures).await?;
            let synthesis = match synth::synthesize(task, &model) {
                Ok(s) => s,
                Err(e) => {
                    // Fatal for this candidate only
                    let record = FailureRecord::new(
                        &name,
                        spec.bin_name(),
                        ErrorKind::Synthesis,
                        e.to_string(),
                    );
                    if let Err(log_err) = self.failures.append(&record) {
                        tracing::warn!(error = %log_err, "failed to append failure record");
                    }
                    attempts.push(AttemptRecord {
                        tool_name: name.clone(),
                        stage: RouteStage::Synthesizing,
                        detail: e.to_string(),
                    });
                    continue;
                }
            };

            tracing::debug!(tool = %name, format = synthesis.format, "state: executing");
            let result = self
                .executor
                .execute(&name, spec.bin_name(), &synthesis.argv, exec_timeout)
                .await;
            attempts.push(AttemptRecord {
                tool_name: name.clone(),
                stage: RouteStage::Executing,
                detail: match result.exit_code {
                    Some(code) => format!("exit code {code}"),
                    None => "no exit code".into(),
                },
            });

            if result.success {
                tracing::debug!(tool = %name, "state: succeeded");
                return Ok(RouteOutcome {
                    tool_name: name,
                    result,
                    fallback_used,
                    exhausted: false,
                    attempts,
                });
            }

            let kind = result.error_kind.unwrap_or(ErrorKind::Execution);
            let record = FailureRecord::new(
                &name,
                format!("{} {}", spec.bin_name(), synthesis.argv.join(" ")),
                kind,
                truncated(&result.stderr, 500),
            );
            if let Err(log_err) = self.failures.append(&record) {
                tracing::warn!(error = %log_err, "failed to append failure record");
            }

            // One fallback step per task, never more
            if !fallback_used {
                if let Some(partner) = spec.fallback.as_deref() {
                    if self
                        .registry
                        .get(partner)
                        .is_some_and(|p| self.cache.is_installed(p))
                    {
                        tracing::info!(from = %name, to = %partner, "state: falling back");
                        fallback_used = true;
                        queue.clear();
                        queue.push_back(partner.to_string());
                        last_result = Some(result);
                        continue;
                    }
                }
            }

            last_result = Some(result);
            break;
        }

        tracing::debug!("state: exhausted");
        match last_result {
            Some(result) => Ok(RouteOutcome {
                tool_name: result.tool_name.clone(),
                result,
                fallback_used,
                exhausted: true,
                attempts,
            }),
            None => Err(RouterError::Exhausted {
                reason: if attempts.is_empty() {
                    "no candidate produced a runnable command".to_string()
                } else {
                    attempts
                        .iter()
                        .map(|a| format!("{} ({}): {}", a.tool_name, a.stage, a.detail))
                        .collect::<Vec<_>>()
                        .join("; ")
                },
            }),
        }
    }

    /// The ordered candidate queue: the explicit hint alone, or every
    /// installed tool ranked by the scorer.
    async fn candidate_queue(
        &self,
        task: &Task,
        attempts: &mut Vec<AttemptRecord>,
    ) -> Result<VecDeque<String>> {
        if let Some(hint) = &task.explicit_tool_hint {
            let spec = self
                .registry
                .get(hint)
                .ok_or_else(|| RouterError::UnknownTool(hint.clone()))?;
            if !self.cache.is_installed(spec) {
                return Err(RouterError::ToolNotInstalled(hint.clone()));
            }
            tracing::debug!(tool = %hint, "explicit hint; scoring skipped");
            return Ok(VecDeque::from([spec.name.clone()]));
        }

        tracing::debug!("state: scoring");
        let installed: Vec<&ToolSpec> = self
            .registry
            .tools
            .iter()
            .filter(|spec| self.cache.is_installed(spec))
            .collect();
        if installed.is_empty() {
            return Err(RouterError::NoToolsInstalled);
        }

        let mut models = Vec::with_capacity(installed.len());
        for spec in &installed {
            // Probe failures degrade inside the cache; scoring never dies here
            models.push(self.cache.get(spec, &self.failures).await?);
        }

        let ranked = scorer::score(task, &models, &self.registry, &self.config.score);
        attempts.push(AttemptRecord {
            tool_name: ranked
                .first()
                .map(|(n, _)| n.clone())
                .unwrap_or_default(),
            stage: RouteStage::Scoring,
            detail: ranked
                .iter()
                .map(|(n, s)| format!("{n}={s:.2}"))
                .collect::<Vec<_>>()
                .join(" "),
        });
        Ok(ranked.into_iter().map(|(name, _)| name).collect())
    }
}

fn truncated(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheSettings;
    use crate::probe::{ProbeFailure, ToolProber};
    use crate::registry::TemplateModel;
    use crate::store::PatternStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const FLAG_HELP: &str = "\
Usage: tool-a [options]

  -p, --print   Print response and exit
";

    const POSITIONAL_HELP: &str = "\
usage: tool-b <prompt> [options]

  --verbose   Show diagnostics
";

    // -- Mock prober --------------------------------------------------------

    struct MockProber {
        help: HashMap<String, String>,
    }

    impl MockProber {
        fn with(entries: &[(&str, &str)]) -> Self {
            Self {
                help: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl ToolProber for MockProber {
        async fn help_text(
            &self,
            bin: &str,
            _timeout: Duration,
        ) -> std::result::Result<String, ProbeFailure> {
            self.help.get(bin).cloned().ok_or_else(|| {
                ProbeFailure::new(bin, crate::probe::ProbeReason::NotFound, "missing")
            })
        }

        async fn installed_version(&self, _bin: &str, _timeout: Duration) -> Option<String> {
            Some("1.0.0".into())
        }

        fn is_installed(&self, bin: &str) -> bool {
            self.help.contains_key(bin)
        }
    }

    // -- Mock executor ------------------------------------------------------

    /// Scripted per-tool exit codes; records every argv it receives.
    struct MockExecutor {
        exit_codes: HashMap<String, i32>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
        executions: AtomicUsize,
        delay: Duration,
    }

    impl MockExecutor {
        fn with(codes: &[(&str, i32)]) -> Self {
            Self {
                exit_codes: codes.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                calls: Mutex::new(Vec::new()),
                executions: AtomicUsize::new(0),
                delay: Duration::from_millis(0),
            }
        }

        fn with_delay(codes: &[(&str, i32)], delay: Duration) -> Self {
            Self {
                delay,
                ..Self::with(codes)
            }
        }

        fn argv_for(&self, tool: &str) -> Option<Vec<String>> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .find(|(t, _)| t == tool)
                .map(|(_, argv)| argv.clone())
        }
    }

    impl ToolExecutor for &MockExecutor {
        async fn execute(
            &self,
            tool_name: &str,
            _bin: &str,
            argv: &[String],
            _timeout: Duration,
        ) -> ExecutionResult {
            self.executions.fetch_add(1, Ordering::SeqCst);
            self.calls
                .lock()
                .unwrap()
                .push((tool_name.to_string(), argv.to_vec()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let code = self.exit_codes.get(tool_name).copied().unwrap_or(0);
            ExecutionResult {
                tool_name: tool_name.to_string(),
                exit_code: Some(code),
                stdout: if code == 0 { "ok".into() } else { String::new() },
                stderr: if code == 0 {
                    String::new()
                } else {
                    "something broke".into()
                },
                duration_ms: 1,
                success: code == 0,
                error_kind: if code == 0 {
                    None
                } else {
                    Some(ErrorKind::Execution)
                },
            }
        }
    }

    // -- Fixture ------------------------------------------------------------

    fn two_tool_registry() -> ToolRegistry {
        ToolRegistry {
            version: 1,
            tools: vec![
                ToolSpec {
                    name: "tool-a".into(),
                    display_name: "Tool A".into(),
                    bin: None,
                    fallback: Some("tool-b".into()),
                    agent_detection: true,
                    skill_detection: true,
                    template: Some(TemplateModel {
                        execution_pattern: crate::capability::ExecutionPattern::FlagBased,
                        non_interactive_flag: Some("--print".into()),
                        prompt_flag: None,
                        options: vec!["--print".into()],
                    }),
                },
                ToolSpec {
                    name: "tool-b".into(),
                    display_name: "Tool B".into(),
                    bin: None,
                    fallback: None,
                    agent_detection: false,
                    skill_detection: false,
                    template: None,
                },
            ],
            agents: vec!["debugger".into()],
            skills: vec![],
        }
    }

    fn router<'a>(
        dir: &TempDir,
        registry: ToolRegistry,
        prober: MockProber,
        executor: &'a MockExecutor,
    ) -> Router<MockProber, &'a MockExecutor> {
        let store = PatternStore::open(&dir.path().join("patterns.redb")).unwrap();
        let cache = CapabilityCache::new(store, prober, CacheSettings::default());
        let failures = FailureLog::new(dir.path().join("failures.jsonl"));
        Router::new(registry, cache, executor, failures, RouterConfig::default())
    }

    fn both_tools_prober() -> MockProber {
        MockProber::with(&[("tool-a", FLAG_HELP), ("tool-b", POSITIONAL_HELP)])
    }

    // -- Tests --------------------------------------------------------------

    #[tokio::test]
    async fn best_scored_tool_wins_and_succeeds() {
        let dir = TempDir::new().unwrap();
        let executor = MockExecutor::with(&[("tool-a", 0)]);
        let r = router(&dir, two_tool_registry(), both_tools_prober(), &executor);

        let outcome = r.route(&Task::new("say hi")).await.unwrap();
        assert_eq!(outcome.tool_name, "tool-a");
        assert!(outcome.result.success);
        assert!(!outcome.fallback_used);
        assert_eq!(
            executor.argv_for("tool-a").unwrap(),
            vec!["--print".to_string(), "\"say hi\"".to_string()]
        );
    }

    #[tokio::test]
    async fn execution_failure_falls_back_to_partner() {
        let dir = TempDir::new().unwrap();
        let executor = MockExecutor::with(&[("tool-a", 1), ("tool-b", 0)]);
        let r = router(&dir, two_tool_registry(), both_tools_prober(), &executor);

        let outcome = r.route(&Task::new("say hi")).await.unwrap();
        assert_eq!(outcome.tool_name, "tool-b");
        assert!(outcome.result.success);
        assert!(outcome.fallback_used);
        // The fallback synthesized a positional argv
        assert_eq!(
            executor.argv_for("tool-b").unwrap(),
            vec!["say hi".to_string()]
        );
        // Failure record written for tool-a
        let records = r.failures().list(0).unwrap();
        assert!(records
            .iter()
            .any(|f| f.tool_name == "tool-a" && f.error_kind == ErrorKind::Execution));
    }

    #[tokio::test]
    async fn fallback_happens_at_most_once() {
        let dir = TempDir::new().unwrap();
        let executor = MockExecutor::with(&[("tool-a", 1), ("tool-b", 1)]);
        let r = router(&dir, two_tool_registry(), both_tools_prober(), &executor);

        let outcome = r.route(&Task::new("say hi")).await.unwrap();
        assert!(outcome.exhausted);
        assert!(outcome.fallback_used);
        assert_eq!(outcome.tool_name, "tool-b");
        // tool-a, then tool-b, then stop; no chains
        assert_eq!(executor.executions.load(Ordering::SeqCst), 2);
        // The last result's stderr is surfaced verbatim
        assert_eq!(outcome.result.stderr, "something broke");
    }

    #[tokio::test]
    async fn failure_without_partner_is_exhausted() {
        let dir = TempDir::new().unwrap();
        let executor = MockExecutor::with(&[("tool-b", 1)]);
        let registry = ToolRegistry {
            tools: two_tool_registry()
                .tools
                .into_iter()
                .filter(|t| t.name == "tool-b")
                .collect(),
            ..two_tool_registry()
        };
        let prober = MockProber::with(&[("tool-b", POSITIONAL_HELP)]);
        let r = router(&dir, registry, prober, &executor);

        let outcome = r.route(&Task::new("say hi")).await.unwrap();
        assert!(outcome.exhausted);
        assert!(!outcome.fallback_used);
        assert_eq!(executor.executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn explicit_hint_skips_scoring() {
        let dir = TempDir::new().unwrap();
        let executor = MockExecutor::with(&[("tool-b", 0)]);
        let r = router(&dir, two_tool_registry(), both_tools_prober(), &executor);

        let task = Task {
            raw_prompt: "say hi".into(),
            explicit_tool_hint: Some("tool-b".into()),
            detected_agent: None,
            detected_skill: None,
        };
        let outcome = r.route(&task).await.unwrap();
        assert_eq!(outcome.tool_name, "tool-b");
        assert!(outcome
            .attempts
            .iter()
            .all(|a| a.stage != RouteStage::Scoring));
    }

    #[tokio::test]
    async fn unknown_hint_is_an_error() {
        let dir = TempDir::new().unwrap();
        let executor = MockExecutor::with(&[]);
        let r = router(&dir, two_tool_registry(), both_tools_prober(), &executor);

        let task = Task {
            raw_prompt: "hi".into(),
            explicit_tool_hint: Some("ghost".into()),
            detected_agent: None,
            detected_skill: None,
        };
        assert!(matches!(
            r.route(&task).await.unwrap_err(),
            RouterError::UnknownTool(_)
        ));
    }

    #[tokio::test]
    async fn no_installed_tools_is_an_error() {
        let dir = TempDir::new().unwrap();
        let executor = MockExecutor::with(&[]);
        let prober = MockProber::with(&[]);
        let r = router(&dir, two_tool_registry(), prober, &executor);

        assert!(matches!(
            r.route(&Task::new("hi")).await.unwrap_err(),
            RouterError::NoToolsInstalled
        ));
    }

    #[tokio::test]
    async fn probe_failure_degrades_to_template_and_still_executes() {
        let dir = TempDir::new().unwrap();
        let executor = MockExecutor::with(&[("tool-a", 0)]);
        // tool-a installed but its help probe fails; the registry template
        // carries the invocation shape instead
        let prober = MockProber {
            help: HashMap::new(),
        };
        struct InstalledButMute(MockProber);
        impl ToolProber for InstalledButMute {
            async fn help_text(
                &self,
                bin: &str,
                timeout: Duration,
            ) -> std::result::Result<String, ProbeFailure> {
                self.0.help_text(bin, timeout).await
            }
            async fn installed_version(&self, _bin: &str, _timeout: Duration) -> Option<String> {
                None
            }
            fn is_installed(&self, bin: &str) -> bool {
                bin == "tool-a"
            }
        }

        let store = PatternStore::open(&dir.path().join("patterns.redb")).unwrap();
        let cache = CapabilityCache::new(store, InstalledButMute(prober), CacheSettings::default());
        let failures = FailureLog::new(dir.path().join("failures.jsonl"));
        let r = Router::new(
            two_tool_registry(),
            cache,
            &executor,
            failures,
            RouterConfig::default(),
        );

        let outcome = r.route(&Task::new("say hi")).await.unwrap();
        assert_eq!(outcome.tool_name, "tool-a");
        assert!(outcome.result.success);
        assert_eq!(
            executor.argv_for("tool-a").unwrap(),
            vec!["--print".to_string(), "\"say hi\"".to_string()]
        );
    }

    #[tokio::test]
    async fn conflicting_subtasks_skip_and_later_reacquire() {
        let dir = TempDir::new().unwrap();
        let executor =
            MockExecutor::with_delay(&[("tool-a", 0)], Duration::from_millis(50));
        let r = router(&dir, two_tool_registry(), both_tools_prober(), &executor);

        let resources = vec!["src/app.js".to_string()];
        let first = Subtask::new(Task::new("first edit"), resources.clone());
        let second = Subtask::new(Task::new("second edit"), resources.clone());

        let summary = r.dispatch(vec![first, second], None).await;
        assert_eq!(summary.completed(), 1);
        assert_eq!(summary.skipped(), 1);
        let skipped = summary
            .reports
            .iter()
            .find_map(|rep| match &rep.status {
                SubtaskStatus::Skipped { reason } => Some(reason.clone()),
                _ => None,
            })
            .unwrap();
        assert!(skipped.contains("resource locked"));

        // Locks were released: a third subtask on the same resource runs
        let third = Subtask::new(Task::new("third edit"), resources);
        let summary = r.dispatch(vec![third], None).await;
        assert_eq!(summary.completed(), 1);
        assert_eq!(summary.skipped(), 0);
    }

    #[tokio::test]
    async fn disjoint_subtasks_all_run() {
        let dir = TempDir::new().unwrap();
        let executor =
            MockExecutor::with_delay(&[("tool-a", 0)], Duration::from_millis(10));
        let r = router(&dir, two_tool_registry(), both_tools_prober(), &executor);

        let subtasks = vec![
            Subtask::new(Task::new("edit a"), vec!["a.txt".into()]),
            Subtask::new(Task::new("edit b"), vec!["b.txt".into()]),
            Subtask::new(Task::new("edit c"), vec!["c.txt".into()]),
        ];
        let summary = r.dispatch(subtasks, None).await;
        assert_eq!(summary.completed(), 3);
        assert_eq!(summary.skipped(), 0);
    }

    #[tokio::test]
    async fn expired_deadline_skips_subtasks() {
        let dir = TempDir::new().unwrap();
        let executor = MockExecutor::with(&[("tool-a", 0)]);
        let r = router(&dir, two_tool_registry(), both_tools_prober(), &executor);

        let subtask = Subtask::new(Task::new("too late"), vec![]);
        let summary = r.dispatch(vec![subtask], Some(Duration::ZERO)).await;
        assert_eq!(summary.skipped(), 1);
        let SubtaskStatus::Skipped { reason } = &summary.reports[0].status else {
            panic!("expected skip");
        };
        assert!(reason.contains("deadline"));
    }
}
