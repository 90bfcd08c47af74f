//! Versioned capability caching.
//!
//! `CapabilityCache` layers the invalidation policy over the durable
//! [`PatternStore`]: a stored model is served only while the installed
//! tool's reported version matches and the TTL has not elapsed. A stale
//! entry is treated as absent (triggering a re-probe) but is not deleted
//! until successfully replaced, so a failed probe can still degrade to it.
//! Probing is serialized and deduplicated per tool name by a per-key async
//! mutex; distinct tools never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;

use crate::capability::CapabilityModel;
use crate::error::Result;
use crate::failure::{ErrorKind, FailureLog, FailureRecord};
use crate::help;
use crate::probe::ToolProber;
use crate::registry::ToolSpec;
use crate::store::PatternStore;

// ---------------------------------------------------------------------------
// CacheSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Maximum age of a stored model before it is treated as absent.
    pub ttl: chrono::Duration,
    /// Timeout for one help/version probe invocation.
    pub probe_timeout: Duration,
    /// How far back to count probe failures for retry suppression.
    pub failure_window: chrono::Duration,
    /// Recent probe failures at which re-probing is suppressed.
    pub max_probe_failures: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: chrono::Duration::hours(24),
            probe_timeout: Duration::from_secs(10),
            failure_window: chrono::Duration::minutes(10),
            max_probe_failures: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// CapabilityCache
// ---------------------------------------------------------------------------

pub struct CapabilityCache<P> {
    store: PatternStore,
    prober: P,
    settings: CacheSettings,
    /// Per-tool probe serialization; the outer mutex only guards the map.
    flights: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<P: ToolProber> CapabilityCache<P> {
    pub fn new(store: PatternStore, prober: P, settings: CacheSettings) -> Self {
        Self {
            store,
            prober,
            settings,
            flights: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Whether the tool's binary resolves on PATH, per the prober.
    pub fn is_installed(&self, spec: &ToolSpec) -> bool {
        self.prober.is_installed(spec.bin_name())
    }

    /// The capability model for `spec`, probing on miss or invalidation.
    ///
    /// Never fails on the probing path: a failed probe is logged and the
    /// call degrades to the stale stored entry, then to the registry's
    /// built-in template. Only storage I/O errors surface.
    pub async fn get(&self, spec: &ToolSpec, failures: &FailureLog) -> Result<CapabilityModel> {
        let flight = self.key_lock(&spec.name);
        let _guard = flight.lock().await;

        let live_version = self
            .prober
            .installed_version(spec.bin_name(), self.settings.probe_timeout)
            .await;

        let stored = self.store.get(&spec.name)?;
        if let Some(model) = &stored {
            if self.is_fresh(model, live_version.as_deref()) {
                return Ok(model.clone());
            }
            tracing::debug!(
                tool = %spec.name,
                stored_version = model.version.as_deref().unwrap_or("-"),
                live_version = live_version.as_deref().unwrap_or("-"),
                "cached capability model invalidated"
            );
        }

        if self.probe_suppressed(spec, failures) {
            return Ok(self.degraded(spec, stored));
        }

        match self
            .prober
            .help_text(spec.bin_name(), self.settings.probe_timeout)
            .await
        {
            Ok(raw) => {
                let mut model = help::parse(&spec.name, &raw);
                model.version = live_version;
                spec.stamp_declarations(&mut model);
                self.store.put(&model)?;
                tracing::debug!(
                    tool = %spec.name,
                    options = model.options.len(),
                    pattern = model.execution_pattern.as_str(),
                    "capability model captured"
                );
                Ok(model)
            }
            Err(probe) => {
                tracing::warn!(
                    tool = %spec.name,
                    reason = %probe.reason,
                    "probe failed; serving degraded capability model"
                );
                let record = FailureRecord::new(
                    &spec.name,
                    format!("{} --help", spec.bin_name()),
                    ErrorKind::Probe,
                    probe.to_string(),
                );
                if let Err(e) = failures.append(&record) {
                    tracing::warn!(error = %e, "failed to append probe failure record");
                }
                Ok(self.degraded(spec, stored))
            }
        }
    }

    /// Drop the cached entry for `tool_name`, forcing the next `get` to
    /// probe.
    pub fn invalidate(&self, tool_name: &str) -> Result<()> {
        self.store.remove(tool_name)
    }

    /// The stored model without any freshness check or probing.
    pub fn peek(&self, tool_name: &str) -> Result<Option<CapabilityModel>> {
        self.store.get(tool_name)
    }

    pub fn list(&self) -> Result<Vec<CapabilityModel>> {
        self.store.list()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn key_lock(&self, tool_name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(tool_name.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn is_fresh(&self, model: &CapabilityModel, live_version: Option<&str>) -> bool {
        if let (Some(stored), Some(live)) = (model.version.as_deref(), live_version) {
            if stored != live {
                return false;
            }
        }
        model.age(Utc::now()) <= self.settings.ttl
    }

    fn probe_suppressed(&self, spec: &ToolSpec, failures: &FailureLog) -> bool {
        let since = Utc::now() - self.settings.failure_window;
        let recent = failures
            .recent_count(&spec.name, ErrorKind::Probe, since)
            .unwrap_or(0);
        if recent >= self.settings.max_probe_failures {
            tracing::debug!(
                tool = %spec.name,
                recent,
                "probe suppressed after repeated recent failures"
            );
            return true;
        }
        false
    }

    /// Stale-but-usable stored entry if any, else the built-in template.
    fn degraded(&self, spec: &ToolSpec, stored: Option<CapabilityModel>) -> CapabilityModel {
        match stored {
            Some(model) => model,
            None => spec.fallback_model(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySource;
    use crate::probe::{ProbeFailure, ProbeReason};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const HELP: &str = "\
Usage: fake [options]

  -p, --print   Print response and exit
";

    /// Counting mock: fixed help text and version, or scripted failure.
    struct MockProber {
        help: Option<String>,
        version: Option<String>,
        probes: AtomicUsize,
    }

    impl MockProber {
        fn ok(version: &str) -> Self {
            Self {
                help: Some(HELP.to_string()),
                version: Some(version.to_string()),
                probes: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                help: None,
                version: None,
                probes: AtomicUsize::new(0),
            }
        }

        fn probe_count(&self) -> usize {
            self.probes.load(Ordering::SeqCst)
        }
    }

    impl ToolProber for &MockProber {
        async fn help_text(&self, bin: &str, _timeout: Duration) -> Result2<String> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            match &self.help {
                Some(text) => Ok(text.clone()),
                None => Err(ProbeFailure::new(bin, ProbeReason::NotFound, "missing")),
            }
        }

        async fn installed_version(&self, _bin: &str, _timeout: Duration) -> Option<String> {
            self.version.clone()
        }

        fn is_installed(&self, _bin: &str) -> bool {
            true
        }
    }

    type Result2<T> = std::result::Result<T, ProbeFailure>;

    fn fixture(prober: &MockProber) -> (TempDir, CapabilityCache<&MockProber>, FailureLog) {
        let dir = TempDir::new().unwrap();
        let store = PatternStore::open(&dir.path().join("patterns.redb")).unwrap();
        let cache = CapabilityCache::new(store, prober, CacheSettings::default());
        let failures = FailureLog::new(dir.path().join("failures.jsonl"));
        (dir, cache, failures)
    }

    fn spec() -> ToolSpec {
        ToolSpec {
            name: "fake".into(),
            display_name: "Fake".into(),
            bin: None,
            fallback: None,
            agent_detection: true,
            skill_detection: false,
            template: None,
        }
    }

    #[tokio::test]
    async fn first_get_probes_and_stores() {
        let prober = MockProber::ok("1.0.0");
        let (_dir, cache, failures) = fixture(&prober);

        let model = cache.get(&spec(), &failures).await.unwrap();
        assert_eq!(prober.probe_count(), 1);
        assert_eq!(model.version.as_deref(), Some("1.0.0"));
        assert_eq!(model.non_interactive_flag.as_deref(), Some("--print"));
        assert!(model.agent_detection, "declarations stamped onto the model");
        assert!(cache.peek("fake").unwrap().is_some());
    }

    #[tokio::test]
    async fn second_get_hits_cache_without_reprobing() {
        let prober = MockProber::ok("1.0.0");
        let (_dir, cache, failures) = fixture(&prober);

        cache.get(&spec(), &failures).await.unwrap();
        cache.get(&spec(), &failures).await.unwrap();
        assert_eq!(prober.probe_count(), 1);
    }

    #[tokio::test]
    async fn version_change_triggers_fresh_probe_and_store() {
        let prober = MockProber::ok("1.0.0");
        let (dir, cache, failures) = fixture(&prober);
        cache.get(&spec(), &failures).await.unwrap();
        drop(cache);

        // Same store, tool now reports 1.2.0
        let upgraded = MockProber::ok("1.2.0");
        let store = PatternStore::open(&dir.path().join("patterns.redb")).unwrap();
        let cache = CapabilityCache::new(store, &upgraded, CacheSettings::default());

        let model = cache.get(&spec(), &failures).await.unwrap();
        assert_eq!(upgraded.probe_count(), 1);
        assert_eq!(model.version.as_deref(), Some("1.2.0"));
        // The replacement happened before returning
        assert_eq!(
            cache.peek("fake").unwrap().unwrap().version.as_deref(),
            Some("1.2.0")
        );
    }

    #[tokio::test]
    async fn ttl_expiry_triggers_reprobe() {
        let prober = MockProber::ok("1.0.0");
        let dir = TempDir::new().unwrap();
        let store = PatternStore::open(&dir.path().join("patterns.redb")).unwrap();
        let settings = CacheSettings {
            ttl: chrono::Duration::milliseconds(0),
            ..CacheSettings::default()
        };
        let cache = CapabilityCache::new(store, &prober, settings);
        let failures = FailureLog::new(dir.path().join("failures.jsonl"));

        cache.get(&spec(), &failures).await.unwrap();
        cache.get(&spec(), &failures).await.unwrap();
        assert_eq!(prober.probe_count(), 2);
    }

    #[tokio::test]
    async fn probe_failure_degrades_to_template_and_logs() {
        let prober = MockProber::failing();
        let (_dir, cache, failures) = fixture(&prober);

        let mut spec = spec();
        spec.template = Some(crate::registry::TemplateModel {
            execution_pattern: crate::capability::ExecutionPattern::FlagBased,
            non_interactive_flag: Some("--print".into()),
            prompt_flag: None,
            options: vec!["--print".into()],
        });

        let model = cache.get(&spec, &failures).await.unwrap();
        assert_eq!(model.sourced_from, CapabilitySource::FallbackTemplate);
        assert_eq!(model.non_interactive_flag.as_deref(), Some("--print"));

        let records = failures.list(0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].error_kind, ErrorKind::Probe);
        // Nothing was stored: the template is not a captured model
        assert!(cache.peek("fake").unwrap().is_none());
    }

    #[tokio::test]
    async fn probe_failure_prefers_stale_entry_over_template() {
        let prober = MockProber::ok("1.0.0");
        let (dir, cache, failures) = fixture(&prober);
        cache.get(&spec(), &failures).await.unwrap();
        drop(cache);

        // Tool upgraded but now unreachable: the stale 1.0.0 model survives
        let broken = MockProber {
            help: None,
            version: Some("2.0.0".into()),
            probes: AtomicUsize::new(0),
        };
        let store = PatternStore::open(&dir.path().join("patterns.redb")).unwrap();
        let cache = CapabilityCache::new(store, &broken, CacheSettings::default());

        let model = cache.get(&spec(), &failures).await.unwrap();
        assert_eq!(model.version.as_deref(), Some("1.0.0"));
        assert_eq!(model.sourced_from, CapabilitySource::Probed);
    }

    #[tokio::test]
    async fn repeated_probe_failures_suppress_reprobing() {
        let prober = MockProber::failing();
        let (_dir, cache, failures) = fixture(&prober);
        let spec = spec();

        for _ in 0..3 {
            cache.get(&spec, &failures).await.unwrap();
        }
        assert_eq!(prober.probe_count(), 3);

        // Fourth call: suppression kicks in, no new probe
        cache.get(&spec, &failures).await.unwrap();
        assert_eq!(prober.probe_count(), 3);
        assert_eq!(failures.list(0).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn concurrent_gets_probe_once() {
        let prober = MockProber::ok("1.0.0");
        let (_dir, cache, failures) = fixture(&prober);
        let spec = spec();

        let (a, b) = tokio::join!(cache.get(&spec, &failures), cache.get(&spec, &failures));
        a.unwrap();
        b.unwrap();
        assert_eq!(prober.probe_count(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_next_probe() {
        let prober = MockProber::ok("1.0.0");
        let (_dir, cache, failures) = fixture(&prober);
        let spec = spec();

        cache.get(&spec, &failures).await.unwrap();
        cache.invalidate("fake").unwrap();
        cache.get(&spec, &failures).await.unwrap();
        assert_eq!(prober.probe_count(), 2);
    }
}
