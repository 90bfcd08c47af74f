pub mod cache;
pub mod dispatch;
pub mod failures;
pub mod init;
pub mod probe;
pub mod run;
pub mod tools;

use std::path::Path;

use switchyard_core::{
    io, paths, CacheSettings, CapabilityCache, FailureLog, PatternStore, Router, RouterConfig,
    ToolRegistry,
};
use tool_driver::CliDriver;

/// Open the registry, pattern store, capability cache, and failure log
/// rooted at the data directory.
pub(crate) fn open_engine(
    home: &Path,
) -> anyhow::Result<(ToolRegistry, CapabilityCache<CliDriver>, FailureLog)> {
    io::ensure_dir(home)?;
    let registry = ToolRegistry::load_or_default(&paths::registry_path(home))?;
    let store = PatternStore::open(&paths::patterns_db_path(home))?;
    let cache = CapabilityCache::new(store, CliDriver::new(), CacheSettings::default());
    let failures = FailureLog::new(paths::failures_path(home));
    Ok((registry, cache, failures))
}

pub(crate) fn build_router(
    home: &Path,
    config: RouterConfig,
) -> anyhow::Result<Router<CliDriver, CliDriver>> {
    let (registry, cache, failures) = open_engine(home)?;
    Ok(Router::new(registry, cache, CliDriver::new(), failures, config))
}
