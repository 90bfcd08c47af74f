//! `switchyard-core` — command synthesis and routing for heterogeneous AI
//! CLI tools.
//!
//! A caller submits a free-text [`Task`]; the engine discovers each
//! installed tool's invocation contract by probing its help output
//! ([`help`]), caches the captured [`CapabilityModel`] per tool version
//! ([`store`], [`cache`]), ranks candidates ([`scorer`]), synthesizes a
//! concrete argv ([`synth`]), executes it through the [`ToolExecutor`] seam,
//! and falls back to a configured partner tool on failure ([`router`]).
//! Concurrent dispatch is guarded by non-blocking per-resource locks
//! ([`locks`]).
//!
//! The subprocess side of both seams ([`ToolProber`], [`ToolExecutor`]) is
//! implemented by the `tool-driver` crate; tests substitute in-memory mocks.

pub mod cache;
pub mod capability;
pub mod error;
pub mod exec;
pub mod failure;
pub mod help;
pub mod io;
pub mod locks;
pub mod paths;
pub mod probe;
pub mod registry;
pub mod router;
pub mod scorer;
pub mod store;
pub mod synth;
pub mod task;

pub use cache::{CacheSettings, CapabilityCache};
pub use capability::{CapabilityModel, CapabilitySource, ExecutionPattern};
pub use error::{Result, RouterError};
pub use exec::{ExecutionResult, ToolExecutor};
pub use failure::{ErrorKind, FailureLog, FailureRecord};
pub use locks::{LockConflict, LockSet, ResourceLocks};
pub use probe::{ProbeFailure, ProbeReason, ToolProber};
pub use registry::{TemplateModel, ToolRegistry, ToolSpec};
pub use router::{
    DispatchSummary, RouteOutcome, RouteStage, Router, RouterConfig, SubtaskReport, SubtaskStatus,
};
pub use store::PatternStore;
pub use task::{Subtask, Task};
