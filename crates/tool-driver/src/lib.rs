//! `tool-driver` — the subprocess side of the routing engine.
//!
//! Implements `switchyard-core`'s [`ToolProber`] and [`ToolExecutor`] seams
//! against real external binaries:
//!
//! ```text
//! CliDriver
//!     │  help_text()          ← `tool --help`, then `tool -h`
//!     │  installed_version()  ← `tool --version`, semver extraction
//!     │  execute()            ← `tool <argv…>` with a hard timeout
//!     ▼
//! run_command()   ← tokio::process::Command, piped streams drained by
//!                   background tasks, SIGTERM → grace window → SIGKILL
//! ```
//!
//! [`ToolProber`]: switchyard_core::ToolProber
//! [`ToolExecutor`]: switchyard_core::ToolExecutor

mod driver;
mod process;

pub use driver::CliDriver;
