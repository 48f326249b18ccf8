//! xeda - EDA tool-chain orchestration engine
//!
//! This crate is the umbrella over the workspace's flow-engine crates
//! (`xeda-flow`, `xeda-engine`, `xeda-settings`, `xeda-design`,
//! `xeda-process`, `xeda-runpath`, `xeda-hash`, `xeda-report`,
//! `xeda-dse`) and the `xeda-cli` command-line front end. `src/main.rs`
//! is the only consumer of this crate's public surface; it exists so the
//! workspace has a single versioned top-level package rather than a bare
//! binary target.

/// The xeda version, as reported by `xeda --version`.
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use xeda_cli::run;
