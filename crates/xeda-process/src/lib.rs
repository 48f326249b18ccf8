//! Supervised execution of external EDA tools (spec §4.4, §4.5).
//!
//! Grounded on `crates/xchecker-runner/src/{process,command_spec,error}.rs`
//! for the argv-only `CommandSpec`/`ProcessRunner` shape, and on
//! `crates/xchecker-utils/src/runner/native.rs` for the thread + mpsc +
//! `recv_timeout` timeout/kill idiom.

mod command_spec;
mod error;
mod harness;
mod process;
mod tool_adapter;

pub use command_spec::CommandSpec;
pub use error::ProcessError;
pub use harness::{run, HarnessConfig, HighlightRule, ProcessOutput, StreamTag};
pub use process::{NativeRunner, ProcessRunner};
pub use tool_adapter::{parse_semver_like, ToolAdapter, Version};
