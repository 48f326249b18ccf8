//! The `Flow` contract: settings schema, dependency declaration, and the
//! `run` / `parse_reports` / `clean` lifecycle a flow implementation hooks
//! into (spec §4.7).
//!
//! Grounded on `original_source/src/xeda/flow/flow.py`'s `Flow` abstract
//! base class, generalized to an object-safe trait in the idiom of
//! `crates/xchecker-phase-api/src/lib.rs`'s `Phase` trait (id/deps plus a
//! small set of lifecycle hooks, rather than a deep inheritance tree).

mod error;
mod flow;
mod registry;
mod results;
mod settings;

pub use error::FlowError;
pub use flow::{clean_dir, DependencyRequest, Flow, FlowState};
pub use registry::{construct, register_flow, registered_names, FlowFactory};
pub use results::FlowResults;
pub use settings::{strip_non_semantic_fields, CommonSettings, LibPath, NON_SEMANTIC_FIELDS};
