//! Design-space exploration (spec §4.9): an `Optimizer` proposes batches of
//! flow settings, a pool of OS-level worker processes runs them, and a
//! driver loop feeds outcomes back until a stop condition trips.
//!
//! Grounded on `original_source/src/xeda/flow_runner/dse/`.

mod driver;
mod error;
mod fmax;
mod optimizer;
mod outcome;
mod worker;

pub use driver::{run_flow, DseSettings};
pub use error::DseError;
pub use fmax::{FmaxOptimizer, FmaxSettings};
pub use optimizer::{Optimizer, OptimizerState};
pub use outcome::FlowOutcome;
pub use worker::{worker_main, WorkerJob, WorkerResponse, WORKER_ARG};
