use serde_json::Value;

use crate::outcome::FlowOutcome;

/// A pluggable search strategy (spec §4.9): proposes batches of candidate
/// settings and folds each returned outcome back into its own state.
///
/// Grounded on `original_source/src/xeda/flow_runner/dse/dse_runner.py`'s
/// `Optimizer` base class. Python's `next_batch`/`process_outcome` mutate
/// `self`; the Rust trait keeps that shape (`&mut self`) rather than
/// threading state through return values, since every optimizer in the
/// original (and the concrete Fmax one below) is inherently stateful.
pub trait Optimizer: Send {
    /// Propose the next batch of flow settings to try, or `None` to stop
    /// iterating (spec §4.9 step 3's "if empty, stop").
    fn next_batch(&mut self) -> Option<Vec<Value>>;

    /// Fold a completed run's outcome into the optimizer's state. Returns
    /// `true` if this outcome improved on the best seen so far.
    fn process_outcome(&mut self, outcome: &FlowOutcome, idx: usize) -> bool;

    /// The best outcome seen so far, if any.
    fn best(&self) -> Option<&FlowOutcome>;
}

/// Shared bookkeeping every concrete optimizer embeds (spec §4.9):
/// worker count, base settings to start every candidate from, and the
/// running best outcome. Concrete optimizers compose this the same way
/// concrete flows compose [`xeda_flow::FlowState`].
#[derive(Debug, Clone)]
pub struct OptimizerState {
    pub max_workers: usize,
    pub base_settings: Value,
    pub best: Option<FlowOutcome>,
    pub improved_idx: Option<usize>,
    pub failed_fmax: Option<f64>,
}

impl OptimizerState {
    pub fn new(max_workers: usize, base_settings: Value) -> Self {
        Self {
            max_workers,
            base_settings,
            best: None,
            improved_idx: None,
            failed_fmax: None,
        }
    }
}
