use camino::Utf8PathBuf;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use xeda_design::Design;

use crate::error::FlowError;
use crate::flow::Flow;

/// Constructs a flow instance from its (already-merged, not yet
/// schema-validated) settings, the design it runs against and its
/// run-path. Implementations are expected to validate `settings` against
/// their own `Settings` type and return [`FlowError::Settings`] on
/// failure (spec §4.3, §4.8 step 1).
pub type FlowFactory = fn(Value, Design, Utf8PathBuf) -> Result<Box<dyn Flow>, FlowError>;

/// Global name → constructor table. Grounded on
/// `original_source/src/xeda/flow/flow.py`'s module-level `registered_flows`
/// dict, populated as each `Flow` subclass is defined via
/// `__init_subclass__`. Rust has no such hook, so registration is
/// explicit: a flow crate calls [`register_flow`] once, typically from a
/// `#[ctor]`-free `init()` the binary calls at startup, or directly next
/// to its definition behind a `lazy_static`-style guard.
static REGISTRY: Lazy<Mutex<HashMap<String, FlowFactory>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Register a flow constructor under `name`. Re-registering the same name
/// overwrites the previous entry, which is useful for tests.
pub fn register_flow(name: impl Into<String>, factory: FlowFactory) {
    REGISTRY
        .lock()
        .expect("flow registry lock poisoned")
        .insert(name.into(), factory);
}

/// Construct a flow instance for `name`, failing with
/// [`FlowError::UnknownFlow`] if nothing is registered under it.
pub fn construct(
    name: &str,
    settings: Value,
    design: Design,
    run_path: Utf8PathBuf,
) -> Result<Box<dyn Flow>, FlowError> {
    let factory = {
        let registry = REGISTRY.lock().expect("flow registry lock poisoned");
        *registry
            .get(name)
            .ok_or_else(|| FlowError::UnknownFlow(name.to_string()))?
    };
    factory(settings, design, run_path)
}

/// Names currently registered, sorted (used by `xeda-cli list-flows`).
pub fn registered_names() -> Vec<String> {
    let registry = REGISTRY.lock().expect("flow registry lock poisoned");
    let mut names: Vec<String> = registry.keys().cloned().collect();
    names.sort();
    names
}
