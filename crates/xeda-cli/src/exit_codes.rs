//! Exit code mapping (spec §6, §7). Grounded on `src/exit_codes.rs`'s
//! `codes` module + error-to-exit-code function pattern.

use xeda_engine::EngineError;
use xeda_flow::FlowError;
use xeda_process::ProcessError;
use xeda_settings::SettingsValidationError;

pub mod codes {
    pub const SUCCESS: i32 = 0;
    /// The flow ran to completion but reported `success == false`.
    pub const FLOW_FAILURE: i32 = 1;
    /// CLI argument error, or an unanticipated exception inside a flow
    /// (`FlowFatalError`), or a failed dependency (`FlowDependencyFailure`).
    pub const FATAL_ERROR: i32 = 2;
    pub const NON_ZERO_EXIT: i32 = 3;
    pub const EXECUTABLE_NOT_FOUND: i32 = 4;
    pub const SETTINGS_VALIDATION: i32 = 5;
    pub const OTHER_FLOW_ERROR: i32 = 6;
}

/// Map an [`EngineError`] surfaced from `run`/`dse` to its exit code (spec
/// §6's `run` exit-code table; `dse` reuses the same taxonomy since it
/// drives the same launcher per worker).
pub fn exit_code_for(error: &EngineError) -> i32 {
    match error {
        EngineError::Flow(flow_err) => exit_code_for_flow(flow_err),
        EngineError::Io(..) | EngineError::Json(..) | EngineError::RunPath(..) | EngineError::Hash(..) => {
            codes::FATAL_ERROR
        }
    }
}

fn exit_code_for_flow(error: &FlowError) -> i32 {
    match error {
        FlowError::Settings(SettingsValidationError { .. }) => codes::SETTINGS_VALIDATION,
        FlowError::DependencyFailure { .. } => codes::FATAL_ERROR,
        FlowError::Fatal { .. } => codes::FATAL_ERROR,
        FlowError::UnknownFlow(_) => codes::FATAL_ERROR,
        FlowError::Process(process_err) => exit_code_for_process(process_err),
        FlowError::Report(_) => codes::OTHER_FLOW_ERROR,
        FlowError::MissingCompletedDependency(_) => codes::OTHER_FLOW_ERROR,
        FlowError::Io { .. } => codes::OTHER_FLOW_ERROR,
    }
}

fn exit_code_for_process(error: &ProcessError) -> i32 {
    match error {
        ProcessError::ExecutableNotFound { .. } => codes::EXECUTABLE_NOT_FOUND,
        ProcessError::NonZeroExitCode { .. } | ProcessError::TimeoutExpired { .. } => codes::NON_ZERO_EXIT,
        ProcessError::Spawn { .. }
        | ProcessError::Wait { .. }
        | ProcessError::StdoutLog { .. }
        | ProcessError::MonitorDisconnected => codes::OTHER_FLOW_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executable_not_found_maps_to_code_4() {
        let err = EngineError::Flow(FlowError::Process(ProcessError::ExecutableNotFound {
            name: "vivado".to_string(),
            searched: String::new(),
        }));
        assert_eq!(exit_code_for(&err), codes::EXECUTABLE_NOT_FOUND);
    }

    #[test]
    fn settings_error_maps_to_code_5() {
        let err = EngineError::Flow(FlowError::Settings(SettingsValidationError::single(
            "ghdl_synth",
            "clock_period",
            "must be positive",
        )));
        assert_eq!(exit_code_for(&err), codes::SETTINGS_VALIDATION);
    }

    #[test]
    fn dependency_failure_maps_to_code_2() {
        let err = EngineError::Flow(FlowError::DependencyFailure {
            depender: "post_synth_sim".to_string(),
            dependency: "vivado_synth".to_string(),
        });
        assert_eq!(exit_code_for(&err), codes::FATAL_ERROR);
    }
}
