use crate::command_spec::CommandSpec;
use crate::error::ProcessError;
use crate::harness::{self, HarnessConfig, ProcessOutput};

/// Abstraction over process execution so flow/tool code can be tested
/// against a fake without spawning real EDA tools.
///
/// Grounded on `crates/xchecker-runner/src/process.rs`'s `ProcessRunner`
/// trait.
pub trait ProcessRunner {
    fn run(&self, cmd: &CommandSpec, config: &HarnessConfig) -> Result<ProcessOutput, ProcessError>;
}

/// The real, native implementation backed by [`harness::run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl ProcessRunner for NativeRunner {
    fn run(&self, cmd: &CommandSpec, config: &HarnessConfig) -> Result<ProcessOutput, ProcessError> {
        harness::run(cmd, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct MockRunner {
        responses: RefCell<Vec<Result<ProcessOutput, ProcessError>>>,
    }

    impl ProcessRunner for MockRunner {
        fn run(
            &self,
            _cmd: &CommandSpec,
            _config: &HarnessConfig,
        ) -> Result<ProcessOutput, ProcessError> {
            self.responses
                .borrow_mut()
                .pop()
                .unwrap_or(Ok(ProcessOutput {
                    exit_code: Some(0),
                    captured_stdout: None,
                    timed_out: false,
                }))
        }
    }

    #[test]
    fn mock_runner_satisfies_trait() {
        let mock = MockRunner {
            responses: RefCell::new(vec![Ok(ProcessOutput {
                exit_code: Some(0),
                captured_stdout: Some("ok".into()),
                timed_out: false,
            })]),
        };
        let out = mock
            .run(&CommandSpec::new("vivado"), &HarnessConfig::default())
            .unwrap();
        assert!(out.success());
    }
}
