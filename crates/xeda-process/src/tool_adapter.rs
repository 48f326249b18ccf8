use crate::command_spec::CommandSpec;
use crate::error::ProcessError;
use crate::harness::{self, HarnessConfig, HighlightRule, ProcessOutput};
use once_cell::sync::OnceCell;
use std::sync::Mutex;

/// A version tuple, compared lexicographically over its integer
/// components (spec §4.5 `version_gte`).
pub type Version = (u32, u32, u32);

/// Metadata about an external tool executable (spec §4.5): name, optional
/// docker image, version probe, default args, highlight rules and a
/// redirect-stdout target.
///
/// Grounded on `crates/xchecker-runner/src/command_spec.rs` for the
/// argument-composition idiom and spec §4.5 for the probe/cache contract.
pub struct ToolAdapter {
    pub executable: String,
    pub docker_image: Option<String>,
    pub version_probe_arg: String,
    pub version_parser: fn(&str) -> Option<Version>,
    pub min_version: Option<Version>,
    pub default_args: Vec<String>,
    pub highlight_rules: Vec<HighlightRule>,
    pub redirect_stdout: Option<camino::Utf8PathBuf>,
    cached_version: OnceCell<Mutex<Option<Version>>>,
}

impl ToolAdapter {
    pub fn new(executable: impl Into<String>, version_parser: fn(&str) -> Option<Version>) -> Self {
        Self {
            executable: executable.into(),
            docker_image: None,
            version_probe_arg: "--version".to_string(),
            version_parser,
            min_version: None,
            default_args: Vec::new(),
            highlight_rules: Vec::new(),
            redirect_stdout: None,
            cached_version: OnceCell::new(),
        }
    }

    /// Compose `default_args` with call-site `args` and delegate to the
    /// process harness.
    pub fn run(
        &self,
        args: &[String],
        runner: &dyn crate::process::ProcessRunner,
        mut config: HarnessConfig,
    ) -> Result<ProcessOutput, ProcessError> {
        let mut cmd = CommandSpec::new(&self.executable).args(self.default_args.clone());
        cmd = cmd.args(args.to_vec());
        config.highlight_rules = self.highlight_rules.clone();
        if let Some(path) = &self.redirect_stdout {
            config.stdout_log = Some(path.clone());
        }
        runner.run(&cmd, &config)
    }

    /// Probe and cache the tool's version (cached after the first call).
    pub fn version(&self, runner: &dyn crate::process::ProcessRunner) -> Option<Version> {
        let cache = self.cached_version.get_or_init(|| Mutex::new(None));
        {
            let guard = cache.lock().unwrap();
            if let Some(v) = *guard {
                return Some(v);
            }
        }
        let cmd = CommandSpec::new(&self.executable).arg(&self.version_probe_arg);
        let config = HarnessConfig {
            check: false,
            capture_stdout: true,
            ..HarnessConfig::default()
        };
        let output = runner.run(&cmd, &config).ok()?;
        let text = output.captured_stdout?;
        let version = (self.version_parser)(&text)?;
        *cache.lock().unwrap() = Some(version);
        Some(version)
    }

    /// True if the probed version is `>= required`, comparing lexicographically.
    pub fn version_gte(&self, runner: &dyn crate::process::ProcessRunner, required: Version) -> bool {
        self.version(runner).is_some_and(|v| v >= required)
    }

    /// A sibling adapter with a different executable but the same docker
    /// image and highlight rules (spec §4.5 `derive`, e.g. `klayout`
    /// alongside a main synthesis tool).
    pub fn derive(&self, executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            docker_image: self.docker_image.clone(),
            version_probe_arg: self.version_probe_arg.clone(),
            version_parser: self.version_parser,
            min_version: self.min_version,
            default_args: Vec::new(),
            highlight_rules: self.highlight_rules.clone(),
            redirect_stdout: self.redirect_stdout.clone(),
            cached_version: OnceCell::new(),
        }
    }
}

/// Parse a `major.minor.patch`-shaped version out of free-form text,
/// taking the first match of that shape.
pub fn parse_semver_like(text: &str) -> Option<Version> {
    let re = regex::Regex::new(r"(\d+)\.(\d+)\.(\d+)").ok()?;
    let caps = re.captures(text)?;
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessRunner;

    struct FakeRunner {
        version_text: &'static str,
    }

    impl ProcessRunner for FakeRunner {
        fn run(
            &self,
            _cmd: &CommandSpec,
            _config: &HarnessConfig,
        ) -> Result<ProcessOutput, ProcessError> {
            Ok(ProcessOutput {
                exit_code: Some(0),
                captured_stdout: Some(self.version_text.to_string()),
                timed_out: false,
            })
        }
    }

    #[test]
    fn parses_semver_like_version() {
        assert_eq!(parse_semver_like("Vivado v2023.2.1 (64-bit)"), Some((2023, 2, 1)));
    }

    #[test]
    fn version_is_cached_after_first_probe() {
        let adapter = ToolAdapter::new("vivado", parse_semver_like);
        let runner = FakeRunner {
            version_text: "Vivado v2023.2.1",
        };
        let v1 = adapter.version(&runner).unwrap();
        let v2 = adapter.version(&runner).unwrap();
        assert_eq!(v1, v2);
        assert_eq!(v1, (2023, 2, 1));
    }

    #[test]
    fn version_gte_compares_lexicographically() {
        let adapter = ToolAdapter::new("vivado", parse_semver_like);
        let runner = FakeRunner {
            version_text: "2023.2.1",
        };
        assert!(adapter.version_gte(&runner, (2022, 0, 0)));
        assert!(!adapter.version_gte(&runner, (2024, 0, 0)));
    }

    #[test]
    fn derive_shares_docker_and_highlight_but_not_version_cache() {
        let mut adapter = ToolAdapter::new("vivado", parse_semver_like);
        adapter.docker_image = Some("xeda/vivado".to_string());
        let sibling = adapter.derive("klayout");
        assert_eq!(sibling.executable, "klayout");
        assert_eq!(sibling.docker_image.as_deref(), Some("xeda/vivado"));
    }
}
