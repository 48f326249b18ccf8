use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

/// Specification for a command to execute, built only from discrete argv
/// elements. No implementation in this crate ever evaluates a shell
/// string (`sh -c`, `cmd /C`); [`Self::to_command`] always goes through
/// `Command::new().args()`.
///
/// Grounded on `crates/xchecker-runner/src/command_spec.rs`.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    pub env: HashMap<OsString, OsString>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Build a `std::process::Command` from this spec. Always uses
    /// `Command::new().args()`; never a shell.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        for (k, v) in &self.env {
            command.env(k, v);
        }
        command
    }

    /// Wrap this spec to run inside `docker run --rm -i -t`, bind-mounting
    /// both the caller's cwd and the command's own working directory
    /// (spec §4.4 docker adapter). Environment overrides are written to
    /// `env_file` by the caller and referenced via `--env-file`.
    pub fn dockerized(&self, image: &str, env_file: Option<&std::path::Path>) -> Self {
        let wd = self
            .cwd
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
        let cwd = std::env::current_dir().unwrap_or_default();
        let mut docker = CommandSpec::new("docker").args(["run", "--rm", "-i", "-t"]);
        docker = docker.arg(format!("--workdir={}", wd.display()));
        docker = docker.arg(format!("--volume={}:{}", cwd.display(), cwd.display()));
        docker = docker.arg(format!("--volume={}:{}", wd.display(), wd.display()));
        if let Some(env_file) = env_file {
            docker = docker.arg(format!("--env-file={}", env_file.display()));
        }
        docker = docker.arg(image);
        docker = docker.arg(&self.program);
        docker.args(self.args.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_argv_without_shell() {
        let cmd = CommandSpec::new("vivado").arg("-mode").arg("batch");
        assert_eq!(cmd.args.len(), 2);
        let command = cmd.to_command();
        assert_eq!(command.get_program(), "vivado");
    }

    #[test]
    fn dockerized_wraps_with_volumes_and_workdir() {
        let cmd = CommandSpec::new("yosys")
            .arg("-s")
            .arg("script.ys")
            .cwd("/work/run1");
        let wrapped = cmd.dockerized("xeda/yosys:latest", None);
        assert_eq!(wrapped.program, "docker");
        let args: Vec<String> = wrapped
            .args
            .iter()
            .map(|s| s.to_string_lossy().to_string())
            .collect();
        assert!(args.contains(&"yosys".to_string()));
        assert!(args.iter().any(|a| a.contains("/work/run1")));
        assert!(args.contains(&"xeda/yosys:latest".to_string()));
    }
}
