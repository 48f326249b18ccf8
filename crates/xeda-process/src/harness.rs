use crate::command_spec::CommandSpec;
use crate::error::ProcessError;
use camino::Utf8PathBuf;
use regex::Regex;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// A `pattern -> replacement` rule applied to the first match against each
/// output line before it is printed (spec §4.4 `highlight-rules`).
#[derive(Debug, Clone)]
pub struct HighlightRule {
    pub pattern: Regex,
    pub replacement: String,
}

/// Which stream a captured line originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTag {
    Stdout,
    Stderr,
}

/// Configuration for one harness invocation (spec §4.4 inputs).
pub struct HarnessConfig {
    pub timeout: Duration,
    /// Fail with [`ProcessError::NonZeroExitCode`] on a non-zero exit.
    pub check: bool,
    pub colour: bool,
    pub highlight_rules: Vec<HighlightRule>,
    /// When set, every merged output line is appended here.
    pub stdout_log: Option<Utf8PathBuf>,
    /// When true, the full merged output is accumulated and returned.
    pub capture_stdout: bool,
    /// Prefix printed before every console line.
    pub prefix: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2 * 3600),
            check: true,
            colour: false,
            highlight_rules: Vec::new(),
            stdout_log: None,
            capture_stdout: false,
            prefix: None,
        }
    }
}

/// Result of one harness invocation (spec §4.4 outputs).
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub captured_stdout: Option<String>,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

enum Event {
    Line { text: String },
    ReaderDone,
}

const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Spawn `cmd`, stream its merged stdout/stderr line by line, and enforce
/// `config.timeout`.
///
/// Real pseudo-terminal allocation (spec §4.4: "stdout and stderr merged
/// into one pseudo-terminal") is not available anywhere in this crate's
/// dependency stack; this harness approximates the same externally
/// observable contract — one interleaved, line-buffered stream, decoded
/// lossily as UTF-8 — using two piped reader threads merged onto a single
/// channel, which is sufficient for non-interactive tool invocation.
///
/// Grounded on `crates/xchecker-utils/src/runner/native.rs`'s
/// thread + `mpsc::channel` + `recv_timeout` timeout idiom.
pub fn run(cmd: &CommandSpec, config: &HarnessConfig) -> Result<ProcessOutput, ProcessError> {
    let program = cmd.program.to_string_lossy().to_string();
    which::which(&cmd.program).map_err(|_| ProcessError::ExecutableNotFound {
        name: program.clone(),
        searched: std::env::var("PATH").unwrap_or_default(),
    })?;

    let mut command = cmd.to_command();
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|e| ProcessError::Spawn {
        program: program.clone(),
        source: e,
    })?;

    let (tx, rx) = mpsc::channel::<Event>();
    let stdout_tx = tx.clone();
    let stderr_tx = tx;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let stdout_handle = spawn_reader(stdout, stdout_tx);
    let stderr_handle = spawn_reader(stderr, stderr_tx);

    let mut log_file = match &config.stdout_log {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            Some(
                std::fs::File::create(path.as_std_path()).map_err(|e| {
                    ProcessError::StdoutLog {
                        path: path.clone(),
                        source: e,
                    }
                })?,
            )
        }
        None => None,
    };

    let mut captured = config.capture_stdout.then(String::new);
    let deadline = Instant::now() + config.timeout;
    let mut readers_done = 0u8;
    let mut timed_out = false;

    loop {
        if readers_done == 2 {
            break;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            terminate(&mut child);
            timed_out = true;
            // keep draining whatever the readers already buffered, briefly
            let drain_deadline = Instant::now() + GRACE_PERIOD;
            while readers_done < 2 {
                let left = drain_deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    break;
                }
                match rx.recv_timeout(left) {
                    Ok(Event::Line { text }) => {
                        emit_line(&text, config, &mut log_file, captured.as_mut());
                    }
                    Ok(Event::ReaderDone) => readers_done += 1,
                    Err(_) => break,
                }
            }
            break;
        }
        match rx.recv_timeout(remaining) {
            Ok(Event::Line { text }) => {
                emit_line(&text, config, &mut log_file, captured.as_mut());
            }
            Ok(Event::ReaderDone) => readers_done += 1,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(ProcessError::MonitorDisconnected)
            }
        }
    }

    let _ = stdout_handle.join();
    let _ = stderr_handle.join();

    let exit_code = if timed_out {
        None
    } else {
        let status = child.wait().map_err(|e| ProcessError::Wait {
            program: program.clone(),
            source: e,
        })?;
        status.code()
    };

    let argv = std::iter::once(program.clone())
        .chain(cmd.args.iter().map(|a| a.to_string_lossy().to_string()))
        .collect::<Vec<_>>();

    if timed_out {
        return Err(ProcessError::TimeoutExpired {
            argv,
            timeout_seconds: config.timeout.as_secs(),
        });
    }

    if config.check {
        if let Some(code) = exit_code {
            if code != 0 {
                return Err(ProcessError::NonZeroExitCode { argv, code });
            }
        }
    }

    Ok(ProcessOutput {
        exit_code,
        captured_stdout: captured,
        timed_out,
    })
}

fn spawn_reader<R: std::io::Read + Send + 'static>(
    reader: R,
    tx: mpsc::Sender<Event>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf_reader = BufReader::new(reader);
        loop {
            let mut line = String::new();
            match read_lossy_line(&mut buf_reader, &mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Event::Line { text: line }).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        let _ = tx.send(Event::ReaderDone);
    })
}

/// Read one line of bytes and decode as UTF-8 with replacement, matching
/// the "decode lossily, split on line boundaries, hold a trailing partial
/// line" behavior from spec §4.4.
fn read_lossy_line<R: BufRead>(reader: &mut R, out: &mut String) -> std::io::Result<usize> {
    let mut bytes = Vec::new();
    let n = reader.read_until(b'\n', &mut bytes)?;
    if n == 0 {
        return Ok(0);
    }
    while bytes.last() == Some(&b'\n') || bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    out.push_str(&String::from_utf8_lossy(&bytes));
    Ok(n)
}

fn emit_line(
    line: &str,
    config: &HarnessConfig,
    log_file: &mut Option<std::fs::File>,
    captured: Option<&mut String>,
) {
    if let Some(file) = log_file {
        let _ = writeln!(file, "{line}");
    }
    if let Some(captured) = captured {
        captured.push_str(line);
        captured.push('\n');
    }
    let rewritten = highlight(line, &config.highlight_rules);
    let prefixed = match &config.prefix {
        Some(prefix) => format!("{prefix}{rewritten}"),
        None => rewritten,
    };
    if config.colour {
        println!("{prefixed}");
    } else {
        println!("{}", strip_ansi(&prefixed));
    }
}

fn highlight(line: &str, rules: &[HighlightRule]) -> String {
    for rule in rules {
        if rule.pattern.is_match(line) {
            return rule.pattern.replace(line, rule.replacement.as_str()).into_owned();
        }
    }
    line.to_string()
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            if chars.peek() == Some(&'[') {
                chars.next();
                for c2 in chars.by_ref() {
                    if c2.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    let pid = Pid::from_raw(child.id() as i32);
    let _ = kill(pid, Signal::SIGTERM);
    thread::sleep(GRACE_PERIOD.min(Duration::from_millis(500)));
    let _ = kill(pid, Signal::SIGKILL);
    let _ = child.kill();
}

#[cfg(windows)]
fn terminate(child: &mut Child) {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

    let pid = child.id();
    unsafe {
        if let Ok(handle) = OpenProcess(PROCESS_TERMINATE, false, pid) {
            let _ = TerminateProcess(handle, 1);
            let _ = CloseHandle(handle);
        }
    }
    let _ = child.kill();
}

#[cfg(not(any(unix, windows)))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_cmd(text: &str) -> CommandSpec {
        CommandSpec::new("echo").arg(text)
    }

    #[test]
    fn runs_successfully_and_captures_output() {
        let mut config = HarnessConfig {
            check: true,
            capture_stdout: true,
            timeout: Duration::from_secs(5),
            ..HarnessConfig::default()
        };
        config.colour = false;
        let output = run(&echo_cmd("hello-xeda"), &config).unwrap();
        assert!(output.success());
        assert!(output.captured_stdout.unwrap().contains("hello-xeda"));
    }

    #[test]
    fn missing_executable_reports_not_found() {
        let cmd = CommandSpec::new("definitely-not-a-real-eda-tool-xyz");
        let config = HarnessConfig::default();
        let err = run(&cmd, &config).unwrap_err();
        assert!(matches!(err, ProcessError::ExecutableNotFound { .. }));
    }

    #[test]
    fn non_zero_exit_is_reported_when_check_is_set() {
        let cmd = CommandSpec::new("false");
        let config = HarnessConfig {
            check: true,
            timeout: Duration::from_secs(5),
            ..HarnessConfig::default()
        };
        let err = run(&cmd, &config).unwrap_err();
        assert!(matches!(err, ProcessError::NonZeroExitCode { .. }));
    }

    #[test]
    fn non_zero_exit_is_tolerated_when_check_is_unset() {
        let cmd = CommandSpec::new("false");
        let config = HarnessConfig {
            check: false,
            timeout: Duration::from_secs(5),
            ..HarnessConfig::default()
        };
        let output = run(&cmd, &config).unwrap();
        assert_eq!(output.exit_code, Some(1));
    }

    #[test]
    fn timeout_is_enforced() {
        let cmd = CommandSpec::new("sleep").arg("30");
        let config = HarnessConfig {
            timeout: Duration::from_millis(200),
            ..HarnessConfig::default()
        };
        let err = run(&cmd, &config).unwrap_err();
        assert!(matches!(err, ProcessError::TimeoutExpired { .. }));
    }

    #[test]
    fn highlight_rule_rewrites_matching_lines() {
        let rules = vec![HighlightRule {
            pattern: Regex::new(r"ERROR").unwrap(),
            replacement: "** $0 **".to_string(),
        }];
        assert_eq!(highlight("ERROR: timing failed", &rules), "** ERROR **: timing failed");
        assert_eq!(highlight("all good", &rules), "all good");
    }

    #[test]
    fn strip_ansi_removes_escape_codes() {
        assert_eq!(strip_ansi("\u{1b}[31mred\u{1b}[0m"), "red");
    }
}
