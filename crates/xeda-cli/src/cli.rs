//! Command-line surface (spec §6): `run`, `dse`, `list-flows`,
//! `list-settings`, `scrub`, plus exit-code mapping.
//!
//! Grounded on `src/cli.rs`'s `clap`-derive `Parser`/`Subcommand` shape
//! (one `Args` struct per subcommand) and on `src/main.rs`'s pattern of
//! mapping a terminal `Result` to a process exit code.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use xeda_design::{Design, Language, RtlSettings, TbSettings};
use xeda_dse::Optimizer;
use xeda_engine::{EngineError, Launcher, LauncherSettings};
use xeda_flow::{Flow, FlowError};

use crate::design_file::{load_design_file, load_xedaproject_file};
use crate::error::CliError;
use crate::exit_codes::{self, codes};
use crate::report;

const DEFAULT_RUN_DIR: &str = "xeda_run";

#[derive(Debug, Parser)]
#[command(name = "xeda", version, about = "EDA tool-chain orchestration engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug-level logging.
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Launch a single flow against a design.
    Run(RunArgs),
    /// Run a design-space exploration search over a flow's settings.
    Dse(DseArgs),
    /// List flow names currently registered.
    ListFlows,
    /// Show a flow's effective settings schema (its defaults and any
    /// validation errors against an empty override set).
    ListSettings(ListSettingsArgs),
    /// Remove stale run directories for a flow.
    Scrub(ScrubArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    pub flow_name: String,

    #[arg(long, conflicts_with = "xedaproject")]
    pub design: Option<Utf8PathBuf>,

    #[arg(long, conflicts_with = "design")]
    pub xedaproject: Option<Utf8PathBuf>,

    /// Which design to run when `--xedaproject` declares more than one.
    #[arg(long)]
    pub design_name: Option<String>,

    #[arg(long = "flow-settings", value_name = "KEY=VALUE")]
    pub flow_settings: Vec<String>,

    #[arg(long)]
    pub xeda_run_dir: Option<Utf8PathBuf>,

    #[arg(long)]
    pub clean: bool,

    #[arg(long)]
    pub incremental: bool,

    #[arg(long)]
    pub scrub: bool,
}

#[derive(Debug, Args)]
pub struct DseArgs {
    pub flow_name: String,

    #[arg(long, conflicts_with = "xedaproject")]
    pub design: Option<Utf8PathBuf>,

    #[arg(long, conflicts_with = "design")]
    pub xedaproject: Option<Utf8PathBuf>,

    /// Which design to run when `--xedaproject` declares more than one.
    #[arg(long)]
    pub design_name: Option<String>,

    #[arg(long, default_value = "fmax_optimizer")]
    pub optimizer: String,

    #[arg(long, default_value_t = 50.0)]
    pub init_freq_low: f64,

    #[arg(long, default_value_t = 300.0)]
    pub init_freq_high: f64,

    #[arg(long)]
    pub max_workers: Option<usize>,

    #[arg(long)]
    pub xeda_run_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Args)]
pub struct ListSettingsArgs {
    pub flow_name: String,
}

#[derive(Debug, Args)]
pub struct ScrubArgs {
    pub flow_name: String,
    pub design_name: String,

    #[arg(long)]
    pub xeda_run_dir: Option<Utf8PathBuf>,

    /// Skip the interactive confirmation prompt.
    #[arg(long)]
    pub yes: bool,
}

/// Parse arguments, dispatch, and return the process exit code. Grounded
/// on `src/main.rs`'s thin `main` that maps `cli::run()`'s result to
/// `std::process::exit`.
pub fn run() -> i32 {
    let cli = Cli::parse();
    crate::logging::init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Run(args) => cmd_run(args),
        Commands::Dse(args) => cmd_dse(args),
        Commands::ListFlows => Ok(cmd_list_flows()),
        Commands::ListSettings(args) => cmd_list_settings(&args.flow_name),
        Commands::Scrub(args) => cmd_scrub(args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            exit_code_for_cli_error(&e)
        }
    }
}

fn exit_code_for_cli_error(error: &CliError) -> i32 {
    match error {
        CliError::Engine(e) => exit_codes::exit_code_for(e),
        _ => codes::FATAL_ERROR,
    }
}

fn resolve_run_dir(explicit: Option<Utf8PathBuf>) -> Utf8PathBuf {
    explicit
        .or_else(|| std::env::var("XEDA_RUN_DIR").ok().map(Utf8PathBuf::from))
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_RUN_DIR))
}

/// Load the design named by `--design` or `--xedaproject`, along with any
/// flow-settings layers it carries (spec §4.3's `XedaProjectTable` and
/// `DesignEmbedded` override sources).
fn resolve_design(
    design: Option<&Utf8PathBuf>,
    xedaproject: Option<&Utf8PathBuf>,
    design_name: Option<&str>,
    flow_name: &str,
) -> Result<(Design, Option<Value>, Option<Value>), CliError> {
    match (design, xedaproject) {
        (Some(path), None) => {
            let (design, flow_defaults) = load_design_file(path)?;
            let embedded = flow_defaults.get(flow_name).cloned();
            Ok((design, None, embedded))
        }
        (None, Some(path)) => {
            let project = load_xedaproject_file(path)?;
            let project_layer = project.flows.get(flow_name).cloned();
            let (design, flow_defaults) = project.resolve_design(design_name)?.clone();
            let embedded = flow_defaults.get(flow_name).cloned();
            Ok((design, project_layer, embedded))
        }
        _ => Err(CliError::MissingDesignSource),
    }
}

/// Merge settings layers in increasing precedence order (spec §4.3),
/// omitting any source that contributed nothing. Flow-class defaults are
/// deliberately not included here: they are applied by the flow's own
/// constructor when it validates the merged settings against its schema.
fn merge_flow_settings(
    project_layer: Option<Value>,
    design_embedded_layer: Option<Value>,
    cli_overrides: &[String],
) -> Result<Value, CliError> {
    let mut layers = Vec::new();
    if let Some(v) = project_layer {
        layers.push(v);
    }
    if let Some(v) = design_embedded_layer {
        layers.push(v);
    }
    if !cli_overrides.is_empty() {
        let mut cli_layer = json!({});
        xeda_settings::apply_overrides(&mut cli_layer, cli_overrides.iter().map(String::as_str))?;
        layers.push(cli_layer);
    }
    Ok(xeda_settings::merge_layers(layers.iter()))
}

fn cmd_run(args: RunArgs) -> Result<i32, CliError> {
    let run_dir = resolve_run_dir(args.xeda_run_dir.clone());
    let (design, project_layer, embedded_layer) =
        resolve_design(args.design.as_ref(), args.xedaproject.as_ref(), args.design_name.as_deref(), &args.flow_name)?;
    let flow_settings = merge_flow_settings(project_layer, embedded_layer, &args.flow_settings)?;

    tracing::info!(flow = %args.flow_name, design = %design.name, run_dir = %run_dir, "launching flow");

    let launcher_settings = LauncherSettings {
        clean: args.clean,
        incremental: args.incremental,
        scrub_old_runs: args.scrub,
        ..LauncherSettings::default()
    };
    let launcher = Launcher::new(run_dir, launcher_settings)?;
    let design_name = design.name.clone();
    let flow = launcher.launch(&args.flow_name, design, flow_settings, false, vec![])?;

    let results = flow.results();
    println!("run path: {}", flow.run_path());
    println!("{}", report::render_results_table(&format!("{} {design_name}", args.flow_name), results));

    Ok(if results.success { codes::SUCCESS } else { codes::FLOW_FAILURE })
}

fn cmd_dse(args: DseArgs) -> Result<i32, CliError> {
    if args.optimizer != "fmax_optimizer" {
        eprintln!("unknown optimizer '{}': only 'fmax_optimizer' is available", args.optimizer);
        return Ok(codes::FATAL_ERROR);
    }

    let run_dir = resolve_run_dir(args.xeda_run_dir.clone());
    let (design, project_layer, embedded_layer) =
        resolve_design(args.design.as_ref(), args.xedaproject.as_ref(), args.design_name.as_deref(), &args.flow_name)?;
    let base_settings = merge_flow_settings(project_layer, embedded_layer, &[])?;

    tracing::info!(flow = %args.flow_name, design = %design.name, optimizer = %args.optimizer, "starting design-space exploration");

    let fmax_settings = xeda_dse::FmaxSettings::new(args.init_freq_low, args.init_freq_high)?;

    let mut dse_settings = xeda_dse::DseSettings::default();
    if let Some(max_workers) = args.max_workers {
        dse_settings.max_workers = max_workers;
    }
    let mut optimizer = xeda_dse::FmaxOptimizer::new(dse_settings.max_workers, base_settings, fmax_settings);

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");
    let best_json_path = Utf8PathBuf::from(format!("fmax_{}_{}_{timestamp}.json", design.name, args.flow_name));

    let design_name = design.name.clone();
    xeda_dse::run_flow(&mut optimizer, &args.flow_name, design, run_dir, &dse_settings, &best_json_path)?;

    match optimizer.best() {
        Some(best) => {
            println!("best result written to {best_json_path}");
            println!("{}", report::render_results_table(&format!("{} {design_name}", args.flow_name), &best.results));
            Ok(codes::SUCCESS)
        }
        None => {
            eprintln!("dse for '{}' on design '{design_name}' found no successful candidate", args.flow_name);
            Ok(codes::FLOW_FAILURE)
        }
    }
}

fn cmd_list_flows() -> i32 {
    for name in xeda_flow::registered_names() {
        println!("{name}");
    }
    codes::SUCCESS
}

fn probe_design() -> Design {
    Design {
        name: "probe".to_string(),
        rtl: RtlSettings::default(),
        tb: TbSettings::default(),
        language: Language::default(),
        root_path: Utf8PathBuf::from("."),
    }
}

fn cmd_list_settings(flow_name: &str) -> Result<i32, CliError> {
    match xeda_flow::construct(flow_name, json!({}), probe_design(), Utf8PathBuf::from("xeda_list_settings_probe")) {
        Ok(flow) => {
            println!("{}", serde_json::to_string_pretty(flow.settings_value()).unwrap_or_default());
            Ok(codes::SUCCESS)
        }
        Err(FlowError::Settings(validation)) => {
            // Validation errors enumerate every failing field (spec §7);
            // that enumeration *is* the settings schema for this purpose.
            println!("{validation}");
            Ok(codes::SUCCESS)
        }
        Err(FlowError::UnknownFlow(name)) => {
            eprintln!("no flow registered under the name '{name}'");
            Ok(codes::FATAL_ERROR)
        }
        Err(other) => Err(CliError::Engine(EngineError::Flow(other))),
    }
}

fn cmd_scrub(args: ScrubArgs) -> Result<i32, CliError> {
    cmd_scrub_with(args, confirm_via_stdin)
}

/// `cmd_scrub`'s body, parameterized over the confirmation prompt so tests
/// can inject an always-confirm/always-deny stub instead of reading stdin.
fn cmd_scrub_with(args: ScrubArgs, confirm: impl FnOnce() -> bool) -> Result<i32, CliError> {
    let run_dir = resolve_run_dir(args.xeda_run_dir.clone());
    let design_dir = run_dir.join(xeda_runpath::sanitize_filename(&args.design_name));
    let candidates = xeda_runpath::find_scrub_candidates(&args.flow_name, &design_dir, &[])?;

    if candidates.is_empty() {
        println!("no stale run directories found for flow '{}'", args.flow_name);
        return Ok(codes::SUCCESS);
    }

    println!("the following run directories will be removed:");
    for candidate in &candidates {
        println!("  {}", candidate.path);
    }

    if !args.yes && !confirm() {
        println!("aborted");
        return Ok(codes::SUCCESS);
    }

    let removed = xeda_runpath::remove_candidates(&candidates)?;
    println!("removed {removed} director{}", if removed == 1 { "y" } else { "ies" });
    Ok(codes::SUCCESS)
}

fn confirm_via_stdin() -> bool {
    print!("type 'yes' to confirm: ");
    use std::io::Write;
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    line.trim() == "yes"
}

#[cfg(test)]
mod scrub_tests {
    use super::*;

    fn args(yes: bool, run_dir: &Utf8PathBuf) -> ScrubArgs {
        ScrubArgs {
            flow_name: "stub_synth".to_string(),
            design_name: "top".to_string(),
            xeda_run_dir: Some(run_dir.clone()),
            yes,
        }
    }

    #[test]
    fn no_candidates_never_prompts_for_confirmation() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let code = cmd_scrub_with(args(false, &run_dir), || panic!("must not prompt")).unwrap();
        assert_eq!(code, codes::SUCCESS);
    }

    #[test]
    fn denied_confirmation_leaves_directories_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let design_dir = run_dir.join("top");
        let stale = design_dir.join("stub_synth_deadbeefcafebabe");
        std::fs::create_dir_all(&stale).unwrap();

        let code = cmd_scrub_with(args(false, &run_dir), || false).unwrap();
        assert_eq!(code, codes::SUCCESS);
        assert!(stale.exists());
    }

    #[test]
    fn confirmed_confirmation_removes_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let design_dir = run_dir.join("top");
        let stale = design_dir.join("stub_synth_deadbeefcafebabe");
        std::fs::create_dir_all(&stale).unwrap();

        let code = cmd_scrub_with(args(false, &run_dir), || true).unwrap();
        assert_eq!(code, codes::SUCCESS);
        assert!(!stale.exists());
    }
}
