//! CLI command definitions for cryptol-eval.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{load_tasks, Task, VerificationPlan};
use crate::llm::{
    LiteLlmClient, LlmProvider, OfflineProvider, API_BASE_ENV, API_KEY_ENV, OFFLINE_MODEL,
};
use crate::metrics::RunMetrics;
use crate::runner::{
    timestamp_tag, EvalConfig, EvalRunner, MetricsReport, RunWriter, TaskSummary,
};
use crate::session::CryptolRpcSession;

/// pass@k evaluation harness for model-generated Cryptol.
#[derive(Parser)]
#[command(name = "cryptol-eval")]
#[command(about = "Evaluate code models on Cryptol generation tasks")]
#[command(version)]
#[command(
    long_about = "cryptol-eval draws k generations per task, type-checks each with cryptol and verifies it with a SAW harness or assertion statements run in a Cryptol remote API session.\n\nExample usage:\n  cryptol-eval run --tasks ./tasks.jsonl -k 5 --output-dir ./outputs"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run an evaluation and write generations, transcript and metrics.
    #[command(alias = "eval")]
    Run(Box<RunArgs>),

    /// Load a task catalog and print what each task would run.
    Tasks(TasksArgs),
}

/// Arguments for `cryptol-eval run`.
///
/// Every flag is optional so that values from `--config` survive unless a
/// flag overrides them.
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// YAML configuration file; explicit flags take precedence over its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// JSON-lines task catalog.
    #[arg(short, long, env = "CRYPTOL_EVAL_TASKS")]
    pub tasks: Option<PathBuf>,

    /// Model identifier sent to the provider.
    #[arg(short, long, env = "CRYPTOL_EVAL_MODEL")]
    pub model: Option<String>,

    /// Attempts per task when the task does not set its own `k`.
    #[arg(short = 'k', long = "k")]
    pub k: Option<u32>,

    /// Root directory for run artifacts.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Directory for generated scratch files.
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Keep scratch files after checking.
    #[arg(long)]
    pub keep_scratch: bool,

    /// Cryptol executable.
    #[arg(long, env = "CRYPTOL_BIN")]
    pub cryptol: Option<String>,

    /// SAW executable.
    #[arg(long, env = "SAW_BIN")]
    pub saw: Option<String>,

    /// Compile check timeout in seconds.
    #[arg(long)]
    pub compile_timeout: Option<u64>,

    /// Proof harness timeout in seconds.
    #[arg(long)]
    pub harness_timeout: Option<u64>,

    /// Cryptol remote API URL for assertion tasks.
    #[arg(long, env = "CRYPTOL_SERVER_URL")]
    pub session_url: Option<String>,

    /// Scratch directory as mounted on the session server.
    #[arg(long)]
    pub session_source_dir: Option<PathBuf>,

    /// OpenAI-compatible API base URL.
    #[arg(long, env = API_BASE_ENV)]
    pub api_base: Option<String>,

    /// API token for the model endpoint.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Sampling temperature.
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Use the built-in offline generator instead of calling a model.
    #[arg(long)]
    pub offline: bool,

    /// Record generations only; skip compile checks and verification.
    #[arg(long)]
    pub generate_only: bool,
}

/// Arguments for `cryptol-eval tasks`.
#[derive(Parser, Debug)]
pub struct TasksArgs {
    /// JSON-lines task catalog.
    pub path: PathBuf,

    /// Attempts assumed for tasks without their own `k`.
    #[arg(short = 'k', long = "k", default_value = "5")]
    pub k: u32,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => {
            run_eval_command(*args).await?;
        }
        Commands::Tasks(args) => {
            run_tasks_command(args)?;
        }
    }
    Ok(())
}

// ============================================================================
// Run Command Implementation
// ============================================================================

/// Summary printed to stdout when a run finishes.
#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    run_dir: String,
    #[serde(flatten)]
    report: MetricsReport<'a>,
    tasks: &'a [TaskSummary],
}

async fn run_eval_command(args: RunArgs) -> anyhow::Result<()> {
    let mut config = build_config(&args)?;

    let tasks = load_tasks(&config.tasks_path)?;
    if tasks.is_empty() {
        warn!("Task catalog {} is empty", config.tasks_path.display());
    }

    let provider: Box<dyn LlmProvider> = if args.offline {
        info!("Using offline generator");
        config.model = OFFLINE_MODEL.to_string();
        Box::new(OfflineProvider::new())
    } else {
        let api_key = args.api_key.clone().filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            return Err(anyhow::anyhow!(
                "No API token found. Set {} or pass --api-key, or use --offline.",
                API_KEY_ENV
            ));
        }
        info!(
            model = %config.model,
            api_base = %config.api_base,
            "Using chat completions endpoint"
        );
        Box::new(LiteLlmClient::new(
            config.api_base.clone(),
            api_key,
            config.model.clone(),
            config.request_timeout(),
        )?)
    };

    let mut session = CryptolRpcSession::new(&config.session_url, config.session_timeout())?;
    let mut writer = RunWriter::create(&config.output_dir, timestamp_tag(Utc::now()))?;
    let runner = EvalRunner::from_config(&config, provider)?;
    if config.generate_only {
        info!("Generate-only run: compile checks and verification are skipped");
    } else {
        info!(url = session.url(), "Assertion tasks use the Cryptol remote API");
    }

    let report = runner.run(&tasks, &mut session, &mut writer).await?;
    let metrics_path = writer.write_metrics(runner.model(), &report.metrics)?;
    info!("Metrics written to {}", metrics_path.display());

    print_summary(
        runner.model(),
        writer.tag(),
        writer.run_dir(),
        &report.metrics,
        &report.tasks,
    )?;
    Ok(())
}

/// Layers the YAML config (if any), then explicit flags, over the defaults.
fn build_config(args: &RunArgs) -> anyhow::Result<EvalConfig> {
    let mut config = match &args.config {
        Some(path) => EvalConfig::from_yaml_file(path)?,
        None => EvalConfig::default(),
    };

    if let Some(tasks) = &args.tasks {
        config.tasks_path = tasks.clone();
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(k) = args.k {
        config.default_k = k;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(dir) = &args.scratch_dir {
        config.scratch_dir = dir.clone();
    }
    if args.keep_scratch {
        config.keep_scratch = true;
    }
    if args.generate_only {
        config.generate_only = true;
    }
    if let Some(program) = &args.cryptol {
        config.cryptol_program = program.clone();
    }
    if let Some(program) = &args.saw {
        config.saw_program = program.clone();
    }
    if let Some(secs) = args.compile_timeout {
        config = config.with_compile_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.harness_timeout {
        config = config.with_harness_timeout(Duration::from_secs(secs));
    }
    if let Some(url) = &args.session_url {
        config.session_url = url.clone();
    }
    if let Some(dir) = &args.session_source_dir {
        config.session_source_dir = Some(dir.clone());
    }
    if let Some(base) = &args.api_base {
        config.api_base = base.clone();
    }
    if let Some(temperature) = args.temperature {
        config.temperature = temperature;
    }

    config.validate()?;
    Ok(config)
}

fn print_summary(
    model: &str,
    tag: &str,
    run_dir: &Path,
    metrics: &RunMetrics,
    tasks: &[TaskSummary],
) -> anyhow::Result<()> {
    let summary = RunSummary {
        run_dir: run_dir.display().to_string(),
        report: MetricsReport {
            model,
            timestamp: tag,
            metrics,
        },
        tasks,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

// ============================================================================
// Tasks Command Implementation
// ============================================================================

#[derive(Debug, Serialize)]
struct TaskOverview<'a> {
    task_id: &'a str,
    task_type: String,
    attempts: u32,
    verification: String,
}

fn describe_plan(task: &Task) -> String {
    match task.verification_plan() {
        VerificationPlan::None => "compile only".to_string(),
        VerificationPlan::Harness(path) => format!("harness {}", path.display()),
        VerificationPlan::Assertions(statements) => format!("{} assertions", statements.len()),
    }
}

fn run_tasks_command(args: TasksArgs) -> anyhow::Result<()> {
    let tasks = load_tasks(&args.path)?;
    let overview: Vec<TaskOverview> = tasks
        .iter()
        .map(|task| TaskOverview {
            task_id: &task.task_id,
            task_type: task.task_type.to_string(),
            attempts: task.attempts(args.k),
            verification: describe_plan(task),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&overview)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "cryptol-eval",
            "run",
            "--tasks",
            "suite.jsonl",
            "-k",
            "3",
            "--offline",
            "--keep-scratch",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "info");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.tasks, Some(PathBuf::from("suite.jsonl")));
                assert_eq!(args.k, Some(3));
                assert!(args.offline);
                assert!(args.keep_scratch);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_flags_override_yaml_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("eval.yaml");
        fs::write(&path, "model: yaml/model\ndefault_k: 2\nsaw_program: /opt/saw\n").unwrap();

        let args = RunArgs {
            config: Some(path),
            model: Some("flag/model".to_string()),
            compile_timeout: Some(5),
            ..Default::default()
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.model, "flag/model");
        assert_eq!(config.default_k, 2);
        assert_eq!(config.saw_program, "/opt/saw");
        assert_eq!(config.compile_timeout_secs, 5);
    }

    #[test]
    fn test_generate_only_flag_sets_config() {
        let cli = Cli::try_parse_from(["cryptol-eval", "run", "--generate-only"]).unwrap();
        let args = match cli.command {
            Commands::Run(args) => args,
            _ => panic!("expected run command"),
        };
        assert!(args.generate_only);
        assert!(build_config(&args).unwrap().generate_only);

        assert!(!build_config(&RunArgs::default()).unwrap().generate_only);
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let args = RunArgs {
            k: Some(0),
            ..Default::default()
        };
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_describe_plan() {
        assert_eq!(describe_plan(&Task::new("a", "p")), "compile only");
        assert_eq!(
            describe_plan(&Task::new("b", "p").with_tests(vec!["True".to_string()])),
            "1 assertions"
        );
    }
}
