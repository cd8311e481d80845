//! Halluguard CLI
//!
//! The `halluguard` command checks a model's answers against a knowledge
//! base and re-asks when an answer cannot be verified.
//!
//! ## Commands
//!
//! - `run`: Validate live against an OpenAI-compatible endpoint (`--record` saves the answers)
//! - `replay`: Validate offline from recorded responses
//! - `check-kb`: Load and validate a knowledge base file
//! - `show`: Print a persisted report (digest-verified)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use halluguard_core::{
    cancel_pair, init_tracing, read_report_artifact, render_result_lines, render_summary,
    CancelHandle, CancelSignal, Domain, JsonArtifactSink, KnowledgeBase, LogFormat, Matcher,
    ModelClient, RecordedClient, RecordingClient, ResultSink, RunConfig, ValidationReport,
    ValidationRun,
};
use halluguard_openai::{OpenAiClient, OpenAiConfig};
use tracing::{info, warn, Level};
use uuid::Uuid;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "halluguard.toml";

#[derive(Parser)]
#[command(name = "halluguard")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Detect and re-ask hallucinated model answers", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML run configuration (default: ./halluguard.toml if present)
    #[arg(short, long, global = true, env = "HALLUGUARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate answers from the configured model
    Run {
        #[command(flatten)]
        run: RunArgs,

        /// Also write every prompt and answer to a responses file for replay
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Validate recorded answers without calling a model
    Replay {
        #[command(flatten)]
        run: RunArgs,

        /// Recorded responses (JSON rows or question -> answers map)
        #[arg(long)]
        responses: PathBuf,
    },

    /// Load and validate a knowledge base
    CheckKb {
        /// Knowledge base file (overrides kb_source)
        #[arg(long)]
        kb: Option<PathBuf>,

        /// Include the bundled edge-case questions
        #[arg(long)]
        with_edge_cases: bool,
    },

    /// Show a persisted validation report
    Show {
        /// Run ID to show
        #[arg(long)]
        run: String,

        /// Root directory containing reports (overrides output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the raw report JSON instead of the summary
        #[arg(long)]
        raw: bool,
    },
}

/// Flags shared by `run` and `replay`. Each one overrides the config file
/// and environment.
#[derive(Args, Debug, Default, Clone)]
struct RunArgs {
    /// Knowledge base file
    #[arg(long)]
    kb: Option<PathBuf>,

    /// Retries per factual entry after the first attempt
    #[arg(long)]
    max_retries: Option<u32>,

    /// Model identity
    #[arg(long)]
    model: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Directory receiving the report artifact
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Include the bundled edge-case questions
    #[arg(long)]
    with_edge_cases: bool,

    /// Do not persist the report
    #[arg(long)]
    no_save: bool,
}

impl RunArgs {
    fn apply(&self, mut cfg: RunConfig) -> RunConfig {
        if let Some(kb) = &self.kb {
            cfg.kb_source = Some(kb.clone());
        }
        if let Some(n) = self.max_retries {
            cfg.max_retries = n;
        }
        if let Some(model) = &self.model {
            cfg.model = model.clone();
        }
        if let Some(ms) = self.timeout_ms {
            cfg.timeout_ms = ms;
        }
        if let Some(dir) = &self.output_dir {
            cfg.output_dir = dir.clone();
        }
        if self.with_edge_cases {
            cfg.include_default_edge_cases = true;
        }
        cfg
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(LogFormat::from_json_flag(cli.json), level);

    if let Ok(path) = dotenvy::dotenv() {
        info!(path = %path.display(), "loaded environment file");
    }
    let cfg = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { run, record } => {
            cmd_run(run.apply(cfg), !run.no_save, record.as_deref())
                .await
                .map(|_| ())
        }
        Commands::Replay { run, responses } => {
            cmd_replay(run.apply(cfg), &responses, !run.no_save)
                .await
                .map(|_| ())
        }
        Commands::CheckKb {
            kb,
            with_edge_cases,
        } => {
            let args = RunArgs {
                kb,
                with_edge_cases,
                ..RunArgs::default()
            };
            cmd_check_kb(&args.apply(cfg))
        }
        Commands::Show {
            run,
            output_dir,
            raw,
        } => cmd_show(&run, &output_dir.unwrap_or(cfg.output_dir), raw),
    }
}

/// Defaults, then the TOML file, then the process environment.
fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    let cfg = match path {
        Some(path) => RunConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            RunConfig::from_toml_file(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("Failed to load config {DEFAULT_CONFIG_FILE}"))?
        }
        None => RunConfig::default(),
    };
    cfg.with_process_env()
        .context("Invalid environment configuration")
}

/// Exit status for a run aborted by a second interrupt (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Cancel signal that fires on the first Ctrl-C. A second Ctrl-C exits
/// immediately, even while an entry is still waiting on the model.
fn ctrl_c_signal() -> CancelSignal {
    let (handle, signal) = cancel_pair();
    tokio::spawn(watch_interrupts(handle, || async {
        tokio::signal::ctrl_c().await.is_ok()
    }));
    signal
}

/// Cancel on the first interrupt and force an exit on the second.
async fn watch_interrupts<F, Fut>(handle: CancelHandle, next_interrupt: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    if !next_interrupt().await {
        return;
    }
    warn!("interrupt received, stopping after the current entry (Ctrl-C again to abort)");
    handle.cancel();

    if next_interrupt().await {
        warn!("second interrupt received, aborting");
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }
}

/// Validate live against the configured model.
async fn cmd_run(cfg: RunConfig, save: bool, record: Option<&Path>) -> Result<ValidationReport> {
    cfg.validate(true).context("Invalid run configuration")?;
    let kb = load_kb(&cfg)?;
    let client = OpenAiClient::new(OpenAiConfig::from_run_config(&cfg)?)
        .context("Failed to build model client")?;
    let cancel = ctrl_c_signal();
    match record {
        Some(path) => record_run(&cfg, &kb, client, path, &cancel, save).await,
        None => validate_and_report(&cfg, &kb, &client, &cancel, save).await,
    }
}

/// Validate through a recording client and write the responses file, even
/// when the run fails or is cancelled part way.
async fn record_run<C: ModelClient>(
    cfg: &RunConfig,
    kb: &KnowledgeBase,
    client: C,
    path: &Path,
    cancel: &CancelSignal,
    save: bool,
) -> Result<ValidationReport> {
    let recorder = RecordingClient::new(client);
    let outcome = validate_and_report(cfg, kb, &recorder, cancel, save).await;
    recorder
        .write_responses(path, Some(kb))
        .with_context(|| format!("Failed to write recorded responses {}", path.display()))?;
    println!("Responses: {}", path.display());
    outcome
}

/// Validate recorded responses.
async fn cmd_replay(cfg: RunConfig, responses: &Path, save: bool) -> Result<ValidationReport> {
    cfg.validate(false).context("Invalid run configuration")?;
    let client = RecordedClient::load(responses, format!("recorded:{}", cfg.model))
        .with_context(|| format!("Failed to load recorded responses {}", responses.display()))?;
    let kb = load_kb(&cfg)?;
    let report = validate_and_report(&cfg, &kb, &client, &ctrl_c_signal(), save).await?;
    if client.remaining() > 0 {
        warn!(unused = client.remaining(), "recorded responses left unused");
    }
    Ok(report)
}

fn load_kb(cfg: &RunConfig) -> Result<KnowledgeBase> {
    cfg.load_knowledge_base()
        .context("Failed to load knowledge base")
}

async fn validate_and_report(
    cfg: &RunConfig,
    kb: &KnowledgeBase,
    client: &dyn ModelClient,
    cancel: &CancelSignal,
    save: bool,
) -> Result<ValidationReport> {
    info!(entries = kb.len(), model = client.identity(), "starting validation");

    let run = ValidationRun::new(Matcher::new(cfg.matcher.clone()), cfg.retry_policy());
    let report = run
        .execute(kb, client, cancel)
        .await
        .context("Validation run did not complete")?;

    print!("{}", render_result_lines(&report));
    println!();
    print!("{}", render_summary(&report.stats()));

    if save {
        let mut sink = JsonArtifactSink::new(&cfg.output_dir);
        sink.accept(&report).context("Failed to write report")?;
        println!("Run ID: {}", report.run_id());
    }
    Ok(report)
}

/// Load and validate a knowledge base, print per-domain counts.
fn cmd_check_kb(cfg: &RunConfig) -> Result<()> {
    let kb = load_kb(cfg)?;
    println!("✓ Knowledge base is valid");
    println!("  Entries:    {}", kb.len());
    println!("  Factual:    {}", kb.count_by_domain(Domain::Factual));
    println!("  Edge cases: {}", kb.count_by_domain(Domain::EdgeCase));
    Ok(())
}

/// Read back a persisted report.
fn cmd_show(run: &str, output_dir: &Path, raw: bool) -> Result<()> {
    let run_id = Uuid::parse_str(run).with_context(|| format!("Invalid run ID: {run}"))?;
    let report = read_report_artifact(&run_id.to_string(), output_dir)
        .with_context(|| format!("Failed to read report for run {run_id}"))?;

    if raw {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Run:      {}", report.run_id());
    println!("Model:    {}", report.model());
    println!("Started:  {}", report.started_at().to_rfc3339());
    println!("Duration: {}ms", report.duration_ms());
    println!();
    print!("{}", render_result_lines(&report));
    println!();
    print!("{}", render_summary(&report.stats()));
    Ok(())
}
