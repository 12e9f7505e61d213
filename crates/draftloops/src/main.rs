use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use draftloops_agent::OpenAiCompletions;
use draftloops_core::{DocumentState, RevisionLoop, RunReport, RunStatus};
use draftloops_editor::EditorAgent;
use draftloops_judge::JudgeAgent;
use draftloops_logging::{init_tracing, LogFormat, Logger};
use draftloops_research::{ResearchCollector, SearchDepth, TavilySearch};
use draftloops_store::{SnapshotStore, DEFAULT_OUTPUT_DIR, DEFAULT_WORKPRODUCT_DIR};

mod config;
mod menu;

use config::{Credentials, ProjectConfig};
use menu::MenuAction;

#[derive(Parser, Debug)]
#[command(
    name = "draftloops",
    about = "Research-and-revise harness for document drafting",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Maximum editor/judge cycles before a run gives up
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,

    /// Model to use for both the editor and the judge
    #[arg(short, long)]
    model: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Research a topic and revise a fresh draft until the judge approves
    Create {
        /// Topic to research (prompts interactively if omitted)
        topic: Option<String>,

        /// Extra topic to research into its own section (repeatable)
        #[arg(long = "expand", value_name = "TOPIC")]
        expansions: Vec<String>,
    },

    /// Reload the most recent snapshot and keep revising it
    Continue {
        /// Only consider snapshots whose topic matches this filter
        filter: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!();
            eprintln!("=== FAILED ===");
            eprintln!("Error: {:#}", error);
            std::process::exit(2);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    // Determine working directory
    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let project = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    let log_format: LogFormat = cli.log_format.into();
    let log_dir = project
        .paths
        .log_dir
        .as_deref()
        .map(|dir| resolve(&working_dir, dir));
    let _guard = init_tracing("info", log_format, log_dir.as_deref());

    // Handle Ctrl+C
    ctrlc::set_handler(|| {
        eprintln!("\nInterrupted.");
        std::process::exit(130);
    })
    .context("Failed to set Ctrl+C handler")?;

    // Resolve what to do before touching credentials, so browsing the menu
    // never requires API keys.
    let action = match cli.command {
        Some(Command::Create {
            topic: Some(topic),
            expansions,
        }) => MenuAction::Create { topic, expansions },
        Some(Command::Create {
            topic: None,
            expansions,
        }) => menu::prompt_create(expansions)?,
        Some(Command::Continue { filter }) => MenuAction::Continue { filter },
        None => menu::main_menu()?,
    };

    if let MenuAction::Exit = action {
        return Ok(0);
    }

    // Create event logger
    let logger = match project.logging.event_log.as_deref() {
        Some(path) => {
            let path = resolve(&working_dir, path);
            Logger::with_file(log_format, &path)
                .with_context(|| format!("Failed to open event log at {}", path.display()))?
        }
        None => Logger::new(log_format),
    };

    let pipeline = build_pipeline(
        cli.model.as_deref(),
        cli.max_iterations,
        &project,
        &working_dir,
        Arc::new(logger),
    )?;

    let report = match action {
        MenuAction::Create { topic, expansions } => pipeline.run(&topic, &expansions).await?,
        MenuAction::Continue { filter } => {
            let snapshot = pipeline
                .store()
                .latest(filter.as_deref())?
                .context("No stored snapshot to continue from")?;
            let document = DocumentState::from_snapshot(snapshot);
            pipeline.resume(document).await?
        }
        MenuAction::Exit => return Ok(0),
    };

    print_report(&report, pipeline.store().output_dir());

    Ok(report.exit_code())
}

/// Wire the search provider, agents, and snapshot store into a pipeline.
///
/// Model precedence for each role: --model flag, then the role's config
/// section, then the global config model, then the provider default.
fn build_pipeline(
    cli_model: Option<&str>,
    cli_max_iterations: Option<usize>,
    project: &ProjectConfig,
    working_dir: &Path,
    logger: Arc<Logger>,
) -> Result<RevisionLoop> {
    let credentials = Credentials::from_env()?;

    let search = TavilySearch::new(credentials.tavily_api_key)?;
    let mut collector = ResearchCollector::new(Arc::new(search));
    if let Some(top_results) = project.research.top_results {
        collector = collector.with_top_results(top_results);
    }
    if let Some(depth) = project.research.search_depth.as_deref() {
        let depth: SearchDepth = depth.parse().map_err(anyhow::Error::msg)?;
        collector = collector.with_depth(depth);
    }

    let mut editor_provider = OpenAiCompletions::new(credentials.openai_api_key.clone())?;
    if let Some(model) = cli_model.or_else(|| project.editor_model()) {
        editor_provider = editor_provider.with_model(model);
    }
    let editor = EditorAgent::new(Arc::new(editor_provider));

    let mut judge_provider = OpenAiCompletions::new(credentials.openai_api_key)?;
    if let Some(model) = cli_model.or_else(|| project.judge_model()) {
        judge_provider = judge_provider.with_model(model);
    }
    let judge = JudgeAgent::new(Arc::new(judge_provider));

    let workproduct_dir = project
        .paths
        .workproduct_dir
        .as_deref()
        .map(|dir| resolve(working_dir, dir))
        .unwrap_or_else(|| working_dir.join(DEFAULT_WORKPRODUCT_DIR));
    let output_dir = project
        .paths
        .output_dir
        .as_deref()
        .map(|dir| resolve(working_dir, dir))
        .unwrap_or_else(|| working_dir.join(DEFAULT_OUTPUT_DIR));
    let store = SnapshotStore::open(workproduct_dir, output_dir)?;

    let mut pipeline = RevisionLoop::new(collector, editor, judge, store, logger);
    if let Some(max) = cli_max_iterations.or(project.max_iterations) {
        pipeline = pipeline.with_max_iterations(max);
    }

    Ok(pipeline)
}

fn resolve(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

fn print_report(report: &RunReport, output_dir: &Path) {
    eprintln!();
    match report.status {
        RunStatus::Approved => {
            eprintln!("=== APPROVED ===");
        }
        RunStatus::Exhausted => {
            eprintln!("=== UNAPPROVED ===");
            eprintln!("Iteration budget exhausted before the judge approved.");
        }
    }
    eprintln!("Iterations: {}", report.iterations);
    eprintln!("Final version: {}", report.document.version);
    eprintln!("Topics: {}", report.document.topics.join(", "));
    eprintln!("Duration: {:.1}s", report.duration.as_secs_f64());
    if !report.recommendations.is_empty() {
        eprintln!("Outstanding recommendations:");
        for recommendation in &report.recommendations {
            eprintln!("  - {}", recommendation);
        }
    }
    eprintln!("Saved under: {}", output_dir.display());
}
