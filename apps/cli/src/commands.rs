//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use seopress_core::{
    AssemblyProgress, AssemblyStage, Controller, Publisher, RunOutcome, RunRequest,
    stale_after_duration,
};
use seopress_generation::ChatCompletionsGenerator;
use seopress_shared::{
    AppConfig, Intent, KeywordRecord, KeywordStatus, Priority, Stage, init_config, load_config,
    load_config_from, read_secret, validate_api_key,
};
use seopress_storage::KeywordStore;

use crate::server;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SeoPress: generate SEO blog articles from a keyword queue.
#[derive(Parser)]
#[command(
    name = "seopress",
    version,
    about = "Generate SEO blog articles from a keyword queue and publish them as Markdown.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.seopress/seopress.toml).
    #[arg(long, global = true, env = "SEOPRESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate and publish one article.
    Generate {
        /// Keyword to generate (defaults to the next queued keyword).
        #[arg(short, long)]
        keyword: Option<String>,
    },

    /// Run the HTTP trigger server.
    Serve {
        /// Listen address (overrides server.bind).
        #[arg(long)]
        bind: Option<String>,
    },

    /// Manage the keyword table.
    Keywords {
        #[command(subcommand)]
        action: KeywordsAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Keyword table subcommands.
#[derive(Subcommand)]
pub(crate) enum KeywordsAction {
    /// List keywords in table order.
    List {
        /// Only show keywords with this status.
        #[arg(long)]
        status: Option<KeywordStatus>,
    },
    /// Queue a new keyword.
    Add {
        keyword: String,

        /// Funnel stage: TOFU, MOFU, or BOFU.
        #[arg(long, default_value = "TOFU")]
        stage: Stage,

        /// informational, transactional, commercial, or comparison.
        #[arg(long, default_value = "informational")]
        intent: Intent,

        /// high, medium, or low.
        #[arg(long, default_value = "medium")]
        priority: Priority,
    },
    /// Remove a keyword.
    Remove { keyword: String },
    /// Put a keyword back in the queue.
    Requeue { keyword: String },
    /// Fail keywords stuck in `generating`.
    Reconcile {
        /// Age in minutes after which a run counts as abandoned
        /// (defaults to store.stale_after_minutes).
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Check that every published keyword has its article on disk.
    Verify,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "seopress=info,tower_http=info",
        1 => "seopress=debug,tower_http=debug",
        _ => "seopress=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Command::Config {
        action: ConfigAction::Init,
    } = cli.command
    {
        return cmd_config_init();
    }

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    config.validate()?;

    match cli.command {
        Command::Generate { keyword } => cmd_generate(&config, keyword).await,
        Command::Serve { bind } => cmd_serve(&config, bind).await,
        Command::Keywords { action } => cmd_keywords(&config, action).await,
        Command::Config { .. } => cmd_config_show(&config),
    }
}

/// Controller wired to the configured LLM endpoint.
fn build_controller(config: &AppConfig) -> Result<Controller> {
    let api_key = validate_api_key(config)?;
    let generator = ChatCompletionsGenerator::from_config(&config.llm, api_key)?;
    Ok(Controller::from_config(config, Arc::new(generator))?)
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

async fn cmd_generate(config: &AppConfig, keyword: Option<String>) -> Result<()> {
    let controller = build_controller(config)?;
    info!(keyword = keyword.as_deref().unwrap_or("<next>"), "generating article");

    let progress = CliProgress::new();
    let result = controller
        .run_with_progress(RunRequest { keyword }, &progress)
        .await;
    progress.finish();

    match result? {
        RunOutcome::Published {
            keyword,
            title,
            url,
            path,
            word_count,
            side_effects,
        } => {
            println!();
            println!("  Article published!");
            println!("  Keyword: {keyword}");
            println!("  Title:   {title}");
            println!("  URL:     {url}");
            println!("  Path:    {}", path.display());
            println!("  Words:   {word_count}");
            println!();
            side_effects.settle().await;
        }
        RunOutcome::NoEligible { message } => {
            println!("  {message}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// serve
// ---------------------------------------------------------------------------

async fn cmd_serve(config: &AppConfig, bind: Option<String>) -> Result<()> {
    let secret = read_secret(&config.server.secret_env).ok_or_else(|| {
        eyre!(
            "no trigger secret configured. Set the {} environment variable.",
            config.server.secret_env
        )
    })?;
    let controller = build_controller(config)?;
    let app = server::router(server::AppState::new(controller, secret));

    let addr = bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("cannot listen on {addr}: {e}"))?;
    info!(%addr, "trigger server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("trigger server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
}

// ---------------------------------------------------------------------------
// keywords
// ---------------------------------------------------------------------------

async fn cmd_keywords(config: &AppConfig, action: KeywordsAction) -> Result<()> {
    let store = KeywordStore::new(&config.store.keywords_path);

    match action {
        KeywordsAction::List { status } => {
            let records: Vec<KeywordRecord> = store
                .read_all()?
                .into_iter()
                .filter(|r| status.is_none_or(|s| r.status == s))
                .collect();
            print_keywords(&records);
        }
        KeywordsAction::Add {
            keyword,
            stage,
            intent,
            priority,
        } => {
            let record = KeywordRecord::queued(keyword)
                .with_stage(stage)
                .with_intent(intent)
                .with_priority(priority);
            let keyword = record.keyword.clone();
            store.insert(record)?;
            println!("  Queued '{keyword}'");
        }
        KeywordsAction::Remove { keyword } => {
            if !store.delete(&keyword)? {
                return Err(eyre!("keyword '{keyword}' not found"));
            }
            println!("  Removed '{keyword}'");
        }
        KeywordsAction::Requeue { keyword } => {
            let record = store.requeue(&keyword)?;
            println!("  Requeued '{}'", record.keyword);
        }
        KeywordsAction::Reconcile { minutes } => {
            let minutes = minutes.map(u64::from).unwrap_or(config.store.stale_after_minutes);
            let max_age = stale_after_duration(minutes);
            let failed = store.reconcile_stale(max_age, chrono::Utc::now())?;
            if failed.is_empty() {
                println!("  No stale keywords");
            }
            for keyword in failed {
                println!("  Marked '{keyword}' failed");
            }
        }
        KeywordsAction::Verify => {
            let publisher = Publisher::new(config.publish.clone());
            let problems = publisher.verify_all(&store.read_all()?);
            if problems.is_empty() {
                println!("  All published articles verified");
                return Ok(());
            }
            for (keyword, err) in &problems {
                println!("  {keyword}: {err}");
            }
            return Err(eyre!("{} published article(s) failed verification", problems.len()));
        }
    }
    Ok(())
}

fn print_keywords(records: &[KeywordRecord]) {
    if records.is_empty() {
        println!("  No keywords");
        return;
    }
    println!(
        "  {:<36} {:<10} {:<5} {:<13} {:<6} URL",
        "KEYWORD", "STATUS", "STAGE", "INTENT", "PRIO"
    );
    for r in records {
        println!(
            "  {:<36} {:<10} {:<5} {:<13} {:<6} {}",
            r.keyword,
            r.status,
            r.stage,
            r.intent,
            r.priority,
            r.url.as_deref().unwrap_or("-"),
        );
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("  Config written to {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config)?;
    println!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner that follows the assembly stages.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl AssemblyProgress for CliProgress {
    fn stage(&self, stage: AssemblyStage) {
        let msg = match stage {
            AssemblyStage::Start => "Claiming keyword",
            AssemblyStage::Title => "Writing title",
            AssemblyStage::Outline => "Writing outline",
            AssemblyStage::Sections => "Writing sections",
            AssemblyStage::MetaAndTags => "Writing meta description and tags",
            AssemblyStage::SlugAndSchema => "Building slug and structured data",
            AssemblyStage::Done => "Publishing",
        };
        self.spinner.set_message(msg);
    }

    fn section_written(&self, heading: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing sections [{current}/{total}] {heading}"));
    }
}
