#![allow(clippy::uninlined_format_args)]

use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webscribe::errors::ScribeError;
use webscribe::shell::{normalize_url, script_for, ShellController};
use webscribe::snapshot::{NodeId, SnapshotModel};
use webscribe::terminal::{render_tree, run_shell, TerminalView};
use webscribe::types::{OutputFormat, ViewportSize};
use webscribe::webdriver::{BrowserConfig, BrowserType, WebDriverBackend};
use webscribe::webdriver_manager::GLOBAL_WEBDRIVER_MANAGER;
use webscribe::worker::{AutomationWorker, WorkerConfig};

const EXIT_SUCCESS: i32 = 0;

#[derive(Parser)]
#[command(name = "webscribe")]
#[command(version)]
#[command(about = "Snapshot a page's DOM and generate Playwright test code", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Browser to use (firefox or chrome)
    #[arg(short, long, global = true, default_value = "firefox")]
    browser: String,

    /// Run browser in visible mode
    #[arg(long, global = true)]
    no_headless: bool,

    /// Viewport size (e.g. 1920x1080)
    #[arg(long, global = true)]
    viewport: Option<String>,

    /// Navigation timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// Use an already running WebDriver server instead of starting one
    #[arg(long, global = true)]
    webdriver_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive shell (default)
    Shell {
        /// Page to load on start
        url: Option<String>,
    },

    /// Print the element tree of a page
    Snapshot {
        /// URL to snapshot
        url: String,

        /// Output format
        #[arg(short, long, default_value = "simple")]
        format: OutputFormat,
    },

    /// Print a Playwright script for a page
    Generate {
        /// URL to generate the script for
        url: String,

        /// Row path of an element to add a step for (repeatable, e.g. 0.1.2)
        #[arg(short, long = "select", value_name = "PATH")]
        select: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let result = run().await;

    // Always clean up WebDriver processes before exiting
    GLOBAL_WEBDRIVER_MANAGER.stop_all();

    match result {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(err.exit_code());
        }
    }
}

async fn run() -> Result<(), ScribeError> {
    // Logs go to stderr so generated code and JSON on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webscribe=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();
    let worker = build_worker(&cli)?;

    match cli.command {
        None => handle_shell(worker, None).await,
        Some(Commands::Shell { url }) => handle_shell(worker, url).await,
        Some(Commands::Snapshot { url, format }) => handle_snapshot(worker, &url, format).await,
        Some(Commands::Generate { url, select }) => handle_generate(worker, &url, &select).await,
    }
}

fn build_worker(cli: &Cli) -> Result<AutomationWorker<WebDriverBackend>, ScribeError> {
    let browser_type: BrowserType = cli.browser.parse()?;
    let viewport = cli
        .viewport
        .as_deref()
        .map(ViewportSize::parse)
        .transpose()?;

    let config = BrowserConfig {
        browser_type,
        headless: !cli.no_headless,
        viewport,
        webdriver_url: cli.webdriver_url.clone(),
    };
    let worker_config = WorkerConfig {
        navigation_timeout: Duration::from_secs(cli.timeout),
    };

    Ok(AutomationWorker::new(
        WebDriverBackend::new(config),
        worker_config,
    ))
}

async fn handle_shell(
    worker: AutomationWorker<WebDriverBackend>,
    url: Option<String>,
) -> Result<(), ScribeError> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let controller = ShellController::new(worker, TerminalView::new(), tx);
    run_shell(controller, rx, url).await?;
    Ok(())
}

async fn load_model(
    worker: &AutomationWorker<WebDriverBackend>,
    input: &str,
) -> Result<(url::Url, SnapshotModel), ScribeError> {
    let url = normalize_url(input)?;
    let root = worker.run(&url).await?;

    let mut model = SnapshotModel::new();
    model.populate(std::slice::from_ref(&root), NodeId::ROOT);
    info!("Snapshot of {} holds {} elements", url, model.len());
    Ok((url, model))
}

async fn handle_snapshot(
    worker: AutomationWorker<WebDriverBackend>,
    input: &str,
    format: OutputFormat,
) -> Result<(), ScribeError> {
    let (url, model) = load_model(&worker, input).await?;

    match format {
        OutputFormat::Json => {
            let output = json!({
                "url": url.as_str(),
                "elements": model.to_records(),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output).map_err(anyhow::Error::from)?
            );
        }
        OutputFormat::Simple => print!("{}", render_tree(&model)),
    }
    Ok(())
}

async fn handle_generate(
    worker: AutomationWorker<WebDriverBackend>,
    input: &str,
    paths: &[String],
) -> Result<(), ScribeError> {
    let (url, model) = load_model(&worker, input).await?;

    print!("{}", script_for(&model, &url, paths)?);
    Ok(())
}
