use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use subscription_gate::module::{validate, POLL_TIMEOUT};
use subscription_gate::{SubscriptionGate, SubscriptionGateConfig, ENV_ALIASES, MODULE_NAME};
use teloxide::Bot;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// OM LAB bot - channel subscription gate with a small feature menu
#[derive(Parser)]
#[command(name = "omlab-bot")]
#[command(about = "OM LAB bot - channel subscription gate with a small feature menu")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (secrets redacted) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start polling for updates
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Variables already present in the environment win over .env entries.
    let dotenv = runtime::load_dotenv();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_layered(cli.config.as_deref(), ENV_ALIASES)?;

    // Apply CLI overrides (verbosity)
    config.apply_cli_overrides(&args);

    // Initialize logging
    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.bot.home_dir));
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "environment loaded from .env");
    }
    tracing::info!("OM LAB bot starting");

    // Print config and exit if requested
    if cli.print_config {
        println!("{}", config.redacted().to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(config).await,
        Commands::Check => check_config(config),
    }
}

fn request_timeout(config: &AppConfig) -> Option<Duration> {
    match config.bot.request_timeout_sec {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    }
}

async fn run_bot(config: AppConfig) -> Result<()> {
    let token = match config.require_token() {
        Ok(token) => token.to_string(),
        Err(e) => {
            tracing::error!(error = %e, "cannot start");
            return Err(e);
        }
    };
    let gate_cfg: SubscriptionGateConfig = config.module_config(MODULE_NAME)?;
    let timeout = request_timeout(&config);

    // Long polling holds a request open for POLL_TIMEOUT on top of the usual budget.
    let mut bot_client = teloxide::net::default_reqwest_settings();
    if let Some(t) = timeout {
        bot_client = bot_client.timeout(t + POLL_TIMEOUT);
    }
    let mut bot = Bot::with_client(
        token,
        bot_client.build().context("failed to build Bot API client")?,
    );
    if let Some(url) = config.bot.api_url.clone() {
        tracing::info!(api_url = %url, "using custom Bot API server");
        bot = bot.set_api_url(url);
    }

    let mut http = reqwest::Client::builder();
    if let Some(t) = timeout {
        http = http.timeout(t);
    }
    let http = http.build().context("failed to build HTTP client")?;

    SubscriptionGate::new(bot, gate_cfg, http)?.run().await
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    let gate_cfg: SubscriptionGateConfig = config.module_config(MODULE_NAME)?;
    validate(&gate_cfg)?;
    if config.bot.token.trim().is_empty() {
        tracing::warn!("bot token is not configured; `run` will refuse to start");
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.redacted().to_yaml()?);
    Ok(())
}
