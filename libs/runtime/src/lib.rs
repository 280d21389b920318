//! Process-level plumbing shared by the bot binary: layered configuration,
//! logging setup, home directory resolution and shutdown signals.

pub mod config;
pub mod logging;
pub mod paths;
pub mod shutdown;

pub use config::{
    default_logging_config, AppConfig, BotConfig, CliArgs, EnvAlias, LoggingConfig, Section,
    BASE_ENV_ALIASES,
};

/// Load `.env` from the working directory (or a parent) into the process
/// environment. Variables that are already set win.
pub fn load_dotenv() -> Option<std::path::PathBuf> {
    dotenvy::dotenv().ok()
}
