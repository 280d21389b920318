use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

use crate::paths::resolve_home_dir;

/// Placeholder written over secrets by [`AppConfig::redacted`].
pub const REDACTED: &str = "***";

/// Main application configuration with strongly-typed global sections
/// and a flexible per-module configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Telegram bot connection settings.
    pub bot: BotConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Directory containing per-module YAML files (optional).
    #[serde(default)]
    pub modules_dir: Option<String>,
    /// Per-module configuration bag: module_name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Bot API token issued by @BotFather. Required to start.
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub home_dir: String, // will be normalized to absolute path
    /// Alternative Bot API server (self-hosted or test server).
    #[serde(default)]
    pub api_url: Option<Url>,
    /// Timeout applied to every outgoing HTTP request, 0 = client default.
    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    pub file: String,          // "logs/bot.log"
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>, // How many rotated files to keep
    #[serde(default)]
    pub max_size_mb: Option<u64>, // Max size of the file in MB
}

/// Maps a plain environment variable onto a dotted configuration key,
/// e.g. `BOT_TOKEN` → `bot.token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvAlias {
    pub var: &'static str,
    pub key: &'static str,
}

impl EnvAlias {
    pub const fn new(var: &'static str, key: &'static str) -> Self {
        Self { var, key }
    }
}

/// Aliases owned by the global sections. Modules contribute their own.
pub const BASE_ENV_ALIASES: &[EnvAlias] = &[EnvAlias::new("BOT_TOKEN", "bot.token")];

fn default_request_timeout_sec() -> u64 {
    30
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            // Empty => use platform default resolved by resolve_home_dir():
            // Windows: %APPDATA%/.omlab-bot
            // Unix/macOS: $HOME/.omlab-bot
            home_dir: String::new(),
            api_url: None,
            request_timeout_sec: default_request_timeout_sec(),
        }
    }
}

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/omlab-bot.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            logging: Some(default_logging_config()),
            modules_dir: None,
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading:
    /// defaults → YAML file (if any) → `APP__` environment → plain env aliases.
    /// Also normalizes `bot.home_dir` into an absolute path and creates the directory.
    pub fn load_layered(config_path: Option<&Path>, aliases: &[EnvAlias]) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        // Start from a minimal base where optional sections are None,
        // so they remain None unless explicitly provided by YAML/ENV.
        let base = AppConfig {
            bot: BotConfig::default(),
            logging: None,
            modules_dir: None,
            modules: HashMap::new(),
        };

        let mut figment = Figment::new().merge(Serialized::defaults(base));
        if let Some(path) = config_path {
            if !path.is_file() {
                return Err(anyhow!("config file not found: {}", path.display()));
            }
            figment = figment.merge(Yaml::file(path));
        }

        let alias_table: Vec<EnvAlias> = BASE_ENV_ALIASES
            .iter()
            .chain(aliases.iter())
            .copied()
            .collect();

        figment = figment
            // Example: APP__BOT__REQUEST_TIMEOUT_SEC=10 maps to bot.request_timeout_sec
            .merge(Env::prefixed("APP__").split("__"))
            .merge(Env::raw().filter_map(move |k| {
                alias_table
                    .iter()
                    .find(|a| k.as_str().eq_ignore_ascii_case(a.var))
                    .map(|a| a.key.into())
            }));

        let mut config: AppConfig = figment
            .extract()
            .context("Failed to extract config from figment")?;

        normalize_home_dir_inplace(&mut config.bot).context("Failed to resolve bot.home_dir")?;

        if let Some(dir) = config.modules_dir.clone() {
            merge_module_files(&mut config.modules, dir)?;
        }

        Ok(config)
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Copy of the configuration that is safe to print: the bot token and any
    /// module value stored under a secret-looking key are replaced.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        if !out.bot.token.is_empty() {
            out.bot.token = REDACTED.to_string();
        }
        for value in out.modules.values_mut() {
            redact_secrets(value);
        }
        out
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        // Set logging level based on verbose flags for "default" section.
        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            default_section.console_level = match args.verbose {
                0 => default_section.console_level.clone(), // keep
                1 => "debug".to_string(),
                _ => "trace".to_string(),
            };
        }
    }

    /// Fails when the bot cannot be started at all.
    pub fn require_token(&self) -> Result<&str> {
        let token = self.bot.token.trim();
        if token.is_empty() {
            return Err(anyhow!(
                "bot token is not configured (set BOT_TOKEN or bot.token)"
            ));
        }
        Ok(token)
    }

    /// Deserialize a module's section of the bag. A missing section yields
    /// `T::default()`, a malformed one is an error naming the module.
    pub fn module_config<T: DeserializeOwned + Default>(&self, module_name: &str) -> Result<T> {
        match self.modules.get(module_name) {
            None => Ok(T::default()),
            Some(val) => serde_json::from_value(val.clone())
                .map_err(|e| anyhow!("invalid {module_name} config: {e}")),
        }
    }
}

/// Command line arguments structure.
#[derive(Debug, Clone)]
pub struct CliArgs {
    pub config: Option<String>,
    pub print_config: bool,
    pub verbose: u8,
}

const fn default_subdir() -> &'static str {
    ".omlab-bot"
}

/// Normalize `bot.home_dir` using `resolve_home_dir` and store the absolute path back.
fn normalize_home_dir_inplace(bot: &mut BotConfig) -> Result<()> {
    // Treat empty string as "not provided" => None.
    let opt = if bot.home_dir.trim().is_empty() {
        None
    } else {
        Some(bot.home_dir.clone())
    };

    let resolved: PathBuf = resolve_home_dir(opt, default_subdir(), /*create*/ true)
        .context("home_dir normalization failed")?;

    bot.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

fn merge_module_files(
    bag: &mut HashMap<String, serde_json::Value>,
    dir: impl AsRef<Path>,
) -> Result<()> {
    use std::fs;
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if ext != "yml" && ext != "yaml" {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading module config {}", path.display()))?;
        let val: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing module config {}", path.display()))?;
        bag.insert(name, serde_json::to_value(val)?);
    }
    Ok(())
}

fn is_secret_key(key: &str) -> bool {
    matches!(
        key.to_ascii_lowercase().as_str(),
        "token" | "private_key" | "private_key_id" | "password" | "secret"
    )
}

fn redact_secrets(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map.iter_mut() {
                if is_secret_key(k) && !v.is_null() {
                    *v = serde_json::Value::String(REDACTED.to_string());
                } else {
                    redact_secrets(v);
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(redact_secrets),
        _ => {}
    }
}
