use std::fmt;
use std::path::PathBuf;

use runtime::EnvAlias;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use url::Url;

use crate::domain::menu::MenuLinks;

pub const MODULE_NAME: &str = "subscription_gate";

/// Plain environment variables understood by earlier deployments of the bot.
pub const ENV_ALIASES: &[EnvAlias] = &[
    EnvAlias::new("CHANNEL_ID", "modules.subscription_gate.channel"),
    EnvAlias::new(
        "SPREADSHEET_ID",
        "modules.subscription_gate.ledger.spreadsheet_id",
    ),
    EnvAlias::new("WORKSHEET_NAME", "modules.subscription_gate.ledger.worksheet"),
    EnvAlias::new(
        "GOOGLE_CREDENTIALS_FILE",
        "modules.subscription_gate.ledger.credentials_file",
    ),
    EnvAlias::new(
        "GOOGLE_CLIENT_EMAIL",
        "modules.subscription_gate.ledger.credentials.client_email",
    ),
    EnvAlias::new(
        "GOOGLE_PRIVATE_KEY",
        "modules.subscription_gate.ledger.credentials.private_key",
    ),
    EnvAlias::new(
        "GOOGLE_PRIVATE_KEY_ID",
        "modules.subscription_gate.ledger.credentials.private_key_id",
    ),
    EnvAlias::new(
        "GOOGLE_TOKEN_URI",
        "modules.subscription_gate.ledger.credentials.token_uri",
    ),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid channel reference {0:?}: expected @username or numeric chat id")]
    InvalidChannel(String),
    #[error("channel {channel} has no public link; set channel_url")]
    MissingChannelLink { channel: String },
}

/// The gated channel: either a public @username or a numeric chat id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    Id(i64),
    /// Stored with the leading `@`.
    Username(String),
}

impl ChannelRef {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<i64>() {
            return Ok(ChannelRef::Id(id));
        }
        let name = raw.strip_prefix('@').unwrap_or(raw);
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(ConfigError::InvalidChannel(raw.to_string()));
        }
        Ok(ChannelRef::Username(format!("@{name}")))
    }

    /// `https://t.me/<name>` for public channels.
    pub fn public_url(&self) -> Option<Url> {
        match self {
            ChannelRef::Username(name) => {
                Url::parse(&format!("https://t.me/{}", name.trim_start_matches('@'))).ok()
            }
            ChannelRef::Id(_) => None,
        }
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRef::Id(id) => write!(f, "{id}"),
            ChannelRef::Username(name) => f.write_str(name),
        }
    }
}

impl Serialize for ChannelRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChannelRef::Id(id) => serializer.serialize_i64(*id),
            ChannelRef::Username(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for ChannelRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Environment layers turn "-100123" into a number.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(i64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Id(id) => Ok(ChannelRef::Id(id)),
            Raw::Text(s) => ChannelRef::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// Configuration for the subscription_gate module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionGateConfig {
    #[serde(default = "default_channel")]
    pub channel: ChannelRef,
    /// Invite link, required when `channel` is a numeric id.
    #[serde(default)]
    pub channel_url: Option<Url>,
    /// Name shown in the gate text. Defaults to the `@username`, or to the
    /// invite link for numeric channels.
    #[serde(default)]
    pub channel_title: Option<String>,
    #[serde(default = "default_companion_bot_url")]
    pub companion_bot_url: Url,
    #[serde(default = "default_project_site")]
    pub project_site: String,
    /// Drop updates queued while the bot was offline.
    #[serde(default = "default_true")]
    pub skip_pending_updates: bool,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Ledger backend settings. Without `spreadsheet_id` users are kept in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default = "default_worksheet")]
    pub worksheet: String,
    #[serde(default = "default_sheets_api_url")]
    pub api_url: Url,
    /// Service-account JSON key as downloaded from the cloud console.
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    /// Individual key fields; they override values from `credentials_file`.
    #[serde(default)]
    pub credentials: Option<ServiceAccountCredentials>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceAccountCredentials {
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl Default for SubscriptionGateConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            channel_url: None,
            channel_title: None,
            companion_bot_url: default_companion_bot_url(),
            project_site: default_project_site(),
            skip_pending_updates: default_true(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            worksheet: default_worksheet(),
            api_url: default_sheets_api_url(),
            credentials_file: None,
            credentials: None,
        }
    }
}

impl SubscriptionGateConfig {
    /// Link behind the "subscribe" button.
    pub fn channel_link(&self) -> Result<Url, ConfigError> {
        self.channel_url
            .clone()
            .or_else(|| self.channel.public_url())
            .ok_or_else(|| ConfigError::MissingChannelLink {
                channel: self.channel.to_string(),
            })
    }

    pub fn menu_links(&self) -> Result<MenuLinks, ConfigError> {
        let channel_url = self.channel_link()?;
        let channel_label = match (&self.channel_title, &self.channel) {
            (Some(title), _) if !title.trim().is_empty() => title.trim().to_string(),
            (_, ChannelRef::Username(name)) => name.clone(),
            (_, ChannelRef::Id(_)) => channel_url.to_string(),
        };
        Ok(MenuLinks {
            channel_label,
            channel_url,
            companion_bot_url: self.companion_bot_url.clone(),
            project_site: self.project_site.clone(),
        })
    }
}

impl LedgerConfig {
    /// Spreadsheet id when the remote ledger is configured.
    pub fn spreadsheet(&self) -> Option<&str> {
        self.spreadsheet_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

fn default_channel() -> ChannelRef {
    ChannelRef::Username("@om_valery".to_string())
}

fn default_companion_bot_url() -> Url {
    Url::parse("https://t.me/om_lab_bot").expect("static URL is valid")
}

fn default_project_site() -> String {
    "valery.omlab.club".to_string()
}

fn default_worksheet() -> String {
    "Users".to_string()
}

fn default_sheets_api_url() -> Url {
    Url::parse("https://sheets.googleapis.com").expect("static URL is valid")
}

fn default_true() -> bool {
    true
}
