//! Channel-subscription gate for a Telegram menu bot.
//!
//! Users who start the bot are asked to subscribe to a channel; once
//! subscribed they get a small menu and are recorded in a user ledger kept
//! in memory or in a spreadsheet.

pub mod api;
pub mod config;
pub mod contract;
pub mod domain;
pub mod infra;
pub mod module;

pub use config::{SubscriptionGateConfig, ENV_ALIASES, MODULE_NAME};
pub use module::SubscriptionGate;
