pub mod auth;
pub mod client;
pub mod ledger;

pub use auth::{AccessTokenSource, ServiceAccountAuth, ServiceAccountKey};
pub use client::SheetsClient;
pub use ledger::SheetsLedger;
