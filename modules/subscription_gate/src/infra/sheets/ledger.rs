use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::client::SheetsClient;
use crate::contract::{LedgerEntry, LedgerError, UserId};
use crate::domain::ports::UserLedger;

const ID_COLUMN: &str = "A:A";
const ROW_RANGE: &str = "A:D";

/// Ledger stored in a spreadsheet worksheet, one row per user:
/// id, @username, display name, RFC 3339 timestamp.
///
/// The first column is read on every lookup. Cells that are not user ids
/// (a header row, notes) are ignored.
pub struct SheetsLedger {
    client: SheetsClient,
    // Serializes check-then-append within this process.
    write_lock: Mutex<()>,
}

impl SheetsLedger {
    pub fn new(client: SheetsClient) -> Self {
        Self {
            client,
            write_lock: Mutex::new(()),
        }
    }

    async fn user_ids(&self) -> Result<HashSet<UserId>, LedgerError> {
        let rows = self.client.read_range(ID_COLUMN).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.first())
            .filter_map(parse_user_id)
            .collect())
    }
}

fn parse_user_id(cell: &Value) -> Option<UserId> {
    let id = match cell {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.map(UserId)
}

fn to_row(entry: &LedgerEntry) -> Vec<Value> {
    vec![
        Value::String(entry.user_id.to_string()),
        Value::String(
            entry
                .username
                .as_deref()
                .map(|u| format!("@{u}"))
                .unwrap_or_default(),
        ),
        Value::String(entry.display_name.clone().unwrap_or_default()),
        Value::String(entry.recorded_at.to_rfc3339()),
    ]
}

#[async_trait]
impl UserLedger for SheetsLedger {
    async fn contains(&self, user: UserId) -> Result<bool, LedgerError> {
        Ok(self.user_ids().await?.contains(&user))
    }

    async fn insert(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.client.append_row(ROW_RANGE, &to_row(&entry)).await
    }

    async fn count(&self) -> Result<usize, LedgerError> {
        Ok(self.user_ids().await?.len())
    }

    #[instrument(
        name = "subscription_gate.sheets.record",
        skip(self, entry),
        fields(user_id = %entry.user_id)
    )]
    async fn record(&self, entry: LedgerEntry) -> Result<bool, LedgerError> {
        let _guard = self.write_lock.lock().await;
        if self.contains(entry.user_id).await? {
            debug!("already recorded");
            return Ok(false);
        }
        self.insert(entry).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::User;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn id_cells_accept_numbers_and_strings() {
        assert_eq!(parse_user_id(&json!(42)), Some(UserId(42)));
        assert_eq!(parse_user_id(&json!(42.0)), Some(UserId(42)));
        assert_eq!(parse_user_id(&json!(" 42 ")), Some(UserId(42)));
        assert_eq!(parse_user_id(&json!("User ID")), None);
        assert_eq!(parse_user_id(&json!(-1)), None);
        assert_eq!(parse_user_id(&json!(null)), None);
    }

    #[test]
    fn row_layout() {
        let user = User::new(5).with_username("anna").with_display_name("Анна");
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let row = to_row(&LedgerEntry::for_user(&user, at));
        assert_eq!(
            row,
            vec![
                json!("5"),
                json!("@anna"),
                json!("Анна"),
                json!("2025-03-01T12:00:00+00:00")
            ]
        );

        let row = to_row(&LedgerEntry::for_user(&User::new(6), at));
        assert_eq!(row[1], json!(""));
        assert_eq!(row[2], json!(""));
    }
}
