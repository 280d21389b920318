use async_trait::async_trait;

use crate::contract::{LedgerEntry, LedgerError, UserId};

/// Store of users who passed the gate at least once.
///
/// Implementations must be safe to call from concurrent handlers: the
/// dispatcher runs updates of different chats in parallel.
#[async_trait]
pub trait UserLedger: Send + Sync {
    async fn contains(&self, user: UserId) -> Result<bool, LedgerError>;

    /// Append an entry. Does not check for duplicates.
    async fn insert(&self, entry: LedgerEntry) -> Result<(), LedgerError>;

    async fn count(&self) -> Result<usize, LedgerError>;

    /// Insert unless the user is already present. Returns whether a new entry
    /// was written.
    async fn record(&self, entry: LedgerEntry) -> Result<bool, LedgerError> {
        if self.contains(entry.user_id).await? {
            return Ok(false);
        }
        self.insert(entry).await?;
        Ok(true)
    }
}
