use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::contract::{LedgerEntry, LedgerError, UserId};
use crate::domain::ports::UserLedger;

/// Process-local ledger. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: DashMap<UserId, LedgerEntry>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: UserId) -> Option<LedgerEntry> {
        self.entries.get(&user).map(|e| e.value().clone())
    }
}

#[async_trait]
impl UserLedger for InMemoryLedger {
    async fn contains(&self, user: UserId) -> Result<bool, LedgerError> {
        Ok(self.entries.contains_key(&user))
    }

    async fn insert(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.entries.insert(entry.user_id, entry);
        Ok(())
    }

    async fn count(&self) -> Result<usize, LedgerError> {
        Ok(self.entries.len())
    }

    // Check and insert under one shard lock.
    async fn record(&self, entry: LedgerEntry) -> Result<bool, LedgerError> {
        match self.entries.entry(entry.user_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(true)
            }
        }
    }
}
