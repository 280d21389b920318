//! Hand-written port doubles shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use subscription_gate::contract::{
    ConversationId, LedgerEntry, LedgerError, MemberStatus, MessageRef, Screen, TransportError,
    User, UserId,
};
use subscription_gate::domain::oracle::SubscriptionOracle;
use subscription_gate::domain::ports::{MembershipDirectory, Messenger, UserLedger};
use subscription_gate::domain::service::Service;
use subscription_gate::infra::InMemoryLedger;

/// Membership answers set up per user; unknown users have left the channel.
#[derive(Default)]
pub struct ScriptedDirectory {
    answers: Mutex<HashMap<UserId, Result<MemberStatus, TransportError>>>,
    calls: Mutex<Vec<UserId>>,
}

impl ScriptedDirectory {
    pub fn set(&self, user: u64, status: MemberStatus) {
        self.answers.lock().insert(UserId(user), Ok(status));
    }

    pub fn fail(&self, user: u64, err: TransportError) {
        self.answers.lock().insert(UserId(user), Err(err));
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl MembershipDirectory for ScriptedDirectory {
    async fn member_status(&self, user: UserId) -> Result<MemberStatus, TransportError> {
        self.calls.lock().push(user);
        self.answers
            .lock()
            .get(&user)
            .cloned()
            .unwrap_or(Ok(MemberStatus::Left))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Sent {
        chat: ConversationId,
        screen: Screen,
    },
    Edited {
        message: MessageRef,
        screen: Screen,
    },
    Answered {
        query_id: String,
        alert: Option<String>,
    },
}

/// Records everything the controller asks the platform to do.
#[derive(Default)]
pub struct RecordingMessenger {
    log: Mutex<Vec<Outbound>>,
    failing: Mutex<bool>,
}

impl RecordingMessenger {
    pub fn outbound(&self) -> Vec<Outbound> {
        self.log.lock().clone()
    }

    /// Screens in the order they were shown, sent or edited.
    pub fn screens(&self) -> Vec<Screen> {
        self.log
            .lock()
            .iter()
            .filter_map(|o| match o {
                Outbound::Sent { screen, .. } | Outbound::Edited { screen, .. } => {
                    Some(screen.clone())
                }
                Outbound::Answered { .. } => None,
            })
            .collect()
    }

    pub fn answers(&self) -> Vec<(String, Option<String>)> {
        self.log
            .lock()
            .iter()
            .filter_map(|o| match o {
                Outbound::Answered { query_id, alert } => Some((query_id.clone(), alert.clone())),
                _ => None,
            })
            .collect()
    }

    /// Make every delivery fail from now on.
    pub fn break_transport(&self) {
        *self.failing.lock() = true;
    }

    fn push(&self, item: Outbound) -> Result<(), TransportError> {
        self.log.lock().push(item);
        if *self.failing.lock() {
            return Err(TransportError::network("connection reset"));
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_screen(
        &self,
        chat: ConversationId,
        screen: &Screen,
    ) -> Result<(), TransportError> {
        self.push(Outbound::Sent {
            chat,
            screen: screen.clone(),
        })
    }

    async fn edit_screen(&self, message: MessageRef, screen: &Screen) -> Result<(), TransportError> {
        self.push(Outbound::Edited {
            message,
            screen: screen.clone(),
        })
    }

    async fn answer_callback(
        &self,
        query_id: &str,
        alert: Option<&str>,
    ) -> Result<(), TransportError> {
        self.push(Outbound::Answered {
            query_id: query_id.to_string(),
            alert: alert.map(str::to_string),
        })
    }
}

/// Ledger whose every call fails.
pub struct FailingLedger;

#[async_trait]
impl UserLedger for FailingLedger {
    async fn contains(&self, _user: UserId) -> Result<bool, LedgerError> {
        Err(LedgerError::transport("sheet unreachable"))
    }

    async fn insert(&self, _entry: LedgerEntry) -> Result<(), LedgerError> {
        Err(LedgerError::transport("sheet unreachable"))
    }

    async fn count(&self) -> Result<usize, LedgerError> {
        Err(LedgerError::transport("sheet unreachable"))
    }
}

pub struct Harness {
    pub directory: Arc<ScriptedDirectory>,
    pub ledger: Arc<InMemoryLedger>,
    pub messenger: Arc<RecordingMessenger>,
    pub service: Service,
}

impl Harness {
    pub fn new() -> Self {
        let directory = Arc::new(ScriptedDirectory::default());
        let ledger = Arc::new(InMemoryLedger::new());
        let messenger = Arc::new(RecordingMessenger::default());
        let service = Service::new(
            SubscriptionOracle::new(directory.clone()),
            ledger.clone(),
            messenger.clone(),
        );
        Self {
            directory,
            ledger,
            messenger,
            service,
        }
    }

    pub fn with_ledger(ledger: Arc<dyn UserLedger>) -> (Self, Service) {
        let harness = Self::new();
        let service = Service::new(
            SubscriptionOracle::new(harness.directory.clone()),
            ledger,
            harness.messenger.clone(),
        );
        (harness, service)
    }
}

pub fn anna() -> User {
    User::new(1001)
        .with_display_name("Анна")
        .with_username("anna_om")
}

pub fn message_in_private_chat(user: &User, message_id: i32) -> MessageRef {
    MessageRef {
        chat: ConversationId::from(user.id),
        message_id,
    }
}

/// Fixed bearer token, skipping the service-account exchange.
pub struct StaticToken(pub &'static str);

#[async_trait]
impl subscription_gate::infra::sheets::AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, LedgerError> {
        Ok(self.0.to_string())
    }
}
