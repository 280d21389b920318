use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Telegram user identifier, the ledger key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat the bot talks in. For private conversations it equals the user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationId(pub i64);

impl From<UserId> for ConversationId {
    fn from(user: UserId) -> Self {
        // Telegram user ids fit in 52 bits.
        Self(user.0 as i64)
    }
}

/// A message previously sent by the bot that can be edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat: ConversationId,
    pub message_id: i32,
}

/// The sender of an update as far as this bot cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// First name as shown by Telegram, used in greetings.
    pub display_name: Option<String>,
    /// @handle without the `@`, kept for the ledger only.
    pub username: Option<String>,
}

impl User {
    pub fn new(id: u64) -> Self {
        Self {
            id: UserId(id),
            display_name: None,
            username: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Name used in greetings; falls back to a neutral address.
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("друг")
    }
}

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub user_id: UserId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn for_user(user: &User, recorded_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            recorded_at,
        }
    }
}

/// Membership status of a user in the gated channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberStatus {
    pub const ALL: [MemberStatus; 6] = [
        MemberStatus::Creator,
        MemberStatus::Administrator,
        MemberStatus::Member,
        MemberStatus::Restricted,
        MemberStatus::Left,
        MemberStatus::Kicked,
    ];

    /// Only full members pass the gate; restricted members do not.
    pub fn grants_access(self) -> bool {
        matches!(
            self,
            MemberStatus::Creator | MemberStatus::Administrator | MemberStatus::Member
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MemberStatus::Creator => "creator",
            MemberStatus::Administrator => "administrator",
            MemberStatus::Member => "member",
            MemberStatus::Restricted => "restricted",
            MemberStatus::Left => "left",
            MemberStatus::Kicked => "kicked",
        }
    }
}

/// Callback data carried by inline buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackAction {
    CheckSubscription,
    About,
    MyResults,
    BackToMenu,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown callback token: {0:?}")]
pub struct UnknownCallback(pub String);

impl CallbackAction {
    pub const ALL: [CallbackAction; 4] = [
        CallbackAction::CheckSubscription,
        CallbackAction::About,
        CallbackAction::MyResults,
        CallbackAction::BackToMenu,
    ];

    pub fn token(self) -> &'static str {
        match self {
            CallbackAction::CheckSubscription => "check_subscription",
            CallbackAction::About => "about",
            CallbackAction::MyResults => "my_results",
            CallbackAction::BackToMenu => "back_to_menu",
        }
    }
}

impl FromStr for CallbackAction {
    type Err = UnknownCallback;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.token() == s)
            .ok_or_else(|| UnknownCallback(s.to_string()))
    }
}

/// A view the bot can put in front of the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Asks the user to subscribe before anything else.
    WelcomeGate { name: String },
    /// Feature menu; greets by name right after `/start`.
    MainMenu { greeting: Option<String> },
    About,
    Results,
    /// Main menu shown right after a successful subscription check.
    SubscriptionConfirmed { name: String },
    Help,
}

impl Screen {
    pub fn kind(&self) -> &'static str {
        match self {
            Screen::WelcomeGate { .. } => "welcome_gate",
            Screen::MainMenu { .. } => "main_menu",
            Screen::About => "about",
            Screen::Results => "results",
            Screen::SubscriptionConfirmed { .. } => "subscription_confirmed",
            Screen::Help => "help",
        }
    }

    /// Whether the screen offers the feature menu.
    pub fn is_main_menu(&self) -> bool {
        matches!(
            self,
            Screen::MainMenu { .. } | Screen::SubscriptionConfirmed { .. }
        )
    }
}

/// `/start` from a user.
#[derive(Debug, Clone)]
pub struct StartEvent {
    pub user: User,
    pub chat: ConversationId,
}

/// An inline button press.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    pub query_id: String,
    pub user: User,
    /// The message carrying the pressed button, if Telegram still has it.
    pub message: Option<MessageRef>,
    pub action: CallbackAction,
}
