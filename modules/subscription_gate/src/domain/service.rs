use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use crate::contract::{
    CallbackAction, CallbackEvent, ConversationId, LedgerEntry, MessageRef, Screen, StartEvent,
    UnknownCallback, User,
};
use crate::domain::menu::NOT_SUBSCRIBED_ALERT;
use crate::domain::oracle::SubscriptionOracle;
use crate::domain::ports::{Messenger, UserLedger};

/// Interaction controller: turns one inbound event into at most one screen
/// update. Holds no per-user state; the ledger is the only thing that
/// remembers users between events.
///
/// Every failure of the oracle, ledger or messenger is logged here and
/// swallowed, so a bad event never reaches the dispatcher as an error.
#[derive(Clone)]
pub struct Service {
    oracle: SubscriptionOracle,
    ledger: Arc<dyn UserLedger>,
    messenger: Arc<dyn Messenger>,
}

impl Service {
    pub fn new(
        oracle: SubscriptionOracle,
        ledger: Arc<dyn UserLedger>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            oracle,
            ledger,
            messenger,
        }
    }

    #[instrument(
        name = "subscription_gate.service.start",
        skip_all,
        fields(user_id = %event.user.id)
    )]
    pub async fn handle_start(&self, event: StartEvent) {
        let StartEvent { user, chat } = event;
        let name = user.greeting_name().to_string();

        if !self.oracle.is_subscribed(user.id).await {
            debug!("user is not subscribed, showing the gate");
            self.send(chat, &Screen::WelcomeGate { name }).await;
            return;
        }

        self.record_user(&user).await;
        self.send(
            chat,
            &Screen::MainMenu {
                greeting: Some(name),
            },
        )
        .await;
    }

    #[instrument(name = "subscription_gate.service.help", skip(self))]
    pub async fn handle_help(&self, chat: ConversationId) {
        self.send(chat, &Screen::Help).await;
    }

    #[instrument(
        name = "subscription_gate.service.callback",
        skip_all,
        fields(user_id = %event.user.id, action = event.action.token())
    )]
    pub async fn handle_callback(&self, event: CallbackEvent) {
        let screen = match event.action {
            CallbackAction::CheckSubscription => {
                if !self.oracle.is_subscribed(event.user.id).await {
                    info!("subscription check failed, alerting user");
                    self.answer(&event.query_id, Some(NOT_SUBSCRIBED_ALERT))
                        .await;
                    return;
                }
                self.record_user(&event.user).await;
                Screen::SubscriptionConfirmed {
                    name: event.user.greeting_name().to_string(),
                }
            }
            CallbackAction::About => Screen::About,
            CallbackAction::MyResults => Screen::Results,
            CallbackAction::BackToMenu => Screen::MainMenu { greeting: None },
        };

        self.replace(&event.user, event.message, &screen).await;
        self.answer(&event.query_id, None).await;
    }

    /// Button press with data this bot never issued (stale keyboard, forged query).
    #[instrument(name = "subscription_gate.service.unknown_callback", skip_all)]
    pub async fn handle_unknown_callback(&self, query_id: &str, err: &UnknownCallback) {
        warn!(error = %err, "ignoring callback");
        self.answer(query_id, None).await;
    }

    async fn record_user(&self, user: &User) {
        let entry = LedgerEntry::for_user(user, Utc::now());
        match self.ledger.record(entry).await {
            Ok(true) => match self.ledger.count().await {
                Ok(total) => info!(user_id = %user.id, total, "user added to ledger"),
                Err(e) => info!(user_id = %user.id, error = %e, "user added to ledger"),
            },
            Ok(false) => debug!(user_id = %user.id, "user already in ledger"),
            Err(e) => error!(user_id = %user.id, error = %e, "failed to record user, continuing"),
        }
    }

    /// Edit the message carrying the pressed button; when Telegram no longer
    /// exposes it, send the screen to the user's private chat instead.
    async fn replace(&self, user: &User, message: Option<MessageRef>, screen: &Screen) {
        match message {
            Some(message) => {
                if let Err(e) = self.messenger.edit_screen(message, screen).await {
                    warn!(screen = screen.kind(), error = %e, "failed to edit message");
                }
            }
            None => {
                debug!("callback message unavailable, sending a new one");
                self.send(ConversationId::from(user.id), screen).await;
            }
        }
    }

    async fn send(&self, chat: ConversationId, screen: &Screen) {
        if let Err(e) = self.messenger.send_screen(chat, screen).await {
            warn!(screen = screen.kind(), error = %e, "failed to send message");
        }
    }

    async fn answer(&self, query_id: &str, alert: Option<&str>) {
        if let Err(e) = self.messenger.answer_callback(query_id, alert).await {
            warn!(error = %e, "failed to answer callback query");
        }
    }
}
