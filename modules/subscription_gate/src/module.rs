use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use teloxide::dispatching::Dispatcher;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

use crate::api::telegram::{schema, Command};
use crate::config::{LedgerConfig, SubscriptionGateConfig};
use crate::contract::LedgerError;
use crate::domain::menu::MenuRenderer;
use crate::domain::oracle::SubscriptionOracle;
use crate::domain::ports::UserLedger;
use crate::domain::service::Service;
use crate::infra::sheets::{ServiceAccountAuth, ServiceAccountKey, SheetsClient, SheetsLedger};
use crate::infra::telegram::{TelegramMembership, TelegramMessenger};
use crate::infra::InMemoryLedger;

/// Long-polling timeout passed to `getUpdates`. The bot's HTTP client must
/// allow longer requests than this.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// The bot: Telegram adapters, ledger and controller wired together.
pub struct SubscriptionGate {
    bot: Bot,
    cfg: SubscriptionGateConfig,
    service: Arc<Service>,
}

impl SubscriptionGate {
    /// `http` is used for the spreadsheet ledger only; `bot` carries its own client.
    pub fn new(
        bot: Bot,
        cfg: SubscriptionGateConfig,
        http: reqwest::Client,
    ) -> anyhow::Result<Self> {
        let links = cfg.menu_links()?;
        let ledger = build_ledger(&cfg.ledger, http);

        let oracle = SubscriptionOracle::new(Arc::new(TelegramMembership::new(
            bot.clone(),
            &cfg.channel,
        )));
        let messenger = Arc::new(TelegramMessenger::new(
            bot.clone(),
            MenuRenderer::new(links),
        ));

        Ok(Self {
            bot,
            cfg,
            service: Arc::new(Service::new(oracle, ledger, messenger)),
        })
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    /// Poll for updates until SIGINT/SIGTERM. Handlers in flight are allowed
    /// to finish before this returns.
    pub async fn run(self) -> anyhow::Result<()> {
        let me = self
            .bot
            .get_me()
            .await
            .context("bot token was rejected by the Bot API")?;
        info!(bot = %me.username(), channel = %self.cfg.channel, "bot started");

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!(error = %e, "failed to publish bot commands");
        }

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), schema())
            .dependencies(dptree::deps![self.service.clone()])
            .default_handler(|upd| async move {
                debug!(update_id = ?upd.id, "unhandled update");
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "error in update handler",
            ))
            .build();

        let token = dispatcher.shutdown_token();
        let watcher = tokio::spawn(async move {
            match runtime::shutdown::wait_for_shutdown().await {
                Ok(signal) => info!(%signal, "stopping dispatcher"),
                Err(e) => error!(error = %e, "signal handling failed, stopping"),
            }
            match token.shutdown() {
                Ok(done) => done.await,
                Err(_) => debug!("dispatcher was idle at shutdown"),
            }
        });

        let mut listener = Polling::builder(self.bot.clone()).timeout(POLL_TIMEOUT);
        if self.cfg.skip_pending_updates {
            listener = listener.drop_pending_updates();
        }

        dispatcher
            .dispatch_with_listener(
                listener.build(),
                LoggingErrorHandler::with_custom_text("error from the update listener"),
            )
            .await;

        watcher.abort();
        info!("bot stopped");
        Ok(())
    }
}

/// Spreadsheet ledger when a spreadsheet is configured and its credentials
/// are usable; in-memory ledger otherwise.
pub fn build_ledger(cfg: &LedgerConfig, http: reqwest::Client) -> Arc<dyn UserLedger> {
    let Some(spreadsheet_id) = cfg.spreadsheet() else {
        info!("no spreadsheet configured, users are kept in memory");
        return Arc::new(InMemoryLedger::new());
    };

    match sheets_ledger(cfg, spreadsheet_id, http) {
        Ok(ledger) => {
            info!(worksheet = %cfg.worksheet, "using spreadsheet ledger");
            Arc::new(ledger)
        }
        Err(e) => {
            error!(error = %e, "spreadsheet ledger unavailable, users are kept in memory");
            Arc::new(InMemoryLedger::new())
        }
    }
}

fn sheets_ledger(
    cfg: &LedgerConfig,
    spreadsheet_id: &str,
    http: reqwest::Client,
) -> Result<SheetsLedger, LedgerError> {
    let key = ServiceAccountKey::resolve(cfg.credentials_file.as_deref(), cfg.credentials.as_ref())?;
    let auth = ServiceAccountAuth::new(key, http.clone())?;
    debug!(client = auth.client_email(), "service account loaded");
    let client = SheetsClient::new(
        http,
        cfg.api_url.clone(),
        spreadsheet_id,
        cfg.worksheet.clone(),
        Arc::new(auth),
    );
    Ok(SheetsLedger::new(client))
}

/// Offline validation for `check`: links resolve and, when a spreadsheet is
/// configured, the service-account key loads.
pub fn validate(cfg: &SubscriptionGateConfig) -> anyhow::Result<()> {
    cfg.menu_links()?;
    if cfg.ledger.spreadsheet().is_some() {
        let key = ServiceAccountKey::resolve(
            cfg.ledger.credentials_file.as_deref(),
            cfg.ledger.credentials.as_ref(),
        )?;
        ServiceAccountAuth::new(key, reqwest::Client::new())?;
    }
    Ok(())
}
