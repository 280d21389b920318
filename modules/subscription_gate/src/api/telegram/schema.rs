use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use super::handlers;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "открыть меню")]
    Start,
    #[command(description = "как пользоваться ботом")]
    Help,
}

/// Update routing: `/start` and `/help` in messages, every button press in
/// callback queries. Everything else falls through to the default handler.
pub fn schema() -> UpdateHandler<anyhow::Error> {
    let commands = Update::filter_message()
        .filter_command::<Command>()
        .endpoint(handlers::on_command);

    let callbacks = Update::filter_callback_query().endpoint(handlers::on_callback);

    dptree::entry().branch(commands).branch(callbacks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_lowercase() {
        assert!(matches!(
            Command::parse("/start", "om_lab_bot"),
            Ok(Command::Start)
        ));
        assert!(matches!(
            Command::parse("/help@om_lab_bot", "om_lab_bot"),
            Ok(Command::Help)
        ));
        assert!(Command::parse("/about", "om_lab_bot").is_err());
    }
}
