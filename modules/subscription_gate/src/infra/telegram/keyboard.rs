use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::domain::menu::Button;

pub fn inline_keyboard(rows: &[Vec<Button>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        rows.iter()
            .map(|row| row.iter().map(to_button).collect::<Vec<_>>()),
    )
}

fn to_button(button: &Button) -> InlineKeyboardButton {
    match button {
        Button::Link { text, url } => InlineKeyboardButton::url(text.clone(), url.clone()),
        Button::Action { text, action } => {
            InlineKeyboardButton::callback(text.clone(), action.token())
        }
    }
}
