//! Handler methods on [`crate::bot::WayfarerBot`], split by feature
//! area. Message-flow handlers take the sender and the current state's
//! payload; callback handlers return an optional toast for the button
//! acknowledgement.

pub mod profile;
pub mod trips;

use teloxide::types::{ButtonRequest, KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup};

use crate::texts;

/// One-button reply keyboard for prompts that accept a shared location.
pub(crate) fn location_keyboard() -> ReplyMarkup {
    let button = KeyboardButton::new(texts::SEND_LOCATION).request(ButtonRequest::Location);
    ReplyMarkup::Keyboard(KeyboardMarkup::new(vec![vec![button]]).resize_keyboard())
}

pub(crate) fn remove_keyboard() -> ReplyMarkup {
    ReplyMarkup::KeyboardRemove(KeyboardRemove::new())
}
