//! Telegram transport for the lookup bot.
//!
//! Long-polls the Bot API with teloxide, turns updates into pipeline events
//! and implements the pipeline's `Messenger` on top of the Bot API.

pub mod bot;
pub mod config;
pub mod error;
pub mod inbound;
pub mod outbound;

pub use {
    bot::{BotHandle, connect, start_polling},
    config::TelegramConfig,
    error::{Error, Result},
    outbound::TelegramMessenger,
};
