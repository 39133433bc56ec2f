//! Telegram bridge adapter: one bot relaying a single group chat, with
//! member join/leave events feeding the presence debouncer.

mod bot;
mod bridge;
mod handlers;

pub use bridge::TelegramBridge;
