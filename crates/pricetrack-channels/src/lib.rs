//! Delivery channels. Telegram is the production channel; `format`
//! builds the alert and summary texts it sends.

pub mod format;
pub mod telegram;

pub use telegram::TelegramSender;
