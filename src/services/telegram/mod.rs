//! Telegram alert delivery

pub mod client;
pub mod format;

pub use client::{TelegramNotifier, DEFAULT_TELEGRAM_API_URL};
pub use format::{escape_markdown_v2, render_completion, render_signal, ReferenceContext};
