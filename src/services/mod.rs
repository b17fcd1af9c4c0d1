//! External collaborators: exchange market data and alert delivery.

pub mod binance;
pub mod market_data;
pub mod notifier;
pub mod telegram;

pub use binance::BinanceMarketDataProvider;
pub use market_data::MarketDataProvider;
pub use notifier::Notifier;
pub use telegram::TelegramNotifier;
