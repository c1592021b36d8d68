pub mod providers;
pub mod ticker_sync;
