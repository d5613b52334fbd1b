pub mod alert;
pub mod binance;
pub mod config;
pub mod detector;
pub mod display;
pub mod error;
pub mod ingest;
pub mod model;
pub mod monitor;
pub mod notify;
