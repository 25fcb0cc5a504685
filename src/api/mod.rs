pub mod binance;
pub mod reconnect;
