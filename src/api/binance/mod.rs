//! Binance USDT-M futures: symbol discovery over REST and the combined
//! ticker WebSocket stream.

pub mod rest;
pub mod ws;

pub use rest::{fetch_perpetual_symbols, BINANCE_FUTURES_REST_URL};
pub use ws::{ConnectionState, StreamHandle, StreamSource, BINANCE_FUTURES_WS_URL};
