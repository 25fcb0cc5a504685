use crate::api::reconnect::Backoff;
use crate::core::Sample;
use crate::error::PriceWatchError;
use chrono::Utc;
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const BINANCE_FUTURES_WS_URL: &str = "wss://fstream.binance.com";

#[derive(Debug, Deserialize)]
struct TickerData {
    stream: String,
    data: TickerDataInner,
}

#[derive(Debug, Deserialize)]
struct TickerDataInner {
    s: String, // Symbol
    c: String, // Last price
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Parse one combined-stream ticker message.
pub fn parse_ticker(text: &str) -> Result<Sample, PriceWatchError> {
    let ticker: TickerData = serde_json::from_str(text)?;
    let price: f64 = ticker.data.c.parse().map_err(|_| {
        PriceWatchError::MalformedMessage(format!(
            "{}: unparsable price {:?}",
            ticker.stream, ticker.data.c
        ))
    })?;
    Ok(Sample::new(ticker.data.s, price, Utc::now()))
}

/// Multiplexed ticker stream for a fixed symbol set.
#[derive(Debug, Clone)]
pub struct StreamSource {
    base_url: String,
    backoff: Backoff,
}

impl StreamSource {
    pub fn new(base_url: impl Into<String>, backoff: Backoff) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            backoff,
        }
    }

    /// Combined stream URL carrying every symbol on a single connection
    pub fn stream_url<'a, I>(&self, symbols: I) -> String
    where
        I: IntoIterator<Item = &'a String>,
    {
        let streams = symbols
            .into_iter()
            .map(|s| format!("{}@ticker", s.to_lowercase()))
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/stream?streams={}", self.base_url, streams)
    }

    /// Spawn the connection task. Must be called from within a tokio runtime.
    ///
    /// `on_sample` runs on the connection task for every parsed ticker, so it
    /// must not block.
    pub fn start<F>(&self, symbols: &[String], on_sample: F) -> Result<StreamHandle, PriceWatchError>
    where
        F: FnMut(Sample) + Send + 'static,
    {
        let symbols: BTreeSet<String> = symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            return Err(PriceWatchError::NoSymbols);
        }

        let url = self.stream_url(&symbols);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let reconnects = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(run_stream(
            url,
            symbols.len(),
            self.backoff,
            on_sample,
            shutdown_rx,
            state_tx,
            Arc::clone(&reconnects),
        ));

        Ok(StreamHandle {
            shutdown: shutdown_tx,
            state: state_rx,
            reconnects,
            task,
        })
    }
}

/// Running stream. Dropping it without `stop` also ends the task.
pub struct StreamHandle {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<ConnectionState>,
    reconnects: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Number of reconnects scheduled so far
    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// Cancel any pending reconnect, close the socket and wait for the task.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Ticker stream task failed: {}", e);
        }
    }
}

enum StreamEnd {
    Lost,
    Stopped,
}

async fn run_stream<F>(
    url: String,
    symbol_count: usize,
    backoff: Backoff,
    mut on_sample: F,
    mut shutdown: watch::Receiver<bool>,
    state: watch::Sender<ConnectionState>,
    reconnects: Arc<AtomicU64>,
) where
    F: FnMut(Sample) + Send + 'static,
{
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        state.send_replace(ConnectionState::Connecting);
        info!("Connecting to Binance WebSocket ({} symbols)", symbol_count);
        debug!("Stream URL: {}", url);

        let connected = tokio::select! {
            result = connect_async(url.as_str()) => result,
            _ = shutdown.changed() => break,
        };

        match connected {
            Ok((ws_stream, _)) => {
                state.send_replace(ConnectionState::Connected);
                info!("Successfully connected to WebSocket");
                attempt = 0;

                if let StreamEnd::Stopped = read_stream(ws_stream, &mut on_sample, &mut shutdown).await {
                    break;
                }
            }
            Err(e) => {
                error!("Connection error: {}", e);
            }
        }

        let delay = backoff.delay(attempt);
        attempt = attempt.saturating_add(1);
        reconnects.fetch_add(1, Ordering::Relaxed);
        state.send_replace(ConnectionState::Disconnected);
        warn!(
            "WebSocket disconnected, reconnecting in {}ms (attempt {})",
            delay.as_millis(),
            attempt
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    state.send_replace(ConnectionState::Disconnected);
    info!("Ticker stream stopped");
}

async fn read_stream<F>(
    mut ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    on_sample: &mut F,
    shutdown: &mut watch::Receiver<bool>,
) -> StreamEnd
where
    F: FnMut(Sample),
{
    loop {
        let message = tokio::select! {
            message = ws_stream.next() => message,
            _ = shutdown.changed() => {
                if let Err(e) = ws_stream.close(None).await {
                    debug!("Error closing WebSocket: {}", e);
                }
                return StreamEnd::Stopped;
            }
        };

        match message {
            Some(Ok(Message::Text(text))) => match parse_ticker(&text) {
                Ok(sample) => on_sample(sample),
                Err(e) => warn!("Failed to parse ticker data: {}", e),
            },
            Some(Ok(Message::Close(frame))) => {
                info!("WebSocket connection closed: {:?}", frame);
                return StreamEnd::Lost;
            }
            Some(Ok(_)) => {} // Ping/pong and binary frames
            Some(Err(e)) => {
                error!("WebSocket error: {}", e);
                // Force the close so errors take the same path as a close
                let _ = ws_stream.close(None).await;
                return StreamEnd::Lost;
            }
            None => {
                info!("WebSocket stream ended");
                return StreamEnd::Lost;
            }
        }
    }
}
