use chrono::Utc;
use env_logger::Builder;
use log::{debug, error, info, warn, LevelFilter};
use pricewatch::api::binance::{fetch_perpetual_symbols, StreamSource};
use pricewatch::config::Config;
use pricewatch::core::MonitorEngine;
use pricewatch::notify::{build_notifier, AlertDispatcher};
use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn init_logger(debug: bool) {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module(
            "pricewatch",
            if debug { LevelFilter::Debug } else { LevelFilter::Info },
        )
        .parse_default_env()
        .format(|buf, record| {
            let ts = chrono::Local::now().format("%H:%M:%S%.3f");
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                ts,
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = Config::from_env();
    init_logger(config.as_ref().map(|c| c.debug).unwrap_or(false));
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Starting Price Watch...");
    config.log();

    // Symbol discovery failure is fatal: no partial monitoring
    let http = reqwest::Client::new();
    let symbols = match fetch_perpetual_symbols(&http, &config.rest_url).await {
        Ok(symbols) => symbols,
        Err(e) => {
            error!("Failed to fetch Binance perpetual symbols: {}", e);
            return Err(e.into());
        }
    };
    info!("Monitoring {} USDT perpetual contracts", symbols.len());

    let notifier = build_notifier(config.telegram.as_ref());
    let (dispatcher, supervisor) = AlertDispatcher::spawn(Arc::clone(&notifier));
    let engine = Arc::new(MonitorEngine::new(config.monitor_settings()));

    let source = StreamSource::new(config.ws_url.clone(), config.backoff());
    let stream = source.start(&symbols, {
        let engine = Arc::clone(&engine);
        move |sample| {
            debug!("{}: {}", sample.symbol, sample.price);
            match engine.observe(&sample.symbol, sample.price, sample.received_at) {
                Ok(Some(alert)) => {
                    warn!("{}", alert);
                    dispatcher.dispatch(alert);
                }
                Ok(None) => {}
                Err(e) => debug!("Dropping sample for {}: {}", sample.symbol, e),
            }
        }
    })?;

    if notifier.is_enabled() {
        let text = format!(
            "🚀 Price monitor started\n\nSymbols: {}\nThreshold: ±{}%\nTime window: {}s",
            symbols.len(),
            config.threshold_percent,
            config.time_window_ms as f64 / 1000.0
        );
        if let Err(e) = notifier.send_text(&text).await {
            error!("Failed to send startup notification: {}", e);
        }
    }

    info!("Monitoring price moves, press Ctrl+C to exit");

    let mut heartbeat = tokio::time::interval(config.heartbeat_interval());
    heartbeat.tick().await; // First tick completes immediately

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                info!(
                    "[status] tracking {} symbols (stream {:?}, {} reconnects, {} UTC)",
                    engine.tracked_count(),
                    stream.state(),
                    stream.reconnects(),
                    Utc::now().format("%H:%M:%S")
                );
            }
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down...");
    stream.stop().await;

    // The stream callback held the last dispatcher, so the supervisor is
    // now draining in-flight deliveries
    if tokio::time::timeout(Duration::from_secs(5), supervisor)
        .await
        .is_err()
    {
        warn!("Alert deliveries still pending at shutdown, abandoning them");
    }
    info!("Shutdown complete");
    Ok(())
}
