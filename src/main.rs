use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use volmon::alert::{
    AlertDelivery, AlertDispatcher, AlertGuard, AlertSink, DiscordWebhookSink, LogSink,
    WebhookTarget,
};
use volmon::binance::rest::BinanceRestClient;
use volmon::binance::ws::BinanceWsClient;
use volmon::config::{AlertConfig, Config, LoggingConfig};
use volmon::display::{ConsoleRenderer, SharedDisplayState};
use volmon::model::tick::{now_secs, PriceTick};
use volmon::monitor::SymbolMonitor;

const TICK_CHANNEL_CAPACITY: usize = 256;
const RENDER_POLL: Duration = Duration::from_millis(500);

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        logging
            .level
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });

    match &logging.file {
        // Log to file so it doesn't interfere with the price table
        Some(path) => {
            let log_file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(log_file)
                .with_ansi(false)
                .json()
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn build_sink(alert: &AlertConfig) -> Result<Arc<dyn AlertSink>> {
    let Some(raw_url) = alert.webhook_url.as_deref() else {
        tracing::warn!("DISCORD_WEBHOOK_URL not set, alerts will only be logged");
        return Ok(Arc::new(LogSink));
    };

    let target = WebhookTarget::parse(raw_url).context("DISCORD_WEBHOOK_URL is invalid")?;
    if !alert.allowed_webhook_ids.iter().any(|id| id == target.id()) {
        tracing::warn!(
            webhook_id = %target.id(),
            "Webhook id is not in alert.allowed_webhook_ids, every alert will be rejected"
        );
    }
    Ok(Arc::new(DiscordWebhookSink::new(target, alert.timeout())?))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider was already installed");
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Check {} and the .env file", Config::path().display());
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging)?;

    let symbols = config.binance.monitored_symbols();
    tracing::info!(
        symbols = %symbols.join(","),
        window_seconds = config.monitor.window_seconds,
        threshold_percent = config.monitor.threshold_percent,
        policy = ?config.alert.policy,
        "Starting volmon"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    // Alert delivery runs apart from the pipelines so a slow sink never
    // stalls tick processing.
    let (alerts, alert_rx) = AlertDispatcher::channel(config.alert.queue_capacity);
    let delivery = AlertDelivery::new(
        build_sink(&config.alert)?,
        AlertGuard::new(&config.alert.allowed_webhook_ids, config.alert.secret.clone()),
        config.alert.token.clone(),
        config.alert.timeout(),
    );
    tasks.push(tokio::spawn(delivery.run(alert_rx, shutdown_rx.clone())));

    let rest = Arc::new(BinanceRestClient::new(
        &config.binance.rest_base_url,
        config.binance.api_key.as_deref(),
        config.binance.request_timeout(),
    )?);
    match rest.ping().await {
        Ok(()) => tracing::info!("Binance ping OK"),
        Err(e) => tracing::warn!(error = %format!("{:#}", e), "Binance ping failed"),
    }

    let display = Arc::new(SharedDisplayState::new(
        &symbols,
        config.ui.render_interval_seconds,
    ));

    for symbol in &symbols {
        let (tick_tx, tick_rx) = mpsc::channel::<PriceTick>(TICK_CHANNEL_CAPACITY);

        let mut monitor = SymbolMonitor::new(symbol, &config, display.clone(), alerts.clone());
        let monitor_rest = rest.clone();
        let monitor_shutdown = shutdown_rx.clone();
        let monitor_symbol = symbol.clone();
        tasks.push(tokio::spawn(async move {
            match monitor_rest.ticker_price(&monitor_symbol).await {
                Ok(price) => {
                    let _ = monitor.seed_snapshot(price, now_secs());
                }
                Err(e) => tracing::warn!(
                    symbol = %monitor_symbol,
                    error = %format!("{:#}", e),
                    "Snapshot price fetch failed"
                ),
            }
            monitor.run(tick_rx, monitor_shutdown).await;
        }));

        let ws_client = BinanceWsClient::new(
            &config.binance.ws_base_url,
            symbol,
            config.binance.reconnect_delay(),
            config.binance.rate_limit_backoff(),
        );
        let ws_symbol = symbol.clone();
        let ws_shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = ws_client.connect_and_run(tick_tx, ws_shutdown).await {
                tracing::error!(symbol = %ws_symbol, error = %e, "WS worker failed");
            }
        }));
    }
    drop(alerts);

    let render_display = display.clone();
    let mut render_shutdown = shutdown_rx.clone();
    tasks.push(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RENDER_POLL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = render_display.maybe_render(now_secs(), &ConsoleRenderer);
                }
                _ = render_shutdown.changed() => break,
            }
        }
    }));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("Shutdown requested");
    let _ = shutdown_tx.send(true);

    for task in tasks {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Task ended abnormally");
        }
    }
    tracing::info!("Monitoring stopped");
    Ok(())
}
