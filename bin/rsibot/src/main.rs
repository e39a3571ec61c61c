use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{BrokerClient, Config, InstrumentMeta};
use engine::Engine;
use paper::PaperBroker;
use strategy::BotConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("failed to load environment config")?;
    let bot = BotConfig::load(&cfg.bot_config_path).context("failed to load bot config")?;
    info!(
        symbol = %bot.symbol,
        strategy = %bot.strategy,
        lot_size = bot.lot_size,
        interval_secs = bot.sleep_interval_seconds,
        "RsiBot starting"
    );

    // ── Broker ────────────────────────────────────────────────────────────────
    let meta = InstrumentMeta {
        point: cfg.paper_point,
        digits: cfg.paper_digits,
    };
    // Replay starts with one window of history so the first cycle has data.
    let warmup = Engine::fetch_size_for(&bot).saturating_sub(1);
    let broker = PaperBroker::from_json_file(
        &cfg.paper_feed_path,
        bot.symbol.clone(),
        meta,
        cfg.paper_spread_points,
    )
    .with_context(|| format!("failed to load paper feed from '{}'", cfg.paper_feed_path))?
    .with_history(warmup);
    let broker: Arc<dyn BrokerClient> = Arc::new(broker);

    // ── Engine ────────────────────────────────────────────────────────────────
    let mut engine = Engine::new(&bot, broker);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    engine.run(shutdown).await.context("engine stopped on error")?;
    info!("Shutdown complete");
    Ok(())
}
