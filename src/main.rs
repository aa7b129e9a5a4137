//! Bonding Alert - Entry Point
//!
//! Orchestrates:
//! 1. Config + credentials + logging initialization
//! 2. Bitquery source and subscription registry
//! 3. Poll scheduler (bonding-curve + price tracks)
//! 4. Telegram delivery task and command loop
//! 5. Ctrl+C graceful shutdown

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use bonding_alert::config::{constants, load_config, AppConfig, Credentials};
use bonding_alert::core::{
    init_logging, log_event, AlertEvent, ChannelBundle, CommandService, PollScheduler,
    SubscriptionRegistry,
};
use bonding_alert::notify::{command_loop, delivery_task, TelegramClient, TelegramSink};
use bonding_alert::source::{BitqueryClient, BitqueryConfig, MetricsSource};

/// Default config file (can be overridden with CONFIG_PATH env var)
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // =========================================================================
    // 1. Config + logging
    // =========================================================================
    dotenvy::dotenv().ok();
    init_logging();

    info!("=== Bonding Alert ===");

    let config_path = PathBuf::from(
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
    );
    let config = match load_config(&config_path) {
        Ok(config) => {
            info!(
                path = %config_path.display(),
                bonding_curve = ?config.thresholds.bonding_curve,
                market_cap = ?config.thresholds.market_cap,
                policy = ?config.polling.graduation_policy,
                "Configuration loaded"
            );
            config
        }
        Err(e) => {
            error!(path = %config_path.display(), error = %e, "Configuration failed");
            std::process::exit(1);
        }
    };

    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!(error = %e, "Missing credentials");
            std::process::exit(1);
        }
    };

    constants::log_configuration();

    // =========================================================================
    // 2. Source + registry + channels
    // =========================================================================
    let (source, telegram) = build_clients(&config, &credentials)?;

    let registry = SubscriptionRegistry::new().into_shared();
    let ChannelBundle {
        notification_tx,
        notification_rx,
        shutdown_tx,
    } = ChannelBundle::new(constants::notification_channel_capacity());

    // =========================================================================
    // 3. Poll scheduler
    // =========================================================================
    let scheduler = Arc::new(PollScheduler::new(
        source.clone(),
        registry.clone(),
        &config,
        notification_tx,
    ));
    let scheduler_shutdown = shutdown_tx.subscribe();
    let scheduler_handle = tokio::spawn(async move { scheduler.run(scheduler_shutdown).await });

    // =========================================================================
    // 4. Telegram delivery + commands
    // =========================================================================
    let delivery_handle = tokio::spawn(delivery_task(
        Arc::new(TelegramSink::new(telegram.clone())),
        notification_rx,
        shutdown_tx.subscribe(),
    ));

    let service = Arc::new(CommandService::new(source, registry.clone(), &config));
    let command_handle = tokio::spawn(command_loop(
        telegram,
        service,
        config.discovery.graduating_cutoff,
        constants::telegram_long_poll_secs(),
        shutdown_tx.subscribe(),
    ));

    log_event(&AlertEvent::service_started());

    // =========================================================================
    // 5. Wait for Ctrl+C -> graceful shutdown
    // =========================================================================
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(());

    if let Err(e) = scheduler_handle.await {
        warn!(error = %e, "Scheduler task ended abnormally");
    }
    match delivery_handle.await {
        Ok(delivered) => info!(delivered, "Delivery task stopped"),
        Err(e) => warn!(error = %e, "Delivery task ended abnormally"),
    }
    if let Err(e) = command_handle.await {
        warn!(error = %e, "Command loop ended abnormally");
    }

    log_event(&AlertEvent::service_shutdown(registry.len().await));
    Ok(())
}

/// Outbound clients: the Bitquery metrics source and the Telegram Bot API
fn build_clients(
    config: &AppConfig,
    credentials: &Credentials,
) -> bonding_alert::error::Result<(Arc<dyn MetricsSource>, Arc<TelegramClient>)> {
    let source: Arc<dyn MetricsSource> = Arc::new(BitqueryClient::new(
        BitqueryConfig::new(
            constants::bitquery_url(),
            credentials.bitquery_api_key.as_str(),
            constants::http_request_timeout(),
        ),
        config.protocol,
    )?);

    let telegram = Arc::new(TelegramClient::new(
        &constants::telegram_api_url(),
        &credentials.telegram_bot_token,
        constants::http_request_timeout(),
    )?);

    Ok((source, telegram))
}
