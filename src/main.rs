use anyhow::{bail, Context};
use std::sync::Arc;
use std::time::Duration;

use forgekit::{
    init_logging, BackendInitOptions, BackendManager, EventBus, EventFilter, NetClientFactory,
    SettingsSource,
};
use forgekit_settings::{Config, FeatureSettings};

/// Bridges the config file to the flags the printer layer consults.
struct ConfigSettings {
    features: FeatureSettings,
}

impl SettingsSource for ConfigSettings {
    fn force_legacy_api(&self) -> bool {
        self.features.force_legacy_api
    }

    fn custom_leds(&self) -> bool {
        self.features.custom_leds
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    tracing::info!("forgekit {} ({})", forgekit::VERSION, forgekit::BUILD_DATE);

    let config = Config::load_or_default().context("loading configuration")?;
    if config.connection.ip.is_empty() {
        let path = Config::default_path()?;
        bail!(
            "no printer configured; set [connection] ip in {}",
            path.display()
        );
    }

    let bus = Arc::new(EventBus::new());
    bus.subscribe(EventFilter::All, |event| {
        tracing::info!("{}", event.description());
    });

    let settings = Arc::new(ConfigSettings {
        features: config.features,
    });
    let manager = Arc::new(BackendManager::new(
        Arc::new(NetClientFactory),
        settings,
        bus.clone(),
    ));

    let mut options = BackendInitOptions::new(
        config.connection.ip.clone(),
        config.connection.serial_number.clone(),
        config.connection.name.clone(),
        config.connection.model.clone(),
    );
    if !config.connection.check_code.is_empty() {
        options = options.with_check_code(config.connection.check_code.clone());
    }
    options.timeout = Duration::from_millis(config.connection.timeout_ms);

    let outcome = manager.initialize_backend(options).await;
    if !outcome.success {
        bail!(
            "backend initialization failed: {}",
            outcome.error.as_deref().unwrap_or("unknown cause")
        );
    }

    // The core imposes no polling cadence; this loop is the caller-owned
    // telemetry timer.
    let mut poll = tokio::time::interval(Duration::from_millis(config.telemetry.poll_interval_ms));
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
            _ = poll.tick() => {
                let status = manager.printer_status().await;
                if !status.success {
                    tracing::warn!(
                        "status poll failed: {}",
                        status.error.as_deref().unwrap_or("unknown cause")
                    );
                }
            }
        }
    }

    manager.dispose();
    Ok(())
}
