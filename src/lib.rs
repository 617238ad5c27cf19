//! # forgekit
//!
//! A supervisor for network-attached FlashForge 3D printers with support
//! for:
//! - The legacy single-socket M-code protocol (Adventurer 3/4 era)
//! - The modern 5M/Pro multi-channel API (Adventurer 5M, 5M Pro, AD5X)
//! - Live telemetry with edge-triggered change events
//! - Job control, file listing, thumbnails, and serialized file uploads
//!
//! ## Architecture
//!
//! forgekit is organized as a workspace with multiple crates:
//!
//! 1. **forgekit-core** - Shared types, errors, and the event bus
//! 2. **forgekit-printer** - Transports, command dispatch, adapter, backends
//! 3. **forgekit-settings** - Configuration persistence
//! 4. **forgekit** - Main binary that composes the crates
//!
//! The binary is the composition root: it constructs the event bus and
//! the backend manager explicitly and injects them downward. Nothing in
//! the libraries reaches for global state.

pub use forgekit_core::{
    BackendError, CommandError, Error, EventBus, EventBusConfig, EventCategory, EventFilter,
    JobProgress, MachineState, MaterialMapping, MaterialStationStatus, PrinterEvent, PrinterInfo,
    PrinterModel, Result, Temperature, TransportError, UploadRequest,
};

pub use forgekit_printer::{
    detect_model, Ad5xBackend, Adventurer5MBackend, Adventurer5MProBackend, BackendInitOptions,
    BackendManager, BackendResponse, BackendStatus, ClientFactory, ClientType, Command,
    CommandDisposition, CommandKind, CommandOutput, ConnectOptions, InitOutcome, NetClientFactory,
    PrinterBackend, PrinterClientAdapter, PrinterFeatureSet, SettingsSource, StaticSettings,
};

pub use forgekit_settings::{Config, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with console output, `RUST_LOG`
/// environment variable support, and INFO as the default level.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
