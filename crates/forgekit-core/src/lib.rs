//! # forgekit Core
//!
//! Core types, errors, and the event bus for forgekit.
//! Provides the fundamental abstractions shared by the printer adapter,
//! the backend layer, and the application shell: telemetry data models,
//! the layered error taxonomy, and application-wide event distribution.

pub mod error;
pub mod event_bus;
pub mod types;

pub use error::{BackendError, CommandError, Error, Result, TransportError};

pub use event_bus::{
    CommandEvent, ConnectionEvent, ErrorEvent, EventBus, EventBusConfig, EventCategory,
    EventFilter, FileEvent, PrinterEvent, SubscriptionId, TelemetryEvent, UploadEvent,
};

pub use types::{
    EndstopState, JobProgress, LegacyMachineStatus, LegacyMoveMode, MachineState,
    MaterialMapping, MaterialSlot, MaterialStationStatus, PrinterInfo, PrinterModel,
    Temperature, UploadRequest,
};
