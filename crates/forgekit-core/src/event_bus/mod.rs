//! Application-wide event distribution.
//!
//! The adapter and backend layers report everything that happens —
//! connection lifecycle, telemetry changes, command outcomes, upload
//! progress — as [`PrinterEvent`]s on an [`EventBus`]. The IPC/UI layer
//! subscribes and renders; nothing in the core polls for state.
//!
//! Buses are constructed and injected explicitly; there is no process-wide
//! instance.

mod bus;
mod events;

pub use bus::{EventBus, EventBusConfig, EventFilter, SubscriptionId};
pub use events::{
    CommandEvent, ConnectionEvent, ErrorEvent, EventCategory, FileEvent, PrinterEvent,
    TelemetryEvent, UploadEvent,
};
