//! Event type definitions for the event bus.
//!
//! Events are organized by category and designed to be cloneable and
//! serializable so the IPC layer can forward them to clients verbatim.
//!
//! The distinctions matter to consumers: a `Command(Blocked)` is mutex
//! contention and not worth an alarm, a `Command(Failed)` plus `Error` is
//! a real fault, and an unsupported command fails without ever reaching
//! the `Error` category.

use serde::{Deserialize, Serialize};

use crate::types::{MachineState, PrinterInfo};

/// Root event enum for everything the printer layer reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PrinterEvent {
    /// Connection lifecycle.
    Connection(ConnectionEvent),
    /// Telemetry updates and edge-triggered changes.
    Telemetry(TelemetryEvent),
    /// Command dispatch outcomes.
    Command(CommandEvent),
    /// File upload lifecycle.
    Upload(UploadEvent),
    /// File listing and thumbnail retrieval.
    File(FileEvent),
    /// Faults that deserve user attention.
    Error(ErrorEvent),
}

impl PrinterEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            PrinterEvent::Connection(_) => EventCategory::Connection,
            PrinterEvent::Telemetry(_) => EventCategory::Telemetry,
            PrinterEvent::Command(_) => EventCategory::Command,
            PrinterEvent::Upload(_) => EventCategory::Upload,
            PrinterEvent::File(_) => EventCategory::File,
            PrinterEvent::Error(_) => EventCategory::Error,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            PrinterEvent::Connection(e) => e.description(),
            PrinterEvent::Telemetry(e) => e.description(),
            PrinterEvent::Command(e) => e.description(),
            PrinterEvent::Upload(e) => e.description(),
            PrinterEvent::File(e) => e.description(),
            PrinterEvent::Error(e) => format!("Error in {}: {}", e.context, e.message),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Connection lifecycle events.
    Connection,
    /// Telemetry events.
    Telemetry,
    /// Command dispatch events.
    Command,
    /// Upload lifecycle events.
    Upload,
    /// File operation events.
    File,
    /// Error events.
    Error,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Connection => write!(f, "Connection"),
            EventCategory::Telemetry => write!(f, "Telemetry"),
            EventCategory::Command => write!(f, "Command"),
            EventCategory::Upload => write!(f, "Upload"),
            EventCategory::File => write!(f, "File"),
            EventCategory::Error => write!(f, "Error"),
        }
    }
}

/// Connection lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConnectionEvent {
    /// A connection attempt is starting.
    Connecting {
        /// Printer address being contacted.
        host: String,
        /// Printer display name.
        name: String,
    },
    /// The handshake completed.
    Connected {
        /// Printer display name.
        name: String,
        /// Printer serial number.
        serial_number: String,
        /// Protocol generation that was negotiated ("legacy"/"modern").
        protocol: String,
    },
    /// The connection attempt failed.
    ConnectionFailed {
        /// The underlying cause.
        error: String,
    },
    /// The adapter released its client.
    Disconnected,
}

impl ConnectionEvent {
    fn description(&self) -> String {
        match self {
            ConnectionEvent::Connecting { host, name } => {
                format!("Connecting to {} at {}", name, host)
            }
            ConnectionEvent::Connected {
                name, protocol, ..
            } => format!("Connected to {} ({} protocol)", name, protocol),
            ConnectionEvent::ConnectionFailed { error } => {
                format!("Connection failed: {}", error)
            }
            ConnectionEvent::Disconnected => "Disconnected".to_string(),
        }
    }
}

/// Telemetry events.
///
/// `PrinterInfoUpdated` fires on every successful poll; the `*Changed`
/// variants are edge-triggered against the previously observed value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TelemetryEvent {
    /// A fresh (or synthetic, during uploads) telemetry snapshot.
    PrinterInfoUpdated(Box<PrinterInfo>),
    /// The machine state differs from the last observation.
    MachineStateChanged {
        /// Previously observed state, if any.
        previous: Option<MachineState>,
        /// Newly observed state.
        current: MachineState,
    },
    /// The bed temperature differs from the last observation.
    BedTemperatureChanged {
        /// Previously observed reading.
        previous: Option<f32>,
        /// Newly observed reading.
        current: f32,
    },
    /// The extruder temperature differs from the last observation.
    ExtruderTemperatureChanged {
        /// Previously observed reading.
        previous: Option<f32>,
        /// Newly observed reading.
        current: f32,
    },
}

impl TelemetryEvent {
    fn description(&self) -> String {
        match self {
            TelemetryEvent::PrinterInfoUpdated(info) => {
                format!("Telemetry updated ({})", info.machine_state)
            }
            TelemetryEvent::MachineStateChanged { current, .. } => {
                format!("Machine state changed to {}", current)
            }
            TelemetryEvent::BedTemperatureChanged { current, .. } => {
                format!("Bed temperature now {:.1}C", current)
            }
            TelemetryEvent::ExtruderTemperatureChanged { current, .. } => {
                format!("Extruder temperature now {:.1}C", current)
            }
        }
    }
}

/// Command dispatch outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommandEvent {
    /// The command ran on the printer.
    Executed {
        /// Wire name of the command.
        command: String,
    },
    /// The command could not run. Unsupported commands land here too,
    /// without a companion `Error` event.
    Failed {
        /// Wire name of the command.
        command: String,
        /// Failure description.
        error: String,
    },
    /// The command was refused because an upload holds the connection.
    Blocked {
        /// Wire name of the command.
        command: String,
    },
}

impl CommandEvent {
    fn description(&self) -> String {
        match self {
            CommandEvent::Executed { command } => format!("Executed {}", command),
            CommandEvent::Failed { command, error } => {
                format!("Command {} failed: {}", command, error)
            }
            CommandEvent::Blocked { command } => {
                format!("Command {} blocked by upload", command)
            }
        }
    }
}

/// File upload lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UploadEvent {
    /// The upload acquired the lock and is transferring.
    Started {
        /// Name of the file being sent.
        file_name: String,
    },
    /// The transfer finished.
    Completed {
        /// Name of the file that was sent.
        file_name: String,
    },
    /// The transfer failed.
    Failed {
        /// Name of the file.
        file_name: String,
        /// Failure description.
        error: String,
    },
    /// The upload mutex was released; queued uploads and routine
    /// commands may proceed.
    LockReleased,
}

impl UploadEvent {
    fn description(&self) -> String {
        match self {
            UploadEvent::Started { file_name } => format!("Uploading {}", file_name),
            UploadEvent::Completed { file_name } => format!("Upload of {} completed", file_name),
            UploadEvent::Failed { file_name, error } => {
                format!("Upload of {} failed: {}", file_name, error)
            }
            UploadEvent::LockReleased => "Upload lock released".to_string(),
        }
    }
}

/// File listing and thumbnail retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileEvent {
    /// A file listing completed.
    FilesListed {
        /// Which listing ("recent"/"local").
        source: String,
        /// Number of entries returned.
        count: usize,
    },
    /// A thumbnail lookup finished.
    ThumbnailRetrieved {
        /// File the thumbnail was requested for.
        file_name: String,
        /// Whether any variant produced image data.
        found: bool,
    },
}

impl FileEvent {
    fn description(&self) -> String {
        match self {
            FileEvent::FilesListed { source, count } => {
                format!("Listed {} {} files", count, source)
            }
            FileEvent::ThumbnailRetrieved { file_name, found } => {
                if *found {
                    format!("Thumbnail retrieved for {}", file_name)
                } else {
                    format!("No thumbnail for {}", file_name)
                }
            }
        }
    }
}

/// A fault worth surfacing to the user.
///
/// Deliberately not emitted for unsupported commands or upload-blocked
/// refusals — those have quieter, dedicated events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Where the fault happened (operation or subsystem).
    pub context: String,
    /// Fault description.
    pub message: String,
}
