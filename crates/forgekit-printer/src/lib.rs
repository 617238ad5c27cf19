//! # forgekit Printer
//!
//! The printer protocol adaptation layer for forgekit.
//! Speaks two materially different wire protocols — the legacy
//! single-socket M-code dialect and the modern 5M/Pro multi-channel
//! API — behind one uniform interface.
//!
//! Layering, bottom up:
//! - [`transport`] — the two client shapes and the [`transport::PrinterTransport`]
//!   sum type over them.
//! - [`mapping`] — the declarative command-dispatch table.
//! - [`adapter`] — the dispatch engine: upload-lock gating, lifecycle and
//!   edge-triggered event emission, protocol normalization.
//! - [`backend`] — per-model strategy objects over the adapter, and the
//!   manager that guarantees at most one is live.

pub mod adapter;
pub mod backend;
pub mod capabilities;
pub mod commands;
pub mod detect;
pub mod mapping;
pub mod transport;

pub use adapter::{
    CommandDisposition, ConnectOptions, PrinterClientAdapter, PrinterIdentity, SettingsSource,
    StaticSettings,
};
pub use backend::{
    Ad5xBackend, Adventurer5MBackend, Adventurer5MProBackend, BackendInitOptions, BackendManager,
    BackendResponse, BackendStatus, GenericLegacyBackend, InitOutcome, PrinterBackend,
};
pub use capabilities::PrinterFeatureSet;
pub use commands::{Command, CommandKind, CommandOutput};
pub use detect::detect_model;
pub use mapping::{command_spec, CommandSpec, PostProcess, COMMAND_TABLE};
pub use transport::{
    ClientFactory, ClientType, ControlApi, FilesApi, JobControlApi, LegacyClient,
    LegacyMachineInfo, LegacyStatusInfo, LegacyTempInfo, ModernHandle, NetClientFactory,
    NoOpLegacyClient, NoOpModernClient, PrinterTransport, RawTcpApi, TempControlApi,
};
