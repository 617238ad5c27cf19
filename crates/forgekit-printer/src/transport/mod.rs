//! Printer transport abstractions.
//!
//! Two client shapes exist, one per protocol generation:
//! - [`LegacyClient`] — one flat handle over the single-socket M-code
//!   dialect (port 8899).
//! - [`ModernHandle`] — a bundle of typed sub-clients (`control`,
//!   `temp_control`, `job_control`, `files`) over the modern HTTP API
//!   (port 8898), plus a raw TCP bypass (`tcp`) used for manual LED
//!   control and raw command passthrough.
//!
//! [`PrinterTransport`] is the tagged union over the two shapes; the
//! mapping table dispatches through it with typed accessors, so the
//! compiler checks that every command covers both variants (or declares
//! itself unsupported).

mod legacy;
mod modern;
mod noop;

pub use legacy::{LegacyRequest, TcpLegacyClient};
pub use modern::{HttpModernClient, TcpBypassClient};
pub use noop::{NoOpLegacyClient, NoOpModernClient};

use async_trait::async_trait;
use forgekit_core::{
    EndstopState, JobProgress, LegacyMachineStatus, LegacyMoveMode, PrinterInfo, Result,
    Temperature, UploadRequest,
};
use std::sync::Arc;
use std::time::Duration;

/// Protocol generation of a connected client. Immutable once a
/// connection is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    /// Single-socket M-code dialect.
    Legacy,
    /// Multi-channel 5M/Pro API.
    Modern,
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Modern => write!(f, "modern"),
        }
    }
}

/// Identity block from a legacy `~M115` report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyMachineInfo {
    /// Machine type string (e.g. "Flashforge Adventurer 4").
    pub machine_type: String,
    /// Machine display name.
    pub name: String,
    /// Firmware version.
    pub firmware_version: String,
    /// Serial number.
    pub serial_number: String,
    /// Number of tools.
    pub tool_count: u32,
    /// MAC address.
    pub mac_address: String,
}

/// Temperature block from a legacy `~M105` report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LegacyTempInfo {
    /// Extruder (T0) temperature pair.
    pub extruder: Temperature,
    /// Bed (B) temperature pair.
    pub bed: Temperature,
}

/// Status block from a legacy `~M119` report.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyStatusInfo {
    /// Machine status token.
    pub machine_status: LegacyMachineStatus,
    /// Move mode token.
    pub move_mode: LegacyMoveMode,
    /// Endstop switch states.
    pub endstops: EndstopState,
    /// Chamber LED state.
    pub led_on: bool,
    /// File of the active job, if any.
    pub current_file: Option<String>,
}

/// The legacy client shape: every operation on one flat handle.
#[async_trait]
pub trait LegacyClient: Send + Sync {
    /// Take control of the printer (`~M601`). Must be called before
    /// anything else; the legacy protocol has no other handshake.
    async fn init_control(&self) -> Result<()>;

    /// Home all axes.
    async fn home_axes(&self) -> Result<()>;
    /// Turn the chamber LED on.
    async fn led_on(&self) -> Result<()>;
    /// Turn the chamber LED off.
    async fn led_off(&self) -> Result<()>;

    /// Set the bed target temperature.
    async fn set_bed_temperature(&self, celsius: u32) -> Result<()>;
    /// Turn the bed heater off.
    async fn cancel_bed_temperature(&self) -> Result<()>;
    /// Set the extruder target temperature.
    async fn set_extruder_temperature(&self, celsius: u32) -> Result<()>;
    /// Turn the extruder heater off.
    async fn cancel_extruder_temperature(&self) -> Result<()>;

    /// Pause the running job.
    async fn pause_job(&self) -> Result<()>;
    /// Resume a paused job.
    async fn resume_job(&self) -> Result<()>;
    /// Cancel the running job.
    async fn cancel_job(&self) -> Result<()>;
    /// Select a file from printer storage and start printing it.
    async fn start_local_job(&self, file_name: &str) -> Result<()>;

    /// List files on printer storage (`~M661`). The legacy listing has
    /// no limit parameter; callers truncate.
    async fn list_files(&self) -> Result<Vec<String>>;

    /// Identity block (`~M115`).
    async fn get_printer_info(&self) -> Result<LegacyMachineInfo>;
    /// Temperatures (`~M105`).
    async fn get_temp_info(&self) -> Result<LegacyTempInfo>;
    /// Job progress (`~M27`).
    async fn get_print_status(&self) -> Result<JobProgress>;
    /// Machine status, move mode, endstops (`~M119`).
    async fn get_endstop_info(&self) -> Result<LegacyStatusInfo>;

    /// Fetch the embedded thumbnail of a stored file (`~M662`).
    /// Returns `None` when the printer has no image for that exact name.
    async fn get_thumbnail(&self, file_name: &str) -> Result<Option<Vec<u8>>>;

    /// Send a raw instruction and return the printer's reply text.
    async fn send_raw(&self, command: &str) -> Result<String>;

    /// Transfer a job file (`~M28`/`~M29` framing).
    async fn upload_file(&self, request: &UploadRequest) -> Result<()>;
}

/// Modern control channel: handshake, motion, LED, filtration, platform.
#[async_trait]
pub trait ControlApi: Send + Sync {
    /// Verify the printer is reachable and the check code is accepted.
    async fn initialize(&self) -> Result<()>;
    /// Acquire the control session.
    async fn init_control(&self) -> Result<()>;
    /// Full telemetry snapshot, natively in the normalized shape.
    async fn machine_detail(&self) -> Result<PrinterInfo>;
    /// Home all axes.
    async fn home_axes(&self) -> Result<()>;
    /// Switch the chamber LED.
    async fn set_led(&self, on: bool) -> Result<()>;
    /// Drive the enclosure filtration fans (5M Pro).
    async fn set_filtration(&self, external: bool, internal: bool) -> Result<()>;
    /// Advance the belt/clear the platform after a completed job.
    async fn clear_platform(&self) -> Result<()>;
}

/// Modern temperature channel.
#[async_trait]
pub trait TempControlApi: Send + Sync {
    /// Set the bed target temperature.
    async fn set_bed_temperature(&self, celsius: u32) -> Result<()>;
    /// Turn the bed heater off.
    async fn cancel_bed_temperature(&self) -> Result<()>;
    /// Set the extruder target temperature.
    async fn set_extruder_temperature(&self, celsius: u32) -> Result<()>;
    /// Turn the extruder heater off.
    async fn cancel_extruder_temperature(&self) -> Result<()>;
}

/// Modern job-control channel.
#[async_trait]
pub trait JobControlApi: Send + Sync {
    /// Pause the running job.
    async fn pause_job(&self) -> Result<()>;
    /// Resume a paused job.
    async fn resume_job(&self) -> Result<()>;
    /// Cancel the running job.
    async fn cancel_job(&self) -> Result<()>;
    /// Start printing a file already on printer storage.
    async fn start_local_job(&self, file_name: &str) -> Result<()>;
}

/// Modern file channel.
#[async_trait]
pub trait FilesApi: Send + Sync {
    /// List files on printer storage.
    async fn list_local_files(&self) -> Result<Vec<String>>;
    /// List recently printed files, newest first, at most `limit`.
    async fn list_recent_files(&self, limit: usize) -> Result<Vec<String>>;
    /// Fetch the thumbnail for a stored file.
    async fn get_thumbnail(&self, file_name: &str) -> Result<Option<Vec<u8>>>;
    /// Transfer a job file, with material mappings where present.
    async fn upload_file(&self, request: &UploadRequest) -> Result<()>;
}

/// Raw TCP bypass on the modern printers.
///
/// The 5M family still answers M-codes on the legacy port; this channel
/// carries the manual LED fallback and raw command passthrough.
#[async_trait]
pub trait RawTcpApi: Send + Sync {
    /// Turn the chamber LED on, bypassing the control channel.
    async fn led_on(&self) -> Result<()>;
    /// Turn the chamber LED off, bypassing the control channel.
    async fn led_off(&self) -> Result<()>;
    /// Send a raw instruction and return the reply text.
    async fn send_raw(&self, command: &str) -> Result<String>;
}

/// The modern client shape: typed sub-clients over one session.
#[derive(Clone)]
pub struct ModernHandle {
    /// Control channel.
    pub control: Arc<dyn ControlApi>,
    /// Temperature channel.
    pub temp_control: Arc<dyn TempControlApi>,
    /// Job-control channel.
    pub job_control: Arc<dyn JobControlApi>,
    /// File channel.
    pub files: Arc<dyn FilesApi>,
    /// Raw TCP bypass.
    pub tcp: Arc<dyn RawTcpApi>,
}

impl std::fmt::Debug for ModernHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModernHandle").finish_non_exhaustive()
    }
}

/// A connected low-level client of either shape.
///
/// Cloning is cheap (shared handles); the adapter still enforces that
/// exactly one transport is live per connection.
#[derive(Clone)]
pub enum PrinterTransport {
    /// Legacy single-socket client.
    Legacy(Arc<dyn LegacyClient>),
    /// Modern multi-channel client.
    Modern(ModernHandle),
}

impl PrinterTransport {
    /// Protocol generation of this transport.
    pub fn client_type(&self) -> ClientType {
        match self {
            PrinterTransport::Legacy(_) => ClientType::Legacy,
            PrinterTransport::Modern(_) => ClientType::Modern,
        }
    }
}

impl std::fmt::Debug for PrinterTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrinterTransport::Legacy(_) => write!(f, "PrinterTransport::Legacy"),
            PrinterTransport::Modern(_) => write!(f, "PrinterTransport::Modern"),
        }
    }
}

/// Everything needed to reach one printer.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Printer IP address or hostname.
    pub ip: String,
    /// Serial number (required by the modern handshake).
    pub serial_number: String,
    /// Check code for the modern handshake.
    pub check_code: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

/// Builds low-level clients.
///
/// Injected into the adapter so tests can substitute scripted clients;
/// [`NetClientFactory`] is the production implementation.
pub trait ClientFactory: Send + Sync {
    /// Build a legacy client for the given printer.
    fn create_legacy(&self, options: &TransportOptions) -> Result<Arc<dyn LegacyClient>>;
    /// Build a modern client bundle for the given printer.
    fn create_modern(&self, options: &TransportOptions) -> Result<ModernHandle>;
}

/// Production factory: TCP for legacy, HTTP + TCP bypass for modern.
#[derive(Debug, Default)]
pub struct NetClientFactory;

impl ClientFactory for NetClientFactory {
    fn create_legacy(&self, options: &TransportOptions) -> Result<Arc<dyn LegacyClient>> {
        Ok(Arc::new(TcpLegacyClient::new(&options.ip, options.timeout)))
    }

    fn create_modern(&self, options: &TransportOptions) -> Result<ModernHandle> {
        let check_code = options.check_code.clone().unwrap_or_default();
        let client = Arc::new(HttpModernClient::new(
            &options.ip,
            &options.serial_number,
            &check_code,
            options.timeout,
        )?);
        let bypass = Arc::new(TcpBypassClient::new(&options.ip, options.timeout));
        Ok(ModernHandle {
            control: client.clone(),
            temp_control: client.clone(),
            job_control: client.clone(),
            files: client,
            tcp: bypass,
        })
    }
}
