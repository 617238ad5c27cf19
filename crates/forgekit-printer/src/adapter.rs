//! The printer client adapter.
//!
//! The dispatch engine over one connected low-level client: resolves
//! commands through the mapping table, gates everything behind the
//! upload lock, normalizes telemetry across the two protocol
//! generations, and reports every outcome on the event bus.
//!
//! Lifecycle per instance: Unconnected → Connecting → Connected →
//! (Uploading ⇄ Connected)* → Disposed. An adapter is built once per
//! connection attempt; after [`PrinterClientAdapter::dispose`] a new
//! session needs a fresh `connect`.
//!
//! Concurrency model: uploads queue FIFO on an async mutex with no
//! timeout; ordinary commands and telemetry polls are refused — not
//! queued — while the lock is held. Uploads are rare and user-initiated,
//! so waiting is correct for them; a dropped poll simply retries on the
//! caller's next cycle. The two transports cannot multiplex a bulk
//! transfer with other traffic, which makes this mutual exclusion a
//! correctness requirement, not an optimization.

use forgekit_core::{
    CommandError, CommandEvent, ConnectionEvent, ErrorEvent, EventBus, FileEvent, MachineState,
    MaterialMapping, PrinterEvent, PrinterInfo, Result, TelemetryEvent, TransportError,
    UploadEvent, UploadRequest,
};
use parking_lot::{Mutex as SyncMutex, RwLock};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

use crate::commands::{Command, CommandKind, CommandOutput};
use crate::mapping::command_spec;
use crate::transport::{
    ClientFactory, ClientType, LegacyClient, PrinterTransport, TransportOptions,
};

/// Configuration flags the printer layer consults at dispatch time.
///
/// The application shell implements this over its config store; tests
/// use [`StaticSettings`].
pub trait SettingsSource: Send + Sync {
    /// Treat printers as legacy regardless of detected model.
    fn force_legacy_api(&self) -> bool {
        false
    }

    /// Route LED commands through the raw TCP bypass on modern
    /// connections.
    fn custom_leds(&self) -> bool {
        false
    }
}

/// Fixed settings, for tests and simple embedders.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSettings {
    /// Value returned by `force_legacy_api`.
    pub force_legacy_api: bool,
    /// Value returned by `custom_leds`.
    pub custom_leds: bool,
}

impl SettingsSource for StaticSettings {
    fn force_legacy_api(&self) -> bool {
        self.force_legacy_api
    }

    fn custom_leds(&self) -> bool {
        self.custom_leds
    }
}

/// Parameters for one connection attempt.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Printer IP address or hostname.
    pub ip: String,
    /// Printer serial number.
    pub serial_number: String,
    /// Display name.
    pub name: String,
    /// Check code for the modern handshake.
    pub check_code: Option<String>,
    /// Connect with the legacy client instead of the modern one.
    pub legacy_mode: bool,
    /// Request timeout.
    pub timeout: Duration,
}

impl ConnectOptions {
    /// Options with the default timeout.
    pub fn new(
        ip: impl Into<String>,
        serial_number: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            ip: ip.into(),
            serial_number: serial_number.into(),
            name: name.into(),
            check_code: None,
            legacy_mode: false,
            timeout: Duration::from_secs(5),
        }
    }

    /// Set the check code.
    pub fn with_check_code(mut self, check_code: impl Into<String>) -> Self {
        self.check_code = Some(check_code.into());
        self
    }

    /// Request the legacy client.
    pub fn legacy(mut self) -> Self {
        self.legacy_mode = true;
        self
    }
}

/// Stored identity of the connected printer.
#[derive(Debug, Clone)]
pub struct PrinterIdentity {
    /// IP address or hostname.
    pub ip: String,
    /// Serial number.
    pub serial_number: String,
    /// Display name.
    pub name: String,
    /// Check code, where one was supplied.
    pub check_code: Option<String>,
}

/// Outcome of a gated command dispatch.
///
/// `execute_command_with_handling` never returns an error; every path is
/// one of these, each with its own event signature.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandDisposition {
    /// The command ran; here is its output.
    Executed(CommandOutput),
    /// Refused: an upload holds the connection.
    Blocked,
    /// The active protocol variant cannot perform this command.
    Unsupported,
    /// The transport failed.
    Failed,
}

impl CommandDisposition {
    /// Whether the command actually ran.
    pub fn is_executed(&self) -> bool {
        matches!(self, CommandDisposition::Executed(_))
    }

    /// Extract the output of an executed command.
    pub fn into_output(self) -> Option<CommandOutput> {
        match self {
            CommandDisposition::Executed(output) => Some(output),
            _ => None,
        }
    }
}

/// The adapter: one connected client, one dispatch engine.
pub struct PrinterClientAdapter {
    factory: Arc<dyn ClientFactory>,
    settings: Arc<dyn SettingsSource>,
    bus: Arc<EventBus>,
    /// The exclusively owned client handle. Populated by `connect`,
    /// cleared by `dispose`.
    transport: RwLock<Option<PrinterTransport>>,
    identity: RwLock<Option<PrinterIdentity>>,
    /// FIFO upload lock. Held for the whole transfer.
    upload_mutex: AsyncMutex<()>,
    /// Cheap refusal gate mirrored from the mutex. Commands check this
    /// instead of contending on the mutex.
    upload_in_progress: AtomicBool,
    // Last observed values, only for edge-triggered change events
    last_machine_state: SyncMutex<Option<MachineState>>,
    last_bed_temp: SyncMutex<Option<f32>>,
    last_extruder_temp: SyncMutex<Option<f32>>,
}

impl PrinterClientAdapter {
    /// Create an unconnected adapter.
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        settings: Arc<dyn SettingsSource>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            factory,
            settings,
            bus,
            transport: RwLock::new(None),
            identity: RwLock::new(None),
            upload_mutex: AsyncMutex::new(()),
            upload_in_progress: AtomicBool::new(false),
            last_machine_state: SyncMutex::new(None),
            last_bed_temp: SyncMutex::new(None),
            last_extruder_temp: SyncMutex::new(None),
        }
    }

    /// Protocol generation of the active connection, if any.
    pub fn client_type(&self) -> Option<ClientType> {
        self.transport.read().as_ref().map(|t| t.client_type())
    }

    /// Whether a client is connected.
    pub fn is_connected(&self) -> bool {
        self.transport.read().is_some()
    }

    /// Whether an upload currently holds the connection.
    pub fn is_upload_in_progress(&self) -> bool {
        self.upload_in_progress.load(Ordering::SeqCst)
    }

    /// Identity of the connected printer.
    pub fn identity(&self) -> Option<PrinterIdentity> {
        self.identity.read().clone()
    }

    /// Connect to the printer.
    ///
    /// Emits `Connecting`, then exactly one of `Connected` or
    /// `ConnectionFailed`. Never returns an error; every failure
    /// resolves to `false` with the cause on the bus.
    pub async fn connect(&self, options: ConnectOptions) -> bool {
        self.bus
            .publish(PrinterEvent::Connection(ConnectionEvent::Connecting {
                host: options.ip.clone(),
                name: options.name.clone(),
            }));

        match self.try_connect(&options).await {
            Ok(transport) => {
                let client_type = transport.client_type();
                *self.transport.write() = Some(transport);
                *self.identity.write() = Some(PrinterIdentity {
                    ip: options.ip,
                    serial_number: options.serial_number.clone(),
                    name: options.name.clone(),
                    check_code: options.check_code,
                });
                tracing::info!("Connected to {} over the {} protocol", options.name, client_type);
                self.bus
                    .publish(PrinterEvent::Connection(ConnectionEvent::Connected {
                        name: options.name,
                        serial_number: options.serial_number,
                        protocol: client_type.to_string(),
                    }));
                true
            }
            Err(e) => {
                tracing::warn!("Connection to {} failed: {}", options.name, e);
                self.bus
                    .publish(PrinterEvent::Connection(ConnectionEvent::ConnectionFailed {
                        error: e.to_string(),
                    }));
                false
            }
        }
    }

    async fn try_connect(&self, options: &ConnectOptions) -> Result<PrinterTransport> {
        let transport_options = TransportOptions {
            ip: options.ip.clone(),
            serial_number: options.serial_number.clone(),
            check_code: options.check_code.clone(),
            timeout: options.timeout,
        };

        if options.legacy_mode {
            let client = self.factory.create_legacy(&transport_options)?;
            client.init_control().await?;
            Ok(PrinterTransport::Legacy(client))
        } else {
            // The modern handshake cannot proceed without a check code;
            // fail before any network traffic.
            if options
                .check_code
                .as_deref()
                .is_none_or(|code| code.is_empty())
            {
                return Err(TransportError::MissingCheckCode.into());
            }
            let handle = self.factory.create_modern(&transport_options)?;
            handle.control.initialize().await?;
            handle.control.init_control().await?;
            Ok(PrinterTransport::Modern(handle))
        }
    }

    /// Resolve and invoke a command through the mapping table.
    ///
    /// Errors distinguish unsupported operations from transport
    /// failures; callers that want events and gating use
    /// [`execute_command_with_handling`](Self::execute_command_with_handling).
    pub async fn execute_command(&self, command: &Command) -> Result<CommandOutput> {
        let transport = self
            .transport
            .read()
            .clone()
            .ok_or(TransportError::NotConnected)?;

        let spec = command_spec(command.kind()).ok_or_else(|| CommandError::UnknownCommand {
            name: command.name().to_string(),
        })?;

        match transport {
            PrinterTransport::Legacy(client) => {
                let Some(legacy) = &spec.legacy else {
                    return Err(self.unsupported(command, spec.unsupported_message));
                };
                let output = (legacy.invoke)(client.as_ref(), command).await?;
                Ok(match legacy.post_process {
                    Some(post) => post.apply(output),
                    None => output,
                })
            }
            PrinterTransport::Modern(handle) => {
                // Manual LED control reroutes through the TCP bypass
                let dispatch = if self.settings.custom_leds() {
                    spec.custom_leds_fallback.or(spec.modern)
                } else {
                    spec.modern
                };
                let Some(invoke) = dispatch else {
                    return Err(self.unsupported(command, spec.unsupported_message));
                };
                invoke(&handle, command).await
            }
        }
    }

    fn unsupported(&self, command: &Command, message: Option<&'static str>) -> forgekit_core::Error {
        CommandError::Unsupported {
            command: command.name().to_string(),
            message: message
                .unwrap_or("Operation not supported by this printer")
                .to_string(),
        }
        .into()
    }

    /// Gated dispatch: the path every feature-level operation funnels
    /// through.
    ///
    /// Refuses immediately (without queueing) while an upload holds the
    /// connection. Emits `command-executed`/`command-failed`/
    /// `command-blocked`; the generic `Error` event fires only for real
    /// transport failures, never for unsupported operations.
    pub async fn execute_command_with_handling(&self, command: &Command) -> CommandDisposition {
        let name = command.name().to_string();

        if self.upload_in_progress.load(Ordering::SeqCst) {
            self.bus
                .publish(PrinterEvent::Command(CommandEvent::Blocked {
                    command: name,
                }));
            return CommandDisposition::Blocked;
        }

        match self.execute_command(command).await {
            Ok(output) => {
                self.bus
                    .publish(PrinterEvent::Command(CommandEvent::Executed {
                        command: name,
                    }));
                if let CommandOutput::Files(files) = &output {
                    let source = match command.kind() {
                        CommandKind::ListRecentFiles => "recent",
                        _ => "local",
                    };
                    self.bus.publish(PrinterEvent::File(FileEvent::FilesListed {
                        source: source.to_string(),
                        count: files.len(),
                    }));
                }
                CommandDisposition::Executed(output)
            }
            Err(e) if e.is_unsupported() => {
                tracing::debug!("{} unsupported on this connection: {}", command.name(), e);
                self.bus.publish(PrinterEvent::Command(CommandEvent::Failed {
                    command: name,
                    error: e.to_string(),
                }));
                CommandDisposition::Unsupported
            }
            Err(e) => {
                tracing::error!("{} failed: {}", command.name(), e);
                self.bus.publish(PrinterEvent::Command(CommandEvent::Failed {
                    command: name.clone(),
                    error: e.to_string(),
                }));
                self.bus.publish(PrinterEvent::Error(ErrorEvent {
                    context: name,
                    message: e.to_string(),
                }));
                CommandDisposition::Failed
            }
        }
    }

    /// Raw command passthrough.
    ///
    /// Returns the printer's reply text, or an empty string on any
    /// failure; the cause goes to the bus instead of the caller.
    pub async fn send_raw_cmd(&self, command: &str) -> String {
        if self.upload_in_progress.load(Ordering::SeqCst) {
            self.bus
                .publish(PrinterEvent::Command(CommandEvent::Blocked {
                    command: command.to_string(),
                }));
            return String::new();
        }

        let transport = self.transport.read().clone();
        let result = match transport {
            Some(PrinterTransport::Legacy(client)) => client.send_raw(command).await,
            Some(PrinterTransport::Modern(handle)) => handle.tcp.send_raw(command).await,
            None => Err(TransportError::NotConnected.into()),
        };

        match result {
            Ok(reply) => {
                self.bus
                    .publish(PrinterEvent::Command(CommandEvent::Executed {
                        command: command.to_string(),
                    }));
                reply
            }
            Err(e) => {
                tracing::error!("raw command {:?} failed: {}", command, e);
                self.bus.publish(PrinterEvent::Command(CommandEvent::Failed {
                    command: command.to_string(),
                    error: e.to_string(),
                }));
                self.bus.publish(PrinterEvent::Error(ErrorEvent {
                    context: command.to_string(),
                    message: e.to_string(),
                }));
                String::new()
            }
        }
    }

    /// Transfer a job file to the printer.
    ///
    /// The one operation that queues on the upload lock instead of being
    /// refused. Emits `upload-started`, then one of `upload-completed`/
    /// `upload-failed`, then `upload-lock-released`, releasing the lock
    /// on every path.
    pub async fn upload_file(
        &self,
        file_path: impl AsRef<Path>,
        start_now: bool,
        auto_level: bool,
    ) -> bool {
        let request = UploadRequest::new(file_path.as_ref(), start_now, auto_level);
        self.run_upload(Command::UploadFile { request }).await
    }

    /// Transfer a job file with material-station slot assignments
    /// (AD5X).
    pub async fn upload_file_with_materials(
        &self,
        file_path: impl AsRef<Path>,
        start_now: bool,
        auto_level: bool,
        materials: Vec<MaterialMapping>,
    ) -> bool {
        let request =
            UploadRequest::new(file_path.as_ref(), start_now, auto_level).with_materials(materials);
        self.run_upload(Command::UploadFileWithMaterials { request })
            .await
    }

    async fn run_upload(&self, command: Command) -> bool {
        let file_name = match &command {
            Command::UploadFile { request } | Command::UploadFileWithMaterials { request } => {
                request.file_name()
            }
            _ => command.name().to_string(),
        };

        // Queue behind any upload already in flight
        let _guard = self.upload_mutex.lock().await;
        self.upload_in_progress.store(true, Ordering::SeqCst);
        self.bus.publish(PrinterEvent::Upload(UploadEvent::Started {
            file_name: file_name.clone(),
        }));

        let result = self.execute_command(&command).await;
        self.upload_in_progress.store(false, Ordering::SeqCst);

        let success = match result {
            Ok(_) => {
                tracing::info!("upload of {} completed", file_name);
                self.bus
                    .publish(PrinterEvent::Upload(UploadEvent::Completed { file_name }));
                true
            }
            Err(e) => {
                tracing::error!("upload of {} failed: {}", file_name, e);
                self.bus.publish(PrinterEvent::Upload(UploadEvent::Failed {
                    file_name,
                    error: e.to_string(),
                }));
                if !e.is_unsupported() {
                    self.bus.publish(PrinterEvent::Error(ErrorEvent {
                        context: command.name().to_string(),
                        message: e.to_string(),
                    }));
                }
                false
            }
        };

        self.bus
            .publish(PrinterEvent::Upload(UploadEvent::LockReleased));
        success
    }

    /// Fetch the normalized telemetry snapshot.
    ///
    /// While an upload holds the connection this short-circuits to a
    /// synthetic "Uploading File" snapshot without touching the network.
    /// Otherwise the modern client answers natively and the legacy path
    /// fans out over four calls and reassembles. Edge-triggers the
    /// `*Changed` events against the last observed values and always
    /// emits `printer-info-updated` on success.
    pub async fn printer_info(&self) -> Option<PrinterInfo> {
        if self.upload_in_progress.load(Ordering::SeqCst) {
            let (name, serial_number) = match self.identity.read().as_ref() {
                Some(identity) => (identity.name.clone(), identity.serial_number.clone()),
                None => (String::new(), String::new()),
            };
            let info = PrinterInfo::uploading_placeholder(&name, &serial_number, "");
            // The synthetic snapshot keeps the UI fresh but leaves the
            // edge-trigger caches alone.
            self.bus
                .publish(PrinterEvent::Telemetry(TelemetryEvent::PrinterInfoUpdated(
                    Box::new(info.clone()),
                )));
            return Some(info);
        }

        let transport = self.transport.read().clone()?;
        let result = match transport {
            PrinterTransport::Modern(handle) => handle.control.machine_detail().await,
            PrinterTransport::Legacy(client) => self.legacy_printer_info(client.as_ref()).await,
        };

        match result {
            Ok(info) => {
                self.emit_change_events(&info);
                self.bus
                    .publish(PrinterEvent::Telemetry(TelemetryEvent::PrinterInfoUpdated(
                        Box::new(info.clone()),
                    )));
                Some(info)
            }
            Err(e) => {
                tracing::warn!("telemetry fetch failed: {}", e);
                self.bus.publish(PrinterEvent::Error(ErrorEvent {
                    context: "getPrinterInfo".to_string(),
                    message: e.to_string(),
                }));
                None
            }
        }
    }

    /// Reassemble the modern snapshot shape from the legacy four-call
    /// fan-out.
    async fn legacy_printer_info(&self, client: &dyn LegacyClient) -> Result<PrinterInfo> {
        let machine = client.get_printer_info().await?;
        let temps = client.get_temp_info().await?;
        let progress = client.get_print_status().await?;
        let status = client.get_endstop_info().await?;

        let machine_state = MachineState::from_legacy(status.machine_status, status.move_mode);
        Ok(PrinterInfo {
            name: machine.name,
            firmware_version: machine.firmware_version,
            serial_number: machine.serial_number,
            model: machine.machine_type,
            machine_state,
            status_text: machine_state.to_string(),
            bed_temperature: temps.bed,
            extruder_temperature: temps.extruder,
            progress: (progress.bytes_total > 0).then_some(progress),
            current_file: status.current_file,
            led_on: Some(status.led_on),
            endstops: Some(status.endstops),
            material_station: None,
        })
    }

    fn emit_change_events(&self, info: &PrinterInfo) {
        let previous = {
            let mut last = self.last_machine_state.lock();
            let previous = *last;
            *last = Some(info.machine_state);
            previous
        };
        if previous != Some(info.machine_state) {
            self.bus
                .publish(PrinterEvent::Telemetry(TelemetryEvent::MachineStateChanged {
                    previous,
                    current: info.machine_state,
                }));
        }

        let bed = info.bed_temperature.current;
        let previous = {
            let mut last = self.last_bed_temp.lock();
            let previous = *last;
            *last = Some(bed);
            previous
        };
        if previous != Some(bed) {
            self.bus
                .publish(PrinterEvent::Telemetry(TelemetryEvent::BedTemperatureChanged {
                    previous,
                    current: bed,
                }));
        }

        let extruder = info.extruder_temperature.current;
        let previous = {
            let mut last = self.last_extruder_temp.lock();
            let previous = *last;
            *last = Some(extruder);
            previous
        };
        if previous != Some(extruder) {
            self.bus.publish(PrinterEvent::Telemetry(
                TelemetryEvent::ExtruderTemperatureChanged {
                    previous,
                    current: extruder,
                },
            ));
        }
    }

    /// Legacy-only thumbnail lookup with filename-variant fallback.
    ///
    /// Tries the name as given, then with `.gx` appended, then with a
    /// trailing `.gx` stripped, returning the first hit; `None` once
    /// every variant has missed. Lookup errors count as misses.
    pub async fn legacy_thumbnail(&self, file_name: &str) -> Option<Vec<u8>> {
        let transport = self.transport.read().clone()?;
        let PrinterTransport::Legacy(client) = transport else {
            return None;
        };

        for variant in thumbnail_variants(file_name) {
            match client.get_thumbnail(&variant).await {
                Ok(Some(bytes)) => {
                    self.bus
                        .publish(PrinterEvent::File(FileEvent::ThumbnailRetrieved {
                            file_name: file_name.to_string(),
                            found: true,
                        }));
                    return Some(bytes);
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!("thumbnail variant {:?} failed: {}", variant, e);
                    continue;
                }
            }
        }

        self.bus
            .publish(PrinterEvent::File(FileEvent::ThumbnailRetrieved {
                file_name: file_name.to_string(),
                found: false,
            }));
        None
    }

    /// Thumbnail lookup for either protocol generation.
    pub async fn thumbnail(&self, file_name: &str) -> Option<Vec<u8>> {
        let transport = self.transport.read().clone()?;
        match transport {
            PrinterTransport::Legacy(_) => self.legacy_thumbnail(file_name).await,
            PrinterTransport::Modern(handle) => {
                let found = handle.files.get_thumbnail(file_name).await.ok().flatten();
                self.bus
                    .publish(PrinterEvent::File(FileEvent::ThumbnailRetrieved {
                        file_name: file_name.to_string(),
                        found: found.is_some(),
                    }));
                found
            }
        }
    }

    /// Release the low-level client. Idempotent; emits `Disconnected`
    /// only when a client was actually released.
    pub fn dispose(&self) {
        let released = self.transport.write().take().is_some();
        *self.identity.write() = None;
        *self.last_machine_state.lock() = None;
        *self.last_bed_temp.lock() = None;
        *self.last_extruder_temp.lock() = None;
        self.upload_in_progress.store(false, Ordering::SeqCst);

        if released {
            tracing::info!("adapter disposed");
            self.bus
                .publish(PrinterEvent::Connection(ConnectionEvent::Disconnected));
        }
    }
}

/// The filename variants tried by the legacy thumbnail lookup, in
/// order, with duplicates skipped.
fn thumbnail_variants(file_name: &str) -> Vec<String> {
    let mut variants = vec![file_name.to_string()];
    let with_ext = format!("{}.gx", file_name);
    if !variants.contains(&with_ext) {
        variants.push(with_ext);
    }
    if let Some(stripped) = file_name.strip_suffix(".gx") {
        let stripped = stripped.to_string();
        if !stripped.is_empty() && !variants.contains(&stripped) {
            variants.push(stripped);
        }
    }
    variants
}
