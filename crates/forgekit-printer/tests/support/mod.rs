//! Shared test support: scripted mock clients, a recording event log,
//! and a client factory that hands out preset mocks.

#![allow(dead_code)]

use async_trait::async_trait;
use forgekit_core::{
    EndstopState, Error, EventBus, EventFilter, JobProgress, LegacyMachineStatus, LegacyMoveMode,
    MachineState, PrinterEvent, PrinterInfo, Result, Temperature, UploadRequest,
};
use forgekit_printer::transport::{
    ClientFactory, ControlApi, FilesApi, JobControlApi, LegacyClient, LegacyMachineInfo,
    LegacyStatusInfo, LegacyTempInfo, ModernHandle, RawTcpApi, TempControlApi, TransportOptions,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Canonical kebab-case name of an event, for order-of-emission
/// assertions.
pub fn event_name(event: &PrinterEvent) -> &'static str {
    use forgekit_core::{
        CommandEvent, ConnectionEvent, FileEvent, TelemetryEvent, UploadEvent,
    };
    match event {
        PrinterEvent::Connection(ConnectionEvent::Connecting { .. }) => "connecting",
        PrinterEvent::Connection(ConnectionEvent::Connected { .. }) => "connected",
        PrinterEvent::Connection(ConnectionEvent::ConnectionFailed { .. }) => "connection-failed",
        PrinterEvent::Connection(ConnectionEvent::Disconnected) => "disconnected",
        PrinterEvent::Telemetry(TelemetryEvent::PrinterInfoUpdated(_)) => "printer-info-updated",
        PrinterEvent::Telemetry(TelemetryEvent::MachineStateChanged { .. }) => {
            "machine-state-changed"
        }
        PrinterEvent::Telemetry(TelemetryEvent::BedTemperatureChanged { .. }) => {
            "bed-temperature-changed"
        }
        PrinterEvent::Telemetry(TelemetryEvent::ExtruderTemperatureChanged { .. }) => {
            "extruder-temperature-changed"
        }
        PrinterEvent::Command(CommandEvent::Executed { .. }) => "command-executed",
        PrinterEvent::Command(CommandEvent::Failed { .. }) => "command-failed",
        PrinterEvent::Command(CommandEvent::Blocked { .. }) => "command-blocked",
        PrinterEvent::Upload(UploadEvent::Started { .. }) => "upload-started",
        PrinterEvent::Upload(UploadEvent::Completed { .. }) => "upload-completed",
        PrinterEvent::Upload(UploadEvent::Failed { .. }) => "upload-failed",
        PrinterEvent::Upload(UploadEvent::LockReleased) => "upload-lock-released",
        PrinterEvent::File(FileEvent::FilesListed { .. }) => "files-listed",
        PrinterEvent::File(FileEvent::ThumbnailRetrieved { .. }) => "thumbnail-retrieved",
        PrinterEvent::Error(_) => "error",
    }
}

/// Records every event published on a bus.
#[derive(Clone)]
pub struct EventLog {
    events: Arc<Mutex<Vec<PrinterEvent>>>,
}

impl EventLog {
    pub fn attach(bus: &EventBus) -> Self {
        let events: Arc<Mutex<Vec<PrinterEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        bus.subscribe(EventFilter::All, move |event| {
            sink.lock().push(event);
        });
        Self { events }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(event_name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|n| **n == name).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn snapshot(&self) -> Vec<PrinterEvent> {
        self.events.lock().clone()
    }
}

/// Poll until `predicate` holds, panicking after two seconds.
pub async fn wait_for(predicate: impl Fn() -> bool, what: &str) {
    for _ in 0..200 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

fn scripted_failure(method: &str) -> Error {
    forgekit_core::TransportError::Io {
        reason: format!("scripted failure in {}", method),
    }
    .into()
}

/// Scripted legacy client: records calls, can latch uploads open, and
/// can be told to fail specific methods.
pub struct MockLegacyClient {
    pub calls: Mutex<Vec<String>>,
    pub files: Mutex<Vec<String>>,
    pub thumbnails: Mutex<HashMap<String, Vec<u8>>>,
    failing: Mutex<HashSet<String>>,
    hold_uploads: AtomicBool,
    upload_release: Notify,
    pub status: Mutex<LegacyStatusInfo>,
    pub temps: Mutex<LegacyTempInfo>,
}

impl Default for MockLegacyClient {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            files: Mutex::new(Vec::new()),
            thumbnails: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            hold_uploads: AtomicBool::new(false),
            upload_release: Notify::new(),
            status: Mutex::new(LegacyStatusInfo {
                machine_status: LegacyMachineStatus::Ready,
                move_mode: LegacyMoveMode::Ready,
                endstops: EndstopState::default(),
                led_on: false,
                current_file: None,
            }),
            temps: Mutex::new(LegacyTempInfo {
                extruder: Temperature::new(24.0, 0.0),
                bed: Temperature::new(23.0, 0.0),
            }),
        }
    }
}

impl MockLegacyClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make uploads wait for `release_upload`.
    pub fn hold_uploads(&self) {
        self.hold_uploads.store(true, Ordering::SeqCst);
    }

    /// Let one held upload finish.
    pub fn release_upload(&self) {
        self.upload_release.notify_one();
    }

    /// Make `method` fail from now on.
    pub fn fail_on(&self, method: &str) {
        self.failing.lock().insert(method.to_string());
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == name).count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn check(&self, method: &str) -> Result<()> {
        if self.failing.lock().contains(method) {
            Err(scripted_failure(method))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LegacyClient for MockLegacyClient {
    async fn init_control(&self) -> Result<()> {
        self.record("init_control");
        // Yield once so overlapping connects genuinely interleave
        tokio::task::yield_now().await;
        self.check("init_control")
    }

    async fn home_axes(&self) -> Result<()> {
        self.record("home_axes");
        self.check("home_axes")
    }

    async fn led_on(&self) -> Result<()> {
        self.record("led_on");
        self.check("led_on")
    }

    async fn led_off(&self) -> Result<()> {
        self.record("led_off");
        self.check("led_off")
    }

    async fn set_bed_temperature(&self, celsius: u32) -> Result<()> {
        self.record(format!("set_bed_temperature:{}", celsius));
        self.check("set_bed_temperature")
    }

    async fn cancel_bed_temperature(&self) -> Result<()> {
        self.record("cancel_bed_temperature");
        self.check("cancel_bed_temperature")
    }

    async fn set_extruder_temperature(&self, celsius: u32) -> Result<()> {
        self.record(format!("set_extruder_temperature:{}", celsius));
        self.check("set_extruder_temperature")
    }

    async fn cancel_extruder_temperature(&self) -> Result<()> {
        self.record("cancel_extruder_temperature");
        self.check("cancel_extruder_temperature")
    }

    async fn pause_job(&self) -> Result<()> {
        self.record("pause_job");
        self.check("pause_job")
    }

    async fn resume_job(&self) -> Result<()> {
        self.record("resume_job");
        self.check("resume_job")
    }

    async fn cancel_job(&self) -> Result<()> {
        self.record("cancel_job");
        self.check("cancel_job")
    }

    async fn start_local_job(&self, file_name: &str) -> Result<()> {
        self.record(format!("start_local_job:{}", file_name));
        self.check("start_local_job")
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        self.record("list_files");
        self.check("list_files")?;
        Ok(self.files.lock().clone())
    }

    async fn get_printer_info(&self) -> Result<LegacyMachineInfo> {
        self.record("get_printer_info");
        self.check("get_printer_info")?;
        Ok(LegacyMachineInfo {
            machine_type: "Flashforge Adventurer 4".to_string(),
            name: "Mock AD4".to_string(),
            firmware_version: "v2.2.5".to_string(),
            serial_number: "MOCKSN".to_string(),
            tool_count: 1,
            mac_address: "88:A9:A7:00:00:01".to_string(),
        })
    }

    async fn get_temp_info(&self) -> Result<LegacyTempInfo> {
        self.record("get_temp_info");
        self.check("get_temp_info")?;
        Ok(*self.temps.lock())
    }

    async fn get_print_status(&self) -> Result<JobProgress> {
        self.record("get_print_status");
        self.check("get_print_status")?;
        Ok(JobProgress::default())
    }

    async fn get_endstop_info(&self) -> Result<LegacyStatusInfo> {
        self.record("get_endstop_info");
        self.check("get_endstop_info")?;
        Ok(self.status.lock().clone())
    }

    async fn get_thumbnail(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        self.record(format!("get_thumbnail:{}", file_name));
        self.check("get_thumbnail")?;
        Ok(self.thumbnails.lock().get(file_name).cloned())
    }

    async fn send_raw(&self, command: &str) -> Result<String> {
        self.record(format!("send_raw:{}", command));
        self.check("send_raw")?;
        Ok(format!("CMD {} Received.\r\nok\r\n", command))
    }

    async fn upload_file(&self, request: &UploadRequest) -> Result<()> {
        self.record(format!("upload_file:start:{}", request.file_name()));
        if self.hold_uploads.load(Ordering::SeqCst) {
            self.upload_release.notified().await;
        }
        let result = self.check("upload_file");
        self.record(format!("upload_file:end:{}", request.file_name()));
        result
    }
}

/// Scripted modern client: one instance behind all five sub-client
/// handles, recording calls with their channel prefix.
pub struct MockModernClient {
    pub calls: Mutex<Vec<String>>,
    pub detail: Mutex<PrinterInfo>,
    pub local_files: Mutex<Vec<String>>,
    pub recent_files: Mutex<Vec<String>>,
    pub thumbnails: Mutex<HashMap<String, Vec<u8>>>,
    failing: Mutex<HashSet<String>>,
    hold_uploads: AtomicBool,
    upload_release: Notify,
}

impl Default for MockModernClient {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            detail: Mutex::new(idle_modern_info()),
            local_files: Mutex::new(Vec::new()),
            recent_files: Mutex::new(Vec::new()),
            thumbnails: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            hold_uploads: AtomicBool::new(false),
            upload_release: Notify::new(),
        }
    }
}

pub fn idle_modern_info() -> PrinterInfo {
    PrinterInfo {
        name: "Mock 5M".to_string(),
        firmware_version: "3.1.3".to_string(),
        serial_number: "MOCK5M".to_string(),
        model: "Adventurer 5M".to_string(),
        machine_state: MachineState::Ready,
        status_text: "ready".to_string(),
        bed_temperature: Temperature::new(23.0, 0.0),
        extruder_temperature: Temperature::new(24.0, 0.0),
        progress: None,
        current_file: None,
        led_on: Some(false),
        endstops: None,
        material_station: None,
    }
}

impl MockModernClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn handle(self: &Arc<Self>) -> ModernHandle {
        ModernHandle {
            control: self.clone(),
            temp_control: self.clone(),
            job_control: self.clone(),
            files: self.clone(),
            tcp: self.clone(),
        }
    }

    pub fn hold_uploads(&self) {
        self.hold_uploads.store(true, Ordering::SeqCst);
    }

    pub fn release_upload(&self) {
        self.upload_release.notify_one();
    }

    pub fn fail_on(&self, method: &str) {
        self.failing.lock().insert(method.to_string());
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == name).count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn check(&self, method: &str) -> Result<()> {
        if self.failing.lock().contains(method) {
            Err(scripted_failure(method))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ControlApi for MockModernClient {
    async fn initialize(&self) -> Result<()> {
        self.record("control.initialize");
        // Yield once so overlapping connects genuinely interleave
        tokio::task::yield_now().await;
        self.check("initialize")
    }

    async fn init_control(&self) -> Result<()> {
        self.record("control.init_control");
        self.check("init_control")
    }

    async fn machine_detail(&self) -> Result<PrinterInfo> {
        self.record("control.machine_detail");
        self.check("machine_detail")?;
        Ok(self.detail.lock().clone())
    }

    async fn home_axes(&self) -> Result<()> {
        self.record("control.home_axes");
        self.check("home_axes")
    }

    async fn set_led(&self, on: bool) -> Result<()> {
        self.record(format!("control.set_led:{}", on));
        self.check("set_led")
    }

    async fn set_filtration(&self, external: bool, internal: bool) -> Result<()> {
        self.record(format!("control.set_filtration:{}:{}", external, internal));
        self.check("set_filtration")
    }

    async fn clear_platform(&self) -> Result<()> {
        self.record("control.clear_platform");
        self.check("clear_platform")
    }
}

#[async_trait]
impl TempControlApi for MockModernClient {
    async fn set_bed_temperature(&self, celsius: u32) -> Result<()> {
        self.record(format!("temp_control.set_bed_temperature:{}", celsius));
        self.check("set_bed_temperature")
    }

    async fn cancel_bed_temperature(&self) -> Result<()> {
        self.record("temp_control.cancel_bed_temperature");
        self.check("cancel_bed_temperature")
    }

    async fn set_extruder_temperature(&self, celsius: u32) -> Result<()> {
        self.record(format!("temp_control.set_extruder_temperature:{}", celsius));
        self.check("set_extruder_temperature")
    }

    async fn cancel_extruder_temperature(&self) -> Result<()> {
        self.record("temp_control.cancel_extruder_temperature");
        self.check("cancel_extruder_temperature")
    }
}

#[async_trait]
impl JobControlApi for MockModernClient {
    async fn pause_job(&self) -> Result<()> {
        self.record("job_control.pause_job");
        self.check("pause_job")
    }

    async fn resume_job(&self) -> Result<()> {
        self.record("job_control.resume_job");
        self.check("resume_job")
    }

    async fn cancel_job(&self) -> Result<()> {
        self.record("job_control.cancel_job");
        self.check("cancel_job")
    }

    async fn start_local_job(&self, file_name: &str) -> Result<()> {
        self.record(format!("job_control.start_local_job:{}", file_name));
        self.check("start_local_job")
    }
}

#[async_trait]
impl FilesApi for MockModernClient {
    async fn list_local_files(&self) -> Result<Vec<String>> {
        self.record("files.list_local_files");
        self.check("list_local_files")?;
        Ok(self.local_files.lock().clone())
    }

    async fn list_recent_files(&self, limit: usize) -> Result<Vec<String>> {
        self.record(format!("files.list_recent_files:{}", limit));
        self.check("list_recent_files")?;
        let mut files = self.recent_files.lock().clone();
        files.truncate(limit);
        Ok(files)
    }

    async fn get_thumbnail(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        self.record(format!("files.get_thumbnail:{}", file_name));
        self.check("get_thumbnail")?;
        Ok(self.thumbnails.lock().get(file_name).cloned())
    }

    async fn upload_file(&self, request: &UploadRequest) -> Result<()> {
        self.record(format!("files.upload_file:start:{}", request.file_name()));
        if self.hold_uploads.load(Ordering::SeqCst) {
            self.upload_release.notified().await;
        }
        let result = self.check("upload_file");
        self.record(format!("files.upload_file:end:{}", request.file_name()));
        result
    }
}

#[async_trait]
impl RawTcpApi for MockModernClient {
    async fn led_on(&self) -> Result<()> {
        self.record("tcp.led_on");
        self.check("tcp.led_on")
    }

    async fn led_off(&self) -> Result<()> {
        self.record("tcp.led_off");
        self.check("tcp.led_off")
    }

    async fn send_raw(&self, command: &str) -> Result<String> {
        self.record(format!("tcp.send_raw:{}", command));
        self.check("tcp.send_raw")?;
        Ok("ok".to_string())
    }
}

/// Factory handing out preset mock clients and counting constructions.
#[derive(Default)]
pub struct MockFactory {
    pub legacy: Mutex<Option<Arc<MockLegacyClient>>>,
    pub modern: Mutex<Option<Arc<MockModernClient>>>,
    pub legacy_creates: AtomicUsize,
    pub modern_creates: AtomicUsize,
}

impl MockFactory {
    pub fn with_legacy(client: Arc<MockLegacyClient>) -> Arc<Self> {
        let factory = Self::default();
        *factory.legacy.lock() = Some(client);
        Arc::new(factory)
    }

    pub fn with_modern(client: Arc<MockModernClient>) -> Arc<Self> {
        let factory = Self::default();
        *factory.modern.lock() = Some(client);
        Arc::new(factory)
    }

    pub fn with_both(legacy: Arc<MockLegacyClient>, modern: Arc<MockModernClient>) -> Arc<Self> {
        let factory = Self::default();
        *factory.legacy.lock() = Some(legacy);
        *factory.modern.lock() = Some(modern);
        Arc::new(factory)
    }
}

impl ClientFactory for MockFactory {
    fn create_legacy(&self, _options: &TransportOptions) -> Result<Arc<dyn LegacyClient>> {
        self.legacy_creates.fetch_add(1, Ordering::SeqCst);
        let client = self
            .legacy
            .lock()
            .clone()
            .expect("no mock legacy client configured");
        Ok(client)
    }

    fn create_modern(&self, _options: &TransportOptions) -> Result<ModernHandle> {
        self.modern_creates.fetch_add(1, Ordering::SeqCst);
        let client = self
            .modern
            .lock()
            .clone()
            .expect("no mock modern client configured");
        Ok(client.handle())
    }
}
