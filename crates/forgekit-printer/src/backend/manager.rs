//! The backend lifecycle manager.
//!
//! Owns the one live backend: selects the strategy from the detected
//! model, serializes (re)initialization so concurrent attempts collapse
//! onto a single in-flight connect, and degrades every feature call to a
//! structured failure when no backend is active — callers render a
//! consistent disconnected state without exception handling.

use forgekit_core::{MaterialStationStatus, PrinterInfo, PrinterModel, Result, UploadRequest};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::{
    Ad5xBackend, Adventurer5MBackend, Adventurer5MProBackend, GenericLegacyBackend, PrinterBackend,
};
use crate::adapter::{ConnectOptions, PrinterClientAdapter, SettingsSource};
use crate::capabilities::PrinterFeatureSet;
use crate::detect::detect_model;
use crate::transport::ClientFactory;
use forgekit_core::EventBus;

/// Pause between disposing one backend and constructing the next.
///
/// The previous client's background keep-alive timers are not guaranteed
/// to have stopped the instant `dispose` returns; connecting too early
/// can receive stale keep-alive traffic. Fixed, not configurable.
pub const BACKEND_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Parameters for one backend initialization.
#[derive(Debug, Clone)]
pub struct BackendInitOptions {
    /// Printer IP address or hostname.
    pub ip: String,
    /// Printer serial number.
    pub serial_number: String,
    /// Display name.
    pub name: String,
    /// Check code for the modern handshake.
    pub check_code: Option<String>,
    /// Model string the printer reported during discovery.
    pub reported_model: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl BackendInitOptions {
    /// Options with the default timeout.
    pub fn new(
        ip: impl Into<String>,
        serial_number: impl Into<String>,
        name: impl Into<String>,
        reported_model: impl Into<String>,
    ) -> Self {
        Self {
            ip: ip.into(),
            serial_number: serial_number.into(),
            name: name.into(),
            check_code: None,
            reported_model: reported_model.into(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Set the check code.
    pub fn with_check_code(mut self, check_code: impl Into<String>) -> Self {
        self.check_code = Some(check_code.into());
        self
    }
}

/// Outcome of a backend initialization. Concurrent callers of
/// [`BackendManager::initialize_backend`] receive clones of the same
/// outcome.
#[derive(Debug, Clone, Serialize)]
pub struct InitOutcome {
    /// Whether a backend is now live.
    pub success: bool,
    /// The model the strategy was selected for.
    pub model: Option<PrinterModel>,
    /// The failure cause, when unsuccessful.
    pub error: Option<String>,
}

impl InitOutcome {
    fn ok(model: PrinterModel) -> Self {
        Self {
            success: true,
            model: Some(model),
            error: None,
        }
    }

    fn failed(model: Option<PrinterModel>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            model,
            error: Some(error.into()),
        }
    }
}

/// Status of the live backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    /// Model the strategy was selected for.
    pub model: PrinterModel,
    /// Printer display name.
    pub printer_name: String,
    /// Printer serial number.
    pub serial_number: String,
    /// Static feature descriptor.
    pub features: PrinterFeatureSet,
}

/// Structured result shape for feature-facing calls.
///
/// Never a panic, never an exception: with no backend active every call
/// answers `{ success: false, error: "No backend initialized" }`.
#[derive(Debug, Clone, Serialize)]
pub struct BackendResponse<T> {
    /// Whether the call succeeded.
    pub success: bool,
    /// The payload, on success.
    pub data: Option<T>,
    /// The failure description, on failure.
    pub error: Option<String>,
}

impl<T> BackendResponse<T> {
    /// A successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed response.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// The degraded response used when no backend is live.
    pub fn no_backend() -> Self {
        Self::failure("No backend initialized")
    }

    fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

struct ActiveBackend {
    backend: Arc<dyn PrinterBackend>,
    status: BackendStatus,
}

type SharedInit = Shared<BoxFuture<'static, InitOutcome>>;

/// Lifecycle coordinator guaranteeing at most one live backend.
pub struct BackendManager {
    factory: Arc<dyn ClientFactory>,
    settings: Arc<dyn SettingsSource>,
    bus: Arc<EventBus>,
    active: RwLock<Option<ActiveBackend>>,
    /// The in-flight initialization, shared by concurrent callers.
    in_flight: Mutex<Option<SharedInit>>,
}

impl BackendManager {
    /// Create a manager with no live backend.
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        settings: Arc<dyn SettingsSource>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            factory,
            settings,
            bus,
            active: RwLock::new(None),
            in_flight: Mutex::new(None),
        }
    }

    /// Initialize (or reinitialize) the backend.
    ///
    /// Single-flight: if an initialization is already running, this call
    /// awaits that same attempt and receives its outcome instead of
    /// starting a second connect/disconnect cycle — otherwise racing
    /// connection events could leave two adapters alive against the same
    /// printer.
    pub async fn initialize_backend(self: &Arc<Self>, options: BackendInitOptions) -> InitOutcome {
        let shared = {
            let mut in_flight = self.in_flight.lock();
            if let Some(existing) = in_flight.as_ref() {
                tracing::debug!("joining the in-flight backend initialization");
                existing.clone()
            } else {
                let manager = self.clone();
                let future: BoxFuture<'static, InitOutcome> = async move {
                    let outcome = manager.do_initialize(options).await;
                    // Clear before completing so the next call starts fresh
                    *manager.in_flight.lock() = None;
                    outcome
                }
                .boxed();
                let shared = future.shared();
                *in_flight = Some(shared.clone());
                shared
            }
        };
        shared.await
    }

    async fn do_initialize(&self, options: BackendInitOptions) -> InitOutcome {
        // Tear down any previous backend before touching the printer again
        let had_previous = {
            let mut active = self.active.write();
            match active.take() {
                Some(previous) => {
                    previous.backend.dispose();
                    true
                }
                None => false,
            }
        };
        if had_previous {
            tracing::debug!(
                "waiting {:?} for the previous client to quiesce",
                BACKEND_SETTLE_DELAY
            );
            tokio::time::sleep(BACKEND_SETTLE_DELAY).await;
        }

        let model = detect_model(&options.reported_model, self.settings.force_legacy_api());
        tracing::info!("initializing backend for {} as {}", options.name, model);

        let adapter = Arc::new(PrinterClientAdapter::new(
            self.factory.clone(),
            self.settings.clone(),
            self.bus.clone(),
        ));

        let mut connect_options =
            ConnectOptions::new(options.ip, options.serial_number.clone(), options.name.clone());
        connect_options.check_code = options.check_code;
        connect_options.legacy_mode = !model.is_modern();
        connect_options.timeout = options.timeout;

        if !adapter.connect(connect_options).await {
            return InitOutcome::failed(Some(model), "connection failed");
        }

        let backend: Arc<dyn PrinterBackend> = match model {
            PrinterModel::GenericLegacy => Arc::new(GenericLegacyBackend::new(adapter)),
            PrinterModel::Adventurer5M => Arc::new(Adventurer5MBackend::new(adapter)),
            PrinterModel::Adventurer5MPro => Arc::new(Adventurer5MProBackend::new(adapter)),
            PrinterModel::Ad5x => Arc::new(Ad5xBackend::new(adapter)),
        };
        let status = BackendStatus {
            model,
            printer_name: options.name,
            serial_number: options.serial_number,
            features: *backend.features(),
        };
        *self.active.write() = Some(ActiveBackend { backend, status });
        InitOutcome::ok(model)
    }

    /// The live backend, if one is active.
    pub fn backend(&self) -> Option<Arc<dyn PrinterBackend>> {
        self.active.read().as_ref().map(|a| a.backend.clone())
    }

    /// Status of the live backend.
    pub fn status(&self) -> Option<BackendStatus> {
        self.active.read().as_ref().map(|a| a.status.clone())
    }

    /// Whether a backend is live.
    pub fn is_initialized(&self) -> bool {
        self.active.read().is_some()
    }

    /// Dispose the live backend, if any. Idempotent.
    pub fn dispose(&self) {
        if let Some(active) = self.active.write().take() {
            active.backend.dispose();
        }
    }

    // Feature-facing surface. Every method degrades to a structured
    // failure when no backend is active.

    /// Raw G-code passthrough.
    pub async fn execute_gcode_command(&self, command: &str) -> BackendResponse<String> {
        let Some(backend) = self.backend() else {
            return BackendResponse::no_backend();
        };
        BackendResponse::from_result(backend.execute_gcode(command).await)
    }

    /// Current telemetry snapshot.
    pub async fn printer_status(&self) -> BackendResponse<PrinterInfo> {
        let Some(backend) = self.backend() else {
            return BackendResponse::no_backend();
        };
        BackendResponse::from_result(backend.printer_status().await)
    }

    /// Start printing a stored file.
    pub async fn start_job(&self, file_name: &str) -> BackendResponse<()> {
        let Some(backend) = self.backend() else {
            return BackendResponse::no_backend();
        };
        BackendResponse::from_result(backend.start_job(file_name).await)
    }

    /// Pause the running job.
    pub async fn pause_job(&self) -> BackendResponse<()> {
        let Some(backend) = self.backend() else {
            return BackendResponse::no_backend();
        };
        BackendResponse::from_result(backend.pause_job().await)
    }

    /// Resume a paused job.
    pub async fn resume_job(&self) -> BackendResponse<()> {
        let Some(backend) = self.backend() else {
            return BackendResponse::no_backend();
        };
        BackendResponse::from_result(backend.resume_job().await)
    }

    /// Cancel the running job.
    pub async fn cancel_job(&self) -> BackendResponse<()> {
        let Some(backend) = self.backend() else {
            return BackendResponse::no_backend();
        };
        BackendResponse::from_result(backend.cancel_job().await)
    }

    /// List files on printer storage.
    pub async fn list_local_files(&self) -> BackendResponse<Vec<String>> {
        let Some(backend) = self.backend() else {
            return BackendResponse::no_backend();
        };
        BackendResponse::from_result(backend.list_local_files().await)
    }

    /// List recently printed files.
    pub async fn list_recent_files(&self) -> BackendResponse<Vec<String>> {
        let Some(backend) = self.backend() else {
            return BackendResponse::no_backend();
        };
        BackendResponse::from_result(backend.list_recent_files().await)
    }

    /// Thumbnail for a stored file.
    pub async fn thumbnail(&self, file_name: &str) -> BackendResponse<Option<Vec<u8>>> {
        let Some(backend) = self.backend() else {
            return BackendResponse::no_backend();
        };
        BackendResponse::from_result(backend.thumbnail(file_name).await)
    }

    /// Material station snapshot.
    pub async fn material_station_status(&self) -> BackendResponse<MaterialStationStatus> {
        let Some(backend) = self.backend() else {
            return BackendResponse::no_backend();
        };
        BackendResponse::from_result(backend.material_station_status().await)
    }

    /// Transfer a job file.
    pub async fn upload_job(&self, request: UploadRequest) -> BackendResponse<()> {
        let Some(backend) = self.backend() else {
            return BackendResponse::no_backend();
        };
        BackendResponse::from_result(backend.upload_job(request).await)
    }
}
