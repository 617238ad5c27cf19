//! Per-model backend strategies.
//!
//! A backend wraps the adapter with a model-appropriate feature surface:
//! the AD5X backend adds material-station upload, the 5M Pro backend has
//! working filtration, the legacy backend refuses everything its
//! protocol generation cannot do. Feature refusals are decided from the
//! static [`PrinterFeatureSet`] before any network traffic.
//!
//! [`BackendManager`] owns strategy selection and guarantees at most one
//! backend is live at a time.

mod manager;
mod strategies;

pub use manager::{
    BackendInitOptions, BackendManager, BackendResponse, BackendStatus, InitOutcome,
    BACKEND_SETTLE_DELAY,
};
pub use strategies::{
    Ad5xBackend, Adventurer5MBackend, Adventurer5MProBackend, GenericLegacyBackend,
};

use async_trait::async_trait;
use forgekit_core::{
    BackendError, CommandError, Error, MaterialStationStatus, PrinterInfo, PrinterModel, Result,
    UploadRequest,
};
use std::sync::Arc;

use crate::adapter::{CommandDisposition, PrinterClientAdapter};
use crate::capabilities::PrinterFeatureSet;
use crate::commands::{Command, CommandOutput};
use crate::mapping::command_spec;

/// Shared state every strategy wraps: the adapter plus the model's
/// static feature descriptor.
pub struct BackendContext {
    adapter: Arc<PrinterClientAdapter>,
    model: PrinterModel,
    features: PrinterFeatureSet,
}

impl BackendContext {
    /// Build a context for a model, deriving its feature set.
    pub fn new(adapter: Arc<PrinterClientAdapter>, model: PrinterModel) -> Self {
        Self {
            adapter,
            model,
            features: PrinterFeatureSet::for_model(model),
        }
    }

    /// Dispatch a command through the adapter's gated path, converting
    /// the disposition into a `Result`. The detailed cause has already
    /// been reported on the bus by the adapter.
    pub async fn dispatch(&self, command: Command) -> Result<CommandOutput> {
        let name = command.name().to_string();
        match self.adapter.execute_command_with_handling(&command).await {
            CommandDisposition::Executed(output) => Ok(output),
            CommandDisposition::Blocked => Err(CommandError::Blocked { command: name }.into()),
            CommandDisposition::Unsupported => {
                let message = command_spec(command.kind())
                    .and_then(|spec| spec.unsupported_message)
                    .unwrap_or("Operation not supported by this printer");
                Err(CommandError::Unsupported {
                    command: name,
                    message: message.to_string(),
                }
                .into())
            }
            CommandDisposition::Failed => Err(Error::other(format!("{} failed", name))),
        }
    }
}

fn feature_unavailable(feature: &str) -> Error {
    BackendError::FeatureUnavailable {
        feature: feature.to_string(),
    }
    .into()
}

/// The model-appropriate feature surface over one adapter.
///
/// Default implementations cover the surface shared by every model;
/// strategies override where their hardware differs.
#[async_trait]
pub trait PrinterBackend: Send + Sync {
    /// The strategy's shared context.
    fn context(&self) -> &BackendContext;

    /// Printer model this strategy serves.
    fn model(&self) -> PrinterModel {
        self.context().model
    }

    /// Static feature descriptor.
    fn features(&self) -> &PrinterFeatureSet {
        &self.context().features
    }

    /// The wrapped adapter.
    fn adapter(&self) -> &Arc<PrinterClientAdapter> {
        &self.context().adapter
    }

    /// Raw G-code passthrough. The reply is empty when the printer
    /// refused or the transport failed; details are on the bus.
    async fn execute_gcode(&self, command: &str) -> Result<String> {
        Ok(self.adapter().send_raw_cmd(command).await)
    }

    /// Current telemetry snapshot.
    async fn printer_status(&self) -> Result<PrinterInfo> {
        self.adapter()
            .printer_info()
            .await
            .ok_or_else(|| Error::other("telemetry unavailable"))
    }

    /// Home all axes.
    async fn home_axes(&self) -> Result<()> {
        self.context().dispatch(Command::HomeAxes).await.map(|_| ())
    }

    /// Switch the chamber LED.
    async fn set_led(&self, on: bool) -> Result<()> {
        if !self.features().led_control {
            return Err(feature_unavailable("LED control"));
        }
        let command = if on { Command::LedOn } else { Command::LedOff };
        self.context().dispatch(command).await.map(|_| ())
    }

    /// Set or cancel the bed target temperature.
    async fn set_bed_temperature(&self, celsius: Option<u32>) -> Result<()> {
        let command = match celsius {
            Some(celsius) => Command::SetBedTemperature { celsius },
            None => Command::CancelBedTemperature,
        };
        self.context().dispatch(command).await.map(|_| ())
    }

    /// Set or cancel the extruder target temperature.
    async fn set_extruder_temperature(&self, celsius: Option<u32>) -> Result<()> {
        let command = match celsius {
            Some(celsius) => Command::SetExtruderTemperature { celsius },
            None => Command::CancelExtruderTemperature,
        };
        self.context().dispatch(command).await.map(|_| ())
    }

    /// Start printing a file already on printer storage.
    async fn start_job(&self, file_name: &str) -> Result<()> {
        self.context()
            .dispatch(Command::StartJob {
                file_name: file_name.to_string(),
            })
            .await
            .map(|_| ())
    }

    /// Pause the running job.
    async fn pause_job(&self) -> Result<()> {
        if !self.features().pause_resume {
            return Err(feature_unavailable("pause/resume"));
        }
        self.context().dispatch(Command::PauseJob).await.map(|_| ())
    }

    /// Resume a paused job.
    async fn resume_job(&self) -> Result<()> {
        if !self.features().pause_resume {
            return Err(feature_unavailable("pause/resume"));
        }
        self.context().dispatch(Command::ResumeJob).await.map(|_| ())
    }

    /// Cancel the running job.
    async fn cancel_job(&self) -> Result<()> {
        if !self.features().cancel_job {
            return Err(feature_unavailable("cancel"));
        }
        self.context().dispatch(Command::CancelJob).await.map(|_| ())
    }

    /// Advance the belt/clear the platform.
    async fn clear_platform(&self) -> Result<()> {
        if !self.features().clear_platform {
            return Err(feature_unavailable("clear platform"));
        }
        self.context()
            .dispatch(Command::ClearPlatform)
            .await
            .map(|_| ())
    }

    /// Drive the enclosure filtration fans.
    async fn set_filtration(&self, external: bool, internal: bool) -> Result<()> {
        if !self.features().filtration {
            return Err(feature_unavailable("filtration"));
        }
        let command = match (external, internal) {
            (true, _) => Command::SetExternalFiltrationOn,
            (false, true) => Command::SetInternalFiltrationOn,
            (false, false) => Command::SetFiltrationOff,
        };
        self.context().dispatch(command).await.map(|_| ())
    }

    /// List files on printer storage.
    async fn list_local_files(&self) -> Result<Vec<String>> {
        let output = self.context().dispatch(Command::ListLocalFiles).await?;
        Ok(output.into_files().unwrap_or_default())
    }

    /// List recently printed files.
    async fn list_recent_files(&self) -> Result<Vec<String>> {
        let output = self.context().dispatch(Command::ListRecentFiles).await?;
        Ok(output.into_files().unwrap_or_default())
    }

    /// Thumbnail for a stored file.
    async fn thumbnail(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.adapter().thumbnail(file_name).await)
    }

    /// Transfer a job file.
    ///
    /// The base implementation refuses material mappings; the AD5X
    /// strategy overrides it.
    async fn upload_job(&self, request: UploadRequest) -> Result<()> {
        if request.materials.is_some() {
            return Err(feature_unavailable("material station"));
        }
        let uploaded = self
            .adapter()
            .upload_file(&request.file_path, request.start_now, request.auto_level)
            .await;
        if uploaded {
            Ok(())
        } else {
            Err(Error::other("upload failed"))
        }
    }

    /// Material station snapshot.
    async fn material_station_status(&self) -> Result<MaterialStationStatus> {
        Err(feature_unavailable("material station"))
    }

    /// MJPEG camera stream URL, for models with a camera. Pure string
    /// construction; no network traffic.
    fn camera_stream_url(&self) -> Option<String> {
        if !self.features().camera {
            return None;
        }
        let identity = self.adapter().identity()?;
        Some(format!("http://{}:8080/?action=stream", identity.ip))
    }

    /// Release the adapter and its client.
    fn dispose(&self) {
        self.adapter().dispose();
    }
}
