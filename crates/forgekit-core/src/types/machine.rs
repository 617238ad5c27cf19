//! Machine state, temperatures, and the normalized telemetry snapshot.

use serde::{Deserialize, Serialize};

use super::{JobProgress, MaterialStationStatus};

/// Normalized machine state shared by both protocol generations.
///
/// The modern API reports these directly; legacy status/move-mode code
/// pairs are folded into them via [`MachineState::from_legacy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    /// Idle and ready for commands.
    Ready,
    /// Occupied with something other than printing (heating, tool change).
    Busy,
    /// Actively printing.
    Printing,
    /// Running a homing cycle.
    Homing,
    /// Print paused.
    Paused,
    /// Print finished.
    Completed,
    /// Print cancelled.
    Cancelled,
    /// A file upload holds the connection; telemetry is synthetic.
    Uploading,
    /// The printer reported an error state.
    Error,
    /// Unrecognized state report.
    Unknown,
}

impl MachineState {
    /// Map a modern API status token to the normalized state.
    pub fn from_modern_report(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "ready" => MachineState::Ready,
            "printing" => MachineState::Printing,
            "pausing" | "paused" => MachineState::Paused,
            "completed" => MachineState::Completed,
            "cancel" | "cancelled" => MachineState::Cancelled,
            "homing" => MachineState::Homing,
            "error" => MachineState::Error,
            "busy" | "heating" | "calibrate_doing" => MachineState::Busy,
            other => {
                tracing::debug!("Unrecognized modern status '{}'", other);
                MachineState::Unknown
            }
        }
    }

    /// Fold a legacy status/move-mode pair into the normalized state.
    ///
    /// `BUILDING_FROM_SD` is subdivided by move mode: a homing move is
    /// surfaced as `Homing`, motion counts as `Printing`, anything else
    /// as `Busy`.
    pub fn from_legacy(status: LegacyMachineStatus, move_mode: LegacyMoveMode) -> Self {
        match status {
            LegacyMachineStatus::BuildingFromSd => match move_mode {
                LegacyMoveMode::Homing => MachineState::Homing,
                LegacyMoveMode::Moving | LegacyMoveMode::Ready => MachineState::Printing,
                _ => MachineState::Busy,
            },
            LegacyMachineStatus::BuildingCompleted => MachineState::Completed,
            LegacyMachineStatus::Paused => MachineState::Paused,
            LegacyMachineStatus::Busy => MachineState::Busy,
            LegacyMachineStatus::Ready => MachineState::Ready,
            LegacyMachineStatus::Unknown => MachineState::Unknown,
        }
    }
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::Busy => write!(f, "Busy"),
            Self::Printing => write!(f, "Printing"),
            Self::Homing => write!(f, "Homing"),
            Self::Paused => write!(f, "Paused"),
            Self::Completed => write!(f, "Completed"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Uploading => write!(f, "Uploading File"),
            Self::Error => write!(f, "Error"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Machine status token from a legacy `~M119` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyMachineStatus {
    /// `BUILDING_FROM_SD` — a job from printer storage is in progress.
    BuildingFromSd,
    /// `BUILDING_COMPLETED` — the last job finished.
    BuildingCompleted,
    /// `PAUSED`
    Paused,
    /// `READY`
    Ready,
    /// `BUSY`
    Busy,
    /// Anything else.
    Unknown,
}

impl LegacyMachineStatus {
    /// Parse the `MachineStatus` value from an `~M119` report.
    pub fn from_report(value: &str) -> Self {
        match value.trim() {
            "BUILDING_FROM_SD" => Self::BuildingFromSd,
            "BUILDING_COMPLETED" => Self::BuildingCompleted,
            "PAUSED" => Self::Paused,
            "READY" => Self::Ready,
            "BUSY" => Self::Busy,
            other => {
                tracing::debug!("Unrecognized legacy machine status '{}'", other);
                Self::Unknown
            }
        }
    }
}

/// Move mode token from a legacy `~M119` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyMoveMode {
    /// `HOMING`
    Homing,
    /// `MOVING`
    Moving,
    /// `READY`
    Ready,
    /// `PAUSED`
    Paused,
    /// `WAIT_ON_TOOL`
    WaitOnTool,
    /// Anything else.
    Unknown,
}

impl LegacyMoveMode {
    /// Parse the `MoveMode` value from an `~M119` report.
    pub fn from_report(value: &str) -> Self {
        match value.trim() {
            "HOMING" => Self::Homing,
            "MOVING" => Self::Moving,
            "READY" => Self::Ready,
            "PAUSED" => Self::Paused,
            "WAIT_ON_TOOL" => Self::WaitOnTool,
            other => {
                tracing::debug!("Unrecognized legacy move mode '{}'", other);
                Self::Unknown
            }
        }
    }
}

/// A current/target temperature pair in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Temperature {
    /// Measured temperature.
    pub current: f32,
    /// Commanded target, 0.0 when the heater is off.
    pub target: f32,
}

impl Temperature {
    /// Create a temperature pair
    pub fn new(current: f32, target: f32) -> Self {
        Self { current, target }
    }

    /// Whether the heater has a non-zero target.
    pub fn is_heating(&self) -> bool {
        self.target > 0.0
    }
}

/// Endstop switch states from a legacy `~M119` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EndstopState {
    /// X-max endstop triggered.
    pub x_max: bool,
    /// Y-max endstop triggered.
    pub y_max: bool,
    /// Z-min endstop triggered.
    pub z_min: bool,
}

/// Supported printer models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrinterModel {
    /// Any printer reachable only over the legacy M-code socket.
    #[default]
    GenericLegacy,
    /// Adventurer 5M.
    Adventurer5M,
    /// Adventurer 5M Pro (adds enclosure filtration).
    Adventurer5MPro,
    /// AD5X (adds the multi-filament material station).
    Ad5x,
}

impl PrinterModel {
    /// Whether this model speaks the modern multi-channel API.
    pub fn is_modern(&self) -> bool {
        !matches!(self, PrinterModel::GenericLegacy)
    }
}

impl std::fmt::Display for PrinterModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GenericLegacy => write!(f, "Generic (legacy API)"),
            Self::Adventurer5M => write!(f, "Adventurer 5M"),
            Self::Adventurer5MPro => write!(f, "Adventurer 5M Pro"),
            Self::Ad5x => write!(f, "AD5X"),
        }
    }
}

/// Normalized telemetry snapshot.
///
/// This is the shape the modern API returns natively and the shape the
/// adapter reassembles from the legacy four-call fan-out, so consumers
/// never branch on the protocol generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterInfo {
    /// Printer display name.
    pub name: String,
    /// Firmware version string.
    pub firmware_version: String,
    /// Serial number.
    pub serial_number: String,
    /// Reported model string.
    pub model: String,
    /// Normalized machine state.
    pub machine_state: MachineState,
    /// Human-readable state text.
    pub status_text: String,
    /// Print bed temperature.
    pub bed_temperature: Temperature,
    /// Extruder temperature.
    pub extruder_temperature: Temperature,
    /// Progress of the active job, if one is running.
    pub progress: Option<JobProgress>,
    /// File name of the active job.
    pub current_file: Option<String>,
    /// Chamber/enclosure LED state, if reported.
    pub led_on: Option<bool>,
    /// Endstop switch states (legacy reports only).
    pub endstops: Option<EndstopState>,
    /// Material station status (AD5X only).
    pub material_station: Option<MaterialStationStatus>,
}

impl PrinterInfo {
    /// Placeholder snapshot returned while a file upload holds the
    /// connection. Carries the stored identity but no live telemetry.
    pub fn uploading_placeholder(name: &str, serial_number: &str, model: &str) -> Self {
        Self {
            name: name.to_string(),
            firmware_version: String::new(),
            serial_number: serial_number.to_string(),
            model: model.to_string(),
            machine_state: MachineState::Uploading,
            status_text: MachineState::Uploading.to_string(),
            bed_temperature: Temperature::default(),
            extruder_temperature: Temperature::default(),
            progress: None,
            current_file: None,
            led_on: None,
            endstops: None,
            material_station: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_state_mapping() {
        use LegacyMachineStatus as S;
        use LegacyMoveMode as M;

        assert_eq!(
            MachineState::from_legacy(S::BuildingFromSd, M::Homing),
            MachineState::Homing
        );
        assert_eq!(
            MachineState::from_legacy(S::BuildingFromSd, M::Moving),
            MachineState::Printing
        );
        assert_eq!(
            MachineState::from_legacy(S::BuildingFromSd, M::Ready),
            MachineState::Printing
        );
        assert_eq!(
            MachineState::from_legacy(S::BuildingFromSd, M::WaitOnTool),
            MachineState::Busy
        );
        assert_eq!(
            MachineState::from_legacy(S::BuildingCompleted, M::Ready),
            MachineState::Completed
        );
        assert_eq!(MachineState::from_legacy(S::Paused, M::Paused), MachineState::Paused);
        assert_eq!(MachineState::from_legacy(S::Busy, M::Ready), MachineState::Busy);
        assert_eq!(MachineState::from_legacy(S::Ready, M::Ready), MachineState::Ready);
        assert_eq!(
            MachineState::from_legacy(S::Unknown, M::Unknown),
            MachineState::Unknown
        );
    }

    #[test]
    fn test_modern_state_mapping() {
        assert_eq!(MachineState::from_modern_report("ready"), MachineState::Ready);
        assert_eq!(MachineState::from_modern_report("Printing"), MachineState::Printing);
        assert_eq!(MachineState::from_modern_report("pausing"), MachineState::Paused);
        assert_eq!(MachineState::from_modern_report("cancel"), MachineState::Cancelled);
        assert_eq!(MachineState::from_modern_report("heating"), MachineState::Busy);
        assert_eq!(MachineState::from_modern_report("warp-drive"), MachineState::Unknown);
    }

    #[test]
    fn test_legacy_token_parsing() {
        assert_eq!(
            LegacyMachineStatus::from_report("BUILDING_FROM_SD"),
            LegacyMachineStatus::BuildingFromSd
        );
        assert_eq!(
            LegacyMachineStatus::from_report(" READY "),
            LegacyMachineStatus::Ready
        );
        assert_eq!(
            LegacyMachineStatus::from_report("SOMETHING_NEW"),
            LegacyMachineStatus::Unknown
        );
        assert_eq!(LegacyMoveMode::from_report("WAIT_ON_TOOL"), LegacyMoveMode::WaitOnTool);
        assert_eq!(LegacyMoveMode::from_report("???"), LegacyMoveMode::Unknown);
    }

    #[test]
    fn test_uploading_placeholder() {
        let info = PrinterInfo::uploading_placeholder("Garage 5M", "SN123", "Adventurer 5M");
        assert_eq!(info.machine_state, MachineState::Uploading);
        assert_eq!(info.status_text, "Uploading File");
        assert_eq!(info.name, "Garage 5M");
        assert!(info.progress.is_none());
    }

    #[test]
    fn test_info_serializes() {
        let info = PrinterInfo::uploading_placeholder("p", "s", "m");
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"Uploading\""));
    }
}
