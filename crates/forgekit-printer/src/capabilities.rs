//! Per-model feature descriptors.
//!
//! Answers "can this printer do X" from static model metadata, without
//! touching the network. Backends consult these to refuse feature calls
//! early; the UI consults them to hide controls.

use forgekit_core::PrinterModel;
use serde::{Deserialize, Serialize};

/// Capability booleans for one printer model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterFeatureSet {
    /// Has a built-in camera.
    pub camera: bool,
    /// Chamber LED can be switched.
    pub led_control: bool,
    /// Has enclosure filtration fans.
    pub filtration: bool,
    /// Has the multi-filament material station.
    pub material_station: bool,
    /// Jobs can be paused and resumed.
    pub pause_resume: bool,
    /// Jobs can be cancelled.
    pub cancel_job: bool,
    /// The platform can be cleared/belt advanced after a job.
    pub clear_platform: bool,
    /// Job files can be uploaded.
    pub upload: bool,
    /// Speaks only the legacy M-code dialect.
    pub uses_legacy_api: bool,
}

impl PrinterFeatureSet {
    /// Features of a printer reachable only over the legacy dialect.
    pub fn generic_legacy() -> Self {
        Self {
            camera: true,
            led_control: true,
            filtration: false,
            material_station: false,
            pause_resume: true,
            cancel_job: true,
            clear_platform: false,
            upload: true,
            uses_legacy_api: true,
        }
    }

    /// Features of the Adventurer 5M.
    pub fn adventurer_5m() -> Self {
        Self {
            camera: true,
            led_control: true,
            filtration: false,
            material_station: false,
            pause_resume: true,
            cancel_job: true,
            clear_platform: true,
            upload: true,
            uses_legacy_api: false,
        }
    }

    /// Features of the Adventurer 5M Pro.
    pub fn adventurer_5m_pro() -> Self {
        Self {
            filtration: true,
            ..Self::adventurer_5m()
        }
    }

    /// Features of the AD5X.
    pub fn ad5x() -> Self {
        Self {
            material_station: true,
            ..Self::adventurer_5m()
        }
    }

    /// Features for a detected model.
    pub fn for_model(model: PrinterModel) -> Self {
        match model {
            PrinterModel::GenericLegacy => Self::generic_legacy(),
            PrinterModel::Adventurer5M => Self::adventurer_5m(),
            PrinterModel::Adventurer5MPro => Self::adventurer_5m_pro(),
            PrinterModel::Ad5x => Self::ad5x(),
        }
    }
}
