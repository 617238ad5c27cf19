//! The concrete backend strategies, one per printer model.

use async_trait::async_trait;
use forgekit_core::{
    CommandError, Error, MaterialStationStatus, PrinterModel, Result, UploadRequest,
};
use std::sync::Arc;

use super::{BackendContext, PrinterBackend};
use crate::adapter::PrinterClientAdapter;

/// Strategy for printers reachable only over the legacy M-code dialect.
///
/// Everything the dialect cannot do is refused by the feature set and
/// the mapping table; nothing needs overriding here.
pub struct GenericLegacyBackend {
    context: BackendContext,
}

impl GenericLegacyBackend {
    /// Wrap a connected adapter.
    pub fn new(adapter: Arc<PrinterClientAdapter>) -> Self {
        Self {
            context: BackendContext::new(adapter, PrinterModel::GenericLegacy),
        }
    }
}

#[async_trait]
impl PrinterBackend for GenericLegacyBackend {
    fn context(&self) -> &BackendContext {
        &self.context
    }
}

/// Strategy for the Adventurer 5M.
///
/// Speaks the modern API but has no filtration hardware and no material
/// station, so those stay refused at the feature level.
pub struct Adventurer5MBackend {
    context: BackendContext,
}

impl Adventurer5MBackend {
    /// Wrap a connected adapter.
    pub fn new(adapter: Arc<PrinterClientAdapter>) -> Self {
        Self {
            context: BackendContext::new(adapter, PrinterModel::Adventurer5M),
        }
    }
}

#[async_trait]
impl PrinterBackend for Adventurer5MBackend {
    fn context(&self) -> &BackendContext {
        &self.context
    }
}

/// Strategy for the Adventurer 5M Pro: the 5M surface plus working
/// enclosure filtration.
pub struct Adventurer5MProBackend {
    context: BackendContext,
}

impl Adventurer5MProBackend {
    /// Wrap a connected adapter.
    pub fn new(adapter: Arc<PrinterClientAdapter>) -> Self {
        Self {
            context: BackendContext::new(adapter, PrinterModel::Adventurer5MPro),
        }
    }
}

#[async_trait]
impl PrinterBackend for Adventurer5MProBackend {
    fn context(&self) -> &BackendContext {
        &self.context
    }
}

/// Strategy for the AD5X: the 5M surface plus the multi-filament
/// material station.
pub struct Ad5xBackend {
    context: BackendContext,
}

/// Slots physically present in the material station.
const MATERIAL_SLOT_COUNT: u8 = 4;

impl Ad5xBackend {
    /// Wrap a connected adapter.
    pub fn new(adapter: Arc<PrinterClientAdapter>) -> Self {
        Self {
            context: BackendContext::new(adapter, PrinterModel::Ad5x),
        }
    }

    fn validate_mappings(request: &UploadRequest) -> Result<()> {
        let Some(materials) = &request.materials else {
            return Ok(());
        };
        if materials.is_empty() {
            return Err(CommandError::InvalidArguments {
                command: "uploadFileWithMaterials".to_string(),
                reason: "material mapping list is empty".to_string(),
            }
            .into());
        }
        for mapping in materials {
            if mapping.slot_id == 0 || mapping.slot_id > MATERIAL_SLOT_COUNT {
                return Err(CommandError::InvalidArguments {
                    command: "uploadFileWithMaterials".to_string(),
                    reason: format!(
                        "slot {} out of range 1..={}",
                        mapping.slot_id, MATERIAL_SLOT_COUNT
                    ),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PrinterBackend for Ad5xBackend {
    fn context(&self) -> &BackendContext {
        &self.context
    }

    /// Uploads may carry per-tool material assignments; validate them
    /// and route through the material-station upload path.
    async fn upload_job(&self, request: UploadRequest) -> Result<()> {
        Self::validate_mappings(&request)?;
        let uploaded = match request.materials.clone() {
            Some(materials) => {
                self.adapter()
                    .upload_file_with_materials(
                        &request.file_path,
                        request.start_now,
                        request.auto_level,
                        materials,
                    )
                    .await
            }
            None => {
                self.adapter()
                    .upload_file(&request.file_path, request.start_now, request.auto_level)
                    .await
            }
        };
        if uploaded {
            Ok(())
        } else {
            Err(Error::other("upload failed"))
        }
    }

    /// The station reports through the telemetry snapshot; extract it.
    async fn material_station_status(&self) -> Result<MaterialStationStatus> {
        let info = self.printer_status().await?;
        info.material_station
            .ok_or_else(|| Error::other("material station not reported"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgekit_core::MaterialMapping;

    fn mapping(tool_id: u8, slot_id: u8) -> MaterialMapping {
        MaterialMapping {
            tool_id,
            slot_id,
            material_type: "PLA".to_string(),
        }
    }

    #[test]
    fn test_mapping_validation() {
        let plain = UploadRequest::new("/tmp/a.gcode", false, false);
        assert!(Ad5xBackend::validate_mappings(&plain).is_ok());

        let valid = plain.clone().with_materials(vec![mapping(0, 1), mapping(1, 4)]);
        assert!(Ad5xBackend::validate_mappings(&valid).is_ok());

        let empty = plain.clone().with_materials(vec![]);
        assert!(Ad5xBackend::validate_mappings(&empty).is_err());

        let out_of_range = plain.with_materials(vec![mapping(0, 5)]);
        assert!(Ad5xBackend::validate_mappings(&out_of_range).is_err());
    }
}
