//! Material station types (AD5X).

use serde::{Deserialize, Serialize};

/// One filament slot in the material station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialSlot {
    /// Slot number, 1-based as the printer reports it.
    pub slot_id: u8,
    /// Loaded material type (e.g. "PLA"), if the slot is occupied.
    pub material_type: Option<String>,
    /// Filament color as reported by the station.
    pub color: Option<String>,
    /// Whether the slot is empty.
    pub empty: bool,
}

/// Snapshot of the material station.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterialStationStatus {
    /// All slots, in slot order.
    pub slots: Vec<MaterialSlot>,
    /// The slot currently feeding the extruder, if any.
    pub active_slot: Option<u8>,
}

impl MaterialStationStatus {
    /// Number of occupied slots.
    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.empty).count()
    }
}

/// Maps one tool in the sliced job to a material station slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialMapping {
    /// Tool index in the job file, 0-based.
    pub tool_id: u8,
    /// Material station slot to feed that tool, 1-based.
    pub slot_id: u8,
    /// Material type the slicer expects for the tool.
    pub material_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loaded_count() {
        let station = MaterialStationStatus {
            slots: vec![
                MaterialSlot {
                    slot_id: 1,
                    material_type: Some("PLA".to_string()),
                    color: Some("#FF0000".to_string()),
                    empty: false,
                },
                MaterialSlot {
                    slot_id: 2,
                    material_type: None,
                    color: None,
                    empty: true,
                },
            ],
            active_slot: Some(1),
        };
        assert_eq!(station.loaded_count(), 1);
    }
}
