//! Shared data models for printer telemetry and jobs.
//!
//! Both protocol generations are normalized into these shapes: the modern
//! API produces them natively, the legacy adapter path reassembles them
//! from several M-code responses.

mod job;
mod machine;
mod material;

pub use job::{JobProgress, UploadRequest};
pub use machine::{
    EndstopState, LegacyMachineStatus, LegacyMoveMode, MachineState, PrinterInfo, PrinterModel,
    Temperature,
};
pub use material::{MaterialMapping, MaterialSlot, MaterialStationStatus};
