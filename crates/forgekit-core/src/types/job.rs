//! Job progress and upload request types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::MaterialMapping;

/// Progress of the active print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobProgress {
    /// Bytes of the job file consumed so far.
    pub bytes_printed: u64,
    /// Total bytes in the job file.
    pub bytes_total: u64,
    /// Current layer.
    pub layer: u32,
    /// Total layer count.
    pub layer_total: u32,
}

impl JobProgress {
    /// Completion percentage derived from the byte counters, 0–100.
    pub fn percent(&self) -> u8 {
        if self.bytes_total == 0 {
            return 0;
        }
        ((self.bytes_printed.min(self.bytes_total) * 100) / self.bytes_total) as u8
    }

    /// Whether the byte counters indicate completion.
    pub fn is_complete(&self) -> bool {
        self.bytes_total > 0 && self.bytes_printed >= self.bytes_total
    }
}

/// A request to transfer a job file to the printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Local path of the G-code file to send.
    pub file_path: PathBuf,
    /// Start printing as soon as the transfer completes.
    pub start_now: bool,
    /// Run bed leveling before the print starts.
    pub auto_level: bool,
    /// Per-tool material assignments. Only meaningful on printers with a
    /// material station; `None` everywhere else.
    pub materials: Option<Vec<MaterialMapping>>,
}

impl UploadRequest {
    /// Create a plain single-material upload request.
    pub fn new(file_path: impl Into<PathBuf>, start_now: bool, auto_level: bool) -> Self {
        Self {
            file_path: file_path.into(),
            start_now,
            auto_level,
            materials: None,
        }
    }

    /// Attach material-station slot assignments.
    pub fn with_materials(mut self, materials: Vec<MaterialMapping>) -> Self {
        self.materials = Some(materials);
        self
    }

    /// The file name component of the local path.
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_path.display().to_string())
    }
}
