//! The abstract command vocabulary.
//!
//! [`Command`] carries a fully typed operation; [`CommandKind`] is its
//! argument-free discriminant and owns the wire names that form the
//! closed vocabulary contract with the IPC/UI layer. A name outside this
//! set is an unknown-command failure, never a crash.

use forgekit_core::UploadRequest;

/// One printer operation, with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Home all axes.
    HomeAxes,
    /// Turn the chamber LED on.
    LedOn,
    /// Turn the chamber LED off.
    LedOff,
    /// Set the bed target temperature.
    SetBedTemperature {
        /// Target in degrees Celsius.
        celsius: u32,
    },
    /// Turn the bed heater off.
    CancelBedTemperature,
    /// Set the extruder target temperature.
    SetExtruderTemperature {
        /// Target in degrees Celsius.
        celsius: u32,
    },
    /// Turn the extruder heater off.
    CancelExtruderTemperature,
    /// Pause the running job.
    PauseJob,
    /// Resume a paused job.
    ResumeJob,
    /// Cancel the running job.
    CancelJob,
    /// Start printing a file already on printer storage.
    StartJob {
        /// File name on printer storage.
        file_name: String,
    },
    /// Advance the belt/clear the platform after a completed job.
    ClearPlatform,
    /// Enclosure filtration: vent to the outside.
    SetExternalFiltrationOn,
    /// Enclosure filtration: recirculate internally.
    SetInternalFiltrationOn,
    /// Enclosure filtration off.
    SetFiltrationOff,
    /// List recently printed files.
    ListRecentFiles,
    /// List files on printer storage.
    ListLocalFiles,
    /// Transfer a job file.
    UploadFile {
        /// The transfer request.
        request: UploadRequest,
    },
    /// Transfer a job file with material-station slot assignments.
    UploadFileWithMaterials {
        /// The transfer request; `materials` must be present.
        request: UploadRequest,
    },
}

impl Command {
    /// The argument-free discriminant of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::HomeAxes => CommandKind::HomeAxes,
            Command::LedOn => CommandKind::LedOn,
            Command::LedOff => CommandKind::LedOff,
            Command::SetBedTemperature { .. } => CommandKind::SetBedTemperature,
            Command::CancelBedTemperature => CommandKind::CancelBedTemperature,
            Command::SetExtruderTemperature { .. } => CommandKind::SetExtruderTemperature,
            Command::CancelExtruderTemperature => CommandKind::CancelExtruderTemperature,
            Command::PauseJob => CommandKind::PauseJob,
            Command::ResumeJob => CommandKind::ResumeJob,
            Command::CancelJob => CommandKind::CancelJob,
            Command::StartJob { .. } => CommandKind::StartJob,
            Command::ClearPlatform => CommandKind::ClearPlatform,
            Command::SetExternalFiltrationOn => CommandKind::SetExternalFiltrationOn,
            Command::SetInternalFiltrationOn => CommandKind::SetInternalFiltrationOn,
            Command::SetFiltrationOff => CommandKind::SetFiltrationOff,
            Command::ListRecentFiles => CommandKind::ListRecentFiles,
            Command::ListLocalFiles => CommandKind::ListLocalFiles,
            Command::UploadFile { .. } => CommandKind::UploadFile,
            Command::UploadFileWithMaterials { .. } => CommandKind::UploadFileWithMaterials,
        }
    }

    /// Wire name of this command.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// Argument-free command discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `homeAxes`
    HomeAxes,
    /// `setLedOn`
    LedOn,
    /// `setLedOff`
    LedOff,
    /// `setBedTemperature`
    SetBedTemperature,
    /// `cancelBedTemperature`
    CancelBedTemperature,
    /// `setExtruderTemperature`
    SetExtruderTemperature,
    /// `cancelExtruderTemperature`
    CancelExtruderTemperature,
    /// `pauseJob`
    PauseJob,
    /// `resumeJob`
    ResumeJob,
    /// `cancelJob`
    CancelJob,
    /// `startJob`
    StartJob,
    /// `clearPlatform`
    ClearPlatform,
    /// `setExternalFiltrationOn`
    SetExternalFiltrationOn,
    /// `setInternalFiltrationOn`
    SetInternalFiltrationOn,
    /// `setFiltrationOff`
    SetFiltrationOff,
    /// `listRecentFiles`
    ListRecentFiles,
    /// `listLocalFiles`
    ListLocalFiles,
    /// `uploadFile`
    UploadFile,
    /// `uploadFileWithMaterials`
    UploadFileWithMaterials,
}

impl CommandKind {
    /// Every command in the vocabulary.
    pub const ALL: &'static [CommandKind] = &[
        CommandKind::HomeAxes,
        CommandKind::LedOn,
        CommandKind::LedOff,
        CommandKind::SetBedTemperature,
        CommandKind::CancelBedTemperature,
        CommandKind::SetExtruderTemperature,
        CommandKind::CancelExtruderTemperature,
        CommandKind::PauseJob,
        CommandKind::ResumeJob,
        CommandKind::CancelJob,
        CommandKind::StartJob,
        CommandKind::ClearPlatform,
        CommandKind::SetExternalFiltrationOn,
        CommandKind::SetInternalFiltrationOn,
        CommandKind::SetFiltrationOff,
        CommandKind::ListRecentFiles,
        CommandKind::ListLocalFiles,
        CommandKind::UploadFile,
        CommandKind::UploadFileWithMaterials,
    ];

    /// Wire name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::HomeAxes => "homeAxes",
            CommandKind::LedOn => "setLedOn",
            CommandKind::LedOff => "setLedOff",
            CommandKind::SetBedTemperature => "setBedTemperature",
            CommandKind::CancelBedTemperature => "cancelBedTemperature",
            CommandKind::SetExtruderTemperature => "setExtruderTemperature",
            CommandKind::CancelExtruderTemperature => "cancelExtruderTemperature",
            CommandKind::PauseJob => "pauseJob",
            CommandKind::ResumeJob => "resumeJob",
            CommandKind::CancelJob => "cancelJob",
            CommandKind::StartJob => "startJob",
            CommandKind::ClearPlatform => "clearPlatform",
            CommandKind::SetExternalFiltrationOn => "setExternalFiltrationOn",
            CommandKind::SetInternalFiltrationOn => "setInternalFiltrationOn",
            CommandKind::SetFiltrationOff => "setFiltrationOff",
            CommandKind::ListRecentFiles => "listRecentFiles",
            CommandKind::ListLocalFiles => "listLocalFiles",
            CommandKind::UploadFile => "uploadFile",
            CommandKind::UploadFileWithMaterials => "uploadFileWithMaterials",
        }
    }

    /// Look a command up by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a dispatched command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// The printer acknowledged the command.
    Ack,
    /// A file listing.
    Files(Vec<String>),
    /// Raw reply text.
    Raw(String),
}

impl CommandOutput {
    /// Extract a file listing, if that is what this output is.
    pub fn into_files(self) -> Option<Vec<String>> {
        match self {
            CommandOutput::Files(files) => Some(files),
            _ => None,
        }
    }
}
