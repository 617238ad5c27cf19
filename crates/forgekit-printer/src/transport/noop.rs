//! No-op client implementations.
//!
//! Stand-ins for a real printer: every operation succeeds and returns an
//! empty or default value. Useful for wiring tests and for running the
//! application shell without hardware.

use async_trait::async_trait;
use forgekit_core::{
    JobProgress, LegacyMachineStatus, LegacyMoveMode, MachineState, PrinterInfo, Result,
    UploadRequest,
};
use std::sync::Arc;

use super::{
    ControlApi, FilesApi, JobControlApi, LegacyClient, LegacyMachineInfo, LegacyStatusInfo,
    LegacyTempInfo, ModernHandle, RawTcpApi, TempControlApi,
};

/// Legacy client that accepts everything and reports an idle printer.
#[derive(Debug, Default)]
pub struct NoOpLegacyClient;

#[async_trait]
impl LegacyClient for NoOpLegacyClient {
    async fn init_control(&self) -> Result<()> {
        Ok(())
    }

    async fn home_axes(&self) -> Result<()> {
        Ok(())
    }

    async fn led_on(&self) -> Result<()> {
        Ok(())
    }

    async fn led_off(&self) -> Result<()> {
        Ok(())
    }

    async fn set_bed_temperature(&self, _celsius: u32) -> Result<()> {
        Ok(())
    }

    async fn cancel_bed_temperature(&self) -> Result<()> {
        Ok(())
    }

    async fn set_extruder_temperature(&self, _celsius: u32) -> Result<()> {
        Ok(())
    }

    async fn cancel_extruder_temperature(&self) -> Result<()> {
        Ok(())
    }

    async fn pause_job(&self) -> Result<()> {
        Ok(())
    }

    async fn resume_job(&self) -> Result<()> {
        Ok(())
    }

    async fn cancel_job(&self) -> Result<()> {
        Ok(())
    }

    async fn start_local_job(&self, _file_name: &str) -> Result<()> {
        Ok(())
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn get_printer_info(&self) -> Result<LegacyMachineInfo> {
        Ok(LegacyMachineInfo {
            machine_type: "NoOp".to_string(),
            name: "NoOp Printer".to_string(),
            ..Default::default()
        })
    }

    async fn get_temp_info(&self) -> Result<LegacyTempInfo> {
        Ok(LegacyTempInfo::default())
    }

    async fn get_print_status(&self) -> Result<JobProgress> {
        Ok(JobProgress::default())
    }

    async fn get_endstop_info(&self) -> Result<LegacyStatusInfo> {
        Ok(LegacyStatusInfo {
            machine_status: LegacyMachineStatus::Ready,
            move_mode: LegacyMoveMode::Ready,
            endstops: Default::default(),
            led_on: false,
            current_file: None,
        })
    }

    async fn get_thumbnail(&self, _file_name: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn send_raw(&self, _command: &str) -> Result<String> {
        Ok(String::new())
    }

    async fn upload_file(&self, _request: &UploadRequest) -> Result<()> {
        Ok(())
    }
}

/// Modern client that accepts everything and reports an idle printer.
#[derive(Debug, Default)]
pub struct NoOpModernClient;

impl NoOpModernClient {
    /// Build a full [`ModernHandle`] backed by no-op sub-clients.
    pub fn handle() -> ModernHandle {
        let client = Arc::new(NoOpModernClient);
        ModernHandle {
            control: client.clone(),
            temp_control: client.clone(),
            job_control: client.clone(),
            files: client.clone(),
            tcp: client,
        }
    }

    fn idle_info() -> PrinterInfo {
        PrinterInfo {
            name: "NoOp Printer".to_string(),
            firmware_version: String::new(),
            serial_number: String::new(),
            model: String::new(),
            machine_state: MachineState::Ready,
            status_text: "ready".to_string(),
            bed_temperature: Default::default(),
            extruder_temperature: Default::default(),
            progress: None,
            current_file: None,
            led_on: None,
            endstops: None,
            material_station: None,
        }
    }
}

#[async_trait]
impl ControlApi for NoOpModernClient {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn init_control(&self) -> Result<()> {
        Ok(())
    }

    async fn machine_detail(&self) -> Result<PrinterInfo> {
        Ok(Self::idle_info())
    }

    async fn home_axes(&self) -> Result<()> {
        Ok(())
    }

    async fn set_led(&self, _on: bool) -> Result<()> {
        Ok(())
    }

    async fn set_filtration(&self, _external: bool, _internal: bool) -> Result<()> {
        Ok(())
    }

    async fn clear_platform(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TempControlApi for NoOpModernClient {
    async fn set_bed_temperature(&self, _celsius: u32) -> Result<()> {
        Ok(())
    }

    async fn cancel_bed_temperature(&self) -> Result<()> {
        Ok(())
    }

    async fn set_extruder_temperature(&self, _celsius: u32) -> Result<()> {
        Ok(())
    }

    async fn cancel_extruder_temperature(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl JobControlApi for NoOpModernClient {
    async fn pause_job(&self) -> Result<()> {
        Ok(())
    }

    async fn resume_job(&self) -> Result<()> {
        Ok(())
    }

    async fn cancel_job(&self) -> Result<()> {
        Ok(())
    }

    async fn start_local_job(&self, _file_name: &str) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl FilesApi for NoOpModernClient {
    async fn list_local_files(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn list_recent_files(&self, _limit: usize) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn get_thumbnail(&self, _file_name: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn upload_file(&self, _request: &UploadRequest) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl RawTcpApi for NoOpModernClient {
    async fn led_on(&self) -> Result<()> {
        Ok(())
    }

    async fn led_off(&self) -> Result<()> {
        Ok(())
    }

    async fn send_raw(&self, _command: &str) -> Result<String> {
        Ok(String::new())
    }
}
