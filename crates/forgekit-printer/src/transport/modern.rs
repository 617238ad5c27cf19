//! Modern 5M/Pro multi-channel client.
//!
//! The newer printers expose a JSON API on port 8898. Every request
//! carries the printer serial number and the check code issued on the
//! printer's screen; a non-zero `code` in the reply means the printer
//! refused the request.
//!
//! One [`HttpModernClient`] implements all four HTTP sub-client traits
//! over a shared session; the raw TCP bypass rides the legacy port and
//! is its own type.

use async_trait::async_trait;
use base64::Engine;
use forgekit_core::{
    JobProgress, MachineState, MaterialSlot, MaterialStationStatus, PrinterInfo, Result,
    Temperature, TransportError, UploadRequest,
};
use serde_json::{json, Value};
use std::time::Duration;

use super::{
    ControlApi, FilesApi, JobControlApi, LegacyClient, RawTcpApi, TcpLegacyClient, TempControlApi,
};

const MODERN_API_PORT: u16 = 8898;

fn http_err(e: reqwest::Error) -> forgekit_core::Error {
    TransportError::Http {
        status: e.status().map(|s| s.as_u16()),
        reason: e.to_string(),
    }
    .into()
}

/// Shared HTTP session implementing the four modern sub-clients.
pub struct HttpModernClient {
    http: reqwest::Client,
    base_url: String,
    serial_number: String,
    check_code: String,
}

impl HttpModernClient {
    /// Create a session for the printer at `ip`.
    pub fn new(ip: &str, serial_number: &str, check_code: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(http_err)?;
        Ok(Self {
            http,
            base_url: format!("http://{}:{}", ip, MODERN_API_PORT),
            serial_number: serial_number.to_string(),
            check_code: check_code.to_string(),
        })
    }

    /// POST an authorized request and return the parsed reply.
    async fn post(&self, endpoint: &str, payload: Value) -> Result<Value> {
        let mut body = json!({
            "serialNumber": self.serial_number,
            "checkCode": self.check_code,
        });
        if let (Some(obj), Some(extra)) = (body.as_object_mut(), payload.as_object()) {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::trace!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Http {
                status: Some(status.as_u16()),
                reason: format!("{} returned {}", endpoint, status),
            }
            .into());
        }

        let value: Value = response.json().await.map_err(http_err)?;
        let code = value.get("code").and_then(Value::as_i64).unwrap_or(0);
        if code != 0 {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request refused")
                .to_string();
            return Err(TransportError::Http {
                status: None,
                reason: format!("{} error {}: {}", endpoint, code, message),
            }
            .into());
        }
        Ok(value)
    }

    /// Issue a command on the control channel.
    async fn control_cmd(&self, cmd: &str, args: Value) -> Result<Value> {
        self.post("control", json!({ "payload": { "cmd": cmd, "args": args } }))
            .await
    }
}

#[async_trait]
impl ControlApi for HttpModernClient {
    async fn initialize(&self) -> Result<()> {
        // Reachability plus check-code verification in one round trip
        self.post("product", json!({})).await.map_err(|e| {
            forgekit_core::Error::from(TransportError::HandshakeFailed {
                reason: e.to_string(),
            })
        })?;
        Ok(())
    }

    async fn init_control(&self) -> Result<()> {
        self.control_cmd("stateCtrl_cmd", json!({ "action": "setControl" }))
            .await
            .map_err(|e| {
                forgekit_core::Error::from(TransportError::HandshakeFailed {
                    reason: e.to_string(),
                })
            })?;
        Ok(())
    }

    async fn machine_detail(&self) -> Result<PrinterInfo> {
        let value = self.post("detail", json!({})).await?;
        let detail = value.get("detail").unwrap_or(&value);
        Ok(parse_detail(detail, &self.serial_number))
    }

    async fn home_axes(&self) -> Result<()> {
        self.control_cmd("motorCtrl_cmd", json!({ "action": "home" }))
            .await
            .map(|_| ())
    }

    async fn set_led(&self, on: bool) -> Result<()> {
        let status = if on { "open" } else { "close" };
        self.control_cmd("lightCtrl_cmd", json!({ "status": status }))
            .await
            .map(|_| ())
    }

    async fn set_filtration(&self, external: bool, internal: bool) -> Result<()> {
        self.control_cmd(
            "circulateCtrl_cmd",
            json!({ "external": external, "internal": internal }),
        )
        .await
        .map(|_| ())
    }

    async fn clear_platform(&self) -> Result<()> {
        self.control_cmd("clearPlatform_cmd", json!({})).await.map(|_| ())
    }
}

#[async_trait]
impl TempControlApi for HttpModernClient {
    async fn set_bed_temperature(&self, celsius: u32) -> Result<()> {
        self.control_cmd("temperatureCtrl_cmd", json!({ "platformTemp": celsius }))
            .await
            .map(|_| ())
    }

    async fn cancel_bed_temperature(&self) -> Result<()> {
        self.set_bed_temperature(0).await
    }

    async fn set_extruder_temperature(&self, celsius: u32) -> Result<()> {
        self.control_cmd("temperatureCtrl_cmd", json!({ "rightTemp": celsius }))
            .await
            .map(|_| ())
    }

    async fn cancel_extruder_temperature(&self) -> Result<()> {
        self.set_extruder_temperature(0).await
    }
}

#[async_trait]
impl JobControlApi for HttpModernClient {
    async fn pause_job(&self) -> Result<()> {
        self.control_cmd("jobCtrl_cmd", json!({ "action": "pause" }))
            .await
            .map(|_| ())
    }

    async fn resume_job(&self) -> Result<()> {
        self.control_cmd("jobCtrl_cmd", json!({ "action": "continue" }))
            .await
            .map(|_| ())
    }

    async fn cancel_job(&self) -> Result<()> {
        self.control_cmd("jobCtrl_cmd", json!({ "action": "cancel" }))
            .await
            .map(|_| ())
    }

    async fn start_local_job(&self, file_name: &str) -> Result<()> {
        self.post(
            "printGcode",
            json!({ "fileName": file_name, "levelingBeforePrint": false }),
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl FilesApi for HttpModernClient {
    async fn list_local_files(&self) -> Result<Vec<String>> {
        let value = self.post("gcodeList", json!({})).await?;
        Ok(parse_file_list(&value))
    }

    async fn list_recent_files(&self, limit: usize) -> Result<Vec<String>> {
        let value = self
            .post("gcodeList", json!({ "scope": "recent", "maxCount": limit }))
            .await?;
        let mut files = parse_file_list(&value);
        files.truncate(limit);
        Ok(files)
    }

    async fn get_thumbnail(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .post("gcodeThumb", json!({ "fileName": file_name }))
            .await?;
        let Some(encoded) = value.get("imageData").and_then(Value::as_str) else {
            return Ok(None);
        };
        if encoded.is_empty() {
            return Ok(None);
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| {
                forgekit_core::Error::from(TransportError::MalformedResponse {
                    reason: format!("thumbnail payload: {}", e),
                })
            })?;
        Ok(Some(bytes))
    }

    async fn upload_file(&self, request: &UploadRequest) -> Result<()> {
        let data = tokio::fs::read(&request.file_path).await?;
        let file_name = request.file_name();

        let mut form = reqwest::multipart::Form::new()
            .text("serialNumber", self.serial_number.clone())
            .text("checkCode", self.check_code.clone())
            .text("fileSize", data.len().to_string())
            .text("printNow", request.start_now.to_string())
            .text("levelingBeforePrint", request.auto_level.to_string());
        if let Some(materials) = &request.materials {
            let mappings = serde_json::to_string(materials).map_err(|e| {
                forgekit_core::Error::from(TransportError::MalformedResponse {
                    reason: format!("material mappings: {}", e),
                })
            })?;
            form = form.text("materialMappings", mappings);
        }
        let part = reqwest::multipart::Part::bytes(data).file_name(file_name);
        form = form.part("gcodeFile", part);

        let url = format!("{}/uploadGcode", self.base_url);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Http {
                status: Some(status.as_u16()),
                reason: format!("upload returned {}", status),
            }
            .into());
        }
        let value: Value = response.json().await.map_err(http_err)?;
        let code = value.get("code").and_then(Value::as_i64).unwrap_or(0);
        if code != 0 {
            return Err(TransportError::Http {
                status: None,
                reason: format!("upload refused with code {}", code),
            }
            .into());
        }
        Ok(())
    }
}

fn parse_file_list(value: &Value) -> Vec<String> {
    value
        .get("gcodeList")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| {
                    e.as_str()
                        .map(str::to_string)
                        .or_else(|| e.get("name").and_then(Value::as_str).map(str::to_string))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn f32_field(value: &Value, key: &str) -> f32 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0) as f32
}

fn parse_temperature_block(value: &Value, key: &str) -> Temperature {
    match value.get(key) {
        Some(block) => Temperature::new(f32_field(block, "temp"), f32_field(block, "targetTemp")),
        None => Temperature::default(),
    }
}

/// Map a `detail` reply into the normalized snapshot.
fn parse_detail(detail: &Value, fallback_serial: &str) -> PrinterInfo {
    let status = detail
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let machine_state = MachineState::from_modern_report(&status);

    // The modern API reports fractional progress, not byte counters;
    // express it on a 0/100 scale so percent() agrees.
    let progress = detail.get("printProgress").and_then(Value::as_f64).map(|p| {
        JobProgress {
            bytes_printed: (p.clamp(0.0, 1.0) * 100.0).round() as u64,
            bytes_total: 100,
            layer: detail.get("printLayer").and_then(Value::as_u64).unwrap_or(0) as u32,
            layer_total: detail.get("targetLayer").and_then(Value::as_u64).unwrap_or(0) as u32,
        }
    });

    let current_file = detail
        .get("printFileName")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let led_on = detail
        .get("lightStatus")
        .and_then(Value::as_str)
        .map(|s| s == "open");

    PrinterInfo {
        name: detail
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        firmware_version: detail
            .get("firmwareVersion")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        serial_number: detail
            .get("serialNumber")
            .and_then(Value::as_str)
            .unwrap_or(fallback_serial)
            .to_string(),
        model: detail
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        machine_state,
        status_text: status,
        bed_temperature: parse_temperature_block(detail, "printBed"),
        extruder_temperature: parse_temperature_block(detail, "rightExtruder"),
        progress,
        current_file,
        led_on,
        endstops: None,
        material_station: parse_material_station(detail.get("materialStationInfo")),
    }
}

fn parse_material_station(value: Option<&Value>) -> Option<MaterialStationStatus> {
    let station = value?;
    let slots = station
        .get("slots")
        .and_then(Value::as_array)?
        .iter()
        .map(|slot| {
            let has_filament = slot
                .get("hasFilament")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            MaterialSlot {
                slot_id: slot.get("slotId").and_then(Value::as_u64).unwrap_or(0) as u8,
                material_type: slot
                    .get("materialType")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                color: slot
                    .get("materialColor")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                empty: !has_filament,
            }
        })
        .collect();
    let active_slot = station
        .get("currentSlot")
        .and_then(Value::as_u64)
        .filter(|&s| s > 0)
        .map(|s| s as u8);
    Some(MaterialStationStatus { slots, active_slot })
}

/// Raw TCP bypass for modern printers.
///
/// The 5M family keeps answering M-codes on the legacy port; manual LED
/// control and raw passthrough use this channel instead of the HTTP API.
pub struct TcpBypassClient {
    inner: TcpLegacyClient,
}

impl TcpBypassClient {
    /// Create a bypass channel to the printer at `ip`.
    pub fn new(ip: &str, timeout: Duration) -> Self {
        Self {
            inner: TcpLegacyClient::new(ip, timeout),
        }
    }
}

#[async_trait]
impl RawTcpApi for TcpBypassClient {
    async fn led_on(&self) -> Result<()> {
        LegacyClient::led_on(&self.inner).await
    }

    async fn led_off(&self) -> Result<()> {
        LegacyClient::led_off(&self.inner).await
    }

    async fn send_raw(&self, command: &str) -> Result<String> {
        LegacyClient::send_raw(&self.inner, command).await
    }
}
