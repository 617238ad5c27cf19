//! Legacy single-socket M-code client.
//!
//! The older printers expose one TCP socket (port 8899) speaking a
//! line-oriented `~Mnnn` request/response dialect. Every response echoes
//! the command, carries `Key: value` lines, and terminates with `ok`.
//!
//! One request is in flight at a time; the socket mutex serializes
//! callers. A failed exchange drops the socket so the next request
//! reconnects cleanly.

use async_trait::async_trait;
use forgekit_core::{
    EndstopState, JobProgress, LegacyMachineStatus, LegacyMoveMode, Result, Temperature,
    TransportError, UploadRequest,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::{LegacyClient, LegacyMachineInfo, LegacyStatusInfo, LegacyTempInfo};

const LEGACY_PORT: u16 = 8899;
const UPLOAD_CHUNK: usize = 4096;

/// PNG signature used to locate image data in an `~M662` reply.
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// One legacy request.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyRequest {
    /// Take control of the printer.
    ControlMessage,
    /// Identity report.
    GetInfo,
    /// Temperature report.
    GetTemperature,
    /// Machine status / endstop report.
    GetStatus,
    /// Job progress report.
    GetProgress,
    /// Home all axes.
    HomeAxes,
    /// Chamber LED on (full white).
    LedOn,
    /// Chamber LED off.
    LedOff,
    /// Set bed target temperature (0 turns the heater off).
    SetBedTemperature(u32),
    /// Set extruder target temperature (0 turns the heater off).
    SetExtruderTemperature(u32),
    /// Pause the running job.
    PauseJob,
    /// Resume a paused job.
    ResumeJob,
    /// Cancel the running job.
    CancelJob,
    /// Select a stored file and start printing it.
    StartJob(String),
    /// List files on printer storage.
    ListFiles,
    /// Fetch the embedded thumbnail of a stored file.
    GetThumbnail(String),
    /// Verbatim instruction.
    Raw(String),
}

impl LegacyRequest {
    /// The G/M-code for this request.
    pub fn gcode(&self) -> String {
        match self {
            LegacyRequest::ControlMessage => "~M601 S1".to_string(),
            LegacyRequest::GetInfo => "~M115".to_string(),
            LegacyRequest::GetTemperature => "~M105".to_string(),
            LegacyRequest::GetStatus => "~M119".to_string(),
            LegacyRequest::GetProgress => "~M27".to_string(),
            LegacyRequest::HomeAxes => "~G28".to_string(),
            LegacyRequest::LedOn => "~M146 r255 g255 b255 F0".to_string(),
            LegacyRequest::LedOff => "~M146 r0 g0 b0 F0".to_string(),
            LegacyRequest::SetBedTemperature(c) => format!("~M140 S{}", c),
            LegacyRequest::SetExtruderTemperature(c) => format!("~M104 S{}", c),
            LegacyRequest::PauseJob => "~M25".to_string(),
            LegacyRequest::ResumeJob => "~M24".to_string(),
            LegacyRequest::CancelJob => "~M26".to_string(),
            LegacyRequest::StartJob(name) => format!("~M23 0:/user/{}", name),
            LegacyRequest::ListFiles => "~M661".to_string(),
            LegacyRequest::GetThumbnail(name) => format!("~M662 0:/user/{}", name),
            LegacyRequest::Raw(cmd) => {
                if cmd.starts_with('~') {
                    cmd.clone()
                } else {
                    format!("~{}", cmd)
                }
            }
        }
    }

    /// The wire form: G-code plus line terminator.
    pub fn instruction(&self) -> String {
        format!("{}\r\n", self.gcode())
    }
}

static RE_PAIRS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z0-9\-]+)\s*:\s*(\S+)").unwrap());
static RE_FRACTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)/(\d+)").unwrap());

/// Parse the `Key: value` body of a legacy response.
///
/// The first line is the command echo and is skipped; `ok` terminates
/// the body. Most lines are one `Key: value` pair, but temperature and
/// endstop lines pack several pairs and are split with a pair regex.
pub(crate) fn parse_kv(content: &str) -> HashMap<String, String> {
    let mut kv = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("CMD") {
            continue;
        }
        if line == "ok" {
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            tracing::debug!("Unparseable legacy line: {:?}", line);
            continue;
        };
        let key = key.trim();
        // Temperature, position, and endstop lines pack several pairs
        // into one line
        if key == "T0" || key == "X" {
            for cap in RE_PAIRS.captures_iter(line) {
                kv.insert(cap[1].to_string(), cap[2].to_string());
            }
        } else if key == "Endstop" {
            for cap in RE_PAIRS.captures_iter(value) {
                kv.insert(cap[1].to_string(), cap[2].to_string());
            }
        } else {
            kv.insert(key.to_string(), value.trim().to_string());
        }
    }
    kv
}

/// Extract `current/target` fraction pairs from a progress response, in
/// order of appearance.
pub(crate) fn parse_fractions(content: &str) -> Vec<(u64, u64)> {
    RE_FRACTION
        .captures_iter(content)
        .filter_map(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)))
        .collect()
}

fn parse_temperature(value: &str) -> Temperature {
    let mut parts = value.splitn(2, '/');
    let current = parts.next().and_then(|s| s.trim().parse().ok()).unwrap_or(0.0);
    let target = parts.next().and_then(|s| s.trim().parse().ok()).unwrap_or(0.0);
    Temperature::new(current, target)
}

fn missing_field(key: &str) -> forgekit_core::Error {
    TransportError::MalformedResponse {
        reason: format!("missing '{}' field", key),
    }
    .into()
}

/// Legacy client over one TCP socket.
pub struct TcpLegacyClient {
    host: String,
    timeout: Duration,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpLegacyClient {
    /// Create a client for the printer at `ip`. The socket is opened
    /// lazily on the first request.
    pub fn new(ip: &str, timeout: Duration) -> Self {
        Self {
            host: format!("{}:{}", ip, LEGACY_PORT),
            timeout,
            stream: Mutex::new(None),
        }
    }

    async fn open_stream(&self) -> Result<TcpStream> {
        tracing::trace!("connecting to {}", self.host);
        let connect = TcpStream::connect(&self.host);
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(TransportError::ConnectFailed {
                host: self.host.clone(),
                reason: e.to_string(),
            }
            .into()),
            Err(_) => Err(TransportError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
            .into()),
        }
    }

    /// Run one request/response exchange, reconnecting if needed.
    /// A failed exchange drops the socket.
    async fn request(&self, request: &LegacyRequest) -> Result<String> {
        let raw = self.request_bytes(request).await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    async fn request_bytes(&self, request: &LegacyRequest) -> Result<Vec<u8>> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_stream().await?);
        }
        let stream = guard.as_mut().expect("stream populated above");
        match self.exchange(stream, request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                *guard = None;
                Err(e)
            }
        }
    }

    async fn exchange(&self, stream: &mut TcpStream, request: &LegacyRequest) -> Result<Vec<u8>> {
        let instruction = request.instruction();
        tracing::trace!("-> {}", request.gcode());
        self.write_all(stream, instruction.as_bytes()).await?;
        self.read_until_ok(stream).await
    }

    async fn write_all(&self, stream: &mut TcpStream, data: &[u8]) -> Result<()> {
        match tokio::time::timeout(self.timeout, stream.write_all(data)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::Io {
                reason: e.to_string(),
            }
            .into()),
            Err(_) => Err(TransportError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
            .into()),
        }
    }

    /// Read until the terminating `ok` line shows up.
    async fn read_until_ok(&self, stream: &mut TcpStream) -> Result<Vec<u8>> {
        let mut response: Vec<u8> = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = match tokio::time::timeout(self.timeout, stream.read(&mut buf)).await {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    return Err(TransportError::Io {
                        reason: e.to_string(),
                    }
                    .into())
                }
                Err(_) => {
                    return Err(TransportError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                    .into())
                }
            };
            if n == 0 {
                return Err(TransportError::Io {
                    reason: "connection closed by printer".to_string(),
                }
                .into());
            }
            response.extend_from_slice(&buf[..n]);
            if ends_with_ok(&response) {
                return Ok(response);
            }
        }
    }
}

/// Whether the buffer terminates with an `ok` line.
fn ends_with_ok(data: &[u8]) -> bool {
    let tail = data
        .rsplit(|&b| b == b'\n')
        .find(|line| !line.iter().all(|b| b.is_ascii_whitespace()));
    matches!(tail, Some(line) if line.strip_suffix(b"\r").unwrap_or(line) == b"ok")
}

#[async_trait]
impl LegacyClient for TcpLegacyClient {
    async fn init_control(&self) -> Result<()> {
        let response = self.request(&LegacyRequest::ControlMessage).await?;
        if response.contains("Control failed") {
            return Err(TransportError::HandshakeFailed {
                reason: "printer refused control".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn home_axes(&self) -> Result<()> {
        self.request(&LegacyRequest::HomeAxes).await.map(|_| ())
    }

    async fn led_on(&self) -> Result<()> {
        self.request(&LegacyRequest::LedOn).await.map(|_| ())
    }

    async fn led_off(&self) -> Result<()> {
        self.request(&LegacyRequest::LedOff).await.map(|_| ())
    }

    async fn set_bed_temperature(&self, celsius: u32) -> Result<()> {
        self.request(&LegacyRequest::SetBedTemperature(celsius))
            .await
            .map(|_| ())
    }

    async fn cancel_bed_temperature(&self) -> Result<()> {
        self.set_bed_temperature(0).await
    }

    async fn set_extruder_temperature(&self, celsius: u32) -> Result<()> {
        self.request(&LegacyRequest::SetExtruderTemperature(celsius))
            .await
            .map(|_| ())
    }

    async fn cancel_extruder_temperature(&self) -> Result<()> {
        self.set_extruder_temperature(0).await
    }

    async fn pause_job(&self) -> Result<()> {
        self.request(&LegacyRequest::PauseJob).await.map(|_| ())
    }

    async fn resume_job(&self) -> Result<()> {
        self.request(&LegacyRequest::ResumeJob).await.map(|_| ())
    }

    async fn cancel_job(&self) -> Result<()> {
        self.request(&LegacyRequest::CancelJob).await.map(|_| ())
    }

    async fn start_local_job(&self, file_name: &str) -> Result<()> {
        self.request(&LegacyRequest::StartJob(file_name.to_string()))
            .await
            .map(|_| ())
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        let response = self.request(&LegacyRequest::ListFiles).await?;
        // Entries are absolute storage paths, one per line
        let files = response
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with("0:/user/"))
            .map(|line| line.trim_start_matches("0:/user/").to_string())
            .collect();
        Ok(files)
    }

    async fn get_printer_info(&self) -> Result<LegacyMachineInfo> {
        let response = self.request(&LegacyRequest::GetInfo).await?;
        let kv = parse_kv(&response);
        Ok(LegacyMachineInfo {
            machine_type: kv.get("Machine Type").cloned().unwrap_or_default(),
            name: kv
                .get("Machine Name")
                .cloned()
                .ok_or_else(|| missing_field("Machine Name"))?,
            firmware_version: kv.get("Firmware").cloned().unwrap_or_default(),
            serial_number: kv.get("SN").cloned().unwrap_or_default(),
            tool_count: kv
                .get("Tool Count")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            mac_address: kv.get("Mac Address").cloned().unwrap_or_default(),
        })
    }

    async fn get_temp_info(&self) -> Result<LegacyTempInfo> {
        let response = self.request(&LegacyRequest::GetTemperature).await?;
        let kv = parse_kv(&response);
        let extruder = kv
            .get("T0")
            .map(|v| parse_temperature(v))
            .ok_or_else(|| missing_field("T0"))?;
        let bed = kv.get("B").map(|v| parse_temperature(v)).unwrap_or_default();
        Ok(LegacyTempInfo { extruder, bed })
    }

    async fn get_print_status(&self) -> Result<JobProgress> {
        let response = self.request(&LegacyRequest::GetProgress).await?;
        let fractions = parse_fractions(&response);
        let mut progress = JobProgress::default();
        if let Some(&(printed, total)) = fractions.first() {
            progress.bytes_printed = printed;
            progress.bytes_total = total;
        }
        if let Some(&(layer, layer_total)) = fractions.get(1) {
            progress.layer = layer as u32;
            progress.layer_total = layer_total as u32;
        }
        Ok(progress)
    }

    async fn get_endstop_info(&self) -> Result<LegacyStatusInfo> {
        let response = self.request(&LegacyRequest::GetStatus).await?;
        let kv = parse_kv(&response);
        let machine_status = kv
            .get("MachineStatus")
            .map(|v| LegacyMachineStatus::from_report(v))
            .ok_or_else(|| missing_field("MachineStatus"))?;
        let move_mode = kv
            .get("MoveMode")
            .map(|v| LegacyMoveMode::from_report(v))
            .unwrap_or(LegacyMoveMode::Unknown);
        let endstops = EndstopState {
            x_max: kv.get("X-max").map(|v| v != "0").unwrap_or(false),
            y_max: kv.get("Y-max").map(|v| v != "0").unwrap_or(false),
            z_min: kv.get("Z-min").map(|v| v != "0").unwrap_or(false),
        };
        let led_on = kv.get("LED").map(|v| v == "1").unwrap_or(false);
        let current_file = kv
            .get("CurrentFile")
            .filter(|v| !v.is_empty())
            .cloned();
        Ok(LegacyStatusInfo {
            machine_status,
            move_mode,
            endstops,
            led_on,
            current_file,
        })
    }

    async fn get_thumbnail(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .request_bytes(&LegacyRequest::GetThumbnail(file_name.to_string()))
            .await?;
        // Image data sits between the header echo and the trailing ok;
        // locate it by signature rather than trusting a length field.
        let Some(start) = find_subsequence(&response, PNG_MAGIC) else {
            return Ok(None);
        };
        let mut image = response[start..].to_vec();
        if ends_with_ok(&image) {
            if let Some(pos) = image.windows(2).rposition(|w| w == b"ok") {
                image.truncate(pos);
            }
        }
        while image.last().is_some_and(|b| b.is_ascii_whitespace()) {
            image.pop();
        }
        Ok(Some(image))
    }

    async fn send_raw(&self, command: &str) -> Result<String> {
        self.request(&LegacyRequest::Raw(command.to_string())).await
    }

    async fn upload_file(&self, request: &UploadRequest) -> Result<()> {
        if request.auto_level {
            // No leveling flag exists in this dialect; the printer levels
            // according to its own stored setting.
            tracing::debug!("auto_level requested but not expressible on the legacy protocol");
        }
        let data = tokio::fs::read(&request.file_path).await?;
        let name = request.file_name();

        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_stream().await?);
        }
        let stream = guard.as_mut().expect("stream populated above");

        let begin = LegacyRequest::Raw(format!("M28 {} 0:/user/{}", data.len(), name));
        let result: Result<()> = async {
            self.exchange(stream, &begin).await?;
            for chunk in data.chunks(UPLOAD_CHUNK) {
                self.write_all(stream, chunk).await?;
            }
            self.exchange(stream, &LegacyRequest::Raw("M29".to_string()))
                .await?;
            if request.start_now {
                self.exchange(stream, &LegacyRequest::StartJob(name.clone()))
                    .await?;
            }
            Ok(())
        }
        .await;

        if result.is_err() {
            *guard = None;
        }
        result
    }
}

/// Locate `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
