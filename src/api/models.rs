use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::processing::Verdict;
use crate::processing::decision::PhaseBoundaries;
use crate::protocol::{Channel, RawCode};
use crate::service::SessionStatus;

// ============= Device Endpoints =============

#[derive(Debug, Serialize)]
pub struct DeviceInfoResponse {
    #[serde(rename = "type")]
    pub device_type: String,
    pub name: String,
    pub capabilities: DeviceCapabilities,
}

#[derive(Debug, Serialize)]
pub struct DeviceCapabilities {
    pub channels: Vec<u8>,
    pub time_modes: Vec<TimeModeInfo>,
    pub has_quick_check: bool,
}

#[derive(Debug, Serialize)]
pub struct TimeModeInfo {
    pub mode: u8,
    pub duration_units: u32,
}

#[derive(Debug, Serialize)]
pub struct PortInfo {
    pub name: String,
    pub port_type: String,
}

#[derive(Debug, Serialize)]
pub struct PortsResponse {
    pub ports: Vec<PortInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectRequest {
    pub port: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    pub connected: bool,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct MeasureOnceResponse {
    pub channel: Channel,
    pub raw: RawCode,
    pub pressure: f64,
}

// ============= Configuration Endpoints =============

#[derive(Debug, Serialize, Deserialize)]
pub struct TimeModeBody {
    pub time_mode: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PressureBody {
    pub pressure_kpa: f64,
}

// ============= Session Endpoints =============

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub status: SessionStatus,
    pub time_mode: u8,
    pub duration_units: u32,
    pub boundaries: PhaseBoundaries,
    pub verdict: Option<Verdict>,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct MeasureDecideRequest {
    pub counter: u32,
}

// ============= Error Response =============

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
