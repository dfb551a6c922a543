use thiserror::Error;

use crate::protocol::Channel;

/// Main error type for the vacuum leak-test service
#[derive(Error, Debug)]
pub enum VacuumError {
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device not connected")]
    NotConnected,

    #[error("No response from device on {0}")]
    NoResponse(Channel),

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("A test session is already running")]
    SessionRunning,
}

/// Errors in device framing and playback log parsing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid channel: {0}. Valid values: 1 (VAC1), 2 (VAC2)")]
    InvalidChannel(u8),

    #[error("Invalid time mode: {0}. Must be 1-5")]
    InvalidTimeMode(u8),

    #[error("Empty response from device")]
    EmptyResponse,
}

/// Malformed calibration table, detected when the table is built
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Calibration table needs at least 2 breakpoints, got {0}")]
    TooFewBreakpoints(usize),

    #[error("Calibration raw codes must be strictly increasing (breakpoint {index})")]
    NonMonotonicCodes { index: usize },
}
