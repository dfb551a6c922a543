use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Raw pressure code from the sensor board (8-bit, 0-255)
pub type RawCode = u8;

/// Length of every command frame sent to the board
pub const COMMAND_LEN: usize = 5;

/// Sensor channel on the vacuum board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Channel {
    /// Package vacuum line
    #[default]
    Vac1 = 1,
    /// Chuck vacuum line
    Vac2 = 2,
}

impl Channel {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for Channel {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Channel::Vac1),
            2 => Ok(Channel::Vac2),
            _ => Err(ProtocolError::InvalidChannel(value)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Vac1 => write!(f, "VAC1"),
            Channel::Vac2 => write!(f, "VAC2"),
        }
    }
}

/// Configured test length. Each mode maps to a number of duration units (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeMode {
    /// No active test window: calibration is followed directly by timeout
    #[default]
    Instant = 1,
    Long = 2,
    Medium = 3,
    Short = 4,
    Quick = 5,
}

impl TimeMode {
    pub const ALL: [TimeMode; 5] = [
        TimeMode::Instant,
        TimeMode::Long,
        TimeMode::Medium,
        TimeMode::Short,
        TimeMode::Quick,
    ];

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Test duration in duration units
    pub fn duration_units(&self) -> u32 {
        match self {
            TimeMode::Instant => 0,
            TimeMode::Long => 300,
            TimeMode::Medium => 180,
            TimeMode::Short => 120,
            TimeMode::Quick => 30,
        }
    }
}

impl TryFrom<u8> for TimeMode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TimeMode::Instant),
            2 => Ok(TimeMode::Long),
            3 => Ok(TimeMode::Medium),
            4 => Ok(TimeMode::Short),
            5 => Ok(TimeMode::Quick),
            _ => Err(ProtocolError::InvalidTimeMode(value)),
        }
    }
}

/// Build the 5-byte measurement request for a channel: `VAC1\0` / `VAC2\0`
pub fn build_command(channel: Channel) -> [u8; COMMAND_LEN] {
    match channel {
        Channel::Vac1 => *b"VAC1\0",
        Channel::Vac2 => *b"VAC2\0",
    }
}

/// Extract the raw code from a device reply. Only the first byte carries data.
pub fn raw_code_from_reply(reply: &[u8]) -> Result<RawCode, ProtocolError> {
    reply.first().copied().ok_or(ProtocolError::EmptyResponse)
}
