pub mod playback;
pub mod serial;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::VacuumError;
use crate::protocol::{Channel, RawCode};

/// Trait for abstracting pressure sources (real hardware vs playback)
#[async_trait]
pub trait PressureSource: Send {
    /// Open the source. `target` overrides the configured port, where applicable.
    async fn connect(&mut self, target: Option<String>) -> Result<(), VacuumError>;

    /// Close the source
    async fn disconnect(&mut self) -> Result<(), VacuumError>;

    /// Check if the source is open
    fn is_connected(&self) -> bool;

    /// Request one raw code from the given channel
    async fn measure_once(&mut self, channel: Channel) -> Result<RawCode, VacuumError>;

    /// Get the name of this source for logging
    fn name(&self) -> &str;
}

/// Configuration for creating pressure sources
#[derive(Debug, Clone)]
pub enum SourceConfig {
    /// Real serial port connection. `None` auto-detects a USB/COM port.
    Serial {
        port: Option<String>,
        baud_rate: u32,
    },
    /// Recorded log playback
    Playback {
        log_file: PathBuf,
        loop_playback: bool,
    },
}

impl SourceConfig {
    /// Create a pressure source from this configuration
    pub fn create_source(&self) -> Box<dyn PressureSource> {
        match self {
            SourceConfig::Serial { port, baud_rate } => Box::new(
                serial::SerialPressureSource::new(port.clone(), *baud_rate),
            ),
            SourceConfig::Playback {
                log_file,
                loop_playback,
            } => Box::new(playback::PlaybackPressureSource::new(
                log_file.clone(),
                *loop_playback,
            )),
        }
    }
}
