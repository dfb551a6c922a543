use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::data_source::SourceConfig;
use crate::data_source::serial::DEFAULT_BAUD_RATE;
use crate::error::VacuumError;
use crate::processing::decision::{DecisionConfig, MINDIFF, MINPRESS};
use crate::processing::quick_check::{DEFAULT_MARGIN_KPA, QuickCheck};
use crate::protocol::{Channel, TimeMode};
use crate::service::state::{DeviceState, RunnerSettings};

#[derive(Parser, Debug)]
#[command(name = "vacuum-leak-service")]
#[command(about = "Vacuum leak-test controller")]
#[command(version)]
pub struct Cli {
    /// HTTP server port
    #[arg(short, long, default_value = "8100", env = "VACUUM_LISTEN")]
    pub listen: u16,

    /// HTTP server host
    #[arg(long, default_value = "0.0.0.0", env = "VACUUM_HOST")]
    pub host: String,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Sensor channel (1 = VAC1, 2 = VAC2)
    #[arg(long, default_value = "1")]
    pub channel: u8,

    /// Test length mode: 1 = none, 2 = 300 s, 3 = 180 s, 4 = 120 s, 5 = 30 s
    #[arg(long, default_value = "1")]
    pub time_mode: u8,

    /// Target pressure in kPa
    #[arg(long, default_value = "65")]
    pub pressure_kpa: f64,

    /// Milliseconds between samples (two samples per test second)
    #[arg(long, default_value = "500")]
    pub sample_interval_ms: u64,

    /// Consecutive acquisition failures before a session is aborted
    #[arg(long, default_value = "3")]
    pub max_acquisition_failures: u32,

    /// Minimum acceptable stop pressure in kPa
    #[arg(long, default_value_t = MINPRESS)]
    pub min_press: f64,

    /// Maximum acceptable pressure differential in kPa
    #[arg(long, default_value_t = MINDIFF)]
    pub min_diff: f64,

    /// Quick-check tolerance below the target pressure in kPa
    #[arg(long, default_value_t = DEFAULT_MARGIN_KPA)]
    pub quick_check_margin: f64,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Mode {
    /// Connect to the sensor board via serial port
    Serial(SerialArgs),

    /// Replay a recorded sensor log
    Playback(PlaybackArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SerialArgs {
    /// Serial port device path (e.g., COM4 on Windows, /dev/ttyUSB0 on Linux).
    /// Auto-detects a USB/COM port when omitted.
    #[arg(short, long)]
    pub device: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
}

#[derive(Args, Debug, Clone)]
pub struct PlaybackArgs {
    /// Path to log file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Loop playback when file ends
    #[arg(long, default_value = "false")]
    pub loop_playback: bool,
}

impl Cli {
    /// Convert CLI args to SourceConfig
    pub fn to_source_config(&self) -> Option<SourceConfig> {
        match &self.mode {
            Some(Mode::Serial(args)) => Some(SourceConfig::Serial {
                port: args.device.clone(),
                baud_rate: args.baud,
            }),
            Some(Mode::Playback(args)) => Some(SourceConfig::Playback {
                log_file: args.file.clone(),
                loop_playback: args.loop_playback,
            }),
            None => None,
        }
    }

    pub fn to_decision_config(&self) -> DecisionConfig {
        DecisionConfig {
            min_press: self.min_press,
            min_diff: self.min_diff,
            ..DecisionConfig::default()
        }
    }

    /// Build the initial device state, validating channel and time mode
    pub fn to_device_state(&self) -> Result<DeviceState, VacuumError> {
        let channel = Channel::try_from(self.channel)?;
        let time_mode = TimeMode::try_from(self.time_mode)?;

        if self.sample_interval_ms == 0 {
            return Err(VacuumError::Config(
                "sample interval must be greater than zero".into(),
            ));
        }

        let quick_check = QuickCheck::new(self.pressure_kpa).with_margin(self.quick_check_margin);
        let mut state = DeviceState::new(
            channel,
            time_mode,
            self.pressure_kpa,
            self.to_decision_config(),
            quick_check,
        );
        state.runner = RunnerSettings {
            sample_interval: Duration::from_millis(self.sample_interval_ms),
            max_acquisition_failures: self.max_acquisition_failures.max(1),
        };

        Ok(state)
    }
}
