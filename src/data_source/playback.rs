use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use super::PressureSource;
use crate::error::VacuumError;
use crate::protocol::{Channel, ParsedLine, RawCode, parse_line};

static TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})?)\s+(.*)$")
        .unwrap()
});

/// A recorded acquisition with its timestamp
#[derive(Debug, Clone, PartialEq)]
struct RecordedSample {
    timestamp: DateTime<Utc>,
    line: ParsedLine,
}

/// Pressure source replaying a recorded sensor log
///
/// Each `measure_once` call consumes the next recorded acquisition. Log lines
/// look like `2025-01-15T10:30:00.500 VAC1 95` or `... VAC1 TIMEOUT`.
pub struct PlaybackPressureSource {
    log_file: PathBuf,
    loop_playback: bool,
    samples: Vec<RecordedSample>,
    cursor: usize,
    connected: bool,
}

impl PlaybackPressureSource {
    pub fn new(log_file: PathBuf, loop_playback: bool) -> Self {
        Self {
            log_file,
            loop_playback,
            samples: Vec::new(),
            cursor: 0,
            connected: false,
        }
    }

    /// Parse a timestamped line from the log file
    fn parse_timestamped_line(line: &str) -> Option<RecordedSample> {
        let caps = TIMESTAMP_REGEX.captures(line.trim())?;
        let timestamp_str = caps.get(1)?.as_str();
        let content = caps.get(2)?.as_str();

        // Try parsing with timezone
        let timestamp = DateTime::parse_from_rfc3339(timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                // Try without timezone, assume UTC
                NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(|ndt| ndt.and_utc())
            })
            .or_else(|_| {
                NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%dT%H:%M:%S")
                    .map(|ndt| ndt.and_utc())
            })
            .ok()?;

        match parse_line(content) {
            line @ (ParsedLine::Reading { .. } | ParsedLine::NoResponse { .. }) => {
                Some(RecordedSample { timestamp, line })
            }
            ParsedLine::Unknown(_) => None,
        }
    }

    fn parse_log(contents: &str) -> Vec<RecordedSample> {
        contents
            .lines()
            .filter_map(Self::parse_timestamped_line)
            .collect()
    }
}

#[async_trait]
impl PressureSource for PlaybackPressureSource {
    async fn connect(&mut self, _target: Option<String>) -> Result<(), VacuumError> {
        let contents = tokio::fs::read_to_string(&self.log_file).await?;
        let samples = Self::parse_log(&contents);

        if samples.is_empty() {
            return Err(VacuumError::DataSource(format!(
                "No recorded samples in {:?}",
                self.log_file
            )));
        }

        tracing::info!(
            "Playback loaded {} samples from {:?}",
            samples.len(),
            self.log_file
        );

        self.samples = samples;
        self.cursor = 0;
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), VacuumError> {
        self.connected = false;
        self.samples.clear();
        self.cursor = 0;

        tracing::info!("Playback source closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn measure_once(&mut self, channel: Channel) -> Result<RawCode, VacuumError> {
        if !self.connected {
            return Err(VacuumError::NotConnected);
        }

        if self.cursor >= self.samples.len() {
            if !self.loop_playback {
                return Err(VacuumError::DataSource("Playback finished".into()));
            }
            tracing::info!("Looping playback from start");
            self.cursor = 0;
        }

        let sample = &self.samples[self.cursor];
        self.cursor += 1;

        tracing::trace!("Replaying sample recorded at {}", sample.timestamp);

        match sample.line {
            ParsedLine::Reading { raw, .. } => Ok(raw),
            _ => Err(VacuumError::NoResponse(channel)),
        }
    }

    fn name(&self) -> &str {
        self.log_file.to_str().unwrap_or("playback")
    }
}
