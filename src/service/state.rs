use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::data_source::PressureSource;
use crate::processing::{
    CalibrationTable, DecisionConfig, DecisionEngine, QuickCheck, QuickCheckTracker, Verdict,
};
use crate::protocol::{Channel, TimeMode};

/// Default quick-check and session target pressure (kPa)
pub const DEFAULT_PRESSURE_KPA: f64 = 65.0;

/// Lifecycle of the timed leak test
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    Finished { passed: bool },
    Aborted { reason: String },
}

impl SessionStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, SessionStatus::Running)
    }
}

/// Settings for the background session runner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunnerSettings {
    /// Time between samples. One duration unit spans `div` samples.
    pub sample_interval: Duration,
    /// Consecutive acquisition failures tolerated before aborting
    pub max_acquisition_failures: u32,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(500),
            max_acquisition_failures: 3,
        }
    }
}

/// Application state for the leak-test service
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub channel: Channel,
    pub calibration: CalibrationTable,
    pub engine: DecisionEngine,
    pub quick_check: QuickCheckTracker,
    pub runner: RunnerSettings,

    /// Bumped by every session start; a runner only drives the session it started
    pub session_id: u64,
    pub session_status: SessionStatus,
    pub latest_verdict: Option<Verdict>,
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new(
            Channel::default(),
            TimeMode::default(),
            DEFAULT_PRESSURE_KPA,
            DecisionConfig::default(),
            QuickCheck::new(DEFAULT_PRESSURE_KPA),
        )
    }
}

impl DeviceState {
    pub fn new(
        channel: Channel,
        time_mode: TimeMode,
        pressure_kpa: f64,
        decision: DecisionConfig,
        quick_check: QuickCheck,
    ) -> Self {
        Self {
            channel,
            calibration: CalibrationTable::default(),
            engine: DecisionEngine::new(decision, time_mode, pressure_kpa),
            quick_check: QuickCheckTracker::new(quick_check),
            runner: RunnerSettings::default(),
            session_id: 0,
            session_status: SessionStatus::Idle,
            latest_verdict: None,
            last_update: None,
        }
    }

    pub fn time_mode(&self) -> TimeMode {
        self.engine.session().time_mode
    }

    pub fn pressure_target(&self) -> f64 {
        self.engine.session().pressure_target_kpa
    }

    pub fn set_time_mode(&mut self, time_mode: TimeMode) {
        self.engine.set_time_mode(time_mode);
    }

    /// Target pressure feeds both the session record and the quick check
    pub fn set_pressure_target(&mut self, kpa: f64) {
        self.engine.set_pressure_target(kpa);
        self.quick_check.set_target(kpa);

        tracing::info!("Pressure target set to {} kPa", kpa);
    }

    /// Record a verdict produced by the engine
    pub fn record_verdict(&mut self, verdict: Verdict) {
        self.latest_verdict = Some(verdict);
        self.last_update = Some(Utc::now());
    }
}

/// Thread-safe shared state
pub type SharedState = Arc<RwLock<DeviceState>>;

/// Pressure source shared between the API and the session runner
pub type SharedSource = Arc<Mutex<Box<dyn PressureSource>>>;

/// Everything a request handler or the runner needs
#[derive(Clone)]
pub struct AppContext {
    pub state: SharedState,
    pub source: SharedSource,
}

impl AppContext {
    pub fn new(state: DeviceState, source: Box<dyn PressureSource>) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            source: Arc::new(Mutex::new(source)),
        }
    }
}
