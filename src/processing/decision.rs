use serde::Serialize;

use super::moving_average::{MAXAVG, MovingAverageWindow};
use crate::protocol::TimeMode;

/// Samples taken per duration unit
pub const DIV: u32 = 2;
/// Warm-up length in duration units
pub const STARTOFFSET: u32 = 7;
/// Minimum acceptable stop pressure (kPa)
pub const MINPRESS: f64 = 62.0;
/// Maximum acceptable leak differential (kPa)
pub const MINDIFF: f64 = 1.0;
/// Upper reference pressure (kPa). Not read by the decision logic.
pub const MAXPRESS: f64 = 67.0;
/// Start pressures above this are treated as sensor bias
pub const OFFSET_REFERENCE_KPA: f64 = 65.0;

/// Thresholds and timing of the phased leak test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionConfig {
    pub div: u32,
    pub start_offset: u32,
    pub min_press: f64,
    pub min_diff: f64,
    pub max_press: f64,
    pub offset_reference: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            div: DIV,
            start_offset: STARTOFFSET,
            min_press: MINPRESS,
            min_diff: MINDIFF,
            max_press: MAXPRESS,
            offset_reference: OFFSET_REFERENCE_KPA,
        }
    }
}

/// Test phase, selected purely from the sample counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    WarmUp,
    Calibration,
    ActiveTest,
    Timeout,
}

/// Last counter of each phase. Every boundary belongs to the lower phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseBoundaries {
    pub warmup_end: u32,
    pub calib_end: u32,
    pub test_end: u32,
}

impl PhaseBoundaries {
    pub fn new(config: &DecisionConfig, duration_units: u32) -> Self {
        let warmup_end = config.start_offset * config.div;
        let calib_end = warmup_end + MAXAVG as u32;
        let test_end = (duration_units + config.start_offset) * config.div + MAXAVG as u32;

        Self {
            warmup_end,
            calib_end,
            test_end,
        }
    }

    pub fn phase(&self, counter: u32) -> Phase {
        if counter <= self.warmup_end {
            Phase::WarmUp
        } else if counter <= self.calib_end {
            Phase::Calibration
        } else if counter <= self.test_end {
            Phase::ActiveTest
        } else {
            Phase::Timeout
        }
    }
}

/// Result of one evaluation. Pressures are only meaningful when `ok` is true.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub counter: u32,
    pub phase: Phase,
    /// Sample that was evaluated (kPa)
    pub pressure: f64,
    pub start_pressure: f64,
    pub stop_pressure: f64,
    pub diff_pressure: f64,
    pub offset_pressure: f64,
    pub pass: bool,
    pub stop: bool,
    pub ok: bool,
}

impl Verdict {
    fn initial() -> Self {
        Self {
            counter: 0,
            phase: Phase::WarmUp,
            pressure: 0.0,
            start_pressure: 0.0,
            stop_pressure: 0.0,
            diff_pressure: 0.0,
            offset_pressure: 0.0,
            pass: true,
            stop: false,
            ok: true,
        }
    }
}

/// State of one leak-test run
#[derive(Debug, Clone, PartialEq)]
pub struct TestSession {
    pub time_mode: TimeMode,
    pub duration_units: u32,
    pub pressure_target_kpa: f64,
    pub elapsed_steps: u32,
    pub sample_counter: u32,
    pub offset_pressure: f64,
    pub start_pressure: f64,
    pub stop_pressure: f64,
    pub diff_pressure: f64,
    pub last_pass: bool,
    pub last_stop: bool,
    pub start_window: MovingAverageWindow,
    pub stop_window: MovingAverageWindow,
}

impl TestSession {
    pub fn new(time_mode: TimeMode, pressure_target_kpa: f64) -> Self {
        Self {
            time_mode,
            duration_units: time_mode.duration_units(),
            pressure_target_kpa,
            elapsed_steps: 0,
            sample_counter: 0,
            offset_pressure: 0.0,
            start_pressure: 0.0,
            stop_pressure: 0.0,
            diff_pressure: 0.0,
            last_pass: true,
            last_stop: false,
            start_window: MovingAverageWindow::new(),
            stop_window: MovingAverageWindow::new(),
        }
    }
}

/// Phased leak-test decision engine
///
/// Feed one sample per call with a counter that starts at 1 and increases by
/// one per sample (`div` samples per duration unit). The engine cannot detect
/// skipped or repeated counters.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: DecisionConfig,
    session: TestSession,
    boundaries: PhaseBoundaries,
    last_verdict: Verdict,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig, time_mode: TimeMode, pressure_target_kpa: f64) -> Self {
        let session = TestSession::new(time_mode, pressure_target_kpa);
        let boundaries = PhaseBoundaries::new(&config, session.duration_units);

        Self {
            config,
            session,
            boundaries,
            last_verdict: Verdict::initial(),
        }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    pub fn session(&self) -> &TestSession {
        &self.session
    }

    pub fn boundaries(&self) -> PhaseBoundaries {
        self.boundaries
    }

    pub fn last_verdict(&self) -> &Verdict {
        &self.last_verdict
    }

    pub fn phase_for(&self, counter: u32) -> Phase {
        self.boundaries.phase(counter)
    }

    /// Change the configured test length. Takes effect from the next sample.
    pub fn set_time_mode(&mut self, time_mode: TimeMode) {
        self.session.time_mode = time_mode;
        self.session.duration_units = time_mode.duration_units();
        self.session.elapsed_steps = 0;
        self.boundaries = PhaseBoundaries::new(&self.config, self.session.duration_units);

        tracing::info!(
            "Time mode set to {} ({} duration units)",
            time_mode.as_u8(),
            self.session.duration_units
        );
    }

    pub fn set_pressure_target(&mut self, kpa: f64) {
        self.session.pressure_target_kpa = kpa;
    }

    /// Start a fresh session, same as evaluating counter 1
    pub fn start(&mut self) {
        self.session = TestSession::new(self.session.time_mode, self.session.pressure_target_kpa);
        self.last_verdict = Verdict::initial();

        tracing::info!(
            "Session started: warm-up until {}, calibration until {}, test until {}",
            self.boundaries.warmup_end,
            self.boundaries.calib_end,
            self.boundaries.test_end
        );
    }

    pub fn reset(&mut self) {
        self.start();
    }

    /// Evaluate one sample
    ///
    /// `sample` is `None` when acquisition failed; the session is left
    /// untouched and the previous verdict comes back with `ok == false`.
    pub fn evaluate(&mut self, counter: u32, sample: Option<f64>) -> Verdict {
        let Some(pressure) = sample else {
            tracing::warn!("Acquisition failed at counter {}, session unchanged", counter);
            return Verdict {
                counter,
                ok: false,
                ..self.last_verdict.clone()
            };
        };

        let phase = self.boundaries.phase(counter);
        let session = &mut self.session;
        session.sample_counter = counter;
        session.elapsed_steps = counter / self.config.div;

        match phase {
            Phase::WarmUp => {
                session.diff_pressure = 0.0;
                session.offset_pressure = 0.0;
                session.start_pressure = 0.0;
                session.stop_pressure = 0.0;
                session.start_window.reset_count();
                session.stop_window.reset_count();

                if counter == 1 {
                    session.start_window.clear();
                    session.stop_window.clear();
                }

                session.last_pass = true;
                session.last_stop = false;
            }
            Phase::Calibration => {
                let start_mean = session.start_window.insert(pressure);
                let stop_mean = session.stop_window.insert(pressure);

                session.offset_pressure = (start_mean - self.config.offset_reference).max(0.0);
                session.start_pressure = start_mean - session.offset_pressure;
                session.stop_pressure = stop_mean;
                session.diff_pressure = 0.0;
                session.last_pass = true;
                session.last_stop = false;
            }
            Phase::ActiveTest | Phase::Timeout => {
                session.stop_pressure =
                    session.stop_window.insert(pressure) - session.offset_pressure;
                session.diff_pressure = session.stop_pressure - session.start_pressure;

                let pass = session.stop_pressure >= self.config.min_press
                    && session.diff_pressure.abs() <= self.config.min_diff;

                session.last_pass = pass;
                session.last_stop = phase == Phase::Timeout || !pass;
            }
        }

        let verdict = Verdict {
            counter,
            phase,
            pressure,
            start_pressure: session.start_pressure,
            stop_pressure: session.stop_pressure,
            diff_pressure: session.diff_pressure,
            offset_pressure: session.offset_pressure,
            pass: session.last_pass,
            stop: session.last_stop,
            ok: true,
        };

        tracing::debug!(
            "Counter {} {:?}: pressure={:.2}, start={:.2}, stop={:.2}, diff={:.2}, pass={}, stop={}",
            counter,
            phase,
            pressure,
            verdict.start_pressure,
            verdict.stop_pressure,
            verdict.diff_pressure,
            verdict.pass,
            verdict.stop
        );

        self.last_verdict = verdict.clone();
        verdict
    }
}
