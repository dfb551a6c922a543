use serde::Serialize;

/// Default tolerance below the target pressure (kPa)
pub const DEFAULT_MARGIN_KPA: f64 = 3.0;

/// Unfiltered single-reading check used outside a timed session
///
/// Independent of the phased engine's thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuickCheck {
    pub target_kpa: f64,
    pub margin_kpa: f64,
}

impl QuickCheck {
    pub fn new(target_kpa: f64) -> Self {
        Self {
            target_kpa,
            margin_kpa: DEFAULT_MARGIN_KPA,
        }
    }

    pub fn with_margin(mut self, margin_kpa: f64) -> Self {
        self.margin_kpa = margin_kpa;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.target_kpa - self.margin_kpa
    }

    pub fn passes(&self, reading_kpa: f64) -> bool {
        reading_kpa >= self.threshold()
    }
}

/// Outcome of the most recent quick-check step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuickCheckStatus {
    pub last_pressure: f64,
    pub last_pass: bool,
    pub elapsed_steps: u32,
    pub threshold: f64,
}

/// Running state of the quick-check mode: one reading per step
#[derive(Debug, Clone)]
pub struct QuickCheckTracker {
    check: QuickCheck,
    elapsed_steps: u32,
    last_pressure: f64,
    last_pass: bool,
}

impl QuickCheckTracker {
    pub fn new(check: QuickCheck) -> Self {
        Self {
            check,
            elapsed_steps: 0,
            last_pressure: 0.0,
            last_pass: true,
        }
    }

    pub fn set_target(&mut self, target_kpa: f64) {
        self.check.target_kpa = target_kpa;
    }

    pub fn start(&mut self) {
        self.elapsed_steps = 0;
        self.last_pressure = 0.0;
        self.last_pass = true;
    }

    /// Record a reading and return the updated status
    pub fn record(&mut self, reading_kpa: f64) -> QuickCheckStatus {
        self.last_pressure = reading_kpa;
        self.elapsed_steps += 1;
        self.last_pass = self.check.passes(reading_kpa);

        tracing::debug!(
            "Quick check: {:.2} kPa, elapsed {}, {}",
            reading_kpa,
            self.elapsed_steps,
            if self.last_pass { "PASS" } else { "FAIL" }
        );

        self.status()
    }

    pub fn status(&self) -> QuickCheckStatus {
        QuickCheckStatus {
            last_pressure: self.last_pressure,
            last_pass: self.last_pass,
            elapsed_steps: self.elapsed_steps,
            threshold: self.check.threshold(),
        }
    }
}
