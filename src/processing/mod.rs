pub mod calibration;
pub mod decision;
pub mod moving_average;
pub mod quick_check;

pub use calibration::CalibrationTable;
pub use decision::{DecisionConfig, DecisionEngine, Phase, Verdict};
pub use quick_check::{QuickCheck, QuickCheckStatus, QuickCheckTracker};
