pub mod runner;
pub mod state;

pub use runner::{SessionRunner, acquire_pressure};
pub use state::{AppContext, DeviceState, SessionStatus};
