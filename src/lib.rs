//! Vacuum leak-test controller
//!
//! Samples a pressure sensor over a serial link, converts raw codes to kPa and
//! runs the phased leak-test decision engine. The HTTP surface in [`api`]
//! drives sessions; [`processing`] holds the engine itself and has no I/O.

pub mod api;
pub mod config;
pub mod data_source;
pub mod error;
pub mod processing;
pub mod protocol;
pub mod service;
