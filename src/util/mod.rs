//! Small, dependency-light helpers shared across the crate.

pub use crate::sig_down::SigDown;
pub use crate::telemetry::Telemetry;
