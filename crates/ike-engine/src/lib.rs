//! Enrollment conflict detection and notification engine for inter-municipal
//! student compensation.
//!
//! The library owns the two conflict detectors (dual placements and grade
//! repetitions), the de-identification helpers used by regional reporting,
//! and the notification lifecycle that blocks compensation payments until a
//! dual placement is resolved. The HTTP service in `services/api` wires these
//! against in-memory infrastructure.

pub mod config;
pub mod enrollment;
pub mod error;
pub mod telemetry;
