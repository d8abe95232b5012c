//! Infrastructure adapters and runtime bootstrap.

pub mod documents;
pub mod error;
pub mod telemetry;
