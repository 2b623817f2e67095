//! Small helpers shared across the pipeline.

pub mod file_system;
pub mod platform;
