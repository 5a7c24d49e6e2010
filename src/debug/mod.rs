// Debug module - Signal tracing for the scan-out pipeline
//
// This module provides:
// - Timing generator snapshots with readable formatting
// - A trace logger for timing steps and display output samples
//
// Tracing is off unless a logger is attached and its level is `Trace`.

pub mod logger;
pub mod timing;

pub use logger::{LogLevel, Logger, TraceEntry};
pub use timing::TimingSnapshot;
