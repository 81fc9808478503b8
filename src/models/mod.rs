//! Data models for the HTTP load tester

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::{LoadConfig, RequestFactory};
pub use metrics::{LoadResult, ResultRecorder};
