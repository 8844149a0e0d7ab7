// Ambient concerns: configuration loading and periodic stats reporting.
pub mod config;
pub mod stats;
