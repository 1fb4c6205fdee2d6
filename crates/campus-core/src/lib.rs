//! Shared ambient concerns for campus services: tracing bootstrap and
//! env-based configuration loading.

pub mod config;
pub mod tracing;
