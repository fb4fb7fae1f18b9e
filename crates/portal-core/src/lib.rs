//! Portal Core - Shared abstractions for the portal backend connection layer
//!
//! This crate provides the fundamental types that the other portal crates
//! depend on:
//!
//! - `DataStore` - Trait for the hosted backing store used as a liveness target
//! - `PortalError` - Error type shared across crates
//! - `PortalConfig` - TOML configuration for the backend and connection monitor
//! - `DevMode` - Process-wide, user-controlled degraded-mode toggle

pub mod config;
mod dev_mode;
mod error;
mod store;

pub use config::{BackendSettings, MonitorSettings, PortalConfig};
pub use dev_mode::DevMode;
pub use error::*;
pub use store::*;
