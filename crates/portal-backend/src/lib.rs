//! Portal Backend - Hosted backing store access
//!
//! This crate provides the HTTP implementation of the `DataStore` trait
//! defined in `portal-core`, talking to the backend's PostgREST interface.

mod rest;

pub use rest::{RestStore, backend_error, transport_error};

/// Re-export commonly used types from portal-core
pub use portal_core::{DataStore, PortalError, ProbeQuery, Result};
