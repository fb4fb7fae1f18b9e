//! Liveness probing for the hosted backend
//!
//! This module provides the probe itself, the short-lived cache that keeps
//! concurrent callers from probing redundantly, and classification of probe
//! failures into user-facing categories.
//!
//! # Example
//!
//! ```ignore
//! use portal_connection::health::{run_probe, probe_options, ConnectionCache};
//!
//! let report = run_probe(store.as_ref(), &query, &probe_options()).await;
//! cache.record_report(&report);
//! println!("connected: {}, latency: {:?}", report.is_connected, report.response_time);
//! ```

mod cache;
mod classify;
mod probe;


pub use cache::{CachedProbe, ConnectionCache};
pub use classify::{ErrorKind, classify, classify_message};
pub use probe::{PROBE_TIMEOUT, ProbeReport, probe_options, probe_store, run_probe};
