//! Reconnection scheduling after a failed background check
//!
//! This module provides the capped exponential backoff and the scheduler
//! that drives a bounded sequence of forced probes until the backend answers
//! or the attempts run out.
//!
//! # Example
//!
//! ```ignore
//! use portal_connection::reconnect::{ReconnectConfig, ReconnectOutcome, ReconnectScheduler};
//!
//! let scheduler = ReconnectScheduler::new(ReconnectConfig::default());
//! match scheduler.run(&target, &cancel).await {
//!     ReconnectOutcome::Restored { attempts, .. } => println!("back after {attempts}"),
//!     ReconnectOutcome::GaveUp { attempts } => println!("gave up after {attempts}"),
//!     _ => {}
//! }
//! ```

mod backoff;
mod scheduler;


pub use backoff::BackoffStrategy;
pub use scheduler::{
    ReconnectConfig, ReconnectEvent, ReconnectOutcome, ReconnectPhase, ReconnectScheduler,
    ReconnectTarget,
};
