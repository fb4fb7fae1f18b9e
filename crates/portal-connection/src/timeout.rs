//! Deadline and retry wrapper for backend calls
//!
//! Every probe issued by this crate goes through [`with_timeout`], which gives
//! each attempt its own cancellation token and deadline, and retries with
//! exponential backoff.
//!
//! # Example
//!
//! ```ignore
//! use portal_connection::timeout::{with_timeout, TimeoutOptions};
//! use std::time::Duration;
//!
//! let options = TimeoutOptions::new(Duration::from_secs(10)).with_retries(2);
//! let outcome = with_timeout(
//!     |cancel| async move { store.select_single(&query, &cancel).await },
//!     &options,
//! )
//! .await;
//! ```

mod executor;


pub use executor::{ErrorCallback, RetryContext, TimeoutCallback, TimeoutOptions, with_timeout};
