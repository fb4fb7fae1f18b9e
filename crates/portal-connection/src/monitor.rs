//! Connection state store
//!
//! [`ConnectionMonitor`] is the single owner of the application's view of
//! backend reachability. It combines the probe cache, the timeout executor
//! and the reconnection scheduler, and runs the periodic background check.
//!
//! # Example
//!
//! ```ignore
//! use portal_connection::monitor::{ConnectionMonitor, MonitorConfig};
//!
//! let monitor = ConnectionMonitor::builder(store)
//!     .config(MonitorConfig::from_config(&config))
//!     .notifier(notifier)
//!     .build();
//!
//! let handle = monitor.spawn_background();
//! if !monitor.check_connection(false).await {
//!     println!("{}", monitor.snapshot().summary());
//! }
//! handle.shutdown().await;
//! ```

mod config;
mod connection_monitor;
mod state;


pub use config::{MIN_CHECK_INTERVAL, MonitorConfig};
pub use connection_monitor::{ConnectionMonitor, ConnectionMonitorBuilder, MonitorHandle};
pub use state::ConnectionState;
