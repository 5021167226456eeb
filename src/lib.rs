//! memcached-gmond Library
//!
//! Two independent utilities:
//!
//! - [`poller`]: a gmond metric module that polls a memcached server with the
//!   `stats` and `stats items` commands and reports every value, plus the
//!   min, max, mean and median of item ages across slabs.
//! - [`every`]: a scheduler that runs a function immediately and then on a
//!   fixed interval, with a signal-driven cooperative shutdown.
//!
//! # Usage
//!
//! ```no_run
//! use memcached_gmond::{MetricModule, Params, PollerConfig, StatsPoller};
//!
//! let mut poller = StatsPoller::with_tcp(PollerConfig::default());
//! let descriptors = poller.init(&Params::new())?;
//!
//! for descriptor in &descriptors {
//!     let value = descriptor.invoke(&mut poller)?;
//!     println!("{} => {}", descriptor.name, value);
//! }
//!
//! poller.cleanup();
//! # Ok::<(), memcached_gmond::PollerError>(())
//! ```

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod every;
pub mod module;
pub mod poller;
pub mod protocol;
pub mod value;

// Re-export main types for convenience
pub use config::{Config, PollerConfig};
pub use descriptor::MetricDescriptor;
pub use error::{PollerError, ScheduleError};
pub use every::{Interval, RepeatingTask, Scheduler};
pub use module::{MetricCallback, MetricModule, Params};
pub use poller::StatsPoller;
pub use protocol::{Connection, TcpConnection};
pub use value::{cast, format_value, StatValue};
