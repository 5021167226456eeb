//! Run a function on a fixed interval.
//!
//! `Scheduler::every` calls the function once right away, then again every
//! time the interval elapses. Each firing runs on its own blocking thread, so
//! a slow function may overlap with the next firing; guarding shared state is
//! up to the function.
//!
//! Repeating tasks listen on a shared cancellation token. `Scheduler::join`
//! parks the caller until SIGINT or SIGTERM, then cancels every task between
//! firings. A firing that is already running completes normally.
//!
//! ```no_run
//! use memcached_gmond::every::{Interval, Scheduler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let scheduler = Scheduler::new();
//!     scheduler
//!         .every(Interval::seconds(5.0).as_duration(), || println!("tick"))
//!         .expect("runtime is running");
//!     scheduler.join().await;
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ScheduleError;

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

/// A delay built from calendar components, summed like `timedelta`.
///
/// Components may be fractional or negative; the total is rounded to the
/// nearest microsecond and clamped at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interval {
    #[serde(skip_serializing_if = "is_zero")]
    pub weeks: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub days: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub hours: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub minutes: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub seconds: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub milliseconds: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub microseconds: f64,
}

impl Interval {
    pub fn weeks(weeks: f64) -> Self {
        Self {
            weeks,
            ..Self::default()
        }
    }

    pub fn days(days: f64) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    pub fn hours(hours: f64) -> Self {
        Self {
            hours,
            ..Self::default()
        }
    }

    pub fn minutes(minutes: f64) -> Self {
        Self {
            minutes,
            ..Self::default()
        }
    }

    pub fn seconds(seconds: f64) -> Self {
        Self {
            seconds,
            ..Self::default()
        }
    }

    pub fn milliseconds(milliseconds: f64) -> Self {
        Self {
            milliseconds,
            ..Self::default()
        }
    }

    pub fn microseconds(microseconds: f64) -> Self {
        Self {
            microseconds,
            ..Self::default()
        }
    }

    /// Total length of the interval. Saturates instead of overflowing;
    /// negative and NaN totals become zero.
    pub fn as_duration(&self) -> Duration {
        let micros = self.weeks * 604_800e6
            + self.days * 86_400e6
            + self.hours * 3_600e6
            + self.minutes * 60e6
            + self.seconds * 1e6
            + self.milliseconds * 1e3
            + self.microseconds;
        // `as` saturates and maps NaN to 0.
        Duration::from_micros(micros.round() as u64)
    }
}

impl From<Interval> for Duration {
    fn from(interval: Interval) -> Self {
        interval.as_duration()
    }
}

/// Handle to one repeating function.
pub struct RepeatingTask<F> {
    func: Arc<F>,
    interval: Duration,
    token: CancellationToken,
}

impl<F> RepeatingTask<F> {
    /// The scheduled function, unchanged.
    pub fn func(&self) -> &F {
        &self.func
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stops future firings. A firing in progress is not interrupted.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Owner of all repeating tasks started through it.
pub struct Scheduler {
    token: CancellationToken,
    tickers: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tickers: Mutex::new(Vec::new()),
        }
    }

    /// Calls `func` now, then again after every `interval`.
    ///
    /// The first call happens on the caller's thread before this returns.
    /// Later calls run on the blocking pool of the current tokio runtime.
    /// Return values are discarded.
    pub fn every<F, R>(&self, interval: Duration, func: F) -> Result<RepeatingTask<F>, ScheduleError>
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: 'static,
    {
        if interval.is_zero() {
            return Err(ScheduleError::ZeroInterval);
        }
        let runtime = Handle::try_current()?;

        let func = Arc::new(func);
        let _ = (*func)();

        let token = self.token.child_token();
        let ticker = runtime.spawn(tick(interval, Arc::clone(&func), token.clone()));
        self.tickers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ticker);

        debug!("Scheduled function every {:?}", interval);
        Ok(RepeatingTask {
            func,
            interval,
            token,
        })
    }

    /// Waits for SIGINT (Ctrl+C) or SIGTERM, then stops every task.
    pub async fn join(&self) {
        self.join_until(shutdown_signal()).await
    }

    /// Like `join`, with a caller-provided shutdown trigger.
    pub async fn join_until<S>(&self, signal: S)
    where
        S: Future<Output = ()>,
    {
        tokio::select! {
            _ = signal => {}
            _ = self.token.cancelled() => {}
        }
        self.shutdown().await;
    }

    /// Cancels every task and waits for the tickers to exit.
    pub async fn shutdown(&self) {
        self.token.cancel();
        let tickers = std::mem::take(
            &mut *self.tickers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let count = tickers.len();
        for ticker in tickers {
            if let Err(e) = ticker.await {
                warn!("Repeating task ended abnormally: {}", e);
            }
        }
        info!("Stopped {} repeating task(s)", count);
    }

    pub fn is_shut_down(&self) -> bool {
        self.token.is_cancelled()
    }
}

async fn tick<F, R>(interval: Duration, func: Arc<F>, token: CancellationToken)
where
    F: Fn() -> R + Send + Sync + 'static,
    R: 'static,
{
    let mut firings: u64 = 0;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {
                firings += 1;
                let func = Arc::clone(&func);
                let firing = tokio::task::spawn_blocking(move || {
                    let _ = (*func)();
                });
                // Watch the firing without holding up the next one.
                tokio::spawn(async move {
                    if let Err(e) = firing.await {
                        if e.is_panic() {
                            warn!("Scheduled function panicked: {}", e);
                        }
                    }
                });
            }
        }
    }
    debug!("Repeating task cancelled after {} firing(s)", firings);
}

/// Resolves on SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_components_add_up() {
        assert_eq!(Interval::seconds(5.0).as_duration(), Duration::from_secs(5));
        assert_eq!(Interval::weeks(1.0).as_duration(), Duration::from_secs(604_800));
        let mixed = Interval {
            hours: 1.0,
            minutes: 2.0,
            milliseconds: 1500.0,
            microseconds: 250.0,
            ..Interval::default()
        };
        assert_eq!(
            mixed.as_duration(),
            Duration::from_secs(3722) + Duration::from_micros(500_250)
        );
        assert!(Interval::default().as_duration().is_zero());
    }

    #[test]
    fn test_interval_accepts_fractions_and_clamps_negatives() {
        assert_eq!(Interval::seconds(0.5).as_duration(), Duration::from_millis(500));
        assert_eq!(Interval::hours(1.5).as_duration(), Duration::from_secs(5400));
        assert_eq!(Interval::microseconds(0.4).as_duration(), Duration::ZERO);
        assert_eq!(Interval::seconds(-3.0).as_duration(), Duration::ZERO);
        let offset = Interval {
            minutes: 1.0,
            seconds: -30.0,
            ..Interval::default()
        };
        assert_eq!(offset.as_duration(), Duration::from_secs(30));
        assert!(Interval::seconds(f64::NAN).as_duration().is_zero());

        let parsed: Interval = serde_json::from_str(r#"{"seconds": 0.5}"#).unwrap();
        assert_eq!(parsed.as_duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_interval_deserializes_partial_components() {
        let interval: Interval = serde_json::from_str(r#"{"minutes": 1, "seconds": 30}"#).unwrap();
        assert_eq!(interval.as_duration(), Duration::from_secs(90));
        assert_eq!(
            serde_json::to_string(&Interval::days(2.0)).unwrap(),
            r#"{"days":2.0}"#
        );
    }

    #[test]
    fn test_every_requires_runtime() {
        let scheduler = Scheduler::new();
        let result = scheduler.every(Duration::from_secs(1), || ());
        assert!(matches!(result, Err(ScheduleError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn test_every_rejects_zero_interval() {
        let scheduler = Scheduler::new();
        let result = scheduler.every(Duration::ZERO, || ());
        assert!(matches!(result, Err(ScheduleError::ZeroInterval)));
    }
}
