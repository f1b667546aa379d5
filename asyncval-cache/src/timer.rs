//! Periodic maintenance driver.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use asyncval_core::{CacheError, ExpirationHandler, Result};

/// Runs [`ExpirationHandler::handle_expiration`] at a fixed interval on the Tokio runtime.
///
/// The timer holds the handler weakly and exits once the handler is gone. Dropping
/// the timer stops it.
#[derive(Debug)]
pub struct ExpirationTimer {
    interval: Duration,
    task: JoinHandle<()>,
}

impl ExpirationTimer {
    /// Spawns the timer on the current runtime. The first pass runs one `interval`
    /// from now.
    pub fn start<H: ExpirationHandler>(handler: Weak<H>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(CacheError::ConfigError(
                "expiration interval must be greater than zero".into(),
            ));
        }
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
        let task = runtime.spawn(run(handler, interval));

        debug!(?interval, "Expiration timer started");
        Ok(Self { interval, task })
    }

    /// Returns the interval between passes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true while the timer task is alive.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the timer. A pass that is already running is not interrupted.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ExpirationTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<H: ExpirationHandler>(handler: Weak<H>, interval: Duration) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(handler) = handler.upgrade() else {
            debug!("Expiration handler dropped; stopping timer");
            break;
        };
        handler.handle_expiration();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl ExpirationHandler for Counting {
        fn handle_expiration(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Counting {
        fn passes(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_every_interval() {
        let handler = Arc::new(Counting::default());
        let timer = ExpirationTimer::start(Arc::downgrade(&handler), Duration::from_millis(10)).unwrap();

        assert_eq!(timer.interval(), Duration::from_millis(10));
        assert_eq!(handler.passes(), 0);

        time::sleep(Duration::from_millis(35)).await;
        assert_eq!(handler.passes(), 3);
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_passes() {
        let handler = Arc::new(Counting::default());
        let timer = ExpirationTimer::start(Arc::downgrade(&handler), Duration::from_millis(10)).unwrap();

        time::sleep(Duration::from_millis(15)).await;
        timer.stop();
        let passes = handler.passes();

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handler.passes(), passes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_handler_dropped() {
        let handler = Arc::new(Counting::default());
        let timer = ExpirationTimer::start(Arc::downgrade(&handler), Duration::from_millis(10)).unwrap();

        drop(handler);
        time::sleep(Duration::from_millis(25)).await;
        assert!(!timer.is_running());
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let handler = Arc::new(Counting::default());
        let result = ExpirationTimer::start(Arc::downgrade(&handler), Duration::ZERO);
        assert!(matches!(result, Err(CacheError::ConfigError(_))));
    }

    #[test]
    fn test_requires_runtime() {
        let handler = Arc::new(Counting::default());
        let result = ExpirationTimer::start(Arc::downgrade(&handler), Duration::from_millis(10));
        assert!(matches!(result, Err(CacheError::NoRuntime)));
    }
}
