use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::portfolio::PortfolioStore;

/// Default refresh period (5 minutes).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Periodic driver for [`PortfolioStore::refresh_all`].
///
/// Starts disabled to bound external call volume. `enable`/`disable` are
/// idempotent: a double enable keeps the existing timer task. Ticks run
/// sequentially within one task and the store's refresh gate serializes them
/// against manual refreshes, so two cycles never run concurrently.
pub struct RefreshScheduler {
    store: Arc<PortfolioStore>,
    period: Duration,
    task: StdMutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(store: Arc<PortfolioStore>) -> Self {
        Self {
            store,
            period: DEFAULT_REFRESH_INTERVAL,
            task: StdMutex::new(None),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Start the recurring refresh timer. No-op when already enabled.
    pub fn enable(&self) {
        let mut task = self.task.lock().expect("scheduler lock poisoned");
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        info!(period_secs = self.period.as_secs(), "Auto-refresh enabled");
        let store = Arc::clone(&self.store);
        let period = self.period;
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so the first
            // refresh happens one full period after enabling.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = store.refresh_all().await {
                    warn!(error = %err, "Scheduled refresh failed");
                }
            }
        }));
    }

    /// Cancel the refresh timer. No-op when already disabled.
    pub fn disable(&self) {
        let mut task = self.task.lock().expect("scheduler lock poisoned");
        if let Some(handle) = task.take() {
            handle.abort();
            info!("Auto-refresh disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.task
            .lock()
            .expect("scheduler lock poisoned")
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.disable();
    }
}
