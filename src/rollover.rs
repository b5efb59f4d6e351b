//! Background driver for the day-rollover check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::errors::{LedgerError, Result};
use crate::ledger::{BudgetLedger, DayCheckOutcome};

const STOP_POLL_STEP: Duration = Duration::from_millis(100);

/// Periodically runs [`BudgetLedger::check_day`] on a dedicated thread while
/// the app is foregrounded. The check itself coalesces overlapping runs, so
/// an external [`trigger`](Self::trigger) (the app-resume path) is always
/// safe alongside the timer.
///
/// Stopping is cooperative and bounded: the thread notices the stop flag
/// within [`STOP_POLL_STEP`] and is joined on drop.
pub struct DayWatcher {
    ledger: Arc<BudgetLedger>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DayWatcher {
    pub fn spawn(ledger: Arc<BudgetLedger>, interval: Duration) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let thread_ledger = ledger.clone();
        let handle = thread::Builder::new()
            .name("daybudget-day-watcher".into())
            .spawn(move || {
                while !thread_stop.load(Ordering::Relaxed) {
                    match thread_ledger.check_day() {
                        Ok(DayCheckOutcome::Recalculated) => {
                            tracing::info!("day watcher recalculated the daily budget");
                        }
                        Ok(_) => {}
                        Err(err) => tracing::warn!(%err, "day check failed"),
                    }
                    sleep_until_stopped(interval, &thread_stop);
                }
            })
            .map_err(|err| LedgerError::Background(format!("failed to spawn day watcher: {err}")))?;
        Ok(Self {
            ledger,
            stop,
            handle: Some(handle),
        })
    }

    /// Runs one check immediately, e.g. when the app returns to the
    /// foreground.
    pub fn trigger(&self) -> Result<DayCheckOutcome> {
        self.ledger.check_day()
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DayWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sleep_until_stopped(interval: Duration, stop: &AtomicBool) {
    let mut slept = Duration::ZERO;
    while slept < interval && !stop.load(Ordering::Relaxed) {
        let step = STOP_POLL_STEP.min(interval - slept);
        thread::sleep(step);
        slept += step;
    }
}
