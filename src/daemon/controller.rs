//! Single-threaded cooperative event loop driving one Sync Engine. Built
//! directly on `tokio::time::interval` + `tokio::sync::mpsc` rather than
//! a cron-style scheduler: the controller's timer is a flat period with
//! debounce, not a calendar schedule (drop recorded in DESIGN.md).

use super::SyncEngine;
use crate::config::DaemonConfig;
use crate::logging::DaemonLog;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Startup,
    Scheduled,
    Wake,
    Change,
}

impl SyncTrigger {
    fn label(&self) -> &'static str {
        match self {
            SyncTrigger::Startup => "startup",
            SyncTrigger::Scheduled => "scheduled",
            SyncTrigger::Wake => "wake",
            SyncTrigger::Change => "change",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncStatusSnapshot {
    pub state: String,
    pub last_sync_time: Option<i64>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DaemonStatus {
    pub running: bool,
    pub pid: u32,
    pub last_sync_time: Option<i64>,
    pub last_sync_state: String,
    pub last_error: Option<String>,
}

/// Drives one Sync Engine on a schedule: one controller per data kind,
/// the embedding CLI instantiates this twice, once for mail and once for
/// calendar.
pub struct DaemonController<E: SyncEngine> {
    engine: E,
    config: DaemonConfig,
    log: DaemonLog,
    is_syncing: AtomicBool,
    last_sync_start: Mutex<Option<Instant>>,
}

impl<E: SyncEngine> DaemonController<E> {
    pub fn new(engine: E, config: DaemonConfig, log: DaemonLog) -> Self {
        Self {
            engine,
            config,
            log,
            is_syncing: AtomicBool::new(false),
            last_sync_start: Mutex::new(None),
        }
    }

    pub async fn status(&self) -> DaemonStatus {
        let snapshot = self.engine.status_snapshot().await;
        DaemonStatus {
            running: self.is_syncing.load(Ordering::SeqCst),
            pid: std::process::id(),
            last_sync_time: snapshot.last_sync_time,
            last_sync_state: snapshot.state,
            last_error: snapshot.last_error,
        }
    }

    /// Runs the cooperative event loop until `shutdown` fires. On start,
    /// performs one sync immediately so the mirror is hot before the
    /// timer begins.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let (tx, mut rx) = mpsc::channel::<SyncTrigger>(8);
        let mut timer = tokio::time::interval(Duration::from_secs(self.config.periodic_interval_secs));
        timer.tick().await; // first tick fires immediately; consumed here

        self.trigger_sync(SyncTrigger::Startup).await;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let _ = tx.try_send(SyncTrigger::Scheduled);
                }
                Some(trigger) = rx.recv() => {
                    self.trigger_sync(trigger).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        self.log.info("shutdown requested, waiting for in-flight sync");
                        while self.is_syncing.load(Ordering::SeqCst) {
                            tokio::time::sleep(Duration::from_millis(50)).await;
                        }
                        self.log.info("shutdown complete");
                        break;
                    }
                }
            }
        }
    }

    pub fn sender(self: &std::sync::Arc<Self>) -> DaemonHandle<E> {
        DaemonHandle { controller: self.clone() }
    }

    /// Enqueues a trigger directly; used by hook callbacks (wake/sleep
    /// notifications) and by `run()`'s own timer arm. Applies the
    /// in-flight guard and debounce before running anything: only the
    /// first of two concurrent triggers within the debounce window runs.
    pub async fn trigger_sync(&self, trigger: SyncTrigger) -> bool {
        if self.is_syncing.swap(true, Ordering::SeqCst) {
            self.log.warn(&format!("{} sync dropped: already in flight", trigger.label()));
            return false;
        }

        {
            let mut last_start = self.last_sync_start.lock().await;
            if let Some(last) = *last_start {
                if last.elapsed() < Duration::from_secs(self.config.debounce_secs) {
                    self.log
                        .warn(&format!("{} sync dropped: within debounce window", trigger.label()));
                    self.is_syncing.store(false, Ordering::SeqCst);
                    return false;
                }
            }
            *last_start = Some(Instant::now());
        }

        self.log.info(&format!("{} sync starting", trigger.label()));
        let outcome = self.run_with_retry(trigger).await;
        match &outcome {
            Ok(()) => self.log.info(&format!("{} sync succeeded", trigger.label())),
            Err(e) => self.log.error(&format!("{} sync failed: {e}", trigger.label())),
        }

        self.is_syncing.store(false, Ordering::SeqCst);
        outcome.is_ok()
    }

    /// Retries only transient errors, exponential backoff with jitter,
    /// capped at `max_attempts`.
    async fn run_with_retry(&self, trigger: SyncTrigger) -> Result<(), E::Error> {
        let retry = self.config.retry;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.engine.run_once(trigger).await {
                Ok(()) => return Ok(()),
                Err(e) if E::is_retryable(&e) && attempt < retry.max_attempts => {
                    let delay = backoff_delay(attempt, retry.base_delay_secs, retry.max_delay_secs, retry.jitter_fraction);
                    self.log.warn(&format!(
                        "{} sync attempt {attempt} failed transiently: {e}; retrying in {:.2}s",
                        trigger.label(),
                        delay.as_secs_f64()
                    ));
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Computes `min(base * 2^(attempt-1), cap)` plus an additional random
/// delay drawn from the top half of `jitter_fraction`'s range (e.g. the
/// default 0.20 yields a 10-20% jitter band), so a burst of simultaneous
/// retries doesn't re-collide on the next attempt.
fn backoff_delay(attempt: u32, base_secs: u64, cap_secs: u64, jitter_fraction: f64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32);
    let raw = base_secs.saturating_mul(1u64.checked_shl(exponent).unwrap_or(u64::MAX).min(u64::MAX));
    let capped = raw.min(cap_secs);
    let jitter_min = (capped as f64) * (jitter_fraction / 2.0);
    let jitter_max = ((capped as f64) * jitter_fraction).max(jitter_min);
    let jitter = rand::thread_rng().gen_range(jitter_min..=jitter_max);
    Duration::from_secs_f64(capped as f64 + jitter)
}

/// A cloneable handle for feeding wake/sleep/change notifications into a
/// running controller from the embedding CLI's OS hooks.
pub struct DaemonHandle<E: SyncEngine> {
    controller: std::sync::Arc<DaemonController<E>>,
}

impl<E: SyncEngine> Clone for DaemonHandle<E> {
    fn clone(&self) -> Self {
        Self { controller: self.controller.clone() }
    }
}

impl<E: SyncEngine> DaemonHandle<E> {
    pub async fn notify_wake(&self) {
        self.controller.trigger_sync(SyncTrigger::Wake).await;
    }

    pub async fn notify_change(&self) {
        self.controller.trigger_sync(SyncTrigger::Change).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct FlakyEngine {
        attempts: AtomicU32,
        fail_until: u32,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("transient")]
    struct FlakyError;

    #[async_trait]
    impl SyncEngine for FlakyEngine {
        type Error = FlakyError;

        async fn run_once(&self, _trigger: SyncTrigger) -> Result<(), Self::Error> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt < self.fail_until {
                Err(FlakyError)
            } else {
                Ok(())
            }
        }

        fn is_retryable(_error: &Self::Error) -> bool {
            true
        }

        async fn status_snapshot(&self) -> SyncStatusSnapshot {
            SyncStatusSnapshot::default()
        }
    }

    fn fast_retry_config() -> DaemonConfig {
        let mut cfg = DaemonConfig::default();
        cfg.retry.base_delay_secs = 0;
        cfg.retry.max_delay_secs = 0;
        cfg.retry.jitter_fraction = 0.0;
        cfg.debounce_secs = 0;
        cfg
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let dir = tempdir().unwrap();
        let log = DaemonLog::open(dir.path(), "test").unwrap();
        let engine = FlakyEngine { attempts: AtomicU32::new(0), fail_until: 3 };
        let controller = DaemonController::new(engine, fast_retry_config(), log);

        let ran = controller.trigger_sync(SyncTrigger::Startup).await;
        assert!(ran);
        assert_eq!(controller.engine.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausting_retries_fails() {
        let dir = tempdir().unwrap();
        let log = DaemonLog::open(dir.path(), "test").unwrap();
        let engine = FlakyEngine { attempts: AtomicU32::new(0), fail_until: 999 };
        let mut cfg = fast_retry_config();
        cfg.retry.max_attempts = 3;
        let controller = DaemonController::new(engine, cfg, log);

        let ran = controller.trigger_sync(SyncTrigger::Startup).await;
        assert!(!ran);
        assert_eq!(controller.engine.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrent_trigger_is_dropped_while_in_flight() {
        let dir = tempdir().unwrap();
        let log = DaemonLog::open(dir.path(), "test").unwrap();
        let engine = FlakyEngine { attempts: AtomicU32::new(0), fail_until: 1 };
        let controller = Arc::new(DaemonController::new(engine, fast_retry_config(), log));

        controller.is_syncing.store(true, Ordering::SeqCst);
        let ran = controller.trigger_sync(SyncTrigger::Scheduled).await;
        assert!(!ran);
    }

    #[test]
    fn test_backoff_delay_respects_cap() {
        let delay = backoff_delay(10, 2, 60, 0.0);
        assert_eq!(delay, Duration::from_secs(60));
        let first = backoff_delay(1, 2, 60, 0.0);
        assert_eq!(first, Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_delay_jitter_is_ten_to_twenty_percent() {
        for _ in 0..50 {
            let delay = backoff_delay(10, 2, 60, 0.20).as_secs_f64();
            assert!(delay >= 66.0 && delay <= 72.0, "delay {delay} outside 10-20% jitter band");
        }
    }
}
