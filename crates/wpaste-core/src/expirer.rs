//! Entry expiry, passive and active.
//!
//! Passive expiry is a predicate checked on every read, edit and delete: an
//! entry past `created_at + ttl` is reported as gone while it still sits in
//! the store. Active expiry is the [`Sweeper`], a background task that
//! physically removes entries once they are also past the grace period.
//!
//! # Sweep
//!
//! Each pass runs in two phases:
//! 1. A read transaction scans a snapshot of the table and collects
//!    candidate names. It holds no lock, so requests proceed meanwhile.
//! 2. One write transaction re-checks each candidate and deletes it. Only
//!    this phase waits for, and holds up, other writers.
//!
//! Ticks that fire while a pass is still running are skipped, never queued.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wpaste_store::{EntryStore, StoreError, StoreResult, WriteTxn};
use wpaste_types::{Clock, Entry};

/// The TTL rule shared by the passive check and the sweep.
#[derive(Clone, Copy, Debug)]
pub struct Expirer {
    grace: chrono::Duration,
}

impl Expirer {
    pub fn new(grace: chrono::Duration) -> Self {
        Self { grace }
    }

    pub fn grace(&self) -> chrono::Duration {
        self.grace
    }

    /// Passive check: `now > created_at + ttl`.
    pub fn is_expired(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        entry.is_expired_at(now)
    }

    /// Sweep check: `now > created_at + ttl + grace`.
    pub fn is_purgeable(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        entry.is_purgeable_at(now, self.grace)
    }
}

/// Outcome of one sweep pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records examined in the read phase.
    pub scanned: usize,
    /// Records that could not be decoded and were left in place.
    pub corrupt: usize,
    /// Records removed in the write phase.
    pub purged: usize,
}

/// Background purge of entries past TTL plus grace.
pub struct Sweeper {
    store: Arc<EntryStore>,
    expirer: Expirer,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(
        store: Arc<EntryStore>,
        expirer: Expirer,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            expirer,
            clock,
            interval,
        }
    }

    /// Run one two-phase pass.
    pub fn sweep_once(&self) -> StoreResult<SweepReport> {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        let candidates = self.store.view(|tx| {
            let mut candidates = Vec::new();
            for (name, entry) in tx.scan() {
                report.scanned += 1;
                match entry {
                    Ok(entry) if self.expirer.is_purgeable(&entry, now) => {
                        candidates.push(name.to_string());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        report.corrupt += 1;
                        warn!(name, error = %e, "sweep skipped undecodable entry");
                    }
                }
            }
            Ok::<_, StoreError>(candidates)
        })?;

        if candidates.is_empty() {
            debug!(scanned = report.scanned, "sweep: nothing to purge");
            return Ok(report);
        }

        let (purged, corrupt) = self
            .store
            .update(|tx| Ok::<_, StoreError>(self.purge_candidates(tx, &candidates, now)))?;
        report.purged = purged;
        report.corrupt += corrupt;

        info!(
            scanned = report.scanned,
            candidates = candidates.len(),
            purged = report.purged,
            corrupt = report.corrupt,
            "sweep completed"
        );
        Ok(report)
    }

    /// Delete each candidate that is still purgeable. Returns the number
    /// purged and the number that no longer decode.
    ///
    /// Each candidate is read again first; it may have changed since the
    /// scan.
    fn purge_candidates(
        &self,
        tx: &mut WriteTxn<'_>,
        candidates: &[String],
        now: DateTime<Utc>,
    ) -> (usize, usize) {
        let (mut purged, mut corrupt) = (0, 0);
        for name in candidates {
            match tx.get(name) {
                Ok(Some(entry)) => {
                    if self.expirer.is_purgeable(&entry, now) && tx.delete(name) {
                        purged += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    corrupt += 1;
                    warn!(name = %name, error = %e, "sweep skipped undecodable entry");
                }
            }
        }
        (purged, corrupt)
    }

    /// Spawn the sweep loop on the current Tokio runtime.
    ///
    /// The loop stops when `cancel` fires; await the handle to wait for it.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately; wait a full interval instead.
        ticker.tick().await;

        info!(
            interval_ms = self.interval.as_millis() as u64,
            grace_secs = self.expirer.grace().num_seconds(),
            "sweep task started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("sweep task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once() {
                        warn!(error = %e, "sweep failed");
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("interval", &self.interval)
            .field("grace", &self.expirer.grace())
            .finish()
    }
}
