// Owns the authoritative snapshot and keeps it in sync with the local cache
// and the remote store.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use election_results::{
    apply_accepted_entry, default_snapshot, validate_center_update, AcceptedEntry, ProposedVotes,
    Snapshot, ValidationError,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use snafu::prelude::*;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::live::auth::AuthorizationProvider;
use crate::live::local_cache::LocalCache;
use crate::live::remote_store::{RemoteStore, StoreError};

pub const MIN_REFRESH_PERIOD: Duration = Duration::from_secs(1);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// Nothing was loaded or saved yet.
    Loading,
    Idle,
    /// At least one save is waiting for the remote store.
    Syncing,
    /// The remote store refused access. Cached and local data are served.
    Degraded,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub state: EngineState,
    pub degraded: bool,
    /// The last transient problem, for display only.
    #[serde(rename = "lastError")]
    pub last_error: Option<String>,
    #[serde(rename = "lastSyncedAt")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Snafu)]
pub enum EngineError {
    #[snafu(display("this operation requires an authorized operator"))]
    Unauthorized {},
    #[snafu(display("there is no center {center_id} in seat {seat_id}"))]
    UnknownCenter { seat_id: String, center_id: u32 },
    #[snafu(display("the entry was rejected: {source}"))]
    Validation { source: ValidationError },
}

/// Where the snapshot held after a `load` comes from.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum LoadSource {
    Remote,
    /// The remote document was missing and was created with the built-in dataset.
    Initialized,
    LocalCache,
    /// Access was refused and the local cache was empty.
    BuiltIn,
    /// Nothing was adopted: the snapshot is the one held before the load.
    Kept,
}

impl LoadSource {
    /// True when the snapshot reflects stored results, and not only the built-in dataset.
    pub fn is_stored_state(self) -> bool {
        matches!(
            self,
            LoadSource::Remote | LoadSource::Initialized | LoadSource::LocalCache
        )
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RefreshOutcome {
    Completed,
    SkippedSaveInFlight,
    SkippedEditOpen,
}

struct Inner {
    snapshot: Arc<Snapshot>,
    loaded: bool,
    // Sequence number of the operation that produced the current snapshot.
    applied_seq: u64,
    saves_in_flight: usize,
    degraded: bool,
    last_error: Option<String>,
    last_synced_at: Option<DateTime<Utc>>,
}

impl Inner {
    fn state(&self) -> EngineState {
        if !self.loaded {
            EngineState::Loading
        } else if self.saves_in_flight > 0 {
            EngineState::Syncing
        } else if self.degraded {
            EngineState::Degraded
        } else {
            EngineState::Idle
        }
    }

    fn status(&self) -> SyncStatus {
        SyncStatus {
            state: self.state(),
            degraded: self.degraded,
            last_error: self.last_error.clone(),
            last_synced_at: self.last_synced_at,
        }
    }

    fn synced(&mut self) {
        if self.degraded {
            info!("sync: remote store reachable again, leaving degraded mode");
        }
        self.degraded = false;
        self.last_error = None;
        self.last_synced_at = Some(Utc::now());
    }

    fn record_failure(&mut self, err: &StoreError) {
        if err.is_permission_denied() {
            if !self.degraded {
                warn!("sync: {}, entering degraded mode", err);
            }
            self.degraded = true;
        }
        self.last_error = Some(err.to_string());
    }
}

// Counts a save as in flight until its remote write completes or is dropped.
struct SaveInFlight<'a> {
    engine: &'a SyncEngine,
}

impl Drop for SaveInFlight<'_> {
    fn drop(&mut self) {
        self.engine.inner.lock().saves_in_flight -= 1;
        self.engine.publish();
    }
}

/// Marks an edit in progress. Periodic refreshes are skipped while it lives.
pub struct EditGuard {
    open_edits: Arc<AtomicUsize>,
}

impl Drop for EditGuard {
    fn drop(&mut self) {
        self.open_edits.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The only writer of the authoritative snapshot.
///
/// Every operation takes a sequence number when it starts. A remote read
/// that completes after a newer operation already replaced the snapshot is
/// dropped, so a slow load never overwrites a more recent save.
pub struct SyncEngine {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn LocalCache>,
    inner: Mutex<Inner>,
    next_seq: AtomicU64,
    open_edits: Arc<AtomicUsize>,
    status_tx: watch::Sender<SyncStatus>,
}

impl SyncEngine {
    /// Starts from the cached snapshot, or from the built-in dataset when the
    /// cache is empty. Nothing is read from the remote store until `load`.
    pub fn new(remote: Arc<dyn RemoteStore>, cache: Arc<dyn LocalCache>) -> SyncEngine {
        let snapshot = cache.get().unwrap_or_else(default_snapshot);
        let inner = Inner {
            snapshot: Arc::new(snapshot),
            loaded: false,
            applied_seq: 0,
            saves_in_flight: 0,
            degraded: false,
            last_error: None,
            last_synced_at: None,
        };
        let (status_tx, _) = watch::channel(inner.status());
        SyncEngine {
            remote,
            cache,
            inner: Mutex::new(inner),
            next_seq: AtomicU64::new(0),
            open_edits: Arc::new(AtomicUsize::new(0)),
            status_tx,
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.lock().snapshot.clone()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.lock().status()
    }

    pub fn state(&self) -> EngineState {
        self.inner.lock().state()
    }

    /// Receives the new status after every change.
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    pub fn begin_edit(&self) -> EditGuard {
        self.open_edits.fetch_add(1, Ordering::SeqCst);
        EditGuard {
            open_edits: self.open_edits.clone(),
        }
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn publish(&self) {
        let status = self.status();
        debug!("publish: {:?}", status);
        self.status_tx.send_replace(status);
    }

    fn persist_locally(&self, snapshot: &Snapshot) {
        if let Err(e) = self.cache.set(snapshot) {
            warn!("persist_locally: {}", e);
        }
    }

    /// Replaces the snapshot with the result of operation `seq`, unless a newer
    /// operation already replaced it.
    fn adopt(&self, seq: u64, snapshot: Snapshot, update: impl FnOnce(&mut Inner)) -> bool {
        let adopted = {
            let mut inner = self.inner.lock();
            if seq <= inner.applied_seq {
                info!(
                    "adopt: dropping the result of operation #{}, #{} is more recent",
                    seq, inner.applied_seq
                );
                false
            } else {
                inner.snapshot = Arc::new(snapshot.clone());
                inner.applied_seq = seq;
                inner.loaded = true;
                update(&mut inner);
                true
            }
        };
        if adopted {
            self.persist_locally(&snapshot);
            self.publish();
        }
        adopted
    }

    /// Updates the status for operation `seq`, unless a newer operation already
    /// replaced the snapshot.
    fn settle(&self, seq: u64, update: impl FnOnce(&mut Inner)) {
        {
            let mut inner = self.inner.lock();
            if seq < inner.applied_seq {
                debug!("settle: operation #{} is outdated", seq);
                return;
            }
            inner.loaded = true;
            update(&mut inner);
        }
        self.publish();
    }

    /// Reads the remote store and adopts what it holds.
    ///
    /// Failures never leave the engine without a snapshot:
    /// - a missing document is created with the built-in dataset,
    /// - a permission error falls back to the cache (or the built-in dataset)
    ///   and enters degraded mode,
    /// - any other error falls back to the cache, or keeps the current snapshot.
    pub async fn load(&self) -> LoadSource {
        let seq = self.next_seq();
        info!("load: #{} reading the remote store", seq);
        let (adopted, source) = match self.remote.read().await {
            Ok(snapshot) => (self.adopt(seq, snapshot, Inner::synced), LoadSource::Remote),
            Err(StoreError::NotFound {}) => {
                warn!("load: remote document not found, initializing it");
                let defaults = default_snapshot();
                let written = self.remote.write(&defaults).await;
                let adopted = self.adopt(seq, defaults, |inner| match written {
                    Ok(()) => inner.synced(),
                    Err(e) => inner.record_failure(&e),
                });
                (adopted, LoadSource::Initialized)
            }
            Err(e) if e.is_permission_denied() => {
                let (fallback, source) = match self.cache.get() {
                    Some(cached) => (cached, LoadSource::LocalCache),
                    None => {
                        info!("load: local cache is empty, using the built-in dataset");
                        (default_snapshot(), LoadSource::BuiltIn)
                    }
                };
                let adopted = self.adopt(seq, fallback, |inner| inner.record_failure(&e));
                (adopted, source)
            }
            Err(e) => {
                warn!("load: {}, falling back to the local cache", e);
                match self.cache.get() {
                    Some(cached) => {
                        let adopted = self.adopt(seq, cached, |inner| inner.record_failure(&e));
                        (adopted, LoadSource::LocalCache)
                    }
                    None => {
                        self.settle(seq, |inner| inner.record_failure(&e));
                        (false, LoadSource::Kept)
                    }
                }
            }
        };
        if adopted {
            source
        } else {
            LoadSource::Kept
        }
    }

    /// Adopts `snapshot` right away, then sends it to the remote store.
    ///
    /// The local part happens when `save` is called, before the returned future
    /// is polled: calls apply locally in call order. The snapshot is kept even
    /// if the remote store rejects it, or if the future is dropped before the
    /// write completes.
    pub fn save(&self, snapshot: Snapshot) -> impl Future<Output = ()> + '_ {
        let seq = self.next_seq();
        {
            let mut inner = self.inner.lock();
            inner.snapshot = Arc::new(snapshot.clone());
            inner.applied_seq = seq;
            inner.loaded = true;
            inner.saves_in_flight += 1;
        }
        self.persist_locally(&snapshot);
        self.publish();
        debug!("save: #{} applied locally", seq);
        let in_flight = SaveInFlight { engine: self };

        async move {
            let _in_flight = in_flight;
            let res = self.remote.write(&snapshot).await;
            {
                let mut inner = self.inner.lock();
                if seq < inner.applied_seq {
                    debug!("save: #{} completed after a newer operation", seq);
                } else {
                    match &res {
                        Ok(()) => inner.synced(),
                        Err(e) => {
                            warn!("save: #{} not stored remotely: {}", seq, e);
                            inner.record_failure(e);
                        }
                    }
                }
            }
        }
    }

    /// Same as `load`, unless a save is in flight or an edit is open.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self.open_edits.load(Ordering::SeqCst) > 0 {
            info!("refresh: skipped, an edit is open");
            return RefreshOutcome::SkippedEditOpen;
        }
        if self.inner.lock().saves_in_flight > 0 {
            info!("refresh: skipped, a save is in flight");
            return RefreshOutcome::SkippedSaveInFlight;
        }
        self.load().await;
        RefreshOutcome::Completed
    }

    /// Puts back the built-in dataset, everywhere.
    pub async fn reset(&self, auth: &dyn AuthorizationProvider) -> Result<(), EngineError> {
        ensure!(auth.is_authorized(), UnauthorizedSnafu {});
        warn!("reset: replacing all the results with the built-in dataset");
        self.save(default_snapshot()).await;
        Ok(())
    }

    /// Records the results of one center: validates them, applies them to the
    /// current snapshot and saves the result.
    pub async fn submit_center_update(
        &self,
        auth: &dyn AuthorizationProvider,
        seat_id: &str,
        center_id: u32,
        votes: &ProposedVotes,
        invalid_votes: i64,
    ) -> Result<AcceptedEntry, EngineError> {
        ensure!(auth.is_authorized(), UnauthorizedSnafu {});
        let current = self.snapshot();
        let center = current
            .seat(seat_id)
            .and_then(|s| s.center(center_id))
            .context(UnknownCenterSnafu { seat_id, center_id })?;
        let entry =
            validate_center_update(center, votes, invalid_votes).context(ValidationSnafu {})?;
        info!(
            "submit_center_update: seat {} center {}: {} votes entered",
            seat_id, center_id, entry.total_entered
        );
        let next = apply_accepted_entry(&current, seat_id, center_id, &entry);
        self.save(next).await;
        Ok(entry)
    }

    /// Runs `refresh` every `period` until the returned task is shut down or dropped.
    ///
    /// Periods shorter than one second are raised to one second.
    pub fn spawn_refresh_task(self: &Arc<Self>, period: Duration) -> RefreshTask {
        let period = if period < MIN_REFRESH_PERIOD {
            warn!(
                "spawn_refresh_task: period {:?} is too short, using {:?}",
                period, MIN_REFRESH_PERIOD
            );
            MIN_REFRESH_PERIOD
        } else {
            period
        };
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => {
                        info!("refresh task: cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let outcome = engine.refresh().await;
                        debug!("refresh task: {:?}", outcome);
                    }
                }
            }
        });
        RefreshTask {
            token,
            handle: Some(handle),
        }
    }
}

/// The periodic refresh of an engine.
pub struct RefreshTask {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RefreshTask {
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("refresh task: {}", e);
            }
        }
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
