//! # StageScheduler
//!
//! One running stage session for one event: subscribes to the approved feed
//! and the event document, runs an independent timer per kind, and
//! publishes a [`StageSnapshot`] after every slot mutation.
//!
//! All state lives in a [`Stage`] behind a mutex. Each feed update, config
//! change and tick takes the lock, mutates, publishes and releases without
//! awaiting in between, so the handlers interleave safely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use cs_core::{
    AppError, ContentKind, EventDirectory, EventRecord, RandomSource, Result, StageSettings,
    SubmissionFeed, SubmissionRecord,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::kind::TickOutcome;
use crate::stage::{Stage, StageSnapshot};

/// Shared between the session handle and its tasks.
struct Shared {
    event_id: String,
    stage: Mutex<Stage>,
    snapshot_tx: watch::Sender<StageSnapshot>,
    /// Set while the event document says `disabled`.
    paused: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Stage> {
        // A panic mid-update cannot leave the stage half-written in a way
        // worse than stale slots, so keep serving.
        self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, stage: &Stage) {
        self.snapshot_tx.send_replace(stage.snapshot());
    }

    fn tick(&self, kind: ContentKind) -> TickOutcome {
        if self.paused.load(Ordering::Acquire) {
            return TickOutcome::Empty;
        }
        let mut stage = self.lock();
        let outcome = stage.on_tick(kind, Utc::now());
        match &outcome {
            TickOutcome::Placed { .. } => self.publish(&stage),
            other => debug!(event = %self.event_id, %kind, outcome = ?other, "tick skipped"),
        }
        outcome
    }

    fn apply_event(&self, record: &EventRecord) {
        let was_paused = self.paused.swap(record.disabled, Ordering::AcqRel);
        if record.disabled && !was_paused {
            warn!(event = %self.event_id, "event disabled, rotation paused");
        } else if !record.disabled && was_paused {
            info!(event = %self.event_id, "event re-enabled, rotation resumed");
        }

        let settings = StageSettings::resolve(&record.settings);
        let mut stage = self.lock();
        stage.apply_settings(settings);
        self.publish(&stage);
    }
}

pub struct StageScheduler {
    shared: Arc<Shared>,
    feed: Arc<dyn SubmissionFeed>,
    directory: Arc<dyn EventDirectory>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Held by the one `start` call in flight.
    starting: AtomicBool,
}

/// Releases the start claim however `start` returns.
struct StartClaim<'a>(&'a AtomicBool);

impl Drop for StartClaim<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl StageScheduler {
    /// Builds an idle session. Nothing is subscribed until [`Self::start`].
    pub fn new(
        event_id: impl Into<String>,
        feed: Arc<dyn SubmissionFeed>,
        directory: Arc<dyn EventDirectory>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let stage = Stage::new(StageSettings::default(), rng);
        let (snapshot_tx, _) = watch::channel(stage.snapshot());
        Self {
            shared: Arc::new(Shared {
                event_id: event_id.into(),
                stage: Mutex::new(stage),
                snapshot_tx,
                paused: AtomicBool::new(false),
            }),
            feed,
            directory,
            tasks: Mutex::new(Vec::new()),
            starting: AtomicBool::new(false),
        }
    }

    pub fn event_id(&self) -> &str {
        &self.shared.event_id
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.tasks().iter().any(|t| !t.is_finished())
    }

    /// Validates the event, applies its settings and the current approved
    /// set, then starts the feed, settings and timer tasks.
    pub async fn start(&self) -> Result<()> {
        if self
            .starting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AppError::Conflict(format!(
                "stage for {} is already starting",
                self.event_id()
            )));
        }
        let _claim = StartClaim(&self.starting);

        if self.is_running() {
            return Err(AppError::Conflict(format!(
                "stage for {} is already running",
                self.event_id()
            )));
        }

        let event_id = self.event_id().to_string();
        if event_id.is_empty() || event_id.contains('/') {
            return Err(AppError::InvalidSession(format!("malformed event id '{event_id}'")));
        }

        let mut event_rx = self
            .directory
            .watch_event(&event_id)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .ok_or_else(|| AppError::InvalidSession(format!("unknown event '{event_id}'")))?;

        let event = event_rx.borrow_and_update().clone();
        if event.disabled {
            return Err(AppError::InvalidSession(format!("event '{event_id}' is disabled")));
        }

        let mut feed_rx = self
            .feed
            .subscribe_approved(&event_id)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        self.shared.apply_event(&event);
        {
            let records = feed_rx.borrow_and_update().clone();
            let mut stage = self.shared.lock();
            stage.on_feed_update(&records);
            self.shared.publish(&stage);
        }

        let mut tasks = self.tasks();
        for stale in tasks.drain(..) {
            stale.abort();
        }
        tasks.push(tokio::spawn(feed_loop(self.shared.clone(), feed_rx)));
        tasks.push(tokio::spawn(event_loop(self.shared.clone(), event_rx)));
        for kind in ContentKind::ALL {
            tasks.push(tokio::spawn(timer_loop(self.shared.clone(), kind)));
        }

        info!(event = %event_id, name = %event.name, "stage session started");
        Ok(())
    }

    /// Stops both timers and drops the subscriptions. Slots keep their
    /// last contents.
    pub fn stop(&self) {
        let mut tasks = self.tasks();
        if tasks.is_empty() {
            return;
        }
        for task in tasks.drain(..) {
            task.abort();
        }
        info!(event = %self.event_id(), "stage session stopped");
    }

    pub fn snapshot(&self) -> StageSnapshot {
        self.shared.lock().snapshot()
    }

    /// Receives a new snapshot after every slot mutation.
    pub fn subscribe(&self) -> watch::Receiver<StageSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Runs `f` against the live stage. For inspection only.
    pub fn with_stage<T>(&self, f: impl FnOnce(&Stage) -> T) -> T {
        f(&self.shared.lock())
    }
}

impl Drop for StageScheduler {
    fn drop(&mut self) {
        for task in self.tasks().drain(..) {
            task.abort();
        }
    }
}

async fn feed_loop(shared: Arc<Shared>, mut rx: watch::Receiver<Vec<SubmissionRecord>>) {
    while rx.changed().await.is_ok() {
        let records = rx.borrow_and_update().clone();
        let mut stage = shared.lock();
        let delta = stage.on_feed_update(&records);
        if delta.changed_slots() {
            info!(
                event = %shared.event_id,
                image = ?delta.image.cleared_slots,
                text = ?delta.text.cleared_slots,
                "retracted items cleared from stage"
            );
        }
        shared.publish(&stage);
    }
    warn!(event = %shared.event_id, "approved feed closed; slots keep their last contents");
}

async fn event_loop(shared: Arc<Shared>, mut rx: watch::Receiver<EventRecord>) {
    while rx.changed().await.is_ok() {
        let record = rx.borrow_and_update().clone();
        shared.apply_event(&record);
    }
}

/// Sleeps for the kind's current period, then ticks. The period is re-read
/// every round, so a change applies from the next tick on.
async fn timer_loop(shared: Arc<Shared>, kind: ContentKind) {
    loop {
        let period = shared.lock().rotation(kind).tick_period();
        tokio::time::sleep(period).await;
        shared.tick(kind);
    }
}
