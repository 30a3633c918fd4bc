//! Sync coordinator - state machine arbitrating exports and imports
//!
//! A [`SyncCoordinator`] is a cheap, cloneable handle. The state machine runs
//! on one long-lived task that owns the hash ledger, the backoff state and the
//! debounce/backoff deadline. Network work runs on short-lived worker tasks
//! whose typed results come back over a channel.
//!
//! ## Flow
//!
//! ```text
//! enqueue ──→ DirtyQueue ──→ Dirty ──(debounce)──→ Exporting ──→ Idle
//!                                                     │
//!                                           rate limited / transient
//!                                                     ↓
//!                                                BackoffWait ──(deadline)──→ Exporting
//!
//! import_all ──(when Idle)──→ Importing ──→ hash check ──→ apply (gate open) ──→ Idle
//! ```
//!
//! Only the pending-payload map and the apply gate are shared with callers.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sheetsync_core::codec::{self, SnapshotCodec};
use sheetsync_core::config::Config;
use sheetsync_core::domain::{Grid, SheetName, SheetRecord};
use sheetsync_core::ports::{ILocalRecords, IPermissionGate, IRemoteStore, RemoteError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::{BackoffPolicy, BackoffState};
use crate::export::{self, ExportOutcome};
use crate::gate::ApplyGate;
use crate::import::{self, ImportFetch, ImportReport};
use crate::janitor::Janitor;
use crate::ledger::HashLedger;
use crate::queue::DirtyQueue;
use crate::SyncError;

// ============================================================================
// Public types
// ============================================================================

/// Timing knobs for the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Quiet period after the last edit before exporting
    pub debounce: Duration,
    /// Interval of the janitor pass
    pub janitor_interval: Duration,
    /// Delay before the single retry of a transient failure
    pub transient_retry: Duration,
    /// Rate-limit backoff schedule
    pub backoff: BackoffPolicy,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CoordinatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: config.sync.debounce(),
            janitor_interval: config.sync.janitor_interval(),
            transient_retry: config.sync.transient_retry(),
            backoff: BackoffPolicy::from_config(&config.backoff),
        }
    }
}

/// States of the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    /// Edits pending, debounce timer armed
    Dirty,
    Exporting,
    Importing,
    /// Waiting out a rate limit or the transient retry delay
    BackoffWait,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CoordinatorState::Idle => "idle",
            CoordinatorState::Dirty => "dirty",
            CoordinatorState::Exporting => "exporting",
            CoordinatorState::Importing => "importing",
            CoordinatorState::BackoffWait => "backoff_wait",
        };
        write!(f, "{s}")
    }
}

/// What `enqueue` did with a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Stored; the debounce timer is (re)armed
    Queued,
    /// Dropped because an import is being applied
    Suppressed,
    /// Dropped because the user may not edit
    NotPermitted,
}

/// Notifications for the surrounding application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// These sheets now hold the local content remotely
    ExportFinished { sheets: Vec<SheetName> },
    /// These sheets hit a permanent error; their payloads were dropped
    ExportFailed { sheets: Vec<SheetName>, error: String },
    /// Local collections for these sheets were replaced from the remote
    ImportApplied { sheets: Vec<SheetName> },
    /// An import request failed
    ImportFailed { error: String },
}

// ============================================================================
// Internal messages
// ============================================================================

type ImportReply = oneshot::Sender<Result<ImportReport, SyncError>>;

struct ImportRequest {
    sheets: Vec<SheetName>,
    reply: ImportReply,
}

enum Command {
    Dirty(SheetName),
    Import(ImportRequest),
    Flush,
    JanitorPass,
    State(oneshot::Sender<CoordinatorState>),
}

enum WorkerResult {
    Export(ExportOutcome),
    Import(Result<ImportFetch, RemoteError>),
}

// ============================================================================
// SyncCoordinator handle
// ============================================================================

/// Handle to the coordinator task
#[derive(Clone)]
pub struct SyncCoordinator {
    commands: mpsc::UnboundedSender<Command>,
    pending: Arc<DirtyQueue>,
    gate: ApplyGate,
    permission: Arc<dyn IPermissionGate>,
    codec: SnapshotCodec,
    shutdown: CancellationToken,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("pending", &self.pending.sheets())
            .field("applying", &self.gate.is_applying())
            .field("stopped", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl SyncCoordinator {
    /// Spawns the coordinator and janitor tasks
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    /// * `settings` - Debounce, janitor, retry and backoff timings
    /// * `codec` - Codec used to encode records passed to [`enqueue`](Self::enqueue)
    /// * `store` - Remote store
    /// * `records` - Local collections imports are applied to
    /// * `permission` - Edit permission consulted on every enqueue
    ///
    /// # Returns
    /// A tuple of `(SyncCoordinator, mpsc::UnboundedReceiver<SyncEvent>)`.
    /// Events are dropped silently if the receiver is dropped.
    pub fn spawn(
        settings: CoordinatorSettings,
        codec: SnapshotCodec,
        store: Arc<dyn IRemoteStore>,
        records: Arc<dyn ILocalRecords>,
        permission: Arc<dyn IPermissionGate>,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(DirtyQueue::new());
        let gate = ApplyGate::new();
        let shutdown = CancellationToken::new();

        info!(
            debounce_ms = settings.debounce.as_millis() as u64,
            janitor_secs = settings.janitor_interval.as_secs(),
            transient_retry_ms = settings.transient_retry.as_millis() as u64,
            backoff_initial_secs = settings.backoff.initial().as_secs(),
            backoff_ceiling_secs = settings.backoff.ceiling().as_secs(),
            "Starting sync coordinator"
        );

        let janitor_tx = command_tx.clone();
        let janitor = tokio::spawn(
            Janitor::new(settings.janitor_interval, shutdown.clone())
                .run(move || janitor_tx.send(Command::JanitorPass).is_ok()),
        );

        let actor = CoordinatorActor {
            backoff: BackoffState::new(settings.backoff),
            settings,
            store,
            records,
            pending: Arc::clone(&pending),
            gate: gate.clone(),
            ledger: HashLedger::new(),
            state: CoordinatorState::Idle,
            deadline: None,
            transient_retry_used: false,
            edits_during_import: false,
            waiting_imports: VecDeque::new(),
            active_import: None,
            in_flight: None,
            commands: command_rx,
            results_tx: result_tx,
            results_rx: result_rx,
            events: event_tx,
            shutdown: shutdown.clone(),
        };
        let actor = tokio::spawn(actor.run());

        let handle = Self {
            commands: command_tx,
            pending,
            gate,
            permission,
            codec,
            shutdown,
            tasks: Arc::new(Mutex::new(vec![actor, janitor])),
        };

        (handle, event_rx)
    }

    /// Encodes `records` and queues them as the new content of `sheet`
    ///
    /// Never blocks on I/O. Any unflushed payload for the sheet is replaced.
    ///
    /// # Errors
    /// Returns `SyncError::Stopped` after shutdown
    pub fn enqueue<R: SheetRecord>(
        &self,
        sheet: SheetName,
        records: &[R],
    ) -> Result<EnqueueOutcome, SyncError> {
        if let Some(outcome) = self.refusal(&sheet) {
            return Ok(outcome);
        }
        self.queue(sheet, self.codec.encode(records))
    }

    /// Queues an already encoded grid as the new content of `sheet`
    ///
    /// # Errors
    /// Returns `SyncError::Stopped` after shutdown
    pub fn enqueue_grid(&self, sheet: SheetName, grid: Grid) -> Result<EnqueueOutcome, SyncError> {
        if let Some(outcome) = self.refusal(&sheet) {
            return Ok(outcome);
        }
        self.queue(sheet, grid)
    }

    fn refusal(&self, sheet: &SheetName) -> Option<EnqueueOutcome> {
        if self.gate.is_applying() {
            debug!(sheet = %sheet, "Enqueue suppressed while applying remote data");
            return Some(EnqueueOutcome::Suppressed);
        }
        if !self.permission.can_edit() {
            info!(sheet = %sheet, "Enqueue refused: user cannot edit");
            return Some(EnqueueOutcome::NotPermitted);
        }
        None
    }

    fn queue(&self, sheet: SheetName, grid: Grid) -> Result<EnqueueOutcome, SyncError> {
        if self.shutdown.is_cancelled() {
            return Err(SyncError::Stopped);
        }
        self.pending.put(sheet.clone(), grid);
        self.commands
            .send(Command::Dirty(sheet))
            .map_err(|_| SyncError::Stopped)?;
        Ok(EnqueueOutcome::Queued)
    }

    /// Imports `sheets`, applying only content not already known
    ///
    /// Waits until the coordinator is idle; pending edits are flushed first.
    ///
    /// # Errors
    /// - `SyncError::Remote` if fetching failed (after one retry)
    /// - `SyncError::Apply` if a sheet could not be applied; other sheets in
    ///   the request are still processed
    /// - `SyncError::Stopped` if the coordinator shut down
    pub async fn import_all(&self, sheets: Vec<SheetName>) -> Result<ImportReport, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Import(ImportRequest { sheets, reply }))
            .map_err(|_| SyncError::Stopped)?;
        rx.await.map_err(|_| SyncError::Stopped)?
    }

    /// Starts an export now instead of waiting for the debounce timer
    ///
    /// Has no effect while exporting, importing or waiting out a backoff.
    ///
    /// # Errors
    /// Returns `SyncError::Stopped` after shutdown
    pub fn flush(&self) -> Result<(), SyncError> {
        self.commands
            .send(Command::Flush)
            .map_err(|_| SyncError::Stopped)
    }

    /// Current state of the state machine
    ///
    /// # Errors
    /// Returns `SyncError::Stopped` after shutdown
    pub async fn state(&self) -> Result<CoordinatorState, SyncError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::State(tx))
            .map_err(|_| SyncError::Stopped)?;
        rx.await.map_err(|_| SyncError::Stopped)
    }

    /// Sheets with payloads waiting to be exported
    pub fn pending_sheets(&self) -> Vec<SheetName> {
        self.pending.sheets()
    }

    /// The gate that is open while imported data is being applied
    pub fn apply_gate(&self) -> &ApplyGate {
        &self.gate
    }

    /// Stops the coordinator and janitor and waits for them to finish
    ///
    /// Pending payloads are dropped. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let tasks: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Sync task ended abnormally");
            }
        }
    }
}

// ============================================================================
// Coordinator task
// ============================================================================

struct CoordinatorActor {
    settings: CoordinatorSettings,
    store: Arc<dyn IRemoteStore>,
    records: Arc<dyn ILocalRecords>,
    pending: Arc<DirtyQueue>,
    gate: ApplyGate,
    ledger: HashLedger,
    backoff: BackoffState,
    state: CoordinatorState,
    /// Debounce or retry deadline, armed in `Dirty` and `BackoffWait`
    deadline: Option<Instant>,
    transient_retry_used: bool,
    edits_during_import: bool,
    waiting_imports: VecDeque<ImportRequest>,
    active_import: Option<ImportRequest>,
    in_flight: Option<JoinHandle<()>>,
    commands: mpsc::UnboundedReceiver<Command>,
    results_tx: mpsc::UnboundedSender<WorkerResult>,
    results_rx: mpsc::UnboundedReceiver<WorkerResult>,
    events: mpsc::UnboundedSender<SyncEvent>,
    shutdown: CancellationToken,
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl CoordinatorActor {
    async fn run(mut self) {
        debug!("Coordinator loop starting");

        loop {
            let deadline = self.deadline;
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                Some(result) = self.results_rx.recv() => {
                    self.in_flight = None;
                    match result {
                        WorkerResult::Export(outcome) => self.on_export_outcome(outcome),
                        WorkerResult::Import(fetch) => self.on_import_fetched(fetch).await,
                    }
                }

                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },

                _ = wait_until(deadline) => self.on_deadline(),
            }
        }

        if let Some(worker) = self.in_flight.take() {
            worker.abort();
        }
        let dropped = self.pending.clear();
        if dropped > 0 {
            warn!(dropped, "Shutting down with unexported payloads");
        }
        // Waiting import callers see `SyncError::Stopped` when their reply
        // senders are dropped here.
        info!(state = %self.state, "Coordinator stopped");
    }

    fn set_state(&mut self, state: CoordinatorState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "Coordinator state change");
            self.state = state;
        }
    }

    fn arm(&mut self, delay: Duration) {
        self.deadline = Some(Instant::now() + delay);
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Dirty(sheet) => self.on_dirty(sheet),
            Command::Import(request) => {
                self.waiting_imports.push_back(request);
                self.drive();
            }
            Command::Flush => {
                if matches!(self.state, CoordinatorState::Idle | CoordinatorState::Dirty) {
                    self.start_export();
                }
            }
            Command::JanitorPass => {
                if self.state == CoordinatorState::Idle && !self.pending.is_empty() {
                    info!(sheets = ?self.pending.sheets(), "Janitor found pending payloads");
                    self.start_export();
                }
            }
            Command::State(reply) => {
                let _ = reply.send(self.state);
            }
        }
    }

    fn on_dirty(&mut self, sheet: SheetName) {
        match self.state {
            CoordinatorState::Idle | CoordinatorState::Dirty => {
                debug!(sheet = %sheet, "Debounce timer (re)armed");
                self.set_state(CoordinatorState::Dirty);
                self.arm(self.settings.debounce);
                self.drive();
            }
            CoordinatorState::Importing => {
                debug!(sheet = %sheet, "Edit during import, deferred");
                self.edits_during_import = true;
            }
            // Picked up when the current export or wait resolves
            CoordinatorState::Exporting | CoordinatorState::BackoffWait => {}
        }
    }

    fn on_deadline(&mut self) {
        self.deadline = None;
        if matches!(
            self.state,
            CoordinatorState::Dirty | CoordinatorState::BackoffWait
        ) {
            self.start_export();
        }
    }

    /// Starts a waiting import if the coordinator can take it
    fn drive(&mut self) {
        if self.waiting_imports.is_empty() {
            return;
        }
        match self.state {
            // Local edits go out before remote content comes in, including
            // data left pending by a transient failure
            CoordinatorState::Idle if !self.pending.is_empty() => self.start_export(),
            CoordinatorState::Idle => self.start_import(),
            CoordinatorState::Dirty => self.start_export(),
            _ => {}
        }
    }

    // ------------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------------

    #[tracing::instrument(skip(self), fields(state = %self.state))]
    fn start_export(&mut self) {
        self.deadline = None;
        let payload = self.pending.take();
        if payload.is_empty() {
            debug!("Nothing pending, export skipped");
            self.set_state(CoordinatorState::Idle);
            self.drive();
            return;
        }

        self.set_state(CoordinatorState::Exporting);
        let store = Arc::clone(&self.store);
        let results = self.results_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let outcome = export::run_export(store.as_ref(), payload).await;
            let _ = results.send(WorkerResult::Export(outcome));
        }));
    }

    fn on_export_outcome(&mut self, outcome: ExportOutcome) {
        let written = outcome.written_sheets();
        for (sheet, hash) in outcome.written.iter().cloned() {
            self.ledger.record_export(sheet, hash);
        }

        let fatal: Vec<_> = outcome.fatal().collect();
        if let Some(first) = fatal.first() {
            let sheets: Vec<SheetName> = fatal.iter().map(|f| f.sheet.clone()).collect();
            error!(sheets = ?sheets, error = %first.error, "Export failed permanently, payload dropped");
            self.emit(SyncEvent::ExportFailed {
                sheets,
                error: first.error.to_string(),
            });
        }

        let retryable: Vec<_> = outcome.retryable().collect();
        let rate_limited = retryable.iter().any(|f| f.error.is_rate_limited());
        let retry_after = retryable.iter().filter_map(|f| f.error.retry_after()).max();
        self.pending.restore(
            retryable
                .iter()
                .map(|f| (f.sheet.clone(), f.grid.clone()))
                .collect(),
        );

        if !written.is_empty() {
            info!(sheets = ?written, "Export finished");
            self.emit(SyncEvent::ExportFinished {
                sheets: written.clone(),
            });
        }

        if rate_limited {
            let backoff = self.backoff.on_rate_limited();
            let delay = retry_after.map_or(backoff, |after| after.max(backoff));
            warn!(
                delay_secs = delay.as_secs_f64(),
                consecutive = self.backoff.consecutive_failures(),
                "Rate limited, backing off"
            );
            self.transient_retry_used = false;
            self.set_state(CoordinatorState::BackoffWait);
            self.arm(delay);
            return;
        }

        if !retryable.is_empty() {
            if !self.transient_retry_used {
                warn!(
                    retry_ms = self.settings.transient_retry.as_millis() as u64,
                    "Transient export failure, retrying once"
                );
                self.transient_retry_used = true;
                self.set_state(CoordinatorState::BackoffWait);
                self.arm(self.settings.transient_retry);
                return;
            }
            warn!(
                pending = ?self.pending.sheets(),
                "Transient failure persisted, leaving data pending"
            );
            self.transient_retry_used = false;
            self.set_state(CoordinatorState::Idle);
            self.drive();
            return;
        }

        self.transient_retry_used = false;
        if !written.is_empty() {
            self.backoff.reset();
        }

        if self.pending.is_empty() {
            self.set_state(CoordinatorState::Idle);
        } else {
            // Edits arrived while the export was in flight
            self.set_state(CoordinatorState::Dirty);
            self.arm(self.settings.debounce);
        }
        self.drive();
    }

    // ------------------------------------------------------------------------
    // Import
    // ------------------------------------------------------------------------

    fn start_import(&mut self) {
        let Some(request) = self.waiting_imports.pop_front() else {
            return;
        };

        info!(sheets = ?request.sheets, "Starting import");
        self.set_state(CoordinatorState::Importing);

        let store = Arc::clone(&self.store);
        let results = self.results_tx.clone();
        let sheets = request.sheets.clone();
        let retry_delay = self.settings.transient_retry;
        self.active_import = Some(request);
        self.in_flight = Some(tokio::spawn(async move {
            let fetched = import::fetch_all(store.as_ref(), &sheets, retry_delay).await;
            let _ = results.send(WorkerResult::Import(fetched));
        }));
    }

    #[tracing::instrument(skip_all)]
    async fn on_import_fetched(&mut self, fetched: Result<ImportFetch, RemoteError>) {
        let result = match fetched {
            Ok(grids) => self.apply_fetched(grids).await,
            Err(e) => Err(SyncError::Remote(e)),
        };

        if let Err(ref e) = result {
            error!(error = %e, "Import failed");
            self.emit(SyncEvent::ImportFailed {
                error: e.to_string(),
            });
        }
        if let Some(request) = self.active_import.take() {
            let _ = request.reply.send(result);
        }

        self.set_state(CoordinatorState::Idle);
        if std::mem::take(&mut self.edits_during_import) && !self.pending.is_empty() {
            self.set_state(CoordinatorState::Dirty);
            self.arm(self.settings.debounce);
        }
        self.drive();
    }

    async fn apply_fetched(&mut self, grids: ImportFetch) -> Result<ImportReport, SyncError> {
        let mut report = ImportReport::default();
        let mut first_error = None;

        for (sheet, grid) in grids {
            let Some(grid) = grid else {
                debug!(sheet = %sheet, "Sheet missing remotely");
                report.missing.push(sheet);
                continue;
            };

            let hash = codec::hash(&grid);
            if self.ledger.is_known(&sheet, &hash) {
                debug!(sheet = %sheet, hash = hash.short(), "Remote content already known, skipped");
                report.skipped.push(sheet);
                continue;
            }

            let applied = {
                let _guard = self.gate.enter();
                self.records.apply_remote(&sheet, &grid).await
            };
            match applied {
                Ok(count) => {
                    info!(sheet = %sheet, records = count, hash = hash.short(), "Applied remote sheet");
                    self.ledger.record_import(sheet.clone(), hash);
                    report.applied.push(sheet);
                }
                Err(source) => {
                    warn!(sheet = %sheet, error = %source, "Remote sheet rejected, local data kept");
                    first_error.get_or_insert(SyncError::Apply { sheet, source });
                }
            }
        }

        if !report.applied.is_empty() {
            self.emit(SyncEvent::ImportApplied {
                sheets: report.applied.clone(),
            });
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}
