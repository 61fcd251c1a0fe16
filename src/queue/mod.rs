//! Pending-entry queue and loader lifecycle.
//!
//! States are STOPPED and RUNNING. `start` spins up a fresh loader when a
//! handler is registered and work is pending, superseding any loader that is
//! still active; `stop` stops every loader of the run, drops the handler and
//! abandons the pending entries. The queue, the loader handles and the
//! handler share one mutex.
//!
//! Superseded and stopped loaders are kept as retired handles until their
//! threads exit, so a later `stop` can reach them and `wait_idle` can wait
//! for them.

pub mod events;
mod worker;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use tracing::debug;

use crate::config::EntryServiceConfig;
use crate::entry::BatteryEntry;
use crate::error::BatteryResult;
use crate::resolver::Resolver;

use self::events::EntryEventHandler;
use self::worker::{AbortToken, WorkerHandle};

#[derive(Default)]
pub(crate) struct QueueState {
    pub pending: VecDeque<Arc<BatteryEntry>>,
    pub worker: Option<WorkerHandle>,
    pub retired: Vec<WorkerHandle>,
    pub handler: Option<Arc<dyn EntryEventHandler>>,
}

#[derive(Default)]
pub(crate) struct QueueShared {
    state: Mutex<QueueState>,
}

impl QueueShared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// FIFO of entries awaiting the loader, plus the loader itself.
pub struct RequestQueue {
    shared: Arc<QueueShared>,
    resolver: Resolver,
    thread_name: String,
    lower_priority: bool,
    generations: AtomicU64,
    spawned: AtomicU64,
}

impl RequestQueue {
    /// Creates a stopped queue.
    pub fn new(resolver: Resolver, config: &EntryServiceConfig) -> Self {
        Self {
            shared: Arc::new(QueueShared::default()),
            resolver,
            thread_name: config.worker_thread_name.clone(),
            lower_priority: config.lower_worker_priority,
            generations: AtomicU64::new(0),
            spawned: AtomicU64::new(0),
        }
    }

    /// Appends an entry. Duplicates are allowed.
    pub fn enqueue(&self, entry: Arc<BatteryEntry>) {
        let mut state = self.shared.lock();
        debug!(entry = %entry.id(), pending = state.pending.len() + 1, "queued entry");
        state.pending.push_back(entry);
    }

    /// Registers the handler that receives loader events, replacing any
    /// previous one.
    pub fn register_handler(&self, handler: Arc<dyn EntryEventHandler>) {
        self.shared.lock().handler = Some(handler);
    }

    /// Returns true if a handler is registered.
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.shared.lock().handler.is_some()
    }

    /// Starts a loader for the pending entries.
    ///
    /// Does nothing and returns `Ok(false)` when no handler is registered or
    /// nothing is pending. An active loader is superseded, not joined.
    ///
    /// # Errors
    /// - `SpawnFailed`: the loader thread could not be created
    pub fn start(&self) -> BatteryResult<bool> {
        let mut state = self.shared.lock();
        if state.handler.is_none() || state.pending.is_empty() {
            return Ok(false);
        }

        // The new loader blocks on this lock until the old one is superseded.
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let worker = worker::spawn(
            Arc::clone(&self.shared),
            self.resolver.clone(),
            AbortToken::new(generation),
            &self.thread_name,
            self.lower_priority,
        )?;

        state.retired.retain(|w| !w.is_finished());
        if let Some(previous) = state.worker.replace(worker) {
            previous.token.supersede();
            debug!(generation = previous.token.generation(), "superseding loader");
            state.retired.push(previous);
        }
        self.spawned.fetch_add(1, Ordering::Relaxed);
        debug!(generation, pending = state.pending.len(), "loader spawned");
        Ok(true)
    }

    /// Stops the loader, if one exists.
    ///
    /// Every loader of the run is stopped, including ones superseded by a
    /// restart that are still finishing an entry; none of them reports to a
    /// handler again. Clears the handler and abandons every pending entry;
    /// abandoned entries keep their fast-path label and icon. Returns how
    /// many were abandoned. A no-op when no loader was ever started.
    pub fn stop(&self) -> usize {
        let mut state = self.shared.lock();
        let Some(worker) = state.worker.take() else {
            return 0;
        };
        let generation = worker.token.generation();
        state.retired.push(worker);
        state.retired.retain(|w| !w.is_finished());
        for retired in &state.retired {
            retired.token.stop();
        }
        state.handler = None;
        let abandoned = state.pending.len();
        state.pending.clear();
        debug!(generation, abandoned, lingering = state.retired.len(), "loader stopped");
        abandoned
    }

    /// Number of entries waiting for the loader.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Returns true while the current generation's loader thread is alive.
    ///
    /// Superseded or stopped loaders still finishing an entry are not
    /// counted; see [`Self::live_loaders`].
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared
            .lock()
            .worker
            .as_ref()
            .map_or(false, |w| !w.is_finished())
    }

    /// Number of loader threads still alive, current or retired.
    #[must_use]
    pub fn live_loaders(&self) -> usize {
        let state = self.shared.lock();
        let live = state
            .worker
            .iter()
            .chain(&state.retired)
            .filter(|w| !w.is_finished())
            .count();
        live
    }

    /// Generation of the current loader, if one was started and not stopped.
    #[must_use]
    pub fn current_generation(&self) -> Option<u64> {
        self.shared.lock().worker.as_ref().map(|w| w.token.generation())
    }

    /// Total loader threads spawned.
    #[must_use]
    pub fn workers_spawned(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }

    /// Waits until every loader thread, current or retired, has exited.
    /// Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let state = self.shared.lock();
        let exits: Vec<_> = state
            .worker
            .iter()
            .chain(&state.retired)
            .map(|w| w.exited.clone())
            .collect();
        drop(state);

        exits
            .iter()
            .all(|exited| !matches!(exited.recv_deadline(deadline), Err(RecvTimeoutError::Timeout)))
    }
}

impl std::fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestQueue")
            .field("thread_name", &self.thread_name)
            .field("pending", &self.pending_len())
            .field("spawned", &self.workers_spawned())
            .finish_non_exhaustive()
    }
}

impl Drop for RequestQueue {
    fn drop(&mut self) {
        // Do not join: the loader may be blocked inside a platform call.
        // It exits at its next abort check.
        let state = self.shared.lock();
        for worker in state.worker.iter().chain(&state.retired) {
            worker.token.stop();
        }
    }
}
