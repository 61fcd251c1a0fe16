//! The name-and-icon loader thread.
//!
//! One loader drains the pending queue at a time. Cancellation is
//! cooperative: the loader checks its abort token at the top of every
//! iteration, so a resolution already in flight always completes.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};
use tracing::debug;

use crate::error::QueueError;
use crate::resolver::Resolver;

use super::events::EntryEvent;
use super::QueueShared;

const RUNNING: u8 = 0;
const SUPERSEDED: u8 = 1;
const STOPPED: u8 = 2;

/// Generation-stamped abort flag for one loader run.
///
/// A superseded loader hands the queue to its successor and may still report
/// the entry it was resolving; a stopped loader reports nothing further.
#[derive(Debug, Clone)]
pub(crate) struct AbortToken {
    generation: u64,
    state: Arc<AtomicU8>,
}

impl AbortToken {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            generation,
            state: Arc::new(AtomicU8::new(RUNNING)),
        }
    }

    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }

    /// Aborts because a newer loader took over.
    pub(crate) fn supersede(&self) {
        let _ = self
            .state
            .compare_exchange(RUNNING, SUPERSEDED, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Aborts because the queue was stopped.
    pub(crate) fn stop(&self) {
        self.state.store(STOPPED, Ordering::Release);
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.state.load(Ordering::Acquire) != RUNNING
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.state.load(Ordering::Acquire) == STOPPED
    }
}

/// A spawned loader and its token.
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    pub token: AbortToken,
    pub join: JoinHandle<()>,
    /// Disconnects when the loader thread exits.
    pub exited: Receiver<()>,
}

impl WorkerHandle {
    pub(crate) fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

pub(crate) fn spawn(
    shared: Arc<QueueShared>,
    resolver: Resolver,
    token: AbortToken,
    name: &str,
    lower_priority: bool,
) -> Result<WorkerHandle, QueueError> {
    let (exit_tx, exited) = bounded::<()>(0);
    let thread_token = token.clone();
    let join = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            // Dropped on return or unwind, which disconnects `exited`.
            let _exit = exit_tx;
            if lower_priority {
                lower_current_thread_priority();
            }
            worker_loop(&shared, &resolver, &thread_token);
        })
        .map_err(|e| QueueError::SpawnFailed {
            name: name.to_string(),
            message: e.to_string(),
        })?;
    Ok(WorkerHandle { token, join, exited })
}

fn worker_loop(shared: &QueueShared, resolver: &Resolver, token: &AbortToken) {
    let generation = token.generation();
    debug!(generation, "loader started");
    let mut resolved = 0usize;

    loop {
        let entry = {
            let mut state = shared.lock();
            if token.is_aborted() {
                debug!(generation, resolved, "loader aborted");
                return;
            }
            let next = state.pending.pop_front();
            let Some(entry) = next else {
                let handler = state.handler.clone();
                drop(state);
                debug!(generation, resolved, "queue drained");
                if let Some(handler) = handler {
                    handler.on_event(EntryEvent::FullyDrawn);
                }
                return;
            };
            entry
        };

        if resolver.load_name_and_icon(&entry).is_some() {
            resolved += 1;
            // `stop` flips the token under the queue lock, so a stopped loader
            // can never observe a handler registered afterwards.
            let handler = {
                let state = shared.lock();
                if token.is_stopped() {
                    None
                } else {
                    state.handler.clone()
                }
            };
            if let Some(handler) = handler {
                handler.on_event(EntryEvent::NameIconUpdated { entry });
            }
        }
    }
}

/// Nice value for the loader thread.
#[cfg(target_os = "linux")]
const LOWEST_NICE: libc::c_int = 19;

#[cfg(target_os = "linux")]
fn lower_current_thread_priority() {
    // Nice values are per thread on Linux; `who == 0` targets the caller.
    // SAFETY: setpriority only reads its integer arguments.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, LOWEST_NICE) };
    if rc != 0 {
        tracing::warn!(error = %std::io::Error::last_os_error(), "failed to lower loader priority");
    }
}

#[cfg(not(target_os = "linux"))]
fn lower_current_thread_priority() {
    tracing::trace!("thread priority is not adjustable on this platform");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_token_is_shared_between_clones() {
        let token = AbortToken::new(7);
        let clone = token.clone();
        assert!(!clone.is_aborted());
        token.supersede();
        assert!(clone.is_aborted());
        assert!(!clone.is_stopped());
        assert_eq!(clone.generation(), 7);
    }

    #[test]
    fn stop_wins_over_supersede() {
        let token = AbortToken::new(1);
        token.stop();
        token.supersede();
        assert!(token.is_stopped());
    }
}
