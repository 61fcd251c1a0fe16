//! Completion events and their delivery.
//!
//! The loader reports through an [`EntryEventHandler`]. The usual handler is
//! the sending half of an [`EventStream`], which never blocks the loader.
//! At most `capacity` updates wait unread; further updates are dropped and
//! counted. `FullyDrawn` is never dropped while the stream is alive.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::entry::BatteryEntry;
use crate::error::{BatteryError, BatteryResult, QueueError};

const STREAM_PATH: &str = "entry_events";

/// Message code for a label/icon update.
pub const MSG_UPDATE_NAME_ICON: u32 = 1;
/// Message code for the end of a drain.
pub const MSG_REPORT_FULLY_DRAWN: u32 = 2;

/// Event emitted by the loader.
#[derive(Clone)]
pub enum EntryEvent {
    /// The entry's label and icon were resolved.
    NameIconUpdated {
        entry: Arc<BatteryEntry>,
    },
    /// The queue drained; emitted once per loader run.
    FullyDrawn,
}

impl EntryEvent {
    /// Numeric message code.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::NameIconUpdated { .. } => MSG_UPDATE_NAME_ICON,
            Self::FullyDrawn => MSG_REPORT_FULLY_DRAWN,
        }
    }

    /// The updated entry, for `NameIconUpdated`.
    #[must_use]
    pub fn entry(&self) -> Option<&Arc<BatteryEntry>> {
        match self {
            Self::NameIconUpdated { entry } => Some(entry),
            Self::FullyDrawn => None,
        }
    }
}

impl fmt::Debug for EntryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameIconUpdated { entry } => f
                .debug_struct("NameIconUpdated")
                .field("entry", &entry.id())
                .field("label", &entry.label())
                .finish(),
            Self::FullyDrawn => f.write_str("FullyDrawn"),
        }
    }
}

/// Receives loader events. Called on the loader thread.
pub trait EntryEventHandler: Send + Sync {
    /// Handles one event. Must not block for long.
    fn on_event(&self, event: EntryEvent);
}

impl<F> EntryEventHandler for F
where
    F: Fn(EntryEvent) + Send + Sync,
{
    fn on_event(&self, event: EntryEvent) {
        self(event);
    }
}

/// Handler that forwards events into an [`EventStream`].
#[derive(Debug)]
pub struct ChannelHandler {
    tx: Sender<EntryEvent>,
    unread: Arc<AtomicUsize>,
    capacity: usize,
    dropped: AtomicU64,
}

impl ChannelHandler {
    /// Number of events dropped because the stream was full or gone.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn reserve_update(&self) -> bool {
        self.unread
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < self.capacity).then_some(n + 1))
            .is_ok()
    }
}

impl EntryEventHandler for ChannelHandler {
    fn on_event(&self, event: EntryEvent) {
        let is_update = event.entry().is_some();
        if is_update && !self.reserve_update() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if self.tx.send(event).is_err() {
            if is_update {
                self.unread.fetch_sub(1, Ordering::AcqRel);
            }
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Receiving end of a loader event channel.
#[derive(Debug)]
pub struct EventStream {
    rx: Receiver<EntryEvent>,
    unread: Arc<AtomicUsize>,
}

impl EventStream {
    fn take(&self, event: EntryEvent) -> EntryEvent {
        if event.entry().is_some() {
            self.unread.fetch_sub(1, Ordering::AcqRel);
        }
        event
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> BatteryResult<EntryEvent> {
        self.rx.recv().map(|e| self.take(e)).map_err(|_| disconnected())
    }

    /// Receive the next event with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> BatteryResult<EntryEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Ok(self.take(event)),
            Err(RecvTimeoutError::Timeout) => Err(QueueError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            }
            .into()),
            Err(RecvTimeoutError::Disconnected) => Err(disconnected()),
        }
    }

    /// Returns the next event if one is ready.
    pub fn try_recv(&self) -> BatteryResult<Option<EntryEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(self.take(event))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(disconnected()),
        }
    }

    /// Collects events until `FullyDrawn` arrives, returning everything
    /// received before it.
    pub fn drain_until_fully_drawn(&self, timeout: Duration) -> BatteryResult<Vec<EntryEvent>> {
        let mut events = Vec::new();
        loop {
            match self.recv_timeout(timeout)? {
                EntryEvent::FullyDrawn => return Ok(events),
                event => events.push(event),
            }
        }
    }
}

fn disconnected() -> BatteryError {
    QueueError::Disconnected {
        path: STREAM_PATH.to_string(),
    }
    .into()
}

/// Creates a connected handler/stream pair holding at most `capacity`
/// unread updates.
#[must_use]
pub fn event_channel(capacity: usize) -> (Arc<ChannelHandler>, EventStream) {
    let (tx, rx) = unbounded::<EntryEvent>();
    let unread = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(ChannelHandler {
        tx,
        unread: Arc::clone(&unread),
        capacity: capacity.max(1),
        dropped: AtomicU64::new(0),
    });
    (handler, EventStream { rx, unread })
}
