//! In-process remote document store.
//!
//! # Responsibility
//! - Implement [`RemoteDocumentStore`] for any number of clients in one process.
//! - Offer failure injection and held writes to exercise sync edge cases.
//!
//! # Invariants
//! - Watchers of a slot see every accepted write in acceptance order, and a
//!   new watcher's first event is never older than what others already saw.
//! - Sinks run under the delivery lock and must not call back into the store.
//! - Write callbacks run outside every store lock.

use crate::sync::remote_store::{
    RemoteDocumentStore, RemoteError, SlotRef, WatchEvent, WatchId, WatchSink, WriteCallback,
};
use log::debug;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

struct Watcher {
    slot: SlotRef,
    sink: WatchSink,
}

struct HeldWrite {
    slot: SlotRef,
    content: Value,
    done: WriteCallback,
}

#[derive(Default)]
struct MemoryState {
    slots: BTreeMap<SlotRef, Value>,
    watchers: BTreeMap<WatchId, Watcher>,
    next_watch_id: u64,
    write_failure: Option<RemoteError>,
    watch_failure: Option<RemoteError>,
    hold_writes: bool,
    held: VecDeque<HeldWrite>,
}

impl MemoryState {
    fn sinks_for(&self, slot: &SlotRef) -> Vec<WatchSink> {
        self.watchers
            .values()
            .filter(|watcher| &watcher.slot == slot)
            .map(|watcher| WatchSink::clone(&watcher.sink))
            .collect()
    }
}

/// Shared in-memory stand-in for a remote document database.
///
/// Wrap it in an `Arc` and hand one clone to every simulated client.
#[derive(Default)]
pub struct InMemoryRemoteStore {
    state: Mutex<MemoryState>,
    // Serializes state change plus fan-out; taken before `state`.
    delivery: Mutex<()>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current raw content of `slot`.
    pub fn content(&self, slot: &SlotRef) -> Option<Value> {
        self.lock().slots.get(slot).cloned()
    }

    /// Overwrites (or removes, with `None`) a slot as another writer would.
    pub fn set_content(&self, slot: &SlotRef, content: Option<Value>) {
        self.apply(slot, content);
    }

    /// Number of live watchers on `slot`.
    pub fn watcher_count(&self, slot: &SlotRef) -> usize {
        self.lock()
            .watchers
            .values()
            .filter(|watcher| &watcher.slot == slot)
            .count()
    }

    /// Makes every following `replace` fail with `error` until reset with `None`.
    pub fn fail_writes(&self, error: Option<RemoteError>) {
        self.lock().write_failure = error;
    }

    /// Makes every following `watch` fail with `error` until reset with `None`.
    pub fn fail_watches(&self, error: Option<RemoteError>) {
        self.lock().watch_failure = error;
    }

    /// Kills every watch on `slot`, reporting `error` to each watcher once.
    pub fn drop_watchers(&self, slot: &SlotRef, error: RemoteError) -> usize {
        let _delivery = self.lock_delivery();
        let sinks = {
            let mut state = self.lock();
            let ids = state
                .watchers
                .iter()
                .filter(|(_, watcher)| &watcher.slot == slot)
                .map(|(id, _)| *id)
                .collect::<Vec<_>>();
            ids.into_iter()
                .filter_map(|id| state.watchers.remove(&id))
                .map(|watcher| watcher.sink)
                .collect::<Vec<_>>()
        };
        for sink in &sinks {
            sink(WatchEvent::Failed(error.clone()));
        }
        sinks.len()
    }

    /// While enabled, `replace` queues writes instead of applying them.
    pub fn hold_writes(&self, hold: bool) {
        self.lock().hold_writes = hold;
    }

    /// Number of queued writes.
    pub fn pending_writes(&self) -> usize {
        self.lock().held.len()
    }

    /// Applies queued writes in submission order and returns how many ran.
    pub fn flush_writes(&self) -> usize {
        let held = std::mem::take(&mut self.lock().held);
        let count = held.len();
        for write in held {
            self.apply(&write.slot, Some(write.content));
            (write.done)(Ok(()));
        }
        count
    }

    fn apply(&self, slot: &SlotRef, content: Option<Value>) {
        let _delivery = self.lock_delivery();
        let (sinks, current) = {
            let mut state = self.lock();
            match content {
                Some(value) => {
                    state.slots.insert(slot.clone(), value);
                }
                None => {
                    state.slots.remove(slot);
                }
            }
            (state.sinks_for(slot), state.slots.get(slot).cloned())
        };
        debug!(
            "event=memory_remote_write module=sync status=ok slot={} watchers={}",
            slot,
            sinks.len()
        );
        for sink in sinks {
            sink(WatchEvent::Changed(current.clone()));
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_delivery(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RemoteDocumentStore for InMemoryRemoteStore {
    fn watch(&self, slot: &SlotRef, sink: WatchSink) -> Result<WatchId, RemoteError> {
        let _delivery = self.lock_delivery();
        let (watch_id, current) = {
            let mut state = self.lock();
            if let Some(error) = state.watch_failure.clone() {
                return Err(error);
            }
            state.next_watch_id += 1;
            let watch_id = WatchId(state.next_watch_id);
            state.watchers.insert(
                watch_id,
                Watcher {
                    slot: slot.clone(),
                    sink: WatchSink::clone(&sink),
                },
            );
            (watch_id, state.slots.get(slot).cloned())
        };
        sink(WatchEvent::Changed(current));
        Ok(watch_id)
    }

    fn unwatch(&self, watch_id: WatchId) {
        self.lock().watchers.remove(&watch_id);
    }

    fn replace(&self, slot: &SlotRef, content: Value, done: WriteCallback) {
        let failure = {
            let mut state = self.lock();
            match state.write_failure.clone() {
                Some(error) => Some(error),
                None if state.hold_writes => {
                    state.held.push_back(HeldWrite {
                        slot: slot.clone(),
                        content,
                        done,
                    });
                    return;
                }
                None => None,
            }
        };

        match failure {
            Some(error) => done(Err(error)),
            None => {
                self.apply(slot, Some(content));
                done(Ok(()));
            }
        }
    }
}
