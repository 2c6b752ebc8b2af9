use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::{History, HistorySlot, Queue, SlotStatus};
use crate::domain::SpeedHistory;

pub type SharedCache = Arc<Mutex<StateCache>>;

/// Locks the cache, recovering from a poisoned mutex
pub fn lock(cache: &SharedCache) -> MutexGuard<'_, StateCache> {
    cache.lock().unwrap_or_else(|e| e.into_inner())
}

/// Local snapshot of remote state.
///
/// The poll loop replaces the queue and history fields wholesale each cycle;
/// command handlers read from it and mirror a few optimistic updates. The
/// download tracker holds ids seen in a queue snapshot whose completion has
/// not been observed yet.
#[derive(Debug, Default)]
pub struct StateCache {
    queue: Queue,
    history: History,
    downloads: HashSet<String>,
    speed_history: SpeedHistory,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedCache {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn speed_samples(&self) -> Vec<f64> {
        self.speed_history.samples()
    }

    pub fn tracked_count(&self) -> usize {
        self.downloads.len()
    }

    pub fn is_tracked(&self, id: &str) -> bool {
        self.downloads.contains(id)
    }

    /// Replaces the queue snapshot and starts tracking ids not seen before.
    /// Returns the new slot count for the badge.
    pub fn apply_queue(&mut self, queue: Queue) -> usize {
        for slot in &queue.slots {
            self.downloads.insert(slot.nzo_id.clone());
        }
        let count = queue.slots.len();
        self.queue = queue;
        count
    }

    /// Replaces the history snapshot, records the transfer rate and returns
    /// the tracked slots that completed. Removing an id from the tracker here
    /// is what keeps a completion from being announced twice.
    pub fn apply_history(&mut self, history: History) -> Vec<HistorySlot> {
        self.speed_history.push(history.transfer_rate());

        let mut completed = Vec::new();
        for slot in &history.slots {
            if slot.status == SlotStatus::Completed && self.downloads.remove(&slot.nzo_id) {
                completed.push(slot.clone());
            }
        }

        self.history = history;
        completed
    }

    /// Stops tracking a single id after an explicit delete.
    /// Returns the remaining tracked count when the id was present.
    pub fn forget_download(&mut self, id: &str) -> Option<usize> {
        if self.downloads.remove(id) {
            Some(self.downloads.len())
        } else {
            None
        }
    }

    pub fn clear_downloads(&mut self) {
        self.downloads.clear();
    }

    /// Optimistic mirror of a speed-limit change; the next poll confirms it.
    /// A limit of zero means unlimited, which the server reports as empty.
    pub fn set_speed_limit_local(&mut self, limit: u32) {
        self.queue.speedlimit = Some(if limit == 0 {
            String::new()
        } else {
            limit.to_string()
        });
    }
}
