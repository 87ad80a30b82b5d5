//! Temporal smoothing of per-face classification labels.
//!
//! - `RollingLabelBuffer`: fixed-capacity FIFO with majority vote.
//! - `LabelBufferMap`: one buffer per tracked face, bounded in size.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Smallest capacity a buffer may be constructed with.
pub const MIN_LABEL_WINDOW: usize = 3;

/// Default window size for expression smoothing.
pub const DEFAULT_LABEL_WINDOW: usize = 7;

/// Default bound on the number of tracked identities.
pub const DEFAULT_MAX_TRACKED: usize = 16;

/// Bounded FIFO of recent labels.
///
/// `mode()` returns the most frequent label. Ties go to the label pushed most
/// recently among the tied set. An empty buffer yields `L::default()`.
#[derive(Clone, Debug)]
pub struct RollingLabelBuffer<L> {
    labels: VecDeque<L>,
    capacity: usize,
}

impl<L: Clone + PartialEq + Default> RollingLabelBuffer<L> {
    /// Capacity below `MIN_LABEL_WINDOW` is raised to it.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_LABEL_WINDOW);
        Self {
            labels: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, label: L) {
        self.labels.push_back(label);
        while self.labels.len() > self.capacity {
            self.labels.pop_front();
        }
    }

    pub fn mode(&self) -> L {
        let mut best: Option<(&L, usize)> = None;
        // Walk newest first so the first label reaching the max count wins ties.
        for label in self.labels.iter().rev() {
            let count = self.labels.iter().filter(|l| *l == label).count();
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((label, count)),
            }
        }
        best.map(|(label, _)| label.clone()).unwrap_or_default()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &L> + '_ {
        self.labels.iter()
    }
}

/// Rolling buffers keyed by a per-session identity.
///
/// Buffers are created lazily. Once the map holds more than `max_entries`
/// identities, the least recently updated ones are evicted (ties resolved by
/// key order) until it is back at the bound.
#[derive(Debug)]
pub struct LabelBufferMap<K, L> {
    entries: HashMap<K, TrackedBuffer<L>>,
    window: usize,
    max_entries: usize,
    tick: u64,
}

#[derive(Debug)]
struct TrackedBuffer<L> {
    buffer: RollingLabelBuffer<L>,
    last_touched: u64,
}

impl<K, L> LabelBufferMap<K, L>
where
    K: Copy + Eq + Hash + Ord,
    L: Clone + PartialEq + Default,
{
    pub fn new(window: usize, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            window,
            max_entries: max_entries.max(1),
            tick: 0,
        }
    }

    /// Record a label for `key` and return the smoothed label.
    pub fn push(&mut self, key: K, label: L) -> L {
        self.tick += 1;
        let tick = self.tick;
        let window = self.window;
        let entry = self.entries.entry(key).or_insert_with(|| TrackedBuffer {
            buffer: RollingLabelBuffer::new(window),
            last_touched: tick,
        });
        entry.buffer.push(label);
        entry.last_touched = tick;
        let smoothed = entry.buffer.mode();
        self.prune();
        smoothed
    }

    /// Smoothed label for `key` without recording anything.
    pub fn current(&self, key: &K) -> Option<L> {
        self.entries.get(key).map(|entry| entry.buffer.mode())
    }

    pub fn buffer(&self, key: &K) -> Option<&RollingLabelBuffer<L>> {
        self.entries.get(key).map(|entry| &entry.buffer)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn prune(&mut self) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        let mut by_age: Vec<(u64, K)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.last_touched, *key))
            .collect();
        by_age.sort();
        let excess = self.entries.len() - self.max_entries;
        for (_, key) in by_age.into_iter().take(excess) {
            self.entries.remove(&key);
        }
        log::debug!("label buffers pruned by {} to {}", excess, self.entries.len());
    }
}
