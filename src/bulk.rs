//! Buffered bulk updates.
//!
//! [`BulkUpdater`] collects entries, drops no-ops, and hands full batches to
//! the planner in one pass each. [`bulk_update_async`] produces entries on a
//! worker thread and feeds them to a [`BulkUpdater`] through a bounded
//! channel; the hypertrie itself is only touched by the calling thread.

use std::fmt;
use std::panic;
use std::thread::{self, Builder};

use crossbeam::channel::{Sender, bounded};
use rustc_hash::FxHashMap;

use crate::config;
use crate::error::HypertrieError;
use crate::hypertrie::Hypertrie;
use crate::key::{RawKey, SingleEntry};
use crate::value::{KeyPart, Value};

/// Whether buffered keys are inserted or erased.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BulkMode {
    /// Set every added key to its value; [`Value::ZERO`] erases.
    #[default]
    Insert,
    /// Erase every added key.
    Erase,
}

/// Settings of a [`BulkUpdater`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BulkUpdaterSettings {
    /// Number of buffered entries that triggers a flush.
    pub bulk_size: usize,
    /// Insert or erase.
    pub mode: BulkMode,
}

impl BulkUpdaterSettings {
    /// Default batch size.
    pub const DEFAULT_BULK_SIZE: usize = 1_000_000;

    /// Sets the batch size; zero is treated as one.
    #[must_use]
    pub const fn with_bulk_size(mut self, bulk_size: usize) -> Self {
        self.bulk_size = if bulk_size == 0 { 1 } else { bulk_size };
        self
    }

    /// Sets the mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: BulkMode) -> Self {
        self.mode = mode;
        self
    }
}

impl Default for BulkUpdaterSettings {
    fn default() -> Self {
        Self {
            bulk_size: Self::DEFAULT_BULK_SIZE,
            mode: BulkMode::Insert,
        }
    }
}

/// Counters reported after every flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkStats {
    /// Keys added so far.
    pub seen: usize,
    /// Entries actually changed so far.
    pub applied: usize,
    /// Size of the hypertrie after the last flush.
    pub size_after: usize,
}

type FlushCallback<'a> = Box<dyn FnMut(&BulkStats) + 'a>;

/// Buffers updates to a hypertrie and applies them in batches.
///
/// Flushes when the buffer reaches the configured size, on
/// [`flush`](Self::flush), on [`finish`](Self::finish), and on drop.
pub struct BulkUpdater<'a, K: KeyPart, V: Value> {
    trie: &'a mut Hypertrie<K, V>,
    settings: BulkUpdaterSettings,
    buffer: FxHashMap<RawKey<K>, V>,
    stats: BulkStats,
    on_flush: Option<FlushCallback<'a>>,
}

impl<'a, K: KeyPart, V: Value> BulkUpdater<'a, K, V> {
    /// Creates an updater for `trie`.
    #[must_use]
    pub fn new(trie: &'a mut Hypertrie<K, V>, settings: BulkUpdaterSettings) -> Self {
        let settings = settings.with_bulk_size(settings.bulk_size);
        Self {
            trie,
            settings,
            buffer: FxHashMap::default(),
            stats: BulkStats::default(),
            on_flush: None,
        }
    }

    /// Calls `callback` with the running counters after every flush.
    #[must_use]
    pub fn with_callback(mut self, callback: impl FnMut(&BulkStats) + 'a) -> Self {
        self.on_flush = Some(Box::new(callback));
        self
    }

    /// Adds `key` with `value`. In insert mode [`Value::ZERO`] erases the
    /// key; in erase mode the value is ignored and the key is erased.
    ///
    /// Keys added twice keep the last value. Keys whose stored value already
    /// matches are not buffered.
    ///
    /// # Errors
    ///
    /// [`HypertrieError::KeyLengthMismatch`] if `key.len() != depth`.
    pub fn add(&mut self, key: &[K], value: V) -> Result<(), HypertrieError> {
        config::check_key_len(self.trie.depth(), key.len())?;
        self.stats.seen += 1;
        let target = match self.settings.mode {
            BulkMode::Insert => value,
            BulkMode::Erase => V::ZERO,
        };
        if self.trie.get_unchecked(key) == target {
            self.buffer.remove(key);
            return Ok(());
        }
        self.buffer.insert(RawKey::from_slice(key), target);
        if self.buffer.len() >= self.settings.bulk_size {
            self.flush();
        }
        Ok(())
    }

    /// Adds `key` with [`Value::ONE`].
    ///
    /// # Errors
    ///
    /// As [`add`](Self::add).
    pub fn add_key(&mut self, key: &[K]) -> Result<(), HypertrieError> {
        self.add(key, V::ONE)
    }

    /// Applies all buffered updates and returns the running counters.
    pub fn flush(&mut self) -> BulkStats {
        if self.buffer.is_empty() {
            return self.stats;
        }
        let buffered = self.buffer.len();
        let applied = match self.settings.mode {
            BulkMode::Insert => {
                let entries = self
                    .buffer
                    .drain()
                    .map(|(key, value)| SingleEntry { key, value })
                    .collect();
                self.trie.insert_unchecked(entries)
            }
            BulkMode::Erase => {
                let keys = self.buffer.drain().map(|(key, _)| key).collect();
                self.trie.erase_unchecked(keys)
            }
        };
        self.stats.applied += applied;
        self.stats.size_after = self.trie.size();
        tracing::debug!(
            mode = ?self.settings.mode,
            buffered,
            applied,
            size = self.stats.size_after,
            "bulk flush"
        );
        if let Some(callback) = self.on_flush.as_mut() {
            callback(&self.stats);
        }
        self.stats
    }

    /// Flushes and returns the final counters.
    pub fn finish(mut self) -> BulkStats {
        self.flush()
    }

    /// Running counters.
    #[must_use]
    pub const fn stats(&self) -> BulkStats {
        self.stats
    }
}

impl<K: KeyPart, V: Value> Drop for BulkUpdater<'_, K, V> {
    fn drop(&mut self) {
        self.flush();
    }
}

impl<K: KeyPart, V: Value> fmt::Debug for BulkUpdater<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkUpdater")
            .field("settings", &self.settings)
            .field("buffered", &self.buffer.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Runs `produce` on a worker thread and applies everything it sends.
///
/// Entries travel through a channel bounded to `queue_capacity`, so the
/// producer blocks while the updater is busy. The producer should stop when
/// a send fails; that happens once the receiving side has given up after
/// an error.
///
/// # Errors
///
/// [`HypertrieError::Spawn`] if the worker cannot be started;
/// [`HypertrieError::KeyLengthMismatch`] for a key of the wrong length.
/// Entries received before the error are applied.
///
/// # Panics
///
/// Re-raises a panic of `produce`.
pub fn bulk_update_async<K, V, F>(
    trie: &mut Hypertrie<K, V>,
    settings: BulkUpdaterSettings,
    queue_capacity: usize,
    produce: F,
) -> Result<BulkStats, HypertrieError>
where
    K: KeyPart + Send,
    V: Value + Send,
    F: FnOnce(&Sender<(RawKey<K>, V)>) + Send,
{
    thread::scope(|scope| {
        let (sender, receiver) = bounded(queue_capacity.max(1));
        let producer = Builder::new()
            .name("hypertrie-bulk-producer".to_owned())
            .spawn_scoped(scope, move || produce(&sender))?;

        let mut updater = BulkUpdater::new(trie, settings);
        for (key, value) in &receiver {
            updater.add(&key, value)?;
        }
        let stats = updater.finish();

        if let Err(payload) = producer.join() {
            panic::resume_unwind(payload);
        }
        Ok(stats)
    })
}
