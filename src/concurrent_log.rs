//! Mutex-guarded ordered log shared by every connection of a service.
//!
//! One [`ConcurrentLog`] serves three unrelated element types (registry
//! mappings, station visitor ids, visitor-side station infos).  What varies
//! per type (comparison and rendering) is bundled in
//! the [`LogEntry`] trait.
//!
//! Every structural operation takes the same guard, so at most one of
//! append / find / sort / render is in flight per instance.  Nothing under
//! the guard performs I/O.

use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Per-type strategies for a [`ConcurrentLog`] element.
pub trait LogEntry: Clone + Send + 'static {
    /// Search and sort key.
    type Key: Ord + ?Sized;

    fn key(&self) -> &Self::Key;

    /// Append the textual form of this item to `out`.
    fn render(&self, out: &mut String);

    fn compare(&self, other: &Self) -> Ordering {
        self.key().cmp(other.key())
    }
}

impl LogEntry for String {
    type Key = str;

    fn key(&self) -> &str {
        self
    }

    fn render(&self, out: &mut String) {
        out.push_str(self);
    }
}

/// Errors raised by log mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// The backing storage could not grow.
    #[error("log storage exhausted")]
    ResourceExhausted,
}

/// Thread-safe ordered container.
#[derive(Debug)]
pub struct ConcurrentLog<T> {
    items: Mutex<Vec<T>>,
}

impl<T: LogEntry> Default for ConcurrentLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: LogEntry> ConcurrentLog<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Items are plain values and every operation leaves the vec consistent,
    /// so a guard poisoned by a panicking handler is still usable.
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `item` at the end.
    pub fn append(&self, item: T) -> Result<(), LogError> {
        let mut items = self.lock();
        push(&mut items, item)
    }

    /// First item whose key equals `key`.
    pub fn find(&self, key: &T::Key) -> Option<T> {
        self.lock().iter().find(|item| item.key() == key).cloned()
    }

    /// Append `item` unless an item with the same key is already present.
    ///
    /// The check and the append happen under one guard acquisition, so racing
    /// inserts of the same key store exactly one item.  Returns `true` when
    /// the item was stored.
    pub fn insert_if_absent(&self, item: T) -> Result<bool, LogError> {
        let mut items = self.lock();
        if items.iter().any(|existing| existing.key() == item.key()) {
            return Ok(false);
        }
        push(&mut items, item)?;
        Ok(true)
    }

    /// Sort stored items by key.
    ///
    /// The new order is visible to every later operation on this log.  Ties
    /// between distinct items with equal keys land in unspecified order.
    pub fn sort_in_place(&self) {
        self.lock().sort_unstable_by(T::compare);
    }

    /// Render every item, joined by `\n`, with no trailing newline.
    ///
    /// An empty log renders as the empty string.
    pub fn render_all(&self) -> String {
        let items = self.lock();
        let mut out = String::new();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            item.render(&mut out);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn push<T>(items: &mut Vec<T>, item: T) -> Result<(), LogError> {
    items
        .try_reserve(1)
        .map_err(|_| LogError::ResourceExhausted)?;
    items.push(item);
    Ok(())
}
