//! The one boundary the core consumes: a restartable, lazy sequence of
//! `(username, Thread)` pairs in storage order.

use crate::date::TimeRange;
use crate::error::Result;
use crate::model::Thread;
use crate::slice::TimeSlice;

pub type ThreadItem = Result<(String, Thread)>;
pub type ThreadIter<'a> = Box<dyn Iterator<Item = ThreadItem> + 'a>;

/// Source of threads. Every call to `iterate` must start a fresh, independent
/// traversal; implementations that do I/O should do it one thread at a time.
pub trait DatasetAccessor {
    fn iterate(&self) -> Result<ThreadIter<'_>>;

    /// Window every item-level iteration over this accessor is narrowed to.
    fn window(&self) -> Option<TimeRange> {
        None
    }

    /// Read-only view narrowed to `[start, end]` (inclusive, epoch seconds).
    fn time_slice(&self, start: i64, end: i64) -> TimeSlice<'_, Self>
    where
        Self: Sized,
    {
        TimeSlice::new(self, TimeRange::new(start, end))
    }
}

impl<D: DatasetAccessor + ?Sized> DatasetAccessor for &D {
    fn iterate(&self) -> Result<ThreadIter<'_>> {
        (**self).iterate()
    }
    fn window(&self) -> Option<TimeRange> {
        (**self).window()
    }
}

/// Threads held in memory, iterated in insertion order.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDataset {
    rows: Vec<(String, Thread)>,
}

impl InMemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, owner: impl Into<String>, thread: Thread) {
        self.rows.push((owner.into(), thread));
    }

    pub fn with_thread(mut self, thread: Thread) -> Self {
        let owner = thread.owner().to_string();
        self.push(owner, thread);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<Thread> for InMemoryDataset {
    fn from_iter<I: IntoIterator<Item = Thread>>(iter: I) -> Self {
        iter.into_iter().fold(InMemoryDataset::new(), InMemoryDataset::with_thread)
    }
}

impl DatasetAccessor for InMemoryDataset {
    fn iterate(&self) -> Result<ThreadIter<'_>> {
        Ok(Box::new(self.rows.iter().map(|(u, t)| Ok((u.clone(), t.clone())))))
    }
}
