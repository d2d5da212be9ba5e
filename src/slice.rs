//! Time-slice views: borrow an accessor and narrow everything to a fixed window.
//! Slices compose by intersection; the underlying data is never copied.

use crate::dataset::{DatasetAccessor, ThreadIter};
use crate::date::TimeRange;
use crate::error::Result;

pub struct TimeSlice<'a, D: ?Sized> {
    inner: &'a D,
    range: TimeRange,
}

impl<'a, D: DatasetAccessor + ?Sized> TimeSlice<'a, D> {
    pub fn new(inner: &'a D, range: TimeRange) -> Self {
        Self { inner, range }
    }

    /// The range this view was created with, before intersecting with the inner view.
    pub fn own_range(&self) -> TimeRange {
        self.range
    }

    /// Effective window: this slice intersected with every enclosing slice.
    pub fn effective_range(&self) -> TimeRange {
        match self.inner.window() {
            Some(outer) => outer.intersect(&self.range),
            None => self.range,
        }
    }
}

impl<'a, D: DatasetAccessor + ?Sized> DatasetAccessor for TimeSlice<'a, D> {
    /// Yields whole threads that intersect the effective window. Items are narrowed
    /// individually by the iteration engine through `window()`.
    fn iterate(&self) -> Result<ThreadIter<'_>> {
        let window = self.effective_range();
        if window.is_empty() {
            tracing::debug!(%window, "empty time slice; nothing to iterate");
            return Ok(Box::new(std::iter::empty()));
        }
        let it = self.inner.iterate()?.filter(move |item| match item {
            Ok((_, thread)) => thread.intersects(&window),
            Err(_) => true,
        });
        Ok(Box::new(it))
    }

    fn window(&self) -> Option<TimeRange> {
        Some(self.effective_range())
    }
}
