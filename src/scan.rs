//! Iteration engine: lazy, restartable thread/post/comment sequences over any
//! `DatasetAccessor`, filtered by a `QuerySpec` and the active time window.
//! Nothing is reordered or buffered beyond the thread currently being pulled.

use crate::dataset::{DatasetAccessor, ThreadItem, ThreadIter};
use crate::date::TimeRange;
use crate::error::{Error, Result};
use crate::model::{Comment, Post, RecordRef, Thread};
use crate::query::{ConditionValue, MetadataFilter, Predicate, QuerySpec, TextFilter};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::VecDeque;

pub type PostItem = Result<(String, Post)>;
pub type CommentItem = Result<(String, Comment, Post)>;

/// A search match from `Scan::search_text`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum Hit {
    Post(Post),
    Comment(Comment),
}

pub struct Scan<'a, D: ?Sized> {
    data: &'a D,
    query: QuerySpec,
}

impl<'a, D: DatasetAccessor + ?Sized> Scan<'a, D> {
    pub fn new(data: &'a D) -> Self {
        Self { data, query: QuerySpec::default() }
    }

    pub fn with_query(data: &'a D, query: QuerySpec) -> Self {
        Self { data, query: query.normalize() }
    }

    pub fn query(&self) -> &QuerySpec {
        &self.query
    }

    // -------- Builder methods --------
    pub fn user(mut self, name: impl AsRef<str>) -> Self {
        self.query.users = Some(vec![name.as_ref().to_string()]); self.query = self.query.normalize(); self
    }
    pub fn users<I, S>(mut self, iter: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> {
        self.query.users = Some(iter.into_iter().map(|s| s.as_ref().to_string()).collect()); self.query = self.query.normalize(); self
    }
    pub fn community(mut self, name: impl AsRef<str>) -> Self {
        self.query.community = Some(name.as_ref().to_string()); self.query = self.query.normalize(); self
    }
    /// Intersects with any range already set on this scan.
    pub fn time_range(mut self, start: i64, end: i64) -> Self {
        self.query.time_range = TimeRange::intersect_opt(self.query.time_range, Some(TimeRange::new(start, end))); self
    }
    pub fn window(mut self, range: Option<TimeRange>) -> Self {
        self.query.time_range = TimeRange::intersect_opt(self.query.time_range, range); self
    }
    pub fn keywords_any<I, S>(mut self, iter: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> {
        self.query.predicate.text = Some(TextFilter::any(iter)); self
    }
    pub fn keywords_all<I, S>(mut self, iter: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> {
        self.query.predicate.text = Some(TextFilter::all(iter)); self
    }
    pub fn text_filter(mut self, filter: TextFilter) -> Self {
        self.query.predicate.text = Some(filter); self
    }
    /// Add one `field[__op]` condition. Fails fast on an unknown operator suffix.
    pub fn condition(mut self, key: &str, value: impl Into<ConditionValue>) -> Result<Self> {
        let filter = MetadataFilter::from_pairs([(key, value)])?;
        self.query.predicate = self.query.predicate.with_metadata(filter); Ok(self)
    }
    pub fn metadata(mut self, filter: MetadataFilter) -> Self {
        self.query.predicate = self.query.predicate.with_metadata(filter); self
    }
    pub fn filter(mut self, f: impl Fn(RecordRef<'_>) -> bool + Send + Sync + 'static) -> Self {
        self.query.predicate = std::mem::take(&mut self.query.predicate).with_custom(f); self
    }
    pub fn predicate(mut self, p: Predicate) -> Self {
        let Predicate { metadata, text, custom } = p;
        self.query.predicate.metadata.conditions.extend(metadata.conditions);
        if text.is_some() { self.query.predicate.text = text; }
        self.query.predicate.custom.extend(custom);
        self
    }

    /// Accessor window intersected with the scan's own range.
    pub fn effective_window(&self) -> Option<TimeRange> {
        TimeRange::intersect_opt(self.data.window(), self.query.time_range)
    }

    // -------- Lazy terminals --------

    /// Threads intersecting the window, yielded whole. A thread qualifies when its root
    /// post or any comment falls inside the window, so it may carry out-of-window items;
    /// `posts` and `comments` filter strictly by each record's own timestamp.
    pub fn threads(&self) -> Result<Threads<'_>> {
        Ok(Threads { inner: self.data.iterate()?, query: &self.query, window: self.effective_window() })
    }

    pub fn posts(&self) -> Result<Posts<'_>> {
        Ok(Posts { inner: self.data.iterate()?, query: &self.query, window: self.effective_window() })
    }

    pub fn comments(&self) -> Result<Comments<'_>> {
        Ok(Comments {
            inner: self.data.iterate()?,
            query: &self.query,
            window: self.effective_window(),
            pending: VecDeque::new(),
        })
    }

    /// Regex search over post (`title body`) and comment text, within the scan's scope.
    pub fn search_text(&self, pattern: &str, case_sensitive: bool) -> Result<impl Iterator<Item = Result<(String, Hit)>> + '_> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| Error::config(format!("invalid search pattern: {e}")))?;
        let window = self.effective_window();
        let query = &self.query;
        let it = self.data.iterate()?.flat_map(move |item| -> Vec<Result<(String, Hit)>> {
            let (_, thread) = match item {
                Ok(x) => x,
                Err(e) => return vec![Err(e)],
            };
            if !query.admits_community(&thread) {
                return Vec::new();
            }
            let (_, post, comments) = thread.into_parts();
            let mut hits = Vec::new();
            if hit(&re, query, RecordRef::Post(&post), window) {
                hits.push(Ok((post.author().to_string(), Hit::Post(post))));
            }
            for c in comments {
                if hit(&re, query, RecordRef::Comment(&c), window) {
                    hits.push(Ok((c.author().to_string(), Hit::Comment(c))));
                }
            }
            hits
        });
        Ok(it)
    }

    // -------- Callback terminals --------

    pub fn for_each_thread(&self, mut f: impl FnMut(&str, &Thread)) -> Result<()> {
        for item in self.threads()? {
            let (owner, thread) = item?;
            f(&owner, &thread);
        }
        Ok(())
    }

    pub fn for_each_post(&self, mut f: impl FnMut(&str, &Post)) -> Result<()> {
        for item in self.posts()? {
            let (author, post) = item?;
            f(&author, &post);
        }
        Ok(())
    }

    pub fn for_each_comment(&self, mut f: impl FnMut(&str, &Comment, &Post)) -> Result<()> {
        for item in self.comments()? {
            let (author, comment, post) = item?;
            f(&author, &comment, &post);
        }
        Ok(())
    }
}

fn hit(re: &Regex, query: &QuerySpec, rec: RecordRef<'_>, window: Option<TimeRange>) -> bool {
    query.admits_record(rec, window) && re.is_match(&rec.text())
}

pub struct Threads<'s> {
    inner: ThreadIter<'s>,
    query: &'s QuerySpec,
    window: Option<TimeRange>,
}

impl<'s> Iterator for Threads<'s> {
    type Item = ThreadItem;

    fn next(&mut self) -> Option<ThreadItem> {
        loop {
            match self.inner.next()? {
                Ok((owner, thread)) => {
                    if self.query.admits_thread(&owner, &thread, self.window) {
                        return Some(Ok((owner, thread)));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub struct Posts<'s> {
    inner: ThreadIter<'s>,
    query: &'s QuerySpec,
    window: Option<TimeRange>,
}

impl<'s> Iterator for Posts<'s> {
    type Item = PostItem;

    fn next(&mut self) -> Option<PostItem> {
        loop {
            match self.inner.next()? {
                Ok((_, thread)) => {
                    if !self.query.admits_community(&thread) {
                        continue;
                    }
                    if self.query.admits_record(RecordRef::Post(thread.post()), self.window) {
                        let (_, post, _) = thread.into_parts();
                        return Some(Ok((post.author().to_string(), post)));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub struct Comments<'s> {
    inner: ThreadIter<'s>,
    query: &'s QuerySpec,
    window: Option<TimeRange>,
    pending: VecDeque<(String, Comment, Post)>,
}

impl<'s> Iterator for Comments<'s> {
    type Item = CommentItem;

    fn next(&mut self) -> Option<CommentItem> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Some(Ok(row));
            }
            match self.inner.next()? {
                Ok((_, thread)) => {
                    if !self.query.admits_community(&thread) {
                        continue;
                    }
                    let (_, post, comments) = thread.into_parts();
                    for c in comments {
                        if self.query.admits_record(RecordRef::Comment(&c), self.window) {
                            self.pending.push_back((c.author().to_string(), c, post.clone()));
                        }
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
