//! Directory-backed dataset: one `<username>.jsonl[.zst|.gz]` file per user, each line a
//! `{"posts": [...], "comments": [...]}` row. Files are read one at a time, lazily.

use crate::config::{DatasetOptions, MalformedPolicy, RecordOptions};
use crate::dataset::{DatasetAccessor, ThreadItem, ThreadIter};
use crate::date::TimeRange;
use crate::error::Result;
use crate::jsonl::JsonlLines;
use crate::mem::maybe_throttle_low_memory;
use crate::model::Thread;
use crate::paths::{discover_user_files, UserFile};
use crate::progress::make_count_progress;
use crate::stats::Aggregator;
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct JsonlDirDataset {
    opts: DatasetOptions,
    files: Vec<UserFile>,
}

impl JsonlDirDataset {
    /// Discover the user files under `opts.root`. The file list is fixed from here on.
    pub fn open(opts: DatasetOptions) -> Result<Self> {
        let files = discover_user_files(&opts.root)?;
        if files.is_empty() {
            tracing::warn!(root = %opts.root.display(), "no user files found");
        } else {
            tracing::info!("Found {} user files under {}", files.len(), opts.root.display());
        }
        Ok(Self { opts, files })
    }

    pub fn options(&self) -> &DatasetOptions {
        &self.opts
    }

    pub fn root(&self) -> &Path {
        &self.opts.root
    }

    pub fn files(&self) -> &[UserFile] {
        &self.files
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.username.as_str())
    }

    /// Threads of a single user file, in line order.
    pub fn read_user_file<'a>(&'a self, file: &'a UserFile) -> Result<Rows<'a>> {
        let lines = JsonlLines::open(&file.path, file.kind, self.opts.read_buffer_bytes)?;
        tracing::debug!(user = %file.username, path = %file.path.display(), "reading user file");
        Ok(Rows {
            lines,
            username: &file.username,
            path: &file.path,
            records: &self.opts.records,
            policy: self.opts.on_malformed,
        })
    }

    /// Run `A` over every user file on the rayon pool and merge the partial results in
    /// file order. Thread and item admission match `stats::aggregate` over the same
    /// window, so `merge` only has to be associative for the results to agree.
    pub fn aggregate_parallel<A: Aggregator>(&self, window: Option<TimeRange>, on_dangling: MalformedPolicy) -> Result<A> {
        let pb = self.progress_bar("Aggregating user files");
        let threshold = self.opts.low_memory_threshold;

        let total = self
            .files
            .par_iter()
            .try_fold(|| A::default().with_dangling_policy(on_dangling), |mut acc, file| -> Result<A> {
                maybe_throttle_low_memory(threshold);
                for item in self.read_user_file(file)? {
                    let (owner, thread) = item?;
                    if window.map_or(true, |w| thread.intersects(&w)) {
                        acc.ingest(&owner, &thread, window)?;
                    }
                }
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
                Ok(acc)
            })
            .try_reduce(|| A::default().with_dangling_policy(on_dangling), |mut a, b| {
                a.merge(b);
                Ok(a)
            })?;

        if let Some(pb) = pb {
            pb.finish_with_message("Aggregation done");
        }
        Ok(total)
    }

    fn progress_bar(&self, fallback: &str) -> Option<ProgressBar> {
        self.opts.progress.then(|| {
            let label = self.opts.progress_label.as_deref().unwrap_or(fallback);
            make_count_progress(self.files.len() as u64, label)
        })
    }
}

impl DatasetAccessor for JsonlDirDataset {
    fn iterate(&self) -> Result<ThreadIter<'_>> {
        Ok(Box::new(DirIter { ds: self, next_file: 0, current: None, pb: self.progress_bar("Reading user files") }))
    }
}

/// Rows of one user file decoded into threads.
pub struct Rows<'a> {
    lines: JsonlLines,
    username: &'a str,
    path: &'a PathBuf,
    records: &'a RecordOptions,
    policy: MalformedPolicy,
}

impl Rows<'_> {
    /// Invalid UTF-8 surfaces here as a decode error, like any other bad row.
    fn decode(&self, line: &[u8]) -> Result<Thread> {
        let row: Value = serde_json::from_slice(line)?;
        Thread::from_row(self.username, &row, self.records)
    }
}

impl Iterator for Rows<'_> {
    type Item = ThreadItem;

    fn next(&mut self) -> Option<ThreadItem> {
        loop {
            let (line_no, line) = match self.lines.next()? {
                Ok(x) => x,
                Err(e) => return Some(Err(e)),
            };
            match self.decode(&line) {
                Ok(thread) => return Some(Ok((self.username.to_string(), thread))),
                Err(e) if self.policy == MalformedPolicy::Skip => {
                    tracing::warn!(path = %self.path.display(), line = line_no, error = %e, "skipping malformed row");
                }
                Err(e) => {
                    tracing::debug!(path = %self.path.display(), line = line_no, "malformed row");
                    return Some(Err(e));
                }
            }
        }
    }
}

struct DirIter<'a> {
    ds: &'a JsonlDirDataset,
    next_file: usize,
    current: Option<Rows<'a>>,
    pb: Option<ProgressBar>,
}

impl<'a> Iterator for DirIter<'a> {
    type Item = ThreadItem;

    fn next(&mut self) -> Option<ThreadItem> {
        let ds: &'a JsonlDirDataset = self.ds;
        loop {
            if let Some(rows) = self.current.as_mut() {
                if let Some(item) = rows.next() {
                    return Some(item);
                }
                self.current = None;
                if let Some(pb) = &self.pb {
                    pb.inc(1);
                }
            }
            let Some(file) = ds.files.get(self.next_file) else {
                if let Some(pb) = self.pb.take() {
                    pb.finish_with_message("done");
                }
                return None;
            };
            self.next_file += 1;
            maybe_throttle_low_memory(ds.opts.low_memory_threshold);
            match ds.read_user_file(file) {
                Ok(rows) => self.current = Some(rows),
                Err(e) => {
                    if let Some(pb) = &self.pb {
                        pb.inc(1);
                    }
                    return Some(Err(e));
                }
            }
        }
    }
}
