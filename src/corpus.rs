use crate::config::{DatasetOptions, MalformedPolicy, TimestampUnit};
use crate::dataset::DatasetAccessor;
use crate::date::TimeRange;
use crate::error::Result;
use crate::graph::{self, DiscussionTree, InteractionNetwork, NetworkOptions};
use crate::interactions::{self, CoParticipation, Interaction, Level};
use crate::model::Thread;
use crate::scan::Scan;
use crate::slice::TimeSlice;
use crate::source::JsonlDirDataset;
use crate::stats::{self, Aggregator, CommunityStats, CommunityStatsTable, UserStats, UserStatsTable};
use crate::util::init_tracing_once;
use std::collections::BTreeMap;
use std::path::Path;

/// Entry point over any dataset accessor. Owns (or borrows, via `&D`) the accessor
/// and exposes the query, statistics and graph operations.
#[derive(Clone, Debug)]
pub struct Corpus<D> {
    data: D,
    on_dangling: MalformedPolicy,
}

/// Options for opening a directory of per-user dump files.
#[derive(Clone, Debug, Default)]
pub struct CorpusBuilder {
    opts: DatasetOptions,
    on_dangling: MalformedPolicy,
}

impl CorpusBuilder {
    // -------- Builder methods --------
    pub fn root(mut self, root: impl AsRef<Path>) -> Self { self.opts = self.opts.with_root(root); self }
    pub fn timestamp_unit(mut self, unit: TimestampUnit) -> Self { self.opts = self.opts.with_timestamp_unit(unit); self }
    pub fn malformed_rows(mut self, policy: MalformedPolicy) -> Self { self.opts = self.opts.with_malformed_policy(policy); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn io_read_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_io_read_buffer(bytes); self }
    pub fn low_memory_threshold(mut self, fraction: f64) -> Self { self.opts = self.opts.with_low_memory_threshold(fraction); self }
    pub fn dangling_parents(mut self, policy: MalformedPolicy) -> Self { self.on_dangling = policy; self }

    pub fn options(&self) -> &DatasetOptions {
        &self.opts
    }

    pub fn open(self) -> Result<Corpus<JsonlDirDataset>> {
        Ok(Corpus::open(self.opts)?.with_dangling_policy(self.on_dangling))
    }
}

impl Corpus<JsonlDirDataset> {
    pub fn builder() -> CorpusBuilder {
        CorpusBuilder::default()
    }

    pub fn open(opts: DatasetOptions) -> Result<Self> {
        init_tracing_once();
        Ok(Self::new(JsonlDirDataset::open(opts)?))
    }

    /// Same result as `get_all_user_stats`, computed with one rayon task per user file.
    pub fn get_all_user_stats_parallel(&self) -> Result<BTreeMap<String, UserStats>> {
        Ok(self.aggregate_parallel::<UserStatsTable>(None)?.into_stats())
    }

    pub fn get_community_stats_parallel(&self) -> Result<BTreeMap<String, CommunityStats>> {
        Ok(self.aggregate_parallel::<CommunityStatsTable>(None)?.into_stats())
    }

    pub fn aggregate_parallel<A: Aggregator>(&self, window: Option<TimeRange>) -> Result<A> {
        self.data.aggregate_parallel(window, self.on_dangling)
    }
}

impl<D: DatasetAccessor> Corpus<D> {
    pub fn new(data: D) -> Self {
        Self { data, on_dangling: MalformedPolicy::Fail }
    }

    /// What stats, networks and `interactions` do with a reply whose parent is not in
    /// its thread: `Fail` (default) raises a structural error, `Skip` drops the link.
    pub fn with_dangling_policy(mut self, policy: MalformedPolicy) -> Self {
        self.on_dangling = policy;
        self
    }

    pub fn dangling_policy(&self) -> MalformedPolicy {
        self.on_dangling
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn into_inner(self) -> D {
        self.data
    }

    /// Start a filtered iteration. Every call builds a fresh, independent scan.
    pub fn scan(&self) -> Scan<'_, D> {
        Scan::new(&self.data)
    }

    /// First thread whose root post has `post_id`, if any.
    pub fn find_thread(&self, post_id: &str) -> Result<Option<Thread>> {
        for item in self.scan().threads()? {
            let (_, thread) = item?;
            if thread.id() == post_id {
                return Ok(Some(thread));
            }
        }
        Ok(None)
    }

    /// Run a custom aggregator over the whole (windowed) dataset.
    pub fn aggregate<A: Aggregator>(&self) -> Result<A> {
        stats::aggregate_with(&self.data, None, self.on_dangling)
    }

    /// Statistics for one author; `None` when they never appear in scope.
    /// Interactions received come from other users' threads, so the whole scope is read.
    pub fn get_user_stats(&self, username: &str) -> Result<Option<UserStats>> {
        Ok(self.get_all_user_stats()?.remove(username))
    }

    pub fn get_all_user_stats(&self) -> Result<BTreeMap<String, UserStats>> {
        Ok(self.aggregate::<UserStatsTable>()?.into_stats())
    }

    pub fn get_community_stats(&self) -> Result<BTreeMap<String, CommunityStats>> {
        Ok(self.aggregate::<CommunityStatsTable>()?.into_stats())
    }

    pub fn build_interaction_network(&self, time_range: Option<TimeRange>, community: Option<&str>) -> Result<InteractionNetwork> {
        let mut opts = NetworkOptions::new();
        opts.time_range = time_range;
        opts.community = community.map(str::to_string);
        opts.on_dangling = self.on_dangling;
        graph::build_interaction_network(&self.data, &opts)
    }

    /// `opts.on_dangling` applies here, not the corpus policy.
    pub fn build_interaction_network_with(&self, opts: &NetworkOptions) -> Result<InteractionNetwork> {
        graph::build_interaction_network(&self.data, opts)
    }

    pub fn build_discussion_tree(&self, thread: &Thread, include_node_attrs: bool) -> Result<DiscussionTree> {
        graph::build_discussion_tree(thread, include_node_attrs)
    }

    pub fn interactions(&self, thread: &Thread) -> Result<Vec<Interaction>> {
        interactions::resolve_interactions(thread, self.on_dangling)
    }

    pub fn higher_order_interactions(&self, thread: &Thread, level: Level) -> Vec<CoParticipation> {
        interactions::higher_order_interactions(thread, level)
    }

    /// A view of this corpus narrowed to `[start, end]`. Slicing a slice intersects.
    pub fn get_time_slice(&self, start: i64, end: i64) -> Corpus<TimeSlice<'_, D>> {
        Corpus { data: self.data.time_slice(start, end), on_dangling: self.on_dangling }
    }

    pub fn window(&self) -> Option<TimeRange> {
        self.data.window()
    }
}
