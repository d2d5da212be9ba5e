mod config;
mod date;
mod error;
mod model;

mod query;
mod filters;

mod dataset;
mod slice;
mod scan;

mod interactions;
mod graph;
mod stats;

mod paths;
mod jsonl;
mod source;
mod progress;
mod mem;
mod util;
mod corpus;

pub use crate::config::{DatasetOptions, MalformedPolicy, RecordOptions, TimestampUnit};
pub use crate::date::{datetime_from_epoch, format_rfc3339, parse_rfc3339, TimeRange, YearMonth};
pub use crate::error::{Error, Result};
pub use crate::model::{Comment, MetaValue, Metadata, NodeId, ParentRef, Post, RecordRef, Thread};

pub use crate::query::{Condition, ConditionValue, CustomPredicate, Expected, MetadataFilter, Operator, Predicate, QuerySpec, TextFilter};

pub use crate::dataset::{DatasetAccessor, InMemoryDataset, ThreadItem, ThreadIter};
pub use crate::slice::TimeSlice;
pub use crate::scan::{CommentItem, Hit, PostItem, Scan};

pub use crate::interactions::{higher_order_interactions, interactions, resolve_interactions, CoParticipation, Interaction, Level};
pub use crate::graph::{
    build_discussion_tree, build_interaction_network, DiscussionTree, InteractionNetwork, NetworkOptions, NodeAttrs,
    TreeEdge, TreeNode, WeightedEdge,
};
pub use crate::stats::{aggregate, aggregate_with, Aggregator, CommunityStats, CommunityStatsTable, ScoreSummary, UserStats, UserStatsTable};

pub use crate::paths::{discover_user_files, FileKind, UserFile};
pub use crate::source::JsonlDirDataset;
pub use crate::corpus::{Corpus, CorpusBuilder};

// Expose memory helpers for adaptive throttling from the binary.
pub use crate::mem::{available_memory_fraction, is_low_memory};
pub use crate::progress::make_count_progress;
pub use crate::util::init_tracing_once;
