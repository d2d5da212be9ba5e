//! Per-user and per-community aggregates. Implement `Aggregator` for your own state
//! and run it with `aggregate` (sequential, any accessor) or
//! `JsonlDirDataset::aggregate_parallel` (one user file per task).

use crate::config::MalformedPolicy;
use crate::dataset::DatasetAccessor;
use crate::date::{within, TimeRange, YearMonth};
use crate::error::Result;
use crate::interactions::resolve_interactions;
use crate::model::{RecordRef, Thread};
use crate::scan::Scan;
use ahash::AHashSet;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

pub trait Aggregator: Send + Default + Serialize {
    /// Fold one thread. Only records whose own timestamp lies in `window` count.
    fn ingest(&mut self, owner: &str, thread: &Thread, window: Option<TimeRange>) -> Result<()>;
    fn merge(&mut self, other: Self);

    /// How reply links to parents missing from their thread are handled.
    /// Aggregators that never resolve replies can ignore it.
    fn with_dangling_policy(self, _policy: MalformedPolicy) -> Self {
        self
    }
}

/// Drain the thread iteration of `data` (narrowed to `window`) into a fresh `A`.
pub fn aggregate<A, D>(data: &D, window: Option<TimeRange>) -> Result<A>
where
    A: Aggregator,
    D: DatasetAccessor + ?Sized,
{
    aggregate_with(data, window, MalformedPolicy::Fail)
}

/// `aggregate` with an explicit policy for replies to unknown parents.
pub fn aggregate_with<A, D>(data: &D, window: Option<TimeRange>, on_dangling: MalformedPolicy) -> Result<A>
where
    A: Aggregator,
    D: DatasetAccessor + ?Sized,
{
    let scan = Scan::new(data).window(window);
    let window = scan.effective_window();
    let mut agg = A::default().with_dangling_policy(on_dangling);
    for item in scan.threads()? {
        let (owner, thread) = item?;
        agg.ingest(&owner, &thread, window)?;
    }
    Ok(agg)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: i64,
    pub max: i64,
    pub std: f64, // sample standard deviation; 0 for a single value
}

impl ScoreSummary {
    pub fn from_scores(scores: &[i64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let mut sorted = scores.to_vec();
        sorted.sort_unstable();
        let n = sorted.len();
        let mean = sorted.iter().map(|&s| s as f64).sum::<f64>() / n as f64;
        let median = if n % 2 == 1 {
            sorted[n / 2] as f64
        } else {
            (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
        };
        let std = if n > 1 {
            let var = sorted.iter().map(|&s| (s as f64 - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            var.sqrt()
        } else {
            0.0
        };
        Some(Self { count: n, mean, median, min: sorted[0], max: sorted[n - 1], std })
    }
}

fn widen(first: &mut Option<i64>, last: &mut Option<i64>, ts: i64) {
    *first = Some(first.map_or(ts, |f| f.min(ts)));
    *last = Some(last.map_or(ts, |l| l.max(ts)));
}

fn merge_bounds(first: &mut Option<i64>, last: &mut Option<i64>, of: Option<i64>, ol: Option<i64>) {
    if let Some(f) = of { widen(first, last, f); }
    if let Some(l) = ol { widen(first, last, l); }
}

// ----------------------------- Users ------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub username: String,
    pub total_posts: u64,
    pub total_comments: u64,
    pub total_interactions_sent: u64,
    pub total_interactions_received: u64,
    pub communities: BTreeSet<String>,
    pub first_activity: Option<i64>,
    pub last_activity: Option<i64>,
    pub posts_deleted: u64,
    pub comments_deleted: u64,
    pub post_score: Option<ScoreSummary>,
    pub comment_score: Option<ScoreSummary>,
    #[serde(skip)]
    post_scores: Vec<i64>,
    #[serde(skip)]
    comment_scores: Vec<i64>,
}

impl UserStats {
    fn named(username: &str) -> Self {
        Self { username: username.to_string(), ..Default::default() }
    }

    pub fn num_communities(&self) -> usize {
        self.communities.len()
    }

    pub fn activity_span_seconds(&self) -> Option<i64> {
        Some(self.last_activity? - self.first_activity?)
    }

    fn touch(&mut self, rec: RecordRef<'_>) {
        widen(&mut self.first_activity, &mut self.last_activity, rec.created());
        let community = &rec.meta().community;
        if !community.is_empty() {
            self.communities.insert(community.clone());
        }
    }

    fn merge(&mut self, o: UserStats) {
        self.total_posts += o.total_posts;
        self.total_comments += o.total_comments;
        self.total_interactions_sent += o.total_interactions_sent;
        self.total_interactions_received += o.total_interactions_received;
        self.communities.extend(o.communities);
        merge_bounds(&mut self.first_activity, &mut self.last_activity, o.first_activity, o.last_activity);
        self.posts_deleted += o.posts_deleted;
        self.comments_deleted += o.comments_deleted;
        self.post_scores.extend(o.post_scores);
        self.comment_scores.extend(o.comment_scores);
    }

    fn finish(&mut self) {
        self.post_score = ScoreSummary::from_scores(&self.post_scores);
        self.comment_score = ScoreSummary::from_scores(&self.comment_scores);
    }
}

/// Aggregation state keyed by username. Records with an empty author are not credited.
/// Serializes as the finished per-user map, same as `into_stats`.
#[derive(Clone, Debug, Default)]
pub struct UserStatsTable {
    users: BTreeMap<String, UserStats>,
    on_dangling: MalformedPolicy,
}

impl UserStatsTable {
    fn user(&mut self, name: &str) -> &mut UserStats {
        self.users.entry(name.to_string()).or_insert_with(|| UserStats::named(name))
    }

    /// Finalize score summaries and hand out the per-user map.
    pub fn into_stats(self) -> BTreeMap<String, UserStats> {
        let mut users = self.users;
        for s in users.values_mut() {
            s.finish();
        }
        users
    }
}

impl Serialize for UserStatsTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.clone().into_stats().serialize(serializer)
    }
}

impl Aggregator for UserStatsTable {
    fn ingest(&mut self, _owner: &str, thread: &Thread, window: Option<TimeRange>) -> Result<()> {
        let post = thread.post();
        if within(window, post.created()) && !post.author().is_empty() {
            let s = self.user(post.author());
            s.total_posts += 1;
            s.posts_deleted += u64::from(post.meta().is_deleted);
            s.post_scores.push(post.meta().score);
            s.touch(RecordRef::Post(post));
        }
        for c in thread.comments() {
            if !within(window, c.created()) || c.author().is_empty() {
                continue;
            }
            let s = self.user(c.author());
            s.total_comments += 1;
            s.comments_deleted += u64::from(c.meta().is_deleted);
            s.comment_scores.push(c.meta().score);
            s.touch(RecordRef::Comment(c));
        }
        for link in resolve_interactions(thread, self.on_dangling)? {
            if link.is_self_reply() || !within(window, link.created) {
                continue;
            }
            self.user(&link.source).total_interactions_sent += 1;
            self.user(&link.target).total_interactions_received += 1;
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) {
        for (name, s) in other.users {
            match self.users.get_mut(&name) {
                Some(mine) => mine.merge(s),
                None => { self.users.insert(name, s); }
            }
        }
    }

    fn with_dangling_policy(mut self, policy: MalformedPolicy) -> Self {
        self.on_dangling = policy;
        self
    }
}

// ----------------------------- Communities ------------------------------------

const UNKNOWN_COMMUNITY: &str = "unknown";

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CommunityStats {
    pub community: String,
    pub total_posts: u64,
    pub total_comments: u64,
    pub unique_users: usize,
    pub unique_posters: usize,
    pub unique_commenters: usize,
    pub interactions: u64,
    pub first_activity: Option<i64>,
    pub last_activity: Option<i64>,
    pub posts_deleted: u64,
    pub comments_deleted: u64,
    pub active_users_by_month: BTreeMap<YearMonth, usize>,
    #[serde(skip)]
    posters: AHashSet<String>,
    #[serde(skip)]
    commenters: AHashSet<String>,
    #[serde(skip)]
    monthly: BTreeMap<YearMonth, AHashSet<String>>,
}

impl CommunityStats {
    fn named(community: &str) -> Self {
        Self { community: community.to_string(), ..Default::default() }
    }

    fn touch(&mut self, author: &str, created: i64) -> Result<()> {
        widen(&mut self.first_activity, &mut self.last_activity, created);
        if !author.is_empty() {
            self.monthly.entry(YearMonth::from_epoch(created)?).or_default().insert(author.to_string());
        }
        Ok(())
    }

    fn merge(&mut self, o: CommunityStats) {
        self.total_posts += o.total_posts;
        self.total_comments += o.total_comments;
        self.interactions += o.interactions;
        merge_bounds(&mut self.first_activity, &mut self.last_activity, o.first_activity, o.last_activity);
        self.posts_deleted += o.posts_deleted;
        self.comments_deleted += o.comments_deleted;
        self.posters.extend(o.posters);
        self.commenters.extend(o.commenters);
        for (ym, users) in o.monthly {
            self.monthly.entry(ym).or_default().extend(users);
        }
    }

    fn finish(&mut self) {
        self.unique_posters = self.posters.len();
        self.unique_commenters = self.commenters.len();
        self.unique_users = self.posters.union(&self.commenters).count();
        self.active_users_by_month = self.monthly.iter().map(|(ym, u)| (*ym, u.len())).collect();
    }
}

fn community_key(name: &str) -> &str {
    if name.trim().is_empty() { UNKNOWN_COMMUNITY } else { name }
}

/// Aggregation state keyed by community. Posts and comments are filed under their
/// own `community` field; interactions under the thread's community.
/// Serializes as the finished per-community map, same as `into_stats`.
#[derive(Clone, Debug, Default)]
pub struct CommunityStatsTable {
    communities: BTreeMap<String, CommunityStats>,
    on_dangling: MalformedPolicy,
}

impl CommunityStatsTable {
    fn community(&mut self, name: &str) -> &mut CommunityStats {
        let key = community_key(name);
        self.communities.entry(key.to_string()).or_insert_with(|| CommunityStats::named(key))
    }

    pub fn into_stats(self) -> BTreeMap<String, CommunityStats> {
        let mut communities = self.communities;
        for s in communities.values_mut() {
            s.finish();
        }
        communities
    }
}

impl Serialize for CommunityStatsTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.clone().into_stats().serialize(serializer)
    }
}

impl Aggregator for CommunityStatsTable {
    fn ingest(&mut self, _owner: &str, thread: &Thread, window: Option<TimeRange>) -> Result<()> {
        let post = thread.post();
        if within(window, post.created()) {
            let s = self.community(post.community());
            s.total_posts += 1;
            s.posts_deleted += u64::from(post.meta().is_deleted);
            if !post.author().is_empty() {
                s.posters.insert(post.author().to_string());
            }
            s.touch(post.author(), post.created())?;
        }
        for c in thread.comments() {
            if !within(window, c.created()) {
                continue;
            }
            let s = self.community(&c.meta().community);
            s.total_comments += 1;
            s.comments_deleted += u64::from(c.meta().is_deleted);
            if !c.author().is_empty() {
                s.commenters.insert(c.author().to_string());
            }
            s.touch(c.author(), c.created())?;
        }
        let links = resolve_interactions(thread, self.on_dangling)?
            .into_iter()
            .filter(|l| !l.is_self_reply() && within(window, l.created))
            .count() as u64;
        if links > 0 {
            self.community(thread.community()).interactions += links;
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) {
        for (name, s) in other.communities {
            match self.communities.get_mut(&name) {
                Some(mine) => mine.merge(s),
                None => { self.communities.insert(name, s); }
            }
        }
    }

    fn with_dangling_policy(mut self, policy: MalformedPolicy) -> Self {
        self.on_dangling = policy;
        self
    }
}
