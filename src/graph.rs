//! Graph builders. Both drain their input into one local structure and hand back an
//! immutable value: node list plus edge list with attributes.

use crate::dataset::DatasetAccessor;
use crate::date::{within, TimeRange};
use crate::error::{Error, Result};
use crate::config::MalformedPolicy;
use crate::interactions::{resolve_interactions, Interaction};
use crate::model::{NodeId, ParentRef, Thread};
use crate::scan::Scan;
use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use std::collections::BTreeMap;

// ----------------------------- Discussion tree ------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodeAttrs {
    pub author: String,
    pub created: i64,
    pub score: i64,
    pub is_deleted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub id: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attrs: Option<NodeAttrs>,
}

/// Reply edge, pointing from the reply to the record it answers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeEdge {
    pub child: NodeId,
    pub parent: NodeId,
    pub time_diff_seconds: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiscussionTree {
    thread_id: String,
    nodes: Vec<TreeNode>,
    edges: Vec<TreeEdge>,
}

impl DiscussionTree {
    pub fn thread_id(&self) -> &str { &self.thread_id }
    pub fn nodes(&self) -> &[TreeNode] { &self.nodes }
    pub fn edges(&self) -> &[TreeEdge] { &self.edges }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.edges.len() }

    pub fn node(&self, id: &NodeId) -> Option<&TreeNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// The outgoing (reply → parent) edge of `child`; the root has none.
    pub fn parent_edge(&self, child: &NodeId) -> Option<&TreeEdge> {
        self.edges.iter().find(|e| &e.child == child)
    }

    /// Direct replies to `node`, in arrival order.
    pub fn children(&self, node: &NodeId) -> Vec<&NodeId> {
        self.edges.iter().filter(|e| &e.parent == node).map(|e| &e.child).collect()
    }

    /// Reply depth of every node reachable from the root post (root = 0).
    /// Nodes caught in a parent cycle never reach the root and are left out.
    pub fn depths(&self) -> BTreeMap<NodeId, usize> {
        let parent_of: AHashMap<&NodeId, &NodeId> = self.edges.iter().map(|e| (&e.child, &e.parent)).collect();
        let mut depth: BTreeMap<NodeId, usize> = BTreeMap::new();
        for node in &self.nodes {
            let mut path: Vec<&NodeId> = Vec::new();
            let mut cur = &node.id;
            let base = loop {
                if let Some(d) = depth.get(cur) {
                    break Some(*d);
                }
                match parent_of.get(cur) {
                    None if matches!(cur, NodeId::Post(_)) => {
                        depth.insert(cur.clone(), 0);
                        break Some(0);
                    }
                    None => break None,
                    Some(p) => {
                        if path.len() > self.nodes.len() {
                            break None;
                        }
                        path.push(cur);
                        cur = *p;
                    }
                }
            };
            if let Some(base) = base {
                for (i, n) in path.iter().rev().enumerate() {
                    depth.insert((*n).clone(), base + i + 1);
                }
            }
        }
        depth
    }

    pub fn max_depth(&self) -> usize {
        self.depths().values().copied().max().unwrap_or(0)
    }
}

fn attrs(author: &str, created: i64, score: i64, is_deleted: bool) -> NodeAttrs {
    NodeAttrs { author: author.to_string(), created, score, is_deleted }
}

/// One node per post/comment and one edge per parent link, annotated with the reply
/// latency. Fails without producing a graph on a dangling parent reference
/// (structural), a duplicate comment id, a self-parented comment, or a reply that
/// predates its parent (validation).
pub fn build_discussion_tree(thread: &Thread, include_node_attrs: bool) -> Result<DiscussionTree> {
    let post = thread.post();
    let mut created_of: AHashMap<&str, i64> = AHashMap::with_capacity(thread.comments().len());
    for c in thread.comments() {
        if created_of.insert(c.id(), c.created()).is_some() {
            return Err(Error::invalid(format!("thread {}: duplicate comment id {}", thread.id(), c.id())));
        }
    }

    let mut nodes = Vec::with_capacity(thread.comments().len() + 1);
    let mut edges = Vec::with_capacity(thread.comments().len());
    let root = NodeId::Post(post.id().to_string());
    nodes.push(TreeNode {
        id: root.clone(),
        attrs: include_node_attrs.then(|| attrs(post.author(), post.created(), post.meta().score, post.meta().is_deleted)),
    });

    for c in thread.comments() {
        let (parent, parent_created) = match c.parent() {
            ParentRef::Post => (root.clone(), post.created()),
            ParentRef::Comment(pid) if pid.as_str() == c.id() => {
                return Err(Error::invalid(format!("thread {}: comment {} replies to itself", thread.id(), c.id())));
            }
            ParentRef::Comment(pid) => {
                let ts = *created_of.get(pid.as_str()).ok_or_else(|| Error::Structural {
                    thread: thread.id().to_string(),
                    comment: c.id().to_string(),
                    parent: pid.clone(),
                })?;
                (NodeId::Comment(pid.clone()), ts)
            }
        };
        let time_diff_seconds = c.created() - parent_created;
        if time_diff_seconds < 0 {
            return Err(Error::invalid(format!(
                "thread {}: comment {} is {}s older than its parent {}",
                thread.id(), c.id(), -time_diff_seconds, parent
            )));
        }
        nodes.push(TreeNode {
            id: c.node_id(),
            attrs: include_node_attrs.then(|| attrs(c.author(), c.created(), c.meta().score, c.meta().is_deleted)),
        });
        edges.push(TreeEdge { child: c.node_id(), parent, time_diff_seconds });
    }

    tracing::trace!(thread = thread.id(), nodes = nodes.len(), "built discussion tree");
    Ok(DiscussionTree { thread_id: thread.id().to_string(), nodes, edges })
}

// ----------------------------- Interaction network ------------------------------------

/// Scope of an interaction network build.
#[derive(Clone, Debug, Default)]
pub struct NetworkOptions {
    pub time_range: Option<TimeRange>,
    pub community: Option<String>,
    pub users: Option<Vec<String>>, // both endpoints must be listed
    pub on_dangling: MalformedPolicy, // replies to parents missing from their thread
}

impl NetworkOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn time_range(mut self, range: TimeRange) -> Self { self.time_range = Some(range); self }
    pub fn community(mut self, name: impl Into<String>) -> Self { self.community = Some(name.into()); self }
    pub fn on_dangling(mut self, policy: MalformedPolicy) -> Self { self.on_dangling = policy; self }
    pub fn users<I, S>(mut self, iter: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
        let mut v: Vec<String> = iter.into_iter().map(Into::into).collect();
        v.sort();
        v.dedup();
        self.users = Some(v);
        self
    }

    fn admits_user(&self, name: &str) -> bool {
        self.users.as_ref().map_or(true, |u| u.binary_search_by(|x| x.as_str().cmp(name)).is_ok())
    }
}

/// Aggregated edge for consumers that do not need multiplicity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WeightedEdge {
    pub source: String,
    pub target: String,
    pub weight: usize,
}

/// Directed multigraph over usernames; one edge per reply between distinct users.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InteractionNetwork {
    nodes: Vec<String>,
    edges: Vec<Interaction>,
}

impl InteractionNetwork {
    /// Users in order of first appearance.
    pub fn nodes(&self) -> &[String] { &self.nodes }
    pub fn edges(&self) -> &[Interaction] { &self.edges }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.edges.len() }

    pub fn edges_between(&self, source: &str, target: &str) -> usize {
        self.edges.iter().filter(|e| e.source == source && e.target == target).count()
    }

    pub fn out_degree(&self, user: &str) -> usize {
        self.edges.iter().filter(|e| e.source == user).count()
    }

    pub fn in_degree(&self, user: &str) -> usize {
        self.edges.iter().filter(|e| e.target == user).count()
    }

    /// Collapse parallel edges into weights, keeping pairs seen at least
    /// `min_interactions` times. Sorted by (source, target).
    pub fn weighted(&self, min_interactions: usize) -> Vec<WeightedEdge> {
        let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
        for e in &self.edges {
            *counts.entry((e.source.as_str(), e.target.as_str())).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .filter(|(_, w)| *w >= min_interactions)
            .map(|((s, t), weight)| WeightedEdge { source: s.to_string(), target: t.to_string(), weight })
            .collect()
    }
}

/// Replier → parent-author edges over every thread in scope. A reply counts when its
/// own timestamp lies in the effective window (accessor window ∩ `opts.time_range`).
/// Unresolved parents fail the build unless `opts.on_dangling` is `Skip`.
pub fn build_interaction_network<D>(data: &D, opts: &NetworkOptions) -> Result<InteractionNetwork>
where
    D: DatasetAccessor + ?Sized,
{
    let mut scan = Scan::new(data).window(opts.time_range);
    if let Some(c) = &opts.community {
        scan = scan.community(c);
    }
    let window = scan.effective_window();

    let mut net = InteractionNetwork::default();
    let mut seen: AHashSet<String> = AHashSet::new();
    let mut threads = 0usize;
    for item in scan.threads()? {
        let (_, thread) = item?;
        threads += 1;
        for link in resolve_interactions(&thread, opts.on_dangling)? {
            if link.is_self_reply() || !within(window, link.created) {
                continue;
            }
            if !opts.admits_user(&link.source) || !opts.admits_user(&link.target) {
                continue;
            }
            for user in [&link.source, &link.target] {
                if seen.insert(user.clone()) {
                    net.nodes.push(user.clone());
                }
            }
            net.edges.push(link);
        }
    }
    tracing::debug!(threads, nodes = net.nodes.len(), edges = net.edges.len(), "built interaction network");
    Ok(net)
}
