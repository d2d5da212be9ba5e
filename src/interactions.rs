//! Reply links inside one thread: who answered whom, and co-participation groups.

use crate::config::MalformedPolicy;
use crate::error::{Error, Result};
use crate::model::{ParentRef, Thread};
use ahash::AHashMap;
use serde::Serialize;
use std::collections::BTreeSet;

/// One reply: `source` answered a record written by `target`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Interaction {
    pub source: String,
    pub target: String,
    pub created: i64,
    pub thread_id: String,
    pub comment_id: String,
}

impl Interaction {
    pub fn is_self_reply(&self) -> bool {
        self.source == self.target
    }
}

/// Every reply link of `thread` whose two authors are known (non-empty), in arrival
/// order. Self replies are included; callers decide whether they count.
/// A parent id that does not resolve inside the thread is a structural error.
pub fn interactions(thread: &Thread) -> Result<Vec<Interaction>> {
    resolve_interactions(thread, MalformedPolicy::Fail)
}

/// Like `interactions`, but `MalformedPolicy::Skip` drops replies to unknown parents
/// (typically deleted comments) with a warning instead of failing the thread.
pub fn resolve_interactions(thread: &Thread, on_dangling: MalformedPolicy) -> Result<Vec<Interaction>> {
    let authors: AHashMap<&str, &str> = thread.comments().iter().map(|c| (c.id(), c.author())).collect();
    let mut out = Vec::with_capacity(thread.comments().len());
    for c in thread.comments() {
        let target = match c.parent() {
            ParentRef::Post => thread.post().author(),
            ParentRef::Comment(pid) => match authors.get(pid.as_str()) {
                Some(author) => *author,
                None if on_dangling == MalformedPolicy::Skip => {
                    tracing::warn!(thread = thread.id(), comment = c.id(), parent = %pid, "skipping reply to unknown parent");
                    continue;
                }
                None => {
                    return Err(Error::Structural {
                        thread: thread.id().to_string(),
                        comment: c.id().to_string(),
                        parent: pid.clone(),
                    })
                }
            },
        };
        if c.author().is_empty() || target.is_empty() {
            continue;
        }
        out.push(Interaction {
            source: c.author().to_string(),
            target: target.to_string(),
            created: c.created(),
            thread_id: thread.id().to_string(),
            comment_id: c.id().to_string(),
        });
    }
    Ok(out)
}

/// Granularity of co-participation groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// The post author together with everyone who commented anywhere in the thread.
    Post,
    /// Authors replying to the same parent record.
    Comment,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CoParticipation {
    pub members: Vec<String>, // sorted, unique
    pub created: i64,         // root post time
}

/// Higher-order interactions of `thread`. Threads without comments produce no groups.
pub fn higher_order_interactions(thread: &Thread, level: Level) -> Vec<CoParticipation> {
    if thread.comments().is_empty() {
        return Vec::new();
    }
    let created = thread.post().created();
    let named = |a: &str| (!a.is_empty()).then(|| a.to_string());

    let groups: Vec<BTreeSet<String>> = match level {
        Level::Post => {
            let mut g: BTreeSet<String> = named(thread.post().author()).into_iter().collect();
            g.extend(thread.comments().iter().filter_map(|c| named(c.author())));
            vec![g]
        }
        Level::Comment => {
            let mut order: Vec<&ParentRef> = Vec::new();
            let mut by_parent: AHashMap<&ParentRef, BTreeSet<String>> = AHashMap::new();
            for c in thread.comments() {
                let set = by_parent.entry(c.parent()).or_insert_with(|| {
                    order.push(c.parent());
                    BTreeSet::new()
                });
                set.extend(named(c.author()));
            }
            order.into_iter().filter_map(|p| by_parent.remove(p)).collect()
        }
    };

    groups
        .into_iter()
        .filter(|g| !g.is_empty())
        .map(|g| CoParticipation { members: g.into_iter().collect(), created })
        .collect()
}
