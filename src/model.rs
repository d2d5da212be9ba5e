//! Typed, read-only projections of the dump's rows: threads made of one root post and
//! the comments that arrived under it. Construction validates; nothing mutates later.

use crate::config::RecordOptions;
use crate::date::TimeRange;
use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Closed value variant for metadata fields.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl MetaValue {
    /// Map a JSON value into the closed variant. Floats with a fractional part,
    /// arrays and objects have no representation and yield `None`.
    pub fn from_json(v: &Value) -> Option<MetaValue> {
        match v {
            Value::Null => Some(MetaValue::Null),
            Value::Bool(b) => Some(MetaValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(MetaValue::Int(i))
                } else {
                    let f = n.as_f64()?;
                    (f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
                        .then_some(MetaValue::Int(f as i64))
                }
            }
            Value::String(s) => Some(MetaValue::Str(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        if let MetaValue::Int(i) = self { Some(*i) } else { None }
    }
    pub fn as_bool(&self) -> Option<bool> {
        if let MetaValue::Bool(b) = self { Some(*b) } else { None }
    }
    pub fn as_str(&self) -> Option<&str> {
        if let MetaValue::Str(s) = self { Some(s) } else { None }
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self { MetaValue::Int(v) }
}
impl From<i32> for MetaValue {
    fn from(v: i32) -> Self { MetaValue::Int(i64::from(v)) }
}
impl From<bool> for MetaValue {
    fn from(v: bool) -> Self { MetaValue::Bool(v) }
}
impl From<&str> for MetaValue {
    fn from(v: &str) -> Self { MetaValue::Str(v.to_string()) }
}
impl From<String> for MetaValue {
    fn from(v: String) -> Self { MetaValue::Str(v) }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Null => f.write_str("null"),
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Int(i) => write!(f, "{i}"),
            MetaValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Structured metadata shared by posts and comments.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub score: i64,
    pub is_deleted: bool,
    pub community: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetaValue>,
}

impl Metadata {
    pub fn new(score: i64, is_deleted: bool, community: impl Into<String>) -> Self {
        Self { score, is_deleted, community: community.into(), extra: BTreeMap::new() }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<Cow<'_, MetaValue>> {
        match field {
            "score" => Some(Cow::Owned(MetaValue::Int(self.score))),
            "is_deleted" => Some(Cow::Owned(MetaValue::Bool(self.is_deleted))),
            "community" => Some(Cow::Owned(MetaValue::Str(self.community.clone()))),
            other => self.extra.get(other).map(Cow::Borrowed),
        }
    }

    fn from_json(obj: &Map<String, Value>, skip: &[&str]) -> Result<Self> {
        let score = match obj.get("score") {
            None | Some(Value::Null) => 0,
            Some(v) => v.as_i64().ok_or_else(|| Error::invalid(format!("score must be an integer, got {v}")))?,
        };
        let is_deleted = match obj.get("is_deleted") {
            None | Some(Value::Null) => false,
            Some(v) => v.as_bool().ok_or_else(|| Error::invalid(format!("is_deleted must be a boolean, got {v}")))?,
        };
        let community = opt_string(obj, "community")?.unwrap_or_default();

        let mut extra = BTreeMap::new();
        for (k, v) in obj {
            if matches!(k.as_str(), "score" | "is_deleted" | "community") || skip.contains(&k.as_str()) {
                continue;
            }
            match MetaValue::from_json(v) {
                Some(mv) => { extra.insert(k.clone(), mv); }
                None => tracing::trace!(field = %k, "metadata field has no scalar representation; omitted"),
            }
        }
        Ok(Self { score, is_deleted, community, extra })
    }
}

/// Where a comment attaches: the thread's root post or another comment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ParentRef {
    Post,
    Comment(String),
}

/// Identity of a node in a thread. Post and comment ids live in separate namespaces.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeId {
    Post(String),
    Comment(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Post(id) => write!(f, "post:{id}"),
            NodeId::Comment(id) => write!(f, "comment:{id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Post {
    id: String,
    author: String,
    created: i64,
    title: String,
    body: String,
    meta: Metadata,
}

impl Post {
    /// Fails with a validation error on an empty id or a negative timestamp.
    pub fn new(id: impl Into<String>, author: impl Into<String>, created: i64) -> Result<Self> {
        let id = id.into();
        check_id(&id, "post")?;
        check_created(created, &id)?;
        Ok(Self { id, author: author.into(), created, title: String::new(), body: String::new(), meta: Metadata::default() })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self { self.title = title.into(); self }
    pub fn with_body(mut self, body: impl Into<String>) -> Self { self.body = body.into(); self }
    pub fn with_meta(mut self, meta: Metadata) -> Self { self.meta = meta; self }

    /// Build from one element of a row's `posts` array.
    pub fn from_json(v: &Value, opts: &RecordOptions) -> Result<Self> {
        let obj = v.as_object().ok_or_else(|| Error::invalid("post must be a JSON object"))?;
        let id = required_id(obj, "id")?;
        let created = required_created(obj, opts, &id)?;
        let post = Post::new(id, opt_string(obj, "author")?.unwrap_or_default(), created)?
            .with_title(opt_string(obj, "title")?.unwrap_or_default())
            .with_body(opt_string(obj, "content")?.unwrap_or_default())
            .with_meta(Metadata::from_json(obj, &["id", "author", "created", "title", "content"])?);
        Ok(post)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn author(&self) -> &str { &self.author }
    pub fn created(&self) -> i64 { self.created }
    pub fn title(&self) -> &str { &self.title }
    pub fn body(&self) -> &str { &self.body }
    pub fn meta(&self) -> &Metadata { &self.meta }
    pub fn community(&self) -> &str { &self.meta.community }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comment {
    id: String,
    author: String,
    created: i64,
    body: String,
    parent: ParentRef,
    meta: Metadata,
}

impl Comment {
    pub fn new(id: impl Into<String>, author: impl Into<String>, created: i64, parent: ParentRef) -> Result<Self> {
        let id = id.into();
        check_id(&id, "comment")?;
        check_created(created, &id)?;
        Ok(Self { id, author: author.into(), created, body: String::new(), parent, meta: Metadata::default() })
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self { self.body = body.into(); self }
    pub fn with_meta(mut self, meta: Metadata) -> Self { self.meta = meta; self }

    /// Build from one element of a row's `comments` array. A missing, null, empty or
    /// zero `in_reply_to_id` attaches the comment to the root post.
    pub fn from_json(v: &Value, opts: &RecordOptions) -> Result<Self> {
        let obj = v.as_object().ok_or_else(|| Error::invalid("comment must be a JSON object"))?;
        let id = required_id(obj, "id")?;
        let created = required_created(obj, opts, &id)?;
        let parent = match optional_id(obj, "in_reply_to_id")? {
            Some(pid) if pid != "0" => ParentRef::Comment(pid),
            _ => ParentRef::Post,
        };
        let comment = Comment::new(id, opt_string(obj, "author")?.unwrap_or_default(), created, parent)?
            .with_body(opt_string(obj, "content")?.unwrap_or_default())
            .with_meta(Metadata::from_json(obj, &["id", "author", "created", "content", "in_reply_to_id"])?);
        Ok(comment)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn author(&self) -> &str { &self.author }
    pub fn created(&self) -> i64 { self.created }
    pub fn body(&self) -> &str { &self.body }
    pub fn parent(&self) -> &ParentRef { &self.parent }
    pub fn meta(&self) -> &Metadata { &self.meta }
    pub fn node_id(&self) -> NodeId { NodeId::Comment(self.id.clone()) }
}

/// One root post plus its comments in arrival order, owned by one user.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Thread {
    owner: String,
    post: Post,
    comments: Vec<Comment>,
}

impl Thread {
    pub fn new(owner: impl Into<String>, post: Post, comments: Vec<Comment>) -> Self {
        Self { owner: owner.into(), post, comments }
    }

    /// Build from a dump row `{"posts": [...], "comments": [...]}`. The first post is
    /// the root; a row without posts fails validation.
    pub fn from_row(owner: &str, row: &Value, opts: &RecordOptions) -> Result<Self> {
        let posts = row
            .get("posts")
            .and_then(Value::as_array)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::invalid(format!("row of user {owner:?} has no root post")))?;
        if posts.len() > 1 {
            tracing::debug!(owner, extra = posts.len() - 1, "row carries more than one post; using the first as root");
        }
        let post = Post::from_json(&posts[0], opts)?;
        let comments = match row.get("comments") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|c| Comment::from_json(c, opts))
                .collect::<Result<Vec<_>>>()?,
            Some(other) => return Err(Error::invalid(format!("comments must be an array, got {other}"))),
        };
        Ok(Thread::new(owner, post, comments))
    }

    pub fn id(&self) -> &str { self.post.id() }
    pub fn owner(&self) -> &str { &self.owner }
    pub fn community(&self) -> &str { self.post.community() }
    pub fn post(&self) -> &Post { &self.post }
    pub fn comments(&self) -> &[Comment] { &self.comments }

    pub fn comment(&self, id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    /// Root post in range, or any comment in range.
    pub fn intersects(&self, window: &TimeRange) -> bool {
        window.contains(self.post.created) || self.comments.iter().any(|c| window.contains(c.created))
    }

    pub(crate) fn into_parts(self) -> (String, Post, Vec<Comment>) {
        (self.owner, self.post, self.comments)
    }
}

/// Borrowed view over either kind of record, used by predicates.
#[derive(Clone, Copy, Debug)]
pub enum RecordRef<'a> {
    Post(&'a Post),
    Comment(&'a Comment),
}

impl<'a> RecordRef<'a> {
    pub fn id(&self) -> &'a str {
        match self { RecordRef::Post(p) => p.id(), RecordRef::Comment(c) => c.id() }
    }
    pub fn author(&self) -> &'a str {
        match self { RecordRef::Post(p) => p.author(), RecordRef::Comment(c) => c.author() }
    }
    pub fn created(&self) -> i64 {
        match self { RecordRef::Post(p) => p.created(), RecordRef::Comment(c) => c.created() }
    }
    pub fn meta(&self) -> &'a Metadata {
        match self { RecordRef::Post(p) => p.meta(), RecordRef::Comment(c) => c.meta() }
    }

    /// Searchable text: `title + " " + body` for posts, `body` for comments.
    pub fn text(&self) -> Cow<'a, str> {
        match self {
            RecordRef::Post(p) => Cow::Owned(format!("{} {}", p.title(), p.body())),
            RecordRef::Comment(c) => Cow::Borrowed(c.body()),
        }
    }

    /// Field lookup across the record's own columns and its metadata.
    pub fn field(&self, name: &str) -> Option<Cow<'a, MetaValue>> {
        let own = |s: &str| Some(Cow::Owned(MetaValue::Str(s.to_string())));
        match (name, self) {
            ("id", r) => own(r.id()),
            ("author", r) => own(r.author()),
            ("created", r) => Some(Cow::Owned(MetaValue::Int(r.created()))),
            ("content" | "body", RecordRef::Post(p)) => own(p.body()),
            ("content" | "body", RecordRef::Comment(c)) => own(c.body()),
            ("title", RecordRef::Post(p)) => own(p.title()),
            ("in_reply_to_id", RecordRef::Comment(c)) => match c.parent() {
                ParentRef::Post => Some(Cow::Owned(MetaValue::Null)),
                ParentRef::Comment(pid) => own(pid),
            },
            (other, r) => r.meta().get(other),
        }
    }
}

// ----------------------------- JSON field helpers ------------------------------------

fn check_id(id: &str, kind: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::invalid(format!("{kind} id must not be empty")));
    }
    Ok(())
}

fn check_created(created: i64, id: &str) -> Result<()> {
    if created < 0 {
        return Err(Error::invalid(format!("record {id}: negative timestamp {created}")));
    }
    Ok(())
}

fn optional_id(obj: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(Some(n.to_string())),
        Some(other) => Err(Error::invalid(format!("{key} must be an integer or string id, got {other}"))),
    }
}

fn required_id(obj: &Map<String, Value>, key: &str) -> Result<String> {
    optional_id(obj, key)?.ok_or_else(|| Error::invalid(format!("missing required field {key:?}")))
}

fn required_created(obj: &Map<String, Value>, opts: &RecordOptions, id: &str) -> Result<i64> {
    let v = obj
        .get("created")
        .ok_or_else(|| Error::invalid(format!("record {id}: missing required field \"created\"")))?;
    let raw = v
        .as_i64()
        .ok_or_else(|| Error::invalid(format!("record {id}: created must be an integer, got {v}")))?;
    if raw < 0 {
        return Err(Error::invalid(format!("record {id}: negative timestamp {raw}")));
    }
    Ok(opts.timestamp_unit.to_seconds(raw))
}

fn opt_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::invalid(format!("{key} must be a string, got {other}"))),
    }
}
