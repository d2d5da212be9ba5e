//! Predicate evaluation over records and threads, plus the window gates used by the
//! iteration engine, statistics and graph builders.

use crate::date::{within, TimeRange};
use crate::model::{MetaValue, RecordRef, Thread};
use crate::query::{Condition, Expected, MetadataFilter, Operator, Predicate, QuerySpec, TextFilter};
use std::cmp::Ordering;

fn ordering(actual: &MetaValue, expected: &MetaValue) -> Option<Ordering> {
    match (actual, expected) {
        (MetaValue::Int(a), MetaValue::Int(b)) => Some(a.cmp(b)),
        (MetaValue::Str(a), MetaValue::Str(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}

impl Condition {
    /// An absent field never matches, whatever the operator.
    pub fn matches(&self, rec: RecordRef<'_>) -> bool {
        let Some(actual) = rec.field(&self.field) else { return false };
        let actual = actual.as_ref();
        match (&self.op, &self.expected) {
            (Operator::Eq, Expected::Value(v)) => actual == v,
            (Operator::Ne, Expected::Value(v)) => actual != v,
            (Operator::Gt, Expected::Value(v)) => ordering(actual, v) == Some(Ordering::Greater),
            (Operator::Gte, Expected::Value(v)) => matches!(ordering(actual, v), Some(Ordering::Greater | Ordering::Equal)),
            (Operator::Lt, Expected::Value(v)) => ordering(actual, v) == Some(Ordering::Less),
            (Operator::Lte, Expected::Value(v)) => matches!(ordering(actual, v), Some(Ordering::Less | Ordering::Equal)),
            (Operator::In, Expected::List(items)) => items.iter().any(|x| x == actual),
            (Operator::Contains, Expected::Value(MetaValue::Str(needle))) => {
                actual.as_str().map_or(false, |hay| hay.contains(needle.as_str()))
            }
            (Operator::Regex, Expected::Pattern(re)) => actual.as_str().map_or(false, |s| re.is_match(s)),
            // Condition::new never builds other shapes.
            _ => false,
        }
    }
}

impl MetadataFilter {
    pub fn matches(&self, rec: RecordRef<'_>) -> bool {
        self.conditions.iter().all(|c| c.matches(rec))
    }
}

impl TextFilter {
    /// Case-insensitive substring test; an empty keyword set matches everything.
    pub fn matches(&self, text: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let hay = text.to_lowercase();
        if self.require_all {
            self.keywords.iter().all(|kw| hay.contains(kw.as_str()))
        } else {
            self.keywords.iter().any(|kw| hay.contains(kw.as_str()))
        }
    }
}

impl Predicate {
    pub fn matches(&self, rec: RecordRef<'_>) -> bool {
        if !self.metadata.matches(rec) {
            return false;
        }
        if let Some(text) = &self.text {
            if !text.matches(&rec.text()) {
                return false;
            }
        }
        self.custom.iter().all(|f| f(rec))
    }
}

impl QuerySpec {
    /// Community gate shared by every iteration mode.
    pub fn admits_community(&self, thread: &Thread) -> bool {
        match &self.community {
            Some(c) => thread.community().trim().to_lowercase() == *c,
            None => true,
        }
    }

    /// Thread mode: owner in `users`, community, and the thread intersects `window`.
    pub fn admits_thread(&self, owner: &str, thread: &Thread, window: Option<TimeRange>) -> bool {
        if let Some(ref allow) = self.users {
            if allow.binary_search_by(|u| u.as_str().cmp(owner)).is_err() { return false; }
        }
        if !self.admits_community(thread) {
            return false;
        }
        window.map_or(true, |w| thread.intersects(&w))
    }

    /// Post/comment mode: record time in `window`, author in `users`, predicate holds.
    pub fn admits_record(&self, rec: RecordRef<'_>, window: Option<TimeRange>) -> bool {
        if !within(window, rec.created()) {
            return false;
        }
        if let Some(ref allow) = self.users {
            if allow.binary_search_by(|u| u.as_str().cmp(rec.author())).is_err() { return false; }
        }
        self.predicate.matches(rec)
    }
}
