//! Query specification: metadata conditions parsed from `field__op` keys, keyword text
//! filters, free-form predicates, and the scan-level scope (users, community, window).
//! Evaluation lives in `filters`.

use crate::date::TimeRange;
use crate::error::{Error, Result};
use crate::model::{MetaValue, RecordRef};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
    Regex,
}

impl FromStr for Operator {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "eq" => Operator::Eq,
            "ne" => Operator::Ne,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "in" => Operator::In,
            "contains" => Operator::Contains,
            "regex" => Operator::Regex,
            other => return Err(Error::config(format!("unknown operator suffix {other:?}"))),
        })
    }
}

/// Right-hand side of a condition as supplied by the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionValue {
    Scalar(MetaValue),
    List(Vec<MetaValue>),
}

macro_rules! condition_value_from {
    ($($t:ty),*) => {$(
        impl From<$t> for ConditionValue {
            fn from(v: $t) -> Self { ConditionValue::Scalar(v.into()) }
        }
        impl From<Vec<$t>> for ConditionValue {
            fn from(v: Vec<$t>) -> Self { ConditionValue::List(v.into_iter().map(Into::into).collect()) }
        }
    )*};
}

condition_value_from!(i64, i32, bool, &str, String);

impl From<MetaValue> for ConditionValue {
    fn from(v: MetaValue) -> Self {
        ConditionValue::Scalar(v)
    }
}

impl From<Vec<MetaValue>> for ConditionValue {
    fn from(v: Vec<MetaValue>) -> Self {
        ConditionValue::List(v)
    }
}

impl ConditionValue {
    /// Scalars and arrays of scalars only; anything else is a configuration error.
    pub fn from_json(v: &Value) -> Result<Self> {
        let scalar = |x: &Value| {
            MetaValue::from_json(x).ok_or_else(|| Error::config(format!("unsupported condition value {x}")))
        };
        match v {
            Value::Array(items) => Ok(ConditionValue::List(items.iter().map(scalar).collect::<Result<_>>()?)),
            other => Ok(ConditionValue::Scalar(scalar(other)?)),
        }
    }
}

/// Validated right-hand side, shaped for its operator.
#[derive(Clone, Debug)]
pub enum Expected {
    Value(MetaValue),
    List(Vec<MetaValue>),
    Pattern(Regex),
}

/// One `field <op> value` test, parsed once at construction.
#[derive(Clone, Debug)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub expected: Expected,
}

impl Condition {
    /// Parse `key` as `field` or `field__op` and validate `value` against the operator.
    pub fn new(key: &str, value: impl Into<ConditionValue>) -> Result<Self> {
        let (field, op) = match key.rsplit_once("__") {
            Some((field, suffix)) => (field, suffix.parse::<Operator>()?),
            None => (key, Operator::Eq),
        };
        if field.is_empty() {
            return Err(Error::config(format!("condition key {key:?} has no field name")));
        }

        let expected = match (op, value.into()) {
            (Operator::In, ConditionValue::List(items)) => Expected::List(items),
            (Operator::In, ConditionValue::Scalar(v)) => {
                return Err(Error::config(format!("{key}: `in` expects a list, got {v}")))
            }
            (_, ConditionValue::List(_)) => {
                return Err(Error::config(format!("{key}: only `in` accepts a list")))
            }
            (Operator::Regex, ConditionValue::Scalar(MetaValue::Str(pat))) => Expected::Pattern(
                Regex::new(&pat).map_err(|e| Error::config(format!("{key}: invalid regex: {e}")))?,
            ),
            (Operator::Regex | Operator::Contains, ConditionValue::Scalar(v)) if v.as_str().is_none() => {
                return Err(Error::config(format!("{key}: expects a string, got {v}")))
            }
            (Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte, ConditionValue::Scalar(v))
                if !matches!(v, MetaValue::Int(_) | MetaValue::Str(_)) =>
            {
                return Err(Error::config(format!("{key}: ordering needs an integer or string, got {v}")))
            }
            (_, ConditionValue::Scalar(v)) => Expected::Value(v),
        };

        Ok(Self { field: field.to_string(), op, expected })
    }
}

/// AND-composition of metadata conditions.
#[derive(Clone, Debug, Default)]
pub struct MetadataFilter {
    pub conditions: Vec<Condition>,
}

impl MetadataFilter {
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ConditionValue>,
    {
        let conditions = pairs
            .into_iter()
            .map(|(k, v)| Condition::new(k.as_ref(), v))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { conditions })
    }

    /// Parse a JSON object such as `{"score__gte": 10, "community__in": ["a", "b"]}`.
    pub fn from_json(v: &Value) -> Result<Self> {
        let obj = v
            .as_object()
            .ok_or_else(|| Error::config(format!("metadata filter must be a JSON object, got {v}")))?;
        let conditions = obj
            .iter()
            .map(|(k, v)| Condition::new(k, ConditionValue::from_json(v)?))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { conditions })
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Keyword filter over record text. Keywords are stored trimmed and lowercased.
#[derive(Clone, Debug, Default)]
pub struct TextFilter {
    pub keywords: Vec<String>,
    pub require_all: bool,
}

impl TextFilter {
    pub fn any<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { keywords: normalize_keywords(keywords), require_all: false }
    }

    pub fn all<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { keywords: normalize_keywords(keywords), require_all: true }
    }
}

fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut v: Vec<String> = keywords
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    v.sort();
    v.dedup();
    v
}

pub type CustomPredicate = Arc<dyn Fn(RecordRef<'_>) -> bool + Send + Sync>;

/// Full record predicate: metadata AND text AND every custom predicate.
#[derive(Clone, Default)]
pub struct Predicate {
    pub metadata: MetadataFilter,
    pub text: Option<TextFilter>,
    pub custom: Vec<CustomPredicate>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_metadata(mut self, filter: MetadataFilter) -> Self {
        self.metadata.conditions.extend(filter.conditions);
        self
    }
    pub fn with_text(mut self, filter: TextFilter) -> Self {
        self.text = Some(filter);
        self
    }
    pub fn with_custom(mut self, f: impl Fn(RecordRef<'_>) -> bool + Send + Sync + 'static) -> Self {
        self.custom.push(Arc::new(f));
        self
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("metadata", &self.metadata)
            .field("text", &self.text)
            .field("custom", &self.custom.len())
            .finish()
    }
}

/// Scan-level query: record predicate plus scope.
/// `users` is kept sorted and deduplicated for `binary_search`.
#[derive(Clone, Debug, Default)]
pub struct QuerySpec {
    pub predicate: Predicate,
    pub users: Option<Vec<String>>,
    pub community: Option<String>, // lowercase
    pub time_range: Option<TimeRange>,
}

impl QuerySpec {
    pub fn normalize(mut self) -> Self {
        if let Some(list) = self.users.as_mut() {
            for s in list.iter_mut() {
                *s = s.trim().to_string();
            }
            list.sort();
            list.dedup();
        }
        if let Some(c) = self.community.as_mut() {
            *c = c.trim().to_lowercase();
        }
        self
    }
}
