//! Query predicates evaluated by document backends.
//!
//! A [`Predicate`] is a small, serializable filter over a document's JSON body.
//! Fields are addressed by dotted paths (`"payload.user_id"`). Backends that
//! have their own query language translate predicates; the in-memory backend
//! evaluates them directly with [`Predicate::matches`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter applied to documents of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every document.
    All,
    /// The field at `field` equals `value`.
    Eq { field: String, value: Value },
    /// The field at `field` is an array containing `value`.
    Contains { field: String, value: Value },
    /// Every inner predicate matches.
    And(Vec<Predicate>),
}

impl Predicate {
    /// Field equality.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Array membership.
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Conjunction of `self` and `other`.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut inner) => {
                inner.push(other);
                Predicate::And(inner)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    /// Evaluate this predicate against a document body.
    pub fn matches(&self, body: &Value) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Eq { field, value } => lookup(body, field) == Some(value),
            Predicate::Contains { field, value } => match lookup(body, field) {
                Some(Value::Array(items)) => items.contains(value),
                _ => false,
            },
            Predicate::And(inner) => inner.iter().all(|p| p.matches(body)),
        }
    }
}

/// Resolve a dotted path inside a JSON value.
fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(body, |current, segment| current.get(segment))
}
