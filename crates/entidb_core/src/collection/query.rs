//! The query predicate tree.
//!
//! A [`Query`] is a small serializable expression tree evaluated against an
//! entity's attribute map. It is not a DSL users write as text — it is
//! built programmatically (or round-tripped through `serde_json` for
//! storage/transport) and evaluated directly with [`Query::matches`].

use crate::path;
use entidb_codec::Value;
use std::cmp::Ordering;

/// A query predicate.
///
/// Serializes as `{type, ...fields}` via `#[serde(tag = "type")]`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Query {
    /// Always matches.
    All,
    /// Deep-equal on the resolved field path.
    Equals { field: String, value: Value },
    /// Missing field counts as not-equal (matches).
    NotEquals { field: String, value: Value },
    /// Strictly greater; missing/null/incomparable → false.
    GreaterThan { field: String, value: Value },
    /// Greater than or equal.
    GreaterThanOrEquals { field: String, value: Value },
    /// Strictly less than.
    LessThan { field: String, value: Value },
    /// Less than or equal.
    LessThanOrEquals { field: String, value: Value },
    /// Range match with independently configurable bound inclusivity.
    Between {
        field: String,
        lo: Value,
        hi: Value,
        #[serde(default = "default_true")]
        include_lower: bool,
        #[serde(default = "default_true")]
        include_upper: bool,
    },
    /// Value-equality membership.
    In { field: String, values: Vec<Value> },
    /// Negated membership.
    NotIn { field: String, values: Vec<Value> },
    /// Key present, even if its value is null.
    Exists { field: String },
    /// Value is null (missing counts as null).
    IsNull { field: String },
    /// Value is present and non-null.
    IsNotNull { field: String },
    /// Substring for strings, membership for arrays.
    Contains {
        field: String,
        value: Value,
        #[serde(default = "default_true")]
        case_sensitive: bool,
    },
    /// String prefix match.
    StartsWith {
        field: String,
        value: String,
        #[serde(default = "default_true")]
        case_sensitive: bool,
    },
    /// String suffix match.
    EndsWith {
        field: String,
        value: String,
        #[serde(default = "default_true")]
        case_sensitive: bool,
    },
    /// Regular-expression match; non-strings never match.
    Regex { field: String, pattern: String, flags: String },
    /// Conjunction; empty list fails construction (see [`Query::and`]).
    And(Vec<Query>),
    /// Disjunction; empty list fails construction (see [`Query::or`]).
    Or(Vec<Query>),
    /// Negation.
    Not(Box<Query>),
    /// All tokens of `text` present in the field's full-text index.
    FullTextQuery { field: String, text: String },
    /// Tokens of `phrase` present in consecutive order.
    FullTextPhraseQuery { field: String, phrase: String },
    /// Any of `terms` present.
    FullTextAnyQuery { field: String, terms: Vec<String> },
    /// Any term starting with `prefix`.
    FullTextPrefixQuery { field: String, prefix: String },
    /// Terms present within `max_distance` of each other.
    FullTextProximityQuery {
        field: String,
        terms: Vec<String>,
        max_distance: usize,
    },
}

fn default_true() -> bool {
    true
}

/// Error returned when constructing a degenerate query (empty And/Or list).
#[derive(Debug, thiserror::Error)]
#[error("{0} requires at least one sub-query")]
pub struct EmptyQueryListError(&'static str);

impl Query {
    /// Builds a conjunction.
    ///
    /// # Errors
    ///
    /// Returns an error if `queries` is empty.
    pub fn and(queries: Vec<Query>) -> Result<Self, EmptyQueryListError> {
        if queries.is_empty() {
            return Err(EmptyQueryListError("And"));
        }
        Ok(Self::And(queries))
    }

    /// Builds a disjunction.
    ///
    /// # Errors
    ///
    /// Returns an error if `queries` is empty.
    pub fn or(queries: Vec<Query>) -> Result<Self, EmptyQueryListError> {
        if queries.is_empty() {
            return Err(EmptyQueryListError("Or"));
        }
        Ok(Self::Or(queries))
    }

    /// Evaluates this query against an entity's attribute map.
    ///
    /// Full-text node types always return `false` here — they require an
    /// index to evaluate and are only ever reachable through the query
    /// planner, which resolves them via the collection's `IndexManager`
    /// before falling back to residual in-memory evaluation.
    #[must_use]
    pub fn matches(&self, attrs: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Equals { field, value } => resolve(attrs, field) == Some(value),
            Self::NotEquals { field, value } => resolve(attrs, field) != Some(value),
            Self::GreaterThan { field, value } => {
                compare(attrs, field, value) == Some(Ordering::Greater)
            }
            Self::GreaterThanOrEquals { field, value } => {
                matches!(compare(attrs, field, value), Some(Ordering::Greater | Ordering::Equal))
            }
            Self::LessThan { field, value } => compare(attrs, field, value) == Some(Ordering::Less),
            Self::LessThanOrEquals { field, value } => {
                matches!(compare(attrs, field, value), Some(Ordering::Less | Ordering::Equal))
            }
            Self::Between { field, lo, hi, include_lower, include_upper } => {
                let Some(resolved) = resolve(attrs, field) else {
                    return false;
                };
                let above = match compare_values(resolved, lo) {
                    Some(Ordering::Greater) => true,
                    Some(Ordering::Equal) => *include_lower,
                    _ => false,
                };
                let below = match compare_values(resolved, hi) {
                    Some(Ordering::Less) => true,
                    Some(Ordering::Equal) => *include_upper,
                    _ => false,
                };
                above && below
            }
            Self::In { field, values } => {
                resolve(attrs, field).is_some_and(|v| values.contains(v))
            }
            Self::NotIn { field, values } => {
                !resolve(attrs, field).is_some_and(|v| values.contains(v))
            }
            Self::Exists { field } => resolve(attrs, field).is_some(),
            Self::IsNull { field } => matches!(resolve(attrs, field), None | Some(Value::Null)),
            Self::IsNotNull { field } => {
                !matches!(resolve(attrs, field), None | Some(Value::Null))
            }
            Self::Contains { field, value, case_sensitive } => {
                contains(resolve(attrs, field), value, *case_sensitive)
            }
            Self::StartsWith { field, value, case_sensitive } => {
                string_predicate(resolve(attrs, field), value, *case_sensitive, str::starts_with)
            }
            Self::EndsWith { field, value, case_sensitive } => {
                string_predicate(resolve(attrs, field), value, *case_sensitive, str::ends_with)
            }
            Self::Regex { field, pattern, flags } => regex_matches(resolve(attrs, field), pattern, flags),
            Self::And(queries) => queries.iter().all(|q| q.matches(attrs)),
            Self::Or(queries) => queries.iter().any(|q| q.matches(attrs)),
            Self::Not(query) => !query.matches(attrs),
            // Full-text node types are handled by the query planner via the index manager.
            Self::FullTextQuery { .. }
            | Self::FullTextPhraseQuery { .. }
            | Self::FullTextAnyQuery { .. }
            | Self::FullTextPrefixQuery { .. }
            | Self::FullTextProximityQuery { .. } => false,
        }
    }
}

fn resolve<'a>(attrs: &'a Value, field: &str) -> Option<&'a Value> {
    path::resolve(attrs, field)
}

fn compare(attrs: &Value, field: &str, value: &Value) -> Option<Ordering> {
    resolve(attrs, field).and_then(|resolved| compare_values(resolved, value))
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.partial_cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Integer(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Integer(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Text(x), Value::Text(y)) => x.partial_cmp(y),
        _ => None,
    }
}

fn contains(resolved: Option<&Value>, needle: &Value, case_sensitive: bool) -> bool {
    match resolved {
        Some(Value::Text(haystack)) => {
            let Value::Text(needle) = needle else { return false };
            if case_sensitive {
                haystack.contains(needle.as_str())
            } else {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            }
        }
        Some(Value::Array(items)) => items.contains(needle),
        _ => false,
    }
}

fn string_predicate(
    resolved: Option<&Value>,
    needle: &str,
    case_sensitive: bool,
    predicate: fn(&str, &str) -> bool,
) -> bool {
    let Some(Value::Text(haystack)) = resolved else {
        return false;
    };
    if case_sensitive {
        predicate(haystack, needle)
    } else {
        predicate(&haystack.to_lowercase(), &needle.to_lowercase())
    }
}

fn regex_matches(resolved: Option<&Value>, pattern: &str, flags: &str) -> bool {
    let Some(Value::Text(haystack)) = resolved else {
        return false;
    };
    let full_pattern = if flags.contains('i') {
        format!("(?i){pattern}")
    } else {
        pattern.to_string()
    };
    regex::Regex::new(&full_pattern)
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}
