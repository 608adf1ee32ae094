use std::cmp::Ordering;
use std::collections::HashMap;

use regex::Regex;

use crate::value::{Row, Value};

/// A boolean condition over an entity's persisted properties.
///
/// Filters are plain data: the SQL backend renders them with bound
/// parameters, the in-memory store evaluates them with [`Filter::matches`].
///
/// ```ignore
/// let predicate = Filter::eq("author_id", 7).and(Filter::gt("pages", 300));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    NotEq(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    Like(String, String),
    In(String, Vec<Value>),
    IsNull(String),
    IsNotNull(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn not_eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::NotEq(column.to_string(), value.into())
    }

    pub fn gt(column: &str, value: impl Into<Value>) -> Self {
        Filter::Gt(column.to_string(), value.into())
    }

    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Filter::Gte(column.to_string(), value.into())
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Filter::Lt(column.to_string(), value.into())
    }

    pub fn lte(column: &str, value: impl Into<Value>) -> Self {
        Filter::Lte(column.to_string(), value.into())
    }

    /// SQL `LIKE`: `%` matches any run of characters, `_` exactly one.
    pub fn like(column: &str, pattern: &str) -> Self {
        Filter::Like(column.to_string(), pattern.to_string())
    }

    pub fn is_in<V: Into<Value>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(column.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(column: &str) -> Self {
        Filter::IsNull(column.to_string())
    }

    pub fn is_not_null(column: &str) -> Self {
        Filter::IsNotNull(column.to_string())
    }

    /// Conjunction; nested `And`s are flattened.
    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut items) => {
                items.push(other);
                Filter::And(items)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Disjunction; nested `Or`s are flattened.
    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut items) => {
                items.push(other);
                Filter::Or(items)
            }
            first => Filter::Or(vec![first, other]),
        }
    }

    /// Every column the filter refers to, in traversal order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Filter::Eq(c, _)
            | Filter::NotEq(c, _)
            | Filter::Gt(c, _)
            | Filter::Gte(c, _)
            | Filter::Lt(c, _)
            | Filter::Lte(c, _)
            | Filter::Like(c, _)
            | Filter::In(c, _)
            | Filter::IsNull(c)
            | Filter::IsNotNull(c) => out.push(c),
            Filter::And(items) | Filter::Or(items) => {
                for item in items {
                    item.collect_columns(out);
                }
            }
            Filter::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Evaluate against a stored row. Comparisons involving `NULL` are false.
    pub fn matches(&self, row: &Row) -> bool {
        self.matches_with(row, &mut LikePatterns::default())
    }

    /// Like [`Filter::matches`], reusing `patterns` compiled for earlier rows.
    pub fn matches_with(&self, row: &Row, patterns: &mut LikePatterns) -> bool {
        let get = |column: &str| row.get(column).unwrap_or(&Value::Null);
        match self {
            Filter::Eq(c, v) => get(c).sql_cmp(v) == Some(Ordering::Equal),
            Filter::NotEq(c, v) => matches!(get(c).sql_cmp(v), Some(o) if o != Ordering::Equal),
            Filter::Gt(c, v) => get(c).sql_cmp(v) == Some(Ordering::Greater),
            Filter::Gte(c, v) => matches!(get(c).sql_cmp(v), Some(Ordering::Greater | Ordering::Equal)),
            Filter::Lt(c, v) => get(c).sql_cmp(v) == Some(Ordering::Less),
            Filter::Lte(c, v) => matches!(get(c).sql_cmp(v), Some(Ordering::Less | Ordering::Equal)),
            Filter::Like(c, pattern) => get(c)
                .as_str()
                .is_some_and(|text| patterns.is_match(pattern, text)),
            Filter::In(c, values) => {
                let actual = get(c);
                values.iter().any(|v| actual.sql_cmp(v) == Some(Ordering::Equal))
            }
            Filter::IsNull(c) => get(c).is_null(),
            Filter::IsNotNull(c) => !get(c).is_null(),
            Filter::And(items) => items.iter().all(|f| f.matches_with(row, patterns)),
            Filter::Or(items) => items.iter().any(|f| f.matches_with(row, patterns)),
            Filter::Not(inner) => !inner.matches_with(row, patterns),
        }
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        match self {
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }
}

/// `LIKE` patterns compiled to anchored regular expressions, keyed by pattern.
#[derive(Debug, Default)]
pub struct LikePatterns {
    compiled: HashMap<String, Option<Regex>>,
}

impl LikePatterns {
    pub fn is_match(&mut self, pattern: &str, text: &str) -> bool {
        self.compiled
            .entry(pattern.to_string())
            .or_insert_with(|| like_regex(pattern))
            .as_ref()
            .is_some_and(|re| re.is_match(text))
    }
}

/// `%` becomes `.*`, `_` becomes `.`, everything else is literal.
fn like_regex(pattern: &str) -> Option<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("(?s)^");
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    source.push('$');
    match Regex::new(&source) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!(pattern, error = %err, "LIKE pattern could not be compiled");
            None
        }
    }
}
