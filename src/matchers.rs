//! Matchers for common Postgres failure shapes.
//!
//! Each function returns a closure suitable for
//! [`Statement::match_error`](crate::Statement::match_error): it inspects a
//! classified database error and, when it applies, extracts the structured
//! information the handler needs. Matchers never fail; a malformed server
//! detail simply yields less information, not an error.

use crate::error::{DatabaseError, sqlstate};
use crate::statement::ErrorContext;
use regex::Regex;
use std::sync::LazyLock;

static KEY_DETAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Key \((?P<keys>.*?)\)=\((?P<values>.*?)\)").expect("valid regex"));

static UNDEFINED_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"relation "(?P<table>.*?)" does not exist"#).expect("valid regex")
});

static DUPLICATE_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"relation "(?P<table>.*?)" already exists"#).expect("valid regex")
});

/// How to recognize a constraint by name.
#[derive(Debug, Clone)]
pub enum ConstraintPattern {
    /// The constraint name must match exactly.
    Exact(String),
    /// The constraint name must match the regex.
    Pattern(Regex),
}

impl ConstraintPattern {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == name,
            Self::Pattern(re) => re.is_match(name),
        }
    }
}

impl From<&str> for ConstraintPattern {
    fn from(name: &str) -> Self {
        Self::Exact(name.to_string())
    }
}

impl From<String> for ConstraintPattern {
    fn from(name: String) -> Self {
        Self::Exact(name)
    }
}

impl From<Regex> for ConstraintPattern {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}

/// The column/value pairs of a violated key constraint, parsed from the
/// server's error detail.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyConflict {
    pub fields: Vec<(String, String)>,
}

impl KeyConflict {
    /// Parse the `Key (a, b)=(1, 2)` shape out of an error detail. Returns
    /// an empty conflict when the detail is missing or has another shape.
    pub fn from_detail(detail: Option<&str>) -> Self {
        let Some(detail) = detail else {
            return Self::default();
        };
        let Some(caps) = KEY_DETAIL_RE.captures(detail) else {
            return Self::default();
        };
        let keys: Vec<&str> = caps["keys"].split(", ").collect();
        let values: Vec<&str> = caps["values"].split(", ").collect();
        if keys.len() != values.len() {
            return Self::default();
        }
        Self {
            fields: keys
                .into_iter()
                .zip(values)
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn value_of(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }
}

fn constraint_matches(error: &DatabaseError, code: &str, pattern: &ConstraintPattern) -> bool {
    error.code == code
        && error
            .constraint
            .as_deref()
            .is_some_and(|name| pattern.matches(name))
}

/// Match any error that names a constraint matching the pattern, regardless
/// of its SQLSTATE code.
pub fn constraint_violation<A: 'static>(
    pattern: impl Into<ConstraintPattern>,
) -> impl for<'a> Fn(&ErrorContext<'a, A>) -> Option<()> + Send + Sync + 'static {
    let pattern = pattern.into();
    move |ctx| {
        ctx.error
            .constraint
            .as_deref()
            .is_some_and(|name| pattern.matches(name))
            .then_some(())
    }
}

/// Match a unique-constraint violation (SQLSTATE 23505) on the named
/// constraint and extract the conflicting key.
pub fn unique_violation<A: 'static>(
    pattern: impl Into<ConstraintPattern>,
) -> impl for<'a> Fn(&ErrorContext<'a, A>) -> Option<KeyConflict> + Send + Sync + 'static {
    let pattern = pattern.into();
    move |ctx| {
        constraint_matches(ctx.error, sqlstate::UNIQUE_VIOLATION, &pattern)
            .then(|| KeyConflict::from_detail(ctx.error.detail.as_deref()))
    }
}

/// Match a foreign-key violation (SQLSTATE 23503) on the named constraint
/// and extract the offending key.
pub fn foreign_key_violation<A: 'static>(
    pattern: impl Into<ConstraintPattern>,
) -> impl for<'a> Fn(&ErrorContext<'a, A>) -> Option<KeyConflict> + Send + Sync + 'static {
    let pattern = pattern.into();
    move |ctx| {
        constraint_matches(ctx.error, sqlstate::FOREIGN_KEY_VIOLATION, &pattern)
            .then(|| KeyConflict::from_detail(ctx.error.detail.as_deref()))
    }
}

/// Match a query against a missing table (SQLSTATE 42P01) and extract the
/// relation name. No match when the name cannot be extracted, so the error
/// falls through to later handlers.
pub fn undefined_table<A: 'static>(
) -> impl for<'a> Fn(&ErrorContext<'a, A>) -> Option<String> + Send + Sync + 'static {
    |ctx| {
        if ctx.error.code != sqlstate::UNDEFINED_TABLE {
            return None;
        }
        relation_name(ctx.error, &UNDEFINED_TABLE_RE)
    }
}

/// Match a create against an existing table (SQLSTATE 42P07) and extract the
/// relation name. No match when the name cannot be extracted.
pub fn duplicate_table<A: 'static>(
) -> impl for<'a> Fn(&ErrorContext<'a, A>) -> Option<String> + Send + Sync + 'static {
    |ctx| {
        if ctx.error.code != sqlstate::DUPLICATE_TABLE {
            return None;
        }
        relation_name(ctx.error, &DUPLICATE_TABLE_RE)
    }
}

fn relation_name(error: &DatabaseError, re: &Regex) -> Option<String> {
    if let Some(table) = &error.table {
        return Some(table.clone());
    }
    re.captures(&error.message)
        .map(|caps| caps["table"].to_string())
}
