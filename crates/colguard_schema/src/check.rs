//! Column checks.
//!
//! A [`Check`] is a named, side-effect free predicate over a whole column. It
//! evaluates to a mask with one entry per row, `true` meaning the row passes.
//!
//! # Null Handling
//!
//! Every check carries an `ignore_nulls` flag. When set, null rows (including
//! NaN) always pass and therefore never show up as failures of that check.
//! The default is `true` for every kind except `not_null`. Built-in value
//! checks that do see a null fail closed.

use colguard_protocol::Value;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::error::{SchemaError, SchemaResult};

/// Column-level predicate used by custom checks.
pub type ColumnPredicate = dyn Fn(&[Value]) -> Vec<bool> + Send + Sync;

/// Failure to evaluate a check at all (as opposed to rows failing it).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckError {
    #[error("check '{check}' returned {actual} results for {expected} rows")]
    MaskLength {
        check: String,
        expected: usize,
        actual: usize,
    },
}

/// A user-supplied predicate, identified by name for provenance.
#[derive(Clone)]
pub struct CustomCheck {
    name: String,
    params: Option<String>,
    predicate: Arc<ColumnPredicate>,
}

impl CustomCheck {
    /// Wrap a column-level predicate.
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&[Value]) -> Vec<bool> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            params: None,
            predicate: Arc::new(predicate),
        }
    }

    /// Wrap a per-cell predicate.
    pub fn element_wise(
        name: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, move |values: &[Value]| {
            values.iter().map(&predicate).collect()
        })
    }

    /// Attach a parameter description reported as the failure's `check_value`.
    pub fn with_params(mut self, params: impl Into<String>) -> Self {
        self.params = Some(params.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> Option<&str> {
        self.params.as_deref()
    }

    fn evaluate(&self, values: &[Value]) -> Vec<bool> {
        (self.predicate)(values)
    }
}

impl fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCheck")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CustomCheck {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params == other.params
            && Arc::ptr_eq(&self.predicate, &other.predicate)
    }
}

/// A compiled regular expression that remembers the pattern it was given.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Match anchored at the start of the string.
    fn anchored(pattern: &str) -> SchemaResult<Self> {
        Self::compile(pattern, &format!("^(?:{})", pattern))
    }

    /// Match anywhere in the string.
    fn search(pattern: &str) -> SchemaResult<Self> {
        Self::compile(pattern, pattern)
    }

    fn compile(source: &str, effective: &str) -> SchemaResult<Self> {
        let regex = Regex::new(effective).map_err(|e| SchemaError::InvalidPattern {
            pattern: source.to_string(),
            source: e,
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.regex.as_str() == other.regex.as_str()
    }
}

/// The closed set of check kinds, plus [`CheckKind::Custom`].
#[derive(Debug, Clone, PartialEq)]
pub enum CheckKind {
    Isin(Vec<Value>),
    Notin(Vec<Value>),
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Ge(Value),
    Lt(Value),
    Le(Value),
    InRange {
        min: Value,
        max: Value,
        include_min: bool,
        include_max: bool,
    },
    StrMatches(Pattern),
    StrContains(Pattern),
    StrStartswith(String),
    StrEndswith(String),
    StrLength {
        min: Option<usize>,
        max: Option<usize>,
    },
    NotNull,
    Unique,
    Custom(CustomCheck),
}

impl CheckKind {
    /// Stable check name used in failure provenance.
    pub fn name(&self) -> &str {
        match self {
            CheckKind::Isin(_) => "isin",
            CheckKind::Notin(_) => "notin",
            CheckKind::Eq(_) => "eq",
            CheckKind::Ne(_) => "ne",
            CheckKind::Gt(_) => "gt",
            CheckKind::Ge(_) => "ge",
            CheckKind::Lt(_) => "lt",
            CheckKind::Le(_) => "le",
            CheckKind::InRange { .. } => "in_range",
            CheckKind::StrMatches(_) => "str_matches",
            CheckKind::StrContains(_) => "str_contains",
            CheckKind::StrStartswith(_) => "str_startswith",
            CheckKind::StrEndswith(_) => "str_endswith",
            CheckKind::StrLength { .. } => "str_length",
            CheckKind::NotNull => "not_null",
            CheckKind::Unique => "unique",
            CheckKind::Custom(custom) => custom.name(),
        }
    }

    pub fn default_ignore_nulls(&self) -> bool {
        !matches!(self, CheckKind::NotNull)
    }

    /// Parameters rendered as text, e.g. `[apple, orange]` or `[0, 10)`.
    pub fn params(&self) -> Option<String> {
        match self {
            CheckKind::Isin(values) | CheckKind::Notin(values) => Some(format!(
                "[{}]",
                values
                    .iter()
                    .map(Value::render)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            CheckKind::Eq(v)
            | CheckKind::Ne(v)
            | CheckKind::Gt(v)
            | CheckKind::Ge(v)
            | CheckKind::Lt(v)
            | CheckKind::Le(v) => Some(v.render()),
            CheckKind::InRange {
                min,
                max,
                include_min,
                include_max,
            } => Some(format!(
                "{}{}, {}{}",
                if *include_min { '[' } else { '(' },
                min,
                max,
                if *include_max { ']' } else { ')' }
            )),
            CheckKind::StrMatches(p) | CheckKind::StrContains(p) => Some(p.as_str().to_string()),
            CheckKind::StrStartswith(s) | CheckKind::StrEndswith(s) => Some(s.clone()),
            CheckKind::StrLength { min, max } => Some(format!(
                "{}..{}",
                min.map(|m| m.to_string()).unwrap_or_default(),
                max.map(|m| m.to_string()).unwrap_or_default()
            )),
            CheckKind::NotNull | CheckKind::Unique => None,
            CheckKind::Custom(custom) => custom.params().map(str::to_string),
        }
    }

    /// Per-cell verdict for element-wise kinds. Never called with nulls.
    fn passes(&self, value: &Value) -> bool {
        match self {
            CheckKind::Isin(allowed) => allowed.iter().any(|a| a.loose_eq(value)),
            CheckKind::Notin(forbidden) => !forbidden.iter().any(|f| f.loose_eq(value)),
            CheckKind::Eq(target) => value.loose_eq(target),
            CheckKind::Ne(target) => !value.loose_eq(target),
            CheckKind::Gt(bound) => matches!(value.compare(bound), Some(Ordering::Greater)),
            CheckKind::Ge(bound) => matches!(
                value.compare(bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            CheckKind::Lt(bound) => matches!(value.compare(bound), Some(Ordering::Less)),
            CheckKind::Le(bound) => {
                matches!(value.compare(bound), Some(Ordering::Less | Ordering::Equal))
            }
            CheckKind::InRange {
                min,
                max,
                include_min,
                include_max,
            } => {
                let lower = match value.compare(min) {
                    Some(Ordering::Greater) => true,
                    Some(Ordering::Equal) => *include_min,
                    _ => false,
                };
                let upper = match value.compare(max) {
                    Some(Ordering::Less) => true,
                    Some(Ordering::Equal) => *include_max,
                    _ => false,
                };
                lower && upper
            }
            CheckKind::StrMatches(p) | CheckKind::StrContains(p) => {
                value.as_str().is_some_and(|s| p.is_match(s))
            }
            CheckKind::StrStartswith(prefix) => {
                value.as_str().is_some_and(|s| s.starts_with(prefix.as_str()))
            }
            CheckKind::StrEndswith(suffix) => {
                value.as_str().is_some_and(|s| s.ends_with(suffix.as_str()))
            }
            CheckKind::StrLength { min, max } => value.as_str().is_some_and(|s| {
                let len = s.chars().count();
                min.map_or(true, |m| len >= m) && max.map_or(true, |m| len <= m)
            }),
            CheckKind::NotNull => true,
            // Column-level kinds are evaluated in `Check::evaluate`.
            CheckKind::Unique | CheckKind::Custom(_) => true,
        }
    }
}

/// A check attached to a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    kind: CheckKind,
    ignore_nulls: bool,
    description: Option<String>,
}

impl Check {
    pub fn new(kind: CheckKind) -> Self {
        let ignore_nulls = kind.default_ignore_nulls();
        Self {
            kind,
            ignore_nulls,
            description: None,
        }
    }

    pub fn isin<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Self {
        Self::new(CheckKind::Isin(values.into_iter().map(Into::into).collect()))
    }

    pub fn notin<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Self {
        Self::new(CheckKind::Notin(values.into_iter().map(Into::into).collect()))
    }

    pub fn eq(value: impl Into<Value>) -> Self {
        Self::new(CheckKind::Eq(value.into()))
    }

    pub fn ne(value: impl Into<Value>) -> Self {
        Self::new(CheckKind::Ne(value.into()))
    }

    pub fn gt(value: impl Into<Value>) -> Self {
        Self::new(CheckKind::Gt(value.into()))
    }

    pub fn ge(value: impl Into<Value>) -> Self {
        Self::new(CheckKind::Ge(value.into()))
    }

    pub fn lt(value: impl Into<Value>) -> Self {
        Self::new(CheckKind::Lt(value.into()))
    }

    pub fn le(value: impl Into<Value>) -> Self {
        Self::new(CheckKind::Le(value.into()))
    }

    /// Closed interval `[min, max]`.
    pub fn in_range(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self::in_range_with(min, max, true, true)
    }

    pub fn in_range_with(
        min: impl Into<Value>,
        max: impl Into<Value>,
        include_min: bool,
        include_max: bool,
    ) -> Self {
        Self::new(CheckKind::InRange {
            min: min.into(),
            max: max.into(),
            include_min,
            include_max,
        })
    }

    /// Regex match anchored at the start of the string.
    pub fn str_matches(pattern: &str) -> SchemaResult<Self> {
        Ok(Self::new(CheckKind::StrMatches(Pattern::anchored(pattern)?)))
    }

    /// Regex search anywhere in the string.
    pub fn str_contains(pattern: &str) -> SchemaResult<Self> {
        Ok(Self::new(CheckKind::StrContains(Pattern::search(pattern)?)))
    }

    pub fn str_startswith(prefix: impl Into<String>) -> Self {
        Self::new(CheckKind::StrStartswith(prefix.into()))
    }

    pub fn str_endswith(suffix: impl Into<String>) -> Self {
        Self::new(CheckKind::StrEndswith(suffix.into()))
    }

    pub fn str_length(min: Option<usize>, max: Option<usize>) -> Self {
        Self::new(CheckKind::StrLength { min, max })
    }

    pub fn not_null() -> Self {
        Self::new(CheckKind::NotNull)
    }

    pub fn unique() -> Self {
        Self::new(CheckKind::Unique)
    }

    pub fn custom(custom: CustomCheck) -> Self {
        Self::new(CheckKind::Custom(custom))
    }

    pub fn with_ignore_nulls(mut self, ignore_nulls: bool) -> Self {
        self.ignore_nulls = ignore_nulls;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(&self) -> &CheckKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn check_value(&self) -> Option<String> {
        self.kind.params()
    }

    pub fn ignore_nulls(&self) -> bool {
        self.ignore_nulls
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Evaluate over a whole column, returning the pass mask.
    pub fn evaluate(&self, values: &[Value]) -> Result<Vec<bool>, CheckError> {
        let mut mask = match &self.kind {
            CheckKind::Unique => unique_mask(values),
            CheckKind::Custom(custom) => {
                let mask = custom.evaluate(values);
                if mask.len() != values.len() {
                    return Err(CheckError::MaskLength {
                        check: custom.name().to_string(),
                        expected: values.len(),
                        actual: mask.len(),
                    });
                }
                mask
            }
            kind => values
                .iter()
                .map(|v| !v.is_null() && kind.passes(v))
                .collect(),
        };

        if self.ignore_nulls {
            for (passed, value) in mask.iter_mut().zip(values) {
                if value.is_null() {
                    *passed = true;
                }
            }
        }
        Ok(mask)
    }
}

/// Every occurrence of a repeated value fails, including the first.
fn unique_mask(values: &[Value]) -> Vec<bool> {
    let mut counts: HashMap<String, usize> = HashMap::with_capacity(values.len());
    let keys: Vec<String> = values.iter().map(Value::unique_key).collect();
    for key in &keys {
        *counts.entry(key.clone()).or_insert(0) += 1;
    }
    keys.iter().map(|key| counts[key] == 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isin_mask() {
        let check = Check::isin(["apple", "orange"]);
        let mask = check
            .evaluate(&["apple".into(), "applee".into(), Value::Null])
            .unwrap();
        assert_eq!(mask, vec![true, false, true]);
        assert_eq!(check.name(), "isin");
        assert_eq!(check.check_value().as_deref(), Some("[apple, orange]"));
    }

    #[test]
    fn test_comparisons_fail_closed_on_other_types() {
        let check = Check::gt(0);
        let mask = check
            .evaluate(&[Value::Float64(0.5), Value::Float64(-1000.0), "abc".into()])
            .unwrap();
        assert_eq!(mask, vec![true, false, false]);
    }

    #[test]
    fn test_nulls_fail_when_not_ignored() {
        let check = Check::ge(1).with_ignore_nulls(false);
        let mask = check.evaluate(&[Value::Null, Value::Int64(1)]).unwrap();
        assert_eq!(mask, vec![false, true]);
    }

    #[test]
    fn test_not_null_defaults_to_seeing_nulls() {
        let check = Check::not_null();
        assert!(!check.ignore_nulls());
        let mask = check
            .evaluate(&[Value::Null, Value::Float64(f64::NAN), Value::Int64(3)])
            .unwrap();
        assert_eq!(mask, vec![false, false, true]);
    }

    #[test]
    fn test_in_range_interval_notation() {
        let check = Check::in_range_with(0, 10, true, false);
        assert_eq!(check.check_value().as_deref(), Some("[0, 10)"));
        let mask = check
            .evaluate(&[Value::Int64(0), Value::Int64(10), Value::Float64(9.5)])
            .unwrap();
        assert_eq!(mask, vec![true, false, true]);
    }

    #[test]
    fn test_str_matches_is_anchored_and_contains_is_not() {
        let matches = Check::str_matches("b+").unwrap();
        let contains = Check::str_contains("b+").unwrap();
        let data = [Value::from("abb"), Value::from("bba")];
        assert_eq!(matches.evaluate(&data).unwrap(), vec![false, true]);
        assert_eq!(contains.evaluate(&data).unwrap(), vec![true, true]);
        assert_eq!(matches.check_value().as_deref(), Some("b+"));
        assert!(Check::str_matches("(").is_err());
    }

    #[test]
    fn test_str_length_bounds() {
        let check = Check::str_length(Some(2), Some(3));
        assert_eq!(check.check_value().as_deref(), Some("2..3"));
        let mask = check
            .evaluate(&["a".into(), "ab".into(), "abcd".into(), Value::Int64(12)])
            .unwrap();
        assert_eq!(mask, vec![false, true, false, false]);
    }

    #[test]
    fn test_unique_marks_every_duplicate() {
        let check = Check::unique();
        let mask = check
            .evaluate(&[
                Value::Int64(1),
                Value::Int64(2),
                Value::Int64(1),
                Value::Null,
                Value::Null,
            ])
            .unwrap();
        assert_eq!(mask, vec![false, true, false, true, true]);
    }

    #[test]
    fn test_unique_compares_numbers_by_value() {
        let check = Check::unique();
        let mask = check
            .evaluate(&[
                Value::Int64(1),
                Value::Float64(1.0),
                Value::Float64(-0.0),
                Value::Float64(0.0),
                Value::Float64(1.5),
            ])
            .unwrap();
        assert_eq!(mask, vec![false, false, false, false, true]);
    }

    #[test]
    fn test_custom_check_mask_length_is_validated() {
        let broken = Check::custom(CustomCheck::new("broken", |_values: &[Value]| vec![true]));
        let err = broken
            .evaluate(&[Value::Int64(1), Value::Int64(2)])
            .unwrap_err();
        assert_eq!(
            err,
            CheckError::MaskLength {
                check: "broken".to_string(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_element_wise_custom_check() {
        let even = CustomCheck::element_wise("is_even", |v: &Value| {
            matches!(v, Value::Int64(i) if i % 2 == 0)
        })
        .with_params("x % 2 == 0");
        let check = Check::custom(even);
        assert_eq!(check.name(), "is_even");
        assert_eq!(check.check_value().as_deref(), Some("x % 2 == 0"));
        assert_eq!(
            check
                .evaluate(&[Value::Int64(2), Value::Int64(3), Value::Null])
                .unwrap(),
            vec![true, false, true]
        );
    }
}
