//! Filter expressions for table queries.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Not;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::Entity;

/// Property name addressing the partition key in filters.
pub const PARTITION_KEY: &str = "PartitionKey";

/// Property name addressing the row key in filters.
pub const ROW_KEY: &str = "RowKey";

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
}

impl CompareOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
        }
    }
}

/// A filter expression over entity properties.
///
/// Renders to the store's filter syntax through [`fmt::Display`], e.g.
/// `(PartitionKey eq 'users') and (Age gt 30)`. The same expression can be
/// evaluated locally with [`Filter::matches`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Compares a property against a literal.
    Compare {
        property: String,
        op: CompareOp,
        value: Value,
    },
    /// Both expressions hold.
    And(Box<Filter>, Box<Filter>),
    /// Either expression holds.
    Or(Box<Filter>, Box<Filter>),
    /// The expression does not hold.
    Not(Box<Filter>),
}

impl Filter {
    /// Creates a comparison condition.
    pub fn compare(property: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    /// `property eq value`.
    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Eq, value)
    }

    /// `property ne value`.
    pub fn ne(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Ne, value)
    }

    /// `property gt value`.
    pub fn gt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Gt, value)
    }

    /// `property ge value`.
    pub fn ge(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Ge, value)
    }

    /// `property lt value`.
    pub fn lt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Lt, value)
    }

    /// `property le value`.
    pub fn le(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Le, value)
    }

    /// Matches every entity of one partition.
    pub fn partition(partition_key: impl Into<String>) -> Self {
        let partition_key: String = partition_key.into();
        Self::eq(PARTITION_KEY, partition_key)
    }

    /// Combines two expressions with `and`.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Combines two expressions with `or`.
    #[must_use]
    pub fn or(self, other: Filter) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Evaluates the expression against an entity.
    ///
    /// Conditions on a missing property, or comparing values of different
    /// types, evaluate to false.
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Self::Compare {
                property,
                op,
                value,
            } => lookup(entity, property)
                .and_then(|actual| compare(&actual, value))
                .is_some_and(|ordering| op.accepts(ordering)),
            Self::And(left, right) => left.matches(entity) && right.matches(entity),
            Self::Or(left, right) => left.matches(entity) || right.matches(entity),
            Self::Not(inner) => !inner.matches(entity),
        }
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare {
                property,
                op,
                value,
            } => {
                write!(f, "{property} {op} ")?;
                write_literal(f, value)
            }
            Self::And(left, right) => write!(f, "({left}) and ({right})"),
            Self::Or(left, right) => write!(f, "({left}) or ({right})"),
            Self::Not(inner) => write!(f, "not ({inner})"),
        }
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Number(n) => write!(f, "{n}"),
        other => write!(f, "'{}'", other.to_string().replace('\'', "''")),
    }
}

fn lookup(entity: &Entity, property: &str) -> Option<Value> {
    match property {
        PARTITION_KEY => Some(Value::String(entity.partition_key.clone())),
        ROW_KEY => Some(Value::String(entity.row_key.clone())),
        _ => entity.properties.get(property).cloned(),
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
