//! Dynamic field values and materialised records.
//!
//! # Responsibility
//! - Carry column values between callers and the generic record store.
//! - Offer typed accessors for entity models built on top of `Record`.
//!
//! # Invariants
//! - `FieldValue::Null` is the only representation of SQL `NULL`.
//! - Timestamps are UTC and round-trip through epoch milliseconds.

use crate::model::schema::{ColumnType, IS_DELETED};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Column name -> value mapping used for create/update input.
pub type Fields = BTreeMap<String, FieldValue>;

/// Builds a [`Fields`] map from `"column" => value` pairs.
///
/// ```
/// use oms_core::fields;
///
/// let input = fields! { "organization_name" => "Acme", "is_deleted" => false };
/// assert_eq!(input.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    ($($column:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::model::record::Fields::new();
        $(map.insert(
            ::std::string::String::from($column),
            $crate::model::record::FieldValue::from($value),
        );)*
        map
    }};
}

/// One column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    /// Only meaningful as the operand of an `in` filter.
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type label used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::Timestamp(_) => "timestamp",
            Self::List(_) => "list",
        }
    }

    /// Returns whether this scalar can be stored in a column of `kind`.
    ///
    /// `Null` fits every column type; nullability is checked separately.
    pub fn fits(&self, kind: ColumnType) -> bool {
        matches!(
            (self, kind),
            (Self::Null, _)
                | (Self::Text(_), ColumnType::Text)
                | (Self::Integer(_), ColumnType::Integer)
                | (Self::Boolean(_), ColumnType::Boolean)
                | (Self::Timestamp(_), ColumnType::Timestamp)
        )
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A persisted row could not be read as the expected shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDecodeError {
    pub column: String,
    pub expected: ColumnType,
}

impl Display for RecordDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "column `{}` is missing or not a non-null {}",
            self.column,
            self.expected.as_str()
        )
    }
}

impl Error for RecordDecodeError {}

/// One row of an entity table, keyed by column name.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(values: BTreeMap<String, FieldValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.values.get(column)
    }

    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    pub fn into_values(self) -> BTreeMap<String, FieldValue> {
        self.values
    }

    pub fn text(&self, column: &str) -> Result<&str, RecordDecodeError> {
        match self.values.get(column) {
            Some(FieldValue::Text(value)) => Ok(value.as_str()),
            _ => Err(decode_error(column, ColumnType::Text)),
        }
    }

    pub fn optional_text(&self, column: &str) -> Result<Option<&str>, RecordDecodeError> {
        match self.values.get(column) {
            Some(FieldValue::Text(value)) => Ok(Some(value.as_str())),
            Some(FieldValue::Null) | None => Ok(None),
            Some(_) => Err(decode_error(column, ColumnType::Text)),
        }
    }

    pub fn timestamp(&self, column: &str) -> Result<DateTime<Utc>, RecordDecodeError> {
        match self.values.get(column) {
            Some(FieldValue::Timestamp(value)) => Ok(*value),
            _ => Err(decode_error(column, ColumnType::Timestamp)),
        }
    }

    pub fn boolean(&self, column: &str) -> Result<bool, RecordDecodeError> {
        match self.values.get(column) {
            Some(FieldValue::Boolean(value)) => Ok(*value),
            _ => Err(decode_error(column, ColumnType::Boolean)),
        }
    }

    /// Soft-delete tombstone; rows lacking the column count as active.
    pub fn is_deleted(&self) -> bool {
        matches!(self.values.get(IS_DELETED), Some(FieldValue::Boolean(true)))
    }
}

fn decode_error(column: &str, expected: ColumnType) -> RecordDecodeError {
    RecordDecodeError {
        column: column.to_string(),
        expected,
    }
}
