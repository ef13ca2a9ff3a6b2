//! Cell values and result rows.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A single cell value.
///
/// Timestamps are carried as milliseconds since the Unix epoch, the store's
/// native granularity. Conversions from `chrono` truncate accordingly, so a
/// value written and read back always compares equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Uuid(Uuid),
    Text(String),
    Timestamp(i64),
    Null,
}

impl Value {
    /// Build a timestamp value from a `chrono` instant (truncates to ms).
    pub fn timestamp(at: DateTime<Utc>) -> Self {
        Value::Timestamp(at.timestamp_millis())
    }

    /// Type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Uuid(_) => "uuid",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::Null => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Timestamp cell as a `chrono` instant.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ms) => DateTime::from_timestamp_millis(*ms),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Uuid(_) => 1,
            Value::Text(_) => 2,
            Value::Timestamp(_) => 3,
        }
    }
}

// Total order so values can serve as partition/clustering map keys. Within a
// typed column only same-variant comparisons occur; the cross-variant rank
// exists to keep the order total.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Uuid(a), Value::Uuid(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Null, Value::Null) => Ordering::Equal,
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Timestamp(ms) => write!(f, "{}", ms),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::timestamp(v)
    }
}

/// Result set returned by query execution.
///
/// Columns are in the order the SELECT listed them; mutating statements
/// return an empty set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Empty result set (mutations).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row, if any. Mirrors the single-row read pattern used for
    /// primary-key lookups.
    pub fn one(&self) -> Option<&[Value]> {
        self.rows.first().map(|r| r.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(|r| r.as_slice())
    }
}

impl IntoIterator for Rows {
    type Item = Vec<Value>;
    type IntoIter = std::vec::IntoIter<Vec<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_truncates_to_millis() {
        let at = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let value = Value::timestamp(at);
        assert_eq!(value, Value::Timestamp(1_700_000_000_123));
        // Read-back carries exactly the stored precision.
        let back = value.as_timestamp().unwrap();
        assert_eq!(back.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_text_ordering_is_lexicographic() {
        assert!(Value::from("abc") < Value::from("abd"));
        assert!(Value::from("ab") < Value::from("abc"));
    }

    #[test]
    fn test_timestamp_ordering_is_chronological() {
        assert!(Value::Timestamp(1) < Value::Timestamp(2));
        assert!(Value::Timestamp(-5) < Value::Timestamp(0));
    }

    #[test]
    fn test_rows_one_returns_first() {
        let rows = Rows::new(
            vec!["id".into()],
            vec![vec![Value::Timestamp(1)], vec![Value::Timestamp(2)]],
        );
        assert_eq!(rows.one(), Some(&[Value::Timestamp(1)][..]));
        assert!(Rows::empty().one().is_none());
    }
}
