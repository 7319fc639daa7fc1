//! Raw row representation.
//!
//! Rows hold undecoded column bytes exactly as they came off the wire. Turning
//! them into [`Value`]s is the row codec's job; this module only answers
//! "is column i null, how long is it, what are its bytes".

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::Result;
use crate::error::Error;
use crate::value::{SqlTime, Value};

/// How the bytes of a row were encoded by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// Text protocol: every value is its string representation
    #[default]
    Text,
    /// Binary protocol: type-specific fixed-width or length-prefixed encodings
    Binary,
}

/// Raw per-column access to one row of a result set.
pub trait RowSource {
    /// Number of columns in the row.
    fn column_count(&self) -> usize;

    /// Raw bytes of a column, `None` for SQL NULL or an out-of-range index.
    fn bytes(&self, index: usize) -> Option<&[u8]>;

    /// Encoding of the bytes returned by [`bytes`](RowSource::bytes).
    fn wire_format(&self) -> WireFormat;

    /// Check if a column is NULL. Out-of-range indexes read as NULL.
    fn is_null(&self, index: usize) -> bool {
        self.bytes(index).is_none()
    }

    /// Byte length of a column, `None` when NULL.
    fn length(&self, index: usize) -> Option<usize> {
        self.bytes(index).map(<[u8]>::len)
    }
}

/// A fully materialized row: one optional byte vector per column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ByteArrayRow {
    columns: Vec<Option<Vec<u8>>>,
    format: WireFormat,
}

impl ByteArrayRow {
    /// Create a text-protocol row.
    pub fn new(columns: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            columns,
            format: WireFormat::Text,
        }
    }

    /// Create a row whose bytes use the given wire format.
    pub fn with_format(columns: Vec<Option<Vec<u8>>>, format: WireFormat) -> Self {
        Self { columns, format }
    }

    /// Create a row of `width` NULL columns.
    pub fn nulls(width: usize) -> Self {
        Self::new(vec![None; width])
    }

    /// Build a text row from string-ish values; handy for tests and shadows.
    pub fn from_texts<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        Self::new(
            values
                .into_iter()
                .map(|v| v.map(|s| s.as_ref().as_bytes().to_vec()))
                .collect(),
        )
    }

    /// Overwrite one column. Indexes past the end are ignored.
    pub fn set(&mut self, index: usize, bytes: Option<Vec<u8>>) {
        if let Some(slot) = self.columns.get_mut(index) {
            *slot = bytes;
        }
    }

    /// Replace every column with the other row's, keeping this row's identity.
    pub fn overwrite_from(&mut self, other: &dyn RowSource) {
        let width = self.columns.len().min(other.column_count());
        for i in 0..width {
            self.columns[i] = other.bytes(i).map(<[u8]>::to_vec);
        }
        self.format = other.wire_format();
    }

    /// Borrow the column slots.
    pub fn columns(&self) -> &[Option<Vec<u8>>] {
        &self.columns
    }
}

impl RowSource for ByteArrayRow {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn bytes(&self, index: usize) -> Option<&[u8]> {
        self.columns.get(index).and_then(|c| c.as_deref())
    }

    fn wire_format(&self) -> WireFormat {
        self.format
    }
}

/// Trait for converting from a `Value` to a typed value.
pub trait FromValue: Sized {
    /// Convert from a Value, returning an error if the conversion fails.
    fn from_value(value: &Value) -> Result<Self>;
}

fn type_mismatch(expected: &str, value: &Value) -> Error {
    Error::invalid_state(format!(
        "cannot read {} value as {}",
        value.type_name(),
        expected
    ))
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| type_mismatch("bool", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| type_mismatch("i32", value))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_i64().ok_or_else(|| type_mismatch("i64", value))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| type_mismatch("f64", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) | Value::Decimal(s) => Ok(s.clone()),
            Value::Json(j) => Ok(j.to_string()),
            _ => Err(type_mismatch("String", value)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| type_mismatch("bytes", value))
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::Timestamp(ts) => Ok(ts.date_naive()),
            _ => Err(type_mismatch("date", value)),
        }
    }
}

impl FromValue for SqlTime {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Time(t) => Ok(*t),
            Value::Timestamp(ts) => Ok(SqlTime::from(ts.time())),
            _ => Err(type_mismatch("time", value)),
        }
    }
}

impl FromValue for DateTime<FixedOffset> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            _ => Err(type_mismatch("timestamp", value)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}
