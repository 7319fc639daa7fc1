//! Row codec: raw column bytes to typed [`Value`]s.
//!
//! The codec is a pure function of (bytes, wire form, column metadata,
//! behavior flags). It never mutates anything and every failure is a
//! [`DecodingError`] carrying the column index and the offending bytes.
//!
//! # Datetime policies
//!
//! - **Legacy** decodes to a calendar value, then shifts it by
//!   `client offset - server offset` only when `use_timezone` is set, and
//!   presents the result in the client offset.
//! - **Fast** decodes straight to an instant in the server offset and
//!   presents it in the client offset.
//!
//! With `use_timezone` on, both produce the same wall clock. With it off the
//! legacy path keeps the server's wall clock unchanged.

pub mod temporal;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone};
use tidewire_core::{
    DecodingError, DecodingErrorKind, Result, RowSource, Value, WireFormat,
};

use crate::charset::CharsetCatalog;
use crate::config::{DateTimePolicy, DriverConfig, ZeroDateTimeBehavior};
use crate::types::{ColumnDef, FieldType, SqlType};
use temporal::Parsed;

/// Outcome of decoding a single column.
pub type ColumnResult = std::result::Result<Value, DecodingError>;

/// Decodes column bytes under one set of behavior flags.
#[derive(Debug, Clone)]
pub struct RowCodec {
    catalog: &'static CharsetCatalog,
    zero_behavior: ZeroDateTimeBehavior,
    policy: DateTimePolicy,
    use_timezone: bool,
    server_tz: FixedOffset,
    client_tz: FixedOffset,
    tiny_int1_is_bit: bool,
    strict: bool,
    fallback_encoding: String,
}

#[derive(Clone, Copy)]
enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    U64,
}

fn malformed(bytes: &[u8], message: impl Into<String>) -> DecodingError {
    DecodingError::malformed(0, bytes, message)
}

fn ascii(bytes: &[u8]) -> std::result::Result<&str, DecodingError> {
    std::str::from_utf8(bytes)
        .ok()
        .filter(|s| s.is_ascii())
        .map(str::trim)
        .ok_or_else(|| malformed(bytes, "numeric value is not ASCII"))
}

fn fixed<const N: usize>(bytes: &[u8]) -> std::result::Result<[u8; N], DecodingError> {
    bytes
        .get(..N)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| DecodingError::truncated(0, bytes, N))
}

impl RowCodec {
    /// Build a codec over the process-wide charset catalog.
    pub fn new(config: &DriverConfig) -> Result<Self> {
        Ok(Self::with_catalog(CharsetCatalog::global()?, config))
    }

    pub fn with_catalog(catalog: &'static CharsetCatalog, config: &DriverConfig) -> Self {
        Self {
            catalog,
            zero_behavior: config.zero_date_time_behavior,
            policy: config.datetime_policy,
            use_timezone: config.use_timezone,
            server_tz: config.server_timezone,
            client_tz: config.client_timezone,
            tiny_int1_is_bit: config.tiny_int1_is_bit,
            strict: config.strict_decoding,
            fallback_encoding: config.character_encoding.clone(),
        }
    }

    pub fn catalog(&self) -> &'static CharsetCatalog {
        self.catalog
    }

    pub fn policy(&self) -> DateTimePolicy {
        self.policy
    }

    pub fn tiny_int1_is_bit(&self) -> bool {
        self.tiny_int1_is_bit
    }

    /// Decode one column of a row.
    pub fn decode_column(&self, row: &dyn RowSource, index: usize, column: &ColumnDef) -> ColumnResult {
        self.decode_value(row.bytes(index), row.wire_format(), column, index)
    }

    /// Decode raw bytes; `None` is SQL NULL.
    pub fn decode_value(
        &self,
        bytes: Option<&[u8]>,
        format: WireFormat,
        column: &ColumnDef,
        index: usize,
    ) -> ColumnResult {
        self.decode_with_policy(bytes, format, column, index, self.policy)
    }

    /// Decode raw bytes, forcing the fast datetime path.
    pub fn decode_fast(
        &self,
        bytes: Option<&[u8]>,
        format: WireFormat,
        column: &ColumnDef,
        index: usize,
    ) -> ColumnResult {
        self.decode_with_policy(bytes, format, column, index, DateTimePolicy::Fast)
    }

    fn decode_with_policy(
        &self,
        bytes: Option<&[u8]>,
        format: WireFormat,
        column: &ColumnDef,
        index: usize,
        policy: DateTimePolicy,
    ) -> ColumnResult {
        let Some(bytes) = bytes else {
            return Ok(Value::Null);
        };
        let decoded = match format {
            WireFormat::Text => self.decode_text(bytes, column, policy),
            WireFormat::Binary => self.decode_binary(bytes, column, policy),
        };
        decoded.map_err(|e| e.at_column(index))
    }

    /// Decode every column of a row.
    ///
    /// With strict decoding the first failure fails the whole row; otherwise
    /// each column's outcome is reported on its own.
    pub fn decode_row(&self, row: &dyn RowSource, columns: &[ColumnDef]) -> Result<Vec<ColumnResult>> {
        let mut values = Vec::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            let value = self.decode_column(row, index, column);
            if self.strict {
                values.push(Ok(value?));
            } else {
                values.push(value);
            }
        }
        Ok(values)
    }

    fn decode_text(&self, bytes: &[u8], column: &ColumnDef, policy: DateTimePolicy) -> ColumnResult {
        let ty = column.column_type;
        match ty {
            FieldType::Null => Ok(Value::Null),
            _ if ty.is_integer() => {
                let text = ascii(bytes)?;
                let value: i128 = text
                    .parse()
                    .map_err(|_| malformed(bytes, format!("invalid integer '{text}'")))?;
                self.integer(value, column, bytes)
            }
            FieldType::Float => {
                let text = ascii(bytes)?;
                text.parse()
                    .map(Value::Float)
                    .map_err(|_| malformed(bytes, format!("invalid float '{text}'")))
            }
            FieldType::Double => {
                let text = ascii(bytes)?;
                text.parse()
                    .map(Value::Double)
                    .map_err(|_| malformed(bytes, format!("invalid double '{text}'")))
            }
            _ if ty.is_date() => self.date(temporal::parse_text_datetime(bytes)?, bytes),
            _ if ty.is_time() => temporal::parse_text_time(bytes).map(Value::Time),
            _ if ty.is_datetime() => {
                self.timestamp(temporal::parse_text_datetime(bytes)?, bytes, policy)
            }
            _ => self.decode_common(bytes, column),
        }
    }

    fn decode_binary(&self, bytes: &[u8], column: &ColumnDef, policy: DateTimePolicy) -> ColumnResult {
        let ty = column.column_type;
        let unsigned = column.is_unsigned();
        match ty {
            FieldType::Null => Ok(Value::Null),
            FieldType::Tiny => {
                let [b] = fixed::<1>(bytes)?;
                let v = if unsigned {
                    i128::from(b)
                } else {
                    i128::from(i8::from_le_bytes([b]))
                };
                self.integer(v, column, bytes)
            }
            FieldType::Short | FieldType::Year => {
                let raw = fixed::<2>(bytes)?;
                let v = if unsigned || ty == FieldType::Year {
                    i128::from(u16::from_le_bytes(raw))
                } else {
                    i128::from(i16::from_le_bytes(raw))
                };
                self.integer(v, column, bytes)
            }
            FieldType::Long | FieldType::Int24 => {
                let raw = fixed::<4>(bytes)?;
                let v = if unsigned {
                    i128::from(u32::from_le_bytes(raw))
                } else {
                    i128::from(i32::from_le_bytes(raw))
                };
                self.integer(v, column, bytes)
            }
            FieldType::LongLong => {
                let raw = fixed::<8>(bytes)?;
                let v = if unsigned {
                    i128::from(u64::from_le_bytes(raw))
                } else {
                    i128::from(i64::from_le_bytes(raw))
                };
                self.integer(v, column, bytes)
            }
            FieldType::Float => Ok(Value::Float(f32::from_le_bytes(fixed::<4>(bytes)?))),
            FieldType::Double => Ok(Value::Double(f64::from_le_bytes(fixed::<8>(bytes)?))),
            _ if ty.is_date() => self.date(temporal::parse_binary_datetime(bytes)?, bytes),
            _ if ty.is_time() => temporal::parse_binary_time(bytes).map(Value::Time),
            _ if ty.is_datetime() => {
                self.timestamp(temporal::parse_binary_datetime(bytes)?, bytes, policy)
            }
            _ => self.decode_common(bytes, column),
        }
    }

    /// Types whose encoding is the same in both wire forms.
    fn decode_common(&self, bytes: &[u8], column: &ColumnDef) -> ColumnResult {
        match column.column_type {
            FieldType::Decimal | FieldType::NewDecimal => {
                Ok(Value::Decimal(ascii(bytes)?.to_string()))
            }
            FieldType::Json => {
                let text = self.catalog.decode_str("UTF-8", bytes)?;
                serde_json::from_str(&text)
                    .map(Value::Json)
                    .map_err(|e| malformed(bytes, format!("invalid JSON: {e}")))
            }
            FieldType::Bit | FieldType::Geometry => Ok(Value::Bytes(bytes.to_vec())),
            _ => self.string(bytes, column),
        }
    }

    /// Character data through the column's collation; the binary collation
    /// (and BLOB columns carrying it) stay bytes.
    fn string(&self, bytes: &[u8], column: &ColumnDef) -> ColumnResult {
        if column.is_binary() {
            return Ok(Value::Bytes(bytes.to_vec()));
        }
        let encoding = self.encoding_for(column);
        self.catalog.decode_str(encoding, bytes).map(Value::Text)
    }

    /// Client encoding for a column, falling back to the configured one for
    /// ids outside the catalog.
    pub fn encoding_for(&self, column: &ColumnDef) -> &str {
        match self.catalog.encoding_for_index(column.charset) {
            Ok(encoding) => encoding,
            Err(_) => {
                tracing::trace!(
                    collation_id = column.charset,
                    encoding = %self.fallback_encoding,
                    "collation id outside catalog, using connection encoding"
                );
                &self.fallback_encoding
            }
        }
    }

    fn integer(&self, value: i128, column: &ColumnDef, bytes: &[u8]) -> ColumnResult {
        if column.declared_type(self.tiny_int1_is_bit) == SqlType::Boolean {
            return Ok(Value::Bool(value != 0));
        }
        let unsigned = column.is_unsigned();
        if unsigned && value < 0 {
            return Err(malformed(bytes, "negative value in unsigned column"));
        }
        let width = match (column.column_type, unsigned) {
            (FieldType::Tiny, false) => IntWidth::I8,
            (FieldType::Tiny, true) | (FieldType::Short, false) | (FieldType::Year, _) => {
                IntWidth::I16
            }
            (FieldType::Short, true) | (FieldType::Int24, _) | (FieldType::Long, false) => {
                IntWidth::I32
            }
            (FieldType::LongLong, true) => IntWidth::U64,
            _ => IntWidth::I64,
        };
        let out_of_range = || malformed(bytes, format!("{value} out of range for {}", column.column_type.name()));
        Ok(match width {
            IntWidth::I8 => Value::TinyInt(i8::try_from(value).map_err(|_| out_of_range())?),
            IntWidth::I16 => Value::SmallInt(i16::try_from(value).map_err(|_| out_of_range())?),
            IntWidth::I32 => Value::Int(i32::try_from(value).map_err(|_| out_of_range())?),
            IntWidth::I64 => Value::BigInt(i64::try_from(value).map_err(|_| out_of_range())?),
            IntWidth::U64 => match i64::try_from(value) {
                Ok(v) => Value::BigInt(v),
                Err(_) => {
                    u64::try_from(value).map_err(|_| out_of_range())?;
                    Value::Decimal(value.to_string())
                }
            },
        })
    }

    fn zero(&self, bytes: &[u8], as_timestamp: bool) -> ColumnResult {
        match self.zero_behavior {
            ZeroDateTimeBehavior::ConvertToNull => Ok(Value::Null),
            ZeroDateTimeBehavior::RaiseError => Err(DecodingError::new(
                0,
                bytes,
                DecodingErrorKind::ZeroDate,
                "zero date value cannot be represented",
            )),
            ZeroDateTimeBehavior::RoundToDummyMinimum => {
                let minimum = NaiveDate::from_ymd_opt(1, 1, 1)
                    .ok_or_else(|| malformed(bytes, "no dummy minimum date"))?;
                if as_timestamp {
                    self.client_tz
                        .from_local_datetime(&minimum.and_time(chrono::NaiveTime::MIN))
                        .single()
                        .map(Value::Timestamp)
                        .ok_or_else(|| malformed(bytes, "dummy minimum not representable"))
                } else {
                    Ok(Value::Date(minimum))
                }
            }
        }
    }

    fn date(&self, parsed: Parsed<NaiveDateTime>, bytes: &[u8]) -> ColumnResult {
        match parsed {
            Parsed::Zero => self.zero(bytes, false),
            Parsed::Value(dt) => Ok(Value::Date(dt.date())),
        }
    }

    fn timestamp(&self, parsed: Parsed<NaiveDateTime>, bytes: &[u8], policy: DateTimePolicy) -> ColumnResult {
        let local = match parsed {
            Parsed::Zero => return self.zero(bytes, true),
            Parsed::Value(dt) => dt,
        };
        self.present(local, policy)
            .map(Value::Timestamp)
            .ok_or_else(|| malformed(bytes, "datetime out of range after time zone conversion"))
    }

    /// Attach zone information to a server wall-clock value.
    pub fn present(&self, local: NaiveDateTime, policy: DateTimePolicy) -> Option<DateTime<FixedOffset>> {
        match policy {
            DateTimePolicy::Legacy => {
                let shifted = if self.use_timezone {
                    let delta = self.client_tz.local_minus_utc() - self.server_tz.local_minus_utc();
                    local.checked_add_signed(TimeDelta::try_seconds(i64::from(delta))?)?
                } else {
                    local
                };
                self.client_tz.from_local_datetime(&shifted).single()
            }
            DateTimePolicy::Fast => self
                .server_tz
                .from_local_datetime(&local)
                .single()
                .map(|instant| instant.with_timezone(&self.client_tz)),
        }
    }

    /// Text-protocol bytes for a value as the server stores it.
    ///
    /// Timestamps are written as server wall clock, so bytes produced here
    /// decode back to the same instant.
    pub fn server_text(&self, value: &Value) -> Option<Vec<u8>> {
        match value {
            Value::Timestamp(ts) => {
                Value::Timestamp(ts.with_timezone(&self.server_tz)).to_text_bytes()
            }
            other => other.to_text_bytes(),
        }
    }
}
