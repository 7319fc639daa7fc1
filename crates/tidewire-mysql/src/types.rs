//! MySQL column metadata.
//!
//! This module provides:
//! - MySQL field type codes as sent in column definition packets
//! - column flag constants
//! - [`ColumnDef`], the per-column metadata every decoder and the
//!   editable cursor work from
//! - [`SqlType`], the declared type parameter binding dispatches on

use serde::{Deserialize, Serialize};

/// Collation id of the `binary` pseudo-charset.
pub const BINARY_COLLATION: u16 = 63;

/// MySQL field type codes.
///
/// These are the `MYSQL_TYPE_*` constants from the MySQL C API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FieldType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0A,
    Time = 0x0B,
    DateTime = 0x0C,
    Year = 0x0D,
    NewDate = 0x0E,
    VarChar = 0x0F,
    Bit = 0x10,
    Timestamp2 = 0x11,
    DateTime2 = 0x12,
    Time2 = 0x13,
    Json = 0xF5,
    NewDecimal = 0xF6,
    Enum = 0xF7,
    Set = 0xF8,
    TinyBlob = 0xF9,
    MediumBlob = 0xFA,
    LongBlob = 0xFB,
    Blob = 0xFC,
    VarString = 0xFD,
    String = 0xFE,
    Geometry = 0xFF,
}

impl FieldType {
    /// Parse a field type from its wire code. Unknown codes read as CHAR.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => FieldType::Decimal,
            0x01 => FieldType::Tiny,
            0x02 => FieldType::Short,
            0x03 => FieldType::Long,
            0x04 => FieldType::Float,
            0x05 => FieldType::Double,
            0x06 => FieldType::Null,
            0x07 => FieldType::Timestamp,
            0x08 => FieldType::LongLong,
            0x09 => FieldType::Int24,
            0x0A => FieldType::Date,
            0x0B => FieldType::Time,
            0x0C => FieldType::DateTime,
            0x0D => FieldType::Year,
            0x0E => FieldType::NewDate,
            0x0F => FieldType::VarChar,
            0x10 => FieldType::Bit,
            0x11 => FieldType::Timestamp2,
            0x12 => FieldType::DateTime2,
            0x13 => FieldType::Time2,
            0xF5 => FieldType::Json,
            0xF6 => FieldType::NewDecimal,
            0xF7 => FieldType::Enum,
            0xF8 => FieldType::Set,
            0xF9 => FieldType::TinyBlob,
            0xFA => FieldType::MediumBlob,
            0xFB => FieldType::LongBlob,
            0xFC => FieldType::Blob,
            0xFD => FieldType::VarString,
            0xFF => FieldType::Geometry,
            _ => FieldType::String,
        }
    }

    /// Width in bytes of this type's fixed-size binary encoding, `None` for
    /// length-prefixed types.
    #[must_use]
    pub const fn binary_width(self) -> Option<usize> {
        match self {
            FieldType::Tiny => Some(1),
            FieldType::Short | FieldType::Year => Some(2),
            FieldType::Long | FieldType::Int24 | FieldType::Float => Some(4),
            FieldType::LongLong | FieldType::Double => Some(8),
            FieldType::Null => Some(0),
            _ => None,
        }
    }

    /// Integer types, YEAR included.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Tiny
                | FieldType::Short
                | FieldType::Long
                | FieldType::LongLong
                | FieldType::Int24
                | FieldType::Year
        )
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, FieldType::Float | FieldType::Double)
    }

    #[must_use]
    pub const fn is_decimal(self) -> bool {
        matches!(self, FieldType::Decimal | FieldType::NewDecimal)
    }

    /// Character-ish types: their bytes may still be binary if the
    /// collation is `binary`.
    #[must_use]
    pub const fn is_string(self) -> bool {
        matches!(
            self,
            FieldType::VarChar
                | FieldType::VarString
                | FieldType::String
                | FieldType::Enum
                | FieldType::Set
        )
    }

    #[must_use]
    pub const fn is_blob(self) -> bool {
        matches!(
            self,
            FieldType::TinyBlob
                | FieldType::MediumBlob
                | FieldType::LongBlob
                | FieldType::Blob
                | FieldType::Geometry
        )
    }

    #[must_use]
    pub const fn is_date(self) -> bool {
        matches!(self, FieldType::Date | FieldType::NewDate)
    }

    #[must_use]
    pub const fn is_time(self) -> bool {
        matches!(self, FieldType::Time | FieldType::Time2)
    }

    #[must_use]
    pub const fn is_datetime(self) -> bool {
        matches!(
            self,
            FieldType::DateTime
                | FieldType::Timestamp
                | FieldType::DateTime2
                | FieldType::Timestamp2
        )
    }

    #[must_use]
    pub const fn is_temporal(self) -> bool {
        self.is_date() || self.is_time() || self.is_datetime()
    }

    /// Get the type name as a string.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Decimal | FieldType::NewDecimal => "DECIMAL",
            FieldType::Tiny => "TINYINT",
            FieldType::Short => "SMALLINT",
            FieldType::Long => "INT",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Null => "NULL",
            FieldType::Timestamp | FieldType::Timestamp2 => "TIMESTAMP",
            FieldType::LongLong => "BIGINT",
            FieldType::Int24 => "MEDIUMINT",
            FieldType::Date | FieldType::NewDate => "DATE",
            FieldType::Time | FieldType::Time2 => "TIME",
            FieldType::DateTime | FieldType::DateTime2 => "DATETIME",
            FieldType::Year => "YEAR",
            FieldType::VarChar | FieldType::VarString => "VARCHAR",
            FieldType::Bit => "BIT",
            FieldType::Json => "JSON",
            FieldType::Enum => "ENUM",
            FieldType::Set => "SET",
            FieldType::TinyBlob => "TINYBLOB",
            FieldType::MediumBlob => "MEDIUMBLOB",
            FieldType::LongBlob => "LONGBLOB",
            FieldType::Blob => "BLOB",
            FieldType::String => "CHAR",
            FieldType::Geometry => "GEOMETRY",
        }
    }
}

/// Column flags in result set metadata.
pub mod column_flags {
    pub const NOT_NULL: u16 = 1;
    pub const PRIMARY_KEY: u16 = 2;
    pub const UNIQUE_KEY: u16 = 4;
    pub const MULTIPLE_KEY: u16 = 8;
    pub const BLOB: u16 = 16;
    pub const UNSIGNED: u16 = 32;
    pub const ZEROFILL: u16 = 64;
    pub const BINARY: u16 = 128;
    pub const ENUM: u16 = 256;
    pub const AUTO_INCREMENT: u16 = 512;
    pub const TIMESTAMP: u16 = 1024;
    pub const SET: u16 = 2048;
    pub const NO_DEFAULT_VALUE: u16 = 4096;
    pub const ON_UPDATE_NOW: u16 = 8192;
    pub const NUM: u16 = 32768;
}

/// Declared SQL type of a column, as parameter binding sees it.
///
/// Derived from the wire [`FieldType`] plus flags and collation: a CHAR
/// column with the binary collation is `Binary`, a `TINYINT(1)` may be
/// `Boolean`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    TinyInt,
    SmallInt,
    MediumInt,
    Integer,
    BigInt,
    Year,
    Boolean,
    Float,
    Double,
    Decimal,
    Char,
    VarChar,
    Enum,
    Set,
    Json,
    Date,
    Time,
    Timestamp,
    Bit,
    Binary,
    VarBinary,
    Blob,
    Geometry,
    Null,
}

/// Column definition from a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Zero-based position in the result set
    pub ordinal: usize,
    /// Catalog name (always "def")
    pub catalog: String,
    /// Schema (database) name
    pub schema: String,
    /// Table name (or alias)
    pub table: String,
    /// Original table name
    pub org_table: String,
    /// Column name (or alias)
    pub name: String,
    /// Original column name
    pub org_name: String,
    /// Collation id
    pub charset: u16,
    /// Column length
    pub column_length: u32,
    /// Column type
    pub column_type: FieldType,
    /// Column flags
    pub flags: u16,
    /// Number of decimals
    pub decimals: u8,
}

impl ColumnDef {
    /// Create a column with only a name and a type; origin fields are empty.
    pub fn new(name: impl Into<String>, column_type: FieldType) -> Self {
        let name = name.into();
        Self {
            ordinal: 0,
            catalog: "def".to_string(),
            schema: String::new(),
            table: String::new(),
            org_table: String::new(),
            org_name: name.clone(),
            name,
            charset: 255,
            column_length: 0,
            column_type,
            flags: 0,
            decimals: 0,
        }
    }

    /// Set the originating database and table (alias and original alike).
    #[must_use]
    pub fn from_table(mut self, schema: impl Into<String>, table: impl Into<String>) -> Self {
        self.schema = schema.into();
        self.table = table.into();
        self.org_table = self.table.clone();
        self
    }

    #[must_use]
    pub fn with_ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = ordinal;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn with_charset(mut self, collation_id: u16) -> Self {
        self.charset = collation_id;
        self
    }

    #[must_use]
    pub fn with_length(mut self, column_length: u32) -> Self {
        self.column_length = column_length;
        self
    }

    #[must_use]
    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    #[must_use]
    pub const fn is_not_null(&self) -> bool {
        self.flags & column_flags::NOT_NULL != 0
    }

    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.flags & column_flags::PRIMARY_KEY != 0
    }

    #[must_use]
    pub const fn is_unsigned(&self) -> bool {
        self.flags & column_flags::UNSIGNED != 0
    }

    #[must_use]
    pub const fn is_auto_increment(&self) -> bool {
        self.flags & column_flags::AUTO_INCREMENT != 0
    }

    /// Carries the binary collation, so its bytes are not character data.
    ///
    /// The BINARY flag alone is not enough: `_bin` collations set it too.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        self.charset == BINARY_COLLATION
    }

    #[must_use]
    pub const fn is_blob(&self) -> bool {
        self.flags & column_flags::BLOB != 0
    }

    /// Table the column really comes from: the original table, falling back
    /// to the alias. `None` for computed columns.
    pub fn origin_table(&self) -> Option<&str> {
        [&self.org_table, &self.table]
            .into_iter()
            .find(|t| !t.is_empty())
            .map(String::as_str)
    }

    /// Database the column comes from, `None` when the server did not say.
    pub fn origin_database(&self) -> Option<&str> {
        if self.schema.is_empty() {
            None
        } else {
            Some(&self.schema)
        }
    }

    /// Column name in its table: the original name, falling back to the label.
    pub fn origin_name(&self) -> &str {
        if self.org_name.is_empty() {
            &self.name
        } else {
            &self.org_name
        }
    }

    /// Map the wire type to the declared SQL type.
    ///
    /// `tiny_int1_is_bit` makes `TINYINT(1)` a boolean, as most drivers do by
    /// default.
    pub fn declared_type(&self, tiny_int1_is_bit: bool) -> SqlType {
        let binary_charset = self.charset == BINARY_COLLATION;
        match self.column_type {
            FieldType::Tiny if tiny_int1_is_bit && self.column_length == 1 => SqlType::Boolean,
            FieldType::Tiny => SqlType::TinyInt,
            FieldType::Short => SqlType::SmallInt,
            FieldType::Int24 => SqlType::MediumInt,
            FieldType::Long => SqlType::Integer,
            FieldType::LongLong => SqlType::BigInt,
            FieldType::Year => SqlType::Year,
            FieldType::Float => SqlType::Float,
            FieldType::Double => SqlType::Double,
            FieldType::Decimal | FieldType::NewDecimal => SqlType::Decimal,
            FieldType::String if binary_charset => SqlType::Binary,
            FieldType::VarChar | FieldType::VarString if binary_charset => SqlType::VarBinary,
            FieldType::String => SqlType::Char,
            FieldType::VarChar | FieldType::VarString => SqlType::VarChar,
            FieldType::Enum => SqlType::Enum,
            FieldType::Set => SqlType::Set,
            FieldType::Json => SqlType::Json,
            FieldType::Date | FieldType::NewDate => SqlType::Date,
            FieldType::Time | FieldType::Time2 => SqlType::Time,
            FieldType::DateTime
            | FieldType::DateTime2
            | FieldType::Timestamp
            | FieldType::Timestamp2 => SqlType::Timestamp,
            FieldType::Bit => SqlType::Bit,
            FieldType::TinyBlob
            | FieldType::MediumBlob
            | FieldType::LongBlob
            | FieldType::Blob => SqlType::Blob,
            FieldType::Geometry => SqlType::Geometry,
            FieldType::Null => SqlType::Null,
        }
    }
}
