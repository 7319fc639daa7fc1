//! Turning a stored column back into a statement parameter.

use tidewire_core::{Result, Value, WireFormat};

use crate::codec::RowCodec;
use crate::types::{ColumnDef, SqlType};

/// Bind raw column bytes as a parameter, dispatching on the declared type.
///
/// A NULL column binds SQL NULL whatever its type.
pub fn bind_column(
    codec: &RowCodec,
    column: &ColumnDef,
    index: usize,
    bytes: Option<&[u8]>,
    format: WireFormat,
) -> Result<Value> {
    let Some(raw) = bytes else {
        return Ok(Value::Null);
    };
    let value = match column.declared_type(codec.tiny_int1_is_bit()) {
        SqlType::TinyInt
        | SqlType::SmallInt
        | SqlType::MediumInt
        | SqlType::Integer
        | SqlType::BigInt
        | SqlType::Year => match codec.decode_value(bytes, format, column, index)? {
            Value::Decimal(d) => Value::Decimal(d),
            other => other.as_i64().map_or(other, Value::BigInt),
        },
        SqlType::Json => Value::Text(
            codec
                .catalog()
                .decode_str("UTF-8", raw)
                .map_err(|e| e.at_column(index))?,
        ),
        SqlType::Char
        | SqlType::VarChar
        | SqlType::Decimal
        | SqlType::Enum
        | SqlType::Set => Value::Text(
            codec
                .catalog()
                .decode_str(codec.encoding_for(column), raw)
                .map_err(|e| e.at_column(index))?,
        ),
        SqlType::Date | SqlType::Time | SqlType::Timestamp => {
            codec.decode_fast(bytes, format, column, index)?
        }
        SqlType::Float | SqlType::Double | SqlType::Boolean | SqlType::Null => match format {
            WireFormat::Text => Value::Raw(raw.to_vec()),
            WireFormat::Binary => codec
                .decode_value(bytes, format, column, index)?
                .to_text_bytes()
                .map_or(Value::Null, Value::Raw),
        },
        SqlType::Bit
        | SqlType::Binary
        | SqlType::VarBinary
        | SqlType::Blob
        | SqlType::Geometry => Value::Bytes(raw.to_vec()),
    };
    Ok(value)
}
