//! Result set packet parsing.
//!
//! Turns column definition packets into [`ColumnDef`]s and row packets into
//! [`ByteArrayRow`]s. Values stay undecoded; the row codec interprets them.

use tidewire_core::{ByteArrayRow, DecodingError, Error, Result, WireFormat};

use super::{NULL_MARKER, PacketReader};
use crate::types::{ColumnDef, FieldType};

fn malformed_packet(ordinal: usize, data: &[u8], what: &str) -> Error {
    let message = format!("malformed column definition: missing {what}");
    DecodingError::malformed(ordinal, data, message).into()
}

/// Parse a protocol 4.1 column definition packet.
pub fn parse_column_def(data: &[u8], ordinal: usize) -> Result<ColumnDef> {
    let mut reader = PacketReader::new(data);
    let mut text = |what: &str| {
        reader
            .read_lenenc_string()
            .ok_or_else(|| malformed_packet(ordinal, data, what))
    };
    let catalog = text("catalog")?;
    let schema = text("schema")?;
    let table = text("table")?;
    let org_table = text("org_table")?;
    let name = text("name")?;
    let org_name = text("org_name")?;

    // length of the fixed-size block, always 0x0c
    reader
        .read_lenenc_int()
        .ok_or_else(|| malformed_packet(ordinal, data, "fixed length"))?;
    let charset = reader
        .read_u16_le()
        .ok_or_else(|| malformed_packet(ordinal, data, "charset"))?;
    let column_length = reader
        .read_u32_le()
        .ok_or_else(|| malformed_packet(ordinal, data, "column_length"))?;
    let column_type = FieldType::from_u8(
        reader
            .read_u8()
            .ok_or_else(|| malformed_packet(ordinal, data, "column_type"))?,
    );
    let flags = reader
        .read_u16_le()
        .ok_or_else(|| malformed_packet(ordinal, data, "flags"))?;
    let decimals = reader
        .read_u8()
        .ok_or_else(|| malformed_packet(ordinal, data, "decimals"))?;

    Ok(ColumnDef {
        ordinal,
        catalog,
        schema,
        table,
        org_table,
        name,
        org_name,
        charset,
        column_length,
        column_type,
        flags,
        decimals,
    })
}

/// Parse a text protocol row: one length-encoded string per column, 0xFB
/// for NULL.
pub fn parse_text_row(data: &[u8], columns: &[ColumnDef]) -> Result<ByteArrayRow> {
    let mut reader = PacketReader::new(data);
    let mut values = Vec::with_capacity(columns.len());
    for (i, _) in columns.iter().enumerate() {
        if reader.peek() == Some(NULL_MARKER) {
            reader.skip(1);
            values.push(None);
            continue;
        }
        let start = reader.position();
        let bytes = reader.read_lenenc_bytes().ok_or_else(|| {
            DecodingError::malformed(i, &data[start.min(data.len())..], "truncated text row value")
        })?;
        values.push(Some(bytes.to_vec()));
    }
    Ok(ByteArrayRow::with_format(values, WireFormat::Text))
}

/// Parse a binary protocol row.
///
/// Layout: a 0x00 header, a NULL bitmap of `(n + 7 + 2) / 8` bytes whose
/// first two bits are reserved, then the non-NULL values. Temporal values
/// keep their leading length byte so the codec can tell which fields are
/// present.
pub fn parse_binary_row(data: &[u8], columns: &[ColumnDef]) -> Result<ByteArrayRow> {
    let mut reader = PacketReader::new(data);
    match reader.read_u8() {
        Some(0x00) => {}
        _ => {
            return Err(DecodingError::malformed(0, data, "binary row must start with 0x00").into());
        }
    }
    let bitmap_len = (columns.len() + 7 + 2) / 8;
    let bitmap = reader
        .read_bytes(bitmap_len)
        .ok_or_else(|| DecodingError::truncated(0, data, 1 + bitmap_len))?;

    let mut values = Vec::with_capacity(columns.len());
    for (i, col) in columns.iter().enumerate() {
        let bit = i + 2;
        if bitmap[bit / 8] & (1 << (bit % 8)) != 0 {
            values.push(None);
            continue;
        }
        let start = reader.position();
        let rest = data.get(start..).unwrap_or_default();
        let value = if let Some(width) = col.column_type.binary_width() {
            reader.read_bytes(width)
        } else if col.column_type.is_temporal() {
            let len = rest.first().map_or(0, |&b| usize::from(b));
            reader.read_bytes(len + 1)
        } else {
            reader.read_lenenc_bytes()
        };
        let value = value.ok_or_else(|| DecodingError::malformed(i, rest, "truncated binary row value"))?;
        values.push(Some(value.to_vec()));
    }
    Ok(ByteArrayRow::with_format(values, WireFormat::Binary))
}
