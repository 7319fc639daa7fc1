//! MySQL result set wire format.
//!
//! Column definitions and rows arrive as packets. The text protocol sends
//! every value as a length-encoded string; the binary protocol (prepared
//! statements) sends a NULL bitmap followed by type-specific encodings.

pub mod reader;
pub mod row;

pub use reader::PacketReader;
pub use row::{parse_binary_row, parse_column_def, parse_text_row};

/// Length-encoded NULL in text protocol rows.
pub const NULL_MARKER: u8 = 0xFB;
