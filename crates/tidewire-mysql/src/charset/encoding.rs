//! Native string conversion for the client encodings the crate implements.
//!
//! Errors carry column index 0; callers re-target them with
//! [`DecodingError::at_column`].

use tidewire_core::{DecodingError, DecodingErrorKind};

/// Encodings with a built-in converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeEncoding {
    Utf8,
    Ascii,
    Latin1,
    Cp1252,
    Utf16Be,
    Utf16Le,
    Utf32Be,
}

impl NativeEncoding {
    /// Resolve a client encoding name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Some(Self::Utf8),
            "US-ASCII" | "ASCII" => Some(Self::Ascii),
            "ISO8859_1" | "ISO-8859-1" | "LATIN1" => Some(Self::Latin1),
            "CP1252" | "WINDOWS-1252" => Some(Self::Cp1252),
            "UTF-16" | "UTF-16BE" | "UNICODEBIG" => Some(Self::Utf16Be),
            "UTF-16LE" => Some(Self::Utf16Le),
            "UTF-32" | "UTF-32BE" => Some(Self::Utf32Be),
            _ => None,
        }
    }
}

// 0x80..=0x9F; unassigned slots keep their C1 control code point.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

fn unsupported(encoding: &str, bytes: &[u8]) -> DecodingError {
    DecodingError::new(
        0,
        bytes,
        DecodingErrorKind::UnsupportedEncoding(encoding.to_string()),
        format!("no converter for encoding '{encoding}'"),
    )
}

/// Decode bytes in the given client encoding.
pub fn decode(encoding: &str, bytes: &[u8]) -> Result<String, DecodingError> {
    let native = NativeEncoding::from_name(encoding).ok_or_else(|| unsupported(encoding, bytes))?;
    match native {
        NativeEncoding::Utf8 => std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| DecodingError::malformed(0, bytes, format!("invalid UTF-8: {e}"))),
        NativeEncoding::Ascii => {
            if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                return Err(DecodingError::malformed(
                    0,
                    bytes,
                    format!("non-ASCII byte at offset {pos}"),
                ));
            }
            Ok(bytes.iter().map(|&b| char::from(b)).collect())
        }
        NativeEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        NativeEncoding::Cp1252 => Ok(bytes
            .iter()
            .map(|&b| match b {
                0x80..=0x9F => CP1252_HIGH[usize::from(b - 0x80)],
                _ => char::from(b),
            })
            .collect()),
        NativeEncoding::Utf16Be | NativeEncoding::Utf16Le => {
            if bytes.len() % 2 != 0 {
                return Err(DecodingError::truncated(0, bytes, bytes.len() + 1));
            }
            let units = bytes.chunks_exact(2).map(|pair| {
                if native == NativeEncoding::Utf16Be {
                    u16::from_be_bytes([pair[0], pair[1]])
                } else {
                    u16::from_le_bytes([pair[0], pair[1]])
                }
            });
            char::decode_utf16(units)
                .collect::<Result<String, _>>()
                .map_err(|e| DecodingError::malformed(0, bytes, format!("invalid UTF-16: {e}")))
        }
        NativeEncoding::Utf32Be => {
            if bytes.len() % 4 != 0 {
                return Err(DecodingError::truncated(0, bytes, bytes.len().div_ceil(4) * 4));
            }
            bytes
                .chunks_exact(4)
                .map(|quad| {
                    let code = u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
                    char::from_u32(code).ok_or_else(|| {
                        DecodingError::malformed(0, bytes, format!("invalid code point {code:#x}"))
                    })
                })
                .collect()
        }
    }
}

/// Encode text in the given client encoding.
pub fn encode(encoding: &str, text: &str) -> Result<Vec<u8>, DecodingError> {
    let native = NativeEncoding::from_name(encoding)
        .ok_or_else(|| unsupported(encoding, text.as_bytes()))?;
    let unmappable = |c: char| {
        DecodingError::malformed(
            0,
            text.as_bytes(),
            format!("character {c:?} is not representable in {encoding}"),
        )
    };
    match native {
        NativeEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
        NativeEncoding::Ascii => text
            .chars()
            .map(|c| if c.is_ascii() { Ok(c as u8) } else { Err(unmappable(c)) })
            .collect(),
        NativeEncoding::Latin1 => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| unmappable(c)))
            .collect(),
        NativeEncoding::Cp1252 => text
            .chars()
            .map(|c| {
                if let Some(pos) = CP1252_HIGH.iter().position(|&h| h == c) {
                    return u8::try_from(0x80 + pos).map_err(|_| unmappable(c));
                }
                match u32::from(c) {
                    code @ (0x00..=0x7F | 0xA0..=0xFF) => {
                        u8::try_from(code).map_err(|_| unmappable(c))
                    }
                    _ => Err(unmappable(c)),
                }
            })
            .collect(),
        NativeEncoding::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
        NativeEncoding::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
        NativeEncoding::Utf32Be => Ok(text.chars().flat_map(|c| u32::from(c).to_be_bytes()).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cp1252_high_range() {
        assert_eq!(decode("Cp1252", &[0x80, b'1']).unwrap(), "\u{20AC}1");
        assert_eq!(encode("Cp1252", "\u{20AC}").unwrap(), vec![0x80]);
        assert_eq!(encode("Cp1252", "\u{E9}").unwrap(), vec![0xE9]);
        assert!(encode("Cp1252", "\u{4E2D}").is_err());
    }

    #[test]
    fn test_utf16_both_orders() {
        assert_eq!(decode("UTF-16", &[0x00, b'h', 0x00, b'i']).unwrap(), "hi");
        assert_eq!(decode("UTF-16LE", &[b'h', 0x00, b'i', 0x00]).unwrap(), "hi");
        assert_eq!(encode("UnicodeBig", "A").unwrap(), vec![0x00, b'A']);
        let err = decode("UTF-16", &[0x00]).unwrap_err();
        assert!(matches!(err.kind, DecodingErrorKind::Truncated { .. }));
    }

    #[test]
    fn test_utf32_rejects_surrogates() {
        assert_eq!(decode("UTF-32", &[0, 0, 0, b'z']).unwrap(), "z");
        assert!(decode("UTF-32", &[0, 0, 0xD8, 0]).is_err());
    }

    #[test]
    fn test_ascii_and_utf8_validation() {
        assert!(decode("US-ASCII", &[0xC3, 0xA9]).is_err());
        assert_eq!(decode("UTF-8", &[0xC3, 0xA9]).unwrap(), "\u{E9}");
        assert!(decode("UTF-8", &[0xC3]).is_err());
        assert_eq!(decode("ISO8859_1", &[0xE9]).unwrap(), "\u{E9}");
    }

    #[test]
    fn test_unknown_encoding_is_reported() {
        let err = decode("Big5", b"abc").unwrap_err();
        assert_eq!(
            err.kind,
            DecodingErrorKind::UnsupportedEncoding("Big5".to_string())
        );
        assert_eq!(err.bytes, b"abc".to_vec());
    }
}
