//! Charset and collation registry.
//!
//! Maps the numeric collation ids sent in handshake and column definition
//! packets to collation names, server charsets and client encodings, and
//! picks the server charset to request for a client encoding.
//!
//! The registry is built once from compiled-in tables and is read-only
//! afterwards. [`CharsetCatalog::global`] holds the process-wide instance.

pub mod encoding;
mod tables;

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tidewire_core::{DecodingError, Error, Result, ServerVersion};

use tables::{
    CHARSETS, COLLATIONS, ENCODING_CANDIDATES, MAX_COLLATION_ID, MULTIBYTE_ENCODINGS,
    NOT_IMPLEMENTED, UNICODE_FAMILIES, UNICODE_LANGUAGES,
};

static CATALOG: LazyLock<Result<CharsetCatalog>> = LazyLock::new(CharsetCatalog::load);

/// One collation id and everything it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollationEntry {
    pub id: u16,
    pub collation: String,
    pub charset: &'static str,
    /// Client encoding; may be a best-effort stand-in, never empty
    pub encoding: &'static str,
    pub max_bytes_per_char: u8,
}

#[derive(Debug, Clone, Copy)]
struct CharsetInfo {
    max_bytes_per_char: u8,
    encoding: &'static str,
    best_effort: bool,
}

/// A server charset that may be requested for a client encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharsetCandidate {
    pub charset: &'static str,
    pub min_version: Option<ServerVersion>,
    pub preferred: bool,
}

/// Immutable collation and charset registry.
#[derive(Debug)]
pub struct CharsetCatalog {
    // index = id - 1
    collations: Vec<CollationEntry>,
    by_collation_name: HashMap<String, u16>,
    charsets: HashMap<&'static str, CharsetInfo>,
    candidates: HashMap<&'static str, Vec<CharsetCandidate>>,
    multibyte: HashSet<&'static str>,
}

impl CharsetCatalog {
    /// The process-wide catalog, built on first use.
    ///
    /// If the static tables are malformed every call returns the load error.
    pub fn global() -> Result<&'static CharsetCatalog> {
        CATALOG
            .as_ref()
            .map_err(|e| Error::config(format!("charset catalog failed to load: {e}")))
    }

    /// Build and validate a catalog from the compiled-in tables.
    pub fn load() -> Result<Self> {
        let mut charsets = HashMap::with_capacity(CHARSETS.len());
        for &(name, max_bytes_per_char, encoding, best_effort) in CHARSETS {
            if encoding.is_empty() || max_bytes_per_char == 0 {
                return Err(Error::config(format!("charset '{name}' is incomplete")));
            }
            let info = CharsetInfo {
                max_bytes_per_char,
                encoding,
                best_effort,
            };
            if charsets.insert(name, info).is_some() {
                return Err(Error::config(format!("charset '{name}' declared twice")));
            }
        }

        let mut assigned: Vec<Option<(String, &'static str)>> =
            vec![None; usize::from(MAX_COLLATION_ID)];
        let mut assign = |id: u16, collation: String, charset: &'static str| -> Result<()> {
            let slot = id
                .checked_sub(1)
                .and_then(|i| assigned.get_mut(usize::from(i)))
                .ok_or_else(|| Error::config(format!("collation id {id} out of range")))?;
            if slot.is_some() {
                return Err(Error::config(format!("collation id {id} assigned twice")));
            }
            *slot = Some((collation, charset));
            Ok(())
        };
        for &(id, collation, charset) in COLLATIONS {
            assign(id, collation.to_string(), charset)?;
        }
        for &(base, charset) in UNICODE_FAMILIES {
            for (offset, language) in (0_u16..).zip(UNICODE_LANGUAGES) {
                assign(base + offset, format!("{charset}_{language}_ci"), charset)?;
            }
        }

        let mut collations = Vec::with_capacity(assigned.len());
        let mut by_collation_name = HashMap::with_capacity(assigned.len());
        for (id, slot) in (1_u16..).zip(assigned) {
            let (collation, charset) =
                slot.unwrap_or_else(|| (NOT_IMPLEMENTED.to_string(), NOT_IMPLEMENTED));
            let info = charsets.get(charset).ok_or_else(|| {
                Error::config(format!(
                    "collation {id} ({collation}) names unknown charset '{charset}'"
                ))
            })?;
            if charset != NOT_IMPLEMENTED {
                by_collation_name.insert(collation.clone(), id);
            }
            collations.push(CollationEntry {
                id,
                collation,
                charset,
                encoding: info.encoding,
                max_bytes_per_char: info.max_bytes_per_char,
            });
        }

        let candidate_re = Regex::new(r"^(\*)?(?:>(\d+)\.(\d+)\.(\d+)\s+)?([a-z0-9_]+)$")
            .map_err(|e| Error::config(e.to_string()))?;
        let mut candidates = HashMap::with_capacity(ENCODING_CANDIDATES.len());
        for &(encoding, specs) in ENCODING_CANDIDATES {
            if specs.is_empty() {
                return Err(Error::config(format!("encoding '{encoding}' has no charsets")));
            }
            let mut list = specs
                .iter()
                .map(|entry| parse_candidate(&candidate_re, encoding, entry, &charsets))
                .collect::<Result<Vec<_>>>()?;
            // ascending version, preferred first within a version
            list.sort_by_key(|c| (c.min_version, !c.preferred));
            candidates.insert(encoding, list);
        }

        Ok(Self {
            collations,
            by_collation_name,
            charsets,
            candidates,
            multibyte: MULTIBYTE_ENCODINGS.iter().copied().collect(),
        })
    }

    /// Look up a collation id.
    pub fn lookup_by_index(&self, id: u16) -> Result<&CollationEntry> {
        id.checked_sub(1)
            .and_then(|i| self.collations.get(usize::from(i)))
            .ok_or_else(|| {
                Error::config(format!(
                    "collation id {id} is outside 1..={MAX_COLLATION_ID}"
                ))
            })
    }

    /// Reverse lookup: the id of a named collation.
    pub fn lookup_by_collation_name(&self, name: &str) -> Option<u16> {
        self.by_collation_name
            .get(&name.to_ascii_lowercase())
            .copied()
    }

    /// Client encoding of a collation id.
    pub fn encoding_for_index(&self, id: u16) -> Result<&'static str> {
        let entry = self.lookup_by_index(id)?;
        if self
            .charsets
            .get(entry.charset)
            .is_some_and(|info| info.best_effort)
        {
            tracing::trace!(
                collation_id = id,
                charset = entry.charset,
                encoding = entry.encoding,
                "using best-effort client encoding"
            );
        }
        Ok(entry.encoding)
    }

    /// Client encoding used for a server charset name.
    pub fn encoding_for_server_charset(&self, charset: &str) -> Option<&'static str> {
        let info = self.charsets.get(charset.to_ascii_lowercase().as_str())?;
        if info.best_effort {
            tracing::trace!(charset, encoding = info.encoding, "using best-effort client encoding");
        }
        Some(info.encoding)
    }

    /// Maximum bytes one character of a server charset can take.
    pub fn max_bytes_per_char(&self, charset: &str) -> Option<u8> {
        self.charsets
            .get(charset.to_ascii_lowercase().as_str())
            .map(|info| info.max_bytes_per_char)
    }

    /// Candidate server charsets for a client encoding, in resolution order.
    pub fn candidates(&self, encoding: &str) -> Option<&[CharsetCandidate]> {
        self.candidates
            .get(encoding.to_ascii_uppercase().as_str())
            .map(Vec::as_slice)
    }

    /// Pick the server charset to request for a client encoding.
    ///
    /// Without a server version the first declared candidate wins. With one,
    /// candidates are walked in ascending version order: a preferred candidate
    /// whose gate is met wins outright, otherwise the last met candidate
    /// before the first unmet gate is used. `None` for unknown encodings or
    /// when no gate is met.
    ///
    /// ```
    /// use tidewire_core::ServerVersion;
    /// use tidewire_mysql::charset::CharsetCatalog;
    ///
    /// let catalog = CharsetCatalog::global().unwrap();
    /// let v = Some(ServerVersion::new(8, 0, 33));
    /// assert_eq!(catalog.resolve_server_charset("UTF-8", v), Some("utf8mb4"));
    /// ```
    pub fn resolve_server_charset(
        &self,
        encoding: &str,
        version: Option<ServerVersion>,
    ) -> Option<&'static str> {
        let list = self.candidates(encoding)?;
        let Some(version) = version else {
            return list.first().map(|c| c.charset);
        };
        let mut accepted = None;
        for candidate in list {
            let met = candidate
                .min_version
                .is_none_or(|min| version.meets_minimum(min));
            if !met {
                break;
            }
            if candidate.preferred {
                return Some(candidate.charset);
            }
            accepted = Some(candidate.charset);
        }
        accepted
    }

    /// Whether characters of a client encoding may span several bytes.
    pub fn is_multibyte(&self, encoding: &str) -> bool {
        self.multibyte
            .contains(encoding.to_ascii_uppercase().as_str())
    }

    /// Decode bytes in a client encoding.
    pub fn decode_str(&self, encoding: &str, bytes: &[u8]) -> std::result::Result<String, DecodingError> {
        encoding::decode(encoding, bytes)
    }

    /// Encode text in a client encoding.
    pub fn encode_str(&self, encoding: &str, text: &str) -> std::result::Result<Vec<u8>, DecodingError> {
        encoding::encode(encoding, text)
    }
}

fn parse_candidate(
    re: &Regex,
    encoding: &str,
    entry: &str,
    charsets: &HashMap<&'static str, CharsetInfo>,
) -> Result<CharsetCandidate> {
    let caps = re.captures(entry).ok_or_else(|| {
        Error::config(format!("malformed charset candidate '{entry}' for {encoding}"))
    })?;
    let name = caps
        .get(5)
        .map(|m| m.as_str())
        .ok_or_else(|| Error::config(format!("candidate '{entry}' has no charset")))?;
    let (charset, _) = charsets
        .get_key_value(name)
        .ok_or_else(|| Error::config(format!("candidate '{entry}' names unknown charset")))?;
    let min_version = match (caps.get(2), caps.get(3), caps.get(4)) {
        (Some(major), Some(minor), Some(patch)) => {
            let part = |m: regex::Match<'_>| -> Result<u16> {
                m.as_str()
                    .parse()
                    .map_err(|_| Error::config(format!("bad version in candidate '{entry}'")))
            };
            Some(ServerVersion::new(part(major)?, part(minor)?, part(patch)?))
        }
        _ => None,
    };
    Ok(CharsetCandidate {
        charset,
        min_version,
        preferred: caps.get(1).is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> &'static CharsetCatalog {
        CharsetCatalog::global().unwrap()
    }

    #[test]
    fn test_every_id_resolves_to_three_names() {
        let catalog = catalog();
        for id in 1..=MAX_COLLATION_ID {
            let entry = catalog.lookup_by_index(id).unwrap();
            assert_eq!(entry.id, id);
            assert!(!entry.collation.is_empty(), "collation for {id}");
            assert!(!entry.charset.is_empty(), "charset for {id}");
            assert!(!entry.encoding.is_empty(), "encoding for {id}");
        }
    }

    #[test]
    fn test_out_of_range_ids() {
        assert!(matches!(catalog().lookup_by_index(0), Err(Error::Config(_))));
        assert!(matches!(catalog().lookup_by_index(256), Err(Error::Config(_))));
    }

    #[test]
    fn test_well_known_ids() {
        let catalog = catalog();
        let latin1 = catalog.lookup_by_index(8).unwrap();
        assert_eq!(latin1.collation, "latin1_swedish_ci");
        assert_eq!(latin1.encoding, "Cp1252");

        let mb4 = catalog.lookup_by_index(45).unwrap();
        assert_eq!(mb4.charset, "utf8mb4");
        assert_eq!(mb4.max_bytes_per_char, 4);

        assert_eq!(catalog.lookup_by_index(192).unwrap().collation, "utf8_unicode_ci");
        assert_eq!(
            catalog.lookup_by_index(247).unwrap().collation,
            "utf8mb4_vietnamese_ci"
        );
        assert_eq!(catalog.lookup_by_index(63).unwrap().charset, "binary");
    }

    #[test]
    fn test_unassigned_ids_are_placeholders() {
        let entry = catalog().lookup_by_index(17).unwrap();
        assert_eq!(entry.collation, NOT_IMPLEMENTED);
        assert_eq!(entry.encoding, "ISO8859_1");
        assert_eq!(catalog().lookup_by_collation_name(NOT_IMPLEMENTED), None);
    }

    #[test]
    fn test_best_effort_encodings_are_kept() {
        let catalog = catalog();
        assert_eq!(catalog.encoding_for_server_charset("keybcs2"), Some("Cp852"));
        assert_eq!(catalog.encoding_for_server_charset("koi8u"), Some("KOI8_R"));
        assert_eq!(catalog.encoding_for_server_charset("dec8"), Some("ISO8859_1"));
        assert_eq!(catalog.encoding_for_index(3).unwrap(), "ISO8859_1");
    }

    #[test]
    fn test_resolve_utf8_by_version() {
        let catalog = catalog();
        assert_eq!(
            catalog.resolve_server_charset("UTF-8", Some(ServerVersion::new(5, 5, 3))),
            Some("utf8mb4")
        );
        assert_eq!(
            catalog.resolve_server_charset("UTF-8", Some(ServerVersion::new(5, 0, 0))),
            Some("utf8")
        );
        assert_eq!(catalog.resolve_server_charset("UTF-8", None), Some("utf8"));
        assert_eq!(catalog.resolve_server_charset("utf-8", None), Some("utf8"));
    }

    #[test]
    fn test_resolve_matches_declared_table() {
        let catalog = catalog();
        for &(encoding, specs) in ENCODING_CANDIDATES {
            let list = catalog.candidates(encoding).unwrap();
            assert_eq!(list.len(), specs.len());
            // versions never decrease along the list
            assert!(list.windows(2).all(|w| w[0].min_version <= w[1].min_version));
            // a preferred ungated candidate always wins once a version is known
            if let Some(pref) = list.iter().find(|c| c.preferred && c.min_version.is_none()) {
                assert_eq!(
                    catalog.resolve_server_charset(encoding, Some(ServerVersion::new(4, 0, 0))),
                    Some(pref.charset)
                );
            }
        }
        assert_eq!(
            catalog.resolve_server_charset("WINDOWS-31J", Some(ServerVersion::new(4, 1, 10))),
            Some("sjis")
        );
        assert_eq!(
            catalog.resolve_server_charset("WINDOWS-31J", Some(ServerVersion::new(5, 7, 0))),
            Some("cp932")
        );
        assert_eq!(
            catalog.resolve_server_charset("UTF-16LE", Some(ServerVersion::new(5, 5, 0))),
            None
        );
        assert_eq!(catalog.resolve_server_charset("EBCDIC", None), None);
    }

    #[test]
    fn test_multibyte_membership() {
        let catalog = catalog();
        assert!(catalog.is_multibyte("UTF-8"));
        assert!(catalog.is_multibyte("sjis"));
        assert!(!catalog.is_multibyte("ISO8859_1"));
        assert!(!catalog.is_multibyte("Cp1252"));
    }

    #[test]
    fn test_reverse_lookup_and_widths() {
        let catalog = catalog();
        assert_eq!(catalog.lookup_by_collation_name("UTF8MB4_0900_AI_CI"), Some(255));
        assert_eq!(catalog.lookup_by_collation_name("utf16_unicode_ci"), Some(101));
        assert_eq!(catalog.max_bytes_per_char("ujis"), Some(3));
        assert_eq!(catalog.max_bytes_per_char("nope"), None);
    }

    #[test]
    fn test_string_conversion_through_catalog() {
        let catalog = catalog();
        let encoding = catalog.encoding_for_index(8).unwrap();
        assert_eq!(catalog.decode_str(encoding, &[0x80]).unwrap(), "\u{20AC}");
        assert_eq!(catalog.encode_str("UTF-8", "ok").unwrap(), b"ok".to_vec());
    }
}
