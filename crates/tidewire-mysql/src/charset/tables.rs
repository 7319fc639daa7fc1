//! Compiled-in charset and collation data.
//!
//! The catalog validates all of this once at load; nothing here is read
//! directly by other modules.

/// Highest collation id the catalog covers.
pub(crate) const MAX_COLLATION_ID: u16 = 255;

/// Placeholder name for ids no server release assigns.
pub(crate) const NOT_IMPLEMENTED: &str = "not_implemented";

/// Server charset: (name, max bytes per char, client encoding, best-effort).
///
/// Best-effort entries have no exact client converter; the encoding named is
/// the closest one and is applied silently.
pub(crate) const CHARSETS: &[(&str, u8, &str, bool)] = &[
    ("big5", 2, "Big5", false),
    ("dec8", 1, "ISO8859_1", true),
    ("cp850", 1, "Cp850", false),
    ("hp8", 1, "ISO8859_1", true),
    ("koi8r", 1, "KOI8_R", false),
    ("latin1", 1, "Cp1252", false),
    ("latin2", 1, "ISO8859_2", false),
    ("swe7", 1, "ISO8859_1", true),
    ("ascii", 1, "US-ASCII", false),
    ("ujis", 3, "EUC_JP", false),
    ("sjis", 2, "SJIS", false),
    ("hebrew", 1, "ISO8859_8", false),
    ("tis620", 1, "TIS620", false),
    ("euckr", 2, "EUC_KR", false),
    ("koi8u", 1, "KOI8_R", true),
    ("gb2312", 2, "EUC_CN", false),
    ("greek", 1, "ISO8859_7", false),
    ("cp1250", 1, "Cp1250", false),
    ("gbk", 2, "GBK", false),
    ("latin5", 1, "ISO8859_9", false),
    ("armscii8", 1, "ISO8859_1", true),
    ("utf8", 3, "UTF-8", false),
    ("ucs2", 2, "UnicodeBig", false),
    ("cp866", 1, "Cp866", false),
    ("keybcs2", 1, "Cp852", true),
    ("macce", 1, "MacCentralEurope", false),
    ("macroman", 1, "MacRoman", false),
    ("cp852", 1, "Cp852", false),
    ("latin7", 1, "ISO8859_13", false),
    ("utf8mb4", 4, "UTF-8", false),
    ("cp1251", 1, "Cp1251", false),
    ("utf16", 4, "UTF-16", false),
    ("utf16le", 4, "UTF-16LE", false),
    ("cp1256", 1, "Cp1256", false),
    ("cp1257", 1, "Cp1257", false),
    ("utf32", 4, "UTF-32", false),
    ("binary", 1, "ISO8859_1", false),
    ("geostd8", 1, "ISO8859_1", true),
    ("cp932", 2, "WINDOWS-31J", false),
    ("eucjpms", 3, "EUC_JP_Solaris", false),
    ("gb18030", 4, "GB18030", false),
    (NOT_IMPLEMENTED, 1, "ISO8859_1", true),
];

/// Individually assigned collations: (id, collation, server charset).
pub(crate) const COLLATIONS: &[(u16, &str, &str)] = &[
    (1, "big5_chinese_ci", "big5"),
    (2, "latin2_czech_cs", "latin2"),
    (3, "dec8_swedish_ci", "dec8"),
    (4, "cp850_general_ci", "cp850"),
    (5, "latin1_german1_ci", "latin1"),
    (6, "hp8_english_ci", "hp8"),
    (7, "koi8r_general_ci", "koi8r"),
    (8, "latin1_swedish_ci", "latin1"),
    (9, "latin2_general_ci", "latin2"),
    (10, "swe7_swedish_ci", "swe7"),
    (11, "ascii_general_ci", "ascii"),
    (12, "ujis_japanese_ci", "ujis"),
    (13, "sjis_japanese_ci", "sjis"),
    (14, "cp1251_bulgarian_ci", "cp1251"),
    (15, "latin1_danish_ci", "latin1"),
    (16, "hebrew_general_ci", "hebrew"),
    (18, "tis620_thai_ci", "tis620"),
    (19, "euckr_korean_ci", "euckr"),
    (20, "latin7_estonian_cs", "latin7"),
    (21, "latin2_hungarian_ci", "latin2"),
    (22, "koi8u_general_ci", "koi8u"),
    (23, "cp1251_ukrainian_ci", "cp1251"),
    (24, "gb2312_chinese_ci", "gb2312"),
    (25, "greek_general_ci", "greek"),
    (26, "cp1250_general_ci", "cp1250"),
    (27, "latin2_croatian_ci", "latin2"),
    (28, "gbk_chinese_ci", "gbk"),
    (29, "cp1257_lithuanian_ci", "cp1257"),
    (30, "latin5_turkish_ci", "latin5"),
    (31, "latin1_german2_ci", "latin1"),
    (32, "armscii8_general_ci", "armscii8"),
    (33, "utf8_general_ci", "utf8"),
    (34, "cp1250_czech_cs", "cp1250"),
    (35, "ucs2_general_ci", "ucs2"),
    (36, "cp866_general_ci", "cp866"),
    (37, "keybcs2_general_ci", "keybcs2"),
    (38, "macce_general_ci", "macce"),
    (39, "macroman_general_ci", "macroman"),
    (40, "cp852_general_ci", "cp852"),
    (41, "latin7_general_ci", "latin7"),
    (42, "latin7_general_cs", "latin7"),
    (43, "macce_bin", "macce"),
    (44, "cp1250_croatian_ci", "cp1250"),
    (45, "utf8mb4_general_ci", "utf8mb4"),
    (46, "utf8mb4_bin", "utf8mb4"),
    (47, "latin1_bin", "latin1"),
    (48, "latin1_general_ci", "latin1"),
    (49, "latin1_general_cs", "latin1"),
    (50, "cp1251_bin", "cp1251"),
    (51, "cp1251_general_ci", "cp1251"),
    (52, "cp1251_general_cs", "cp1251"),
    (53, "macroman_bin", "macroman"),
    (54, "utf16_general_ci", "utf16"),
    (55, "utf16_bin", "utf16"),
    (56, "utf16le_general_ci", "utf16le"),
    (57, "cp1256_general_ci", "cp1256"),
    (58, "cp1257_bin", "cp1257"),
    (59, "cp1257_general_ci", "cp1257"),
    (60, "utf32_general_ci", "utf32"),
    (61, "utf32_bin", "utf32"),
    (62, "utf16le_bin", "utf16le"),
    (63, "binary", "binary"),
    (64, "armscii8_bin", "armscii8"),
    (65, "ascii_bin", "ascii"),
    (66, "cp1250_bin", "cp1250"),
    (67, "cp1256_bin", "cp1256"),
    (68, "cp866_bin", "cp866"),
    (69, "dec8_bin", "dec8"),
    (70, "greek_bin", "greek"),
    (71, "hebrew_bin", "hebrew"),
    (72, "hp8_bin", "hp8"),
    (73, "keybcs2_bin", "keybcs2"),
    (74, "koi8r_bin", "koi8r"),
    (75, "koi8u_bin", "koi8u"),
    (76, "utf8_tolower_ci", "utf8"),
    (77, "latin2_bin", "latin2"),
    (78, "latin5_bin", "latin5"),
    (79, "latin7_bin", "latin7"),
    (80, "cp850_bin", "cp850"),
    (81, "cp852_bin", "cp852"),
    (82, "swe7_bin", "swe7"),
    (83, "utf8_bin", "utf8"),
    (84, "big5_bin", "big5"),
    (85, "euckr_bin", "euckr"),
    (86, "gb2312_bin", "gb2312"),
    (87, "gbk_bin", "gbk"),
    (88, "sjis_bin", "sjis"),
    (89, "tis620_bin", "tis620"),
    (90, "ucs2_bin", "ucs2"),
    (91, "ujis_bin", "ujis"),
    (92, "geostd8_general_ci", "geostd8"),
    (93, "geostd8_bin", "geostd8"),
    (94, "latin1_spanish_ci", "latin1"),
    (95, "cp932_japanese_ci", "cp932"),
    (96, "cp932_bin", "cp932"),
    (97, "eucjpms_japanese_ci", "eucjpms"),
    (98, "eucjpms_bin", "eucjpms"),
    (99, "cp1250_polish_ci", "cp1250"),
    (159, "ucs2_general_mysql500_ci", "ucs2"),
    (223, "utf8_general_mysql500_ci", "utf8"),
    (248, "gb18030_chinese_ci", "gb18030"),
    (249, "gb18030_bin", "gb18030"),
    (250, "gb18030_unicode_520_ci", "gb18030"),
    (255, "utf8mb4_0900_ai_ci", "utf8mb4"),
];

/// Unicode charsets get one collation per language, in this order, starting
/// at the family's base id.
pub(crate) const UNICODE_LANGUAGES: &[&str] = &[
    "unicode",
    "icelandic",
    "latvian",
    "romanian",
    "slovenian",
    "polish",
    "estonian",
    "spanish",
    "swedish",
    "turkish",
    "czech",
    "danish",
    "lithuanian",
    "slovak",
    "spanish2",
    "roman",
    "persian",
    "esperanto",
    "hungarian",
    "sinhala",
    "german2",
    "croatian",
    "unicode_520",
    "vietnamese",
];

/// (base id, server charset) for each unicode collation family.
pub(crate) const UNICODE_FAMILIES: &[(u16, &str)] = &[
    (101, "utf16"),
    (128, "ucs2"),
    (160, "utf32"),
    (192, "utf8"),
    (224, "utf8mb4"),
];

/// Client encoding to candidate server charsets.
///
/// Candidate syntax: `[*][>major.minor.patch ]charset`. A leading `*` marks
/// the preferred candidate; `>x.y.z` is the minimum server version.
pub(crate) const ENCODING_CANDIDATES: &[(&str, &[&str])] = &[
    ("US-ASCII", &["ascii"]),
    ("ASCII", &["ascii"]),
    ("BIG5", &["big5"]),
    ("GBK", &["gbk"]),
    ("GB2312", &["gb2312"]),
    ("EUC_CN", &["gb2312"]),
    ("GB18030", &[">5.7.4 gb18030"]),
    ("SJIS", &["sjis"]),
    ("MS932", &["sjis", "*>4.1.11 cp932"]),
    ("WINDOWS-31J", &["sjis", "*>4.1.11 cp932"]),
    ("CP932", &["sjis", "*>4.1.11 cp932"]),
    ("EUC_JP", &["ujis"]),
    ("EUC_JP_SOLARIS", &["ujis", "*>5.0.3 eucjpms"]),
    ("EUC_KR", &["euckr"]),
    ("ISO8859_1", &["*latin1"]),
    ("CP1252", &["latin1"]),
    ("ISO8859_2", &["latin2"]),
    ("ISO8859_7", &["greek"]),
    ("ISO8859_8", &["hebrew"]),
    ("ISO8859_9", &["latin5"]),
    ("ISO8859_13", &["latin7"]),
    ("KOI8_R", &["koi8r"]),
    ("TIS620", &["tis620"]),
    ("CP850", &["cp850"]),
    ("CP852", &["cp852"]),
    ("CP866", &["cp866"]),
    ("CP1250", &["cp1250"]),
    ("CP1251", &["cp1251"]),
    ("CP1256", &["cp1256"]),
    ("CP1257", &["cp1257"]),
    ("MACROMAN", &["macroman"]),
    ("MACCENTRALEUROPE", &["macce"]),
    ("UTF-8", &["utf8", "*>5.5.2 utf8mb4"]),
    ("UTF8", &["utf8", "*>5.5.2 utf8mb4"]),
    ("UNICODEBIG", &["ucs2"]),
    ("UTF-16", &[">5.5.2 utf16"]),
    ("UTF-16LE", &[">5.6.0 utf16le"]),
    ("UTF-32", &[">5.5.2 utf32"]),
];

/// Client encodings whose characters may span more than one byte.
pub(crate) const MULTIBYTE_ENCODINGS: &[&str] = &[
    "BIG5",
    "GBK",
    "GB2312",
    "GB18030",
    "SJIS",
    "MS932",
    "CP932",
    "WINDOWS-31J",
    "EUC_CN",
    "EUC_JP",
    "EUC_JP_SOLARIS",
    "EUC_KR",
    "EUC_TW",
    "CP949",
    "MS949",
    "UTF-8",
    "UTF8",
    "UNICODEBIG",
    "UTF-16",
    "UTF-16BE",
    "UTF-16LE",
    "UTF-32",
];
