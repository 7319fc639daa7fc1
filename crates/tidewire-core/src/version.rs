//! Server version triples.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::Error;

static VERSION_RE: LazyLock<Result<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\.(\d+)(?:\.(\d+))?").map_err(|e| Error::config(e.to_string()))
});

/// A `major.minor.patch` server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ServerVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl ServerVersion {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the leading version triple of a server version string.
    ///
    /// Vendor suffixes are ignored: `8.0.33-0ubuntu0.22.04.2` parses as 8.0.33,
    /// `5.5.5-10.6.12-MariaDB` as 5.5.5.
    pub fn parse(text: &str) -> Result<Self> {
        let re = VERSION_RE
            .as_ref()
            .map_err(|e| Error::config(e.to_string()))?;
        let caps = re
            .captures(text)
            .ok_or_else(|| Error::config(format!("unrecognized server version '{text}'")))?;
        let part = |i: usize| -> Result<u16> {
            caps.get(i).map_or(Ok(0), |m| {
                m.as_str()
                    .parse()
                    .map_err(|_| Error::config(format!("version component out of range in '{text}'")))
            })
        };
        Ok(Self::new(part(1)?, part(2)?, part(3)?))
    }

    /// Check that this version is at least `major.minor.patch`.
    pub fn meets_minimum(&self, minimum: ServerVersion) -> bool {
        *self >= minimum
    }
}

impl From<(u16, u16, u16)> for ServerVersion {
    fn from((major, minor, patch): (u16, u16, u16)) -> Self {
        Self::new(major, minor, patch)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
