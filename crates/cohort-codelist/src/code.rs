//! Clinical codes and coding systems

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Coding system a clinical code belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CodingSystem {
    /// SNOMED CT
    Snomed,
    /// Clinical Terms Version 3 (Read v3)
    Ctv3,
    /// Read version 2
    Read,
    /// ICD-10
    Icd10,
    /// OPCS-4 procedures
    Opcs4,
    /// Dictionary of medicines and devices
    Dmd,
    /// Any other system, kept verbatim
    Other(String),
}

impl CodingSystem {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Snomed => "snomed",
            Self::Ctv3 => "ctv3",
            Self::Read => "read",
            Self::Icd10 => "icd10",
            Self::Opcs4 => "opcs4",
            Self::Dmd => "dmd",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for CodingSystem {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "snomed" | "snomedct" => Self::Snomed,
            "ctv3" => Self::Ctv3,
            "read" | "readv2" => Self::Read,
            "icd10" => Self::Icd10,
            "opcs4" => Self::Opcs4,
            "dmd" => Self::Dmd,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for CodingSystem {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(system) => system,
            Err(never) => match never {},
        }
    }
}

impl From<CodingSystem> for String {
    fn from(value: CodingSystem) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CodingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A clinical code, identified by its value and coding system
///
/// Two codes are the same term only if both the value and the system match:
/// `"22K5"` in CTV3 and `"22K5"` in Read v2 are distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Code {
    /// Coding system
    pub system: CodingSystem,
    /// Code value
    pub code: String,
}

impl Code {
    /// Create a new code
    pub fn new(system: CodingSystem, code: impl Into<String>) -> Self {
        Self {
            system,
            code: code.into(),
        }
    }

    pub fn snomed(code: impl Into<String>) -> Self {
        Self::new(CodingSystem::Snomed, code)
    }

    pub fn ctv3(code: impl Into<String>) -> Self {
        Self::new(CodingSystem::Ctv3, code)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.system, self.code)
    }
}
