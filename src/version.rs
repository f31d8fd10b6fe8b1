use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VersionParsingError {
    /// The version input was malformed
    #[error("input '{input}' malformed as a version")]
    MalformedVersion { input: String },

    /// The parts of the version were not numbers
    #[error("parts of version '{input}' were not numbers")]
    ParseError {
        input: String,
        source: std::num::ParseIntError,
    },
}

/// A `major.minor` protocol version, compared numerically.
#[derive(
    Clone, Debug, Deserialize, Eq, PartialEq, PartialOrd, Ord, Serialize,
)]
pub struct Version {
    major: u32,
    minor: u32,
}

impl Version {
    /// Create a new Version with the given major and minor version numbers.
    pub const fn new(major: u32, minor: u32) -> Self {
        Version { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = VersionParsingError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = input.split('.');
        match (parts.next(), parts.next()) {
            (Some(major), Some(minor)) => Ok(Version {
                major: major.parse().map_err(|e| {
                    VersionParsingError::ParseError {
                        input: input.to_string(),
                        source: e,
                    }
                })?,
                minor: minor.parse().map_err(|e| {
                    VersionParsingError::ParseError {
                        input: input.to_string(),
                        source: e,
                    }
                })?,
            }),
            _ => Err(VersionParsingError::MalformedVersion {
                input: input.to_string(),
            }),
        }
    }
}

impl TryFrom<&str> for Version {
    type Error = VersionParsingError;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        Version::from_str(input)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionParsingError;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        Version::from_str(input.as_str())
    }
}

/// API behavior variants, one per protocol version this client implements.
///
/// The variant is selected from the configured version string through a fixed
/// lookup table; version strings outside the table are rejected.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ApiVersion {
    V05,
    V06,
}

impl ApiVersion {
    const TABLE: &'static [(&'static str, ApiVersion)] =
        &[("0.5", ApiVersion::V05), ("0.6", ApiVersion::V06)];

    /// Look up the variant for a version string.
    ///
    /// # Arguments
    ///
    /// * `version` the configured version string, e.g. `"0.6"`
    ///
    /// # Returns
    ///
    /// The matching variant, or `None` if the version is not implemented
    pub fn from_version_str(version: &str) -> Option<ApiVersion> {
        ApiVersion::TABLE
            .iter()
            .find(|(s, _)| *s == version)
            .map(|(_, api)| *api)
    }

    /// The version string this variant speaks.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V05 => "0.5",
            ApiVersion::V06 => "0.6",
        }
    }

    /// Numeric form, for range comparisons.
    pub fn version(&self) -> Version {
        match self {
            ApiVersion::V05 => Version::new(0, 5),
            ApiVersion::V06 => Version::new(0, 6),
        }
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        ApiVersion::V06
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
