// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 OSM Client Authors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("Capabilities error: {0}")]
    Capabilities(#[from] crate::capabilities::CapabilityError),
    #[error("Password file error: {0}")]
    PasswordFile(#[from] crate::passwordfile::PasswordFileError),
    #[error("Transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),
    #[error("Version parsing error: {0}")]
    VersionParsing(#[from] crate::version::VersionParsingError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::version::Version;
    use std::str::FromStr;

    #[test]
    fn test_conversions() {
        let e: Error = ConfigError::UnknownKey("bogus".to_string()).into();
        assert!(matches!(e, Error::Config(_)));

        let e: Error = Version::from_str("not-a-version").unwrap_err().into();
        assert!(matches!(e, Error::VersionParsing(_)));
    }

    #[test]
    fn test_display_carries_cause() {
        let e: Error = ConfigError::UnknownKey("bogus".to_string()).into();
        let s = e.to_string();
        assert!(s.contains("bogus"), "unexpected message: {s}");
    }
}
