// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 OSM Client Authors

use crate::capabilities::{Capabilities, CapabilityError};
use crate::passwordfile::{self, Credentials, PasswordFileError};
use crate::transport::{HttpTransport, Transport, TransportError};
use crate::version::{ApiVersion, Version};
use log::*;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Server the store points at until told otherwise.
pub const DEFAULT_SERVER: &str = "https://api.openstreetmap.org";

/// API version spoken until told otherwise.
pub const DEFAULT_API_VERSION: &str = "0.6";

const DEFAULT_ADAPTER: &str = "http";

#[derive(Error, Debug)]
pub enum ConfigError {
    /// The key is not in the recognized set
    #[error("unknown config parameter '{0}'")]
    UnknownKey(String),

    /// The key expects a different value type
    #[error("config parameter '{key}' expects a {expected} value")]
    InvalidValue {
        key: ConfigKey,
        expected: &'static str,
    },

    /// The capability fetch failed at the transport level
    #[error("could not get a valid response from '{url}'")]
    ServerUnreachable {
        url: String,
        source: TransportError,
    },

    /// The capabilities document could not be parsed
    #[error("problem checking server capabilities")]
    CapabilityParse(#[from] CapabilityError),

    /// The configured API version is not supported
    #[error("API version {configured} not supported")]
    UnsupportedApiVersion { configured: String },

    /// The password file could not be read
    #[error("password file error")]
    PasswordFile(#[from] PasswordFileError),
}

/// The closed set of recognized configuration keys.
///
/// The settings map always holds exactly these keys; mutation through any
/// other name fails with [`ConfigError::UnknownKey`].
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ConfigKey {
    Adapter,
    ApiVersion,
    Password,
    Passwordfile,
    Server,
    UserAgent,
    User,
    Verbose,
}

impl ConfigKey {
    /// Every recognized key.
    pub const ALL: [ConfigKey; 8] = [
        ConfigKey::Adapter,
        ConfigKey::ApiVersion,
        ConfigKey::Password,
        ConfigKey::Passwordfile,
        ConfigKey::Server,
        ConfigKey::UserAgent,
        ConfigKey::User,
        ConfigKey::Verbose,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Adapter => "adapter",
            ConfigKey::ApiVersion => "api_version",
            ConfigKey::Password => "password",
            ConfigKey::Passwordfile => "passwordfile",
            ConfigKey::Server => "server",
            ConfigKey::UserAgent => "User-Agent",
            ConfigKey::User => "user",
            ConfigKey::Verbose => "verbose",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, ConfigError> {
        match name {
            "adapter" => Ok(ConfigKey::Adapter),
            "api_version" => Ok(ConfigKey::ApiVersion),
            "password" => Ok(ConfigKey::Password),
            "passwordfile" => Ok(ConfigKey::Passwordfile),
            "server" => Ok(ConfigKey::Server),
            "User-Agent" => Ok(ConfigKey::UserAgent),
            "user" => Ok(ConfigKey::User),
            "verbose" => Ok(ConfigKey::Verbose),
            other => Err(ConfigError::UnknownKey(other.to_string())),
        }
    }
}

/// A configuration value. Every key holds a string except `verbose`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    Str(String),
    Bool(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Str(_) => None,
            Value::Bool(b) => Some(*b),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Connection settings and negotiated capabilities for an OSM API server.
///
/// The store owns a settings map over the fixed [`ConfigKey`] set plus the
/// capability fields derived from the most recent successful negotiation.
/// Mutations that touch `server` or `passwordfile` perform their I/O inline
/// through the injected [`Transport`] or the file system; the `&mut self`
/// receivers serialize access, there is no internal locking.
pub struct ConfigStore {
    settings: BTreeMap<ConfigKey, Option<Value>>,
    api_version: Version,
    api: ApiVersion,
    capabilities: Option<Capabilities>,
    transport: Arc<dyn Transport>,
}

impl ConfigStore {
    /// Create a store with default settings and the reqwest-backed transport.
    pub fn new() -> Self {
        Self::with_transport(Arc::new(HttpTransport::new()))
    }

    /// Create a store with default settings, performing network I/O through
    /// the given transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        let settings = BTreeMap::from([
            (ConfigKey::Adapter, Some(Value::from(DEFAULT_ADAPTER))),
            (
                ConfigKey::ApiVersion,
                Some(Value::from(DEFAULT_API_VERSION)),
            ),
            (ConfigKey::Password, None),
            (ConfigKey::Passwordfile, None),
            (ConfigKey::Server, Some(Value::from(DEFAULT_SERVER))),
            (
                ConfigKey::UserAgent,
                Some(Value::from(crate::transport::DEFAULT_USER_AGENT)),
            ),
            (ConfigKey::User, None),
            (ConfigKey::Verbose, Some(Value::Bool(false))),
        ]);

        Self {
            settings,
            api_version: Version::new(0, 6),
            api: ApiVersion::V06,
            capabilities: None,
            transport,
        }
    }

    /// Get the value of a configuration setting.
    ///
    /// # Arguments
    ///
    /// * `name` one of the recognized key names
    ///
    /// # Returns
    ///
    /// The stored value, `None` if the key is recognized but unset, or
    /// [`ConfigError::UnknownKey`] otherwise. No side effects.
    pub fn get_value(&self, name: &str) -> Result<Option<Value>, ConfigError> {
        let key: ConfigKey = name.parse()?;
        Ok(self.settings.get(&key).cloned().flatten())
    }

    /// Full read-only copy of the settings map.
    ///
    /// Mutating the returned map does not affect the store.
    pub fn snapshot(&self) -> BTreeMap<ConfigKey, Option<Value>> {
        self.settings.clone()
    }

    /// Set a single configuration setting.
    ///
    /// `passwordfile` and `api_version` get their side-effecting handling
    /// with the supplied value. `server` re-validates the currently stored
    /// server instead; changing the server goes through [`Self::set_values`]
    /// or [`Self::set_server`].
    ///
    /// Returns the store for fluent chaining.
    pub async fn set_value(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self, ConfigError> {
        let key: ConfigKey = name.parse()?;
        let value = value.into();
        match key {
            ConfigKey::Server => {
                // the supplied value is intentionally not committed here; it
                // would bypass the capability check on failure
                if let Some(current) = self.configured_server() {
                    self.set_server(&current).await?;
                }
            }
            ConfigKey::Passwordfile => {
                let path = expect_str(key, &value)?;
                self.set_passwordfile(&path)?;
            }
            ConfigKey::ApiVersion => {
                let version = expect_str(key, &value)?;
                self.apply_api_version(&version)?;
            }
            _ => {
                self.settings.insert(key, Some(value));
            }
        }
        Ok(self)
    }

    /// Set several configuration settings at once.
    ///
    /// `adapter` is applied before everything else when present, since keys
    /// processed later may fetch through the transport it names. The rest of
    /// the batch is applied key-by-key in the supplied order with the same
    /// per-key handling as [`Self::set_value`], except that `server` takes
    /// the supplied value here. The batch stops at the first failure; writes
    /// applied before the failing key remain applied.
    pub async fn set_values(
        &mut self,
        values: &[(&str, Value)],
    ) -> Result<&mut Self, ConfigError> {
        if let Some((_, adapter)) = values
            .iter()
            .find(|(name, _)| *name == ConfigKey::Adapter.as_str())
        {
            self.settings
                .insert(ConfigKey::Adapter, Some(adapter.clone()));
        }

        for (name, value) in values {
            let key: ConfigKey = name.parse()?;
            match key {
                ConfigKey::Server => {
                    let url = expect_str(key, value)?;
                    self.set_server(&url).await?;
                }
                ConfigKey::Passwordfile => {
                    let path = expect_str(key, value)?;
                    self.set_passwordfile(&path)?;
                }
                ConfigKey::ApiVersion => {
                    let version = expect_str(key, value)?;
                    self.apply_api_version(&version)?;
                }
                _ => {
                    self.settings.insert(key, Some(value.clone()));
                }
            }
        }
        Ok(self)
    }

    /// Point the store at a server, negotiating capabilities with it.
    ///
    /// Fetches `<server>/api/capabilities` through the transport and parses
    /// the advertised capability document. The configured API version must
    /// fall within the advertised `minimum`..`maximum` range. Nothing is
    /// committed until every check passes: on failure the previous server
    /// value and capability fields stay in place.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::ServerUnreachable`] if the fetch fails
    /// * [`ConfigError::CapabilityParse`] if the document is malformed
    /// * [`ConfigError::UnsupportedApiVersion`] if the version range
    ///   excludes the configured API version, or no range was advertised
    pub async fn set_server(
        &mut self,
        server: &str,
    ) -> Result<&mut Self, ConfigError> {
        let url = format!("{server}/api/capabilities");
        info!("Requesting server capabilities from {url}");

        let body = self.transport.fetch(&url).await.map_err(|e| {
            warn!("could not reach '{url}': {e}");
            ConfigError::ServerUnreachable { url: url.clone(), source: e }
        })?;

        let capabilities = Capabilities::from_xml(&body)?;
        self.check_version(&capabilities)?;

        debug!("negotiated capabilities for '{server}': {capabilities:?}");
        self.capabilities = Some(capabilities);
        self.settings
            .insert(ConfigKey::Server, Some(Value::from(server)));
        Ok(self)
    }

    /// Resolve credentials from a password file.
    ///
    /// An empty path is a no-op. Otherwise the file is read and the line
    /// conventions of [`passwordfile::extract_credentials`] decide which of
    /// `user` and `password` are updated; the path itself is stored whether
    /// or not any credential was extracted.
    pub fn set_passwordfile(
        &mut self,
        path: &str,
    ) -> Result<&mut Self, ConfigError> {
        if path.is_empty() {
            return Ok(self);
        }

        let current_user = self
            .settings
            .get(&ConfigKey::User)
            .cloned()
            .flatten()
            .and_then(|v| v.as_str().map(str::to_string));

        let credentials =
            passwordfile::read_credentials(path, current_user.as_deref())?;

        match credentials {
            Some(Credentials::Pair { user, password }) => {
                self.settings
                    .insert(ConfigKey::User, Some(Value::from(user)));
                self.settings
                    .insert(ConfigKey::Password, Some(Value::from(password)));
            }
            Some(Credentials::PasswordOnly(password)) => {
                self.settings
                    .insert(ConfigKey::Password, Some(Value::from(password)));
            }
            None => {
                debug!("no credentials extracted from '{path}'");
            }
        }

        self.settings
            .insert(ConfigKey::Passwordfile, Some(Value::from(path)));
        Ok(self)
    }

    /// Replace the transport used for capability fetches.
    pub fn set_transport(&mut self, transport: Arc<dyn Transport>) -> &mut Self {
        self.transport = transport;
        self
    }

    /// The transport used for capability fetches.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// The configured API version.
    pub fn api_version(&self) -> &Version {
        &self.api_version
    }

    /// The API behavior variant selected by the configured version.
    pub fn api(&self) -> ApiVersion {
        self.api
    }

    /// Capabilities from the most recent successful negotiation, if any.
    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.capabilities.as_ref()
    }

    /// Minimum API version supported by the connected server.
    pub fn min_version(&self) -> Option<Version> {
        self.capabilities.as_ref().and_then(|c| c.min_version.clone())
    }

    /// Maximum API version supported by the connected server.
    pub fn max_version(&self) -> Option<Version> {
        self.capabilities.as_ref().and_then(|c| c.max_version.clone())
    }

    /// Seconds before the connected server considers a request timed out.
    pub fn timeout(&self) -> Option<u32> {
        self.capabilities.as_ref().and_then(|c| c.timeout_seconds)
    }

    /// Elements allowed per changeset.
    pub fn max_elements(&self) -> Option<u32> {
        self.capabilities
            .as_ref()
            .and_then(|c| c.max_changeset_elements)
    }

    /// Nodes allowed per way. Anything longer must be split.
    pub fn max_nodes(&self) -> Option<u32> {
        self.capabilities.as_ref().and_then(|c| c.max_way_nodes)
    }

    /// Tracepoints returned per page.
    pub fn tracepoints_per_page(&self) -> Option<u32> {
        self.capabilities
            .as_ref()
            .and_then(|c| c.tracepoints_per_page)
    }

    /// Largest area downloadable in one request.
    pub fn max_area(&self) -> Option<f64> {
        self.capabilities.as_ref().and_then(|c| c.max_area)
    }

    fn configured_server(&self) -> Option<String> {
        self.settings
            .get(&ConfigKey::Server)
            .cloned()
            .flatten()
            .and_then(|v| v.as_str().map(str::to_string))
    }

    fn apply_api_version(&mut self, version: &str) -> Result<(), ConfigError> {
        let api = ApiVersion::from_version_str(version).ok_or_else(|| {
            ConfigError::UnsupportedApiVersion {
                configured: version.to_string(),
            }
        })?;

        self.settings
            .insert(ConfigKey::ApiVersion, Some(Value::from(version)));
        self.api_version = api.version();
        self.api = api;
        Ok(())
    }

    fn check_version(
        &self,
        capabilities: &Capabilities,
    ) -> Result<(), ConfigError> {
        let (Some(min), Some(max)) =
            (&capabilities.min_version, &capabilities.max_version)
        else {
            warn!("server did not advertise a supported version range");
            return Err(self.unsupported());
        };

        if *min > self.api_version || self.api_version > *max {
            warn!(
                "API version {} outside advertised range {min}..{max}",
                self.api_version
            );
            return Err(self.unsupported());
        }
        Ok(())
    }

    fn unsupported(&self) -> ConfigError {
        ConfigError::UnsupportedApiVersion {
            configured: self.api_version.to_string(),
        }
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

fn expect_str(key: ConfigKey, value: &Value) -> Result<String, ConfigError> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        Value::Bool(_) => Err(ConfigError::InvalidValue {
            key,
            expected: "string",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CAPABILITIES_05_07: &str = r#"<?xml version="1.0"?>
<osm version="0.6" generator="OpenStreetMap server">
  <api>
    <version minimum="0.5" maximum="0.7"/>
    <area maximum="0.25"/>
    <tracepoints per_page="5000"/>
    <waynodes maximum="2000"/>
    <changesets maximum_elements="50000"/>
    <timeout seconds="300"/>
  </api>
</osm>"#;

    const CAPABILITIES_07_09: &str = r#"<osm>
  <api><version minimum="0.7" maximum="0.9"/></api>
</osm>"#;

    struct StaticTransport {
        body: &'static str,
    }

    #[async_trait::async_trait]
    impl Transport for StaticTransport {
        async fn fetch(&self, _url: &str) -> Result<String, TransportError> {
            Ok(self.body.to_string())
        }
    }

    struct FailingTransport;

    #[async_trait::async_trait]
    impl Transport for FailingTransport {
        async fn fetch(&self, url: &str) -> Result<String, TransportError> {
            Err(TransportError::Status {
                url: url.to_string(),
                code: 503,
            })
        }
    }

    fn store_with(body: &'static str) -> ConfigStore {
        ConfigStore::with_transport(Arc::new(StaticTransport { body }))
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let mut store = store_with(CAPABILITIES_05_07);
        store.set_value("user", "fred@example.com").await.unwrap();
        assert_eq!(
            store.get_value("user").unwrap(),
            Some(Value::from("fred@example.com"))
        );

        store.set_value("verbose", true).await.unwrap();
        assert_eq!(
            store.get_value("verbose").unwrap(),
            Some(Value::Bool(true))
        );
    }

    #[tokio::test]
    async fn test_unknown_key_never_mutates() {
        let mut store = store_with(CAPABILITIES_05_07);
        let before = store.snapshot();

        let result = store.set_value("no_such_key", "x").await;
        assert!(matches!(result, Err(ConfigError::UnknownKey(ref k)) if k == "no_such_key"));
        assert_eq!(store.snapshot(), before);

        assert!(matches!(
            store.get_value("no_such_key"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[tokio::test]
    async fn test_set_server_negotiates_capabilities() {
        let mut store = store_with(CAPABILITIES_05_07);
        store.set_server("https://osm.example").await.unwrap();

        assert_eq!(store.min_version(), Some(Version::new(0, 5)));
        assert_eq!(store.max_version(), Some(Version::new(0, 7)));
        assert_eq!(store.timeout(), Some(300));
        assert_eq!(store.max_elements(), Some(50000));
        assert_eq!(store.max_nodes(), Some(2000));
        assert_eq!(store.tracepoints_per_page(), Some(5000));
        assert_eq!(store.max_area(), Some(0.25));
        assert_eq!(
            store.get_value("server").unwrap(),
            Some(Value::from("https://osm.example"))
        );
    }

    #[tokio::test]
    async fn test_set_server_version_out_of_range() {
        let mut store = store_with(CAPABILITIES_07_09);
        let result = store.set_server("https://osm.example").await;

        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedApiVersion { ref configured }) if configured == "0.6"
        ));
        // nothing committed
        assert_eq!(
            store.get_value("server").unwrap(),
            Some(Value::from(DEFAULT_SERVER))
        );
        assert!(store.capabilities().is_none());
        assert_eq!(store.min_version(), None);
    }

    #[tokio::test]
    async fn test_set_server_no_version_range() {
        let mut store = store_with("<osm><api/></osm>");
        let result = store.set_server("https://osm.example").await;
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedApiVersion { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_server_malformed_document() {
        let mut store = store_with("<osm><api></osm>");
        let result = store.set_server("https://osm.example").await;

        assert!(matches!(result, Err(ConfigError::CapabilityParse(_))));
        assert!(store.capabilities().is_none());
        assert_eq!(
            store.get_value("server").unwrap(),
            Some(Value::from(DEFAULT_SERVER))
        );
    }

    #[tokio::test]
    async fn test_set_server_unreachable() {
        let mut store =
            ConfigStore::with_transport(Arc::new(FailingTransport));
        let result = store.set_server("https://osm.example").await;

        match result {
            Err(ConfigError::ServerUnreachable { url, source }) => {
                assert_eq!(url, "https://osm.example/api/capabilities");
                assert!(matches!(
                    source,
                    TransportError::Status { code: 503, .. }
                ));
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected ServerUnreachable"),
        }
        assert_eq!(
            store.get_value("server").unwrap(),
            Some(Value::from(DEFAULT_SERVER))
        );
    }

    #[tokio::test]
    async fn test_failed_negotiation_keeps_previous_capabilities() {
        let mut store = store_with(CAPABILITIES_05_07);
        store.set_server("https://osm.example").await.unwrap();

        store.set_transport(Arc::new(FailingTransport));
        let result = store.set_server("https://other.example").await;
        assert!(result.is_err());

        // the earlier negotiation is intact
        assert_eq!(store.min_version(), Some(Version::new(0, 5)));
        assert_eq!(store.timeout(), Some(300));
        assert_eq!(
            store.get_value("server").unwrap(),
            Some(Value::from("https://osm.example"))
        );
    }

    #[tokio::test]
    async fn test_single_key_server_revalidates_current() {
        let mut store = store_with(CAPABILITIES_05_07);
        store
            .set_value("server", "https://other.example")
            .await
            .unwrap();

        // the current server was re-validated, the supplied value dropped
        assert_eq!(
            store.get_value("server").unwrap(),
            Some(Value::from(DEFAULT_SERVER))
        );
        assert_eq!(store.min_version(), Some(Version::new(0, 5)));
    }

    #[tokio::test]
    async fn test_bulk_sets_server_with_supplied_value() {
        let mut store = store_with(CAPABILITIES_05_07);
        store
            .set_values(&[
                ("user", Value::from("fred@example.com")),
                ("server", Value::from("https://osm.example")),
            ])
            .await
            .unwrap();

        assert_eq!(
            store.get_value("server").unwrap(),
            Some(Value::from("https://osm.example"))
        );
        assert_eq!(
            store.get_value("user").unwrap(),
            Some(Value::from("fred@example.com"))
        );
    }

    #[tokio::test]
    async fn test_bulk_unknown_key_keeps_earlier_writes() {
        let mut store = store_with(CAPABILITIES_05_07);
        let result = store
            .set_values(&[
                ("user", Value::from("fred@example.com")),
                ("bogus", Value::from("x")),
                ("password", Value::from("never-applied")),
            ])
            .await;

        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
        assert_eq!(
            store.get_value("user").unwrap(),
            Some(Value::from("fred@example.com"))
        );
        assert_eq!(store.get_value("password").unwrap(), None);
    }

    #[tokio::test]
    async fn test_bulk_adapter_applied_first() {
        let mut store = ConfigStore::with_transport(Arc::new(FailingTransport));
        let result = store
            .set_values(&[
                ("server", Value::from("https://osm.example")),
                ("adapter", Value::from("curl")),
            ])
            .await;

        // the batch aborted at the server fetch, but adapter was applied
        // ahead of it regardless of its position
        assert!(matches!(result, Err(ConfigError::ServerUnreachable { .. })));
        assert_eq!(
            store.get_value("adapter").unwrap(),
            Some(Value::from("curl"))
        );
    }

    #[tokio::test]
    async fn test_api_version_selects_variant() {
        let mut store = store_with(CAPABILITIES_05_07);
        store.set_value("api_version", "0.5").await.unwrap();
        assert_eq!(store.api(), ApiVersion::V05);
        assert_eq!(store.api_version(), &Version::new(0, 5));
        assert_eq!(
            store.get_value("api_version").unwrap(),
            Some(Value::from("0.5"))
        );
    }

    #[tokio::test]
    async fn test_unsupported_api_version_rejected() {
        let mut store = store_with(CAPABILITIES_05_07);
        let result = store.set_value("api_version", "0.9").await;

        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedApiVersion { ref configured }) if configured == "0.9"
        ));
        assert_eq!(
            store.get_value("api_version").unwrap(),
            Some(Value::from(DEFAULT_API_VERSION))
        );
        assert_eq!(store.api(), ApiVersion::V06);
    }

    #[tokio::test]
    async fn test_passwordfile_single_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice:secret").unwrap();
        let path = file.path().display().to_string();

        let mut store = store_with(CAPABILITIES_05_07);
        store.set_passwordfile(&path).unwrap();

        assert_eq!(
            store.get_value("user").unwrap(),
            Some(Value::from("alice"))
        );
        assert_eq!(
            store.get_value("password").unwrap(),
            Some(Value::from("secret"))
        );
        assert_eq!(
            store.get_value("passwordfile").unwrap(),
            Some(Value::from(path.as_str()))
        );
    }

    #[tokio::test]
    async fn test_passwordfile_comment_then_data() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "bob:pw2").unwrap();

        let mut store = store_with(CAPABILITIES_05_07);
        store
            .set_passwordfile(&file.path().display().to_string())
            .unwrap();

        assert_eq!(store.get_value("user").unwrap(), Some(Value::from("bob")));
        assert_eq!(
            store.get_value("password").unwrap(),
            Some(Value::from("pw2"))
        );
    }

    #[tokio::test]
    async fn test_passwordfile_two_data_lines_is_a_no_op() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice:secret").unwrap();
        writeln!(file, "bob:pw2").unwrap();
        let path = file.path().display().to_string();

        let mut store = store_with(CAPABILITIES_05_07);
        store.set_passwordfile(&path).unwrap();

        // no credential extracted, but the path is still committed
        assert_eq!(store.get_value("user").unwrap(), None);
        assert_eq!(store.get_value("password").unwrap(), None);
        assert_eq!(
            store.get_value("passwordfile").unwrap(),
            Some(Value::from(path.as_str()))
        );
    }

    #[tokio::test]
    async fn test_passwordfile_multi_line_matches_user() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice:a1").unwrap();
        writeln!(file, "carol:c1").unwrap();
        writeln!(file, "bob:b1").unwrap();

        let mut store = store_with(CAPABILITIES_05_07);
        store.set_value("user", "carol").await.unwrap();
        store
            .set_passwordfile(&file.path().display().to_string())
            .unwrap();

        assert_eq!(
            store.get_value("user").unwrap(),
            Some(Value::from("carol"))
        );
        assert_eq!(
            store.get_value("password").unwrap(),
            Some(Value::from("c1"))
        );
    }

    #[tokio::test]
    async fn test_passwordfile_empty_path_is_a_no_op() {
        let mut store = store_with(CAPABILITIES_05_07);
        let before = store.snapshot();
        store.set_passwordfile("").unwrap();
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_passwordfile_unreadable() {
        let mut store = store_with(CAPABILITIES_05_07);
        let result = store.set_passwordfile("/nonexistent/passwords");
        assert!(matches!(result, Err(ConfigError::PasswordFile(_))));
        assert_eq!(store.get_value("passwordfile").unwrap(), None);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let store = store_with(CAPABILITIES_05_07);
        let mut snapshot = store.snapshot();
        snapshot.insert(ConfigKey::User, Some(Value::from("mallory")));
        assert_eq!(store.get_value("user").unwrap(), None);
    }

    #[test]
    fn test_snapshot_matches_get_value() {
        let store = store_with(CAPABILITIES_05_07);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), ConfigKey::ALL.len());
        for key in ConfigKey::ALL {
            assert_eq!(
                snapshot.get(&key).cloned().flatten(),
                store.get_value(key.as_str()).unwrap()
            );
        }
    }

    #[test]
    fn test_defaults() {
        let store = store_with(CAPABILITIES_05_07);
        assert_eq!(
            store.get_value("server").unwrap(),
            Some(Value::from(DEFAULT_SERVER))
        );
        assert_eq!(
            store.get_value("api_version").unwrap(),
            Some(Value::from("0.6"))
        );
        assert_eq!(
            store.get_value("verbose").unwrap(),
            Some(Value::Bool(false))
        );
        assert_eq!(store.get_value("user").unwrap(), None);
        assert_eq!(store.get_value("password").unwrap(), None);
        assert!(store.capabilities().is_none());
    }

    #[tokio::test]
    async fn test_fluent_chaining() {
        let mut store = store_with(CAPABILITIES_05_07);
        store
            .set_value("user", "fred@example.com")
            .await
            .unwrap()
            .set_value("password", "Simples")
            .await
            .unwrap();
        assert_eq!(
            store.get_value("password").unwrap(),
            Some(Value::from("Simples"))
        );
    }
}
