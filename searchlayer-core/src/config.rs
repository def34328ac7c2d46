//! Connector settings and their translation into a transport configuration.
//!
//! [`ConnectorSettings`] is the user-facing, serde-deserializable settings
//! object. [`ConfigBuilder`] validates it and resolves everything a backend
//! transport needs (normalized host URLs, timeouts, TLS trust material, log
//! level) into a [`TransportConfig`].

use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, str::FromStr, time::Duration};
use tracing::Level;
use url::{ParseError, Url};

use crate::{
    error::{SearchLayerError, SearchLayerResult},
    translator::TranslatorSettings,
};

/// Authentication presented to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Auth {
    /// Basic username/password authentication.
    Basic {
        username: String,
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        token: String,
    },
}

/// TLS trust settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslSettings {
    /// Paths of PEM-encoded CA certificates to trust.
    #[serde(default)]
    pub ca: Vec<PathBuf>,
    /// Whether certificates must validate (default: true).
    /// Only disable for development/testing.
    #[serde(default = "default_reject_unauthorized")]
    pub reject_unauthorized: bool,
}

impl Default for SslSettings {
    fn default() -> Self {
        Self {
            ca: Vec::new(),
            reject_unauthorized: default_reject_unauthorized(),
        }
    }
}

/// Settings for a connector and its backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSettings {
    /// Backend node addresses (default: `["http://localhost:9200"]`).
    /// A host without a scheme is reached over plain HTTP.
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    /// Shared search index for all models. When unset, every model is stored in
    /// an index named after the lower-cased model name.
    #[serde(default)]
    pub index: Option<String>,

    /// Page size applied when a caller requests a size below one.
    #[serde(default)]
    pub default_size: Option<u64>,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Log level for transport diagnostics (default: `"info"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Make writes visible to search immediately (default: false).
    #[serde(default)]
    pub refresh_on_write: bool,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<Auth>,

    /// Optional TLS trust settings.
    #[serde(default)]
    pub ssl: Option<SslSettings>,
}

fn default_hosts() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_reject_unauthorized() -> bool {
    true
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            index: None,
            default_size: None,
            request_timeout_ms: default_request_timeout_ms(),
            log_level: default_log_level(),
            refresh_on_write: false,
            auth: None,
            ssl: None,
        }
    }
}

impl ConnectorSettings {
    /// Reads settings from a JSON value; missing fields take their defaults.
    pub fn from_json(value: serde_json::Value) -> SearchLayerResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| SearchLayerError::Configuration(e.to_string()))
    }

    /// The subset of settings that shapes query translation.
    pub fn translator_settings(&self) -> TranslatorSettings {
        TranslatorSettings {
            index: self.index.clone(),
            default_size: self.default_size,
        }
    }
}

/// Fully resolved configuration for a backend transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Parsed node URLs, in configured order.
    pub hosts: Vec<Url>,
    pub timeout: Duration,
    /// PEM contents of the trusted CA certificates.
    pub ca_certificates: Vec<Vec<u8>>,
    /// `false` disables certificate validation entirely.
    pub validate_certificates: bool,
    pub log_level: Level,
    pub auth: Option<Auth>,
}

impl TransportConfig {
    /// Whether request and response bodies should be logged.
    pub fn logs_bodies(&self) -> bool {
        matches!(self.log_level, Level::DEBUG | Level::TRACE)
    }
}

/// Builds [`TransportConfig`]s from [`ConnectorSettings`].
pub struct ConfigBuilder;

impl ConfigBuilder {
    /// Resolves settings into a transport configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SearchLayerError::Configuration`] when no host is configured, a
    /// host is blank, the log level is unknown, or a CA file cannot be read.
    pub fn build(settings: &ConnectorSettings) -> SearchLayerResult<TransportConfig> {
        if settings.hosts.is_empty() {
            return Err(SearchLayerError::Configuration("At least one host is required".to_string()));
        }

        let hosts = settings
            .hosts
            .iter()
            .map(|host| Self::normalize_host(host))
            .collect::<SearchLayerResult<Vec<_>>>()?;

        let log_level = Level::from_str(settings.log_level.trim()).map_err(|_| {
            SearchLayerError::Configuration(format!("Unknown log level: {}", settings.log_level))
        })?;

        let ssl = settings.ssl.clone().unwrap_or_default();
        let ca_certificates = ssl
            .ca
            .iter()
            .map(|path| {
                fs::read(path).map_err(|e| {
                    SearchLayerError::Configuration(format!(
                        "Failed to read CA certificate {}: {}",
                        path.display(),
                        e
                    ))
                })
            })
            .collect::<SearchLayerResult<Vec<_>>>()?;

        Ok(TransportConfig {
            hosts,
            timeout: Duration::from_millis(settings.request_timeout_ms),
            ca_certificates,
            validate_certificates: ssl.reject_unauthorized,
            log_level,
            auth: settings.auth.clone(),
        })
    }

    /// Parses a host into a node URL, defaulting the scheme to `http`.
    fn normalize_host(host: &str) -> SearchLayerResult<Url> {
        let host = host.trim().trim_end_matches('/');

        if host.is_empty() {
            return Err(SearchLayerError::Configuration("Host must not be blank".to_string()));
        }

        let invalid = |e: ParseError| {
            SearchLayerError::Configuration(format!("Invalid host {}: {}", host, e))
        };

        let url = match Url::parse(host) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) if host.contains("://") => {
                return Err(SearchLayerError::Configuration(format!(
                    "Unsupported scheme {} in host {}",
                    url.scheme(),
                    host
                )));
            }
            // `localhost:9200` parses with `localhost` as its scheme
            Ok(_) | Err(ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&format!("http://{}", host)).map_err(invalid)?
            }
            Err(e) => return Err(invalid(e)),
        };

        let empty_segment = url.path() != "/"
            && url.path_segments().is_some_and(|mut segments| segments.any(str::is_empty));

        if url.host_str().is_none() || empty_segment || url.query().is_some() || url.fragment().is_some() {
            return Err(SearchLayerError::Configuration(format!("Malformed host: {}", host)));
        }

        Ok(url)
    }
}
