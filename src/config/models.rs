// src/config/models.rs

use std::time::Duration;
use url::Url;

/// How the downstream base URL is assembled. Exactly one strategy is active
/// per deployment; `Config::from_lookup` picks the first one whose variables
/// are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointStrategy {
    /// `NODE_ENDPOINT`: a full base URL, used as-is with `/` appended.
    Endpoint(String),
    /// `REQUEST_HOST` + `REQUEST_PORT`: assembled as `http://{host}:{port}/`.
    HostPort(String, u16),
    /// `NODE_REQUEST_ENDPOINT`: `host[:port]`, scheme prepended only when absent.
    Authority(String),
    /// No variables set: development fallback `http://localhost:8081/`.
    LocalDefault,
}

impl EndpointStrategy {
    /// Assemble and validate the downstream base URL for this strategy.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = match self {
            Self::Endpoint(endpoint) => endpoint.clone(),
            Self::HostPort(host, port) => format!("http://{host}:{port}/"),
            Self::Authority(authority) => {
                if authority.contains("://") {
                    authority.clone()
                } else {
                    format!("http://{authority}")
                }
            }
            Self::LocalDefault => "http://localhost:8081/".to_string(),
        };

        let mut url = Url::parse(&raw).map_err(|e| ConfigError::InvalidEndpoint {
            value: raw.clone(),
            reason: e.to_string(),
        })?;

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }
}

/// Separator between the greeting prefix and the fetched body. The HTML
/// variant exists to match the `<br>`-separated output of one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Newline,
    HtmlBreak,
}

impl Separator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Newline => "\n",
            Self::HtmlBreak => "<br>",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Newline => "text/plain; charset=utf-8",
            Self::HtmlBreak => "text/html; charset=utf-8",
        }
    }

    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "newline" => Ok(Self::Newline),
            "html" => Ok(Self::HtmlBreak),
            other => Err(ConfigError::InvalidSeparator(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

/// Where span batches are shipped. Export is enabled only when both host and
/// port are configured.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub endpoint: String,
}

impl ExporterConfig {
    pub fn sink_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol, self.host, self.port, self.endpoint
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_port: u16,
    pub endpoint: EndpointStrategy,
    pub fetch_timeout: Duration,
    pub separator: Separator,
    pub metrics: MetricsConfig,
    pub exporter: Option<ExporterConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid downstream endpoint '{value}': {reason}")]
    InvalidEndpoint { value: String, reason: String },

    #[error("invalid numeric value '{value}' for {var}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("invalid value '{0}' for RESPONSE_SEPARATOR: expected 'newline' or 'html'")]
    InvalidSeparator(String),
}

impl Config {
    /// Build a `Config` from an environment-style lookup. Taking the lookup
    /// as a closure keeps resolution testable without mutating the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = if let Some(endpoint) = lookup("NODE_ENDPOINT") {
            EndpointStrategy::Endpoint(endpoint)
        } else if let (Some(host), Some(port)) = (lookup("REQUEST_HOST"), lookup("REQUEST_PORT")) {
            EndpointStrategy::HostPort(host, parse_number("REQUEST_PORT", &port)?)
        } else if let Some(authority) = lookup("NODE_REQUEST_ENDPOINT") {
            EndpointStrategy::Authority(authority)
        } else {
            EndpointStrategy::LocalDefault
        };

        let listen_port = match lookup("LISTEN_PORT") {
            Some(value) => parse_number("LISTEN_PORT", &value)?,
            None => 8082,
        };

        let fetch_timeout_secs: u64 = match lookup("FETCH_TIMEOUT_SECS") {
            Some(value) => parse_number("FETCH_TIMEOUT_SECS", &value)?,
            None => 3,
        };
        let fetch_timeout = Duration::from_secs(fetch_timeout_secs);

        let separator = match lookup("RESPONSE_SEPARATOR") {
            Some(value) => Separator::parse(&value)?,
            None => Separator::Newline,
        };

        let metrics = MetricsConfig {
            enabled: lookup("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            port: match lookup("METRICS_PORT") {
                Some(value) => parse_number("METRICS_PORT", &value)?,
                None => 9090,
            },
            path: lookup("METRICS_PATH").unwrap_or_else(|| "/metrics".to_string()),
        };

        let exporter = match (lookup("SPAN_EXPORTER_HOST"), lookup("SPAN_EXPORTER_PORT")) {
            (Some(host), Some(port)) => Some(ExporterConfig {
                host,
                port: parse_number("SPAN_EXPORTER_PORT", &port)?,
                protocol: lookup("SPAN_EXPORTER_PROTOCOL").unwrap_or_else(|| "http".to_string()),
                endpoint: lookup("SPAN_EXPORTER_ENDPOINT")
                    .unwrap_or_else(|| "/api/v2/spans".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            listen_port,
            endpoint,
            fetch_timeout,
            separator,
            metrics,
            exporter,
        })
    }

    /// Fail fast on a malformed downstream address instead of carrying a
    /// broken URL into the request path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint.base_url().map(|_| ())
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn endpoint_strategy_used_as_is_with_path_appended() {
        let config = Config::from_lookup(lookup(&[("NODE_ENDPOINT", "http://node:8081")])).unwrap();
        assert_eq!(
            config.endpoint,
            EndpointStrategy::Endpoint("http://node:8081".to_string())
        );
        assert_eq!(
            config.endpoint.base_url().unwrap().as_str(),
            "http://node:8081/"
        );
    }

    #[test]
    fn host_port_strategy_assembles_http_url() {
        let config = Config::from_lookup(lookup(&[
            ("REQUEST_HOST", "node"),
            ("REQUEST_PORT", "9000"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint.base_url().unwrap().as_str(), "http://node:9000/");
    }

    #[test]
    fn authority_strategy_prepends_scheme_only_when_absent() {
        let bare = EndpointStrategy::Authority("node:8081".to_string());
        assert_eq!(bare.base_url().unwrap().as_str(), "http://node:8081/");

        let with_scheme = EndpointStrategy::Authority("https://node:8443".to_string());
        assert_eq!(with_scheme.base_url().unwrap().as_str(), "https://node:8443/");
    }

    #[test]
    fn no_configuration_falls_back_to_localhost() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.endpoint, EndpointStrategy::LocalDefault);
        assert_eq!(
            config.endpoint.base_url().unwrap().as_str(),
            "http://localhost:8081/"
        );
    }

    #[test]
    fn full_endpoint_takes_precedence_over_host_port() {
        let config = Config::from_lookup(lookup(&[
            ("NODE_ENDPOINT", "http://primary:8081"),
            ("REQUEST_HOST", "secondary"),
            ("REQUEST_PORT", "9000"),
        ]))
        .unwrap();
        assert_eq!(
            config.endpoint.base_url().unwrap().as_str(),
            "http://primary:8081/"
        );
    }

    #[test]
    fn malformed_endpoint_is_rejected_at_validation() {
        let config =
            Config::from_lookup(lookup(&[("NODE_ENDPOINT", "not a url at all")])).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn bad_port_is_a_config_error() {
        let result = Config::from_lookup(lookup(&[
            ("REQUEST_HOST", "node"),
            ("REQUEST_PORT", "not-a-port"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidNumber { var: "REQUEST_PORT", .. })
        ));
    }

    #[test]
    fn defaults_cover_listen_port_timeout_and_separator() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.listen_port, 8082);
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.separator, Separator::Newline);
        assert!(!config.metrics.enabled);
        assert!(config.exporter.is_none());
    }

    #[test]
    fn html_separator_variant_is_selectable() {
        let config =
            Config::from_lookup(lookup(&[("RESPONSE_SEPARATOR", "html")])).unwrap();
        assert_eq!(config.separator, Separator::HtmlBreak);
        assert_eq!(config.separator.as_str(), "<br>");
    }

    #[test]
    fn exporter_requires_both_host_and_port() {
        let partial =
            Config::from_lookup(lookup(&[("SPAN_EXPORTER_HOST", "collector")])).unwrap();
        assert!(partial.exporter.is_none());

        let full = Config::from_lookup(lookup(&[
            ("SPAN_EXPORTER_HOST", "collector"),
            ("SPAN_EXPORTER_PORT", "9411"),
        ]))
        .unwrap();
        let exporter = full.exporter.unwrap();
        assert_eq!(exporter.sink_url(), "http://collector:9411/api/v2/spans");
    }
}
