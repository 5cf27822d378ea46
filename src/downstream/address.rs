// src/downstream/address.rs

use crate::config::{ConfigError, EndpointStrategy};
use url::Url;

/// The resolved network location of the downstream dependency. Built once at
/// startup from the active configuration strategy and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamAddress {
    url: Url,
}

impl DownstreamAddress {
    pub fn resolve(strategy: &EndpointStrategy) -> Result<Self, ConfigError> {
        Ok(Self {
            url: strategy.base_url()?,
        })
    }

    pub fn from_url(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl std::fmt::Display for DownstreamAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.url.fmt(f)
    }
}
