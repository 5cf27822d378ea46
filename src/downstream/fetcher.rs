// src/downstream/fetcher.rs

use super::address::DownstreamAddress;
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Body returned in place of the downstream response when the fetch fails at
/// the transport level.
pub const FALLBACK_TEXT: &str = "error fetching from node";

/// Outcome of the single outbound GET. Transport failures are a value, not
/// an error path: the handler always composes a 200 response from this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Any HTTP response, body taken verbatim regardless of status code.
    Fetched(String),
    /// Connection refused, DNS failure, timeout.
    Unreachable,
}

impl FetchOutcome {
    pub fn into_body(self) -> String {
        match self {
            Self::Fetched(body) => body,
            Self::Unreachable => FALLBACK_TEXT.to_string(),
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable)
    }
}

/// Performs the single outbound GET against the resolved downstream address.
/// One shared `reqwest::Client` per process, built at startup with a bounded
/// timeout and injected into the handler.
pub struct Fetcher {
    client: Client,
    address: DownstreamAddress,
}

impl Fetcher {
    pub fn new(address: DownstreamAddress, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, address })
    }

    pub fn address(&self) -> &DownstreamAddress {
        &self.address
    }

    /// Exactly one GET, no retries. HTTP-level error statuses still yield
    /// the response body; only transport-level failures map to
    /// `Unreachable`.
    pub async fn fetch(&self) -> FetchOutcome {
        match self.client.get(self.address.as_str()).send().await {
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Ok(body) => {
                        debug!(%status, "downstream responded");
                        FetchOutcome::Fetched(body)
                    }
                    Err(e) => {
                        warn!(error = %e, "failed reading downstream body");
                        FetchOutcome::Unreachable
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, address = %self.address, "downstream unreachable");
                FetchOutcome::Unreachable
            }
        }
    }
}
