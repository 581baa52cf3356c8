//! Connectivity prober.
//!
//! A probe is one HEAD request to a tiny endpoint, bounded by a timeout,
//! reporting reachability and wall-clock round-trip time. Probes are routed
//! through the active profile's proxy so they double as an end-to-end check
//! of the profile that was just applied.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use url::Url;

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A response arrived within the timeout.
    Reachable { rtt_ms: u64 },
    /// No usable response; `reason` is for logs and the UI.
    Unreachable { reason: String },
}

/// Host network-fetch API used for probes.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Probes the endpoint, through `proxy` when given, giving up after `timeout`.
    async fn probe(&self, proxy: Option<Url>, timeout: Duration) -> ProbeOutcome;
}

/// reqwest-backed prober.
pub struct HttpProber {
    endpoint: String,
}

impl HttpProber {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    fn client(proxy: Option<&Url>, timeout: Duration) -> reqwest::Result<reqwest::Client> {
        let builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout);
        let builder = match proxy {
            // reqwest takes basic-auth credentials from the URL userinfo.
            Some(url) => builder.proxy(reqwest::Proxy::all(url.as_str())?),
            None => builder.no_proxy(),
        };
        builder.build()
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, proxy: Option<Url>, timeout: Duration) -> ProbeOutcome {
        let client = match Self::client(proxy.as_ref(), timeout) {
            Ok(client) => client,
            Err(e) => {
                return ProbeOutcome::Unreachable {
                    reason: format!("cannot build HTTP client: {e}"),
                }
            }
        };

        let request = client
            .head(&self.endpoint)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send();

        let start = Instant::now();
        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => {
                let rtt_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                log::debug!(
                    "[probe] {} answered {} in {rtt_ms}ms",
                    self.endpoint,
                    response.status()
                );
                ProbeOutcome::Reachable { rtt_ms }
            }
            Ok(Err(e)) => ProbeOutcome::Unreachable {
                reason: describe_error(&e),
            },
            Err(_) => ProbeOutcome::Unreachable {
                reason: format!("timed out after {}ms", timeout.as_millis()),
            },
        }
    }
}

fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        error.to_string()
    }
}
