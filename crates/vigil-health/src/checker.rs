//! Health check probe logic.
//!
//! Performs an HTTP GET against a target's workload endpoint with a bounded
//! timeout. Callers only see reachable / not reachable.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use vigil_core::Prober;
use vigil_core::config::ProbeConfig;

/// Classification of a single probe, kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint returned 2xx, or 3xx (a redirecting front end is up).
    Healthy,
    /// The endpoint answered with any other status.
    Unhealthy,
    /// The probe could not be executed (connection error or timeout).
    Failed,
}

impl ProbeOutcome {
    pub fn is_reachable(self) -> bool {
        self == ProbeOutcome::Healthy
    }
}

/// Probes `http://{address}:{port}{path}`.
#[derive(Debug, Clone)]
pub struct HttpProber {
    port: u16,
    path: String,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(port: u16, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            port,
            path: path.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.port, config.path.clone(), config.timeout())
    }

    /// `host:port` for a resolved address. IPv6 literals get brackets.
    pub fn authority(&self, address: &str) -> String {
        match address.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{address}:{}", self.port),
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, address: &str) -> bool {
        http_probe(&self.authority(address), &self.path, self.timeout)
            .await
            .is_reachable()
    }

    fn endpoint(&self, address: &str) -> String {
        format!("http://{}{}", self.authority(address), self.path)
    }
}

/// Perform an HTTP health probe against `authority` (`host:port`).
///
/// Returns `Healthy` if the response is 2xx, `Unhealthy` for non-2xx,
/// or `Failed` if the connection fails or times out. Never retries.
pub async fn http_probe(authority: &str, path: &str, timeout: Duration) -> ProbeOutcome {
    let uri = format!("http://{authority}{path}");

    let result = tokio::time::timeout(timeout, async {
        let stream = match tokio::net::TcpStream::connect(authority).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, %uri, "probe connection failed");
                return ProbeOutcome::Failed;
            }
        };

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, %uri, "probe handshake failed");
                return ProbeOutcome::Failed;
            }
        };

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = match http::Request::builder()
            .method("GET")
            .uri(path)
            .header("host", authority)
            .header("user-agent", concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .body(http_body_util::Empty::<bytes::Bytes>::new())
        {
            Ok(req) => req,
            Err(e) => {
                debug!(error = %e, %uri, "probe request could not be built");
                return ProbeOutcome::Failed;
            }
        };

        match sender.send_request(req).await {
            Ok(resp) if resp.status().is_success() => ProbeOutcome::Healthy,
            Ok(resp) if resp.status().is_redirection() => {
                debug!(status = %resp.status(), %uri, "probe redirected, counting as up");
                ProbeOutcome::Healthy
            }
            Ok(resp) => {
                debug!(status = %resp.status(), %uri, "probe non-2xx");
                ProbeOutcome::Unhealthy
            }
            Err(e) => {
                debug!(error = %e, %uri, "probe request failed");
                ProbeOutcome::Failed
            }
        }
    })
    .await;

    match result {
        Ok(outcome) => outcome,
        Err(_) => {
            debug!(%uri, "probe timed out");
            ProbeOutcome::Failed
        }
    }
}
