//! Cached reachability checks against the design service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ClientError;

/// How long a check result is reused before probing again.
pub const CACHE_WINDOW: Duration = Duration::from_secs(30);
/// How long a single probe may take before the service counts as down.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const TIMEOUT_MESSAGE: &str = "Request timeout - backend not responding";

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub reason: String,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> Result<ProbeResponse, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityStatus {
    pub is_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ConnectivityStatus {
    fn reachable(latency_ms: Option<u64>) -> Self {
        Self {
            is_reachable: true,
            error: None,
            latency_ms,
        }
    }

    fn unreachable(error: String, latency_ms: u64) -> Self {
        Self {
            is_reachable: false,
            error: Some(error),
            latency_ms: Some(latency_ms),
        }
    }
}

/// Owns the last check result and when it was taken. Construct one per
/// session and hand it to whoever needs to know if the service is up.
pub struct ConnectivityMonitor<P, C = SystemClock> {
    probe: P,
    clock: C,
    mock_mode: bool,
    timeout: Duration,
    last: Option<(ConnectivityStatus, Instant)>,
}

impl<P: HealthProbe> ConnectivityMonitor<P, SystemClock> {
    pub fn with_system_clock(probe: P, mock_mode: bool) -> Self {
        Self::new(probe, SystemClock, mock_mode)
    }
}

impl<P: HealthProbe, C: Clock> ConnectivityMonitor<P, C> {
    pub fn new(probe: P, clock: C, mock_mode: bool) -> Self {
        Self {
            probe,
            clock,
            mock_mode,
            timeout: PROBE_TIMEOUT,
            last: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check reachability, reusing a result younger than [`CACHE_WINDOW`]
    /// unless `force_refresh` is set. Every outcome is cached.
    pub async fn check(&mut self, force_refresh: bool) -> ConnectivityStatus {
        let now = self.clock.now();

        if !force_refresh {
            if let Some((status, checked_at)) = &self.last {
                if now.saturating_duration_since(*checked_at) < CACHE_WINDOW {
                    return status.clone();
                }
            }
        }

        let status = if self.mock_mode {
            ConnectivityStatus::reachable(None)
        } else {
            self.probe_once().await
        };

        debug!(reachable = status.is_reachable, "connectivity checked");
        self.last = Some((status.clone(), now));
        status
    }

    async fn probe_once(&self) -> ConnectivityStatus {
        let started = self.clock.now();
        let outcome = tokio::time::timeout(self.timeout, self.probe.probe()).await;
        let latency_ms = self.clock.now().saturating_duration_since(started).as_millis() as u64;

        match outcome {
            Ok(Ok(response)) if response.is_success() => {
                ConnectivityStatus::reachable(Some(latency_ms))
            }
            Ok(Ok(response)) => ConnectivityStatus::unreachable(
                format!("Backend returned {}: {}", response.status, response.reason),
                latency_ms,
            ),
            Ok(Err(e)) => {
                warn!(error = %e, "health probe failed");
                ConnectivityStatus::unreachable(e.to_string(), latency_ms)
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "health probe timed out");
                ConnectivityStatus::unreachable(TIMEOUT_MESSAGE.to_string(), latency_ms)
            }
        }
    }

    pub fn clear_cache(&mut self) {
        self.last = None;
    }

    /// Last result without probing.
    pub fn cached_status(&self) -> Option<&ConnectivityStatus> {
        self.last.as_ref().map(|(status, _)| status)
    }
}
