//! Visiting representative unsubscribe links.
//!
//! One GET per service, strictly sequential, with a fixed pause between
//! consecutive requests (none after the last). Nothing is retried and no
//! outcome is fatal; every visit ends up as a [`VisitRecord`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::services::ServiceMap;

/// User agent sent with every visit.
pub const USER_AGENT: &str = concat!("unsubscriber/", env!("CARGO_PKG_VERSION"));

/// Why a GET produced no status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    Timeout,
    Connection(String),
    Other(String),
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Timeout => f.write_str("request timed out"),
            ProbeError::Connection(reason) => write!(f, "connection failed: {}", reason),
            ProbeError::Other(reason) => f.write_str(reason),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Capability to perform a single HTTP GET and report the status code.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<u16, ProbeError>;
}

/// [`HttpProbe`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    client: reqwest::Client,
}

impl ReqwestProbe {
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    async fn get(&self, url: &str, timeout: Duration) -> Result<u16, ProbeError> {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(e) if e.is_timeout() => Err(ProbeError::Timeout),
            Err(e) if e.is_connect() => Err(ProbeError::Connection(e.to_string())),
            Err(e) => Err(ProbeError::Other(e.to_string())),
        }
    }
}

/// Result of one visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VisitOutcome {
    Success,
    HttpStatus { status: u16 },
    Timeout,
    Connection { reason: String },
    Other { reason: String },
}

impl VisitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, VisitOutcome::Success)
    }

    fn from_probe(result: Result<u16, ProbeError>) -> Self {
        match result {
            Ok(200) => VisitOutcome::Success,
            Ok(status) => VisitOutcome::HttpStatus { status },
            Err(ProbeError::Timeout) => VisitOutcome::Timeout,
            Err(ProbeError::Connection(reason)) => VisitOutcome::Connection { reason },
            Err(ProbeError::Other(reason)) => VisitOutcome::Other { reason },
        }
    }
}

impl std::fmt::Display for VisitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisitOutcome::Success => f.write_str("ok"),
            VisitOutcome::HttpStatus { status } => write!(f, "HTTP {}", status),
            VisitOutcome::Timeout => f.write_str("timeout"),
            VisitOutcome::Connection { reason } => write!(f, "connection error: {}", reason),
            VisitOutcome::Other { reason } => write!(f, "error: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitRecord {
    pub domain: String,
    pub display_name: String,
    pub url: String,
    #[serde(flatten)]
    pub outcome: VisitOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VisitReport {
    pub records: Vec<VisitRecord>,
}

impl VisitReport {
    pub fn success_count(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.records.len() - self.success_count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VisitOptions {
    pub timeout: Duration,
    pub delay: Duration,
}

impl Default for VisitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            delay: Duration::from_secs(1),
        }
    }
}

/// Sequential visitor over a grouped service map.
pub struct Visitor<'a, P: HttpProbe + ?Sized> {
    probe: &'a P,
    options: VisitOptions,
}

impl<'a, P: HttpProbe + ?Sized> Visitor<'a, P> {
    pub fn new(probe: &'a P, options: VisitOptions) -> Self {
        Self { probe, options }
    }

    pub async fn visit_all(&self, services: &ServiceMap) -> VisitReport {
        let total = services.len();
        let mut report = VisitReport::default();

        for (position, entry) in services.entries().enumerate() {
            if position > 0 && !self.options.delay.is_zero() {
                tokio::time::sleep(self.options.delay).await;
            }

            let url = &entry.representative_url;
            info!(
                "Visiting {}/{}: {} ({})",
                position + 1,
                total,
                entry.display_name,
                url
            );
            let outcome =
                VisitOutcome::from_probe(self.probe.get(url, self.options.timeout).await);
            if outcome.is_success() {
                info!("Unsubscribed from {}", entry.display_name);
            } else {
                warn!("Visit to {} failed: {}", url, outcome);
            }

            report.records.push(VisitRecord {
                domain: entry.domain.clone(),
                display_name: entry.display_name.clone(),
                url: url.clone(),
                outcome,
            });
        }

        info!(
            "Visited {} link(s), {} succeeded",
            report.records.len(),
            report.success_count()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::group_links;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct ScriptedProbe {
        responses: HashMap<String, Result<u16, ProbeError>>,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    #[async_trait]
    impl HttpProbe for ScriptedProbe {
        async fn get(&self, url: &str, _timeout: Duration) -> Result<u16, ProbeError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), Instant::now()));
            self.responses
                .get(url)
                .cloned()
                .unwrap_or(Err(ProbeError::Other("unscripted".into())))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn visits_in_order_with_delay_between() {
        let services = group_links([
            "https://charlie.com/unsubscribe",
            "https://alpha.com/unsubscribe",
            "https://bravo.com/unsubscribe",
        ])
        .services;
        let probe = ScriptedProbe {
            responses: HashMap::from([
                ("https://alpha.com/unsubscribe".to_string(), Err(ProbeError::Timeout)),
                ("https://bravo.com/unsubscribe".to_string(), Ok(200)),
                ("https://charlie.com/unsubscribe".to_string(), Ok(404)),
            ]),
            calls: Mutex::new(Vec::new()),
        };

        let start = Instant::now();
        let report = Visitor::new(&probe, VisitOptions::default())
            .visit_all(&services)
            .await;
        let elapsed = start.elapsed();

        assert_eq!(report.records.len(), 3);
        assert_eq!(report.success_count(), 1);
        assert_eq!(report.records[0].outcome, VisitOutcome::Timeout);
        assert_eq!(report.records[1].outcome, VisitOutcome::Success);
        assert_eq!(
            report.records[2].outcome,
            VisitOutcome::HttpStatus { status: 404 }
        );

        // two pauses, none after the last visit
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));

        let calls = probe.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].1 - calls[0].1 >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn empty_map_makes_no_requests() {
        let probe = ScriptedProbe {
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        };
        let report = Visitor::new(&probe, VisitOptions::default())
            .visit_all(&ServiceMap::default())
            .await;
        assert!(report.records.is_empty());
        assert!(probe.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reqwest_probe_reports_status_codes() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/unsubscribe")
            .with_status(200)
            .create_async()
            .await;
        let gone = server
            .mock("GET", "/gone")
            .with_status(404)
            .create_async()
            .await;

        let probe = ReqwestProbe::new().unwrap();
        let timeout = Duration::from_secs(5);
        assert_eq!(
            probe.get(&format!("{}/unsubscribe", server.url()), timeout).await,
            Ok(200)
        );
        assert_eq!(
            probe.get(&format!("{}/gone", server.url()), timeout).await,
            Ok(404)
        );
        ok.assert_async().await;
        gone.assert_async().await;
    }

    #[tokio::test]
    async fn reqwest_probe_classifies_connection_errors() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let probe = ReqwestProbe::new().unwrap();
        let result = probe
            .get(&format!("http://127.0.0.1:{port}/unsubscribe"), Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(ProbeError::Connection(_))));
    }

    #[tokio::test]
    async fn reqwest_probe_rejects_non_http_links() {
        let probe = ReqwestProbe::new().unwrap();
        let result = probe
            .get("mailto:unsubscribe@example.com", Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(ProbeError::Other(_))));
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let record = VisitRecord {
            domain: "example.com".into(),
            display_name: "Example".into(),
            url: "https://example.com/u".into(),
            outcome: VisitOutcome::HttpStatus { status: 500 },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["outcome"], "http_status");
        assert_eq!(json["status"], 500);
    }
}
