//! Identifying what runs behind an open port.
use super::{Prober, ScanObserver};
use crate::fingerprint::{self, Fingerprint};
use crate::input::{ScanOrder, DEV_PORTS};
use crate::model::{ServiceRecord, HTTP_SERVICE};
use crate::port_strategy::PortStrategy;
use anyhow::Context;
use async_trait::async_trait;
use futures::{future, stream, StreamExt};
use log::{debug, warn};
use reqwest::{header::HeaderMap, Client};
use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

/// Settings for the per-host service scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Candidate ports. Duplicates are allowed and scanned once.
    pub ports: Vec<u16>,
    pub scan_order: ScanOrder,
    /// How many ports of one host are fingerprinted at the same time.
    pub batch_size: u16,
    /// Timeout of the connect check that precedes any HTTP request.
    pub probe_timeout: Duration,
    pub http_timeout: Duration,
    /// Accept self-signed and otherwise invalid certificates over HTTPS.
    pub accept_invalid_certs: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ports: DEV_PORTS.to_vec(),
            scan_order: ScanOrder::Serial,
            batch_size: 20,
            probe_timeout: Duration::from_secs(1),
            http_timeout: Duration::from_secs(5),
            accept_invalid_certs: false,
        }
    }
}

/// The parts of an HTTP response the fingerprinter looks at.
#[derive(Debug, Clone, Default)]
pub struct HttpReply {
    /// Status line, e.g. "200 OK".
    pub status: String,
    pub headers: HeaderMap,
    /// `None` when the headers arrived but the body could not be read.
    pub body: Option<String>,
}

/// Performs a single GET request.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> anyhow::Result<HttpReply>;
}

/// [`Fetcher`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("devradar/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .no_proxy()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> anyhow::Result<HttpReply> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let status = format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        )
        .trim_end()
        .to_owned();
        let headers = response.headers().clone();
        let body = match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!("Reading body of {url} failed: {e}");
                None
            }
        };

        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }
}

/// Turns one `(host, port)` into a [`ServiceRecord`].
pub struct ServiceFingerprinter {
    prober: Arc<dyn Prober>,
    fetcher: Arc<dyn Fetcher>,
    probe_timeout: Duration,
}

impl ServiceFingerprinter {
    pub fn new(prober: Arc<dyn Prober>, fetcher: Arc<dyn Fetcher>, probe_timeout: Duration) -> Self {
        Self {
            prober,
            fetcher,
            probe_timeout,
        }
    }

    /// Returns `None` when the port is closed.
    ///
    /// An open port always produces a record, even if it turns out not to
    /// speak HTTP at all.
    pub async fn identify(&self, host: Ipv4Addr, port: u16) -> Option<ServiceRecord> {
        let socket = SocketAddr::new(host.into(), port);
        if !self.prober.probe(socket, self.probe_timeout).await {
            return None;
        }

        let mut url = format!("http://{host}:{port}");
        let reply = match self.fetcher.get(&url).await {
            Ok(reply) => reply,
            Err(http_err) => {
                debug!("{url} failed: {http_err:#}");
                url = format!("https://{host}:{port}");
                match self.fetcher.get(&url).await {
                    Ok(reply) => reply,
                    Err(https_err) => {
                        debug!("{url} failed: {https_err:#}");
                        return Some(ServiceRecord::non_http(port, url));
                    }
                }
            }
        };

        let Some(body) = reply.body else {
            return Some(ServiceRecord {
                port,
                service: HTTP_SERVICE.to_owned(),
                status: reply.status,
                url,
                ..ServiceRecord::default()
            });
        };

        let title = fingerprint::extract_title(&body);
        let server = reply
            .headers
            .get(reqwest::header::SERVER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let found: Fingerprint = fingerprint::classify(&body, &reply.headers);

        Some(ServiceRecord {
            port,
            service: fingerprint::service_label(&found, &title, port),
            technology: found.known_technology().to_owned(),
            framework: found.framework.to_owned(),
            title,
            server,
            status: reply.status,
            url,
        })
    }
}

/// Fingerprints the candidate ports of one host.
pub struct PortScanner {
    fingerprinter: ServiceFingerprinter,
    strategy: PortStrategy,
    batch_size: u16,
    observer: Arc<dyn ScanObserver>,
}

impl PortScanner {
    pub fn new(
        fingerprinter: ServiceFingerprinter,
        config: &ServiceConfig,
        observer: Arc<dyn ScanObserver>,
    ) -> Self {
        let strategy = PortStrategy::pick(&config.ports, config.scan_order);
        if strategy.is_empty() {
            warn!("No candidate ports to fingerprint");
        }
        debug!(
            "{} candidate ports after removing repeats, {:?} order",
            strategy.len(),
            config.scan_order
        );

        Self {
            fingerprinter,
            strategy,
            batch_size: config.batch_size,
            observer,
        }
    }

    /// Services found on `host`, sorted by port with no port listed twice.
    pub async fn scan_host(&self, host: Ipv4Addr) -> Vec<ServiceRecord> {
        self.observer.host_scan_started(host);

        let mut services = stream::iter(self.strategy.ordered_iter())
            .map(|port| async move {
                let record = self.fingerprinter.identify(host, port).await;
                if let Some(record) = &record {
                    self.observer.service_found(host, record);
                }
                record
            })
            .buffer_unordered(usize::from(self.batch_size.max(1)))
            .filter_map(future::ready)
            .collect::<Vec<_>>()
            .await;

        services.sort_unstable_by_key(|service| service.port);
        services.dedup_by_key(|service| service.port);

        debug!("Services on {host}: {services:?}");
        services
    }
}
