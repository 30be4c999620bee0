//! Runs discovery and the per-host service scans as one pipeline.
use crate::address::ReverseResolver;
use crate::model::HostResult;
use crate::scanner::{
    DiscoveryConfig, HostDiscovery, HttpFetcher, PortScanner, Prober, ScanObserver, ServiceConfig,
    ServiceFingerprinter, TcpProber,
};
use log::{debug, warn};
use std::{net::Ipv4Addr, sync::Arc};

/// Owns both scanning stages and the reverse resolver.
pub struct Coordinator {
    discovery: HostDiscovery,
    port_scanner: Arc<PortScanner>,
    resolver: Arc<dyn ReverseResolver>,
    observer: Arc<dyn ScanObserver>,
}

impl Coordinator {
    pub fn new(
        discovery: HostDiscovery,
        port_scanner: PortScanner,
        resolver: Arc<dyn ReverseResolver>,
        observer: Arc<dyn ScanObserver>,
    ) -> Self {
        Self {
            discovery,
            port_scanner: Arc::new(port_scanner),
            resolver,
            observer,
        }
    }

    /// Wires the real TCP prober and HTTP client into a coordinator.
    pub fn from_config(
        discovery: DiscoveryConfig,
        service: &ServiceConfig,
        resolver: Arc<dyn ReverseResolver>,
        observer: Arc<dyn ScanObserver>,
    ) -> anyhow::Result<Self> {
        let prober: Arc<dyn Prober> = Arc::new(TcpProber);
        let fetcher = HttpFetcher::new(service.http_timeout, service.accept_invalid_certs)?;
        let fingerprinter =
            ServiceFingerprinter::new(Arc::clone(&prober), Arc::new(fetcher), service.probe_timeout);

        Ok(Self::new(
            HostDiscovery::new(prober, discovery),
            PortScanner::new(fingerprinter, service, Arc::clone(&observer)),
            resolver,
            observer,
        ))
    }

    /// Discovers the live hosts of `cidr` and scans each of them.
    ///
    /// Fails only when `cidr` cannot be parsed.
    pub async fn run(&self, cidr: &str) -> anyhow::Result<Vec<HostResult>> {
        let hosts = self.discovery.run(cidr, self.observer.as_ref()).await?;
        Ok(self.scan(&hosts).await)
    }

    /// Scans every host in its own task and returns the hosts that run at
    /// least one service, sorted by address.
    pub async fn scan(&self, hosts: &[Ipv4Addr]) -> Vec<HostResult> {
        let mut handles = Vec::with_capacity(hosts.len());
        for &ip in hosts {
            let port_scanner = Arc::clone(&self.port_scanner);
            let resolver = Arc::clone(&self.resolver);
            handles.push(tokio::spawn(async move {
                let services = port_scanner.scan_host(ip).await;
                if services.is_empty() {
                    return None;
                }
                let hostname = resolver.hostname(ip).await;
                Some(HostResult {
                    ip,
                    hostname,
                    services,
                })
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(e) => warn!("A host scan task failed: {e}"),
            }
        }

        results.sort_unstable_by_key(|result| result.ip);
        debug!("{} of {} hosts run development services", results.len(), hosts.len());
        results
    }
}
