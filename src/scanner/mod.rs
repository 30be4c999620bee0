//! Core functionality for actual scanning behaviour.
//!
//! Scanning happens in two stages. [`HostDiscovery`] sweeps a subnet with
//! TCP connect probes against a handful of liveness ports, then a
//! [`PortScanner`] per live host fingerprints every development port that
//! accepts a connection. Each stage has its own concurrency bound.
//!
//! Network access goes through the [`Prober`] and [`Fetcher`] traits so the
//! pipeline can be driven without touching the network.
mod discovery;
mod probe;
mod service;

pub use discovery::{DiscoveryConfig, HostDiscovery};
pub use probe::{Prober, TcpProber};
pub use service::{Fetcher, HttpFetcher, HttpReply, PortScanner, ServiceConfig, ServiceFingerprinter};

use crate::model::ServiceRecord;
use std::net::Ipv4Addr;

/// Hooks called while a scan is running.
///
/// Every method has an empty default. Implementations must return quickly;
/// they are called from inside the scanning tasks.
pub trait ScanObserver: Send + Sync {
    fn discovery_started(&self, _cidr: &str, _addresses: u64) {}

    fn hosts_discovered(&self, _hosts: &[Ipv4Addr]) {}

    /// Called once per live host, before its ports are scanned.
    fn host_scan_started(&self, _host: Ipv4Addr) {}

    fn service_found(&self, _host: Ipv4Addr, _service: &ServiceRecord) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}
