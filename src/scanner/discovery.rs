//! Finding the live hosts of a subnet.
use super::{Prober, ScanObserver};
use crate::address;
use crate::input::LIVENESS_PORTS;
use futures::{future, stream, StreamExt};
use log::{debug, warn};
use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

/// Blocks bigger than this still get scanned, with a warning.
const LARGE_BLOCK: u64 = 65_536;

/// Settings for host discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Probed in order; the first open one marks the host alive.
    pub liveness_ports: Vec<u16>,
    pub probe_timeout: Duration,
    /// How many addresses are probed at the same time.
    pub batch_size: u16,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            liveness_ports: LIVENESS_PORTS.to_vec(),
            probe_timeout: Duration::from_millis(500),
            batch_size: 100,
        }
    }
}

/// Sweeps a CIDR block with TCP connect probes.
pub struct HostDiscovery {
    prober: Arc<dyn Prober>,
    config: DiscoveryConfig,
}

impl HostDiscovery {
    pub fn new(prober: Arc<dyn Prober>, config: DiscoveryConfig) -> Self {
        Self { prober, config }
    }

    /// Returns every address of `cidr` that answered on a liveness port,
    /// in ascending numeric order.
    ///
    /// A malformed or non-IPv4 `cidr` is the only error.
    pub async fn run(&self, cidr: &str, observer: &dyn ScanObserver) -> anyhow::Result<Vec<Ipv4Addr>> {
        let block = address::parse_cidr(cidr)?;
        let size = address::block_size(&block);
        if size > LARGE_BLOCK {
            warn!("{cidr} holds {size} addresses, discovery will take a while");
        }
        observer.discovery_started(cidr, size);

        debug!(
            "Start host discovery.\nBatch size {}\nAddresses {}\nLiveness ports {:?}",
            self.config.batch_size, size, self.config.liveness_ports
        );

        let mut hosts = stream::iter(address::hosts(&block))
            .map(|ip| async move { self.is_alive(ip).await.then_some(ip) })
            .buffer_unordered(usize::from(self.config.batch_size.max(1)))
            .filter_map(future::ready)
            .collect::<Vec<_>>()
            .await;

        hosts.sort_unstable();
        hosts.dedup();

        debug!("Live hosts found: {hosts:?}");
        observer.hosts_discovered(&hosts);
        Ok(hosts)
    }

    async fn is_alive(&self, ip: Ipv4Addr) -> bool {
        for &port in &self.config.liveness_ports {
            let socket = SocketAddr::new(ip.into(), port);
            if self.prober.probe(socket, self.config.probe_timeout).await {
                debug!("{ip} is alive, port {port} answered");
                return true;
            }
        }
        false
    }
}
