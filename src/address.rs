//! Provides functions to parse CIDR blocks, locate the local network and
//! resolve host names.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use cidr_utils::cidr::Ipv4Cidr;
use hickory_resolver::{
    config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};
use log::debug;
use pnet::datalink;
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use tokio::{fs, io, net::UdpSocket};

/// Where the local network locator pretends to send traffic. Connecting a
/// UDP socket sends no packets, it only selects the outbound interface.
const ROUTE_PROBE: &str = "8.8.8.8:80";

/// Parses an IPv4 CIDR block such as `192.168.1.0/24`.
///
/// A bare address is accepted as a `/32`. Host bits must be zero.
///
/// ```rust
/// # use devradar::address::{parse_cidr, hosts};
/// let block = parse_cidr("192.168.0.0/30").unwrap();
/// assert_eq!(hosts(&block).count(), 4);
/// ```
pub fn parse_cidr(cidr: &str) -> anyhow::Result<Ipv4Cidr> {
    Ipv4Cidr::from_str(cidr.trim()).with_context(|| format!("Invalid IPv4 CIDR {cidr:?}"))
}

/// Number of addresses in `block`, network and broadcast included.
pub fn block_size(block: &Ipv4Cidr) -> u64 {
    1u64 << (32 - u32::from(block.network_length()))
}

/// Every address of `block` in ascending order, network and broadcast
/// included.
pub fn hosts(block: &Ipv4Cidr) -> impl Iterator<Item = Ipv4Addr> + use<'_> {
    block.iter().map(|inet| inet.address())
}

/// The machine's outbound address and the block to scan around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNetwork {
    pub ip: Ipv4Addr,
    pub cidr: String,
}

/// Finds the local IPv4 address used for outbound traffic and the network
/// of the interface that owns it.
///
/// Falls back to the `/24` around the address when no up, non-loopback
/// interface carries it.
pub async fn local_network() -> anyhow::Result<LocalNetwork> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("Could not open a UDP socket")?;
    socket
        .connect(ROUTE_PROBE)
        .await
        .context("No usable network interface")?;
    let local = socket
        .local_addr()
        .context("Could not read the local address")?;

    let ip = match local.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() && !ip.is_loopback() => ip,
        other => bail!("No usable IPv4 network interface (outbound address is {other})"),
    };

    let networks: Vec<Ipv4Network> = datalink::interfaces()
        .into_iter()
        .filter(|interface| interface.is_up() && !interface.is_loopback())
        .flat_map(|interface| interface.ips)
        .filter_map(|network| match network {
            IpNetwork::V4(network) => Some(network),
            IpNetwork::V6(_) => None,
        })
        .collect();
    debug!("IPv4 networks on up interfaces: {networks:?}");

    Ok(LocalNetwork {
        ip,
        cidr: network_containing(ip, &networks),
    })
}

/// CIDR of the first network that holds `ip`, or the `/24` around it.
fn network_containing(ip: Ipv4Addr, networks: &[Ipv4Network]) -> String {
    match networks.iter().find(|network| network.contains(ip)) {
        Some(network) => format!("{}/{}", network.network(), network.prefix()),
        None => {
            debug!("No interface owns {ip}, assuming a /24");
            surrounding_24(ip)
        }
    }
}

fn surrounding_24(ip: Ipv4Addr) -> String {
    let [a, b, c, _] = ip.octets();
    format!("{a}.{b}.{c}.0/24")
}

/// Best-effort reverse DNS.
#[async_trait]
pub trait ReverseResolver: Send + Sync {
    /// Host name without the trailing dot, or an empty string.
    async fn hostname(&self, ip: Ipv4Addr) -> String;
}

/// Reverse lookups through hickory.
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn new(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ReverseResolver for DnsResolver {
    async fn hostname(&self, ip: Ipv4Addr) -> String {
        match self.resolver.reverse_lookup(IpAddr::V4(ip)).await {
            Ok(lookup) => lookup
                .iter()
                .next()
                .map(|name| name.to_string().trim_end_matches('.').to_owned())
                .unwrap_or_default(),
            Err(e) => {
                debug!("Reverse lookup of {ip} failed: {e}");
                String::new()
            }
        }
    }
}

/// Used with `--no-dns`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResolver;

#[async_trait]
impl ReverseResolver for NoResolver {
    async fn hostname(&self, _ip: Ipv4Addr) -> String {
        String::new()
    }
}

/// Derive a DNS resolver.
///
/// 1. if the `resolver` parameter has been set:
///     1. assume the parameter is a path and attempt to read IPs.
///     2. parse the input as a comma-separated list of IPs.
/// 2. if `resolver` is not set:
///    1. attempt to derive a resolver from the system config. (e.g.
///       `/etc/resolv.conf` on *nix).
///    2. finally, build a CloudFlare-based resolver.
///
/// Lookups are tried once with a short timeout.
pub async fn get_resolver(resolver: &Option<String>) -> TokioAsyncResolver {
    let mut opts = ResolverOpts::default();
    opts.attempts = 1;
    opts.timeout = Duration::from_secs(2);

    match resolver {
        Some(r) => {
            let mut config = ResolverConfig::new();
            let resolver_ips = match read_resolver_from_file(r).await {
                Ok(ips) => ips,
                Err(_) => r
                    .split(',')
                    .filter_map(|r| IpAddr::from_str(r.trim()).ok())
                    .collect::<Vec<_>>(),
            };
            for ip in resolver_ips {
                config.add_name_server(NameServerConfig::new(
                    SocketAddr::new(ip, 53),
                    Protocol::Udp,
                ));
            }
            TokioAsyncResolver::tokio(config, opts)
        }
        None => match hickory_resolver::system_conf::read_system_conf() {
            Ok((config, _)) => TokioAsyncResolver::tokio(config, opts),
            Err(_) => TokioAsyncResolver::tokio(ResolverConfig::cloudflare_tls(), opts),
        },
    }
}

/// Parses an input file of IPs for use in DNS resolution.
async fn read_resolver_from_file(path: &str) -> io::Result<Vec<IpAddr>> {
    let ips = fs::read_to_string(path)
        .await?
        .lines()
        .filter_map(|line| IpAddr::from_str(line.trim()).ok())
        .collect();

    Ok(ips)
}
