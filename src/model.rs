//! Records produced by a scan and handed to the presentation layer.
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Status reported for an open port that did not answer HTTP or HTTPS.
pub const NON_HTTP_STATUS: &str = "Open (Non-HTTP)";

/// Label for an open port that did not answer HTTP or HTTPS.
pub const UNKNOWN_TCP_SERVICE: &str = "Unknown TCP Service";

/// Label for an HTTP service whose body could not be read.
pub const HTTP_SERVICE: &str = "HTTP Service";

/// What was learned about a single open port.
///
/// Empty strings mean the field could not be determined. A port that turned
/// out to be closed never becomes a `ServiceRecord`; the fingerprinter
/// returns `None` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRecord {
    pub port: u16,
    /// Human readable classification, e.g. "Django Development Server".
    pub service: String,
    pub technology: String,
    pub framework: String,
    pub title: String,
    /// `Server` response header, verbatim.
    pub server: String,
    /// HTTP status line, or [`NON_HTTP_STATUS`].
    pub status: String,
    /// The scheme, host and port that produced this record.
    pub url: String,
}

impl ServiceRecord {
    /// A port that accepts TCP connections but speaks neither HTTP nor HTTPS.
    pub fn non_http(port: u16, url: String) -> Self {
        Self {
            port,
            service: UNKNOWN_TCP_SERVICE.to_owned(),
            status: NON_HTTP_STATUS.to_owned(),
            url,
            ..Self::default()
        }
    }
}

/// All services found on one live host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResult {
    pub ip: Ipv4Addr,
    /// Reverse DNS name without the trailing dot, empty when unresolvable.
    pub hostname: String,
    /// Sorted ascending by port, no port twice.
    pub services: Vec<ServiceRecord>,
}

/// Totals shown after a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total_hosts: usize,
    pub total_services: usize,
    /// Technology name and how many services run it, most common first.
    pub technologies: Vec<(String, usize)>,
}

impl ScanSummary {
    pub fn from_results(results: &[HostResult]) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for service in results.iter().flat_map(|host| &host.services) {
            if !service.technology.is_empty() {
                *counts.entry(service.technology.as_str()).or_default() += 1;
            }
        }

        let mut technologies: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(tech, count)| (tech.to_owned(), count))
            .collect();
        technologies.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            total_hosts: results.len(),
            total_services: results.iter().map(|host| host.services.len()).sum(),
            technologies,
        }
    }
}
