//! Provides a means to read, parse and hold configuration options for scans.
use crate::scanner::{DiscoveryConfig, ServiceConfig};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use itertools::Itertools;
use serde_derive::Deserialize;
use std::fs;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

const LOWEST_PORT_NUMBER: u16 = 1;
const TOP_PORT_NUMBER: u16 = 65535;

/// Ports that mark a host as alive. Development ports come first, then
/// services most machines expose anyway.
pub const LIVENESS_PORTS: [u16; 12] = [3000, 8080, 8000, 5000, 4200, 8888, 22, 80, 443, 135, 139, 445];

/// Ports fingerprinted on every live host, grouped by the stacks that
/// default to them. Several stacks share ports, hence the repeats.
pub const DEV_PORTS: [u16; 49] = [
    // Node.js, React, Next.js
    3000, 3001, 3002, 3003, 3004, 3005,
    // Django, Flask
    8000, 8001, 8002, 5000, 5001, 5002,
    // Spring Boot
    8080, 8081, 8082, 8090, 9000, 9001,
    // .NET
    5000, 5001, 7000, 7001, 44300, 44301,
    // Angular CLI
    4200, 4201, 4202,
    // Vue
    8080, 8081,
    // general
    8888, 9090, 9999, 10000,
    // Jupyter
    8888, 8889,
    // webpack dev server
    8080, 3000,
    // PHP
    8000, 8080,
    // Rails
    3000, 4000,
    // Go
    8080, 8000,
    // other
    6000, 6001, 7000, 7001, 7777, 8888,
];

/// Represents the order in which development ports are scanned.
///   - Serial keeps the candidate list order.
///   - Random shuffles it.
#[derive(Deserialize, Debug, ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
    Serial,
    Random,
}

pub type Ports = Vec<u16>;

/// Parses a port list such as `3000-3005,8080, 4200`.
///
/// Order is kept and repeated ports are dropped, so the result can be used
/// as a serial scan order.
pub fn parse_ports_and_ranges(input: &str) -> Result<Ports, String> {
    let mut ports = Vec::new();
    for part in input.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => ports.extend(parse_port_range(part, start, end)?),
            None => ports.push(parse_port(part)?),
        }
    }

    if ports.is_empty() {
        return Err("No ports given".to_owned());
    }
    Ok(ports.into_iter().unique().collect())
}

fn parse_port_range(range: &str, start: &str, end: &str) -> Result<RangeInclusive<u16>, String> {
    if end.contains('-') {
        return Err(format!("Invalid range '{range}', expected start-end, e.g. 3000-3005"));
    }
    let (start, end) = (parse_port(start.trim())?, parse_port(end.trim())?);
    if start > end {
        return Err(format!("Invalid range '{range}', {start} is above {end}"));
    }
    Ok(start..=end)
}

fn parse_port(port: &str) -> Result<u16, String> {
    match port.parse::<u16>() {
        Ok(port) if port >= LOWEST_PORT_NUMBER => Ok(port),
        _ => Err(format!(
            "Invalid port '{port}', ports go from {LOWEST_PORT_NUMBER} to {TOP_PORT_NUMBER}"
        )),
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "devradar",
    version = env!("CARGO_PKG_VERSION"),
    max_term_width = 120,
    help_template = "{bin} {version}\n{about}\n\nUSAGE:\n    {usage}\n\nOPTIONS:\n{options}",
)]
#[allow(clippy::struct_excessive_bools)]
/// Finds development web servers on your local network and guesses the
/// stack behind them.
/// Only scan networks you are allowed to scan.
pub struct Opts {
    /// IPv4 block to scan, e.g. 192.168.1.0/24. Defaults to the /24 around
    /// this machine's outbound address.
    #[arg(long)]
    pub cidr: Option<String>,

    /// Development ports to fingerprint on every live host. Examples: 3000,8080 or 3000-3005,8080
    #[arg(short, long, value_parser = parse_ports_and_ranges)]
    pub ports: Option<Ports>,

    /// Ports that mark a host as alive during discovery.
    #[arg(long, value_parser = parse_ports_and_ranges)]
    pub liveness_ports: Option<Ports>,

    /// Whether to ignore the configuration file or not.
    #[arg(short, long)]
    pub no_config: bool,

    /// Hide the banner
    #[arg(long)]
    pub no_banner: bool,

    /// Custom path to config file
    #[arg(short, long, value_parser)]
    pub config_path: Option<PathBuf>,

    /// Greppable mode. Only print one line per service.
    #[arg(short, long)]
    pub greppable: bool,

    /// Accessible mode. Turns off features which negatively affect screen readers.
    #[arg(long)]
    pub accessible: bool,

    /// A comma-delimited list or file of DNS resolvers used for reverse lookups.
    #[arg(long)]
    pub resolver: Option<String>,

    /// Skip reverse DNS lookups.
    #[arg(long)]
    pub no_dns: bool,

    /// How many addresses are probed at the same time during discovery.
    /// Depends on the open file limit of your OS.
    #[arg(short, long, default_value = "100")]
    pub batch_size: u16,

    /// How many ports of a single host are fingerprinted at the same time.
    #[arg(long, default_value = "20")]
    pub port_batch_size: u16,

    /// Discovery connect timeout in milliseconds.
    #[arg(short, long, default_value = "500")]
    pub timeout: u32,

    /// Connect timeout in milliseconds before a development port is assumed to be closed.
    #[arg(long, default_value = "1000")]
    pub service_timeout: u32,

    /// HTTP request timeout in milliseconds.
    #[arg(long, default_value = "5000")]
    pub http_timeout: u32,

    /// Accept invalid TLS certificates when falling back to HTTPS.
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Automatically ups the ULIMIT with the value you provided.
    #[arg(short, long)]
    pub ulimit: Option<u64>,

    /// The order in which development ports are scanned.
    #[arg(long, value_enum, ignore_case = true, default_value = "serial")]
    pub scan_order: ScanOrder,
}

#[cfg(not(tarpaulin_include))]
impl Opts {
    pub fn read() -> Self {
        Opts::parse()
    }

    /// Reads the command line arguments into an Opts struct and merge
    /// values found within the user configuration file.
    pub fn merge(&mut self, config: &Config) {
        if !self.no_config {
            self.merge_required(config);
            self.merge_optional(config);
        }
    }

    fn merge_required(&mut self, config: &Config) {
        macro_rules! merge_required {
            ($($field: ident),+) => {
                $(
                    if let Some(e) = &config.$field {
                        self.$field = e.clone();
                    }
                )+
            }
        }

        merge_required!(
            greppable,
            accessible,
            no_dns,
            batch_size,
            port_batch_size,
            timeout,
            service_timeout,
            http_timeout,
            insecure,
            scan_order
        );
    }

    fn merge_optional(&mut self, config: &Config) {
        macro_rules! merge_optional {
            ($($field: ident),+) => {
                $(
                    if config.$field.is_some() {
                        self.$field = config.$field.clone();
                    }
                )+
            }
        }

        merge_optional!(cidr, ports, liveness_ports, resolver, ulimit);
    }

    /// Lowers the discovery batch size when the open file limit cannot
    /// sustain it. Returns the batch size in use.
    pub fn fit_to_ulimit(&mut self, ulimit: u64) -> u16 {
        let batch_size = u64::from(self.batch_size);
        if ulimit < batch_size {
            let fitted = (ulimit / 2).max(1);
            self.batch_size = u16::try_from(fitted).unwrap_or(u16::MAX);
        }
        self.batch_size
    }

    /// Whether two hosts scanned at once could already run out of file
    /// descriptors. Probes failing that way are reported as closed ports.
    pub fn port_batch_exceeds_ulimit(&self, ulimit: u64) -> bool {
        ulimit < u64::from(self.port_batch_size) * 2
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            liveness_ports: self
                .liveness_ports
                .clone()
                .unwrap_or_else(|| LIVENESS_PORTS.to_vec()),
            probe_timeout: Duration::from_millis(self.timeout.into()),
            batch_size: self.batch_size,
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            ports: self.ports.clone().unwrap_or_else(|| DEV_PORTS.to_vec()),
            scan_order: self.scan_order,
            batch_size: self.port_batch_size,
            probe_timeout: Duration::from_millis(self.service_timeout.into()),
            http_timeout: Duration::from_millis(self.http_timeout.into()),
            accept_invalid_certs: self.insecure,
        }
    }
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            cidr: None,
            ports: None,
            liveness_ports: None,
            no_config: true,
            no_banner: false,
            config_path: None,
            greppable: true,
            accessible: false,
            resolver: None,
            no_dns: false,
            batch_size: 100,
            port_batch_size: 20,
            timeout: 500,
            service_timeout: 1000,
            http_timeout: 5000,
            insecure: false,
            ulimit: None,
            scan_order: ScanOrder::Serial,
        }
    }
}

/// Struct used to deserialize the options specified within our config file.
/// These will be further merged with our command line arguments in order to
/// generate the final Opts struct.
#[cfg(not(tarpaulin_include))]
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    cidr: Option<String>,
    ports: Option<Vec<u16>>,
    liveness_ports: Option<Vec<u16>>,
    greppable: Option<bool>,
    accessible: Option<bool>,
    resolver: Option<String>,
    no_dns: Option<bool>,
    batch_size: Option<u16>,
    port_batch_size: Option<u16>,
    timeout: Option<u32>,
    service_timeout: Option<u32>,
    http_timeout: Option<u32>,
    insecure: Option<bool>,
    ulimit: Option<u64>,
    scan_order: Option<ScanOrder>,
}

#[cfg(not(tarpaulin_include))]
impl Config {
    /// Reads the configuration file with TOML format and parses it into a
    /// Config struct. A missing file is an empty config.
    ///
    /// # Format
    ///
    /// cidr = "192.168.1.0/24"
    /// ports = [3000, 8000, 8080]
    /// greppable = true
    /// scan_order = "Serial"
    /// http_timeout = 3000
    ///
    pub fn read(custom_config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config_path = match custom_config_path {
            Some(path) => path,
            None => match default_config_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Could not read {}", config_path.display()))?;
        Self::parse(&content).with_context(|| format!("Found an error in {}", config_path.display()))
    }

    fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Constructs default path to config toml
pub fn default_config_path() -> Option<PathBuf> {
    let mut config_path = dirs::home_dir()?;
    config_path.push(".devradar.toml");
    Some(config_path)
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use parameterized::parameterized;
    use std::time::Duration;

    use super::{parse_ports_and_ranges, Config, Opts, ScanOrder, DEV_PORTS, LIVENESS_PORTS};

    impl Config {
        fn sample() -> Self {
            Self {
                cidr: Some("10.0.0.0/24".to_owned()),
                ports: None,
                liveness_ports: None,
                greppable: Some(true),
                accessible: Some(true),
                resolver: None,
                no_dns: Some(true),
                batch_size: Some(250),
                port_batch_size: Some(10),
                timeout: Some(1_000),
                service_timeout: None,
                http_timeout: Some(2_000),
                insecure: None,
                ulimit: None,
                scan_order: Some(ScanOrder::Random),
            }
        }
    }

    #[test]
    fn verify_cli() {
        Opts::command().debug_assert();
    }

    #[parameterized(input = {
        vec!["devradar"],
        vec!["devradar", "--cidr", "192.168.1.0/24"],
        vec!["devradar", "-p", "3000,8080", "--scan-order", "random"],
        vec!["devradar", "-t", "250", "-b", "50", "--no-dns", "-k"],
    })]
    fn parse_command_lines(input: Vec<&str>) {
        Opts::try_parse_from(input).unwrap();
    }

    #[test]
    fn cli_defaults_match_pipeline_defaults() {
        let opts = Opts::parse_from(["devradar"]);

        assert_eq!(opts.discovery_config(), crate::scanner::DiscoveryConfig::default());
        assert_eq!(opts.service_config(), crate::scanner::ServiceConfig::default());
    }

    #[test]
    fn opts_no_merge_when_config_is_ignored() {
        let mut opts = Opts::default();
        let config = Config::sample();

        opts.merge(&config);

        assert_eq!(opts.cidr, None);
        assert!(!opts.accessible);
        assert_eq!(opts.timeout, 500);
        assert_eq!(opts.scan_order, ScanOrder::Serial);
    }

    #[test]
    fn opts_merge_required_arguments() {
        let mut opts = Opts::default();
        let config = Config::sample();

        opts.merge_required(&config);

        assert_eq!(opts.greppable, config.greppable.unwrap());
        assert_eq!(opts.accessible, config.accessible.unwrap());
        assert_eq!(opts.batch_size, config.batch_size.unwrap());
        assert_eq!(opts.port_batch_size, config.port_batch_size.unwrap());
        assert_eq!(opts.timeout, config.timeout.unwrap());
        assert_eq!(opts.http_timeout, config.http_timeout.unwrap());
        assert_eq!(opts.service_timeout, 1000);
        assert_eq!(opts.scan_order, config.scan_order.unwrap());
        assert!(opts.no_dns);
    }

    #[test]
    fn opts_merge_optional_arguments() {
        let mut opts = Opts::default();
        let mut config = Config::sample();
        config.ports = Some(vec![3000, 8080]);
        config.ulimit = Some(1_000);
        config.resolver = Some("1.1.1.1".to_owned());

        opts.merge_optional(&config);

        assert_eq!(opts.cidr, config.cidr);
        assert_eq!(opts.ports, Some(vec![3000, 8080]));
        assert_eq!(opts.ulimit, config.ulimit);
        assert_eq!(opts.resolver, config.resolver);
        assert_eq!(opts.liveness_ports, None);
    }

    #[test]
    fn config_from_toml() {
        let config = Config::parse(
            r#"
            cidr = "192.168.1.0/24"
            ports = [3000, 8000]
            scan_order = "Random"
            http_timeout = 3000
            "#,
        )
        .unwrap();

        assert_eq!(config.cidr.as_deref(), Some("192.168.1.0/24"));
        assert_eq!(config.ports, Some(vec![3000, 8000]));
        assert_eq!(config.scan_order, Some(ScanOrder::Random));
        assert_eq!(config.http_timeout, Some(3000));
    }

    #[test]
    fn broken_toml_is_an_error() {
        assert!(Config::parse("ports = [3000,").is_err());
        assert!(Config::parse("timeout = \"soon\"").is_err());
    }

    #[test]
    fn missing_config_file_is_empty_config() {
        let config = Config::read(Some("/definitely/not/here/.devradar.toml".into())).unwrap();
        assert!(config.cidr.is_none());
    }

    #[test]
    fn configs_from_opts() {
        let opts = Opts {
            ports: Some(vec![3000]),
            liveness_ports: Some(vec![22]),
            timeout: 100,
            http_timeout: 750,
            insecure: true,
            ..Opts::default()
        };

        let discovery = opts.discovery_config();
        assert_eq!(discovery.liveness_ports, vec![22]);
        assert_eq!(discovery.probe_timeout, Duration::from_millis(100));

        let service = opts.service_config();
        assert_eq!(service.ports, vec![3000]);
        assert_eq!(service.http_timeout, Duration::from_millis(750));
        assert!(service.accept_invalid_certs);
    }

    #[test]
    fn default_port_lists() {
        assert_eq!(Opts::default().discovery_config().liveness_ports, LIVENESS_PORTS);
        assert_eq!(Opts::default().service_config().ports, DEV_PORTS);
    }

    #[test]
    fn batch_size_fits_small_ulimit() {
        let mut opts = Opts::default();
        assert_eq!(opts.fit_to_ulimit(64), 32);

        let mut opts = Opts::default();
        assert_eq!(opts.fit_to_ulimit(10_000), 100);
    }

    #[test]
    fn port_batch_against_ulimit() {
        let opts = Opts {
            port_batch_size: 600,
            ..Opts::default()
        };
        assert!(opts.port_batch_exceeds_ulimit(1024));
        assert!(!opts.port_batch_exceeds_ulimit(1200));
        assert!(!Opts::default().port_batch_exceeds_ulimit(1024));
    }

    #[parameterized(input = {
        "80",
        "8080,443,3000-3002",
        "80, 443, 1 - 3, 8080",
        "3000,8080,3000,8080",
        "3000-3002,3001,,",
    }, expected = {
        vec![80],
        vec![8080, 443, 3000, 3001, 3002],
        vec![80, 443, 1, 2, 3, 8080],
        vec![3000, 8080],
        vec![3000, 3001, 3002],
    })]
    fn port_lists_keep_order_without_repeats(input: &str, expected: Vec<u16>) {
        assert_eq!(parse_ports_and_ranges(input), Ok(expected));
    }

    #[parameterized(input = {
        "",
        " , ",
        "80,abc,443",
        "80,70000,443",
        "80,0,443",
        "80,1-2-3,443",
        "80,5-1,443",
        "80,-5,443",
    }, message = {
        "No ports given",
        "No ports given",
        "Invalid port 'abc'",
        "Invalid port '70000'",
        "Invalid port '0', ports go from 1 to 65535",
        "Invalid range '1-2-3'",
        "Invalid range '5-1', 5 is above 1",
        "Invalid port ''",
    })]
    fn bad_port_lists_are_rejected(input: &str, message: &str) {
        let error = parse_ports_and_ranges(input).unwrap_err();
        assert!(error.contains(message), "{error}");
    }
}
