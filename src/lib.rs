//! This crate exposes the internal functionality of the devradar scanner.
//!
//! devradar finds the development web servers running on a local network.
//! It sweeps an IPv4 block for live hosts with plain TCP connect probes, then
//! requests every open development port over HTTP (falling back to HTTPS)
//! and guesses the technology behind it from the response.
//!
//! ## Architecture Overview
//!
//! 1. **Input Processing**: [`input::Opts`] and the TOML [`input::Config`]
//!    are merged into a [`scanner::DiscoveryConfig`] and a
//!    [`scanner::ServiceConfig`].
//! 2. **Host Discovery**: [`scanner::HostDiscovery`] probes each address of
//!    the block on a list of liveness ports.
//! 3. **Service Fingerprinting**: a [`scanner::PortScanner`] per live host
//!    runs the [`fingerprint`] rules against every open port.
//! 4. **Result Processing**: [`coordinator::Coordinator`] collects
//!    [`model::HostResult`]s sorted by address, ready for [`tui`] or any
//!    other consumer.
//!
//! ## Basic Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use devradar::address::NoResolver;
//! use devradar::coordinator::Coordinator;
//! use devradar::model::ScanSummary;
//! use devradar::scanner::{DiscoveryConfig, NoopObserver, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let coordinator = Coordinator::from_config(
//!         DiscoveryConfig::default(),
//!         &ServiceConfig::default(),
//!         Arc::new(NoResolver),
//!         Arc::new(NoopObserver),
//!     )?;
//!
//!     let results = coordinator.run("192.168.1.0/24").await?;
//!     for host in &results {
//!         for service in &host.services {
//!             println!("{}:{} {}", host.ip, service.port, service.service);
//!         }
//!     }
//!
//!     let summary = ScanSummary::from_results(&results);
//!     println!("{} hosts, {} services", summary.total_hosts, summary.total_services);
//!     Ok(())
//! }
//! ```
#![allow(clippy::needless_doctest_main)]

pub mod tui;

pub mod input;

pub mod scanner;

pub mod port_strategy;

pub mod address;

pub mod fingerprint;

pub mod model;

pub mod coordinator;
