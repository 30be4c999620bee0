use devradar::address::{get_resolver, local_network, DnsResolver, NoResolver, ReverseResolver};
use devradar::coordinator::Coordinator;
use devradar::input::{Config, Opts};
use devradar::model::ScanSummary;
use devradar::tui::{print_banner, print_results, print_summary, TerminalObserver};
use devradar::{detail, warning};

use log::{debug, warn};
use std::process;
use std::sync::Arc;
use std::time::Instant;

/// Assumed open file limit when it cannot be read.
#[cfg(unix)]
const DEFAULT_FILE_DESCRIPTORS_LIMIT: u64 = 8000;

#[cfg(not(tarpaulin_include))]
#[tokio::main]
/// Reads the command line and config file, then scans the chosen network
/// and prints what runs on it.
async fn main() {
    env_logger::init();

    let mut opts: Opts = Opts::read();
    let config = match Config::read(opts.config_path.clone()) {
        Ok(config) => config,
        Err(e) => {
            warning!(format!("{e:#}"));
            process::exit(1);
        }
    };
    opts.merge(&config);

    debug!("Main() `opts` arguments are {opts:?}");

    if !opts.greppable && !opts.accessible && !opts.no_banner {
        print_banner();
    }

    #[cfg(unix)]
    {
        let ulimit = adjust_ulimit_size(&opts);
        let batch_size = opts.fit_to_ulimit(ulimit);
        debug!("Discovery batch size is {batch_size} with ulimit {ulimit}");
        if opts.port_batch_exceeds_ulimit(ulimit) {
            warn!("ulimit {ulimit} below twice the port batch size, open ports may be reported closed");
            warning!(
                format!(
                    "Open file limit {ulimit} is too low for --port-batch-size {}. Lower it or raise --ulimit.",
                    opts.port_batch_size
                ),
                opts.greppable,
                opts.accessible
            );
        }
    }

    let cidr = match opts.cidr.clone() {
        Some(cidr) => cidr,
        None => match local_network().await {
            Ok(network) => {
                detail!(
                    format!("Local address {}, scanning {}", network.ip, network.cidr),
                    opts.greppable,
                    opts.accessible
                );
                network.cidr
            }
            Err(e) => {
                warning!(format!("{e:#}. Pass --cidr to choose a network."));
                process::exit(1);
            }
        },
    };

    let resolver: Arc<dyn ReverseResolver> = if opts.no_dns {
        Arc::new(NoResolver)
    } else {
        Arc::new(DnsResolver::new(get_resolver(&opts.resolver).await))
    };
    let observer = Arc::new(TerminalObserver::new(opts.greppable, opts.accessible));

    let coordinator = match Coordinator::from_config(
        opts.discovery_config(),
        &opts.service_config(),
        resolver,
        observer,
    ) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            warning!(format!("{e:#}"));
            process::exit(1);
        }
    };

    let started = Instant::now();
    let results = match coordinator.run(&cidr).await {
        Ok(results) => results,
        Err(e) => {
            warning!(format!("{e:#}"));
            process::exit(1);
        }
    };
    debug!("Scan of {cidr} took {:?}", started.elapsed());

    print_results(&results, opts.greppable, opts.accessible);
    print_summary(&ScanSummary::from_results(&results), opts.greppable, opts.accessible);
}

#[cfg(unix)]
fn adjust_ulimit_size(opts: &Opts) -> u64 {
    use rlimit::Resource;

    if let Some(limit) = opts.ulimit {
        if Resource::NOFILE.set(limit, limit).is_ok() {
            detail!(
                format!("Automatically increasing ulimit value to {limit}."),
                opts.greppable,
                opts.accessible
            );
        } else {
            warning!(
                "ERROR. Failed to set ulimit value.",
                opts.greppable,
                opts.accessible
            );
        }
    }

    Resource::NOFILE
        .get()
        .map_or(DEFAULT_FILE_DESCRIPTORS_LIMIT, |(soft, _)| soft)
}
