//! Terminal output: status macros, banner, result tables and the progress
//! observer.
use crate::model::{HostResult, ScanSummary, ServiceRecord};
use crate::scanner::ScanObserver;
#[doc(hidden)]
pub use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::{net::Ipv4Addr, time::Duration};

/// Red `[!]` line. Silent in greppable mode, undecorated in accessible mode.
#[macro_export]
macro_rules! warning {
    ($name:expr) => {
        println!("{} {}", $crate::tui::Colorize::bold($crate::tui::Colorize::red("[!]")), $name);
    };
    ($name:expr, $greppable:expr, $accessible:expr) => {
        if !$greppable {
            if $accessible {
                println!("{}", $name);
            } else {
                println!("{} {}", $crate::tui::Colorize::bold($crate::tui::Colorize::red("[!]")), $name);
            }
        }
    };
}

/// Blue `[~]` line for progress details.
#[macro_export]
macro_rules! detail {
    ($name:expr) => {
        println!("{} {}", $crate::tui::Colorize::bold($crate::tui::Colorize::blue("[~]")), $name);
    };
    ($name:expr, $greppable:expr, $accessible:expr) => {
        if !$greppable {
            if $accessible {
                println!("{}", $name);
            } else {
                println!("{} {}", $crate::tui::Colorize::bold($crate::tui::Colorize::blue("[~]")), $name);
            }
        }
    };
}

/// Green `[>]` line for findings.
#[macro_export]
macro_rules! output {
    ($name:expr) => {
        println!("{} {}", $crate::tui::Colorize::bold($crate::tui::Colorize::green("[>]")), $name);
    };
    ($name:expr, $greppable:expr, $accessible:expr) => {
        if !$greppable {
            if $accessible {
                println!("{}", $name);
            } else {
                println!("{} {}", $crate::tui::Colorize::bold($crate::tui::Colorize::green("[>]")), $name);
            }
        }
    };
}

const BANNER: &str = r"
     _                          _
  __| | _____   ___ __ __ _  __| | __ _ _ __
 / _` |/ _ \ \ / / '__/ _` |/ _` |/ _` | '__|
| (_| |  __/\ V /| | | (_| | (_| | (_| | |
 \__,_|\___| \_/ |_|  \__,_|\__,_|\__,_|_|
";

/// Width of the technology distribution bars.
const BAR_WIDTH: usize = 30;

pub fn print_banner() {
    println!("{}", BANNER.bright_green());
    println!(
        "{}\n",
        format!("devradar {}: find the dev servers on your network", env!("CARGO_PKG_VERSION"))
            .bright_black()
    );
}

/// Prints every host and its services.
///
/// Greppable mode prints one `ip,hostname,port,service,technology,status,url`
/// line per service and nothing else.
pub fn print_results(results: &[HostResult], greppable: bool, accessible: bool) {
    if greppable {
        for host in results {
            for service in &host.services {
                println!("{}", greppable_line(host, service));
            }
        }
        return;
    }

    if results.is_empty() {
        warning!("No development servers found.", greppable, accessible);
        return;
    }

    for host in results {
        let name = if host.hostname.is_empty() {
            host.ip.to_string()
        } else {
            format!("{} ({})", host.ip, host.hostname)
        };
        if accessible {
            println!("\nHost {name}");
        } else {
            println!("\n{}", name.bold().underline());
        }
        for service in &host.services {
            print_service(service, accessible);
        }
    }
}

fn print_service(service: &ServiceRecord, accessible: bool) {
    if accessible {
        println!("  Port {}: {}, status {}", service.port, service.service, service.status);
    } else {
        println!(
            "  {} {} {}",
            format!("{:>5}", service.port).cyan().bold(),
            service.service.green(),
            format!("[{}]", service.status).bright_black()
        );
    }

    let details = [
        ("Technology", &service.technology),
        ("Framework", &service.framework),
        ("Title", &service.title),
        ("Server", &service.server),
        ("URL", &service.url),
    ];
    for (label, value) in details.iter().filter(|(_, value)| !value.is_empty()) {
        println!("        {label}: {value}");
    }
}

fn greppable_line(host: &HostResult, service: &ServiceRecord) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        host.ip,
        host.hostname,
        service.port,
        service.service,
        service.technology,
        service.status,
        service.url
    )
}

pub fn print_summary(summary: &ScanSummary, greppable: bool, accessible: bool) {
    if greppable {
        return;
    }

    println!();
    output!(
        format!(
            "{} hosts running {} services",
            summary.total_hosts, summary.total_services
        ),
        greppable,
        accessible
    );

    let Some(&(_, most)) = summary.technologies.first() else {
        return;
    };
    let name_width = summary
        .technologies
        .iter()
        .map(|(tech, _)| tech.len())
        .max()
        .unwrap_or_default();

    for (tech, count) in &summary.technologies {
        if accessible {
            println!("  {tech}: {count}");
        } else {
            println!(
                "  {tech:<name_width$} {} {count}",
                distribution_bar(*count, most).blue()
            );
        }
    }
}

/// A bar proportional to `count / most`, never empty for a non-zero count.
fn distribution_bar(count: usize, most: usize) -> String {
    let filled = if most == 0 {
        0
    } else {
        (count * BAR_WIDTH / most).max(usize::from(count > 0))
    };
    "█".repeat(filled)
}

/// Reports scan progress on the terminal.
///
/// Discovery shows a spinner; it is hidden in greppable mode.
pub struct TerminalObserver {
    spinner: ProgressBar,
    greppable: bool,
    accessible: bool,
}

impl TerminalObserver {
    pub fn new(greppable: bool, accessible: bool) -> Self {
        let spinner = if greppable || accessible {
            ProgressBar::hidden()
        } else {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg} [{elapsed}]") {
                spinner.set_style(style);
            }
            spinner
        };
        Self {
            spinner,
            greppable,
            accessible,
        }
    }
}

impl ScanObserver for TerminalObserver {
    fn discovery_started(&self, cidr: &str, addresses: u64) {
        if self.accessible {
            detail!(
                format!("Discovering hosts in {cidr} ({addresses} addresses)"),
                self.greppable,
                self.accessible
            );
            return;
        }
        self.spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner
            .set_message(format!("Discovering hosts in {cidr} ({addresses} addresses)"));
    }

    fn hosts_discovered(&self, hosts: &[Ipv4Addr]) {
        self.spinner.finish_and_clear();
        detail!(
            format!("{} live hosts found", hosts.len()),
            self.greppable,
            self.accessible
        );
    }

    fn host_scan_started(&self, host: Ipv4Addr) {
        detail!(
            format!("Scanning {host} for development servers..."),
            self.greppable,
            self.accessible
        );
    }

    fn service_found(&self, host: Ipv4Addr, service: &ServiceRecord) {
        output!(
            format!("{host}:{} {}", service.port, service.service),
            self.greppable,
            self.accessible
        );
    }
}
