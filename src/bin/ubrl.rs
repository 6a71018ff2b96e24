//! ubrl - host reachability and DNS checks
//!
//! Exits non-zero when any check fails.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use examinator::net::{Dns, Server};
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ubrl", version, about = "Ping hosts, probe TCP ports, and query DNS")]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ping a target; prints count, target, ip, and the result
    Ping {
        target: String,

        /// Number of results to collect
        #[arg(long, default_value_t = 1)]
        count: u32,

        /// Seconds to allow for a response
        #[arg(long, default_value_t = 1)]
        timeout: u64,

        /// Tries for each result
        #[arg(long, default_value_t = 1)]
        tries: u32,
    },

    /// Check that a TCP port accepts connections
    Pingport {
        target: String,

        port: u16,

        /// Number of results to collect
        #[arg(long, default_value_t = 1)]
        count: u32,

        /// Seconds to allow for a response
        #[arg(long, default_value_t = 1)]
        timeout: u64,
    },

    /// Query the default name servers for IPv4 and IPv6 addresses
    Query { target: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<bool> {
    match command {
        Command::Ping {
            target,
            count,
            timeout,
            tries,
        } => {
            let server = Server::resolve(&target).context("Failed to resolve target")?;
            let mut results = Vec::with_capacity(count as usize);
            for i in 0..count {
                let ok = server.ping(tries, Duration::from_secs(timeout))?;
                println!("({}, {}, {}, {})", i, server, server.ip(), ok);
                results.push(ok);
            }
            println!("{:?}", results);
            Ok(results.iter().all(|ok| *ok))
        }
        Command::Pingport {
            target,
            port,
            count,
            timeout,
        } => {
            let server = Server::resolve(&target).context("Failed to resolve target")?;
            let mut results = Vec::with_capacity(count as usize);
            for i in 0..count {
                let ok = server.check_service(port, Duration::from_secs(timeout));
                println!("({}, {}, {}, {}, {})", i, server, port, server.ip(), ok);
                results.push(ok);
            }
            println!("{:?}", results);
            Ok(results.iter().all(|ok| *ok))
        }
        Command::Query { target } => {
            let dns = Dns::new().reachable();
            println!("nameservers: {}", dns);
            let results: Vec<String> = dns.query(&target).iter().map(|ip| ip.to_string()).collect();
            println!("results: {:?}", results);
            Ok(!results.is_empty())
        }
    }
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("examinator=debug,ubrl=debug,warn")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
