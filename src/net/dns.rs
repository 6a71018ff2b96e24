//! DNS lookups
//!
//! Queries go through the `host` command against each configured name
//! server in turn, falling back to the system resolver when `host` is
//! missing or nothing answers.

use crate::net::server::Server;
use std::collections::BTreeSet;
use std::fmt;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::process::Command;
use std::time::Duration;
use tracing::debug;

/// Well-known public resolvers
pub const PROVIDERS: &[(&str, &[&str])] = &[
    ("CLOUDFLARE_DNS", &["1.1.1.1", "1.0.0.1"]),
    ("CLOUDFLARE_DNSv6", &["2606:4700:4700::1111", "2606:4700:4700::1001"]),
    ("GOOGLE_DNS", &["8.8.8.8", "8.8.4.4"]),
    ("GOOGLE_DNSv6", &["2001:4860:4860::8888", "2001:4860:4860::8844"]),
    ("OPENDNS", &["208.67.222.222", "208.67.220.220"]),
    ("NORTON_CONNECTSAFE", &["199.85.126.10", "199.85.127.10"]),
    ("COMODO_DNS", &["8.26.56.26", "8.20.247.20"]),
    ("QUAD9_DNS", &["9.9.9.9", "149.112.112.112"]),
    ("VERISIGN_DNS", &["64.6.64.6", "64.6.65.6"]),
];

/// Addresses of one provider
pub fn provider(name: &str) -> Option<Vec<IpAddr>> {
    PROVIDERS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, ips)| ips.iter().filter_map(|ip| ip.parse().ok()).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordType {
    A,
    Aaaa,
}

impl RecordType {
    fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    fn marker(self) -> &'static str {
        match self {
            RecordType::A => "has address",
            RecordType::Aaaa => "has IPv6 address",
        }
    }

    fn matches(self, ip: &IpAddr) -> bool {
        match self {
            RecordType::A => ip.is_ipv4(),
            RecordType::Aaaa => ip.is_ipv6(),
        }
    }
}

/// Resolver over a list of name servers
#[derive(Debug, Clone)]
pub struct Dns {
    nameservers: Vec<IpAddr>,
    timeout: Duration,
}

impl Dns {
    pub const PORT: u16 = 53;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Google (v6 then v4), without probing them
    pub fn new() -> Self {
        let mut nameservers = provider("GOOGLE_DNSv6").unwrap_or_default();
        nameservers.extend(provider("GOOGLE_DNS").unwrap_or_default());
        Self::with_nameservers(nameservers, Self::DEFAULT_TIMEOUT)
    }

    /// System resolver only
    pub fn system() -> Self {
        Self::with_nameservers(Vec::new(), Self::DEFAULT_TIMEOUT)
    }

    pub fn with_nameservers(nameservers: Vec<IpAddr>, timeout: Duration) -> Self {
        Self {
            nameservers,
            timeout,
        }
    }

    /// Keep only name servers accepting TCP on port 53
    ///
    /// If none respond the list is left unchanged.
    pub fn reachable(mut self) -> Self {
        let alive: Vec<IpAddr> = self
            .nameservers
            .iter()
            .copied()
            .filter(|ip| Server::from_ip(*ip).check_service(Self::PORT, self.timeout))
            .collect();

        if alive.is_empty() {
            debug!("No name server responded; keeping configured list");
        } else {
            self.nameservers = alive;
        }
        self
    }

    pub fn nameservers(&self) -> &[IpAddr] {
        &self.nameservers
    }

    /// IPv4 then IPv6 answers
    pub fn query(&self, domain: &str) -> Vec<IpAddr> {
        let mut answers = self.query_v4(domain);
        answers.extend(self.query_v6(domain));
        answers
    }

    pub fn query_v4(&self, domain: &str) -> Vec<IpAddr> {
        self.lookup(domain, RecordType::A)
    }

    pub fn query_v6(&self, domain: &str) -> Vec<IpAddr> {
        self.lookup(domain, RecordType::Aaaa)
    }

    /// Whether the domain resolves to at least one address
    pub fn validate_domain(&self, domain: &str) -> bool {
        !self.query(domain).is_empty()
    }

    fn lookup(&self, domain: &str, record: RecordType) -> Vec<IpAddr> {
        // A literal resolves to itself
        if let Ok(ip) = domain.parse::<IpAddr>() {
            return if record.matches(&ip) { vec![ip] } else { Vec::new() };
        }

        for ns in &self.nameservers {
            if let Some(answers) = self.host_query(domain, record, Some(*ns)) {
                return answers;
            }
        }

        system_lookup(domain, record)
    }

    /// `None` when `host` could not run or the server gave no usable reply
    fn host_query(&self, domain: &str, record: RecordType, ns: Option<IpAddr>) -> Option<Vec<IpAddr>> {
        let mut cmd = Command::new("host");
        cmd.arg("-t")
            .arg(record.as_str())
            .arg("-W")
            .arg(self.timeout.as_secs().max(1).to_string())
            .arg(domain);
        if let Some(ns) = ns {
            cmd.arg(ns.to_string());
        }

        let output = cmd.output().ok()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let answers = parse_host_output(&stdout, record);

        if output.status.success() || !answers.is_empty() {
            Some(answers)
        } else {
            debug!(domain, nameserver = ?ns, "host query failed");
            None
        }
    }
}

impl Default for Dns {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Dns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list: Vec<String> = self.nameservers.iter().map(|ip| ip.to_string()).collect();
        write!(f, "[{}]", list.join(", "))
    }
}

/// Pull addresses out of lines like `example.com has address 1.2.3.4`
fn parse_host_output(stdout: &str, record: RecordType) -> Vec<IpAddr> {
    let mut seen = BTreeSet::new();
    let mut answers = Vec::new();

    for line in stdout.lines() {
        if !line.contains(record.marker()) {
            continue;
        }
        if let Some(ip) = line
            .split_whitespace()
            .last()
            .and_then(|s| s.parse::<IpAddr>().ok())
        {
            if record.matches(&ip) && seen.insert(ip) {
                answers.push(ip);
            }
        }
    }

    answers
}

fn system_lookup(domain: &str, record: RecordType) -> Vec<IpAddr> {
    let mut seen = BTreeSet::new();
    match (domain, 0u16).to_socket_addrs() {
        Ok(addrs) => addrs
            .map(|addr: SocketAddr| addr.ip())
            .filter(|ip| record.matches(ip) && seen.insert(*ip))
            .collect(),
        Err(e) => {
            debug!(domain, error = %e, "System resolver failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_providers() {
        assert_eq!(PROVIDERS.len(), 9);
        let google = provider("GOOGLE_DNS").unwrap();
        assert_eq!(google, vec!["8.8.8.8".parse::<IpAddr>().unwrap(), "8.8.4.4".parse().unwrap()]);
        assert!(provider("NOPE").is_none());

        let dns = Dns::new();
        assert_eq!(dns.nameservers().len(), 4);
        assert!(dns.nameservers()[0].is_ipv6());
    }

    #[test]
    fn test_parse_host_output() {
        let out = "Using domain server:\nName: 8.8.8.8\nAddress: 8.8.8.8#53\n\n\
                   example.com has address 93.184.216.34\n\
                   example.com has address 93.184.216.34\n\
                   example.com has IPv6 address 2606:2800:220:1:248:1893:25c8:1946\n";

        let v4 = parse_host_output(out, RecordType::A);
        assert_eq!(v4, vec!["93.184.216.34".parse::<IpAddr>().unwrap()]);

        let v6 = parse_host_output(out, RecordType::Aaaa);
        assert_eq!(v6.len(), 1);
        assert!(v6[0].is_ipv6());
    }

    #[test]
    fn test_literal_resolves_to_itself() {
        let dns = Dns::system();
        assert_eq!(dns.query_v4("127.0.0.1"), vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);
        assert!(dns.query_v6("127.0.0.1").is_empty());
        assert!(dns.validate_domain("::1"));
    }

    #[test]
    fn test_system_localhost() {
        let dns = Dns::system();
        assert!(dns.validate_domain("localhost"));
        assert!(dns.query("localhost").iter().all(|ip| ip.is_loopback()));
    }

    #[test]
    fn test_display() {
        let dns = Dns::with_nameservers(vec!["1.1.1.1".parse().unwrap()], Duration::from_secs(1));
        assert_eq!(dns.to_string(), "[1.1.1.1]");
    }
}
