//! Reachability checks for a single host

use crate::error::{ProbeError, ProbeResult};
use crate::net::dns::Dns;
use std::fmt;
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;

/// A target name and the address it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    target: String,
    ip: IpAddr,
}

impl Server {
    /// Use the target as an IP literal, or its first DNS answer
    pub fn resolve(target: &str) -> ProbeResult<Self> {
        Self::resolve_with(target, &Dns::system())
    }

    pub fn resolve_with(target: &str, dns: &Dns) -> ProbeResult<Self> {
        if let Ok(ip) = target.parse::<IpAddr>() {
            return Ok(Self {
                target: target.to_string(),
                ip,
            });
        }

        let ip = dns
            .query(target)
            .into_iter()
            .next()
            .ok_or_else(|| ProbeError::NoAddress {
                target: target.to_string(),
            })?;

        debug!(target, ip = %ip, "Resolved");
        Ok(Self {
            target: target.to_string(),
            ip,
        })
    }

    pub fn from_ip(ip: IpAddr) -> Self {
        Self {
            target: ip.to_string(),
            ip,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Whether a TCP connection to `port` opens within `timeout`
    pub fn check_service(&self, port: u16, timeout: Duration) -> bool {
        let addr = SocketAddr::new(self.ip, port);
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(_) => true,
            Err(e) => {
                debug!(addr = %addr, error = %e, "Connect failed");
                false
            }
        }
    }

    /// ICMP echo through the system `ping`; true on the first reply
    pub fn ping(&self, tries: u32, timeout: Duration) -> ProbeResult<bool> {
        for attempt in 0..tries.max(1) {
            let status = ping_command(self.ip, timeout)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map_err(|e| ProbeError::Ping(e.to_string()))?;

            if status.success() {
                return Ok(true);
            }
            debug!(ip = %self.ip, attempt, "No echo reply");
        }
        Ok(false)
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target)
    }
}

fn ping_command(ip: IpAddr, timeout: Duration) -> Command {
    let secs = timeout.as_secs().max(1).to_string();
    let mut cmd = Command::new("ping");

    if ip.is_ipv6() {
        cmd.arg("-6");
    }
    cmd.arg("-c").arg("1");

    // macOS takes the reply wait in milliseconds
    if cfg!(target_os = "macos") {
        cmd.arg("-W").arg((timeout.as_millis().max(1)).to_string());
    } else {
        cmd.arg("-W").arg(secs);
    }

    cmd.arg(ip.to_string());
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_literal_target() {
        let server = Server::resolve("127.0.0.1").unwrap();
        assert_eq!(server.to_string(), "127.0.0.1");
        assert!(server.ip().is_loopback());
    }

    #[test]
    fn test_resolve_localhost() {
        let server = Server::resolve("localhost").unwrap();
        assert_eq!(server.target(), "localhost");
        assert!(server.ip().is_loopback());
    }

    #[test]
    fn test_unresolvable_target() {
        let err = Server::resolve("no-such-host.invalid").unwrap_err();
        assert!(matches!(err, ProbeError::NoAddress { .. }));
    }

    #[test]
    fn test_check_service_open_and_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = Server::from_ip("127.0.0.1".parse().unwrap());

        assert!(server.check_service(port, Duration::from_secs(1)));

        drop(listener);
        assert!(!server.check_service(port, Duration::from_secs(1)));
    }

    #[test]
    fn test_ping_command_args() {
        let cmd = ping_command("::1".parse().unwrap(), Duration::from_secs(2));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args.first().map(String::as_str), Some("-6"));
        assert_eq!(args.last().map(String::as_str), Some("::1"));
        assert!(args.contains(&"-c".to_string()));
    }
}
