use dns_lookup::lookup_host;
use std::net::{IpAddr, Ipv4Addr};

/// Resolve `hostname` to the IPv4 address raw ICMPv4 probes are sent to.
pub async fn resolve_ipv4(hostname: &str) -> anyhow::Result<Ipv4Addr> {
    // First try to parse as IP address
    if let Ok(ip) = hostname.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => Ok(v4),
            IpAddr::V6(_) => Err(anyhow::anyhow!("IPv6 address '{}' cannot be probed over ICMPv4", hostname)),
        };
    }

    // Perform DNS lookup
    let addresses = tokio::task::spawn_blocking({
        let hostname = hostname.to_string();
        move || lookup_host(&hostname)
    })
    .await??;

    if addresses.is_empty() {
        return Err(anyhow::anyhow!("No addresses found for hostname: {}", hostname));
    }

    addresses
        .into_iter()
        .find_map(|addr| match addr {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| anyhow::anyhow!("No IPv4 addresses found for hostname: {}", hostname))
}
