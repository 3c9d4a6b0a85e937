//! SSRF guard (C1): classify a URL as safe or unsafe for outbound fetch.
//!
//! Two entry points mirror the two places a request can be steered toward an
//! internal target: `preflight` runs once before navigation and is DNS-aware;
//! `should_block_request` runs synchronously for every sub-request the
//! browser issues during a navigation and never touches the network.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tokio::net::lookup_host;
use tracing::{debug, warn};
use url::{Host, Url};

/// Reasons a URL can be rejected, in checking order — first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    InvalidUrl,
    UnsupportedProtocol,
    BlockedLocalhost,
    BlockedPrivateIp,
    BlockedPrivateHostname,
    BlockedPrivateResolution,
}

impl BlockReason {
    /// Stable wire name used in error bodies (`{"error": "..."}`, spec §7).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::UnsupportedProtocol => "unsupported_protocol",
            Self::BlockedLocalhost => "blocked_localhost",
            Self::BlockedPrivateIp => "blocked_private_ip",
            Self::BlockedPrivateHostname => "blocked_private_hostname",
            Self::BlockedPrivateResolution => "blocked_private_resolution",
        }
    }
}

/// Hostname suffixes that are always treated as private network names.
const PRIVATE_HOSTNAME_SUFFIXES: &[&str] = &[
    ".internal",
    ".intranet",
    ".home",
    ".lan",
    ".corp",
    ".test",
    ".example",
    ".invalid",
];

const LOCALHOST_SUFFIXES: &[&str] = &[".localhost", ".local"];

fn is_localhost_name(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host.is_empty()
        || host == "localhost"
        || host == "ip6-localhost"
        || LOCALHOST_SUFFIXES.iter().any(|suf| host.ends_with(suf))
}

fn is_private_hostname(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    PRIVATE_HOSTNAME_SUFFIXES.iter().any(|suf| host.ends_with(suf))
}

/// Classify an IPv4 address as private/reserved per the checking rules of
/// spec §4.1: loopback, RFC-1918, link-local, reserved, unspecified.
#[must_use]
pub fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    if ip.is_loopback() || ip.is_link_local() || ip.is_unspecified() || ip.is_broadcast() {
        return true;
    }
    let octets = ip.octets();
    // RFC 1918
    if octets[0] == 10 {
        return true;
    }
    if octets[0] == 172 && (16..=31).contains(&octets[1]) {
        return true;
    }
    if octets[0] == 192 && octets[1] == 168 {
        return true;
    }
    // Carrier-grade NAT, RFC 6598
    if octets[0] == 100 && (64..=127).contains(&octets[1]) {
        return true;
    }
    // Documentation / reserved ranges
    if octets[0] == 0 {
        return true;
    }
    if octets[0] == 192 && octets[1] == 0 && (octets[2] == 0 || octets[2] == 2) {
        return true;
    }
    if octets[0] == 198 && (octets[1] == 18 || octets[1] == 19 || octets[1] == 51) {
        return true;
    }
    if octets[0] == 203 && octets[1] == 0 && octets[2] == 113 {
        return true;
    }
    if octets[0] >= 240 {
        return true;
    }
    false
}

/// Classify an IPv6 address as private per spec §4.1: loopback, link-local,
/// unique-local. IPv4-mapped addresses are unwrapped and re-checked as IPv4.
#[must_use]
pub fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(v4);
    }
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    let segments = ip.segments();
    // fe80::/10 link-local
    if (segments[0] & 0xffc0) == 0xfe80 {
        return true;
    }
    // fc00::/7 unique-local
    if (segments[0] & 0xfe00) == 0xfc00 {
        return true;
    }
    false
}

#[must_use]
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => is_private_ipv6(v6),
    }
}

/// Parse `url` and classify it against every check that does not require a
/// network round-trip: scheme, localhost names, literal private IPs, and
/// private hostname suffixes. Returns `None` if none of the synchronous
/// reasons apply (the caller may still need to DNS-resolve to be sure).
fn classify_sync(url_str: &str) -> Result<(), BlockReason> {
    let Ok(url) = Url::parse(url_str) else {
        return Err(BlockReason::InvalidUrl);
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(BlockReason::UnsupportedProtocol);
    }

    let Some(host) = url.host() else {
        return Err(BlockReason::InvalidUrl);
    };

    match host {
        Host::Domain(name) => {
            if is_localhost_name(name) {
                return Err(BlockReason::BlockedLocalhost);
            }
            if is_private_hostname(name) {
                return Err(BlockReason::BlockedPrivateHostname);
            }
            Ok(())
        }
        Host::Ipv4(ip) => {
            if is_private_ipv4(ip) {
                return Err(BlockReason::BlockedPrivateIp);
            }
            Ok(())
        }
        Host::Ipv6(ip) => {
            if is_private_ipv6(ip) {
                return Err(BlockReason::BlockedPrivateIp);
            }
            Ok(())
        }
    }
}

/// Asynchronous, DNS-aware preflight check run once before navigation.
///
/// Fail-closed: any DNS lookup error (including "no such host") is treated
/// as `blocked_private_resolution`.
pub async fn preflight(url_str: &str) -> Result<(), BlockReason> {
    classify_sync(url_str)?;

    let url = Url::parse(url_str).map_err(|_| BlockReason::InvalidUrl)?;
    let Some(Host::Domain(name)) = url.host() else {
        // Literal IPs were already fully classified synchronously.
        return Ok(());
    };

    let port = url.port_or_known_default().unwrap_or(80);
    match lookup_host((name, port)).await {
        Ok(addrs) => {
            let ips: Vec<IpAddr> = addrs.map(|sa| sa.ip()).collect();
            if ips.is_empty() {
                warn!(host = name, "DNS resolution returned no addresses, blocking fail-closed");
                return Err(BlockReason::BlockedPrivateResolution);
            }
            if ips.iter().any(|ip| is_private_ip(*ip)) {
                debug!(host = name, "DNS resolution hit a private address");
                return Err(BlockReason::BlockedPrivateResolution);
            }
            Ok(())
        }
        Err(err) => {
            warn!(host = name, error = %err, "DNS lookup failed, blocking fail-closed");
            Err(BlockReason::BlockedPrivateResolution)
        }
    }
}

/// Synchronous per-sub-request guard; no DNS. Applied to every resource the
/// browser attempts to load during a navigation.
#[must_use]
pub fn should_block_request(url_str: &str) -> bool {
    classify_sync(url_str).is_err()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_localhost_variants() {
        assert_eq!(
            classify_sync("http://localhost/secret"),
            Err(BlockReason::BlockedLocalhost)
        );
        assert_eq!(
            classify_sync("http://ip6-localhost/"),
            Err(BlockReason::BlockedLocalhost)
        );
        assert_eq!(
            classify_sync("http://foo.localhost/"),
            Err(BlockReason::BlockedLocalhost)
        );
        assert_eq!(
            classify_sync("http://foo.local/"),
            Err(BlockReason::BlockedLocalhost)
        );
    }

    #[test]
    fn classifies_private_ips() {
        assert_eq!(
            classify_sync("http://192.168.1.1/admin"),
            Err(BlockReason::BlockedPrivateIp)
        );
        assert_eq!(
            classify_sync("http://10.0.0.5/"),
            Err(BlockReason::BlockedPrivateIp)
        );
        assert_eq!(
            classify_sync("http://127.0.0.1/"),
            Err(BlockReason::BlockedPrivateIp)
        );
        assert_eq!(
            classify_sync("http://[::1]/"),
            Err(BlockReason::BlockedPrivateIp)
        );
        assert_eq!(
            classify_sync("http://[fe80::1]/"),
            Err(BlockReason::BlockedPrivateIp)
        );
        // IPv4-mapped IPv6 unwraps to the IPv4 classification.
        assert_eq!(
            classify_sync("http://[::ffff:127.0.0.1]/"),
            Err(BlockReason::BlockedPrivateIp)
        );
    }

    #[test]
    fn classifies_private_hostname_suffixes() {
        assert_eq!(
            classify_sync("http://db.internal/"),
            Err(BlockReason::BlockedPrivateHostname)
        );
        assert_eq!(
            classify_sync("http://svc.corp/"),
            Err(BlockReason::BlockedPrivateHostname)
        );
    }

    #[test]
    fn rejects_bad_scheme_and_parse_failures() {
        assert_eq!(
            classify_sync("ftp://example.com/"),
            Err(BlockReason::UnsupportedProtocol)
        );
        assert_eq!(classify_sync("not a url"), Err(BlockReason::InvalidUrl));
    }

    #[test]
    fn accepts_public_hosts() {
        assert!(classify_sync("https://example.com/page").is_ok());
        assert!(classify_sync("http://93.184.216.34/").is_ok());
    }

    #[test]
    fn should_block_request_agrees_with_sync_classification() {
        assert!(should_block_request("http://127.0.0.1/x.png"));
        assert!(should_block_request("http://localhost/"));
        assert!(!should_block_request("https://example.com/asset.js"));
    }

    #[test]
    fn should_block_request_is_deterministic() {
        for _ in 0..5 {
            assert!(should_block_request("http://192.168.0.1/"));
            assert!(!should_block_request("https://example.com/"));
        }
    }

    #[tokio::test]
    async fn preflight_fail_closed_on_dns_error() {
        // A domain guaranteed not to resolve in this sandbox still must be
        // treated as blocked rather than allowed through.
        let result = preflight("http://this-host-does-not-exist.nonexistent-zzz-tld/").await;
        assert_eq!(result, Err(BlockReason::BlockedPrivateResolution));
    }

    #[tokio::test]
    async fn preflight_short_circuits_before_dns_for_sync_reasons() {
        assert_eq!(
            preflight("http://localhost/").await,
            Err(BlockReason::BlockedLocalhost)
        );
        assert_eq!(
            preflight("http://192.168.1.1/").await,
            Err(BlockReason::BlockedPrivateIp)
        );
        assert_eq!(
            preflight("ftp://example.com/").await,
            Err(BlockReason::UnsupportedProtocol)
        );
    }
}
