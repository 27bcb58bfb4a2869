use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

/// Placeholder returned when no client address can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Resolve the client address from proxy headers and the transport peer.
///
/// With `trust_proxy` the first `X-Forwarded-For` entry wins. Otherwise (or
/// when that header is absent) `X-Real-IP` is used, then the socket peer,
/// then [`UNKNOWN_IP`].
pub fn resolve_client_ip(
    trust_proxy: bool,
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    peer: Option<IpAddr>,
) -> String {
    if trust_proxy {
        let first = forwarded_for
            .and_then(|list| list.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = first {
            return ip.to_string();
        }
    }

    if let Some(ip) = real_ip.map(str::trim).filter(|ip| !ip.is_empty()) {
        return ip.to_string();
    }

    peer.map(|addr| addr.to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

/// Accept a dotted-quad IPv4 address (1–3 digit octets, each ≤ 255) or
/// anything `Ipv6Addr` parses. Rejects the `"unknown"` sentinel.
pub fn is_valid_ip(ip: &str) -> bool {
    if ip == UNKNOWN_IP || ip.is_empty() {
        return false;
    }
    if looks_like_ipv4(ip) {
        return ip
            .split('.')
            .all(|octet| octet.parse::<u16>().is_ok_and(|n| n <= 255));
    }
    Ipv6Addr::from_str(ip).is_ok()
}

fn looks_like_ipv4(ip: &str) -> bool {
    let parts: Vec<&str> = ip.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|p| (1..=3).contains(&p.len()) && p.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn forwarded_for_first_entry_when_trusted() {
        let ip = resolve_client_ip(true, Some(" 203.0.113.5 , 10.0.0.1"), Some("10.9.9.9"), None);
        assert_eq!(ip, "203.0.113.5");
    }

    #[test]
    fn forwarded_for_ignored_when_untrusted() {
        let ip = resolve_client_ip(false, Some("203.0.113.5"), Some("198.51.100.7"), None);
        assert_eq!(ip, "198.51.100.7");
    }

    #[test]
    fn falls_back_to_peer_then_unknown() {
        let peer = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(resolve_client_ip(true, None, None, Some(peer)), "127.0.0.1");
        assert_eq!(resolve_client_ip(false, Some("1.2.3.4"), None, None), UNKNOWN_IP);
    }

    #[test]
    fn empty_forwarded_for_falls_through() {
        let ip = resolve_client_ip(true, Some(" , 1.1.1.1"), Some("8.8.8.8"), None);
        assert_eq!(ip, "8.8.8.8");
    }

    #[test]
    fn ipv4_octet_range() {
        assert!(is_valid_ip("203.0.113.5"));
        assert!(is_valid_ip("0.0.0.0"));
        assert!(is_valid_ip("255.255.255.255"));
        assert!(!is_valid_ip("256.1.1.1"));
        assert!(!is_valid_ip("1.2.3.999"));
        assert!(!is_valid_ip("1.2.3"));
        assert!(!is_valid_ip("1.2.3.4.5"));
    }

    #[test]
    fn every_in_range_octet_is_accepted() {
        for n in 0..=255u16 {
            let ip = format!("10.{n}.{n}.{n}");
            assert!(is_valid_ip(&ip), "{ip} should be valid");
        }
    }

    #[test]
    fn sentinel_and_garbage_rejected() {
        assert!(!is_valid_ip(UNKNOWN_IP));
        assert!(!is_valid_ip(""));
        assert!(!is_valid_ip("not-an-ip"));
        assert!(!is_valid_ip("<script>"));
    }

    #[test]
    fn ipv6_is_parsed_strictly() {
        assert!(is_valid_ip("2001:db8::1"));
        assert!(is_valid_ip("::1"));
        assert!(!is_valid_ip(":::::"));
        assert!(!is_valid_ip("abcd"));
    }
}
