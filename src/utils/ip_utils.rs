use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

/// IP utility functions for device address checks

fn dotted_quad() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}$").expect("Invalid dotted_quad regex")
    })
}

/// Check if a string has the shape of a dotted-quad address.
///
/// Only the shape is checked: `999.1.1.1` passes. Use [`is_valid_ipv4`] for
/// a strict check.
pub fn is_dotted_quad(address: &str) -> bool {
    dotted_quad().is_match(address)
}

/// Check if a string is a valid IPv4 address
pub fn is_valid_ipv4(ip: &str) -> bool {
    ip.parse::<Ipv4Addr>().is_ok()
}

/// Check if an IPv4 address is private (RFC 1918)
pub fn is_private_ipv4(ip: &str) -> Result<bool, String> {
    let addr = ip
        .parse::<Ipv4Addr>()
        .map_err(|_| format!("Invalid IP address '{}'", ip))?;
    Ok(addr.is_private())
}

/// Suggest the next free host address in the `/24` of `start`.
///
/// `taken` holds addresses already in use. Returns `None` when the subnet
/// has no free host left after `start`.
pub fn next_free_address<'a, I>(start: &str, taken: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let base = start.parse::<Ipv4Addr>().ok()?;
    let used: Vec<&str> = taken.into_iter().collect();
    let [a, b, c, d] = base.octets();
    (d..=254)
        .map(|host| Ipv4Addr::new(a, b, c, host).to_string())
        .find(|candidate| !used.contains(&candidate.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_quad_shape() {
        assert!(is_dotted_quad("192.168.1.1"));
        assert!(is_dotted_quad("999.1.1.1"));
        assert!(!is_dotted_quad("192.168.1"));
        assert!(!is_dotted_quad("10.0.0.1 "));
        assert!(!is_dotted_quad("host.local"));
        // Only ASCII digits count
        assert!(!is_dotted_quad("١٠.٠.٠.١"));
        assert!(!is_dotted_quad("１0.0.0.1"));
    }

    #[test]
    fn test_strict_ipv4() {
        assert!(is_valid_ipv4("10.0.0.1"));
        assert!(!is_valid_ipv4("999.1.1.1"));
    }

    #[test]
    fn test_private_ranges() {
        assert_eq!(is_private_ipv4("10.1.2.3"), Ok(true));
        assert_eq!(is_private_ipv4("172.20.0.1"), Ok(true));
        assert_eq!(is_private_ipv4("8.8.8.8"), Ok(false));
        assert!(is_private_ipv4("nope").is_err());
    }

    #[test]
    fn test_next_free_address() {
        let taken = ["10.0.0.1", "10.0.0.2"];
        assert_eq!(next_free_address("10.0.0.1", taken), Some("10.0.0.3".to_string()));
        assert_eq!(next_free_address("10.0.0.254", ["10.0.0.254"]), None);
        assert_eq!(next_free_address("bogus", Vec::<&str>::new()), None);
    }
}
