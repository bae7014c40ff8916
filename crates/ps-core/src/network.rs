//! Allow-list prefix extraction
//!
//! Allow-listed networks are compared as plain strings: the first three
//! dot-separated segments of an address. `10.20.30.0/24` and
//! `10.20.30.77` both reduce to `10.20.30`. No mask arithmetic is done.

/// Return everything before the third dot, or the whole input if it has
/// fewer than three dots.
pub fn network_prefix(addr: &str) -> &str {
    addr.match_indices('.')
        .nth(2)
        .map(|(idx, _)| &addr[..idx])
        .unwrap_or(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_of_address() {
        assert_eq!(network_prefix("1.2.3.4"), "1.2.3");
        assert_eq!(network_prefix("192.168.100.254"), "192.168.100");
    }

    #[test]
    fn test_prefix_of_cidr() {
        assert_eq!(network_prefix("5.8.0.0/16"), "5.8.0");
        assert_eq!(network_prefix("77.88.55.0/24"), "77.88.55");
    }

    #[test]
    fn test_short_input_kept_verbatim() {
        assert_eq!(network_prefix("10.0"), "10.0");
        assert_eq!(network_prefix("localhost"), "localhost");
        assert_eq!(network_prefix(""), "");
    }
}
