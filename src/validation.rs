//! Address admission policy.
//!
//! The coordinator trusts the observed peer address as the agent's identity
//! and only admits private-range addresses. This is admission control for a
//! trusted private network, not authentication: any host on that network can
//! present any address it holds. Known limitation, kept deliberately.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};

/// Whether an address belongs to a private range.
///
/// IPv4: RFC 1918 ranges, loopback and link-local. IPv6: loopback,
/// unique-local (fc00::/7) and link-local (fe80::/10).
pub fn is_private_addr(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || is_unique_local(v6) || is_unicast_link_local(v6),
    }
}

// Ipv6Addr::is_unique_local / is_unicast_link_local are unstable; check the
// prefixes directly.
fn is_unique_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xfe00) == 0xfc00
}

fn is_unicast_link_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

/// Admission check for a full socket address (the form the API observes).
pub fn is_private_socket(addr: &SocketAddr) -> bool {
    is_private_addr(&addr.ip())
}
