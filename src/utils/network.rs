use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

/// LAN IPv4 address of this host.
///
/// Connecting a UDP socket only selects a route; no packet is sent.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) if !addr.ip().is_unspecified() => Some(*addr.ip()),
        _ => None,
    }
}

/// Guess a phone address on the same /24 by replacing the last octet
pub fn suggest_device_ip(local: Ipv4Addr, last_octet: u8) -> Ipv4Addr {
    let [a, b, c, _] = local.octets();
    Ipv4Addr::new(a, b, c, last_octet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_device_ip() {
        let local = Ipv4Addr::new(192, 168, 1, 23);
        assert_eq!(
            suggest_device_ip(local, 102),
            Ipv4Addr::new(192, 168, 1, 102)
        );
    }
}
