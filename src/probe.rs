//! Best-effort discovery of the address other LAN devices can reach us on.
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket},
};

use tracing::debug;

/// Shown in place of an address when none could be found.
pub const UNKNOWN_ADDRESS: &str = "Unable to determine";

/// Publicly routable target used to pick the outbound interface.
pub const PROBE_TARGET: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);

/// The local address the OS would use to reach `target`.
///
/// Connecting a UDP socket only selects a route; no datagram is sent.
/// The socket is closed when this returns.
pub fn probe_local_address<A: ToSocketAddrs>(target: A) -> io::Result<IpAddr> {
    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))?;
    socket.connect(target)?;
    Ok(socket.local_addr()?.ip())
}

pub fn discover_local_address_via<A: ToSocketAddrs>(target: A) -> String {
    match probe_local_address(target) {
        Ok(ip) => ip.to_string(),
        Err(e) => {
            debug!("local address probe failed: {}", e);
            UNKNOWN_ADDRESS.to_string()
        }
    }
}

pub fn discover_local_address() -> String {
    discover_local_address_via(PROBE_TARGET)
}
