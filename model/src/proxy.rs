//! SOCKS-style proxy external collaborator (spec §4.5): `pass_proxy` in
//! the original, reached here through a trait so the engine never speaks
//! a proxy protocol itself.

use crate::error::DccError;
use std::net::{Ipv4Addr, TcpStream};

/// Performs the proxy handshake on an already-connected socket, after
/// which `stream` behaves as if directly connected to `target:port`
/// (spec §4.5).
pub trait ProxyConnector: Send + Sync {
    fn connect_via_proxy(
        &self,
        stream: &TcpStream,
        target: Ipv4Addr,
        port: u16,
        username: &str,
    ) -> Result<(), DccError>;
}
