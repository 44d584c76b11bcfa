//! Binds the listening socket a file-send or chat-send offer advertises
//! (spec §4.2), grounded on the teacher's `TcpListener::bind` usage in
//! `outgoing_send_request` (`client/src/dcc_commands/send.rs`), widened
//! to the configured port range and collision check the teacher's single
//! `bind(ip:port)` call doesn't need.

use crate::registry::Registry;
use model::error::DccError;
use socket2::{Domain, Socket, Type};
use std::net::{SocketAddr, SocketAddrV4, TcpListener};
use std::ops::RangeInclusive;

/// Binds a `127.0.0.1`-equivalent listening socket per spec §4.2: walk the
/// configured range skipping ports already held by a live transfer, or
/// fall back to kernel assignment when no range is configured.
pub fn bind(registry: &Registry, port_range: Option<RangeInclusive<u16>>) -> Result<TcpListener, DccError> {
    match port_range {
        Some(range) => {
            for port in range {
                if registry.port_in_use(port) {
                    continue;
                }
                if let Ok(listener) = bind_port(port) {
                    return Ok(listener);
                }
            }
            Err(DccError::CannotBindAnyPort)
        }
        None => bind_port(0),
    }
}

fn bind_port(port: u16) -> Result<TcpListener, DccError> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, None).map_err(DccError::CannotCreateSocket)?;
    socket.set_reuse_address(true).map_err(DccError::CannotCreateSocket)?;
    let addr: SocketAddr = SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, port).into();
    socket.bind(&addr.into()).map_err(DccError::CannotCreateSocket)?;
    socket.listen(1).map_err(DccError::CannotCreateSocket)?;
    Ok(socket.into())
}
