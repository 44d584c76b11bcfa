//! Send-side listen and receive-side connect paths (spec §4.5), grounded
//! on the teacher's `TcpListener::bind` (send) and `TcpStream::connect`
//! (receive) in `client/src/dcc_commands/send.rs`, widened to the
//! non-blocking-mode and proxy-handshake steps the teacher's synchronous
//! thread-per-transfer model didn't need.

use model::error::DccError;
use model::proxy::ProxyConnector;
use std::net::{Ipv4Addr, TcpListener, TcpStream};

/// Send side (spec §4.5): place the already-bound listener in
/// non-blocking mode (`listen` is already done by the port allocator).
/// The original restores blocking mode and relies on a separate
/// `select` readiness check before accepting; since the Scheduler's
/// "zero-timeout poll" (spec §4.6) is implemented here as a direct
/// non-blocking `accept` attempt rather than a real `select` call
/// (SPEC_FULL §9 "select polling -> unified readiness source" applies
/// equally to this single-listener case), the listener stays
/// non-blocking for its whole lifetime instead.
pub fn prepare_send_listener(listener: &TcpListener) -> Result<(), DccError> {
    listener.set_nonblocking(true).map_err(DccError::CannotCreateSocket)?;
    Ok(())
}

/// Receive side (spec §4.5): connect to the peer directly, or through a
/// SOCKS-style proxy when configured, then mark the stream non-blocking
/// for the Scheduler's readiness-poll-before-use contract.
pub fn connect_receiver(
    peer_addr: Ipv4Addr,
    peer_port: u16,
    proxy: Option<(&dyn ProxyConnector, &str, u16, &str)>,
) -> Result<TcpStream, DccError> {
    let stream = match proxy {
        Some((connector, proxy_addr, proxy_port, username)) => {
            let stream = TcpStream::connect((proxy_addr, proxy_port)).map_err(DccError::CannotCreateSocket)?;
            connector.connect_via_proxy(&stream, peer_addr, peer_port, username)?;
            stream
        }
        None => TcpStream::connect((peer_addr, peer_port)).map_err(DccError::CannotCreateSocket)?,
    };
    stream.set_nonblocking(true).map_err(DccError::CannotCreateSocket)?;
    Ok(stream)
}
