//! Incoming `DCC RESUME`/`DCC ACCEPT` pairing (spec §4.3), grounded on the
//! teacher's `outgoing_resume_request`/`incoming_resume_request`
//! (`client/src/dcc_commands/resume.rs`), corrected per Design Note §9
//! bug #1: the lookup is a real four-field equality
//! ([`Registry::find_by_port`]), never the original's `status = status`
//! assignment typo.

use model::error::DccError;
use model::kind::TransferKind;
use model::offer::DccContinuation;
use model::status::TransferStatus;
use model::transfer::{ServerHandle, TransferId};

use crate::registry::Registry;

/// Applies an incoming `DCC RESUME` on the sender side: locates the
/// matching `(server, FileSend, Connecting, port)` transfer, updates its
/// position fields, and returns the `DCC ACCEPT` reply line to send back
/// (spec §4.3).
pub fn handle_resume(
    registry: &mut Registry,
    server: ServerHandle,
    continuation: &DccContinuation,
    convert_spaces: bool,
) -> Result<(TransferId, String), DccError> {
    let (name, port, position) = match continuation {
        DccContinuation::Resume { name, port, position } => (name, *port, *position),
        DccContinuation::Accept { .. } => return Err(DccError::NotFound),
    };

    let id = registry
        .find_by_port(server, TransferKind::FileSend, TransferStatus::Connecting, port)
        .ok_or(DccError::NotFound)?;

    let transfer = registry.get_mut(id).ok_or(DccError::NotFound)?;
    transfer.pos = position;
    transfer.ack = position;
    transfer.start_resume = position;
    transfer.last_check_pos = position;

    let accept = DccContinuation::Accept {
        name: name.clone(),
        port,
        position,
    };
    Ok((id, model::offer::ctcp_wrap(&accept.emit(convert_spaces))))
}

/// Applies an incoming `DCC ACCEPT` on the receiver side: locates the
/// matching `(server, FileRecv, Connecting, port)` transfer and updates
/// its position fields. The caller (scheduler) drives the subsequent
/// connect-and-start-receiver path (spec §4.5, §4.6.2).
pub fn handle_accept(
    registry: &mut Registry,
    server: ServerHandle,
    continuation: &DccContinuation,
) -> Result<TransferId, DccError> {
    let (port, position) = match continuation {
        DccContinuation::Accept { port, position, .. } => (*port, *position),
        DccContinuation::Resume { .. } => return Err(DccError::NotFound),
    };

    let id = registry
        .find_by_port(server, TransferKind::FileRecv, TransferStatus::Connecting, port)
        .ok_or(DccError::NotFound)?;

    let transfer = registry.get_mut(id).ok_or(DccError::NotFound)?;
    transfer.pos = position;
    transfer.ack = position;
    transfer.start_resume = position;
    transfer.last_check_pos = position;

    Ok(id)
}
