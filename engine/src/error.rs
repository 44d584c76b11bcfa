//! Engine-level error wrapper (spec §7, SPEC_FULL §7). Only returned from
//! setup paths that run before a [`model::Transfer`] exists; once a
//! transfer is registered, failures become an `ObserverSink` line plus a
//! status transition instead.

use model::DccError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Dcc(#[from] DccError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
