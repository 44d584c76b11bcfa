use std::time::Duration;

/// Error taxonomy for the DCC engine (spec §7).
///
/// The engine never panics and never unwinds across the scheduler
/// boundary: once a [`Transfer`](crate::Transfer) exists, these become an
/// [`crate::observer::ObserverSink`] line plus a terminal status
/// transition, not a propagated `Result`. `Result<_, DccError>` is only
/// used for setup paths that run before a transfer exists (building an
/// outgoing offer, resolving a filename) or for pure wire-format parsing.
#[derive(Debug, thiserror::Error)]
pub enum DccError {
    #[error("cannot access file: {0}")]
    CannotAccessFile(#[source] std::io::Error),

    #[error("out of memory")]
    OutOfMemory,

    #[error("cannot create socket: {0}")]
    CannotCreateSocket(#[source] std::io::Error),

    #[error("cannot bind any port in the configured range")]
    CannotBindAnyPort,

    #[error("failed to spawn transfer worker: {0}")]
    WorkerSpawnFailed(#[source] std::io::Error),

    #[error("failed to create worker pipe: {0}")]
    PipeFailed(#[source] std::io::Error),

    #[error("proxy connect failed: {0}")]
    ProxyConnectFailed(String),

    #[error("transfer timed out after {0:?} of inactivity")]
    TransferTimeout(Duration),

    #[error("local read failed")]
    WorkerReadLocal,

    #[error("local write failed")]
    WorkerWriteLocal,

    #[error("send blocked")]
    WorkerSendBlock,

    #[error("recv blocked")]
    WorkerRecvBlock,

    #[error("ack read failed")]
    WorkerReadAck,

    #[error("no matching transfer for resume/accept continuation")]
    NotFound,

    #[error("failed to associate chat channel")]
    AssociationFailed,

    #[error("malformed DCC offer: {0}")]
    MalformedOffer(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DccError {
    /// Maps a worker-reported [`crate::frame::WorkerError`] onto the
    /// corresponding engine error, used by the parent when it closes a
    /// transfer after reading a `Failed` status frame (spec §4.7.3).
    pub fn from_worker_error(err: crate::frame::WorkerError) -> Option<Self> {
        use crate::frame::WorkerError::*;
        match err {
            NoError => None,
            ReadLocal => Some(DccError::WorkerReadLocal),
            SendBlock => Some(DccError::WorkerSendBlock),
            ReadAck => Some(DccError::WorkerReadAck),
            RecvBlock => Some(DccError::WorkerRecvBlock),
            WriteLocal => Some(DccError::WorkerWriteLocal),
        }
    }
}
