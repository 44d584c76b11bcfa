//! The worker→parent status frame (spec §3.4): the *sole* channel a file
//! transfer worker uses to report progress. Fixed 14 bytes:
//! `"SEPPPPPPPPPPPP"` — one status digit, one error digit, twelve
//! zero-padded decimal digits of `pos`. No other signalling is permitted
//! on this channel (spec §5: "there is no out-of-band signaling").

use crate::status::TransferStatus;

pub const FRAME_LEN: usize = 14;

/// Worker-reported error codes (spec §3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerError {
    NoError,
    ReadLocal,
    SendBlock,
    ReadAck,
    RecvBlock,
    WriteLocal,
}

impl WorkerError {
    fn digit(self) -> u8 {
        match self {
            WorkerError::NoError => b'0',
            WorkerError::ReadLocal => b'1',
            WorkerError::SendBlock => b'2',
            WorkerError::ReadAck => b'3',
            WorkerError::RecvBlock => b'4',
            WorkerError::WriteLocal => b'5',
        }
    }

    fn from_digit(d: u8) -> Option<Self> {
        Some(match d {
            b'0' => WorkerError::NoError,
            b'1' => WorkerError::ReadLocal,
            b'2' => WorkerError::SendBlock,
            b'3' => WorkerError::ReadAck,
            b'4' => WorkerError::RecvBlock,
            b'5' => WorkerError::WriteLocal,
            _ => return None,
        })
    }
}

/// A decoded worker status frame. Only the three statuses a worker can
/// actually emit (spec §4.7.1/4.7.2) are representable here; `Waiting`/
/// `Connecting` never come from a worker because a worker only exists
/// once a transfer is `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Active,
    Done,
    Failed,
}

impl WorkerStatus {
    fn as_transfer_status(self) -> TransferStatus {
        match self {
            WorkerStatus::Active => TransferStatus::Active,
            WorkerStatus::Done => TransferStatus::Done,
            WorkerStatus::Failed => TransferStatus::Failed,
        }
    }

    fn digit(self) -> u8 {
        status_digit(self.as_transfer_status())
    }

    fn from_digit(d: u8) -> Option<Self> {
        match status_from_digit(d)? {
            TransferStatus::Active => Some(WorkerStatus::Active),
            TransferStatus::Done => Some(WorkerStatus::Done),
            TransferStatus::Failed => Some(WorkerStatus::Failed),
            _ => None,
        }
    }
}

/// Shared status <-> digit mapping so the wire value stays consistent if
/// other code ever needs to encode a full `TransferStatus`.
fn status_digit(status: TransferStatus) -> u8 {
    match status {
        TransferStatus::Waiting => b'0',
        TransferStatus::Connecting => b'1',
        TransferStatus::Active => b'2',
        TransferStatus::Done => b'3',
        TransferStatus::Failed => b'4',
        TransferStatus::Aborted => b'5',
    }
}

fn status_from_digit(d: u8) -> Option<TransferStatus> {
    Some(match d {
        b'0' => TransferStatus::Waiting,
        b'1' => TransferStatus::Connecting,
        b'2' => TransferStatus::Active,
        b'3' => TransferStatus::Done,
        b'4' => TransferStatus::Failed,
        b'5' => TransferStatus::Aborted,
        _ => return None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStatusFrame {
    pub status: WorkerStatus,
    pub error: WorkerError,
    pub pos: u64,
}

impl WorkerStatusFrame {
    pub fn new(status: WorkerStatus, error: WorkerError, pos: u64) -> Self {
        Self { status, error, pos }
    }

    /// Encodes the frame into exactly [`FRAME_LEN`] bytes.
    pub fn encode(self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[0] = self.status.digit();
        buf[1] = self.error.digit();
        let digits = format!("{:012}", self.pos.min(999_999_999_999));
        buf[2..].copy_from_slice(digits.as_bytes());
        buf
    }

    /// Decodes a frame from exactly [`FRAME_LEN`] bytes.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() != FRAME_LEN {
            return None;
        }
        let status = WorkerStatus::from_digit(buf[0])?;
        let error = WorkerError::from_digit(buf[1])?;
        let digits = std::str::from_utf8(&buf[2..]).ok()?;
        let pos = digits.parse::<u64>().ok()?;
        Some(Self { status, error, pos })
    }
}
