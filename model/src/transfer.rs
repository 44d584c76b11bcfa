//! The `Transfer` entity (spec §3.3): the single record the engine keeps
//! per offer/accept/chat, and the doubly-linked-list-turned-owned-
//! collection entry the registry stores.

use crate::kind::TransferKind;
use crate::status::TransferStatus;
use std::fs::File;
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// Stable identity for a [`Transfer`] inside the registry. Never reused
/// within a process (SPEC_FULL §3: "ids are never reused"), so a stale id
/// held by a chat-channel back-reference safely misses instead of
/// dangling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferId(u32);

impl TransferId {
    pub fn from_raw(raw: u32) -> Self {
        TransferId(raw)
    }

    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// Opaque reference to the external IRC server object graph (spec §1, §3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerHandle(pub u64);

/// Opaque reference to an external private-chat buffer (spec §3.3,
/// SPEC_FULL §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatChannelHandle(pub u64);

/// The engine's own handle to a live file-transfer worker thread (spec
/// §3.3's `child_pid`/`child_read`/`child_write`, generalized per Design
/// Note §9 from a forked child process to a worker thread). `pipe_read`
/// is the non-blocking read end of the worker's status pipe; `cancel` is
/// the cooperative stop flag `close(Aborted)` sets before shutting down
/// the data socket.
#[derive(Debug)]
pub struct WorkerHandle {
    pub thread: Option<JoinHandle<()>>,
    pub pipe_read: File,
    pub cancel: Arc<AtomicBool>,
}

/// One DCC transfer or chat session, in any state of its lifecycle (spec
/// §3.3). Created by the offer/accept protocol or an outgoing send
/// request, mutated only by the engine, destroyed only by an explicit
/// `free` call from the host — never implicitly.
#[derive(Debug)]
pub struct Transfer {
    pub id: TransferId,
    pub server_handle: ServerHandle,
    pub chat_channel_handle: Option<ChatChannelHandle>,

    pub kind: TransferKind,
    pub status: TransferStatus,

    pub remote_nick: String,
    pub peer_ipv4: u32,
    pub peer_port: u16,

    pub listen_sock: Option<TcpListener>,
    pub data_sock: Option<TcpStream>,

    pub file_fd: Option<File>,
    /// Remote-facing short name for files; the literal `"DCC chat"` for
    /// chats (spec §3.3).
    pub filename: Option<String>,
    pub local_filename: Option<PathBuf>,
    pub filename_suffix: u32,

    pub size: u64,
    pub pos: u64,
    pub ack: u64,
    pub start_resume: u64,
    pub blocksize: u32,
    pub fast_send: bool,

    pub start_time: Instant,
    pub start_transfer: Option<Instant>,
    pub last_activity: Instant,
    pub last_check_time: Instant,
    pub last_check_pos: u64,
    pub bytes_per_sec: f64,
    pub eta: u64,

    pub worker: Option<WorkerHandle>,

    pub unterminated_message: Option<Vec<u8>>,
}

impl Transfer {
    /// Builds a freshly `Waiting` transfer with every counter zeroed
    /// (spec §4.4 step 1).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TransferId,
        server_handle: ServerHandle,
        kind: TransferKind,
        remote_nick: String,
        blocksize: u32,
        fast_send: bool,
    ) -> Self {
        let now = Instant::now();
        Transfer {
            id,
            server_handle,
            chat_channel_handle: None,
            kind,
            status: TransferStatus::Waiting,
            remote_nick,
            peer_ipv4: 0,
            peer_port: 0,
            listen_sock: None,
            data_sock: None,
            file_fd: None,
            filename: None,
            local_filename: None,
            filename_suffix: 0,
            size: 0,
            pos: 0,
            ack: 0,
            start_resume: 0,
            blocksize,
            fast_send,
            start_time: now,
            start_transfer: None,
            last_activity: now,
            last_check_time: now,
            last_check_pos: 0,
            bytes_per_sec: 0.0,
            eta: 0,
            worker: None,
            unterminated_message: None,
        }
    }

    /// spec §3.3 invariant: `pos <= size` whenever `size > 0`, and
    /// `ack <= pos`.
    pub fn check_invariants(&self) -> bool {
        let pos_in_bounds = self.size == 0 || self.pos <= self.size;
        pos_in_bounds && self.ack <= self.pos && self.start_resume <= self.pos
    }

    /// True while the transfer still owns OS resources that a Scheduler
    /// tick might touch (spec §3.3: "While `status ∈ {Active, Connecting,
    /// Waiting}` ... any socket referenced is open").
    pub fn is_live(&self) -> bool {
        !self.status.is_ended()
    }

    pub fn touch_activity(&mut self) {
        self.last_activity = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transfer {
        Transfer::new(
            TransferId::from_raw(1),
            ServerHandle(0),
            TransferKind::FileRecv,
            "alice".to_string(),
            65536,
            false,
        )
    }

    #[test]
    fn fresh_transfer_satisfies_invariants() {
        let t = sample();
        assert!(t.check_invariants());
        assert_eq!(t.status, TransferStatus::Waiting);
        assert!(t.is_live());
    }

    #[test]
    fn invariants_catch_ack_past_pos() {
        let mut t = sample();
        t.size = 100;
        t.pos = 10;
        t.ack = 20;
        assert!(!t.check_invariants());
    }

    #[test]
    fn invariants_allow_zero_size_chat() {
        let mut t = sample();
        t.kind = TransferKind::ChatRecv;
        t.size = 0;
        t.pos = 0;
        assert!(t.check_invariants());
    }

    #[test]
    fn ended_status_is_not_live() {
        let mut t = sample();
        t.status = TransferStatus::Done;
        assert!(!t.is_live());
    }
}
