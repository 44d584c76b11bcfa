/// What a [`crate::Transfer`] is moving: a file in one direction, or a
/// direct chat session in one direction (spec §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    FileSend,
    FileRecv,
    ChatSend,
    ChatRecv,
}

impl TransferKind {
    pub fn is_file(self) -> bool {
        matches!(self, TransferKind::FileSend | TransferKind::FileRecv)
    }

    pub fn is_chat(self) -> bool {
        matches!(self, TransferKind::ChatSend | TransferKind::ChatRecv)
    }

    pub fn is_send(self) -> bool {
        matches!(self, TransferKind::FileSend | TransferKind::ChatSend)
    }

    pub fn is_recv(self) -> bool {
        matches!(self, TransferKind::FileRecv | TransferKind::ChatRecv)
    }
}
