//! A terminal [`ObserverSink`], standing in for the `glib::Sender<Response>`
//! channel the teacher's GTK client fed UI-facing `DccResponse` variants
//! into (`model/src/responses/dcc.rs`) — here every notification prints a
//! line straight to stdout/stderr instead of being routed to a widget.

use model::observer::ObserverSink;
use model::status::TransferStatus;
use model::transfer::{ChatChannelHandle, TransferId};
use std::sync::Mutex;

pub struct TerminalSink {
    chats: Mutex<Vec<ChatChannelHandle>>,
}

impl TerminalSink {
    pub fn new() -> Self {
        TerminalSink { chats: Mutex::new(Vec::new()) }
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverSink for TerminalSink {
    fn info(&self, transfer: Option<TransferId>, text: &str) {
        match transfer {
            Some(id) => println!("[{}] {text}", id.as_raw()),
            None => println!("{text}"),
        }
    }

    fn error(&self, transfer: Option<TransferId>, text: &str) {
        match transfer {
            Some(id) => eprintln!("[{}] error: {text}", id.as_raw()),
            None => eprintln!("error: {text}"),
        }
    }

    fn hotlist_ping(&self, transfer: TransferId) {
        println!("[{}] done", transfer.as_raw());
    }

    fn redraw(&self, transfer: TransferId) {
        let _ = transfer;
    }

    fn associate_chat_channel(&self, transfer: TransferId, remote_nick: &str) -> Option<ChatChannelHandle> {
        let channel = ChatChannelHandle(transfer.as_raw() as u64);
        self.chats.lock().unwrap().push(channel);
        println!("[{}] chat with {remote_nick} open", transfer.as_raw());
        Some(channel)
    }

    fn chat_message(&self, channel: ChatChannelHandle, line: &str) {
        println!("(chat {}) {line}", channel.0);
    }

    fn chat_closed(&self, channel: ChatChannelHandle, reason: TransferStatus) {
        println!("(chat {}) closed: {reason:?}", channel.0);
    }

    fn teardown_chat_channel(&self, channel: ChatChannelHandle) {
        self.chats.lock().unwrap().retain(|c| *c != channel);
        println!("(chat {}) torn down", channel.0);
    }
}
