//! Close & Free (spec §4.10), grounded on the teacher's `close_request`/
//! `close_all_dcc_connections` (`client/src/dcc_commands/close.rs`),
//! widened from "shut down one socket" to the full idempotent
//! resource-release and unlink-on-empty-failed-recv contract spec §4.10
//! and its testable property #3 require.

use crate::speed;
use crate::DccEngine;
use model::kind::TransferKind;
use model::status::TransferStatus;
use model::transfer::TransferId;
use std::net::Shutdown;
use std::time::Instant;

/// `close(status)` (spec §4.10): transitions `status`, emits the
/// info/error line and hotlist ping for file transfers, reaps the
/// worker, unlinks an empty failed/aborted recv, and releases the data
/// socket and file handle exactly once.
pub fn close(engine: &mut DccEngine, id: TransferId, status: TransferStatus) {
    let Some(transfer) = engine.registry.get_mut(id) else {
        return;
    };
    if transfer.status.is_ended() {
        return;
    }
    transfer.status = status;

    if transfer.kind.is_file() {
        speed::recompute(transfer, Instant::now(), true);
        let name = transfer.filename.clone().unwrap_or_default();
        if status == TransferStatus::Done {
            engine.sink.info(Some(id), &format!("file {name} OK"));
        } else {
            engine.sink.error(Some(id), &format!("file {name} FAILED"));
        }
        engine.sink.hotlist_ping(id);
    }

    if let Some(worker) = transfer.worker.take() {
        crate::worker::cancel(&worker);
        if let Some(data_sock) = &transfer.data_sock {
            let _ = data_sock.shutdown(Shutdown::Both);
        }
        if let Some(thread) = worker.thread {
            let _ = thread.join();
        }
    }

    if matches!(status, TransferStatus::Failed | TransferStatus::Aborted)
        && transfer.kind == TransferKind::FileRecv
        && transfer.pos == 0
    {
        if let Some(path) = &transfer.local_filename {
            let on_disk_empty = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(false);
            if on_disk_empty {
                let _ = std::fs::remove_file(path);
            }
        }
    }

    transfer.data_sock = None;
    transfer.listen_sock = None;
    transfer.file_fd = None;

    engine.sink.redraw(id);
}

/// `free` (spec §4.10): tears down an orphaned chat channel, then
/// removes the transfer from the registry entirely. Never called
/// implicitly by the engine.
pub fn free(engine: &mut DccEngine, id: TransferId) {
    let Some(transfer) = engine.registry.get(id) else {
        return;
    };
    let chat_channel = transfer.chat_channel_handle;

    engine.registry.remove(id);

    if let Some(channel) = chat_channel {
        let still_in_use = engine
            .registry
            .iter()
            .any(|t| t.is_live() && t.chat_channel_handle == Some(channel));
        if !still_in_use {
            engine.sink.teardown_chat_channel(channel);
        }
    }
}
