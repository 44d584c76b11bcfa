//! The single-pass, non-blocking poll the host calls once per event-loop
//! iteration (spec §4.6). No direct teacher precedent: the teacher's
//! threads block inside each transfer's own loop instead of a shared
//! non-blocking pass, so this module is built straight from spec §4.6.1
//! through §4.6.5, in registry order (spec's "Ordering guarantee").

use crate::{chat, speed, teardown, worker};
use model::error::DccError;
use model::frame::WorkerStatus;
use model::kind::TransferKind;
use model::status::TransferStatus;
use model::transfer::{ServerHandle, TransferId};
use std::io::Read as _;
use std::time::Instant;
use tracing::{debug, warn};

use crate::DccEngine;

/// One bounded, non-blocking pass over every live transfer.
pub fn tick(engine: &mut DccEngine, server: ServerHandle) {
    for id in engine.registry.ids() {
        tick_one(engine, server, id);
    }
}

fn tick_one(engine: &mut DccEngine, server: ServerHandle, id: TransferId) {
    let (kind, status) = {
        let Some(transfer) = engine.registry.get(id) else {
            return;
        };
        if transfer.server_handle != server || !transfer.is_live() {
            return;
        }
        (transfer.kind, transfer.status)
    };

    if kind.is_file() && check_timeout(engine, id) {
        return;
    }

    match (status, kind) {
        (TransferStatus::Connecting, TransferKind::FileSend) => accept_send(engine, id, false),
        (TransferStatus::Waiting, TransferKind::ChatSend) => accept_send(engine, id, true),
        (TransferStatus::Active, TransferKind::ChatRecv) | (TransferStatus::Active, TransferKind::ChatSend) => {
            poll_chat(engine, id)
        }
        (TransferStatus::Active, TransferKind::FileSend) | (TransferStatus::Active, TransferKind::FileRecv) => {
            poll_worker(engine, id)
        }
        _ => {}
    }
}

/// §4.6.1 Timeout check. Returns true if the transfer was closed.
fn check_timeout(engine: &mut DccEngine, id: TransferId) -> bool {
    let timeout = match engine.config.timeout() {
        Some(t) => t,
        None => return false,
    };
    let timed_out = {
        let Some(transfer) = engine.registry.get(id) else {
            return false;
        };
        Instant::now().duration_since(transfer.last_activity) > timeout
    };
    if !timed_out {
        return false;
    }
    warn!(transfer = id.as_raw(), "transfer timed out");
    engine.sink.error(
        Some(id),
        &DccError::TransferTimeout(timeout).to_string(),
    );
    teardown::close(engine, id, TransferStatus::Failed);
    true
}

/// §4.6.2 / §4.6.3: accept a pending connection on the listening socket.
/// Every step that needs `&mut DccEngine` as a whole (closing the
/// transfer, spawning the worker) runs only after the transfer borrow
/// used to get there has gone out of scope.
fn accept_send(engine: &mut DccEngine, id: TransferId, is_chat: bool) {
    let accept_result = {
        let Some(transfer) = engine.registry.get(id) else {
            return;
        };
        let Some(listener) = &transfer.listen_sock else {
            return;
        };
        listener.accept()
    };

    let (stream, peer) = match accept_result {
        Ok(pair) => pair,
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
        Err(_) => {
            teardown::close(engine, id, TransferStatus::Failed);
            return;
        }
    };
    let _ = stream.set_nonblocking(true);

    let remote_nick = {
        let Some(transfer) = engine.registry.get_mut(id) else {
            return;
        };
        transfer.listen_sock = None;
        transfer.peer_ipv4 = model::ipv4::addr_to_host_order(match peer.ip() {
            std::net::IpAddr::V4(v4) => v4,
            std::net::IpAddr::V6(_) => std::net::Ipv4Addr::UNSPECIFIED,
        });
        transfer.data_sock = Some(stream);
        transfer.status = TransferStatus::Active;
        transfer.start_transfer = Some(Instant::now());
        transfer.touch_activity();
        transfer.remote_nick.clone()
    };

    if is_chat {
        let channel = engine.sink.associate_chat_channel(id, &remote_nick);
        if let Some(transfer) = engine.registry.get_mut(id) {
            transfer.chat_channel_handle = channel;
        }
        engine.sink.redraw(id);
        return;
    }

    spawn_send_worker(engine, id);
}

fn spawn_send_worker(engine: &mut DccEngine, id: TransferId) {
    let prepared = {
        let Some(transfer) = engine.registry.get(id) else {
            return;
        };
        let data_sock = transfer.data_sock.as_ref().and_then(|s| s.try_clone().ok());
        let file = transfer.file_fd.as_ref().and_then(|f| f.try_clone().ok());
        data_sock.zip(file).map(|(data_sock, file)| {
            (data_sock, file, transfer.blocksize, transfer.fast_send, transfer.pos, transfer.size, transfer.ack)
        })
    };

    let Some((data_sock, file, blocksize, fast_send, pos, size, ack)) = prepared else {
        teardown::close(engine, id, TransferStatus::Failed);
        return;
    };

    match worker::send::start(file, data_sock, blocksize, fast_send, pos, size, ack) {
        Ok(handle) => {
            if let Some(transfer) = engine.registry.get_mut(id) {
                transfer.worker = Some(handle);
            }
        }
        Err(e) => {
            debug!(transfer = id.as_raw(), error = %e, "failed to spawn send worker");
            teardown::close(engine, id, TransferStatus::Failed);
        }
    }
}

/// §4.6.4: poll the data socket of an active chat session. The socket
/// read happens inside its own scope so the transfer borrow it needs is
/// gone before any call that needs the whole `DccEngine`.
fn poll_chat(engine: &mut DccEngine, id: TransferId) {
    let mut buf = [0u8; chat::RECV_CHUNK];
    let read_result = {
        let Some(transfer) = engine.registry.get_mut(id) else {
            return;
        };
        let Some(sock) = &mut transfer.data_sock else {
            return;
        };
        sock.read(&mut buf)
    };

    let n = match read_result {
        Ok(0) => {
            teardown::close(engine, id, TransferStatus::Aborted);
            return;
        }
        Ok(n) => n,
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
        Err(_) => {
            teardown::close(engine, id, TransferStatus::Aborted);
            return;
        }
    };

    let Some(transfer) = engine.registry.get_mut(id) else {
        return;
    };
    transfer.touch_activity();
    let carry = transfer.unterminated_message.take().unwrap_or_default();
    let (lines, rest) = chat::split_lines(&carry, &buf[..n]);
    transfer.unterminated_message = if rest.is_empty() { None } else { Some(rest) };
    let channel = transfer.chat_channel_handle;

    if let Some(channel) = channel {
        for line in lines {
            chat::dispatch_line(
                &line,
                engine.line_codec.as_ref(),
                engine.color_codec.as_ref(),
                engine.sink.as_ref(),
                channel,
            );
        }
    }
}

/// §4.6.5 / §4.7.3: poll a file worker's status pipe and dispatch on the
/// frame it reports. Frame processing against the transfer happens in
/// its own scope; the resulting verdict is applied afterward so
/// `teardown::close` never runs while a transfer borrow is still live.
fn poll_worker(engine: &mut DccEngine, id: TransferId) {
    enum Verdict {
        Redraw,
        Close(TransferStatus, Option<DccError>),
    }

    let verdict = {
        let Some(transfer) = engine.registry.get_mut(id) else {
            return;
        };
        let Some(worker_handle) = &mut transfer.worker else {
            return;
        };
        let frames = worker::drain_frames(&mut worker_handle.pipe_read);

        let mut verdict = None;
        for frame in frames {
            transfer.pos = frame.pos;
            transfer.touch_activity();
            speed::recompute(transfer, Instant::now(), frame.status != WorkerStatus::Active);

            match frame.status {
                WorkerStatus::Active => verdict = Some(Verdict::Redraw),
                WorkerStatus::Done => {
                    verdict = Some(Verdict::Close(TransferStatus::Done, None));
                    break;
                }
                WorkerStatus::Failed => {
                    verdict = Some(Verdict::Close(TransferStatus::Failed, DccError::from_worker_error(frame.error)));
                    break;
                }
            }
        }
        verdict
    };

    match verdict {
        Some(Verdict::Redraw) => engine.sink.redraw(id),
        Some(Verdict::Close(status, error)) => {
            if let Some(err) = error {
                engine.sink.error(Some(id), &err.to_string());
            }
            teardown::close(engine, id, status);
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::codec::PlainCodec;
    use model::config::{ConfigView, ProxyConfig};
    use model::kind::TransferKind;
    use model::observer::ObserverSink;
    use model::transfer::{ChatChannelHandle, ServerHandle, Transfer, TransferId};
    use std::net::{Ipv4Addr, TcpListener, TcpStream};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    struct FixedConfig(Option<Duration>);
    impl ConfigView for FixedConfig {
        fn download_path(&self) -> &Path {
            Path::new("/tmp")
        }
        fn upload_path(&self) -> Option<&Path> {
            None
        }
        fn auto_accept_files(&self) -> bool {
            false
        }
        fn auto_accept_chats(&self) -> bool {
            false
        }
        fn auto_resume(&self) -> bool {
            false
        }
        fn auto_rename(&self) -> bool {
            false
        }
        fn convert_spaces(&self) -> bool {
            false
        }
        fn fast_send(&self) -> bool {
            false
        }
        fn blocksize(&self) -> u32 {
            4096
        }
        fn timeout(&self) -> Option<Duration> {
            self.0
        }
        fn port_range(&self) -> Option<std::ops::RangeInclusive<u16>> {
            None
        }
        fn own_ip(&self) -> Option<Ipv4Addr> {
            None
        }
        fn proxy(&self) -> Option<ProxyConfig> {
            None
        }
    }

    #[derive(Default)]
    struct NullSink;
    impl ObserverSink for NullSink {
        fn info(&self, _: Option<TransferId>, _: &str) {}
        fn error(&self, _: Option<TransferId>, _: &str) {}
        fn hotlist_ping(&self, _: TransferId) {}
        fn redraw(&self, _: TransferId) {}
        fn associate_chat_channel(&self, _: TransferId, _: &str) -> Option<ChatChannelHandle> {
            Some(ChatChannelHandle(1))
        }
        fn chat_message(&self, _: ChatChannelHandle, _: &str) {}
        fn chat_closed(&self, _: ChatChannelHandle, _: TransferStatus) {}
        fn teardown_chat_channel(&self, _: ChatChannelHandle) {}
    }

    fn make_engine(timeout: Option<Duration>) -> DccEngine {
        DccEngine::new(
            Arc::new(FixedConfig(timeout)),
            Arc::new(NullSink),
            Arc::new(PlainCodec),
            Arc::new(PlainCodec),
            None,
        )
    }

    #[test]
    fn timed_out_transfer_is_marked_failed() {
        let mut engine = make_engine(Some(Duration::from_millis(1)));
        let id = engine.registry.reserve_id();
        let mut t = Transfer::new(id, ServerHandle(0), TransferKind::FileRecv, "x".to_string(), 4096, false);
        t.status = TransferStatus::Active;
        t.last_activity = Instant::now() - Duration::from_secs(10);
        engine.registry.insert(t);

        tick(&mut engine, ServerHandle(0));
        assert_eq!(engine.registry.get(id).unwrap().status, TransferStatus::Failed);
    }

    #[test]
    fn connecting_file_send_accepts_and_goes_active() {
        let mut engine = make_engine(None);
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let id = engine.registry.reserve_id();
        let mut t = Transfer::new(id, ServerHandle(0), TransferKind::FileSend, "x".to_string(), 4096, false);
        t.status = TransferStatus::Connecting;
        t.listen_sock = Some(listener);
        t.file_fd = Some(tempfile::tempfile().unwrap());
        t.size = 0;
        engine.registry.insert(t);

        let _client = TcpStream::connect(addr).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        tick(&mut engine, ServerHandle(0));
        let transfer = engine.registry.get(id).unwrap();
        assert_eq!(transfer.status, TransferStatus::Active);
        assert!(transfer.listen_sock.is_none());
    }

    #[test]
    fn chat_recv_reassembles_and_dispatches_lines() {
        let mut engine = make_engine(None);
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).unwrap();
        let (server_sock, _) = listener.accept().unwrap();
        server_sock.set_nonblocking(true).unwrap();

        let id = engine.registry.reserve_id();
        let mut t = Transfer::new(id, ServerHandle(0), TransferKind::ChatRecv, "x".to_string(), 4096, false);
        t.status = TransferStatus::Active;
        t.data_sock = Some(server_sock);
        t.chat_channel_handle = Some(ChatChannelHandle(1));
        engine.registry.insert(t);

        use std::io::Write;
        client.write_all(b"hello\r\n").unwrap();
        std::thread::sleep(Duration::from_millis(50));

        tick(&mut engine, ServerHandle(0));
        assert!(engine.registry.get(id).unwrap().unterminated_message.is_none());
    }
}
