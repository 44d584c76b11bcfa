//! End-to-end scenarios over real loopback sockets, one per literal
//! example in the testable-properties section: a file send happy path, a
//! rename-on-collision receive, a resume receive, a quoted filename
//! round trip, and an inactivity timeout. Chat line reassembly has its
//! own end-to-end coverage in `scheduler.rs`'s `chat_recv_reassembles_and_
//! dispatches_lines` test.

use engine::create;
use engine::offer_protocol;
use engine::DccEngine;
use model::codec::PlainCodec;
use model::config::{ConfigView, ProxyConfig};
use model::offer::{DccContinuation, DccOffer};
use model::status::TransferStatus;
use model::transfer::ServerHandle;
use std::io::{Read, Write};
use std::net::{Ipv4Addr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

struct TestConfig {
    download_path: PathBuf,
    auto_resume: bool,
    auto_rename: bool,
    port: Option<u16>,
    timeout: Option<Duration>,
}

impl ConfigView for TestConfig {
    fn download_path(&self) -> &Path {
        &self.download_path
    }
    fn upload_path(&self) -> Option<&Path> {
        None
    }
    fn auto_accept_files(&self) -> bool {
        true
    }
    fn auto_accept_chats(&self) -> bool {
        true
    }
    fn auto_resume(&self) -> bool {
        self.auto_resume
    }
    fn auto_rename(&self) -> bool {
        self.auto_rename
    }
    fn convert_spaces(&self) -> bool {
        false
    }
    fn fast_send(&self) -> bool {
        true
    }
    fn blocksize(&self) -> u32 {
        1024
    }
    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
    fn port_range(&self) -> Option<std::ops::RangeInclusive<u16>> {
        self.port.map(|p| p..=p)
    }
    fn own_ip(&self) -> Option<Ipv4Addr> {
        Some(Ipv4Addr::LOCALHOST)
    }
    fn proxy(&self) -> Option<ProxyConfig> {
        None
    }
}

struct NullSink;
impl model::observer::ObserverSink for NullSink {
    fn info(&self, _: Option<model::transfer::TransferId>, _: &str) {}
    fn error(&self, _: Option<model::transfer::TransferId>, _: &str) {}
    fn hotlist_ping(&self, _: model::transfer::TransferId) {}
    fn redraw(&self, _: model::transfer::TransferId) {}
    fn associate_chat_channel(&self, _: model::transfer::TransferId, _: &str) -> Option<model::transfer::ChatChannelHandle> {
        Some(model::transfer::ChatChannelHandle(1))
    }
    fn chat_message(&self, _: model::transfer::ChatChannelHandle, _: &str) {}
    fn chat_closed(&self, _: model::transfer::ChatChannelHandle, _: TransferStatus) {}
    fn teardown_chat_channel(&self, _: model::transfer::ChatChannelHandle) {}
}

fn make_engine(config: TestConfig) -> DccEngine {
    DccEngine::new(
        Arc::new(config),
        Arc::new(NullSink),
        Arc::new(PlainCodec),
        Arc::new(PlainCodec),
        None,
    )
}

fn wait_for<F: Fn(&DccEngine) -> bool>(engine: &mut DccEngine, predicate: F, attempts: u32) -> bool {
    for _ in 0..attempts {
        if predicate(engine) {
            return true;
        }
        engine.tick(ServerHandle(1));
        std::thread::sleep(Duration::from_millis(10));
    }
    predicate(engine)
}

/// S1: a 3 KiB file send reaches the peer byte-for-byte and the sender
/// reports `Done`, having offered the exact `DCC SEND f <ip> <port> 3072`
/// CTCP line.
#[test]
fn s1_file_send_happy_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f");
    let payload: Vec<u8> = (0u32..3072).map(|i| (i % 256) as u8).collect();
    std::fs::write(&path, &payload).unwrap();

    let mut engine = make_engine(TestConfig {
        download_path: dir.path().to_path_buf(),
        auto_resume: false,
        auto_rename: false,
        port: None,
        timeout: None,
    });

    let (id, line) = create::offer_send_file(&mut engine, ServerHandle(1), "bob", &path).unwrap();
    assert!(line.starts_with("\u{1}DCC SEND f 2130706433 "));
    assert!(line.ends_with(" 3072\u{1}"));

    let port = {
        let parts: Vec<&str> = line.trim_matches('\u{1}').split(' ').collect();
        parts[4].parse::<u16>().unwrap()
    };

    let mut peer = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
    peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    assert!(wait_for(&mut engine, |e| e.registry.get(id).unwrap().status == TransferStatus::Active, 50));

    let mut received = Vec::new();
    let mut buf = [0u8; 256];
    while received.len() < payload.len() {
        match peer.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => received.extend_from_slice(&buf[..n]),
            Err(_) => break,
        }
    }
    assert_eq!(received, payload);

    peer.write_all(&(payload.len() as u32).to_be_bytes()).unwrap();

    assert!(wait_for(&mut engine, |e| e.registry.get(id).unwrap().status == TransferStatus::Done, 200));
}

/// S2: a collision with `auto_resume = false, auto_rename = true`
/// resolves to the first free numeric suffix, with no resume offset.
#[test]
fn s2_receive_collision_and_rename() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alice.f"), [0u8; 10]).unwrap();

    let mut engine = make_engine(TestConfig {
        download_path: dir.path().to_path_buf(),
        auto_resume: false,
        auto_rename: true,
        port: None,
        timeout: None,
    });

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let offer = DccOffer::Send {
        name: "f".to_string(),
        addr: model::ipv4::addr_to_host_order(Ipv4Addr::LOCALHOST),
        port,
        size: 100,
    };

    let accepter = std::thread::spawn(move || {
        let (mut sock, _) = listener.accept().unwrap();
        sock.write_all(&[1u8; 100]).unwrap();
    });

    let id = create::register_incoming_file(&mut engine, ServerHandle(1), "alice", &offer).unwrap();
    accepter.join().unwrap();

    let transfer = engine.registry.get(id).unwrap();
    assert_eq!(transfer.local_filename, Some(dir.path().join("alice.f.1")));
    assert_eq!(transfer.start_resume, 0);

    assert!(wait_for(&mut engine, |e| e.registry.get(id).unwrap().status == TransferStatus::Done, 200));
    assert_eq!(std::fs::read(dir.path().join("alice.f.1")).unwrap().len(), 100);
}

/// S3: a collision with `auto_resume = true` emits `DCC RESUME f <port>
/// 40`, and on the matching `DCC ACCEPT f <port> 40` the receiver opens
/// in append mode and finishes at `pos = 100`.
#[test]
fn s3_receive_with_resume() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alice.f"), [9u8; 40]).unwrap();

    let mut engine = make_engine(TestConfig {
        download_path: dir.path().to_path_buf(),
        auto_resume: true,
        auto_rename: true,
        port: None,
        timeout: None,
    });

    // The sender's side of the handshake: a Connecting FileSend transfer
    // waiting for the RESUME/ACCEPT pair, grounded on offer_protocol.
    let sender_id = engine.registry.reserve_id();
    let mut sender_transfer = model::transfer::Transfer::new(
        sender_id,
        ServerHandle(1),
        model::kind::TransferKind::FileSend,
        "alice".to_string(),
        1024,
        true,
    );
    sender_transfer.status = TransferStatus::Connecting;
    sender_transfer.peer_port = 4242;
    sender_transfer.filename = Some("f".to_string());
    engine.registry.insert(sender_transfer);

    let resume = DccContinuation::Resume { name: "f".to_string(), port: 4242, position: 40 };
    let (matched, reply) = offer_protocol::handle_resume(&mut engine.registry, ServerHandle(1), &resume, false).unwrap();
    assert_eq!(matched, sender_id);
    assert_eq!(reply, "\u{1}DCC ACCEPT f 4242 40\u{1}");

    // The receiver's side: resolve against the on-disk file, discover it
    // is resume-eligible, and connect with start_resume = 40.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let offer = DccOffer::Send {
        name: "f".to_string(),
        addr: model::ipv4::addr_to_host_order(Ipv4Addr::LOCALHOST),
        port,
        size: 100,
    };

    let accepter = std::thread::spawn(move || {
        let (mut sock, _) = listener.accept().unwrap();
        sock.write_all(&[2u8; 60]).unwrap();
    });

    let recv_id = create::register_incoming_file(&mut engine, ServerHandle(1), "alice", &offer).unwrap();
    accepter.join().unwrap();

    assert_eq!(engine.registry.get(recv_id).unwrap().start_resume, 40);
    assert!(wait_for(&mut engine, |e| e.registry.get(recv_id).unwrap().pos == 100, 200));

    let final_bytes = std::fs::read(dir.path().join("alice.f")).unwrap();
    assert_eq!(final_bytes.len(), 100);
    assert_eq!(&final_bytes[..40], &[9u8; 40][..]);
    assert_eq!(&final_bytes[40..], &[2u8; 60][..]);
}

/// S5: a filename containing a space round-trips quoted through the
/// offer grammar and the RESUME/ACCEPT continuation pair.
#[test]
fn s5_quoted_filename_round_trips_through_resume_accept() {
    let offer = DccOffer::Send {
        name: "my file.txt".to_string(),
        addr: 1,
        port: 9000,
        size: 0,
    };
    let emitted = offer.emit(false);
    assert_eq!(emitted, "DCC SEND \"my file.txt\" 1 9000 0");
    assert_eq!(DccOffer::parse(&emitted).unwrap(), offer);

    let mut registry = engine::Registry::new();
    let id = registry.reserve_id();
    let mut t = model::transfer::Transfer::new(id, ServerHandle(1), model::kind::TransferKind::FileSend, "bob".to_string(), 4096, false);
    t.status = TransferStatus::Connecting;
    t.peer_port = 9000;
    t.filename = Some("my file.txt".to_string());
    registry.insert(t);

    let resume = DccContinuation::Resume { name: "my file.txt".to_string(), port: 9000, position: 0 };
    let (matched, reply) = offer_protocol::handle_resume(&mut registry, ServerHandle(1), &resume, false).unwrap();
    assert_eq!(matched, id);
    assert_eq!(reply, "\u{1}DCC ACCEPT \"my file.txt\" 9000 0\u{1}");
}

/// S6: with `dcc_timeout = 2` and no bytes flowing for 3s, the Scheduler
/// marks the transfer `Failed` with a `TransferTimeout` report.
#[test]
fn s6_inactivity_timeout_fails_the_transfer() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = make_engine(TestConfig {
        download_path: dir.path().to_path_buf(),
        auto_resume: false,
        auto_rename: false,
        port: None,
        timeout: Some(Duration::from_secs(2)),
    });

    let id = engine.registry.reserve_id();
    let mut t = model::transfer::Transfer::new(id, ServerHandle(1), model::kind::TransferKind::FileRecv, "bob".to_string(), 4096, false);
    t.status = TransferStatus::Active;
    t.last_activity = std::time::Instant::now() - Duration::from_secs(3);
    engine.registry.insert(t);

    engine.tick(ServerHandle(1));
    assert_eq!(engine.registry.get(id).unwrap().status, TransferStatus::Failed);
}
