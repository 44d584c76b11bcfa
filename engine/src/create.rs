//! Transfer creation (spec §4.4) and the synchronous half of Connect/
//! Listen (spec §4.5), grounded on the teacher's `outgoing_send_request`/
//! `incoming_send_request` (`client/src/dcc_commands/send.rs`): validate,
//! place the file, bind-or-connect, then hand the host a registered
//! Transfer. Everything here runs once, outside the Scheduler's tick
//! loop, at the moment a host issues or accepts an offer.

use crate::{listen_connect, port_allocator, teardown, DccEngine};
use model::error::DccError;
use model::kind::TransferKind;
use model::offer::{build_chat_offer, build_send_offer, DccOffer};
use model::status::TransferStatus;
use model::transfer::{ServerHandle, Transfer, TransferId};
use std::fs::{File, OpenOptions};
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Instant;

/// Offers an outgoing file send (spec §4.4 steps 1/3, §4.5 send side):
/// opens the local file, binds a listener in the configured port range,
/// and registers a `Connecting` Transfer. Returns the CTCP line the host
/// delivers to the peer.
pub fn offer_send_file(
    engine: &mut DccEngine,
    server: ServerHandle,
    remote_nick: &str,
    local_path: &Path,
) -> Result<(TransferId, String), DccError> {
    let metadata = std::fs::metadata(local_path).map_err(DccError::CannotAccessFile)?;
    let size = metadata.len();
    let file = File::open(local_path).map_err(DccError::CannotAccessFile)?;
    let filename = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let listener = port_allocator::bind(&engine.registry, engine.config.port_range())?;
    listen_connect::prepare_send_listener(&listener)?;
    let port = listener.local_addr().map_err(DccError::CannotCreateSocket)?.port();

    let id = engine.registry.reserve_id();
    let mut transfer = Transfer::new(
        id,
        server,
        TransferKind::FileSend,
        remote_nick.to_string(),
        engine.config.blocksize(),
        engine.config.fast_send(),
    );
    transfer.filename = Some(filename.clone());
    transfer.local_filename = Some(local_path.to_path_buf());
    transfer.size = size;
    transfer.file_fd = Some(file);
    transfer.listen_sock = Some(listener);
    transfer.peer_port = port;
    transfer.status = TransferStatus::Connecting;
    engine.registry.insert(transfer);

    let addr = engine.config.own_ip().unwrap_or(Ipv4Addr::LOCALHOST);
    let offer_line = build_send_offer(&filename, addr, port, size, engine.config.convert_spaces());
    engine.sink.info(Some(id), &format!("offering {filename} to {remote_nick}"));
    Ok((id, offer_line))
}

/// Offers an outgoing chat (spec §4.4/§4.5 send side): same listen step
/// as a file send, but `status` stays `Waiting` — a chat offer only goes
/// `Active` once the Scheduler accepts the incoming connection (spec
/// §4.6.3), unlike a file send's `Connecting`.
pub fn offer_chat(
    engine: &mut DccEngine,
    server: ServerHandle,
    remote_nick: &str,
) -> Result<(TransferId, String), DccError> {
    let listener = port_allocator::bind(&engine.registry, engine.config.port_range())?;
    listen_connect::prepare_send_listener(&listener)?;
    let port = listener.local_addr().map_err(DccError::CannotCreateSocket)?.port();

    let id = engine.registry.reserve_id();
    let mut transfer = Transfer::new(id, server, TransferKind::ChatSend, remote_nick.to_string(), engine.config.blocksize(), false);
    transfer.filename = Some("DCC chat".to_string());
    transfer.listen_sock = Some(listener);
    transfer.peer_port = port;
    transfer.status = TransferStatus::Waiting;
    engine.registry.insert(transfer);

    let addr = engine.config.own_ip().unwrap_or(Ipv4Addr::LOCALHOST);
    let offer_line = build_chat_offer(addr, port);
    engine.sink.info(Some(id), &format!("offering chat to {remote_nick}"));
    Ok((id, offer_line))
}

/// Registers an incoming `DCC SEND` offer (spec §4.4 step 1): allocates a
/// `Waiting` Transfer the moment the offer arrives, unconditionally.
/// Connect/Listen (spec §4.4 step 3) only runs right away when
/// `auto_accept_files` is set; otherwise the Transfer sits `Waiting`
/// until the host calls [`connect_incoming_file`] in response to
/// explicit user confirmation.
pub fn register_incoming_file(
    engine: &mut DccEngine,
    server: ServerHandle,
    remote_nick: &str,
    offer: &DccOffer,
) -> Result<TransferId, DccError> {
    let DccOffer::Send { name, port, size, .. } = offer else {
        return Err(DccError::MalformedOffer("expected DCC SEND".to_string()));
    };
    let peer_addr = offer.addr();

    let id = engine.registry.reserve_id();
    let mut transfer = Transfer::new(id, server, TransferKind::FileRecv, remote_nick.to_string(), engine.config.blocksize(), engine.config.fast_send());
    transfer.filename = Some(name.clone());
    transfer.size = *size;
    transfer.peer_port = *port;
    transfer.peer_ipv4 = model::ipv4::addr_to_host_order(peer_addr);
    transfer.status = TransferStatus::Waiting;
    engine.registry.insert(transfer);
    engine.sink.info(Some(id), &format!("{remote_nick} offers {name} ({size} bytes)"));

    if engine.config.auto_accept_files() {
        connect_incoming_file(engine, id)?;
    }
    Ok(id)
}

/// Connect/Listen for a `Waiting` file receive (spec §4.1 + §4.4 step 3 +
/// §4.5 receive side): resolves the local filename, opens it fresh or in
/// append mode for a resume, and connects to the peer. Called
/// automatically from [`register_incoming_file`] when auto-accept is on,
/// or later by the host on explicit confirmation. Returns `Err` and
/// reports via the sink when the Filename Resolver can't place the file,
/// leaving the Transfer `Waiting` rather than tearing it down — the host
/// may retry once the collision is resolved.
pub fn connect_incoming_file(engine: &mut DccEngine, id: TransferId) -> Result<(), DccError> {
    let (remote_nick, name, size, port, peer_addr) = {
        let Some(transfer) = engine.registry.get(id) else {
            return Err(DccError::NotFound);
        };
        (
            transfer.remote_nick.clone(),
            transfer.filename.clone().unwrap_or_default(),
            transfer.size,
            transfer.peer_port,
            model::ipv4::host_order_to_addr(transfer.peer_ipv4),
        )
    };

    let app_data_dir = engine.config.upload_path().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
    let resolution = crate::filename_resolver::resolve(
        engine.config.download_path(),
        &app_data_dir,
        &remote_nick,
        &name,
        size,
        engine.config.auto_resume(),
        engine.config.auto_rename(),
    );
    let Some(resolution) = resolution else {
        engine.sink.error(Some(id), &format!("cannot place incoming file {name} from {remote_nick}"));
        return Err(DccError::CannotAccessFile(std::io::Error::new(std::io::ErrorKind::AlreadyExists, "filename collision")));
    };

    if let Some(parent) = resolution.local_filename.parent() {
        std::fs::create_dir_all(parent).map_err(DccError::CannotAccessFile)?;
    }
    let file = if resolution.resume_from.is_some() {
        OpenOptions::new().append(true).open(&resolution.local_filename).map_err(DccError::CannotAccessFile)?
    } else {
        OpenOptions::new().create(true).write(true).truncate(true).open(&resolution.local_filename).map_err(DccError::CannotAccessFile)?
    };

    {
        let transfer = engine.registry.get_mut(id).ok_or(DccError::NotFound)?;
        transfer.local_filename = Some(resolution.local_filename.clone());
        transfer.file_fd = Some(file);
        transfer.status = TransferStatus::Connecting;
        if let Some(resume_from) = resolution.resume_from {
            transfer.pos = resume_from;
            transfer.ack = resume_from;
            transfer.start_resume = resume_from;
            transfer.last_check_pos = resume_from;
        }
    }
    engine.sink.info(Some(id), &format!("accepting {name} from {remote_nick}"));

    let proxy = engine.config.proxy();
    let connect_result = match (&proxy, &engine.proxy) {
        (Some(cfg), Some(connector)) => {
            listen_connect::connect_receiver(peer_addr, port, Some((connector.as_ref(), &cfg.address, cfg.port, &cfg.username)))
        }
        _ => listen_connect::connect_receiver(peer_addr, port, None),
    };

    match connect_result {
        Ok(stream) => {
            let prepared = {
                if let Some(transfer) = engine.registry.get_mut(id) {
                    let worker_sock = stream.try_clone().ok();
                    transfer.data_sock = Some(stream);
                    transfer.status = TransferStatus::Active;
                    transfer.start_transfer = Some(Instant::now());
                    transfer.touch_activity();
                    let file = transfer.file_fd.as_ref().and_then(|f| f.try_clone().ok());
                    worker_sock.zip(file).map(|(sock, file)| (sock, file, transfer.blocksize, transfer.pos, transfer.size))
                } else {
                    None
                }
            };
            let Some((worker_sock, file, blocksize, pos, size)) = prepared else {
                return Ok(());
            };
            match crate::worker::recv::start(file, worker_sock, blocksize, pos, size) {
                Ok(handle) => {
                    if let Some(transfer) = engine.registry.get_mut(id) {
                        transfer.worker = Some(handle);
                    }
                }
                Err(e) => {
                    teardown::close(engine, id, TransferStatus::Failed);
                    return Err(e);
                }
            }
            Ok(())
        }
        Err(e) => {
            teardown::close(engine, id, TransferStatus::Failed);
            Err(e)
        }
    }
}

/// Registers an incoming `DCC CHAT` offer (spec §4.4 step 1): allocates a
/// `Waiting` Transfer unconditionally. Connect (spec §4.4 step 3) only
/// runs right away when `auto_accept_chats` is set; otherwise it waits
/// for [`connect_incoming_chat`] to be called on explicit confirmation.
pub fn register_incoming_chat(
    engine: &mut DccEngine,
    server: ServerHandle,
    remote_nick: &str,
    offer: &DccOffer,
) -> Result<TransferId, DccError> {
    let DccOffer::Chat { .. } = offer else {
        return Err(DccError::MalformedOffer("expected DCC CHAT".to_string()));
    };
    let peer_addr = offer.addr();
    let port = offer.port();

    let id = engine.registry.reserve_id();
    let mut transfer = Transfer::new(id, server, TransferKind::ChatRecv, remote_nick.to_string(), engine.config.blocksize(), false);
    transfer.filename = Some("DCC chat".to_string());
    transfer.peer_port = port;
    transfer.peer_ipv4 = model::ipv4::addr_to_host_order(peer_addr);
    transfer.status = TransferStatus::Waiting;
    engine.registry.insert(transfer);
    engine.sink.info(Some(id), &format!("{remote_nick} offers a chat"));

    if engine.config.auto_accept_chats() {
        connect_incoming_chat(engine, id)?;
    }
    Ok(id)
}

/// Connect for a `Waiting` incoming chat (spec §4.5 receive side): chat
/// never resumes, so this connects and associates the chat channel
/// synchronously, going straight to `Active` — there's no accept-poll
/// step on the receive side the way there is for an outgoing chat offer.
pub fn connect_incoming_chat(engine: &mut DccEngine, id: TransferId) -> Result<(), DccError> {
    let (remote_nick, port, peer_addr) = {
        let Some(transfer) = engine.registry.get(id) else {
            return Err(DccError::NotFound);
        };
        (
            transfer.remote_nick.clone(),
            transfer.peer_port,
            model::ipv4::host_order_to_addr(transfer.peer_ipv4),
        )
    };

    let stream = match listen_connect::connect_receiver(peer_addr, port, None) {
        Ok(stream) => stream,
        Err(e) => {
            teardown::close(engine, id, TransferStatus::Failed);
            return Err(e);
        }
    };
    let channel = engine.sink.associate_chat_channel(id, &remote_nick);
    let Some(transfer) = engine.registry.get_mut(id) else {
        return Ok(());
    };
    transfer.data_sock = Some(stream);
    transfer.status = TransferStatus::Active;
    transfer.start_transfer = Some(Instant::now());
    transfer.touch_activity();
    transfer.chat_channel_handle = channel;
    Ok(())
}
