//! Send-worker loop (spec §4.7.1), rewired from the teacher's
//! `transfer_file` (`client/src/dcc_commands/transfer.rs`) onto a real
//! TCP socket with an IRC-style 32-bit cumulative ACK read via
//! `TcpStream::peek`, matching `MSG_PEEK`'s "tolerate partial reads"
//! contract without a raw syscall.

use model::frame::{WorkerError, WorkerStatus, WorkerStatusFrame};
use model::transfer::WorkerHandle;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::spawn;

#[allow(clippy::too_many_arguments)]
pub fn start(
    mut file: File,
    mut sock: TcpStream,
    blocksize: u32,
    fast_send: bool,
    mut pos: u64,
    size: u64,
    mut ack: u64,
) -> Result<WorkerHandle, model::error::DccError> {
    spawn(move |emit, cancel| run(&mut file, &mut sock, blocksize, fast_send, &mut pos, size, &mut ack, emit, cancel))
}

#[allow(clippy::too_many_arguments)]
fn run(
    file: &mut File,
    sock: &mut TcpStream,
    blocksize: u32,
    fast_send: bool,
    pos: &mut u64,
    size: u64,
    ack: &mut u64,
    emit: &mut dyn FnMut(WorkerStatusFrame),
    cancel: &Arc<AtomicBool>,
) {
    let mut last_progress = Instant::now();
    let mut buf = vec![0u8; blocksize.max(1) as usize];

    loop {
        if cancel.load(Ordering::SeqCst) {
            return;
        }

        if *pos > *ack {
            consume_ack(sock, ack);
        }

        if *pos >= size && *ack >= size {
            emit(WorkerStatusFrame::new(WorkerStatus::Done, WorkerError::NoError, *pos));
            return;
        }

        if *pos < size && (fast_send || *pos <= *ack) {
            if file.seek(SeekFrom::Start(*pos)).is_err() {
                emit(WorkerStatusFrame::new(WorkerStatus::Failed, WorkerError::ReadLocal, *pos));
                return;
            }
            let n = match file.read(&mut buf) {
                Ok(n) if n >= 1 => n,
                _ => {
                    emit(WorkerStatusFrame::new(WorkerStatus::Failed, WorkerError::ReadLocal, *pos));
                    return;
                }
            };

            match std::io::Write::write(sock, &buf[..n]) {
                Ok(m) if m > 0 => {
                    *pos += m as u64;
                    if last_progress.elapsed() >= Duration::from_secs(1) {
                        emit(WorkerStatusFrame::new(WorkerStatus::Active, WorkerError::NoError, *pos));
                        last_progress = Instant::now();
                    }
                }
                Ok(_) => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(_) => {
                    // Design Note §9 bug #2: a non-EAGAIN send failure is
                    // SendBlock, not the original's ambiguous ReadLocal.
                    emit(WorkerStatusFrame::new(WorkerStatus::Failed, WorkerError::SendBlock, *pos));
                    return;
                }
            }
        } else {
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

fn consume_ack(sock: &mut TcpStream, ack: &mut u64) {
    let mut peek_buf = [0u8; 4];
    match sock.peek(&mut peek_buf) {
        Ok(4) => {
            let mut consumed = [0u8; 4];
            if sock.read_exact(&mut consumed).is_ok() {
                *ack = u32::from_be_bytes(consumed) as u64;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::frame::FRAME_LEN;
    use std::io::Write as _;
    use std::net::TcpListener;
    use tempfile::NamedTempFile;

    #[test]
    fn sends_a_small_file_and_reports_done() {
        let mut src = NamedTempFile::new().unwrap();
        let payload = vec![7u8; 64];
        src.write_all(&payload).unwrap();
        let file = File::open(src.path()).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let sender_sock = TcpStream::connect(addr).unwrap();
        let (receiver_sock, _) = listener.accept().unwrap();

        let handle = start(file, sender_sock, 16, true, 0, 64, 64).unwrap();

        let mut received = Vec::new();
        let mut buf = [0u8; 16];
        receiver_sock.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let mut receiver_sock = receiver_sock;
        while received.len() < payload.len() {
            let n = std::io::Read::read(&mut receiver_sock, &mut buf).unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received, payload);

        let mut pipe_read = handle.pipe_read;
        let mut frame_buf = [0u8; FRAME_LEN];
        let mut saw_done = false;
        for _ in 0..200 {
            match std::io::Read::read_exact(&mut pipe_read, &mut frame_buf) {
                Ok(()) => {
                    if let Some(frame) = model::frame::WorkerStatusFrame::decode(&frame_buf) {
                        if frame.status == WorkerStatus::Done {
                            saw_done = true;
                            break;
                        }
                    }
                }
                Err(_) => std::thread::sleep(Duration::from_millis(5)),
            }
        }
        assert!(saw_done);
    }
}
