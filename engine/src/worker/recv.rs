//! Recv-worker loop (spec §4.7.2), rewired from the teacher's
//! `receive_file` (`client/src/dcc_commands/transfer.rs`) onto a real TCP
//! socket, sending the IRC-style big-endian 32-bit cumulative ACK back to
//! the sender after each block.

use model::frame::{WorkerError, WorkerStatus, WorkerStatusFrame};
use model::transfer::WorkerHandle;
use std::fs::File;
use std::io::Write as _;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::spawn;

pub fn start(
    mut file: File,
    mut sock: TcpStream,
    blocksize: u32,
    mut pos: u64,
    size: u64,
) -> Result<WorkerHandle, model::error::DccError> {
    spawn(move |emit, cancel| run(&mut file, &mut sock, blocksize, &mut pos, size, emit, cancel))
}

fn run(
    file: &mut File,
    sock: &mut TcpStream,
    blocksize: u32,
    pos: &mut u64,
    size: u64,
    emit: &mut dyn FnMut(WorkerStatusFrame),
    cancel: &Arc<AtomicBool>,
) {
    let mut last_progress = Instant::now();
    let mut buf = vec![0u8; blocksize.max(1) as usize];

    loop {
        if cancel.load(Ordering::SeqCst) {
            return;
        }

        let n = match std::io::Read::read(sock, &mut buf) {
            Ok(0) => {
                emit(WorkerStatusFrame::new(WorkerStatus::Failed, WorkerError::RecvBlock, *pos));
                return;
            }
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(1));
                continue;
            }
            Err(_) => {
                emit(WorkerStatusFrame::new(WorkerStatus::Failed, WorkerError::RecvBlock, *pos));
                return;
            }
        };

        if file.write_all(&buf[..n]).is_err() {
            emit(WorkerStatusFrame::new(WorkerStatus::Failed, WorkerError::WriteLocal, *pos));
            return;
        }

        *pos += n as u64;
        let ack = (*pos as u32).to_be_bytes();
        let _ = sock.write_all(&ack);

        if *pos >= size {
            emit(WorkerStatusFrame::new(WorkerStatus::Done, WorkerError::NoError, *pos));
            return;
        }

        if last_progress.elapsed() >= Duration::from_secs(1) {
            emit(WorkerStatusFrame::new(WorkerStatus::Active, WorkerError::NoError, *pos));
            last_progress = Instant::now();
        }
    }
}
