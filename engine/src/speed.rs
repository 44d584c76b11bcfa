//! Speed/ETA recalculation (spec §4.9). No direct teacher precedent —
//! the teacher's GUI progress bar only ever reported a raw fraction
//! (`client/src/dcc_commands/transfer.rs::send_progress`), never a rate
//! or an ETA.

use model::transfer::Transfer;
use std::time::Instant;

/// Recomputes `bytes_per_sec`/`eta` in place, at every progress event or
/// on completion, per the formula in spec §4.9. `now` is threaded in so
/// tests can drive the clock deterministically.
pub fn recompute(transfer: &mut Transfer, now: Instant, ended: bool) {
    let start_transfer = transfer.start_transfer.unwrap_or(transfer.start_time);
    let elapsed_total = now.saturating_duration_since(start_transfer).as_secs_f64().max(1.0);
    let moved_total = transfer.pos.saturating_sub(transfer.start_resume) as f64;

    if ended {
        transfer.bytes_per_sec = moved_total / elapsed_total;
        transfer.eta = 0;
    } else {
        let total_avg = moved_total / elapsed_total;
        let remaining = transfer.size.saturating_sub(transfer.pos) as f64;
        transfer.eta = (remaining / total_avg.max(1.0)) as u64;

        let window = now
            .saturating_duration_since(transfer.last_check_time)
            .as_secs_f64()
            .max(1.0);
        let moved_window = transfer.pos.saturating_sub(transfer.last_check_pos) as f64;
        transfer.bytes_per_sec = moved_window / window;
    }

    transfer.last_check_time = now;
    transfer.last_check_pos = transfer.pos;
}
