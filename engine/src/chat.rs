//! Chat Session: line reassembly over a TCP stream, decode/route to the
//! observer sink, and outgoing line encoding (spec §4.8). Grounded on the
//! teacher's `incoming_chat_request` (`client/src/dcc_commands/chat.rs`),
//! extended with the `\r\n`/`\n` reassembly buffer spec §4.8 requires —
//! the teacher's GTK channel delivered whole messages already split by
//! the line protocol, which DCC CHAT's raw TCP stream does not guarantee.

use model::codec::{ColorCodec, LineCodec};
use model::observer::ObserverSink;
use model::transfer::ChatChannelHandle;

const RECV_BUF_SIZE: usize = 4096;
const SEND_BUF_SIZE: usize = 4096;

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Splits `chunk` into complete lines, first on `\r\n` then on `\n`
/// (spec §4.8), returning the complete raw lines and the new unterminated
/// remainder (empty if the chunk ended exactly on a line). Operates on
/// raw bytes throughout, since the line boundary is a property of the
/// wire bytes the peer sent, not of whatever charset those bytes decode
/// to — decoding happens per line afterward, in `dispatch_line`.
pub fn split_lines(carry: &[u8], chunk: &[u8]) -> (Vec<Vec<u8>>, Vec<u8>) {
    let mut combined = carry.to_vec();
    combined.extend_from_slice(chunk);
    let mut lines = Vec::new();
    let mut rest = combined.as_slice();

    loop {
        if let Some(idx) = find_subslice(rest, b"\r\n") {
            lines.push(rest[..idx].to_vec());
            rest = &rest[idx + 2..];
            continue;
        }
        if let Some(idx) = find_subslice(rest, b"\n") {
            lines.push(rest[..idx].to_vec());
            rest = &rest[idx + 1..];
            continue;
        }
        break;
    }

    (lines, rest.to_vec())
}

/// Decodes one reassembled raw line and routes it to the Observer Sink
/// as a chat-buffer message (spec §4.8). Highlight detection is the
/// sink's job (SPEC_FULL §4.11).
pub fn dispatch_line(
    raw_line: &[u8],
    line_codec: &dyn LineCodec,
    color_codec: &dyn ColorCodec,
    sink: &dyn ObserverSink,
    channel: ChatChannelHandle,
) {
    let decoded = line_codec.decode(raw_line);
    let stripped = color_codec.strip(&decoded);
    sink.chat_message(channel, &stripped);
}

/// Formats an outgoing chat line the way `snprintf` into a 4096-byte
/// buffer would (spec §4.8 "Send"): skip empty lines or a bare `"\r\n"`.
pub fn format_outgoing(text: &str) -> Option<String> {
    let mut line = text.to_string();
    if line.len() > SEND_BUF_SIZE {
        line.truncate(SEND_BUF_SIZE);
    }
    if line.is_empty() || line == "\r\n" {
        None
    } else {
        Some(line)
    }
}

pub const RECV_CHUNK: usize = RECV_BUF_SIZE;
