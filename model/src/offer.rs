//! The DCC SEND / CHAT / RESUME / ACCEPT CTCP grammar (spec §4.3, §6).
//!
//! This module only knows the bare `DCC ...` body and its optional CTCP
//! `\x01 ... \x01` wrapping; the outer PRIVMSG framing and routing by
//! nick is the IRC line protocol's job (spec §1, out of scope).

use crate::error::DccError;
use crate::ipv4::{addr_to_host_order, host_order_to_addr};
use std::fmt::Write as _;
use std::net::Ipv4Addr;

const CTCP_MARKER: u8 = 0x01;

/// Wraps a bare CTCP body in `\x01 ... \x01` markers (spec §6).
pub fn ctcp_wrap(body: &str) -> String {
    format!("{}{}{}", CTCP_MARKER as char, body, CTCP_MARKER as char)
}

/// Strips CTCP markers, if present. Returns the body unchanged if it
/// wasn't CTCP-wrapped.
pub fn ctcp_unwrap(line: &str) -> &str {
    let bytes = line.as_bytes();
    if bytes.len() >= 2 && bytes[0] == CTCP_MARKER && bytes[bytes.len() - 1] == CTCP_MARKER {
        &line[1..line.len() - 1]
    } else {
        line
    }
}

/// Rewrites spaces to `_` (the `dcc_convert_spaces` behaviour, spec §4.3).
fn convert_spaces_in(name: &str) -> String {
    name.replace(' ', "_")
}

/// Applies `dcc_convert_spaces`, then quotes the result iff it still
/// contains whitespace (spec §4.3: quoting only kicks in when spaces
/// were *not* converted away).
fn format_filename(name: &str, convert_spaces: bool) -> String {
    let name = if convert_spaces {
        convert_spaces_in(name)
    } else {
        name.to_string()
    };
    if name.contains(' ') {
        format!("\"{name}\"")
    } else {
        name
    }
}

/// Splits a DCC parameter list, honoring a single double-quoted token
/// (only the filename is ever quoted in this grammar).
fn split_params(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = s.trim().chars().peekable();
    let mut current = String::new();
    let mut in_quotes = false;
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            ' ' if !in_quotes => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// An outgoing or incoming DCC offer (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DccOffer {
    Send {
        name: String,
        addr: u32,
        port: u16,
        size: u64,
    },
    Chat {
        addr: u32,
        port: u16,
    },
}

impl DccOffer {
    /// Builds the bare `DCC SEND`/`DCC CHAT` body (no CTCP wrapping).
    pub fn emit(&self, convert_spaces: bool) -> String {
        match self {
            DccOffer::Send {
                name,
                addr,
                port,
                size,
            } => {
                let name = format_filename(name, convert_spaces);
                format!("DCC SEND {name} {addr} {port} {size}")
            }
            DccOffer::Chat { addr, port } => {
                format!("DCC CHAT chat {addr} {port}")
            }
        }
    }

    /// Parses a bare `DCC SEND`/`DCC CHAT` body.
    pub fn parse(body: &str) -> Result<Self, DccError> {
        let body = ctcp_unwrap(body.trim());
        let rest = body
            .strip_prefix("DCC ")
            .ok_or_else(|| DccError::MalformedOffer(body.to_string()))?;
        let (cmd, params) = rest
            .split_once(' ')
            .ok_or_else(|| DccError::MalformedOffer(body.to_string()))?;
        let params = split_params(params);
        match cmd {
            "SEND" => {
                if params.len() < 4 {
                    return Err(DccError::MalformedOffer(body.to_string()));
                }
                Ok(DccOffer::Send {
                    name: params[0].clone(),
                    addr: parse_u32(&params[1], body)?,
                    port: parse_u16(&params[2], body)?,
                    size: parse_u64(&params[3], body)?,
                })
            }
            "CHAT" => {
                if params.len() < 3 {
                    return Err(DccError::MalformedOffer(body.to_string()));
                }
                Ok(DccOffer::Chat {
                    addr: parse_u32(&params[1], body)?,
                    port: parse_u16(&params[2], body)?,
                })
            }
            _ => Err(DccError::MalformedOffer(body.to_string())),
        }
    }

    pub fn addr(&self) -> Ipv4Addr {
        match self {
            DccOffer::Send { addr, .. } | DccOffer::Chat { addr, .. } => host_order_to_addr(*addr),
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            DccOffer::Send { port, .. } | DccOffer::Chat { port, .. } => *port,
        }
    }
}

/// A `DCC RESUME`/`DCC ACCEPT` continuation (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DccContinuation {
    Resume {
        name: String,
        port: u16,
        position: u64,
    },
    Accept {
        name: String,
        port: u16,
        position: u64,
    },
}

impl DccContinuation {
    pub fn emit(&self, convert_spaces: bool) -> String {
        let (verb, name, port, position) = match self {
            DccContinuation::Resume {
                name,
                port,
                position,
            } => ("RESUME", name, port, position),
            DccContinuation::Accept {
                name,
                port,
                position,
            } => ("ACCEPT", name, port, position),
        };
        let name = format_filename(name, convert_spaces);
        let mut out = String::new();
        let _ = write!(out, "DCC {verb} {name} {port} {position}");
        out
    }

    pub fn parse(body: &str) -> Result<Self, DccError> {
        let body = ctcp_unwrap(body.trim());
        let rest = body
            .strip_prefix("DCC ")
            .ok_or_else(|| DccError::MalformedOffer(body.to_string()))?;
        let (cmd, params) = rest
            .split_once(' ')
            .ok_or_else(|| DccError::MalformedOffer(body.to_string()))?;
        let params = split_params(params);
        if params.len() < 3 {
            return Err(DccError::MalformedOffer(body.to_string()));
        }
        let name = params[0].clone();
        let port = parse_u16(&params[1], body)?;
        let position = parse_u64(&params[2], body)?;
        match cmd {
            "RESUME" => Ok(DccContinuation::Resume {
                name,
                port,
                position,
            }),
            "ACCEPT" => Ok(DccContinuation::Accept {
                name,
                port,
                position,
            }),
            _ => Err(DccError::MalformedOffer(body.to_string())),
        }
    }
}

fn parse_u16(s: &str, body: &str) -> Result<u16, DccError> {
    s.parse()
        .map_err(|_| DccError::MalformedOffer(body.to_string()))
}

fn parse_u32(s: &str, body: &str) -> Result<u32, DccError> {
    s.parse()
        .map_err(|_| DccError::MalformedOffer(body.to_string()))
}

fn parse_u64(s: &str, body: &str) -> Result<u64, DccError> {
    s.parse()
        .map_err(|_| DccError::MalformedOffer(body.to_string()))
}

/// Builds a DCC SEND offer for `name` targeting `addr:port`, advertising
/// `size` bytes (spec §4.3), and wraps it as a CTCP line.
pub fn build_send_offer(name: &str, addr: Ipv4Addr, port: u16, size: u64, convert_spaces: bool) -> String {
    let offer = DccOffer::Send {
        name: name.to_string(),
        addr: addr_to_host_order(addr),
        port,
        size,
    };
    ctcp_wrap(&offer.emit(convert_spaces))
}

/// Builds a DCC CHAT offer targeting `addr:port`, wrapped as a CTCP line.
pub fn build_chat_offer(addr: Ipv4Addr, port: u16) -> String {
    let offer = DccOffer::Chat {
        addr: addr_to_host_order(addr),
        port,
    };
    ctcp_wrap(&offer.emit(false))
}
