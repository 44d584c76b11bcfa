//! Charset conversion and colour-markup stripping, both external
//! collaborators applied to DCC CHAT text lines (spec §1, §4.0.2, §4.8).

/// Converts between the wire bytes of a chat line and the `String` the
/// engine reassembles lines into. Stands in for the IRC client's
/// character-set conversion layer (spec §1 exclusion).
pub trait LineCodec: Send + Sync {
    fn decode(&self, raw: &[u8]) -> String;
    fn encode(&self, text: &str) -> Vec<u8>;
}

/// Strips (or otherwise neutralizes) inline colour/formatting markup in a
/// decoded chat line (spec §4.8).
pub trait ColorCodec: Send + Sync {
    fn strip(&self, text: &str) -> String;
}

/// The default codec pair `cli` wires up: lossy UTF-8 and no colour
/// stripping. A host embedding a real IRC client supplies its own pair
/// for mIRC colour codes, iconv transcoding, etc.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainCodec;

impl LineCodec for PlainCodec {
    fn decode(&self, raw: &[u8]) -> String {
        String::from_utf8_lossy(raw).into_owned()
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        text.as_bytes().to_vec()
    }
}

impl ColorCodec for PlainCodec {
    fn strip(&self, text: &str) -> String {
        text.to_string()
    }
}
