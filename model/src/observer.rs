//! The observer sink external collaborator (spec §1, §4.0.1): the UI,
//! modeled as a set of notification callbacks the engine invokes. The
//! engine never blocks on these calls and never inspects their return
//! value beyond [`ObserverSink::associate_chat_channel`].

use crate::status::TransferStatus;
use crate::transfer::{ChatChannelHandle, TransferId};

/// One method per distinct notification family named across spec §4 and
/// §7, rather than a single enum match, so a host can route each to its
/// own UI surface (status line vs. hotlist vs. chat buffer).
pub trait ObserverSink {
    /// A user-visible informational line (spec §4.4, §4.10: "OK" lines).
    fn info(&self, transfer: Option<TransferId>, text: &str);

    /// A user-visible error line (spec §7: every error becomes one of
    /// these plus a status transition).
    fn error(&self, transfer: Option<TransferId>, text: &str);

    /// Queues the transfer's row for hotlist attention (spec §7: "File-
    /// ended transfers always produce ... a hotlist ping").
    fn hotlist_ping(&self, transfer: TransferId);

    /// Requests the host redraw the transfer's row (spec §4.7.3, §4.10).
    fn redraw(&self, transfer: TransferId);

    /// Invoked once a `ChatSend`/`ChatRecv` transfer goes `Active`
    /// (spec §4.6.3): asks the host to create (or find) the private chat
    /// buffer bound to this transfer. Returning `None` means the host
    /// declined — the engine reports [`crate::DccError::AssociationFailed`]
    /// and closes the transfer `Failed`.
    fn associate_chat_channel(&self, transfer: TransferId, remote_nick: &str) -> Option<ChatChannelHandle>;

    /// One already-decoded, already-color-stripped chat line arrived
    /// (spec §4.8). Highlight detection is entirely the host's business
    /// (SPEC_FULL §4.11) — the engine always calls this and nothing else.
    fn chat_message(&self, channel: ChatChannelHandle, line: &str);

    /// The chat session this channel was bound to ended (spec §4.8: "On
    /// `recv` returning 0 or error: close with `Aborted`").
    fn chat_closed(&self, channel: ChatChannelHandle, reason: TransferStatus);

    /// The last transfer referencing this channel was freed: the host
    /// should tear the channel down (spec §4.10 `free`).
    fn teardown_chat_channel(&self, channel: ChatChannelHandle);
}
