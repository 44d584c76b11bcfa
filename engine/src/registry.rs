//! Owned collection of [`Transfer`] records, addressed by stable
//! [`TransferId`] (spec §3.3, SPEC_FULL §3 "Registry identity"). Replaces
//! the teacher's `Arc<RwLock<HashMap<..>>>` session bookkeeping
//! (`model/src/session.rs`) with an unlocked `Vec<Option<Transfer>>`,
//! since spec §5 establishes the registry is only ever touched by the
//! single scheduler thread.

use model::kind::TransferKind;
use model::status::TransferStatus;
use model::transfer::{ServerHandle, Transfer, TransferId};

/// Transfer storage plus insertion-order bookkeeping. Newest transfers
/// are appended to `order` (spec §3.3: "lives in the registry as
/// newest-first").
#[derive(Debug, Default)]
pub struct Registry {
    slots: Vec<Option<Transfer>>,
    order: Vec<TransferId>,
    next_id: u32,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            slots: Vec::new(),
            order: Vec::new(),
            next_id: 0,
        }
    }

    /// Inserts `transfer`, which must already carry its final `id` set via
    /// [`Registry::reserve_id`].
    pub fn insert(&mut self, transfer: Transfer) {
        let idx = transfer.id.as_raw() as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        self.order.push(transfer.id);
        self.slots[idx] = Some(transfer);
    }

    /// Allocates the next never-reused [`TransferId`] without inserting
    /// anything yet, so callers can build a `Transfer` carrying its own id.
    pub fn reserve_id(&mut self) -> TransferId {
        let id = TransferId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn get(&self, id: TransferId) -> Option<&Transfer> {
        self.slots.get(id.as_raw() as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: TransferId) -> Option<&mut Transfer> {
        self.slots.get_mut(id.as_raw() as usize)?.as_mut()
    }

    /// Removes and returns the transfer, dropping it from the order
    /// vector. A stale id looked up afterward safely misses (spec §3:
    /// "ids are never reused").
    pub fn remove(&mut self, id: TransferId) -> Option<Transfer> {
        let removed = self.slots.get_mut(id.as_raw() as usize)?.take()?;
        self.order.retain(|&existing| existing != id);
        Some(removed)
    }

    /// Iterates live transfers in registry (newest-first insertion) order,
    /// the traversal the Scheduler uses for its bounded per-tick pass
    /// (spec §4.6 "Ordering guarantee").
    pub fn iter(&self) -> impl Iterator<Item = &Transfer> {
        self.order.iter().filter_map(move |id| self.get(*id))
    }

    pub fn ids(&self) -> Vec<TransferId> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Locates a transfer by `(server_handle, kind, status, port)`, the
    /// lookup an incoming `DCC RESUME`/`DCC ACCEPT` uses to pair itself
    /// with the waiting transfer (spec §4.3). Fixes Design Note §9 bug
    /// #1: the original compares all four fields for real equality,
    /// never the `status = status` assignment typo.
    pub fn find_by_port(
        &self,
        server: ServerHandle,
        kind: TransferKind,
        status: TransferStatus,
        port: u16,
    ) -> Option<TransferId> {
        self.iter()
            .find(|t| {
                t.server_handle == server
                    && t.kind == kind
                    && t.status == status
                    && t.peer_port == port
            })
            .map(|t| t.id)
    }

    /// True iff some non-ended transfer already holds `port` (spec §3.3
    /// invariant: "a given `(peer_port, Active|Connecting|Waiting)` never
    /// occurs twice"; used by the Port Allocator, spec §4.2).
    pub fn port_in_use(&self, port: u16) -> bool {
        self.iter().any(|t| t.is_live() && t.peer_port == port)
    }
}
