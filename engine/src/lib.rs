//! The DCC transfer engine: registry, scheduler, filename resolver, port
//! allocator, offer/accept protocol, chat session and file transfer
//! workers (spec §2). A host owns one [`DccEngine`] per IRC server
//! connection and calls [`DccEngine::tick`] once per event-loop
//! iteration.

pub mod chat;
pub mod create;
pub mod error;
pub mod filename_resolver;
pub mod listen_connect;
pub mod offer_protocol;
pub mod port_allocator;
pub mod registry;
pub mod scheduler;
pub mod speed;
pub mod teardown;
pub mod worker;

pub use error::EngineError;
pub use registry::Registry;

use model::config::ConfigView;
use model::observer::ObserverSink;
use model::transfer::{ServerHandle, TransferId};
use std::sync::Arc;

/// Owns the transfer registry plus the collaborators the engine needs to
/// reach the outside world (spec §9: "Global mutable `dcc_list` → engine
/// instance"). A host constructs one of these per IRC server connection.
pub struct DccEngine {
    pub registry: Registry,
    pub config: Arc<dyn ConfigView + Send + Sync>,
    pub sink: Arc<dyn ObserverSink + Send + Sync>,
    pub line_codec: Arc<dyn model::codec::LineCodec>,
    pub color_codec: Arc<dyn model::codec::ColorCodec>,
    pub proxy: Option<Arc<dyn model::proxy::ProxyConnector>>,
}

impl DccEngine {
    pub fn new(
        config: Arc<dyn ConfigView + Send + Sync>,
        sink: Arc<dyn ObserverSink + Send + Sync>,
        line_codec: Arc<dyn model::codec::LineCodec>,
        color_codec: Arc<dyn model::codec::ColorCodec>,
        proxy: Option<Arc<dyn model::proxy::ProxyConnector>>,
    ) -> Self {
        DccEngine {
            registry: Registry::new(),
            config,
            sink,
            line_codec,
            color_codec,
            proxy,
        }
    }

    /// Runs one non-blocking Scheduler pass over every live transfer
    /// (spec §4.6). Call this once per host event-loop iteration.
    pub fn tick(&mut self, server: ServerHandle) {
        scheduler::tick(self, server);
    }

    /// Removes and drops a transfer's resources immediately; never
    /// called implicitly by the engine itself (spec §3.3 lifecycle,
    /// §4.10 `free`).
    pub fn free(&mut self, id: TransferId) {
        teardown::free(self, id);
    }
}
