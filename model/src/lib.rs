//! Data model, wire grammar and collaborator traits for the DCC transfer
//! engine. This crate has no knowledge of sockets, threads or the
//! filesystem — it is the vocabulary the `engine` crate is built out of.

pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod ipv4;
pub mod kind;
pub mod observer;
pub mod offer;
pub mod proxy;
pub mod status;
pub mod transfer;

pub use error::DccError;
pub use kind::TransferKind;
pub use status::TransferStatus;
pub use transfer::{ChatChannelHandle, ServerHandle, Transfer, TransferId};
