#![doc = include_str!("../README.md")]

extern crate alloc;

mod broadcast;
mod config;
mod error;
pub mod misc;
mod registry;
mod reporter;
mod server;
pub mod stream;
pub mod web_socket;

pub use broadcast::{BroadcastScope, broadcast};
pub use config::{DEFAULT_PORT, ServerConfig, TlsConfig};
pub use error::Error;
pub use registry::{ConnId, ConnMeta, Peer, Registry, RegistryError, RoomId};
pub use reporter::{DisconnectReason, Event, Reporter, TracingReporter};
pub use server::{Server, ServerError, ServerHandle, ServerState};

pub(crate) const _MAX_PAYLOAD_LEN: usize = 64 * 1024 * 1024;

/// Shortcut of [`core::result::Result<T, Error>`].
pub type Result<T> = core::result::Result<T, Error>;
