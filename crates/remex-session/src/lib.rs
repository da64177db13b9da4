#![deny(unsafe_code)]

//! Session layer: handshake, call channels, and client binders.
//!
//! A session is one connected stream socket plus the RPC declarations the
//! peer accepted during the handshake. The synchronous channel blocks per
//! call; the asynchronous channel writes requests blocking, then parks a
//! resumable reader per expected reply and drains them in FIFO order as
//! the socket becomes readable. One session is single-threaded property:
//! all socket I/O goes through the owning channel, one call at a time.

mod error;
mod handshake;
mod pipeline;
mod sync;

#[macro_use]
mod client;

pub use error::SessionError;
pub use handshake::{init_session, rpc_def};
pub use pipeline::{AsyncSession, AsyncStub, OnewayStub};
pub use sync::SyncChannel;

// Surface used by the binder macros' generated code.
#[doc(hidden)]
pub use remex_codec::Codec;
#[doc(hidden)]
pub use remex_stream::{connect, connect_addr, connect_with, NetError};
#[doc(hidden)]
pub use remex_wire::RpcDef;
#[doc(hidden)]
pub use tracing;
