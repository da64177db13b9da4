#![deny(unsafe_code)]

//! remex - typed RPC over stream sockets.
//!
//! This crate provides a unified API for the remex protocol. Users should
//! depend on this crate rather than the individual component crates.
//!
//! A remex session exchanges values of statically-known shape over one
//! stream socket. Declare value shapes with the `wire_*` macros, bind a
//! client with [`net_client!`] or [`net_async_client!`], and call the
//! generated methods; the handshake advertises each RPC's argument and
//! result descriptors so the peer can reject type mismatches up front.

// Value codec and shape declaration macros.
pub use remex_codec::{from_bytes, to_bytes, Codec, ViaReader};
pub use remex_codec::{wire_alias, wire_enum, wire_record, wire_variant};

// Wire-level types.
pub use remex_wire::{Ctor, Desc, DescError, EnumConst, Field, RpcDef};
pub use remex_wire::{OP_DEFEXPR, OP_INVOKE, RESULT_FAIL, VERSION};

// Socket plumbing.
pub use remex_stream::{connect, connect_addr, connect_with, NetError};
pub use remex_stream::{recv_all, recv_some, send_all, set_blocking};

// Session layer and client binders.
pub use remex_session::{init_session, rpc_def, SessionError};
pub use remex_session::{net_async_client, net_client};
pub use remex_session::{AsyncSession, AsyncStub, OnewayStub, SyncChannel};

// Re-export tracing for macro-generated logging.
pub use tracing;
