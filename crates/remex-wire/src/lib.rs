#![deny(unsafe_code)]

//! Spec-level wire types for the remex protocol.
//!
//! This crate carries the pieces both peers must agree on before any value
//! crosses the wire: the version word, the command opcodes, the type
//! descriptor tree with its canonical byte encoding, and the RPC
//! declaration record exchanged during the handshake.

mod desc;

pub use desc::{Ctor, Desc, DescError, EnumConst, Field};

/// Protocol version word, sent first on every session.
pub const VERSION: u32 = 0x0001_0000;

/// Opcode: declare a remote expression under an RPC id.
pub const OP_DEFEXPR: u8 = 0x00;

/// Opcode: invoke a previously declared RPC. (`0x01` is reserved.)
pub const OP_INVOKE: u8 = 0x02;

/// Handshake reply byte meaning the peer rejected a declaration.
/// Any nonzero reply means accept.
pub const RESULT_FAIL: u8 = 0;

/// One RPC declaration negotiated during the handshake.
///
/// The peer is expected to verify that `expr` type-checks to a function
/// whose argument tuple matches `in_type` and whose result matches
/// `out_type`, and to reply accept or reject per declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcDef {
    /// Identifier the client will use to invoke this expression.
    pub id: u32,
    /// Expression evaluated on the remote side.
    pub expr: String,
    /// Canonical [`Desc`] encoding of the argument tuple.
    pub in_type: Vec<u8>,
    /// Canonical [`Desc`] encoding of the result shape.
    pub out_type: Vec<u8>,
}

impl RpcDef {
    /// Create a declaration from already-encoded descriptors.
    pub fn new(id: u32, expr: impl Into<String>, in_type: Vec<u8>, out_type: Vec<u8>) -> Self {
        Self {
            id,
            expr: expr.into(),
            in_type,
            out_type,
        }
    }
}
