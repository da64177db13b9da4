//! The declaration exchange that opens a session.

use std::io::{Read, Write};

use remex_codec::Codec;
use remex_wire::{RpcDef, OP_DEFEXPR, RESULT_FAIL, VERSION};

use crate::SessionError;

/// Build one declaration from the static argument-tuple and result shapes.
pub fn rpc_def<Args: Codec, R: Codec>(id: u32, expr: &str) -> RpcDef {
    RpcDef::new(
        id,
        expr,
        Args::descriptor().encode(),
        R::descriptor().encode(),
    )
}

/// Open a session on a connected socket: send the version word, then each
/// declaration in order, reading the peer's verdict after every one.
///
/// The first rejection aborts the handshake; no later declaration is
/// attempted. The socket must be in blocking mode.
pub fn init_session<S: Read + Write>(sock: &mut S, defs: &[RpcDef]) -> Result<(), SessionError> {
    <u32 as Codec>::write(sock, &VERSION)?;

    for def in defs {
        <u8 as Codec>::write(sock, &OP_DEFEXPR)?;
        <u32 as Codec>::write(sock, &def.id)?;
        <String as Codec>::write(sock, &def.expr)?;
        <Vec<u8> as Codec>::write(sock, &def.in_type)?;
        <Vec<u8> as Codec>::write(sock, &def.out_type)?;

        let mut verdict = RESULT_FAIL;
        <u8 as Codec>::read(sock, &mut verdict)?;
        if verdict == RESULT_FAIL {
            let mut message = String::new();
            <String as Codec>::read(sock, &mut message)?;
            tracing::warn!(id = def.id, expr = %def.expr, %message, "declaration rejected");
            return Err(SessionError::Rejected {
                id: def.id,
                expr: def.expr.clone(),
                message,
            });
        }
    }

    tracing::debug!(declarations = defs.len(), "session established");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use remex_codec::to_bytes;
    use remex_wire::Desc;
    use std::io::Cursor;

    /// Duplex fake: reads scripted reply bytes, records written bytes.
    struct Scripted {
        replies: Cursor<Vec<u8>>,
        sent: Vec<u8>,
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.replies.read(buf)
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.sent.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn defs() -> Vec<RpcDef> {
        vec![
            rpc_def::<(i32,), i32>(1, "idInt"),
            rpc_def::<(String,), String>(2, "idStr"),
            rpc_def::<(), i64>(3, "now"),
        ]
    }

    #[test]
    fn all_accepted_handshake_succeeds() {
        let mut sock = Scripted {
            replies: Cursor::new(vec![1, 1, 1]),
            sent: Vec::new(),
        };
        init_session(&mut sock, &defs()).unwrap();

        // Version word leads.
        assert_eq!(&sock.sent[..4], &VERSION.to_le_bytes());
        // First declaration opcode follows.
        assert_eq!(sock.sent[4], OP_DEFEXPR);
    }

    #[test]
    fn rejection_carries_id_expr_and_message_and_stops() {
        let mut replies = vec![1u8];
        replies.push(RESULT_FAIL);
        replies.extend_from_slice(&to_bytes(&"type mismatch".to_string()).unwrap());
        let mut sock = Scripted {
            replies: Cursor::new(replies),
            sent: Vec::new(),
        };

        let err = init_session(&mut sock, &defs()).unwrap_err();
        match err {
            SessionError::Rejected { id, expr, message } => {
                assert_eq!(id, 2);
                assert_eq!(expr, "idStr");
                assert_eq!(message, "type mismatch");
            }
            other => panic!("expected rejection, got {other}"),
        }

        // Nothing for id 3 went out: the last bytes written are the second
        // declaration's out_type.
        let tail = to_bytes(&defs()[1].out_type).unwrap();
        assert!(sock.sent.ends_with(&tail));
    }

    #[test]
    fn declared_types_decode_to_the_advertised_shapes() {
        let def = rpc_def::<(i32, bool), String>(7, "f");
        let in_desc = Desc::decode(&def.in_type).unwrap();
        assert_eq!(in_desc, <(i32, bool) as Codec>::descriptor());
        let out_desc = Desc::decode(&def.out_type).unwrap();
        assert_eq!(out_desc, Desc::array(Desc::prim("char")));
    }
}
