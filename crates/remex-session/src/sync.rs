//! The synchronous call channel.

use std::net::TcpStream;
use std::os::fd::{AsRawFd, RawFd};

use remex_codec::Codec;
use remex_stream::NetError;
use remex_wire::{RpcDef, OP_INVOKE};

use crate::{handshake::init_session, SessionError};

/// A session whose calls block until the reply is fully read.
///
/// The socket stays in blocking mode for the channel's whole lifetime. Any
/// I/O failure during a call breaks the session: later calls fail with
/// [`SessionError::Broken`] until [`SyncChannel::reconnect`].
pub struct SyncChannel {
    sock: TcpStream,
    broken: bool,
}

impl SyncChannel {
    /// Run the handshake on a connected socket and wrap it.
    pub fn open(mut sock: TcpStream, defs: &[RpcDef]) -> Result<Self, SessionError> {
        init_session(&mut sock, defs)?;
        Ok(Self {
            sock,
            broken: false,
        })
    }

    /// Invoke `id` with the given argument tuple and block for the reply.
    ///
    /// A unit result shape reads nothing: fire-and-forget calls just
    /// return once the request bytes are written.
    pub fn call<Args: Codec, R: Codec + Default>(
        &mut self,
        id: u32,
        args: &Args,
    ) -> Result<R, SessionError> {
        if self.broken {
            return Err(SessionError::Broken);
        }
        match self.invoke(id, args) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.broken = true;
                tracing::warn!(id, error = %e, "call failed, session broken");
                Err(SessionError::Net(e))
            }
        }
    }

    fn invoke<Args: Codec, R: Codec + Default>(
        &mut self,
        id: u32,
        args: &Args,
    ) -> Result<R, NetError> {
        <u8 as Codec>::write(&mut self.sock, &OP_INVOKE)?;
        <u32 as Codec>::write(&mut self.sock, &id)?;
        Args::write(&mut self.sock, args)?;

        let mut out = R::default();
        R::read(&mut self.sock, &mut out)?;
        Ok(out)
    }

    /// Redo the handshake on a fresh socket; clears the broken flag.
    pub fn reconnect(&mut self, mut sock: TcpStream, defs: &[RpcDef]) -> Result<(), SessionError> {
        init_session(&mut sock, defs)?;
        self.sock = sock;
        self.broken = false;
        Ok(())
    }

    /// True once a call has failed on this session.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// The underlying descriptor, for external readiness selectors.
    pub fn fd(&self) -> RawFd {
        self.sock.as_raw_fd()
    }
}
