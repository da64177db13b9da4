//! The asynchronous call pipeline.
//!
//! Requests go out in issue order over one socket and the peer answers in
//! the same order, so replies drain head-first without per-call tags. Each
//! stub owns a reusable resumable reader, a scratch result, and a FIFO of
//! continuations, one per in-flight call; the session owns a FIFO of stub
//! ids recording which stub reads next.

use std::collections::VecDeque;
use std::mem;
use std::net::TcpStream;
use std::os::fd::{AsRawFd, RawFd};

use remex_codec::Codec;
use remex_stream::{set_blocking, NetError};
use remex_wire::OP_INVOKE;

use crate::SessionError;

/// Socket plus scheduler state for an asynchronous session.
pub struct AsyncSession {
    sock: TcpStream,
    queue: VecDeque<u32>,
    broken: bool,
}

impl AsyncSession {
    pub fn new(sock: TcpStream) -> Self {
        Self {
            sock,
            queue: VecDeque::new(),
            broken: false,
        }
    }

    /// Write one invocation frame. The socket is flipped to blocking for
    /// the write and back to non-blocking for reply accumulation.
    pub fn send_invoke<Args: Codec>(&mut self, id: u32, args: &Args) -> Result<(), SessionError> {
        if self.broken {
            return Err(SessionError::Broken);
        }
        if let Err(e) = self.write_frame(id, args) {
            self.broken = true;
            tracing::warn!(id, error = %e, "request write failed, session broken");
            return Err(SessionError::Net(e));
        }
        Ok(())
    }

    fn write_frame<Args: Codec>(&mut self, id: u32, args: &Args) -> Result<(), NetError> {
        set_blocking(&self.sock, true)?;
        <u8 as Codec>::write(&mut self.sock, &OP_INVOKE)?;
        <u32 as Codec>::write(&mut self.sock, &id)?;
        Args::write(&mut self.sock, args)?;
        set_blocking(&self.sock, false)?;
        Ok(())
    }

    /// Register a stub as the reader for the reply of a just-issued call.
    pub fn enqueue(&mut self, id: u32) {
        self.queue.push_back(id);
    }

    /// Stub id that owns the next reply on the wire.
    pub fn head(&self) -> Option<u32> {
        self.queue.front().copied()
    }

    /// Drop the head entry once its reply has been delivered.
    pub fn pop_head(&mut self) {
        self.queue.pop_front();
    }

    /// Outstanding replies not yet delivered.
    pub fn pending_requests(&self) -> usize {
        self.queue.len()
    }

    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn sock_mut(&mut self) -> &mut TcpStream {
        &mut self.sock
    }

    /// Adopt a fresh socket, discarding the pending queue.
    pub fn reset(&mut self, sock: TcpStream) {
        self.sock = sock;
        self.queue.clear();
        self.broken = false;
    }

    /// The underlying descriptor, for external readiness selectors.
    pub fn fd(&self) -> RawFd {
        self.sock.as_raw_fd()
    }
}

/// Client-side state for one asynchronous RPC with a reply.
pub struct AsyncStub<R: Codec + Default> {
    id: u32,
    state: R::Reader,
    scratch: R,
    conts: VecDeque<Box<dyn FnOnce(R)>>,
}

impl<R: Codec + Default> AsyncStub<R> {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            state: R::reader(),
            scratch: R::default(),
            conts: VecDeque::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Issue a call: write the request blocking, then park `k` until this
    /// stub's turn at the head of the session queue delivers the reply.
    pub fn call<Args: Codec>(
        &mut self,
        session: &mut AsyncSession,
        args: &Args,
        k: impl FnOnce(R) + 'static,
    ) -> Result<(), SessionError> {
        session.send_invoke(self.id, args)?;
        self.conts.push_back(Box::new(k));
        session.enqueue(self.id);
        Ok(())
    }

    /// Accumulate reply bytes; on completion, deliver to the head
    /// continuation and re-prepare for the next reply.
    pub fn read_and_finish(&mut self, sock: &mut TcpStream) -> Result<bool, NetError> {
        if !R::accum(sock, &mut self.state, &mut self.scratch)? {
            return Ok(false);
        }
        let value = mem::take(&mut self.scratch);
        self.state = R::reader();
        if let Some(k) = self.conts.pop_front() {
            k(value);
        }
        Ok(true)
    }

    /// Continuations still waiting on replies.
    pub fn pending(&self) -> usize {
        self.conts.len()
    }

    /// Drop queued continuations and start from a fresh reader.
    pub fn reset(&mut self) {
        self.conts.clear();
        self.state = R::reader();
        self.scratch = R::default();
    }
}

/// Client-side state for a fire-and-forget RPC: no reply, no continuation,
/// no scheduler entry.
pub struct OnewayStub {
    id: u32,
}

impl OnewayStub {
    pub fn new(id: u32) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn call<Args: Codec>(
        &mut self,
        session: &mut AsyncSession,
        args: &Args,
    ) -> Result<(), SessionError> {
        session.send_invoke(self.id, args)
    }

    pub fn reset(&mut self) {}
}
