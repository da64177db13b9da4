#![deny(unsafe_code)]

//! An in-process peer for exercising remex sessions.
//!
//! [`TestPeer`] listens on a loopback port in a background thread, answers
//! the handshake with a per-declaration verdict from a policy closure, and
//! serves invocations from per-id handler closures that read arguments and
//! write replies with the same codec framework the client uses.
//!
//! ```ignore
//! let peer = TestPeer::builder()
//!     .handle(1, |sock| {
//!         let mut n = 0i32;
//!         <i32 as Codec>::read(sock, &mut n)?;
//!         <i32 as Codec>::write(sock, &n)
//!     })
//!     .spawn();
//! let mut client = Echo::connect("127.0.0.1", peer.port())?;
//! ```

use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use remex_codec::Codec;
use remex_stream::NetError;
use remex_wire::{OP_DEFEXPR, OP_INVOKE, VERSION};

/// One declaration received during a handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub id: u32,
    pub expr: String,
    pub in_type: Vec<u8>,
    pub out_type: Vec<u8>,
}

type Policy = Box<dyn FnMut(&Declaration) -> Result<(), String> + Send>;
type Handler = Box<dyn FnMut(&mut TcpStream) -> Result<(), NetError> + Send>;

/// Builder for a [`TestPeer`].
pub struct PeerBuilder {
    policy: Policy,
    handlers: HashMap<u32, Handler>,
}

impl PeerBuilder {
    /// Replace the accept-everything handshake policy.
    pub fn policy(
        mut self,
        f: impl FnMut(&Declaration) -> Result<(), String> + Send + 'static,
    ) -> Self {
        self.policy = Box::new(f);
        self
    }

    /// Serve invocations of `id` with a handler that reads the arguments
    /// and writes the reply on the given socket.
    pub fn handle(
        mut self,
        id: u32,
        f: impl FnMut(&mut TcpStream) -> Result<(), NetError> + Send + 'static,
    ) -> Self {
        self.handlers.insert(id, Box::new(f));
        self
    }

    /// Bind a loopback port and start serving in a background thread.
    ///
    /// Connections are accepted one after another, so reconnect scenarios
    /// land on the same peer.
    pub fn spawn(self) -> TestPeer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let declarations = Arc::new(Mutex::new(Vec::new()));
        let invocations = Arc::new(Mutex::new(Vec::new()));

        let decl_log = Arc::clone(&declarations);
        let invoke_log = Arc::clone(&invocations);
        let mut policy = self.policy;
        let mut handlers = self.handlers;
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut sock) = stream else { return };
                if let Err(e) = serve(
                    &mut sock,
                    &mut policy,
                    &mut handlers,
                    &decl_log,
                    &invoke_log,
                ) {
                    tracing::debug!(error = %e, "test peer session ended");
                }
            }
        });

        TestPeer {
            addr,
            declarations,
            invocations,
        }
    }
}

/// A background peer bound to a loopback port.
pub struct TestPeer {
    addr: SocketAddr,
    declarations: Arc<Mutex<Vec<Declaration>>>,
    invocations: Arc<Mutex<Vec<u32>>>,
}

impl TestPeer {
    pub fn builder() -> PeerBuilder {
        PeerBuilder {
            policy: Box::new(|_| Ok(())),
            handlers: HashMap::new(),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Every declaration received so far, across all connections.
    pub fn declarations(&self) -> Vec<Declaration> {
        self.declarations.lock().expect("declaration log").clone()
    }

    /// Ids of every invocation received so far, in arrival order.
    pub fn invocations(&self) -> Vec<u32> {
        self.invocations.lock().expect("invocation log").clone()
    }
}

fn serve(
    sock: &mut TcpStream,
    policy: &mut Policy,
    handlers: &mut HashMap<u32, Handler>,
    declarations: &Mutex<Vec<Declaration>>,
    invocations: &Mutex<Vec<u32>>,
) -> Result<(), NetError> {
    let mut version = 0u32;
    <u32 as Codec>::read(sock, &mut version)?;
    if version != VERSION {
        return Err(NetError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unexpected version {version:#010x}"),
        )));
    }

    loop {
        let mut op = 0u8;
        match <u8 as Codec>::read(sock, &mut op) {
            Ok(()) => {}
            // A quiet close between commands is the normal end of session.
            Err(NetError::PeerClosed) => return Ok(()),
            Err(e) => return Err(e),
        }

        match op {
            OP_DEFEXPR => {
                let mut decl = Declaration {
                    id: 0,
                    expr: String::new(),
                    in_type: Vec::new(),
                    out_type: Vec::new(),
                };
                <u32 as Codec>::read(sock, &mut decl.id)?;
                <String as Codec>::read(sock, &mut decl.expr)?;
                <Vec<u8> as Codec>::read(sock, &mut decl.in_type)?;
                <Vec<u8> as Codec>::read(sock, &mut decl.out_type)?;
                declarations.lock().expect("declaration log").push(decl.clone());

                match policy(&decl) {
                    Ok(()) => <u8 as Codec>::write(sock, &1)?,
                    Err(message) => {
                        <u8 as Codec>::write(sock, &0)?;
                        <String as Codec>::write(sock, &message)?;
                    }
                }
            }
            OP_INVOKE => {
                let mut id = 0u32;
                <u32 as Codec>::read(sock, &mut id)?;
                invocations.lock().expect("invocation log").push(id);
                match handlers.get_mut(&id) {
                    Some(handler) => handler(sock)?,
                    None => {
                        return Err(NetError::Io(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            format!("no handler for rpc id {id}"),
                        )))
                    }
                }
            }
            other => {
                return Err(NetError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("unknown opcode {other:#04x}"),
                )))
            }
        }
    }
}

/// Install a subscriber that honors `RUST_LOG`, once per process.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// A reader that imitates a non-blocking socket fed in chunks: each
/// [`Trickle::refill`] models one readable event delivering at most
/// `chunk` bytes, and reading past the delivered bytes reports
/// would-block.
pub struct Trickle<'a> {
    data: &'a [u8],
    chunk: usize,
    available: usize,
}

impl<'a> Trickle<'a> {
    pub fn new(data: &'a [u8], chunk: usize) -> Self {
        Self {
            data,
            chunk: chunk.max(1),
            available: 0,
        }
    }

    /// Make the next chunk of bytes available, as if the socket became
    /// readable again.
    pub fn refill(&mut self) {
        self.available = self.chunk;
    }

    /// True once every byte has been consumed.
    pub fn is_drained(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::io::Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.data.is_empty() || self.available == 0 {
            return Err(std::io::ErrorKind::WouldBlock.into());
        }
        let n = buf.len().min(self.data.len()).min(self.available);
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        self.available -= n;
        Ok(n)
    }
}
