//! Socket plumbing for remex.
//!
//! Two read disciplines over any byte stream: blocking loops that finish or
//! fail (`send_all`, `recv_all`) and a partial mode (`recv_some`) that
//! returns whatever is immediately available on a non-blocking socket. The
//! dial helper resolves `(host, service)` pairs with `getaddrinfo` and
//! tries each candidate endpoint in order, optionally binding a local
//! address first.

mod dial;
mod error;
mod io;

pub use dial::{connect, connect_addr, connect_with};
pub use error::NetError;
pub use io::{recv_all, recv_some, send_all, set_blocking};
