//! Blocking and partial byte transfer over any stream.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;

use crate::NetError;

/// Write the whole buffer, looping over short writes.
pub fn send_all<W: Write + ?Sized>(w: &mut W, mut buf: &[u8]) -> Result<(), NetError> {
    while !buf.is_empty() {
        match w.write(buf) {
            Ok(0) => {
                return Err(NetError::Io(ErrorKind::WriteZero.into()));
            }
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(NetError::Io(e)),
        }
    }
    Ok(())
}

/// Fill the whole buffer, looping until complete.
///
/// Retries interrupted reads and fails with [`NetError::PeerClosed`] if the
/// peer half-closes before the buffer is full.
pub fn recv_all<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> Result<(), NetError> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => return Err(NetError::PeerClosed),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(NetError::Io(e)),
        }
    }
    Ok(())
}

/// Read whatever is immediately available into the buffer.
///
/// Returns 0 when the read would block or was interrupted; an orderly close
/// is [`NetError::PeerClosed`], never 0. Intended for non-blocking sockets.
pub fn recv_some<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> Result<usize, NetError> {
    if buf.is_empty() {
        return Ok(0);
    }
    match r.read(buf) {
        Ok(0) => Err(NetError::PeerClosed),
        Ok(n) => Ok(n),
        Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => Ok(0),
        Err(e) => Err(NetError::Io(e)),
    }
}

/// Toggle the socket's blocking flag.
pub fn set_blocking(sock: &TcpStream, blocking: bool) -> Result<(), NetError> {
    sock.set_nonblocking(!blocking).map_err(NetError::Io)
}
