use std::fmt;

use remex_stream::NetError;

/// Failure at the session layer.
#[derive(Debug)]
pub enum SessionError {
    /// Transport or decode failure underneath a call or handshake.
    Net(NetError),
    /// The peer rejected one of the RPC declarations during the handshake.
    Rejected {
        id: u32,
        expr: String,
        message: String,
    },
    /// The session already failed; reconnect before calling again.
    Broken,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Net(e) => write!(f, "{e}"),
            SessionError::Rejected { id, expr, message } => {
                write!(f, "while trying to define '{expr}' with id={id}: {message}")
            }
            SessionError::Broken => write!(f, "session is broken; reconnect required"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Net(e) => Some(e),
            _ => None,
        }
    }
}

impl From<NetError> for SessionError {
    fn from(e: NetError) -> Self {
        SessionError::Net(e)
    }
}
