use std::fmt;
use std::io;

/// Transport and decode failure for the codec and session layers.
#[derive(Debug)]
pub enum NetError {
    /// Hard socket read/write failure.
    Io(io::Error),
    /// The peer shut down in the middle of a message.
    PeerClosed,
    /// Address lookup failed.
    Resolve {
        host: String,
        service: String,
        reason: String,
    },
    /// Every resolved endpoint refused the connection.
    Connect {
        host: String,
        service: String,
        source: io::Error,
    },
    /// A sum or enumeration decoded a tag with no matching constructor.
    BadTag(u32),
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Io(e) => write!(f, "socket i/o failed: {e}"),
            NetError::PeerClosed => write!(f, "remote process closed the session prematurely"),
            NetError::Resolve {
                host,
                service,
                reason,
            } => write!(f, "failed to resolve {host}:{service}: {reason}"),
            NetError::Connect {
                host,
                service,
                source,
            } => write!(f, "cannot connect to {host}:{service}: {source}"),
            NetError::BadTag(tag) => write!(f, "no constructor for tag {tag}"),
        }
    }
}

impl std::error::Error for NetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetError::Io(e) | NetError::Connect { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NetError {
    fn from(e: io::Error) -> Self {
        NetError::Io(e)
    }
}
