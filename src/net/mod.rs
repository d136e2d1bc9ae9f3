//! Buffered socket layer.
//!
//! [`BufferedConnection`] wraps one accepted TCP stream with a fixed-size
//! read buffer and a fixed-size write buffer. Each direction has its own
//! lock, so one task may receive while another sends, but two senders (or two
//! receivers) on the same connection take turns.

pub mod buffer;
pub mod connection;
mod sendfile;

use std::fmt;
use std::io;
use std::time::Duration;

pub use connection::BufferedConnection;

/// Errors raised by [`BufferedConnection`] operations.
#[derive(Debug)]
pub enum ConnectionError {
    /// A buffer of the requested capacity could not be reserved.
    Allocation { capacity: usize },
    /// No data arrived within the receive timeout.
    Timeout(Duration),
    /// A line did not end within the allowed length.
    LineTooLong { max: usize },
    /// The peer shut the connection down in the middle of a line.
    Closed,
    Io(io::Error),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Allocation { capacity } => {
                write!(f, "cannot allocate a {capacity} byte connection buffer")
            }
            ConnectionError::Timeout(after) => {
                write!(f, "no data received within {}s", after.as_secs())
            }
            ConnectionError::LineTooLong { max } => {
                write!(f, "line longer than {max} bytes")
            }
            ConnectionError::Closed => write!(f, "connection closed by peer"),
            ConnectionError::Io(e) => write!(f, "socket error: {e}"),
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectionError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ConnectionError {
    fn from(e: io::Error) -> Self {
        ConnectionError::Io(e)
    }
}
