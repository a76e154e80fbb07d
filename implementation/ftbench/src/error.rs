//! The error taxonomy shared by both ends of a transfer.
//!
//! Every variant is fatal for the session it occurs in. Nothing is retried,
//! the protocol has no way of resuming mid-file.

use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    io,
};

/// A session-level error.
#[derive(Debug)]
pub enum Error {
    /// Connecting, binding, accepting or writing to the connection failed, or
    /// the peer stayed silent for longer than the configured idle timeout.
    Transport(io::Error),

    /// A block read off the wire could not be decoded into a frame.
    MalformedFrame(Malformed),

    /// A well-formed frame arrived in a state that doesn't admit it.
    ProtocolViolation(Violation),

    /// The peer closed the connection or reading from it failed before the
    /// session was ended with `EXIT`.
    ConnectionLost(io::Error),

    /// Reading the input file or writing an output file failed.
    Storage(io::Error),
}

/// The reason a block was rejected by the frame decoder.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Malformed {
    /// The block doesn't have the size of exactly one frame.
    BlockSize { expected: usize, actual: usize },

    /// The kind discriminant is neither FileData nor Control.
    UnknownKind(u32),

    /// The length field claims more bytes than the payload can hold.
    LengthOverflow { length: u64, capacity: usize },
}

/// A specific protocol violation.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Violation {
    /// A control frame carried a token outside of the known vocabulary.
    UnknownToken(String),

    /// File data arrived while no transfer was in progress.
    DataWhileIdle,

    /// A FileData frame with zero meaningful bytes.
    EmptyData,

    /// A known control token arrived in a state that doesn't admit it.
    UnexpectedToken {
        token: &'static str,
        state: &'static str,
    },
}

impl Error {
    /// Reinterprets a transport failure on the reading side as a lost
    /// connection. Other errors are passed through unchanged.
    pub(crate) fn into_connection_lost(self) -> Self {
        match self {
            Error::Transport(e) => Error::ConnectionLost(e),
            other => other,
        }
    }

    /// Whether the error is a `ConnectionLost`.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Error::ConnectionLost(_) => true,
            _ => false,
        }
    }

    /// Whether the error is a `ProtocolViolation`.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            Error::ProtocolViolation(_) => true,
            _ => false,
        }
    }

    /// Whether the error is a `MalformedFrame`.
    pub fn is_malformed(&self) -> bool {
        match self {
            Error::MalformedFrame(_) => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Transport(err)
    }
}

impl From<Malformed> for Error {
    fn from(m: Malformed) -> Self {
        Error::MalformedFrame(m)
    }
}

impl From<Violation> for Error {
    fn from(v: Violation) -> Self {
        Error::ProtocolViolation(v)
    }
}

impl Display for Error {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        match self {
            Error::Transport(e) => write!(fmt, "transport error: {}", e),
            Error::MalformedFrame(m) => write!(fmt, "malformed frame: {}", m),
            Error::ProtocolViolation(v) => write!(fmt, "protocol violation: {}", v),
            Error::ConnectionLost(e) => write!(fmt, "connection lost: {}", e),
            Error::Storage(e) => write!(fmt, "storage error: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Transport(e) | Error::ConnectionLost(e) | Error::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for Malformed {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        match *self {
            Malformed::BlockSize { expected, actual } => write!(
                fmt,
                "block of {} bytes, wanted exactly {}",
                actual, expected,
            ),
            Malformed::UnknownKind(kind) => write!(fmt, "unknown frame kind {}", kind),
            Malformed::LengthOverflow { length, capacity } => write!(
                fmt,
                "length {} exceeds the payload capacity of {}",
                length, capacity,
            ),
        }
    }
}

impl StdError for Malformed {}

impl Display for Violation {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        match self {
            Violation::UnknownToken(token) => {
                write!(fmt, "unknown control token '{}'", token)
            }
            Violation::DataWhileIdle => "file data outside of START/END".fmt(fmt),
            Violation::EmptyData => "empty file data frame".fmt(fmt),
            Violation::UnexpectedToken { token, state } => {
                write!(fmt, "{} is not allowed while {}", token, state)
            }
        }
    }
}

impl StdError for Violation {}
