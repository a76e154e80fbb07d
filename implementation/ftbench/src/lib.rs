//! A fixed-size framed file transfer protocol for benchmarking TCP congestion
//! control algorithms.
//!
//! A sender streams files over a single TCP connection, each one bracketed by
//! `START` and `END` control frames. The receiver writes every file out and
//! measures how long each transfer took, which is summarized into a
//! throughput report once the sender says `EXIT`.

mod codec;
mod config;
mod error;
mod frame;
mod ledger;
mod net;
mod output;
mod receiver;
mod sender;

pub use crate::codec::{Connection, FrameCodec};
pub use crate::config::{CongestionControl, ReceiverConfig, SenderConfig, DEFAULT_PORT};
pub use crate::error::{Error, Malformed, Violation};
pub use crate::frame::{
    frame_size, ControlToken, Frame, FrameKind, BINARY_OVERHEAD, DEFAULT_MAX_PAYLOAD,
};
pub use crate::ledger::{Report, Run, Sample, Summary, TimingLedger};
pub use crate::net::{accept_one, connect, listen};
pub use crate::output::{Directory, Output};
pub use crate::receiver::{receive_on, Receive, Session, State};
pub use crate::sender::{SendFile, Sender};

/// Some useful extensions to `Result`.
trait ResultExt<T, E> {
    /// Allows mutable transformation on the value, without requiring the value
    /// to be returned.
    ///
    /// This is a shorthand for:
    ///
    /// ```rust
    /// # let result: Result<usize, ()> = Ok(5);
    /// # fn configure(v: &mut usize) -> Result<(), ()> { Ok(()) }
    ///
    /// result.and_then(|mut v| {
    ///     configure(&mut v)?;
    ///     Ok(v)
    /// });
    /// ```
    fn inspect_mut(self, f: impl FnOnce(&mut T) -> Result<(), E>) -> Result<T, E>;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn inspect_mut(self, f: impl FnOnce(&mut T) -> Result<(), E>) -> Self {
        self.and_then(|mut val| {
            f(&mut val)?;
            Ok(val)
        })
    }
}
