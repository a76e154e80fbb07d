//! Explicit configuration for both ends of a session.

use crate::{codec::FrameCodec, frame::DEFAULT_MAX_PAYLOAD};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

/// The port both binaries default to.
pub const DEFAULT_PORT: u16 = 12345;

/// The name of a TCP congestion control algorithm, e.g. `reno` or `cubic`.
///
/// The name is handed to the kernel verbatim and never interpreted here.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CongestionControl(String);

/// Configuration of the receiving end.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReceiverConfig {
    /// The port to accept the single connection on.
    pub port: u16,

    pub congestion: CongestionControl,

    /// The payload capacity of every frame. Must match the sender's.
    pub max_payload: usize,

    /// The directory received files are written to.
    pub output_dir: PathBuf,

    /// How long to wait for the next frame before giving up.
    ///
    /// `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

/// Configuration of the sending end.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SenderConfig {
    /// The address of the receiver.
    pub addr: SocketAddr,

    pub congestion: CongestionControl,

    /// The payload capacity of every frame. Must match the receiver's.
    pub max_payload: usize,

    /// The file to transfer.
    pub input: PathBuf,

    /// How many times the file is sent over the connection.
    pub runs: u32,
}

impl CongestionControl {
    pub fn new(name: impl Into<String>) -> Self {
        CongestionControl(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for CongestionControl {
    fn default() -> Self {
        CongestionControl::new("cubic")
    }
}

impl Display for CongestionControl {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        self.0.fmt(fmt)
    }
}

impl ReceiverConfig {
    /// The address the listener binds to, on all interfaces.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), self.port)
    }

    pub fn codec(&self) -> FrameCodec {
        FrameCodec::new(self.max_payload)
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            port: DEFAULT_PORT,
            congestion: CongestionControl::default(),
            max_payload: DEFAULT_MAX_PAYLOAD,
            output_dir: PathBuf::from("assets"),
            idle_timeout: None,
        }
    }
}

impl SenderConfig {
    pub fn codec(&self) -> FrameCodec {
        FrameCodec::new(self.max_payload)
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), DEFAULT_PORT),
            congestion: CongestionControl::default(),
            max_payload: DEFAULT_MAX_PAYLOAD,
            input: PathBuf::from("random_file.txt"),
            runs: 1,
        }
    }
}
