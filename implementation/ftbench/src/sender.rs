//! Implements the sending side of a session.
//!
//! A `Sender` owns the frame sink of a connection and is passed through the
//! futures it creates, the way tokio's I/O helpers hand the stream back:
//!
//! ```text
//! START, FileData*, END  (SEND_AGAIN, START, FileData*, END)*  EXIT
//! ```

use crate::{
    codec::Connection,
    config::SenderConfig,
    error::Error,
    frame::{ControlToken, Frame},
    net,
};
use bytes::Bytes;
use futures::{prelude::*, try_ready, AsyncSink};
use log::{debug, info, trace};
use std::io::{self, ErrorKind, Read};

const POLLED_TWICE: &str = "cannot poll SendFile twice";

/// The sending end of a session.
#[derive(Debug)]
pub struct Sender<S> {
    capacity: usize,
    files_sent: u32,
    sink: S,
}

/// A future streaming one file to the receiver.
///
/// Resolves to the sender and the number of payload bytes sent.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct SendFile<S, R> {
    bytes_sent: u64,

    /// A frame that the sink wasn't ready to take yet.
    pending: Option<Frame>,
    sender: Option<Sender<S>>,
    source: R,
    state: SendState,
}

/// States of the file sending automaton.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum SendState {
    /// `START` needs to be queued.
    Start,

    /// Chunks of the file are being queued.
    Data,

    /// `END` has been queued and the sink needs to be flushed.
    Flush,
}

impl<S> Sender<S>
where
    S: Sink<SinkItem = Frame, SinkError = Error>,
{
    /// Creates a sender writing frames with the given payload capacity.
    pub fn new(sink: S, capacity: usize) -> Self {
        assert!(capacity > 0);

        Sender {
            capacity,
            files_sent: 0,
            sink,
        }
    }

    /// The number of files completely sent so far.
    pub fn files_sent(&self) -> u32 {
        self.files_sent
    }

    pub fn get_ref(&self) -> &S {
        &self.sink
    }

    /// Gets the sink back out of the sender, e.g. to close it.
    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Sends `START`, the contents of `source` in chunks of up to the frame
    /// capacity, and `END`.
    pub fn send_file<R: Read>(self, source: R) -> SendFile<S, R> {
        SendFile {
            bytes_sent: 0,
            pending: None,
            sender: Some(self),
            source,
            state: SendState::Start,
        }
    }

    /// Announces that another file follows on this connection.
    pub fn signal_repeat(self) -> impl Future<Item = Self, Error = Error> {
        self.send_control(ControlToken::SendAgain)
    }

    /// Announces the end of the session.
    ///
    /// The caller is responsible for closing the connection afterwards.
    pub fn signal_done(self) -> impl Future<Item = Self, Error = Error> {
        self.send_control(ControlToken::Exit)
    }

    fn send_control(self, token: ControlToken) -> impl Future<Item = Self, Error = Error> {
        let Sender {
            capacity,
            files_sent,
            sink,
        } = self;

        debug!("sending {}", token);
        sink.send(Frame::control(token)).map(move |sink| Sender {
            capacity,
            files_sent,
            sink,
        })
    }
}

impl Sender<Connection> {
    /// Connects to the configured receiver.
    pub fn connect(config: &SenderConfig) -> Result<Self, Error> {
        let stream = net::connect(&config.addr, &config.congestion)?;
        let codec = config.codec();

        Ok(Sender::new(Connection::new(stream, codec), codec.capacity()))
    }
}

/// Reads from the source until `buf` is full or the source is exhausted.
fn read_chunk<R: Read>(source: &mut R, capacity: usize) -> io::Result<Bytes> {
    let mut buf = vec![0; capacity];
    let mut filled = 0;

    while filled < capacity {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    buf.truncate(filled);
    Ok(buf.into())
}

impl<S, R> Future for SendFile<S, R>
where
    S: Sink<SinkItem = Frame, SinkError = Error>,
    R: Read,
{
    type Item = (Sender<S>, u64);
    type Error = Error;

    fn poll(&mut self) -> Poll<Self::Item, Self::Error> {
        loop {
            let sender = self.sender.as_mut().expect(POLLED_TWICE);

            if let Some(frame) = self.pending.take() {
                if let AsyncSink::NotReady(frame) = sender.sink.start_send(frame)? {
                    self.pending = Some(frame);
                    return Ok(Async::NotReady);
                }
            }

            match self.state {
                SendState::Start => {
                    self.pending = Some(Frame::control(ControlToken::Start));
                    self.state = SendState::Data;
                }

                SendState::Data => {
                    let chunk = read_chunk(&mut self.source, sender.capacity)
                        .map_err(Error::Storage)?;

                    if chunk.is_empty() {
                        self.pending = Some(Frame::control(ControlToken::End));
                        self.state = SendState::Flush;
                    } else {
                        trace!("sending chunk of {} bytes", chunk.len());
                        self.bytes_sent += chunk.len() as u64;
                        self.pending = Some(Frame::file_data(chunk));
                    }
                }

                SendState::Flush => {
                    try_ready!(sender.sink.poll_complete());

                    let mut sender = self.sender.take().expect(POLLED_TWICE);
                    sender.files_sent += 1;
                    info!("File {} sent ({} bytes)", sender.files_sent, self.bytes_sent);

                    return Ok(Async::Ready((sender, self.bytes_sent)));
                }
            }
        }
    }
}
