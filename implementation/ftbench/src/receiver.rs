//! Implements the receiving side of a session.
//!
//! The session is an explicit automaton: every decoded frame is fed to
//! `Session::handle`, which either moves to the next state or fails. The
//! `Receive` future drives a session from a stream of frames until `EXIT`.

use crate::{
    codec::Connection,
    config::ReceiverConfig,
    error::{Error, Violation},
    frame::{ControlToken, Frame, FrameKind},
    ledger::{Sample, TimingLedger},
    net,
    output::{Directory, Output},
};
use futures::{future, prelude::*};
use log::{debug, info, trace, warn};
use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    fs,
    io::{self, ErrorKind, Write},
    mem,
    time::{Duration, Instant},
};
use tokio::{clock, codec::Decoder, net::TcpListener, timer::Delay};

const POLL_AFTER_DONE: &str = "cannot poll Receive after it has completed";

/// States of the receiving automaton.
#[derive(Debug)]
pub enum State<T> {
    /// No transfer is in progress.
    ///
    /// Holds the output target for the next transfer, if one has been opened
    /// already, which is the case at session start and after `SEND_AGAIN`.
    Idle(Option<T>),

    /// A transfer has been started and is awaiting `END`.
    Receiving(Transfer<T>),

    /// `EXIT` was observed or the session failed. Terminal.
    Closed,
}

/// A file transfer in progress.
#[derive(Debug)]
pub struct Transfer<T> {
    target: T,
    started: Instant,
    bytes: u64,
}

/// The receiving session of a single connection.
#[derive(Debug)]
pub struct Session<O: Output> {
    ledger: TimingLedger,
    output: O,
    seq: u32,
    state: State<O::Target>,
}

/// A future driving a receiving session until the peer sends `EXIT`.
///
/// Resolves to the timing ledger of every completed transfer.
#[must_use = "futures do nothing unless polled"]
pub struct Receive<S, O: Output> {
    frames: S,
    idle_timeout: Option<Duration>,

    /// The output is turned into a session on the first poll, to honor that
    /// futures don't do anything until polled.
    output: Option<O>,
    session: Option<Session<O>>,
    timeout: Option<Delay>,
}

impl<T> State<T> {
    /// A human readable name of the state for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            State::Idle(Some(_)) => "idle",
            State::Idle(None) => "idle without an output file",
            State::Receiving(_) => "receiving",
            State::Closed => "closed",
        }
    }
}

impl<S, O> Debug for Receive<S, O>
where
    S: Debug,
    O: Output + Debug,
    O::Target: Debug,
{
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        fmt.debug_struct("Receive")
            .field("frames", &self.frames)
            .field("idle_timeout", &self.idle_timeout)
            .field("output", &self.output)
            .field("session", &self.session)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// DRY-macro for failing a transition.
///
/// Puts the abandoned state back into the session so `abort` can release
/// whatever it holds, then returns the error.
macro_rules! fail {
    ($this:ident, $state:expr, $err:expr) => {{
        $this.state = $state;
        $this.abort();
        return Err($err.into());
    }};
}

/// Flushes and closes an output target that's being given up on.
fn release<W: Write>(mut target: W) {
    if let Err(e) = target.flush() {
        warn!("failed to flush output while aborting: {}", e);
    }
}

impl<O: Output> Session<O> {
    /// Starts a session, opening the target for the first file.
    pub fn new(mut output: O) -> Result<Self, Error> {
        let target = output.open(0).map_err(Error::Storage)?;

        Ok(Session {
            ledger: TimingLedger::new(),
            output,
            seq: 0,
            state: State::Idle(Some(target)),
        })
    }

    pub fn state(&self) -> &State<O::Target> {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        match self.state {
            State::Closed => true,
            _ => false,
        }
    }

    pub fn ledger(&self) -> &TimingLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> TimingLedger {
        self.ledger
    }

    /// Releases the open output target, if any, and closes the session.
    ///
    /// A transfer in progress is discarded without a ledger sample.
    pub fn abort(&mut self) {
        match mem::replace(&mut self.state, State::Closed) {
            State::Idle(Some(target)) => release(target),
            State::Receiving(transfer) => {
                warn!(
                    "discarding incomplete file {} after {} bytes",
                    self.seq + 1,
                    transfer.bytes,
                );
                release(transfer.target);
            }
            State::Idle(None) | State::Closed => {}
        }
    }

    /// Feeds a single frame through the automaton.
    ///
    /// On error the session is closed and any open target released.
    pub fn handle(&mut self, frame: Frame) -> Result<(), Error> {
        let state = mem::replace(&mut self.state, State::Closed);
        self.state = self.transition(state, frame)?;
        Ok(())
    }

    fn transition(
        &mut self,
        state: State<O::Target>,
        frame: Frame,
    ) -> Result<State<O::Target>, Error> {
        match frame.kind() {
            FrameKind::FileData => match state {
                State::Receiving(mut transfer) => {
                    if frame.is_empty() {
                        fail!(self, State::Receiving(transfer), Violation::EmptyData);
                    }
                    if let Err(e) = transfer.target.write_all(frame.payload()) {
                        fail!(self, State::Receiving(transfer), Error::Storage(e));
                    }

                    transfer.bytes += frame.len() as u64;
                    trace!("wrote {} bytes, {} in total", frame.len(), transfer.bytes);
                    Ok(State::Receiving(transfer))
                }
                other => {
                    let violation = if frame.is_empty() {
                        Violation::EmptyData
                    } else {
                        Violation::DataWhileIdle
                    };
                    fail!(self, other, violation)
                }
            },

            FrameKind::Control => {
                let token = match frame.token() {
                    Ok(token) => token,
                    Err(violation) => fail!(self, state, violation),
                };
                trace!("received {} while {}", token, state.name());

                match (state, token) {
                    (State::Idle(Some(target)), ControlToken::Start) => {
                        debug!("starting transfer of file {}", self.seq + 1);

                        Ok(State::Receiving(Transfer {
                            target,
                            started: clock::now(),
                            bytes: 0,
                        }))
                    }

                    (State::Receiving(mut transfer), ControlToken::End) => {
                        let elapsed = clock::now().duration_since(transfer.started);
                        transfer.target.flush().map_err(Error::Storage)?;
                        drop(transfer.target);

                        self.ledger.append(Sample {
                            elapsed,
                            bytes: transfer.bytes,
                        });
                        info!("File {} transfer completed", self.seq + 1);

                        Ok(State::Idle(None))
                    }

                    (State::Idle(target), ControlToken::SendAgain) => {
                        if let Some(unused) = target {
                            debug!("file {} was never started, leaving it empty", self.seq + 1);
                            release(unused);
                        }

                        self.seq += 1;
                        let target = self.output.open(self.seq).map_err(Error::Storage)?;

                        Ok(State::Idle(Some(target)))
                    }

                    (State::Idle(target), ControlToken::Exit) => {
                        if let Some(target) = target {
                            release(target);
                        }

                        Ok(State::Closed)
                    }

                    (State::Receiving(transfer), ControlToken::Exit) => {
                        warn!(
                            "EXIT during transfer of file {}, discarding {} bytes",
                            self.seq + 1,
                            transfer.bytes,
                        );
                        release(transfer.target);

                        Ok(State::Closed)
                    }

                    (state, token) => {
                        let name = state.name();
                        fail!(self, state, Violation::UnexpectedToken {
                            token: token.as_str(),
                            state: name,
                        })
                    }
                }
            }
        }
    }
}

impl<S, O> Receive<S, O>
where
    S: Stream<Item = Frame, Error = Error>,
    O: Output,
{
    /// Creates a future receiving files from the given frame stream.
    pub fn new(frames: S, output: O, idle_timeout: Option<Duration>) -> Self {
        Receive {
            frames,
            idle_timeout,
            output: Some(output),
            session: None,
            timeout: None,
        }
    }

    /// Checks whether the peer has been silent for too long.
    ///
    /// # Panics
    ///
    /// Panics (probably) if not called within a future's task context.
    fn poll_idle_timeout(&mut self) -> Result<(), Error> {
        let idle_timeout = match self.idle_timeout {
            Some(t) => t,
            None => return Ok(()),
        };

        let delay = self
            .timeout
            .get_or_insert_with(|| Delay::new(clock::now() + idle_timeout));
        match delay.poll() {
            Ok(Async::Ready(_)) => Err(Error::Transport(io::Error::new(
                ErrorKind::TimedOut,
                format!("no frame received within {:?}", idle_timeout),
            ))),
            Ok(Async::NotReady) => Ok(()),
            Err(e) => Err(Error::Transport(io::Error::new(ErrorKind::Other, e))),
        }
    }

    fn poll_session(&mut self) -> Poll<(), Error> {
        if self.session.is_none() {
            let output = self.output.take().expect(POLL_AFTER_DONE);
            self.session = Some(Session::new(output)?);
        }

        loop {
            let frame = match self.frames.poll() {
                Ok(Async::Ready(Some(frame))) => frame,
                Ok(Async::Ready(None)) => {
                    return Err(Error::ConnectionLost(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "peer closed the connection before EXIT",
                    )));
                }
                Ok(Async::NotReady) => {
                    self.poll_idle_timeout()?;
                    return Ok(Async::NotReady);
                }
                Err(e) => return Err(e.into_connection_lost()),
            };

            // A frame arrived, so the peer isn't idle
            self.timeout = None;

            let session = self.session.as_mut().expect(POLL_AFTER_DONE);
            session.handle(frame)?;

            if session.is_closed() {
                return Ok(Async::Ready(()));
            }
        }
    }
}

impl<S, O> Future for Receive<S, O>
where
    S: Stream<Item = Frame, Error = Error>,
    O: Output,
{
    type Item = TimingLedger;
    type Error = Error;

    fn poll(&mut self) -> Poll<Self::Item, Self::Error> {
        match self.poll_session() {
            Ok(Async::Ready(())) => {
                let session = self.session.take().expect(POLL_AFTER_DONE);
                Ok(Async::Ready(session.into_ledger()))
            }
            Ok(Async::NotReady) => Ok(Async::NotReady),
            Err(e) => {
                if let Some(mut session) = self.session.take() {
                    session.abort();
                    warn!(
                        "session aborted after {} completed transfers",
                        session.ledger().count(),
                    );
                }

                Err(e)
            }
        }
    }
}

/// Accepts a single connection on the listener and receives files from it
/// into the configured output directory, creating it if necessary.
pub fn receive_on(
    listener: TcpListener,
    config: &ReceiverConfig,
) -> impl Future<Item = TimingLedger, Error = Error> {
    let codec = config.codec();
    let idle_timeout = config.idle_timeout;
    let output = Directory::new(config.output_dir.clone());

    future::result(fs::create_dir_all(output.path()))
        .map_err(Error::Storage)
        .and_then(move |_| net::accept_one(listener))
        .and_then(move |(stream, addr)| {
            info!("Sender {} connected, beginning to receive files...", addr);

            let frames: Connection = codec.framed(stream);
            Receive::new(frames, output, idle_timeout)
        })
}
