//! Socket setup for both ends of a connection.
//!
//! The congestion control algorithm has to be in place before any data
//! flows, so sockets are built with `socket2`, configured, and only then
//! handed over to tokio.

use crate::{config::CongestionControl, error::Error, ResultExt};
use futures::{future, prelude::*};
use log::debug;
use socket2::{Domain, Protocol, Socket, Type};
use std::{io, net::SocketAddr};
use tokio::{
    net::{TcpListener, TcpStream},
    reactor::Handle,
};

/// The backlog of the listening socket. Only one connection is ever accepted.
const LISTEN_BACKLOG: i32 = 3;

/// Creates a listening socket bound to the given address.
///
/// Accepted connections inherit the congestion control algorithm.
pub fn listen(addr: &SocketAddr, cc: &CongestionControl) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))
        .inspect_mut(|s| s.set_reuse_address(true))
        .inspect_mut(|s| set_congestion_control(s, cc))?;

    socket.bind(&(*addr).into())?;
    socket.listen(LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;

    debug!("listening on {} using {}", addr, cc);
    TcpListener::from_std(socket.into(), &Handle::default())
}

/// Connects to the given address.
///
/// The connection is established synchronously, since the congestion control
/// algorithm must be set on the socket before the handshake.
pub fn connect(addr: &SocketAddr, cc: &CongestionControl) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))
        .inspect_mut(|s| set_congestion_control(s, cc))?;

    socket.connect(&(*addr).into())?;
    socket.set_nonblocking(true)?;

    debug!("connected to {} using {}", addr, cc);
    TcpStream::from_std(socket.into(), &Handle::default())
}

/// Accepts exactly one connection and drops the listener afterwards.
pub fn accept_one(
    mut listener: TcpListener,
) -> impl Future<Item = (TcpStream, SocketAddr), Error = Error> {
    future::poll_fn(move || listener.poll_accept()).map_err(Error::Transport)
}

#[cfg(any(target_os = "linux", target_os = "freebsd"))]
fn set_congestion_control(socket: &mut Socket, cc: &CongestionControl) -> io::Result<()> {
    socket.set_tcp_congestion(cc.name().as_bytes())
}

#[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
fn set_congestion_control(_: &mut Socket, cc: &CongestionControl) -> io::Result<()> {
    log::warn!(
        "cannot select congestion control '{}' on this platform, keeping the default",
        cc,
    );
    Ok(())
}
