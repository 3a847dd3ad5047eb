/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};
use std::net::TcpStream;
use std::time::Duration;

use log::debug;

use super::ServerAddr;

pub(crate) enum ConnectionState {
    Disconnected,
    Connecting,
    Connected(TcpStream),
    Closed,
}

pub(crate) struct ServerConnection {
    addr: ServerAddr,
    state: ConnectionState,
}

impl ServerConnection {
    pub(crate) fn new(addr: ServerAddr) -> Self {
        ServerConnection {
            addr,
            state: ConnectionState::Disconnected,
        }
    }

    #[inline]
    pub(crate) fn addr(&self) -> &ServerAddr {
        &self.addr
    }

    #[cfg(test)]
    pub(crate) fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    fn connect(&self, connect_timeout: Duration, write_timeout: Duration) -> io::Result<TcpStream> {
        let mut last_err = None;
        for sock_addr in self.addr.resolve()? {
            let r = if connect_timeout.is_zero() {
                TcpStream::connect(sock_addr)
            } else {
                TcpStream::connect_timeout(&sock_addr, connect_timeout)
            };
            match r {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    if !write_timeout.is_zero() {
                        stream.set_write_timeout(Some(write_timeout))?;
                    }
                    debug!("connected to m3 server {} ({sock_addr})", self.addr);
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::AddrNotAvailable)))
    }

    /// Write the whole frame, connecting first if needed.
    ///
    /// The connection goes back to disconnected on any error.
    pub(crate) fn send(
        &mut self,
        frame: &[u8],
        connect_timeout: Duration,
        write_timeout: Duration,
    ) -> io::Result<()> {
        match self.state {
            ConnectionState::Closed => return Err(io::Error::from(io::ErrorKind::NotConnected)),
            ConnectionState::Connected(_) => {}
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                self.state = ConnectionState::Connecting;
                match self.connect(connect_timeout, write_timeout) {
                    Ok(stream) => self.state = ConnectionState::Connected(stream),
                    Err(e) => {
                        self.state = ConnectionState::Disconnected;
                        return Err(e);
                    }
                }
            }
        }

        let r = match &mut self.state {
            ConnectionState::Connected(stream) => {
                stream.write_all(frame).and_then(|_| stream.flush())
            }
            _ => Err(io::Error::from(io::ErrorKind::NotConnected)),
        };
        if r.is_err() {
            self.state = ConnectionState::Disconnected;
        }
        r
    }

    pub(crate) fn close(&mut self) {
        self.state = ConnectionState::Closed;
    }
}
