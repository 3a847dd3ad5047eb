/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use log::debug;

use crate::ReporterError;

mod addr;
pub use addr::{ServerAddr, ServerAddrParseError};

mod connection;
use connection::ServerConnection;

#[cfg(test)]
mod buf;
#[cfg(test)]
pub(crate) use buf::BufTransport;

pub(crate) struct TcpTransport {
    conns: Vec<ServerConnection>,
    current: usize,
    connect_timeout: Duration,
    write_timeout: Duration,
    closed: bool,
}

impl TcpTransport {
    pub(crate) fn new(
        addrs: Vec<ServerAddr>,
        connect_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        TcpTransport {
            conns: addrs.into_iter().map(ServerConnection::new).collect(),
            current: 0,
            connect_timeout,
            write_timeout,
            closed: false,
        }
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), ReporterError> {
        if self.closed {
            return Err(ReporterError::Closed);
        }
        let total = self.conns.len();
        let Some(conn) = self.conns.get_mut(self.current) else {
            return Err(ReporterError::Closed);
        };
        match conn.send(frame, self.connect_timeout, self.write_timeout) {
            Ok(_) => Ok(()),
            Err(e) => {
                let addr = conn.addr().clone();
                // fail over to the next server for later sends
                self.current = (self.current + 1) % total;
                debug!("send to m3 server {addr} failed: {e}");
                Err(ReporterError::TransportUnavailable { addr, source: e })
            }
        }
    }

    fn close(&mut self) {
        for conn in &mut self.conns {
            conn.close();
        }
        self.closed = true;
    }
}

pub(crate) enum Transport {
    #[cfg(test)]
    Buf(BufTransport),
    Tcp(TcpTransport),
}

impl Transport {
    pub(crate) fn send(&mut self, frame: &[u8]) -> Result<(), ReporterError> {
        match self {
            #[cfg(test)]
            Transport::Buf(b) => b.send(frame),
            Transport::Tcp(t) => t.send(frame),
        }
    }

    pub(crate) fn close(&mut self) {
        match self {
            #[cfg(test)]
            Transport::Buf(b) => b.close(),
            Transport::Tcp(t) => t.close(),
        }
    }
}
