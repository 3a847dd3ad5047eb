/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use m3_codec::{BatchDecodeError, MAX_FRAME_SIZE, Protocol, decode_frame, read_frame};
use m3_types::MetricBatch;

#[derive(Default)]
struct ServerState {
    batches: Vec<(Protocol, MetricBatch)>,
    errors: Vec<BatchDecodeError>,
    connections: usize,
}

/// A receiving endpoint decoding every frame it gets
pub struct FakeServer {
    addr: SocketAddr,
    state: Arc<(Mutex<ServerState>, Condvar)>,
}

impl FakeServer {
    pub fn start() -> Self {
        FakeServer::bind("127.0.0.1:0".parse().unwrap())
    }

    pub fn bind(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new((Mutex::new(ServerState::default()), Condvar::new()));

        let accept_state = state.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    break;
                };
                let state = accept_state.clone();
                state.0.lock().unwrap().connections += 1;
                thread::spawn(move || serve_connection(stream, state));
            }
        });

        FakeServer { addr, state }
    }

    pub fn host_port(&self) -> String {
        self.addr.to_string()
    }

    pub fn connections(&self) -> usize {
        self.state.0.lock().unwrap().connections
    }

    pub fn errors(&self) -> Vec<BatchDecodeError> {
        self.state.0.lock().unwrap().errors.clone()
    }

    pub fn batches(&self) -> Vec<MetricBatch> {
        let state = self.state.0.lock().unwrap();
        state.batches.iter().map(|(_, b)| b.clone()).collect()
    }

    pub fn protocols(&self) -> Vec<Protocol> {
        let state = self.state.0.lock().unwrap();
        state.batches.iter().map(|(p, _)| *p).collect()
    }

    /// Wait until the total number of received metrics reaches `count`
    pub fn wait_metrics(&self, count: usize, timeout: Duration) -> Vec<MetricBatch> {
        let deadline = Instant::now() + timeout;
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().unwrap();
        loop {
            let received: usize = state.batches.iter().map(|(_, b)| b.len()).sum();
            if received >= count {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            state = cvar.wait_timeout(state, deadline - now).unwrap().0;
        }
        state.batches.iter().map(|(_, b)| b.clone()).collect()
    }
}

fn serve_connection(mut stream: TcpStream, state: Arc<(Mutex<ServerState>, Condvar)>) {
    let (lock, cvar) = &*state;
    while let Ok(Some(payload)) = read_frame(&mut stream, MAX_FRAME_SIZE) {
        let mut state = lock.lock().unwrap();
        match decode_frame(&payload) {
            Ok(r) => state.batches.push(r),
            Err(e) => state.errors.push(e),
        }
        cvar.notify_all();
    }
}

/// An address with nothing listening on it
pub fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}
