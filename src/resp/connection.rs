// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    io,
    net::SocketAddr,
    sync::{
        Arc, Mutex as StdMutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::AsyncWriteExt,
    net::tcp::OwnedWriteHalf,
    sync::Mutex,
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::utils::Wait;

const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-client connection state: the write half of the socket, the write
/// lock that keeps replies from interleaving, the in-flight reply gate the
/// close path drains, and the selected database index.
///
/// The read half is owned by the connection's decoder task and never
/// touches this struct.
#[derive(Debug)]
pub struct Connection {
    writer: Mutex<OwnedWriteHalf>,
    waiting_reply: Wait,
    selected_db: AtomicUsize,
    peer: SocketAddr,
    closing: CancellationToken,
}

impl Connection {
    pub fn new(writer: OwnedWriteHalf, peer: SocketAddr) -> Self {
        Self {
            writer: Mutex::new(writer),
            waiting_reply: Wait::default(),
            selected_db: AtomicUsize::new(0),
            peer,
            closing: CancellationToken::new(),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Resolves once [`Connection::close`] has been requested; the
    /// serving loop selects on this to stop dispatching new commands.
    pub async fn closed(&self) {
        self.closing.cancelled().await;
    }

    /// Sends one reply. The lock serializes concurrent writers so each
    /// reply reaches the wire contiguously and in submission order.
    pub async fn write(&self, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let mut writer = self.writer.lock().await;
        self.waiting_reply.add(1);
        let result = writer.write_all(data).await;
        self.waiting_reply.done();
        result
    }

    /// Stops the serving loop, waits up to ten seconds for in-flight
    /// replies, then shuts the socket down regardless.
    pub async fn close(&self) {
        self.closing.cancel();
        if self.waiting_reply.wait_with_timeout(CLOSE_DRAIN_TIMEOUT).await {
            warn!(peer = %self.peer, "closing with undrained replies");
        }
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }

    pub fn db_index(&self) -> usize {
        self.selected_db.load(Ordering::SeqCst)
    }

    pub fn select_db(&self, index: usize) {
        self.selected_db.store(index, Ordering::SeqCst);
    }
}

/// In-memory stand-in for [`Connection`], used while replaying the
/// append-only log and in tests. Writes land in a buffer; `SELECT` frames
/// still move the database index.
#[derive(Debug, Default)]
pub struct FakeConn {
    buf: StdMutex<Vec<u8>>,
    selected_db: AtomicUsize,
}

impl FakeConn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.buf.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn clean(&self) {
        if let Ok(mut buf) = self.buf.lock() {
            buf.clear();
        }
    }

    fn write(&self, data: &[u8]) {
        if let Ok(mut buf) = self.buf.lock() {
            buf.extend_from_slice(data);
        }
    }
}

/// The two connection flavors an executor can answer to.
#[derive(Debug, Clone)]
pub enum RespConn {
    Socket(Arc<Connection>),
    Fake(Arc<FakeConn>),
}

impl RespConn {
    pub fn fake() -> Self {
        RespConn::Fake(Arc::new(FakeConn::new()))
    }

    pub async fn write(&self, data: &[u8]) -> io::Result<()> {
        match self {
            RespConn::Socket(conn) => conn.write(data).await,
            RespConn::Fake(conn) => {
                conn.write(data);
                Ok(())
            },
        }
    }

    pub fn db_index(&self) -> usize {
        match self {
            RespConn::Socket(conn) => conn.db_index(),
            RespConn::Fake(conn) => conn.selected_db.load(Ordering::SeqCst),
        }
    }

    pub fn select_db(&self, index: usize) {
        match self {
            RespConn::Socket(conn) => conn.select_db(index),
            RespConn::Fake(conn) => conn.selected_db.store(index, Ordering::SeqCst),
        }
    }
}
