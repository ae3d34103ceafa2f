// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Result;
use dashmap::DashMap;
use tokio::net::TcpStream;
use tracing::{debug, error, info};

use crate::{
    aof::AofHandler,
    cfg::config::Config,
    cluster::ClusterDatabase,
    database::Engine,
    resp::{
        connection::{Connection, RespConn},
        parser::{ParseError, parse_stream},
        reply::{ErrorReply, Reply, ToBytes},
    },
};

/// The storage this handler executes against: one local engine, or the
/// cluster router wrapping it.
pub enum DatabaseKind {
    Standalone(Arc<Engine>),
    Cluster(Arc<ClusterDatabase>),
}

impl DatabaseKind {
    pub async fn exec(&self, conn: &RespConn, cmd_line: &[Vec<u8>]) -> Reply {
        match self {
            DatabaseKind::Standalone(engine) => engine.exec(conn, cmd_line),
            DatabaseKind::Cluster(cluster) => cluster.exec(conn, cmd_line).await,
        }
    }

    pub async fn close(&self) {
        match self {
            DatabaseKind::Standalone(engine) => engine.close().await,
            DatabaseKind::Cluster(cluster) => cluster.close().await,
        }
    }
}

/// Per-server connection handler: tracks live connections, runs the
/// read-parse-dispatch-write loop for each, and closes everything on
/// shutdown.
pub struct RespHandler {
    db: DatabaseKind,
    active: DashMap<SocketAddr, Arc<Connection>>,
    closing: AtomicBool,
}

impl RespHandler {
    pub fn new(db: DatabaseKind) -> Arc<Self> {
        Arc::new(Self {
            db,
            active: DashMap::new(),
            closing: AtomicBool::new(false),
        })
    }

    /// Builds the full stack a config describes: engine, optional log
    /// replay + persistence, optional cluster routing.
    pub async fn bootstrap(cfg: &Config) -> Result<Arc<Self>> {
        let engine = Engine::new(cfg.databases);
        if cfg.append_only {
            AofHandler::new(&engine, &cfg.append_filename).await?;
        }
        let db = if cfg.cluster_enabled() {
            info!(self_node = %cfg.self_addr, peers = cfg.peers.len(), "cluster mode");
            DatabaseKind::Cluster(Arc::new(ClusterDatabase::new(cfg, engine)))
        } else {
            DatabaseKind::Standalone(engine)
        };
        Ok(Self::new(db))
    }

    /// Serves one client connection until EOF, an I/O failure, or server
    /// shutdown.
    pub async fn handle(&self, stream: TcpStream) {
        if self.closing.load(Ordering::SeqCst) {
            return;
        }
        let Ok(peer) = stream.peer_addr() else {
            return;
        };
        let _ = stream.set_nodelay(true);

        let (read_half, write_half) = stream.into_split();
        let conn = Arc::new(Connection::new(write_half, peer));
        self.active.insert(peer, Arc::clone(&conn));
        let client = RespConn::Socket(Arc::clone(&conn));

        let mut payloads = parse_stream(read_half);
        loop {
            let payload = tokio::select! {
                _ = conn.closed() => break,
                payload = payloads.recv() => match payload {
                    Some(payload) => payload,
                    None => break,
                },
            };
            match payload {
                Err(err @ ParseError::Io(_)) => {
                    debug!(%peer, "connection stream ends: {err}");
                    break;
                },
                Err(protocol_err) => {
                    let reply =
                        ErrorReply::Generic(protocol_err.to_string()).to_bytes();
                    if conn.write(&reply).await.is_err() {
                        break;
                    }
                },
                Ok(Reply::MultiBulk(frame)) => {
                    let result = self.db.exec(&client, &frame.cmd_line()).await;
                    if conn.write(&result.to_bytes()).await.is_err() {
                        break;
                    }
                },
                Ok(other) => {
                    error!(%peer, "commands must be multi bulk frames, got {other:?}");
                },
            }
        }

        self.active.remove(&peer);
        conn.close().await;
        if let DatabaseKind::Standalone(engine) = &self.db {
            engine.after_client_close(&client);
        }
    }

    /// Stops accepting work and drains every live connection, then closes
    /// the storage (which flushes persistence).
    pub async fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
        info!("handler shutting down...");
        let connections: Vec<Arc<Connection>> =
            self.active.iter().map(|entry| Arc::clone(entry.value())).collect();
        for conn in connections {
            conn.close().await;
        }
        self.active.clear();
        self.db.close().await;
    }
}
