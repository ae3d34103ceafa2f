// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod pool;
pub mod ring;

use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::{
    cfg::config::Config,
    cluster::{pool::Pool, ring::NodeRing},
    database::Engine,
    resp::{
        connection::RespConn,
        reply::{ErrorReply, Reply},
    },
    utils::to_cmd_line,
};

/// Shard router: keys are placed on the consistent-hash ring and commands
/// relayed to whichever node owns them, through pooled protocol clients.
/// Every node runs the same router, so any node can serve any client.
pub struct ClusterDatabase {
    self_node: String,
    nodes: Vec<String>,
    peers: HashMap<String, Pool>,
    picker: NodeRing,
    engine: Arc<Engine>,
}

impl ClusterDatabase {
    pub fn new(cfg: &Config, engine: Arc<Engine>) -> Self {
        let mut nodes: Vec<String> = cfg.peers.clone();
        nodes.push(cfg.self_addr.clone());
        nodes.sort();
        nodes.dedup();

        let mut picker = NodeRing::new();
        picker.add_nodes(&nodes);

        let peers = cfg
            .peers
            .iter()
            .filter(|peer| **peer != cfg.self_addr)
            .map(|peer| {
                (peer.clone(), Pool::new(peer.clone(), cfg.max_peer_connections))
            })
            .collect();

        Self {
            self_node: cfg.self_addr.clone(),
            nodes,
            peers,
            picker,
            engine,
        }
    }

    pub fn self_node(&self) -> &str {
        &self.self_node
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Routes one command frame.
    pub async fn exec(&self, conn: &RespConn, cmd_line: &[Vec<u8>]) -> Reply {
        let Some(name) = cmd_line.first() else {
            return ErrorReply::Generic("ERR empty command".into()).into();
        };
        let name = String::from_utf8_lossy(name).to_lowercase();
        match name.as_str() {
            // connection-scoped commands never leave this node
            "ping" | "select" => self.engine.exec(conn, cmd_line),
            "del" => self.broadcast_del(conn, cmd_line).await,
            "flushdb" => self.broadcast_flushdb(conn, cmd_line).await,
            "rename" | "renamenx" => self.same_slot_rename(conn, cmd_line).await,
            _ if cmd_line.len() >= 2 => {
                let key = String::from_utf8_lossy(&cmd_line[1]);
                let peer = self.picker.pick_node(&key);
                self.relay(&peer, conn, cmd_line).await
            },
            _ => self.engine.exec(conn, cmd_line),
        }
    }

    /// Executes on this node or forwards to a peer: first a `SELECT` for
    /// the connection's database, then the command, then exactly one
    /// reply back. The borrowed client returns to its pool on every exit
    /// path.
    pub(crate) async fn relay(
        &self,
        peer: &str,
        conn: &RespConn,
        args: &[Vec<u8>],
    ) -> Reply {
        if peer == self.self_node {
            return self.engine.exec(conn, args);
        }
        let Some(pool) = self.peers.get(peer) else {
            return ErrorReply::Generic(format!("ERR unknown peer {peer}")).into();
        };
        let client = match pool.borrow().await {
            Ok(client) => client,
            Err(err) => return ErrorReply::Generic(err.to_string()).into(),
        };

        let select = to_cmd_line(&["SELECT", &conn.db_index().to_string()]);
        if let Err(err) = client.send(&select).await {
            return ErrorReply::Generic(err.to_string()).into();
        }
        match client.send(args).await {
            Ok(reply) => reply,
            Err(err) => ErrorReply::Generic(err.to_string()).into(),
        }
    }

    /// Relays to every node, collecting a node → reply map.
    pub(crate) async fn broadcast(
        &self,
        conn: &RespConn,
        args: &[Vec<u8>],
    ) -> HashMap<String, Reply> {
        let mut replies = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let reply = self.relay(node, conn, args).await;
            replies.insert(node.clone(), reply);
        }
        replies
    }

    /// `DEL` fans out to every shard; the counts are summed and the first
    /// failure wins.
    async fn broadcast_del(&self, conn: &RespConn, args: &[Vec<u8>]) -> Reply {
        let replies = self.broadcast(conn, args).await;
        let mut deleted = 0i64;
        for (node, reply) in replies {
            match reply {
                Reply::Integer(int) => deleted += int.code,
                Reply::Error(err) => {
                    return ErrorReply::Generic(format!("error occurs: {err}")).into();
                },
                other => {
                    debug!(%node, "unexpected del reply: {other:?}");
                    return ErrorReply::Generic(
                        "error occurs: unexpected reply type".into(),
                    )
                    .into();
                },
            }
        }
        Reply::integer(deleted)
    }

    async fn broadcast_flushdb(&self, conn: &RespConn, args: &[Vec<u8>]) -> Reply {
        let replies = self.broadcast(conn, args).await;
        for reply in replies.into_values() {
            if let Reply::Error(err) = reply {
                return ErrorReply::Generic(format!("error occurs: {err}")).into();
            }
        }
        Reply::ok()
    }

    /// Both keys must land on one shard; the rename then runs there.
    async fn same_slot_rename(&self, conn: &RespConn, args: &[Vec<u8>]) -> Reply {
        if args.len() != 3 {
            return ErrorReply::ArgNum("rename".into()).into();
        }
        let src = String::from_utf8_lossy(&args[1]);
        let dest = String::from_utf8_lossy(&args[2]);

        let src_peer = self.picker.pick_node(&src);
        let dest_peer = self.picker.pick_node(&dest);
        if src_peer != dest_peer {
            return ErrorReply::CrossSlotRename.into();
        }
        self.relay(&src_peer, conn, args).await
    }

    pub async fn close(&self) {
        self.engine.close().await;
    }
}
