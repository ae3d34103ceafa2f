// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod db;
pub mod keys;
pub mod ping;
pub mod registry;
pub mod string;
pub mod zset;

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::{
    aof::AofHandler,
    database::{db::Db, registry::CommandRegistry},
    resp::{
        connection::RespConn,
        reply::{ErrorReply, Reply},
    },
    utils::CmdLine,
};

/// The standalone command-execution engine: a fixed set of numbered
/// databases plus the immutable command registry built at startup.
///
/// The append-only-file handler is attached after construction (it needs
/// the engine to replay the log into), mirroring the one-shot wiring the
/// connection pool uses for its self-reference.
pub struct Engine {
    dbs: Vec<Arc<Db>>,
    registry: CommandRegistry,
    aof: OnceCell<Arc<AofHandler>>,
}

impl Engine {
    pub fn new(databases: usize) -> Arc<Self> {
        let dbs = (0..databases.max(1)).map(|i| Arc::new(Db::new(i))).collect();
        Arc::new(Self {
            dbs,
            registry: CommandRegistry::standard(),
            aof: OnceCell::new(),
        })
    }

    pub fn db_count(&self) -> usize {
        self.dbs.len()
    }

    pub fn db(&self, index: usize) -> Option<&Arc<Db>> {
        self.dbs.get(index)
    }

    /// Wires the persistence hook into every database. Must be called
    /// once, after the handler has finished replaying the log.
    pub fn attach_aof(&self, handler: Arc<AofHandler>) {
        if self.aof.set(Arc::clone(&handler)).is_err() {
            debug!("aof handler already attached");
            return;
        }
        for db in &self.dbs {
            let handler = Arc::clone(&handler);
            let index = db.index();
            db.set_aof_recorder(Box::new(move |line| handler.append(index, line)));
        }
    }

    /// Executes one command frame against the connection's selected
    /// database. `SELECT` is routed here because it mutates connection
    /// state rather than a database.
    pub fn exec(&self, conn: &RespConn, cmd_line: &[Vec<u8>]) -> Reply {
        let Some(name) = cmd_line.first() else {
            return ErrorReply::Generic("ERR empty command".into()).into();
        };
        let name = String::from_utf8_lossy(name).to_lowercase();

        if name == "select" {
            if cmd_line.len() != 2 {
                return ErrorReply::ArgNum("select".into()).into();
            }
            return self.exec_select(conn, &cmd_line[1]);
        }

        let Some(db) = self.dbs.get(conn.db_index()) else {
            return ErrorReply::DbIndexOutOfRange.into();
        };
        let Some(cmd) = self.registry.lookup(&name) else {
            return ErrorReply::UnknownCommand(name).into();
        };
        if !cmd.arity_matches(cmd_line.len()) {
            return ErrorReply::ArgNum(name).into();
        }
        (cmd.executor)(db, &cmd_line[1..])
    }

    fn exec_select(&self, conn: &RespConn, raw_index: &[u8]) -> Reply {
        let Ok(index) = String::from_utf8_lossy(raw_index).parse::<usize>() else {
            return ErrorReply::NotAnInteger.into();
        };
        if index >= self.dbs.len() {
            return ErrorReply::DbIndexOutOfRange.into();
        }
        conn.select_db(index);
        Reply::ok()
    }

    pub fn after_client_close(&self, _conn: &RespConn) {
        debug!("client connection closed");
    }

    /// Flushes and stops persistence. Safe to call once during shutdown.
    pub async fn close(&self) {
        if let Some(aof) = self.aof.get() {
            aof.close().await;
        }
    }
}

/// Convenience used by executors to echo a command into the log.
pub(crate) type AofRecorder = Box<dyn Fn(CmdLine) + Send + Sync>;
