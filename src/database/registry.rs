// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashMap;

use crate::{
    database::{db::Db, keys, ping, string, zset},
    resp::reply::Reply,
};

/// A command executor: the database it runs against plus the arguments
/// after the command name.
pub type ExecFn = fn(&Db, &[Vec<u8>]) -> Reply;

/// One registered command. `arity >= 0` demands exactly that many parts
/// in the full command line (name included); `arity < 0` demands at least
/// `|arity|`.
#[derive(Clone, Copy)]
pub struct Command {
    pub executor: ExecFn,
    pub arity: i32,
}

impl Command {
    pub fn arity_matches(&self, cmd_line_len: usize) -> bool {
        let len = cmd_line_len as i32;
        if self.arity >= 0 {
            len == self.arity
        } else {
            len >= -self.arity
        }
    }
}

/// The command table. Built once by [`CommandRegistryBuilder`] before the
/// server accepts connections and read-only afterwards.
pub struct CommandRegistry {
    table: HashMap<String, Command>,
}

impl CommandRegistry {
    pub fn lookup(&self, lowercase_name: &str) -> Option<&Command> {
        self.table.get(lowercase_name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The full command set this server speaks.
    pub fn standard() -> Self {
        CommandRegistryBuilder::new()
            // keyspace
            .register("del", keys::cmd_del, -2)
            .register("exists", keys::cmd_exists, -2)
            .register("keys", keys::cmd_keys, 2)
            .register("flushdb", keys::cmd_flushdb, -1)
            .register("type", keys::cmd_type, 2)
            .register("rename", keys::cmd_rename, 3)
            .register("renamenx", keys::cmd_renamenx, 3)
            .register("expire", keys::cmd_expire, 3)
            .register("pexpireat", keys::cmd_pexpireat, 3)
            .register("persist", keys::cmd_persist, 2)
            .register("ttl", keys::cmd_ttl, 2)
            // strings
            .register("set", string::cmd_set, -3)
            .register("setnx", string::cmd_setnx, 3)
            .register("mset", string::cmd_mset, -3)
            .register("mget", string::cmd_mget, -2)
            .register("msetnx", string::cmd_msetnx, -3)
            .register("get", string::cmd_get, 2)
            .register("getset", string::cmd_getset, 3)
            .register("incr", string::cmd_incr, 2)
            .register("incrby", string::cmd_incrby, 3)
            .register("decr", string::cmd_decr, 2)
            .register("decrby", string::cmd_decrby, 3)
            .register("strlen", string::cmd_strlen, 2)
            .register("append", string::cmd_append, 3)
            .register("setrange", string::cmd_setrange, 4)
            .register("getrange", string::cmd_getrange, 4)
            // sorted sets
            .register("zadd", zset::cmd_zadd, -4)
            .register("zscore", zset::cmd_zscore, 3)
            .register("zrank", zset::cmd_zrank, 3)
            .register("zrevrank", zset::cmd_zrevrank, 3)
            .register("zcard", zset::cmd_zcard, 2)
            .register("zrange", zset::cmd_zrange, -4)
            .register("zrevrange", zset::cmd_zrevrange, -4)
            .register("zrem", zset::cmd_zrem, -3)
            .register("zincrby", zset::cmd_zincrby, 4)
            .register("zcount", zset::cmd_zcount, 4)
            .register("zrangebyscore", zset::cmd_zrangebyscore, -4)
            .register("zrevrangebyscore", zset::cmd_zrevrangebyscore, -4)
            .register("zremrangebyrank", zset::cmd_zremrangebyrank, 4)
            .register("zremrangebyscore", zset::cmd_zremrangebyscore, 4)
            // connection
            .register("ping", ping::cmd_ping, -1)
            .build()
    }
}

/// Builder for [`CommandRegistry`]; names are stored lowercase.
#[derive(Default)]
pub struct CommandRegistryBuilder {
    table: HashMap<String, Command>,
}

impl CommandRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: &str, executor: ExecFn, arity: i32) -> Self {
        self.table.insert(name.to_lowercase(), Command { executor, arity });
        self
    }

    pub fn build(self) -> CommandRegistry {
        CommandRegistry { table: self.table }
    }
}
