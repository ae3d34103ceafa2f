// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    database::db::Db,
    resp::reply::{ErrorReply, Reply},
    utils::{cmd_line_with_name, now_millis, to_cmd_line},
    wildcard::Pattern,
};

fn key_of(arg: &[u8]) -> String {
    String::from_utf8_lossy(arg).into_owned()
}

fn parse_i64(arg: &[u8]) -> Result<i64, ErrorReply> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(ErrorReply::NotAnInteger)
}

pub fn cmd_del(db: &Db, args: &[Vec<u8>]) -> Reply {
    let deleted = db.removes(args.iter().map(|a| key_of(a)));
    if deleted > 0 {
        db.add_aof(cmd_line_with_name("del", args));
    }
    Reply::integer(deleted)
}

pub fn cmd_exists(db: &Db, args: &[Vec<u8>]) -> Reply {
    let present = args.iter().filter(|a| db.contains_key(&key_of(a))).count();
    Reply::integer(present as i64)
}

pub fn cmd_flushdb(db: &Db, args: &[Vec<u8>]) -> Reply {
    db.flush();
    db.add_aof(cmd_line_with_name("flushdb", args));
    Reply::ok()
}

pub fn cmd_type(db: &Db, args: &[Vec<u8>]) -> Reply {
    match db.get_entity(&key_of(&args[0])) {
        None => Reply::status("none"),
        Some(entity) => Reply::status(entity.type_name()),
    }
}

pub fn cmd_rename(db: &Db, args: &[Vec<u8>]) -> Reply {
    let src = key_of(&args[0]);
    let dest = key_of(&args[1]);

    let Some(entity) = db.get_entity(&src) else {
        return ErrorReply::NoSuchKey.into();
    };
    db.put_entity(dest, entity);
    db.remove(&src);
    db.add_aof(cmd_line_with_name("rename", args));
    Reply::ok()
}

pub fn cmd_renamenx(db: &Db, args: &[Vec<u8>]) -> Reply {
    let src = key_of(&args[0]);
    let dest = key_of(&args[1]);

    if db.get_entity(&dest).is_some() {
        return Reply::integer(0);
    }
    let Some(entity) = db.get_entity(&src) else {
        return ErrorReply::NoSuchKey.into();
    };
    db.removes([src, dest.clone()]);
    db.put_entity(dest, entity);
    db.add_aof(cmd_line_with_name("renamenx", args));
    Reply::integer(1)
}

pub fn cmd_keys(db: &Db, args: &[Vec<u8>]) -> Reply {
    let pattern = Pattern::compile(&key_of(&args[0]));
    let mut matched = Vec::new();
    db.for_each(|key, _| {
        if pattern.is_match(key) {
            matched.push(key.as_bytes().to_vec());
        }
        true
    });
    Reply::multi_bulk(matched)
}

/// `EXPIRE key seconds`: arms a relative deadline. A non-positive ttl
/// deletes the key outright. The log records the absolute form so replay
/// restores the original deadline instead of re-arming a fresh one.
pub fn cmd_expire(db: &Db, args: &[Vec<u8>]) -> Reply {
    let key = key_of(&args[0]);
    let seconds = match parse_i64(&args[1]) {
        Ok(n) => n,
        Err(err) => return err.into(),
    };

    let Some(entity) = db.get_entity(&key) else {
        return Reply::integer(0);
    };
    if seconds <= 0 {
        db.remove(&key);
        db.add_aof(to_cmd_line(&["del", &key]));
        return Reply::integer(1);
    }

    let deadline = now_millis() + seconds * 1000;
    entity.set_expire_at(deadline);
    db.add_aof(to_cmd_line(&["pexpireat", &key, &deadline.to_string()]));
    Reply::integer(1)
}

/// `PEXPIREAT key unix-ms`: absolute deadline, also the canonical form
/// replayed from the log.
pub fn cmd_pexpireat(db: &Db, args: &[Vec<u8>]) -> Reply {
    let key = key_of(&args[0]);
    let deadline = match parse_i64(&args[1]) {
        Ok(n) => n,
        Err(err) => return err.into(),
    };

    let Some(entity) = db.get_entity(&key) else {
        return Reply::integer(0);
    };
    entity.set_expire_at(deadline);
    db.add_aof(cmd_line_with_name("pexpireat", args));
    Reply::integer(1)
}

pub fn cmd_persist(db: &Db, args: &[Vec<u8>]) -> Reply {
    let key = key_of(&args[0]);
    let Some(entity) = db.get_entity(&key) else {
        return Reply::integer(0);
    };
    if entity.expire_at() == 0 {
        return Reply::integer(0);
    }
    entity.set_expire_at(0);
    db.add_aof(cmd_line_with_name("persist", args));
    Reply::integer(1)
}

/// `TTL key`: -2 when absent, -1 without expiry, otherwise the remaining
/// whole seconds (rounded up so a freshly armed ttl reads back intact).
pub fn cmd_ttl(db: &Db, args: &[Vec<u8>]) -> Reply {
    let key = key_of(&args[0]);
    let Some(entity) = db.get_entity(&key) else {
        return Reply::integer(-2);
    };
    let deadline = entity.expire_at();
    if deadline == 0 {
        return Reply::integer(-1);
    }
    let remaining_millis = deadline - now_millis();
    let quotient = remaining_millis / 1000;
    let remainder = remaining_millis % 1000;
    let remaining_secs = if remainder > 0 {
        quotient + 1
    } else {
        quotient
    };
    Reply::integer(remaining_secs)
}
