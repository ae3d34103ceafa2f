// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    database::db::{DataEntity, Db},
    resp::reply::{ErrorReply, MultiBulkReply, Reply},
    utils::cmd_line_with_name,
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

pub fn cmd_get(db: &Db, args: &[Vec<u8>]) -> Reply {
    match db.get_as_string(&key_of(&args[0])) {
        Err(err) => err.into(),
        Ok(None) => Reply::null_bulk(),
        Ok(Some(bytes)) => Reply::bulk(bytes),
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum SetPolicy {
    Upsert,
    InsertOnly,
    UpdateOnly,
}

/// `SET key value [NX|XX]`. A failed precondition answers null bulk; the
/// command is still logged, matching the original's write path.
pub fn cmd_set(db: &Db, args: &[Vec<u8>]) -> Reply {
    let key = key_of(&args[0]);
    let value = args[1].clone();

    let mut policy = SetPolicy::Upsert;
    for opt in &args[2..] {
        match String::from_utf8_lossy(opt).to_uppercase().as_str() {
            "NX" if policy != SetPolicy::UpdateOnly => policy = SetPolicy::InsertOnly,
            "XX" if policy != SetPolicy::InsertOnly => policy = SetPolicy::UpdateOnly,
            _ => return ErrorReply::Syntax.into(),
        }
    }

    let entity = DataEntity::bytes(value);
    let written = match policy {
        SetPolicy::Upsert => {
            db.put_entity(key, entity);
            1
        },
        SetPolicy::InsertOnly => db.put_if_absent(key, entity),
        SetPolicy::UpdateOnly => db.put_if_exists(key, entity),
    };
    db.add_aof(cmd_line_with_name("set", args));

    if written > 0 { Reply::ok() } else { Reply::null_bulk() }
}

pub fn cmd_setnx(db: &Db, args: &[Vec<u8>]) -> Reply {
    let written = db.put_if_absent(key_of(&args[0]), DataEntity::bytes(args[1].clone()));
    db.add_aof(cmd_line_with_name("setnx", args));
    Reply::integer(written)
}

pub fn cmd_mset(db: &Db, args: &[Vec<u8>]) -> Reply {
    if args.len() % 2 != 0 {
        return ErrorReply::Syntax.into();
    }
    for pair in args.chunks_exact(2) {
        db.put_entity(key_of(&pair[0]), DataEntity::bytes(pair[1].clone()));
    }
    db.add_aof(cmd_line_with_name("mset", args));
    Reply::ok()
}

pub fn cmd_mget(db: &Db, args: &[Vec<u8>]) -> Reply {
    let mut result = Vec::with_capacity(args.len());
    for arg in args {
        match db.get_as_string(&key_of(arg)) {
            Ok(value) => result.push(value),
            // a wrong-typed key reads as absent here
            Err(ErrorReply::WrongType) => result.push(None),
            Err(err) => return err.into(),
        }
    }
    MultiBulkReply::nullable(result).into()
}

/// `MSETNX`: all-or-nothing — any existing key fails the whole batch.
pub fn cmd_msetnx(db: &Db, args: &[Vec<u8>]) -> Reply {
    if args.len() % 2 != 0 {
        return ErrorReply::Syntax.into();
    }
    let keys: Vec<String> = args.iter().step_by(2).map(|k| key_of(k)).collect();
    if keys.iter().any(|key| db.get_entity(key).is_some()) {
        return Reply::integer(0);
    }
    for pair in args.chunks_exact(2) {
        db.put_entity(key_of(&pair[0]), DataEntity::bytes(pair[1].clone()));
    }
    db.add_aof(cmd_line_with_name("msetnx", args));
    Reply::integer(1)
}

pub fn cmd_getset(db: &Db, args: &[Vec<u8>]) -> Reply {
    let key = key_of(&args[0]);
    let old = match db.get_as_string(&key) {
        Ok(old) => old,
        Err(err) => return err.into(),
    };
    db.put_entity(key, DataEntity::bytes(args[1].clone()));
    match old {
        None => Reply::null_bulk(),
        Some(old) => {
            db.add_aof(cmd_line_with_name("getset", args));
            Reply::bulk(old)
        },
    }
}

fn apply_delta(db: &Db, name: &str, args: &[Vec<u8>], delta: i64) -> Reply {
    let key = key_of(&args[0]);
    let current = match db.get_as_string(&key) {
        Ok(bytes) => bytes,
        Err(err) => return err.into(),
    };
    match current {
        Some(bytes) => {
            let Ok(value) = parse_i64(&bytes) else {
                return ErrorReply::NotAnInteger.into();
            };
            let Some(next) = value.checked_add(delta) else {
                return ErrorReply::Generic(
                    "ERR increment or decrement would overflow".into(),
                )
                .into();
            };
            db.put_entity(key, DataEntity::bytes(next.to_string().into_bytes()));
            db.add_aof(cmd_line_with_name(name, args));
            Reply::integer(next)
        },
        None => {
            // first delta against an absent key stores the raw operand
            // bytes for incrby/decrby and the formatted value otherwise
            let stored = match name {
                "incrby" => args[1].clone(),
                _ => delta.to_string().into_bytes(),
            };
            db.put_entity(key, DataEntity::bytes(stored));
            db.add_aof(cmd_line_with_name(name, args));
            Reply::integer(delta)
        },
    }
}

pub fn cmd_incr(db: &Db, args: &[Vec<u8>]) -> Reply {
    apply_delta(db, "incr", args, 1)
}

pub fn cmd_incrby(db: &Db, args: &[Vec<u8>]) -> Reply {
    match parse_i64(&args[1]) {
        Ok(delta) => apply_delta(db, "incrby", args, delta),
        Err(err) => err.into(),
    }
}

pub fn cmd_decr(db: &Db, args: &[Vec<u8>]) -> Reply {
    apply_delta(db, "decr", args, -1)
}

pub fn cmd_decrby(db: &Db, args: &[Vec<u8>]) -> Reply {
    match parse_i64(&args[1]) {
        Ok(delta) => match delta.checked_neg() {
            Some(neg) => apply_delta(db, "decrby", args, neg),
            None => ErrorReply::NotAnInteger.into(),
        },
        Err(err) => err.into(),
    }
}

pub fn cmd_strlen(db: &Db, args: &[Vec<u8>]) -> Reply {
    match db.get_as_string(&key_of(&args[0])) {
        Err(err) => err.into(),
        Ok(None) => Reply::integer(0),
        Ok(Some(bytes)) => Reply::integer(bytes.len() as i64),
    }
}

pub fn cmd_append(db: &Db, args: &[Vec<u8>]) -> Reply {
    let key = key_of(&args[0]);
    let mut bytes = match db.get_as_string(&key) {
        Ok(bytes) => bytes.unwrap_or_default(),
        Err(err) => return err.into(),
    };
    bytes.extend_from_slice(&args[1]);
    let total = bytes.len() as i64;
    db.put_entity(key, DataEntity::bytes(bytes));
    db.add_aof(cmd_line_with_name("append", args));
    Reply::integer(total)
}

/// `SETRANGE key offset value`: overwrites in place, zero-padding any gap
/// between the current end and the offset.
pub fn cmd_setrange(db: &Db, args: &[Vec<u8>]) -> Reply {
    let key = key_of(&args[0]);
    let offset = match parse_i64(&args[1]) {
        Ok(n) if n >= 0 => n as usize,
        Ok(_) => return ErrorReply::Generic("ERR offset is out of range".into()).into(),
        Err(err) => return err.into(),
    };
    let value = &args[2];

    let mut bytes = match db.get_as_string(&key) {
        Ok(bytes) => bytes.unwrap_or_default(),
        Err(err) => return err.into(),
    };
    if bytes.len() < offset + value.len() {
        bytes.resize(offset + value.len(), 0);
    }
    bytes[offset..offset + value.len()].copy_from_slice(value);

    let total = bytes.len() as i64;
    db.put_entity(key, DataEntity::bytes(bytes));
    db.add_aof(cmd_line_with_name("setrange", args));
    Reply::integer(total)
}

/// `GETRANGE key start end`, both inclusive, negatives counting back from
/// the end of the value.
pub fn cmd_getrange(db: &Db, args: &[Vec<u8>]) -> Reply {
    let key = key_of(&args[0]);
    let start = match parse_i64(&args[1]) {
        Ok(n) => n,
        Err(err) => return err.into(),
    };
    let end = match parse_i64(&args[2]) {
        Ok(n) => n,
        Err(err) => return err.into(),
    };

    let bytes = match db.get_as_string(&key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Reply::null_bulk(),
        Err(err) => return err.into(),
    };
    let len = bytes.len() as i64;

    let start = if start < 0 { len + start } else { start };
    if start < 0 || start >= len {
        return Reply::null_bulk();
    }
    let end = if end < 0 { len + end } else { end };
    if end < 0 {
        return Reply::null_bulk();
    }
    let end = end.min(len - 1);
    if start > end {
        return Reply::null_bulk();
    }
    Reply::bulk(bytes[start as usize..=end as usize].to_vec())
}
