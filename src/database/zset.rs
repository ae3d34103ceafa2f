// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{Arc, MutexGuard};

use crate::{
    database::db::{DataEntity, Db},
    datastruct::sortedset::{Element, SortedSet},
    resp::reply::{ErrorReply, Reply},
    utils::{cmd_line_with_name, format_score},
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

fn parse_score(arg: &[u8], err: ErrorReply) -> Result<f64, ErrorReply> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|f| !f.is_nan())
        .ok_or(err)
}

/// Fetches the sorted set under `key`, or `None` when absent.
fn get_as_zset(db: &Db, key: &str) -> Result<Option<Arc<DataEntity>>, ErrorReply> {
    match db.get_entity(key) {
        None => Ok(None),
        Some(entity) => {
            entity.as_zset()?;
            Ok(Some(entity))
        },
    }
}

/// Fetches or creates the sorted set under `key`.
fn get_or_init_zset(db: &Db, key: &str) -> Result<Arc<DataEntity>, ErrorReply> {
    match get_as_zset(db, key)? {
        Some(entity) => Ok(entity),
        None => {
            let entity = DataEntity::zset(SortedSet::new());
            db.put_entity(key.to_string(), Arc::clone(&entity));
            Ok(entity)
        },
    }
}

fn lock_set(entity: &DataEntity) -> MutexGuard<'_, SortedSet> {
    match entity.as_zset() {
        // the variant was checked on fetch; a poisoned lock keeps the data
        Ok(set) => set.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
        Err(_) => unreachable!("zset accessor used on checked entity"),
    }
}

fn elements_reply(elements: &[Element], with_scores: bool) -> Reply {
    let mut out = Vec::with_capacity(if with_scores {
        elements.len() * 2
    } else {
        elements.len()
    });
    for element in elements {
        out.push(element.member.as_bytes().to_vec());
        if with_scores {
            out.push(format_score(element.score).into_bytes());
        }
    }
    Reply::multi_bulk(out)
}

/// `ZADD key score member [score member ...]`. The reply counts members
/// that already existed and were re-scored, the contract the restart path
/// and callers rely on.
pub fn cmd_zadd(db: &Db, args: &[Vec<u8>]) -> Reply {
    if args.len() < 3 || args.len() % 2 == 0 {
        return ErrorReply::Syntax.into();
    }
    let key = key_of(&args[0]);

    let mut pairs = Vec::with_capacity((args.len() - 1) / 2);
    for chunk in args[1..].chunks_exact(2) {
        let score = match parse_score(&chunk[0], ErrorReply::NotAFloat) {
            Ok(score) => score,
            Err(err) => return err.into(),
        };
        pairs.push((key_of(&chunk[1]), score));
    }

    let entity = match get_or_init_zset(db, &key) {
        Ok(entity) => entity,
        Err(err) => return err.into(),
    };
    let mut updated = 0;
    {
        let mut set = lock_set(&entity);
        for (member, score) in pairs {
            if set.add(&member, score) {
                updated += 1;
            }
        }
    }
    db.add_aof(cmd_line_with_name("zadd", args));
    Reply::integer(updated)
}

pub fn cmd_zscore(db: &Db, args: &[Vec<u8>]) -> Reply {
    let entity = match get_as_zset(db, &key_of(&args[0])) {
        Ok(Some(entity)) => entity,
        Ok(None) => return Reply::null_bulk(),
        Err(err) => return err.into(),
    };
    let score = lock_set(&entity).get_score(&key_of(&args[1]));
    match score {
        None => Reply::null_bulk(),
        Some(score) => Reply::bulk(format_score(score).into_bytes()),
    }
}

fn rank_reply(db: &Db, args: &[Vec<u8>], reverse: bool) -> Reply {
    let entity = match get_as_zset(db, &key_of(&args[0])) {
        Ok(Some(entity)) => entity,
        Ok(None) => return Reply::null_bulk(),
        Err(err) => return err.into(),
    };
    let rank = lock_set(&entity).get_rank(&key_of(&args[1]), reverse);
    match rank {
        None => Reply::null_bulk(),
        Some(rank) => Reply::integer(rank),
    }
}

pub fn cmd_zrank(db: &Db, args: &[Vec<u8>]) -> Reply {
    rank_reply(db, args, false)
}

pub fn cmd_zrevrank(db: &Db, args: &[Vec<u8>]) -> Reply {
    rank_reply(db, args, true)
}

pub fn cmd_zcard(db: &Db, args: &[Vec<u8>]) -> Reply {
    match get_as_zset(db, &key_of(&args[0])) {
        Ok(Some(entity)) => Reply::integer(lock_set(&entity).len()),
        Ok(None) => Reply::integer(0),
        Err(err) => err.into(),
    }
}

fn range_by_rank(db: &Db, args: &[Vec<u8>], reverse: bool) -> Reply {
    let with_scores = args
        .get(3)
        .is_some_and(|arg| String::from_utf8_lossy(arg).eq_ignore_ascii_case("WITHSCORES"));

    let start = match parse_i64(&args[1]) {
        Ok(n) => n,
        Err(err) => return err.into(),
    };
    let stop = match parse_i64(&args[2]) {
        Ok(n) => n,
        Err(err) => return err.into(),
    };

    let entity = match get_as_zset(db, &key_of(&args[0])) {
        Ok(Some(entity)) => entity,
        Ok(None) => return Reply::empty_multi_bulk(),
        Err(err) => return err.into(),
    };

    let mut elements = Vec::new();
    lock_set(&entity).range(start, stop, reverse, |element| {
        elements.push(element.clone());
        true
    });
    if elements.is_empty() {
        return Reply::empty_multi_bulk();
    }
    elements_reply(&elements, with_scores)
}

pub fn cmd_zrange(db: &Db, args: &[Vec<u8>]) -> Reply {
    range_by_rank(db, args, false)
}

pub fn cmd_zrevrange(db: &Db, args: &[Vec<u8>]) -> Reply {
    range_by_rank(db, args, true)
}

pub fn cmd_zrem(db: &Db, args: &[Vec<u8>]) -> Reply {
    let entity = match get_as_zset(db, &key_of(&args[0])) {
        Ok(Some(entity)) => entity,
        Ok(None) => return Reply::integer(0),
        Err(err) => return err.into(),
    };
    let mut removed = 0;
    {
        let mut set = lock_set(&entity);
        for member in &args[1..] {
            if set.remove(&key_of(member)) {
                removed += 1;
            }
        }
    }
    if removed > 0 {
        db.add_aof(cmd_line_with_name("zrem", args));
    }
    Reply::integer(removed)
}

pub fn cmd_zincrby(db: &Db, args: &[Vec<u8>]) -> Reply {
    let key = key_of(&args[0]);
    let increment = match parse_score(&args[1], ErrorReply::NotAFloat) {
        Ok(delta) => delta,
        Err(err) => return err.into(),
    };
    let member = key_of(&args[2]);

    let entity = match get_or_init_zset(db, &key) {
        Ok(entity) => entity,
        Err(err) => return err.into(),
    };
    let next = {
        let mut set = lock_set(&entity);
        let next = set.get_score(&member).unwrap_or(0.0) + increment;
        set.add(&member, next);
        next
    };
    db.add_aof(cmd_line_with_name("zincrby", args));
    Reply::bulk(format_score(next).into_bytes())
}

pub fn cmd_zcount(db: &Db, args: &[Vec<u8>]) -> Reply {
    let min = match parse_score(&args[1], ErrorReply::MinMaxNotFloat) {
        Ok(min) => min,
        Err(err) => return err.into(),
    };
    let max = match parse_score(&args[2], ErrorReply::MinMaxNotFloat) {
        Ok(max) => max,
        Err(err) => return err.into(),
    };
    match get_as_zset(db, &key_of(&args[0])) {
        Ok(Some(entity)) => Reply::integer(lock_set(&entity).count(min, max)),
        Ok(None) => Reply::integer(0),
        Err(err) => err.into(),
    }
}

struct ScoreRangeOptions {
    with_scores: bool,
    offset: i64,
    limit: i64,
}

fn parse_score_range_options(args: &[Vec<u8>]) -> Result<ScoreRangeOptions, ErrorReply> {
    let mut options =
        ScoreRangeOptions { with_scores: false, offset: 0, limit: -1 };
    let mut i = 3;
    while i < args.len() {
        let arg = String::from_utf8_lossy(&args[i]).to_uppercase();
        if arg == "WITHSCORES" {
            options.with_scores = true;
        } else if arg == "LIMIT" && i + 2 < args.len() {
            options.offset = parse_i64(&args[i + 1])?;
            options.limit = parse_i64(&args[i + 2])?;
            i += 2;
        }
        i += 1;
    }
    Ok(options)
}

fn range_by_score(db: &Db, args: &[Vec<u8>], reverse: bool) -> Reply {
    // ZREVRANGEBYSCORE takes max before min
    let (first, second) = (&args[1], &args[2]);
    let (min_raw, max_raw) = if reverse { (second, first) } else { (first, second) };
    let min = match parse_score(min_raw, ErrorReply::MinMaxNotFloat) {
        Ok(min) => min,
        Err(err) => return err.into(),
    };
    let max = match parse_score(max_raw, ErrorReply::MinMaxNotFloat) {
        Ok(max) => max,
        Err(err) => return err.into(),
    };
    let options = match parse_score_range_options(args) {
        Ok(options) => options,
        Err(err) => return err.into(),
    };

    let entity = match get_as_zset(db, &key_of(&args[0])) {
        Ok(Some(entity)) => entity,
        Ok(None) => return Reply::empty_multi_bulk(),
        Err(err) => return err.into(),
    };
    let elements = lock_set(&entity).get_by_score_range(
        min,
        max,
        options.offset,
        options.limit,
        reverse,
    );
    elements_reply(&elements, options.with_scores)
}

pub fn cmd_zrangebyscore(db: &Db, args: &[Vec<u8>]) -> Reply {
    range_by_score(db, args, false)
}

pub fn cmd_zrevrangebyscore(db: &Db, args: &[Vec<u8>]) -> Reply {
    range_by_score(db, args, true)
}

pub fn cmd_zremrangebyrank(db: &Db, args: &[Vec<u8>]) -> Reply {
    let start = match parse_i64(&args[1]) {
        Ok(n) => n,
        Err(err) => return err.into(),
    };
    let stop = match parse_i64(&args[2]) {
        Ok(n) => n,
        Err(err) => return err.into(),
    };
    let entity = match get_as_zset(db, &key_of(&args[0])) {
        Ok(Some(entity)) => entity,
        Ok(None) => return Reply::integer(0),
        Err(err) => return err.into(),
    };

    let removed = {
        let mut set = lock_set(&entity);
        let mut doomed = Vec::new();
        set.range(start, stop, false, |element| {
            doomed.push(element.member.clone());
            true
        });
        let mut removed = 0;
        for member in doomed {
            if set.remove(&member) {
                removed += 1;
            }
        }
        removed
    };
    if removed > 0 {
        db.add_aof(cmd_line_with_name("zremrangebyrank", args));
    }
    Reply::integer(removed)
}

pub fn cmd_zremrangebyscore(db: &Db, args: &[Vec<u8>]) -> Reply {
    let min = match parse_score(&args[1], ErrorReply::MinMaxNotFloat) {
        Ok(min) => min,
        Err(err) => return err.into(),
    };
    let max = match parse_score(&args[2], ErrorReply::MinMaxNotFloat) {
        Ok(max) => max,
        Err(err) => return err.into(),
    };
    let entity = match get_as_zset(db, &key_of(&args[0])) {
        Ok(Some(entity)) => entity,
        Ok(None) => return Reply::integer(0),
        Err(err) => return err.into(),
    };

    let removed = {
        let mut set = lock_set(&entity);
        let doomed = set.get_by_score_range(min, max, 0, -1, false);
        let mut removed = 0;
        for element in doomed {
            if set.remove(&element.member) {
                removed += 1;
            }
        }
        removed
    };
    if removed > 0 {
        db.add_aof(cmd_line_with_name("zremrangebyscore", args));
    }
    Reply::integer(removed)
}
