// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
};

use once_cell::sync::OnceCell;

use crate::{
    database::AofRecorder,
    datastruct::{dict::Dict, sortedset::SortedSet},
    resp::reply::ErrorReply,
    utils::{CmdLine, now_millis},
};

/// The value stored under one key.
#[derive(Debug)]
pub enum DataKind {
    Bytes(Vec<u8>),
    ZSet(Mutex<SortedSet>),
}

/// A typed value plus its expiration deadline in wall-clock milliseconds
/// (`0` = no expiry). String values are immutable — string commands
/// replace the whole entity — while sorted sets mutate in place behind
/// the lock.
#[derive(Debug)]
pub struct DataEntity {
    data: DataKind,
    expire_at: AtomicI64,
}

impl DataEntity {
    pub fn bytes(value: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            data: DataKind::Bytes(value),
            expire_at: AtomicI64::new(0),
        })
    }

    pub fn zset(set: SortedSet) -> Arc<Self> {
        Arc::new(Self {
            data: DataKind::ZSet(Mutex::new(set)),
            expire_at: AtomicI64::new(0),
        })
    }

    pub fn expire_at(&self) -> i64 {
        self.expire_at.load(Ordering::SeqCst)
    }

    pub fn set_expire_at(&self, deadline_millis: i64) {
        self.expire_at.store(deadline_millis, Ordering::SeqCst);
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        let deadline = self.expire_at();
        deadline != 0 && deadline <= now_millis
    }

    pub fn as_bytes(&self) -> Result<&[u8], ErrorReply> {
        match &self.data {
            DataKind::Bytes(b) => Ok(b),
            DataKind::ZSet(_) => Err(ErrorReply::WrongType),
        }
    }

    pub fn as_zset(&self) -> Result<&Mutex<SortedSet>, ErrorReply> {
        match &self.data {
            DataKind::ZSet(set) => Ok(set),
            DataKind::Bytes(_) => Err(ErrorReply::WrongType),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match &self.data {
            DataKind::Bytes(_) => "string",
            DataKind::ZSet(_) => "zset",
        }
    }
}

/// One numbered database slot: a concurrent keyspace plus the hook that
/// echoes successful mutations into the append-only log. The hook is a
/// no-op until persistence is attached, which is also what disables
/// recording while the log itself is being replayed.
pub struct Db {
    index: usize,
    data: Dict<Arc<DataEntity>>,
    add_aof: OnceCell<AofRecorder>,
}

impl Db {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            data: Dict::new(),
            add_aof: OnceCell::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_aof_recorder(&self, recorder: AofRecorder) {
        let _ = self.add_aof.set(recorder);
    }

    pub(crate) fn add_aof(&self, line: CmdLine) {
        if let Some(recorder) = self.add_aof.get() {
            recorder(line);
        }
    }

    /// Fetches a live entity. An entity past its deadline is removed here
    /// and reported absent — expiration is checked lazily on access.
    pub fn get_entity(&self, key: &str) -> Option<Arc<DataEntity>> {
        let entity = self.data.get(key)?;
        if entity.is_expired(now_millis()) {
            self.data.remove(key);
            return None;
        }
        Some(entity)
    }

    /// Raw presence test. Deliberately does not consult the expiration
    /// deadline; `EXISTS` is specified to see not-yet-collected keys.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn put_entity(&self, key: String, entity: Arc<DataEntity>) -> i64 {
        self.data.put(key, entity)
    }

    pub fn put_if_absent(&self, key: String, entity: Arc<DataEntity>) -> i64 {
        self.data.put_if_absent(key, entity)
    }

    pub fn put_if_exists(&self, key: String, entity: Arc<DataEntity>) -> i64 {
        self.data.put_if_exists(key, entity)
    }

    pub fn remove(&self, key: &str) -> i64 {
        self.data.remove(key)
    }

    /// Removes each present key, returning how many were deleted.
    pub fn removes(&self, keys: impl IntoIterator<Item = String>) -> i64 {
        let mut deleted = 0;
        for key in keys {
            deleted += self.data.remove(&key);
        }
        deleted
    }

    pub fn flush(&self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn for_each(&self, f: impl FnMut(&str, &Arc<DataEntity>) -> bool) {
        self.data.for_each(f);
    }

    /// Fetches a live entity as a byte string.
    /// `Ok(None)` means absent, `Err` means the key holds another type.
    pub fn get_as_string(&self, key: &str) -> Result<Option<Vec<u8>>, ErrorReply> {
        match self.get_entity(key) {
            None => Ok(None),
            Some(entity) => entity.as_bytes().map(|b| Some(b.to_vec())),
        }
    }
}
