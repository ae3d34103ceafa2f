// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bytes::Bytes;
use enum_dispatch::enum_dispatch;
use thiserror::Error;

use crate::utils::CmdLine;

const CRLF: &[u8] = b"\r\n";

/// Serialization of one protocol frame into the bytes that go on the wire.
///
/// Every reply type is a pure value: encoding never fails and never
/// depends on connection state.
#[enum_dispatch]
pub trait ToBytes {
    fn to_bytes(&self) -> Bytes;
}

/// A single-line `+status` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReply {
    pub status: String,
}

impl StatusReply {
    pub fn new(status: impl Into<String>) -> Self {
        Self { status: status.into() }
    }
}

impl ToBytes for StatusReply {
    fn to_bytes(&self) -> Bytes {
        Bytes::from(format!("+{}\r\n", self.status))
    }
}

/// A `:n` integer frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntReply {
    pub code: i64,
}

impl IntReply {
    pub fn new(code: i64) -> Self {
        Self { code }
    }
}

impl ToBytes for IntReply {
    fn to_bytes(&self) -> Bytes {
        Bytes::from(format!(":{}\r\n", self.code))
    }
}

/// A `$len` bulk-string frame. The distinguished null bulk has its own
/// type ([`NullBulkReply`]) so an empty buffer here really means empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReply {
    pub arg: Vec<u8>,
}

impl BulkReply {
    pub fn new(arg: impl Into<Vec<u8>>) -> Self {
        Self { arg: arg.into() }
    }
}

impl ToBytes for BulkReply {
    fn to_bytes(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.arg.len() + 16);
        out.extend_from_slice(format!("${}\r\n", self.arg.len()).as_bytes());
        out.extend_from_slice(&self.arg);
        out.extend_from_slice(CRLF);
        Bytes::from(out)
    }
}

/// The `$-1` null bulk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NullBulkReply;

impl ToBytes for NullBulkReply {
    fn to_bytes(&self) -> Bytes {
        Bytes::from_static(b"$-1\r\n")
    }
}

/// A `*count` frame. Elements are nullable because replies such as MGET
/// encode absent keys as `$-1` entries; frames arriving from the parser
/// always carry concrete elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiBulkReply {
    pub args: Vec<Option<Vec<u8>>>,
}

impl MultiBulkReply {
    pub fn new(args: Vec<Vec<u8>>) -> Self {
        Self { args: args.into_iter().map(Some).collect() }
    }

    pub fn nullable(args: Vec<Option<Vec<u8>>>) -> Self {
        Self { args }
    }

    /// The frame as a command line, with null elements flattened to empty
    /// arguments the way the parser already normalizes them.
    pub fn cmd_line(&self) -> CmdLine {
        self.args
            .iter()
            .map(|arg| arg.clone().unwrap_or_default())
            .collect()
    }
}

impl ToBytes for MultiBulkReply {
    fn to_bytes(&self) -> Bytes {
        let payload: usize =
            self.args.iter().map(|a| a.as_ref().map_or(5, |b| b.len() + 16)).sum();
        let mut out = Vec::with_capacity(payload + 16);
        out.extend_from_slice(format!("*{}\r\n", self.args.len()).as_bytes());
        for arg in &self.args {
            match arg {
                None => out.extend_from_slice(b"$-1\r\n"),
                Some(arg) => {
                    out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
                    out.extend_from_slice(arg);
                    out.extend_from_slice(CRLF);
                },
            }
        }
        Bytes::from(out)
    }
}

/// The `*0` empty multi-bulk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmptyMultiBulkReply;

impl ToBytes for EmptyMultiBulkReply {
    fn to_bytes(&self) -> Bytes {
        Bytes::from_static(b"*0\r\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OkReply;

impl ToBytes for OkReply {
    fn to_bytes(&self) -> Bytes {
        Bytes::from_static(b"+OK\r\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PongReply;

impl ToBytes for PongReply {
    fn to_bytes(&self) -> Bytes {
        Bytes::from_static(b"+PONG\r\n")
    }
}

/// Error frames (`-message`). The variants cover the command-level error
/// taxonomy; [`ErrorReply::Generic`] carries pass-through messages such as
/// relay failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorReply {
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
    #[error("ERR wrong number of arguments for '{0}' command")]
    ArgNum(String),
    #[error("ERR syntax error")]
    Syntax,
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    #[error("ERR value is not a valid float")]
    NotAFloat,
    #[error("ERR min or max is not a float")]
    MinMaxNotFloat,
    #[error("no such key")]
    NoSuchKey,
    #[error("ERR DB index is out of range")]
    DbIndexOutOfRange,
    #[error("ERR rename must within one slot in cluster mode")]
    CrossSlotRename,
    #[error("{0}")]
    Generic(String),
}

impl ToBytes for ErrorReply {
    fn to_bytes(&self) -> Bytes {
        Bytes::from(format!("-{self}\r\n"))
    }
}

/// Any frame the server can emit or the parser can produce.
#[enum_dispatch(ToBytes)]
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Status(StatusReply),
    Error(ErrorReply),
    Integer(IntReply),
    Bulk(BulkReply),
    NullBulk(NullBulkReply),
    MultiBulk(MultiBulkReply),
    EmptyMultiBulk(EmptyMultiBulkReply),
    Ok(OkReply),
    Pong(PongReply),
}

impl Reply {
    pub fn ok() -> Self {
        OkReply.into()
    }

    pub fn pong() -> Self {
        PongReply.into()
    }

    pub fn status(status: impl Into<String>) -> Self {
        StatusReply::new(status).into()
    }

    pub fn integer(code: i64) -> Self {
        IntReply::new(code).into()
    }

    pub fn bulk(arg: impl Into<Vec<u8>>) -> Self {
        BulkReply::new(arg).into()
    }

    pub fn null_bulk() -> Self {
        NullBulkReply.into()
    }

    pub fn multi_bulk(args: Vec<Vec<u8>>) -> Self {
        MultiBulkReply::new(args).into()
    }

    pub fn empty_multi_bulk() -> Self {
        EmptyMultiBulkReply.into()
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}
