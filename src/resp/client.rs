// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::Mutex,
};

use crate::resp::{
    parser::decode_frame,
    reply::{MultiBulkReply, Reply, ToBytes},
};

/// A client side of the protocol, used to talk to peer shards. One
/// request in flight at a time: `send` serializes the command, writes it
/// and reads back exactly one reply.
#[derive(Debug)]
pub struct Client {
    addr: String,
    reader: Mutex<BufReader<OwnedReadHalf>>,
    writer: Mutex<OwnedWriteHalf>,
}

impl Client {
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to peer {addr}"))?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            addr: addr.to_string(),
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(writer),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends one command frame and awaits its reply. Peer-side command
    /// failures come back as [`Reply::Error`], not as `Err`.
    pub async fn send(&self, cmd: &[Vec<u8>]) -> Result<Reply> {
        let frame = MultiBulkReply::new(cmd.to_vec()).to_bytes();
        {
            let mut writer = self.writer.lock().await;
            writer
                .write_all(&frame)
                .await
                .with_context(|| format!("write to peer {} failed", self.addr))?;
        }

        let mut reader = self.reader.lock().await;
        let reply = decode_frame(&mut *reader)
            .await
            .with_context(|| format!("read from peer {} failed", self.addr))?;
        Ok(reply)
    }
}
