// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{Arc, RwLock as StdRwLock};

use anyhow::{Context, Result};
use tokio::{
    fs::File,
    io::AsyncWriteExt,
    sync::{Mutex, RwLock, RwLockWriteGuard, mpsc, oneshot},
};
use tracing::{error, info, warn};

use crate::{
    database::Engine,
    resp::{
        connection::RespConn,
        parser::parse_stream,
        reply::{MultiBulkReply, Reply, ToBytes},
    },
    utils::{CmdLine, to_cmd_line},
};

/// Queue depth between the command path and the single writer.
pub const AOF_QUEUE_SIZE: usize = 1 << 16;

#[derive(Debug)]
struct AofPayload {
    cmd_line: CmdLine,
    db_index: usize,
}

/// Append-only persistence: executors enqueue each observable mutation,
/// one writer task owns the log file and serializes the stream, and a
/// read-write lease lets an external operation pause the writer for a
/// quiescent log.
///
/// Construction replays the existing log into the engine first (with
/// recording still unwired, so nothing is double-logged), then opens the
/// file for append and starts the writer.
pub struct AofHandler {
    tx: StdRwLock<Option<mpsc::Sender<AofPayload>>>,
    finished: Mutex<Option<oneshot::Receiver<()>>>,
    pausing: Arc<RwLock<()>>,
}

impl AofHandler {
    pub async fn new(engine: &Arc<Engine>, filename: &str) -> Result<Arc<Self>> {
        load_aof(engine, filename).await;

        let file = open_log(filename)
            .with_context(|| format!("failed to open aof file {filename}"))?;

        let (tx, rx) = mpsc::channel(AOF_QUEUE_SIZE);
        let (done_tx, done_rx) = oneshot::channel();
        let pausing = Arc::new(RwLock::new(()));
        tokio::spawn(write_loop(file, rx, Arc::clone(&pausing), done_tx));

        let handler = Arc::new(Self {
            tx: StdRwLock::new(Some(tx)),
            finished: Mutex::new(Some(done_rx)),
            pausing,
        });
        engine.attach_aof(Arc::clone(&handler));
        info!(filename, "aof persistence enabled");
        Ok(handler)
    }

    /// Enqueues one mutation. Blocks the calling worker when the queue is
    /// full — records are never dropped while the writer is alive.
    pub fn append(&self, db_index: usize, cmd_line: CmdLine) {
        let sender = match self.tx.read() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        let Some(sender) = sender else { return };

        let payload = AofPayload { cmd_line, db_index };
        match sender.try_send(payload) {
            Ok(()) => {},
            Err(mpsc::error::TrySendError::Full(payload)) => {
                let _ = tokio::task::block_in_place(|| sender.blocking_send(payload));
            },
            Err(mpsc::error::TrySendError::Closed(_)) => {},
        }
    }

    /// Excludes the writer until the guard is dropped. In-flight command
    /// executions keep enqueueing; nothing reaches the file meanwhile.
    pub async fn pause(&self) -> RwLockWriteGuard<'_, ()> {
        self.pausing.write().await
    }

    /// Closes the queue, waits for the writer to drain and release the
    /// file. Subsequent calls are no-ops.
    pub async fn close(&self) {
        let taken = match self.tx.write() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        drop(taken);
        let receiver = self.finished.lock().await.take();
        if let Some(receiver) = receiver {
            let _ = receiver.await;
        }
    }
}

fn open_log(filename: &str) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    let file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .read(true)
        .mode(0o600)
        .open(filename)?;
    Ok(File::from_std(file))
}

async fn write_loop(
    mut file: File,
    mut rx: mpsc::Receiver<AofPayload>,
    pausing: Arc<RwLock<()>>,
    done: oneshot::Sender<()>,
) {
    let mut current_db = 0usize;
    while let Some(payload) = rx.recv().await {
        let _lease = pausing.read().await;
        if payload.db_index != current_db {
            let select = MultiBulkReply::new(to_cmd_line(&[
                "SELECT",
                &payload.db_index.to_string(),
            ]))
            .to_bytes();
            if let Err(err) = file.write_all(&select).await {
                warn!("aof select write failed: {err}");
                continue; // skip the command, stay on the old db
            }
            current_db = payload.db_index;
        }
        let frame = MultiBulkReply::new(payload.cmd_line).to_bytes();
        if let Err(err) = file.write_all(&frame).await {
            warn!("aof write failed: {err}");
        }
    }
    let _ = file.flush().await;
    let _ = done.send(());
    // the file handle drops here, after the finished signal
}

/// Replays the log through the protocol parser against a fake connection.
/// A missing file is a fresh start; a malformed tail is logged and the
/// rest of the file is still applied.
pub async fn load_aof(engine: &Arc<Engine>, filename: &str) {
    let file = match File::open(filename).await {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return,
        Err(err) => {
            warn!("cannot open aof file {filename}: {err}");
            return;
        },
    };

    let fake = RespConn::fake();
    let mut payloads = parse_stream(file);
    while let Some(payload) = payloads.recv().await {
        match payload {
            Err(err) if err.is_eof() => break,
            Err(err) => {
                error!("aof parse error: {err}");
                continue;
            },
            Ok(Reply::MultiBulk(frame)) => {
                let ret = engine.exec(&fake, &frame.cmd_line());
                if ret.is_error() {
                    error!("aof replay rejected a command: {ret:?}");
                }
            },
            Ok(other) => {
                error!("aof replay requires multi bulk frames, got {other:?}");
            },
        }
    }
}
