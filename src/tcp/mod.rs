// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod handler;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{
    net::TcpListener,
    signal::unix::{SignalKind, signal},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

use crate::tcp::handler::RespHandler;

/// Binds the listen address and serves until a termination signal
/// arrives. Fatal only when the bind itself fails.
pub async fn listen_and_serve_with_signal(
    address: &str,
    handler: Arc<RespHandler>,
) -> Result<()> {
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            shutdown.cancel();
        });
    }

    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("bind: {address}, start listening...");
    listen_and_serve(listener, handler, shutdown).await;
    Ok(())
}

/// Accept loop. Each connection runs as its own task under the tracker;
/// on shutdown the listener stops first, then the handler closes every
/// connection, then all in-flight tasks are joined.
pub async fn listen_and_serve(
    listener: TcpListener,
    handler: Arc<RespHandler>,
    shutdown: CancellationToken,
) {
    let tracker = TaskTracker::new();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutting down...");
                break;
            },
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!(%addr, "accept link");
                    let handler = Arc::clone(&handler);
                    tracker.spawn(async move {
                        handler.handle(stream).await;
                    });
                },
                Err(err) => {
                    warn!("accept failed: {err}");
                    break;
                },
            },
        }
    }

    drop(listener);
    handler.close().await;
    tracker.close();
    tracker.wait().await;
}

async fn wait_for_shutdown_signal() {
    async fn sig(kind: SignalKind) {
        match signal(kind) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(err) => {
                warn!("cannot install signal handler: {err}");
                std::future::pending::<()>().await;
            },
        }
    }

    tokio::select! {
        _ = sig(SignalKind::interrupt()) => {},
        _ = sig(SignalKind::terminate()) => {},
        _ = sig(SignalKind::hangup()) => {},
        _ = sig(SignalKind::quit()) => {},
    }
    info!("termination signal received");
}
