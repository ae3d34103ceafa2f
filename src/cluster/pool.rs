// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    ops::Deref,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::resp::client::Client;

/// Default cap on open connections per peer.
pub const DEFAULT_POOL_SIZE: usize = 16;

/// A per-peer pool of connected protocol clients. Capacity is enforced by
/// a semaphore, so a drained pool blocks borrowers instead of opening
/// unbounded connections; idle clients are reused, and a miss dials a
/// fresh connection on demand.
#[derive(Debug)]
pub struct Pool {
    addr: String,
    idle: Arc<Mutex<Vec<Client>>>,
    permits: Arc<Semaphore>,
}

impl Pool {
    pub fn new(addr: String, max_size: usize) -> Self {
        Self {
            addr,
            idle: Arc::new(Mutex::new(Vec::new())),
            permits: Arc::new(Semaphore::new(max_size.max(1))),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Borrows a connected client, waiting for capacity when every
    /// connection is in use. The client returns to the pool when the
    /// guard drops, whatever the exit path.
    pub async fn borrow(&self) -> Result<PooledClient> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .context("peer pool closed")?;

        let reused = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        let client = match reused {
            Some(client) => client,
            // a connect failure drops the permit, releasing capacity
            None => Client::connect(&self.addr).await?,
        };
        Ok(PooledClient {
            client: Some(client),
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }
}

/// RAII guard over a borrowed [`Client`].
#[derive(Debug)]
pub struct PooledClient {
    client: Option<Client>,
    idle: Arc<Mutex<Vec<Client>>>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledClient {
    type Target = Client;

    fn deref(&self) -> &Client {
        match &self.client {
            Some(client) => client,
            None => unreachable!("client is only taken on drop"),
        }
    }
}

impl Drop for PooledClient {
    fn drop(&mut self) {
        if let (Some(client), Ok(mut idle)) = (self.client.take(), self.idle.lock()) {
            idle.push(client);
        }
    }
}
