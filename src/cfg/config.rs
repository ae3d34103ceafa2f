// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::logger::LoggerConfig;

/// Server configuration, loaded from YAML. Every field has a default so
/// an empty file (or none at all) yields a working standalone server.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Listen address.
    #[serde(default = "defaults::bind")]
    pub bind: String,

    /// Listen port.
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Number of numbered databases.
    #[serde(default = "defaults::databases")]
    pub databases: usize,

    /// Whether every mutation is appended to the command log.
    #[serde(default, rename = "appendOnly")]
    pub append_only: bool,

    /// Path of the append-only log.
    #[serde(default = "defaults::append_filename", rename = "appendFilename")]
    pub append_filename: String,

    /// Peer shards (`host:port`). Non-empty switches on cluster routing.
    #[serde(default)]
    pub peers: Vec<String>,

    /// This node's own identifier on the ring.
    #[serde(default, rename = "self")]
    pub self_addr: String,

    /// Cap on pooled connections per peer.
    #[serde(default = "defaults::max_peer_connections", rename = "maxPeerConnections")]
    pub max_peer_connections: usize,

    /// Logging setup; absent means info-level to stdout.
    #[serde(default)]
    pub logger: LoggerConfig,
}

mod defaults {
    pub fn bind() -> String {
        "0.0.0.0".to_string()
    }

    pub fn port() -> u16 {
        6379
    }

    pub fn databases() -> usize {
        16
    }

    pub fn append_filename() -> String {
        "appendonly.aof".to_string()
    }

    pub fn max_peer_connections() -> usize {
        crate::cluster::pool::DEFAULT_POOL_SIZE
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
            port: defaults::port(),
            databases: defaults::databases(),
            append_only: false,
            append_filename: defaults::append_filename(),
            peers: Vec::new(),
            self_addr: String::new(),
            max_peer_connections: defaults::max_peer_connections(),
            logger: LoggerConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path).with_context(|| {
            format!("failed to read config file {:?}", path.as_ref())
        })?;
        let mut cfg: Config =
            serde_yaml::from_str(&raw).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(self.databases >= 1, "databases must be >= 1");
        ensure!(self.port != 0, "port must not be 0");
        ensure!(!self.bind.is_empty(), "bind must not be empty");

        if self.cluster_enabled() {
            if self.self_addr.is_empty() {
                self.self_addr = self.address();
            }
            for peer in &self.peers {
                ensure!(
                    peer.contains(':'),
                    "peer {peer:?} must be in host:port form"
                );
            }
        }
        if self.append_only {
            ensure!(
                !self.append_filename.is_empty(),
                "appendFilename must not be empty when appendOnly is set"
            );
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn cluster_enabled(&self) -> bool {
        !self.peers.is_empty()
    }
}
