// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashMap;

use crc::{CRC_32_ISO_HDLC, Crc};

/// CRC-32/IEEE, the default placement hash.
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Consistent-hash ring: node names hashed onto a sorted circle, keys
/// routed to the first node hash at or after their own, wrapping at the
/// end. Adding a node therefore remaps only the arc it lands on.
#[derive(Debug, Default)]
pub struct NodeRing {
    hashes: Vec<u32>,
    nodes: HashMap<u32, String>,
}

impl NodeRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn add_nodes<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            let name = name.as_ref();
            if name.is_empty() {
                continue;
            }
            let hash = CRC32.checksum(name.as_bytes());
            self.hashes.push(hash);
            self.nodes.insert(hash, name.to_string());
        }
        self.hashes.sort_unstable();
        self.hashes.dedup();
    }

    /// The node responsible for `key`; the empty string on an empty ring.
    pub fn pick_node(&self, key: &str) -> String {
        if self.is_empty() {
            return String::new();
        }
        let hash = CRC32.checksum(key.as_bytes());
        let mut idx = self.hashes.partition_point(|&h| h < hash);
        if idx == self.hashes.len() {
            idx = 0;
        }
        self.nodes.get(&self.hashes[idx]).cloned().unwrap_or_default()
    }
}
