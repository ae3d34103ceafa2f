// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    sync::atomic::{AtomicI64, Ordering},
    time::Duration,
};

use tokio::time::{sleep, timeout};

/// A command line as it travels between parser, dispatcher and AOF:
/// argv[0] is the command name, the rest are its arguments.
pub type CmdLine = Vec<Vec<u8>>;

/// Builds a [`CmdLine`] from string literals.
pub fn to_cmd_line(parts: &[&str]) -> CmdLine {
    parts.iter().map(|p| p.as_bytes().to_vec()).collect()
}

/// Builds a [`CmdLine`] from a command name plus already-split argument
/// buffers, the shape every mutating executor uses when recording itself
/// into the append-only log.
pub fn cmd_line_with_name(name: &str, args: &[Vec<u8>]) -> CmdLine {
    let mut line = Vec::with_capacity(args.len() + 1);
    line.push(name.as_bytes().to_vec());
    line.extend(args.iter().cloned());
    line
}

/// Current wall-clock time in milliseconds, the unit expiration deadlines
/// are stored in.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Formats a sorted-set score the way the wire protocol expects it:
/// shortest decimal form, no exponent for the score magnitudes the server
/// accepts.
pub fn format_score(score: f64) -> String {
    if score == score.trunc() && score.abs() < 1e17 {
        format!("{}", score as i64)
    } else {
        format!("{score}")
    }
}

/// Counter-style wait gate: tasks register in-flight work with
/// [`Wait::add`]/[`Wait::done`], and a closer can block until the counter
/// drains, optionally bounded by a timeout.
#[derive(Debug, Default)]
pub struct Wait {
    count: AtomicI64,
}

impl Wait {
    pub fn add(&self, delta: i64) {
        self.count.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn done(&self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn is_idle(&self) -> bool {
        self.count.load(Ordering::SeqCst) <= 0
    }

    /// Blocks until the counter reaches zero.
    pub async fn wait(&self) {
        while !self.is_idle() {
            sleep(Duration::from_millis(50)).await;
        }
    }

    /// Blocks until the counter reaches zero or the timeout fires.
    /// Returns `true` iff it timed out.
    pub async fn wait_with_timeout(&self, limit: Duration) -> bool {
        timeout(limit, self.wait()).await.is_err()
    }
}
