// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use resp_server_rs::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    tcp::{self, handler::RespHandler},
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => resolve_config_path(&path)
            .and_then(Config::load_from_file)
            .context("failed to resolve or load config")?,
        None => Config::default(),
    };

    let _logger_guard = init_logger(&cfg.logger)?;
    info!(
        databases = cfg.databases,
        append_only = cfg.append_only,
        cluster = cfg.cluster_enabled(),
        effective = %serde_json::to_string(&cfg).unwrap_or_default(),
        "starting server"
    );

    let handler = RespHandler::bootstrap(&cfg).await?;
    tcp::listen_and_serve_with_signal(&cfg.address(), handler).await
}
