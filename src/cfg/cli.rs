// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Resolves the config path given on the command line against the current
/// working directory and canonicalizes it, so later error messages name
/// the real file.
pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let path = PathBuf::from(rel);
    let abs = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(path)
    };
    abs.canonicalize()
        .with_context(|| format!("failed to canonicalize path {abs:?}"))
}
