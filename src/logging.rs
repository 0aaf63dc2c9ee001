// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Meant for binaries and demos; the library itself only emits events.
pub fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?,
        )
        .try_init()
        .map_err(|err| anyhow::format_err!("Failed to install log subscriber: {}", err))
}
