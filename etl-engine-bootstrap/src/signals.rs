// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Listens for `SIGTERM`, `SIGINT` and `SIGHUP` and drives the
//! [`ShutdownCoordinator`](crate::shutdown::ShutdownCoordinator) that backs
//! the Extract stage's cancel signal (spec §5, §8 scenario 6).

use crate::shutdown::ShutdownCoordinator;
use tokio::signal::unix::{signal, SignalKind};

/// Spawn a task that initiates shutdown on the first `SIGTERM`, `SIGINT` or
/// `SIGHUP`, and again (forcefully, via `tracing::warn!`) on a second signal
/// received while already shutting down.
pub fn install_signal_handlers(coordinator: ShutdownCoordinator) {
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGINT handler");
                return;
            }
        };
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGHUP handler");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                _ = sigint.recv() => tracing::info!("received SIGINT"),
                _ = sighup.recv() => tracing::info!("received SIGHUP"),
            }

            if coordinator.is_shutting_down() {
                tracing::warn!("second shutdown signal received, shutdown already in progress");
                continue;
            }
            coordinator.initiate_shutdown();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn install_signal_handlers_does_not_panic() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(50));
        install_signal_handlers(coordinator.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!coordinator.is_shutting_down());
    }
}
