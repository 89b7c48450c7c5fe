/*!
 * External Shutdown Sources
 * Ctrl-C, SIGTERM and the wall-clock limit
 */

use super::shutdown::ShutdownSignal;
use super::types::ShutdownReason;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Watch for Ctrl-C, SIGTERM and the wall-clock limit. Each source only
/// flips the shutdown flag. The returned task ends after the first source
/// fires or once shutdown is triggered by someone else.
pub fn install_handlers(signal: ShutdownSignal, wall_limit: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reason = tokio::select! {
            _ = interrupt() => Some(ShutdownReason::Interrupted),
            _ = terminate() => Some(ShutdownReason::Terminated),
            _ = tokio::time::sleep(wall_limit) => Some(ShutdownReason::WallTimeout),
            _ = signal.wait() => None,
        };

        if let Some(reason) = reason {
            info!(reason = %reason, "External shutdown requested");
            signal.trigger(reason);
        }
    })
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Unable to listen for Ctrl-C");
        std::future::pending::<()>().await
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Unable to listen for SIGTERM");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wall_limit_triggers_timeout() {
        let signal = ShutdownSignal::new();
        let handle = install_handlers(signal.clone(), Duration::from_millis(20));

        let reason = tokio::time::timeout(Duration::from_secs(2), signal.wait())
            .await
            .unwrap();
        assert_eq!(reason, ShutdownReason::WallTimeout);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_handler_exits_on_internal_shutdown() {
        let signal = ShutdownSignal::new();
        let handle = install_handlers(signal.clone(), Duration::from_secs(60));

        signal.trigger(ShutdownReason::SimEndReached);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal.reason(), Some(ShutdownReason::SimEndReached));
    }
}
