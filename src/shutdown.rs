use std::future::Future;
use tracing::{error, info};

/// Ждет сигнал. Если обработчик поставить не удалось, ошибка логируется
/// и будущее никогда не завершается: остановку тогда дает другой сигнал.
async fn watch<F>(name: &str, signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for {}: {}", name, e);
        std::future::pending::<()>().await;
    }
}

/// Ctrl-C или SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = watch("Ctrl-C", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = watch("SIGTERM", async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        signal.recv().await;
        Ok(())
    });

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn failed_handler_never_resolves() {
        let failed = watch("SIGTERM", async { Err(std::io::Error::other("no signals here")) });
        let waited = tokio::time::timeout(Duration::from_millis(50), failed).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn delivered_signal_resolves() {
        let delivered = watch("SIGTERM", async { Ok(()) });
        tokio::time::timeout(Duration::from_millis(50), delivered)
            .await
            .unwrap();
    }
}
