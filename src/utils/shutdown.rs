use std::future::Future;
use tokio::sync::watch;

// ============================================================================
// Shutdown - process-wide cancellation signal
// ============================================================================
//
// One `Shutdown` is owned by main. Long-running tasks hold a receiver from
// `subscribe()` and race their blocking work against `wait_for_shutdown`.
// Once triggered the signal stays set, so late subscribers see it too.
//
// ============================================================================

pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once shutdown is signalled. A dropped `Shutdown` counts as
/// signalled.
pub async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Drive `server` until it exits on its own or `signal` fires, whichever
/// comes first. Shutdown is triggered in both cases; after a signal the
/// server is awaited until it has stopped.
pub async fn serve_until_signal<F, S>(server: F, signal: S, shutdown: &Shutdown) -> F::Output
where
    F: Future,
    S: Future<Output = ()>,
{
    tokio::pin!(server);

    let finished = tokio::select! {
        output = &mut server => {
            tracing::warn!("Server exited before a shutdown signal");
            Some(output)
        }
        () = signal => None,
    };
    shutdown.trigger();

    match finished {
        Some(output) => output,
        None => server.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_after_trigger() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();

        let waiter = tokio::spawn(async move { wait_for_shutdown(&mut rx).await });
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(*shutdown.subscribe().borrow());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_signal() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let mut rx = shutdown.subscribe();
        tokio::time::timeout(Duration::from_millis(100), wait_for_shutdown(&mut rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_server_exit_does_not_wait_for_signal() {
        let shutdown = Shutdown::new();
        let server = async { Err::<(), &str>("address in use") };

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            serve_until_signal(server, std::future::pending(), &shutdown),
        )
        .await
        .unwrap();

        assert_eq!(result, Err("address in use"));
        assert!(*shutdown.subscribe().borrow());
    }

    #[tokio::test]
    async fn test_signal_stops_server_gracefully() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        let server = async move {
            wait_for_shutdown(&mut rx).await;
            Ok::<(), &str>(())
        };

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            serve_until_signal(server, async {}, &shutdown),
        )
        .await
        .unwrap();

        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_pending_until_triggered() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();

        let result = tokio::time::timeout(Duration::from_millis(50), wait_for_shutdown(&mut rx)).await;
        assert!(result.is_err());
    }
}
