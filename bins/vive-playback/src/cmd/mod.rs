pub mod play;
pub mod prompt;
pub mod record;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Отменить token по Ctrl+C.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutting down...");
                token.cancel();
            }
            Err(e) => tracing::error!(error = %e, "cannot listen for ctrl-c"),
        }
    })
}

/// Дождаться фоновой задачи. Паника или отмена задачи не роняет команду,
/// но попадает в лог; `false` — задача завершилась не сама.
pub async fn join_logged(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) if e.is_panic() => {
            tracing::error!(task = name, error = %e, "background task panicked");
            false
        }
        Err(e) => {
            tracing::warn!(task = name, error = %e, "background task did not finish");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_reports_clean_exit() {
        let handle = tokio::spawn(async {});
        assert!(join_logged("noop", handle).await);
    }

    #[tokio::test]
    async fn join_reports_panicked_task() {
        let handle = tokio::spawn(async { panic!("feed blew up") });
        assert!(!join_logged("feed", handle).await);
    }

    #[tokio::test]
    async fn join_reports_aborted_task() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        assert!(!join_logged("watcher", handle).await);
    }
}
