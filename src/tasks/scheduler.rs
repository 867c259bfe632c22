use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::core::state::AppState;
use crate::tasks::expiry;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handles = Vec::with_capacity(1);
    handles.push(tokio::spawn(close_overdue_loop(state.clone(), shutdown_rx.clone())));

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn close_overdue_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let sweep = state.settings().engine().expiry_sweep_interval_seconds;
    let mut tick = interval(Duration::from_secs(sweep));
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = expiry::close_overdue_attempts(&state).await {
                    tracing::error!(error = %err, "close_overdue_attempts failed");
                }
            }
        }
    }
}
