use time::PrimitiveDateTime;

use crate::db::models::Attempt;
use crate::repositories;
use crate::services::attempt_timing;

#[derive(Debug, Clone, Copy)]
pub(crate) enum CloseMode {
    ManualFinish,
    DeadlineExceeded,
}

/// Single close path shared by the finish handler, the expiry check on
/// mutating calls, and the background sweeper. A close past the deadline pins
/// `finished_at` to `started_at + duration`, so a late finish never records
/// bonus time; the update is a no-op on an already-completed attempt.
pub(crate) async fn close_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: &Attempt,
    duration_seconds: i32,
    mode: CloseMode,
    now: PrimitiveDateTime,
) -> Result<PrimitiveDateTime, sqlx::Error> {
    let boundary = attempt_timing::deadline(attempt.started_at, duration_seconds);
    let finished_at = match mode {
        CloseMode::DeadlineExceeded => boundary,
        CloseMode::ManualFinish => {
            if now >= boundary {
                boundary
            } else {
                now
            }
        }
    };

    repositories::attempts::complete(executor, &attempt.id, finished_at, now).await?;

    metrics::counter!("attempts_closed_total").increment(1);

    Ok(finished_at)
}
