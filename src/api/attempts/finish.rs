use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::db::types::AttemptState;
use crate::repositories;
use crate::schemas::attempt::{
    format_primitive, FinishAttemptResponse, RemainingTimeResponse,
};
use crate::services::{attempt_finalize, attempt_timing, grading};

use super::helpers;

/// Finalizes an attempt. Idempotent: finishing an already-completed attempt
/// returns the existing terminal snapshot. A finish arriving after the
/// deadline pins `finished_at` to `started_at + duration`.
pub(in crate::api::attempts) async fn finish_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<FinishAttemptResponse>, ApiError> {
    let attempt = helpers::fetch_attempt(state.db(), &attempt_id).await?;
    helpers::require_attempt_owner(&attempt, &user)?;

    let test = helpers::fetch_test(state.db(), &attempt.test_id).await?;
    let now = state.clock().now();

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    repositories::attempts::acquire_attempt_lock(&mut *tx, &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire attempt lock"))?;

    let attempt = repositories::attempts::fetch_one_by_id(&mut *tx, &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    if attempt.state == AttemptState::InProgress {
        attempt_finalize::close_attempt(
            &mut *tx,
            &attempt,
            test.duration_seconds,
            attempt_finalize::CloseMode::ManualFinish,
            now,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to finish attempt"))?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    let attempt = repositories::attempts::fetch_one_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    let (answered, correct) = repositories::answers::counts_by_attempt(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count answers"))?;

    let finished_at = attempt
        .finished_at
        .unwrap_or_else(|| attempt_timing::deadline(attempt.started_at, test.duration_seconds));

    let total_questions = i64::from(test.question_count);
    let effective_score =
        grading::effective_score(attempt.accumulated_score, attempt.overridden_score);
    let effective_passed = grading::effective_passed(
        effective_score,
        test.total_score,
        test.pass_percent,
        attempt.pass_override,
    );

    tracing::info!(
        attempt_id = %attempt.id,
        total_score = attempt.accumulated_score,
        answered,
        correct,
        "Attempt finished"
    );

    Ok(Json(FinishAttemptResponse {
        attempt_id: attempt.id,
        finished_at: format_primitive(finished_at),
        total_score: attempt.accumulated_score,
        total_questions,
        answered,
        correct,
        incorrect: answered - correct,
        unanswered: total_questions - answered,
        effective_score,
        effective_passed,
    }))
}

/// Remaining seconds, recomputed from the stored start on every call. On
/// observing zero for an in-progress attempt the terminal transition runs
/// right here, with the deterministic finish time.
pub(in crate::api::attempts) async fn remaining_time(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<RemainingTimeResponse>, ApiError> {
    let attempt = helpers::fetch_attempt(state.db(), &attempt_id).await?;
    helpers::require_attempt_owner(&attempt, &user)?;

    let test = helpers::fetch_test(state.db(), &attempt.test_id).await?;
    let now = state.clock().now();

    let remaining_seconds =
        attempt_timing::remaining_seconds(now, attempt.started_at, test.duration_seconds);

    if remaining_seconds == 0 && attempt.state == AttemptState::InProgress {
        let mut tx = state
            .db()
            .begin()
            .await
            .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

        repositories::attempts::acquire_attempt_lock(&mut *tx, &attempt_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to acquire attempt lock"))?;

        let attempt = repositories::attempts::fetch_one_by_id(&mut *tx, &attempt_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

        if attempt.state == AttemptState::InProgress {
            attempt_finalize::close_attempt(
                &mut *tx,
                &attempt,
                test.duration_seconds,
                attempt_finalize::CloseMode::DeadlineExceeded,
                now,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to close expired attempt"))?;
            metrics::counter!("attempts_expired_total").increment(1);
        }

        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
    }

    Ok(Json(RemainingTimeResponse { attempt_id, remaining_seconds }))
}
