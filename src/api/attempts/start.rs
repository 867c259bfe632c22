use axum::{
    extract::{Path, State},
    Json,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

use crate::api::errors::{ApiError, EngineError};
use crate::api::guards::{require_audience, CurrentUser};
use crate::core::state::AppState;
use crate::db::models::{Attempt, TestDefinition};
use crate::db::types::{AttemptState, UserRole};
use crate::repositories;
use crate::schemas::attempt::{AttemptResponse, StartAttemptResponse};
use crate::services::{attempt_finalize, attempt_timing, ordering};

use super::helpers;

pub(in crate::api::attempts) async fn start_attempt(
    Path(test_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<StartAttemptResponse>, ApiError> {
    if user.role != UserRole::Student {
        return Err(ApiError::Forbidden("Only students can start attempts"));
    }

    let test = helpers::fetch_test(state.db(), &test_id).await?;
    if !test.active {
        return Err(ApiError::BadRequest("Test is not active".to_string()));
    }
    require_audience(&user, &test.group_ids.0)?;

    // An authoring-time defect surfaced at attempt creation: refuse to start
    // against a pool that does not match the declared question count.
    if test.question_ids.0.len() != test.question_count as usize {
        return Err(EngineError::InsufficientQuestionPool {
            declared: test.question_count,
            actual: test.question_ids.0.len(),
        }
        .into());
    }

    let now = state.clock().now();

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    repositories::attempts::acquire_start_lock(&mut *tx, &test.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire start lock"))?;

    if let Some(open) = repositories::attempts::find_open(&mut *tx, &test.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
    {
        // Idempotent re-entry: a reload returns the stored order and the
        // original timer. An attempt found past its deadline is closed with
        // the deterministic finish and returned as its terminal snapshot.
        if attempt_timing::is_expired(now, open.started_at, test.duration_seconds) {
            attempt_finalize::close_attempt(
                &mut *tx,
                &open,
                test.duration_seconds,
                attempt_finalize::CloseMode::DeadlineExceeded,
                now,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to close overdue attempt"))?;
            tx.commit()
                .await
                .map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

            let closed = repositories::attempts::fetch_one_by_id(state.db(), &open.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;
            return Ok(Json(start_response(closed, &test, now)));
        }

        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
        tracing::info!(attempt_id = %open.id, student_id = %user.id, "Attempt re-entered");
        return Ok(Json(start_response(open, &test, now)));
    }

    let latest = repositories::attempts::find_latest(&mut *tx, &test.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch latest attempt"))?;

    let attempt_number = match &latest {
        None => 1,
        Some(previous)
            if previous.state == AttemptState::Completed && previous.retake_allowed =>
        {
            // Consume the retake grant in the same transaction as the new
            // attempt so it cannot be spent twice.
            repositories::attempts::set_retake_allowed(&mut *tx, &previous.id, false, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to consume retake grant"))?;
            previous.attempt_number + 1
        }
        Some(_) => return Err(EngineError::AlreadyCompleted.into()),
    };

    let open_count = repositories::attempts::count_open(&mut *tx)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count open attempts"))?;
    let max_concurrent = state.settings().engine().max_concurrent_attempts as i64;
    if open_count >= max_concurrent {
        return Err(ApiError::ServiceUnavailable(
            "Exam service is temporarily at capacity. Try again in a few minutes.".to_string(),
        ));
    }

    let mut rng = StdRng::from_entropy();
    let order = ordering::presentation_order(
        &test.question_ids.0,
        test.shuffle_questions,
        test.question_block_size,
        &mut rng,
    );
    let order_json = serde_json::to_value(&order)
        .map_err(|e| ApiError::internal(e, "Failed to encode presentation order"))?;

    let attempt_id = Uuid::new_v4().to_string();
    let inserted = repositories::attempts::create(
        &mut *tx,
        repositories::attempts::CreateAttempt {
            id: &attempt_id,
            test_id: &test.id,
            student_id: &user.id,
            attempt_number,
            started_at: now,
            presentation_order: order_json,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create attempt"))?;

    if !inserted {
        // Lost the create race; the open-attempt index guarantees a winner.
        let existing = repositories::attempts::find_open(&mut *tx, &test.id, &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
            .ok_or_else(|| {
                ApiError::Conflict("An open attempt already exists for this test".to_string())
            })?;
        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
        return Ok(Json(start_response(existing, &test, now)));
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    let attempt = repositories::attempts::fetch_one_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    tracing::info!(
        attempt_id = %attempt.id,
        test_id = %test.id,
        student_id = %user.id,
        attempt_number,
        "Attempt started"
    );
    metrics::counter!("attempts_started_total").increment(1);

    Ok(Json(start_response(attempt, &test, now)))
}

pub(in crate::api::attempts) async fn mark_intro_seen(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let attempt = helpers::fetch_attempt(state.db(), &attempt_id).await?;
    helpers::require_attempt_owner(&attempt, &user)?;

    let now = state.clock().now();
    repositories::attempts::set_intro_seen(state.db(), &attempt.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to mark intro as seen"))?;

    let attempt = repositories::attempts::fetch_one_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    Ok(Json(helpers::attempt_to_response(attempt)))
}

fn start_response(
    attempt: Attempt,
    test: &TestDefinition,
    now: time::PrimitiveDateTime,
) -> StartAttemptResponse {
    let remaining_seconds =
        attempt_timing::remaining_seconds(now, attempt.started_at, test.duration_seconds);

    StartAttemptResponse {
        attempt: helpers::attempt_to_response(attempt),
        remaining_seconds,
        intro_video_url: test.intro_video_url.clone(),
    }
}
