use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::{ApiError, EngineError};
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::db::types::AttemptState;
use crate::repositories;
use crate::schemas::attempt::{SubmitAnswerRequest, SubmitAnswerResponse};
use crate::services::{attempt_finalize, attempt_timing, scoring};

use super::helpers;

pub(in crate::api::attempts) async fn submit_answer(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

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

    // Re-read under the lock: a concurrent submit or finish may have closed
    // the attempt while this request was queued.
    let attempt = repositories::attempts::fetch_one_by_id(&mut *tx, &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    if attempt.state == AttemptState::Completed {
        return Err(EngineError::AttemptClosed.into());
    }

    if attempt_timing::is_expired(now, attempt.started_at, test.duration_seconds) {
        // The boundary check and the terminal transition happen together;
        // the answer is rejected, not silently processed.
        attempt_finalize::close_attempt(
            &mut *tx,
            &attempt,
            test.duration_seconds,
            attempt_finalize::CloseMode::DeadlineExceeded,
            now,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to close expired attempt"))?;
        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

        metrics::counter!("attempts_expired_total").increment(1);
        return Err(EngineError::TimeExpired.into());
    }

    if !attempt.presentation_order.0.iter().any(|id| id == &payload.question_id) {
        return Err(EngineError::InvalidAnswerShape(
            "Question is not part of this attempt".to_string(),
        )
        .into());
    }

    let question = repositories::questions::find_by_id(state.db(), &payload.question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    let options = repositories::questions::list_options(state.db(), &question.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch answer options"))?;

    let known_ids: HashSet<&str> = options.iter().map(|option| option.id.as_str()).collect();
    for selected in &payload.selected_option_ids {
        if !known_ids.contains(selected.as_str()) {
            return Err(EngineError::InvalidAnswerShape(format!(
                "Option {selected} does not belong to this question"
            ))
            .into());
        }
    }

    let correct_ids: Vec<String> = options
        .iter()
        .filter(|option| option.is_correct)
        .map(|option| option.id.clone())
        .collect();

    let is_correct =
        scoring::evaluate(question.question_type, &payload.selected_option_ids, &correct_ids);
    let per_question = scoring::per_question_value(test.total_score, test.question_count);
    let score = scoring::score_for(is_correct, per_question);

    let selected_json = serde_json::to_value(&payload.selected_option_ids)
        .map_err(|e| ApiError::internal(e, "Failed to encode selected options"))?;

    let answer = repositories::answers::upsert(
        &mut *tx,
        repositories::answers::UpsertAnswer {
            id: &Uuid::new_v4().to_string(),
            attempt_id: &attempt.id,
            question_id: &question.id,
            selected_option_ids: selected_json,
            is_correct,
            score,
            now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record answer"))?;

    let running_total = repositories::answers::recompute_attempt_score(&mut *tx, &attempt.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to recompute attempt score"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    metrics::counter!("answers_scored_total").increment(1);

    Ok(Json(SubmitAnswerResponse {
        question_id: answer.question_id,
        is_correct: answer.is_correct,
        score: answer.score,
        running_total,
    }))
}
