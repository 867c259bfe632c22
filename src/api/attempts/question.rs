use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::{ApiError, EngineError};
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::attempt::{QuestionOptionResponse, QuestionResponse};
use crate::services::ordering;

use super::helpers;

/// Question delivery. Options never expose correctness, and a shuffled order
/// is derived from the (attempt, question) pair so a reload renders the same
/// order while another attempt sees an independent one.
pub(in crate::api::attempts) async fn get_question(
    Path((attempt_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let attempt = helpers::fetch_attempt(state.db(), &attempt_id).await?;
    helpers::require_attempt_owner(&attempt, &user)?;

    if !attempt.presentation_order.0.iter().any(|id| id == &question_id) {
        return Err(EngineError::InvalidAnswerShape(
            "Question is not part of this attempt".to_string(),
        )
        .into());
    }

    let question = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    let mut options = repositories::questions::list_options(state.db(), &question.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch answer options"))?;

    let test = helpers::fetch_test(state.db(), &attempt.test_id).await?;
    if test.shuffle_options {
        ordering::shuffle_options_stable(&mut options, &attempt.id, &question.id);
    }

    Ok(Json(QuestionResponse {
        id: question.id,
        text: question.text,
        question_type: question.question_type,
        image_url: question.image_url,
        options: options
            .into_iter()
            .map(|option| QuestionOptionResponse { id: option.id, text: option.text })
            .collect(),
    }))
}
