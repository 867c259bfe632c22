use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::{ApiError, EngineError};
use crate::api::guards::{require_role, CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::db::models::{Attempt, TestDefinition};
use crate::db::types::{AttemptState, ChangeType, UserRole};
use crate::repositories;
use crate::schemas::attempt::{
    ApplyOverrideRequest, ApplyOverrideResponse, AttemptDetailResponse, AttemptResponse,
    OverrideRecordResponse,
};
use crate::services::grading;

use super::helpers;

pub(in crate::api::attempts) async fn get_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptDetailResponse>, ApiError> {
    let attempt = helpers::fetch_attempt(state.db(), &attempt_id).await?;

    if attempt.student_id != user.id {
        require_role(&user, UserRole::Controller)?;
    }

    let test = helpers::fetch_test(state.db(), &attempt.test_id).await?;

    Ok(Json(detail_response(attempt, &test)))
}

pub(in crate::api::attempts) async fn list_test_attempts(
    Path(test_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AttemptDetailResponse>>, ApiError> {
    require_role(&user, UserRole::Controller)?;

    let test = helpers::fetch_test(state.db(), &test_id).await?;
    let attempts = repositories::attempts::list_by_test(state.db(), &test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    Ok(Json(attempts.into_iter().map(|attempt| detail_response(attempt, &test)).collect()))
}

/// The retake grant: a controller permits one fresh attempt on a completed
/// run. The grant is consumed by the next `start`.
pub(in crate::api::attempts) async fn grant_retake(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptResponse>, ApiError> {
    require_role(&user, UserRole::Controller)?;

    let attempt = helpers::fetch_attempt(state.db(), &attempt_id).await?;
    if attempt.state != AttemptState::Completed {
        return Err(ApiError::BadRequest(
            "Only completed attempts can be granted a retake".to_string(),
        ));
    }

    let now = state.clock().now();
    repositories::attempts::set_retake_allowed(state.db(), &attempt.id, true, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to grant retake"))?;

    tracing::info!(attempt_id = %attempt.id, granted_by = %user.id, "Retake granted");

    let attempt = repositories::attempts::fetch_one_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    Ok(Json(helpers::attempt_to_response(attempt)))
}

/// Manual correction. The raw accumulated score is never touched; the shadow
/// fields move, and every change appends exactly one ledger record with the
/// before/after of both fields. A revert restores the unforced state through
/// this same path.
pub(in crate::api::attempts) async fn apply_override(
    Path(attempt_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ApplyOverrideRequest>,
) -> Result<Json<ApplyOverrideResponse>, ApiError> {
    payload.validate().map_err(|e| {
        EngineError::OverrideRejected(e.to_string())
    })?;
    if payload.reason.trim().is_empty() {
        return Err(EngineError::OverrideRejected("reason must not be empty".to_string()).into());
    }

    let attempt = helpers::fetch_attempt(state.db(), &attempt_id).await?;
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

    let (new_score, new_pass_override) = match payload.change_type {
        ChangeType::Override => (payload.new_score, payload.pass_override.unwrap_or(false)),
        // A revert is an override whose new values restore the raw state.
        ChangeType::Revert => (None, false),
    };

    let record = repositories::overrides::create(
        &mut *tx,
        repositories::overrides::CreateOverride {
            id: &Uuid::new_v4().to_string(),
            attempt_id: &attempt.id,
            previous_score: attempt.overridden_score,
            new_score,
            previous_pass_override: attempt.pass_override,
            new_pass_override,
            reason: payload.reason.trim(),
            change_type: payload.change_type,
            changed_by: Some(&admin.id),
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to append override record"))?;

    repositories::attempts::update_override_fields(
        &mut *tx,
        &attempt.id,
        new_score,
        new_pass_override,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update override fields"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        attempt_id = %attempt.id,
        changed_by = %admin.id,
        change_type = ?payload.change_type,
        "Override recorded"
    );
    metrics::counter!("attempt_overrides_total").increment(1);

    let effective_score = grading::effective_score(attempt.accumulated_score, new_score);
    let effective_passed = grading::effective_passed(
        effective_score,
        test.total_score,
        test.pass_percent,
        new_pass_override,
    );

    Ok(Json(ApplyOverrideResponse {
        record: helpers::override_to_response(record),
        effective_score,
        effective_passed,
    }))
}

pub(in crate::api::attempts) async fn list_overrides(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<OverrideRecordResponse>>, ApiError> {
    require_role(&user, UserRole::Controller)?;

    let attempt = helpers::fetch_attempt(state.db(), &attempt_id).await?;
    let records = repositories::overrides::list_by_attempt(state.db(), &attempt.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list override records"))?;

    Ok(Json(records.into_iter().map(helpers::override_to_response).collect()))
}

fn detail_response(attempt: Attempt, test: &TestDefinition) -> AttemptDetailResponse {
    let effective_score =
        grading::effective_score(attempt.accumulated_score, attempt.overridden_score);
    let effective_passed = grading::effective_passed(
        effective_score,
        test.total_score,
        test.pass_percent,
        attempt.pass_override,
    );

    AttemptDetailResponse {
        attempt: helpers::attempt_to_response(attempt),
        effective_score,
        effective_passed,
    }
}
