use crate::api::errors::{ApiError, EngineError};
use crate::db::models::{Attempt, OverrideRecord, TestDefinition, User};
use crate::repositories;
use crate::schemas::attempt::{AttemptResponse, OverrideRecordResponse, format_primitive};

pub(crate) fn attempt_to_response(attempt: Attempt) -> AttemptResponse {
    AttemptResponse {
        id: attempt.id,
        test_id: attempt.test_id,
        student_id: attempt.student_id,
        state: attempt.state,
        attempt_number: attempt.attempt_number,
        started_at: format_primitive(attempt.started_at),
        finished_at: attempt.finished_at.map(format_primitive),
        presentation_order: attempt.presentation_order.0,
        accumulated_score: attempt.accumulated_score,
        overridden_score: attempt.overridden_score,
        pass_override: attempt.pass_override,
        retake_allowed: attempt.retake_allowed,
        intro_seen: attempt.intro_seen,
    }
}

pub(crate) fn override_to_response(record: OverrideRecord) -> OverrideRecordResponse {
    OverrideRecordResponse {
        id: record.id,
        attempt_id: record.attempt_id,
        previous_score: record.previous_score,
        new_score: record.new_score,
        previous_pass_override: record.previous_pass_override,
        new_pass_override: record.new_pass_override,
        reason: record.reason,
        change_type: record.change_type,
        changed_by: record.changed_by,
        created_at: format_primitive(record.created_at),
    }
}

pub(crate) async fn fetch_test(
    pool: &sqlx::PgPool,
    test_id: &str,
) -> Result<TestDefinition, ApiError> {
    repositories::tests::find_by_id(pool, test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch test"))?
        .ok_or_else(|| ApiError::NotFound("Test not found".to_string()))
}

pub(crate) async fn fetch_attempt(
    pool: &sqlx::PgPool,
    attempt_id: &str,
) -> Result<Attempt, ApiError> {
    repositories::attempts::find_by_id(pool, attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))
}

pub(crate) fn require_attempt_owner(attempt: &Attempt, user: &User) -> Result<(), ApiError> {
    if attempt.student_id == user.id {
        return Ok(());
    }
    Err(EngineError::NotAuthorized("Attempt belongs to another student").into())
}
