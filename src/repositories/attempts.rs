use sqlx::PgPool;

use crate::db::models::Attempt;
use crate::db::types::AttemptState;

pub(crate) const COLUMNS: &str = "\
    id, test_id, student_id, state, attempt_number, started_at, finished_at, \
    presentation_order, accumulated_score, overridden_score, pass_override, \
    retake_allowed, intro_seen, created_at, updated_at";

/// Serializes concurrent `start` calls for one (test, student) pair.
pub(crate) async fn acquire_start_lock(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))")
        .bind(test_id)
        .bind(student_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Serializes submit/finish/override for one attempt. Duplicate network
/// retries end up queued behind each other instead of racing.
pub(crate) async fn acquire_attempt_lock(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1)::bigint)")
        .bind(attempt_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn fetch_one_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Attempt, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1"))
        .bind(id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn find_open(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts \
         WHERE test_id = $1 AND student_id = $2 AND state = $3"
    ))
    .bind(test_id)
    .bind(student_id)
    .bind(AttemptState::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_latest(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts \
         WHERE test_id = $1 AND student_id = $2 \
         ORDER BY attempt_number DESC LIMIT 1"
    ))
    .bind(test_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_test(
    pool: &PgPool,
    test_id: &str,
) -> Result<Vec<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE test_id = $1 ORDER BY created_at DESC"
    ))
    .bind(test_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_open(
    executor: impl sqlx::PgExecutor<'_>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE state = $1")
        .bind(AttemptState::InProgress)
        .fetch_one(executor)
        .await
}

/// (attempt_id, duration_seconds) of in-progress attempts whose deadline has
/// already passed; the sweeper re-reads each row under the attempt lock.
pub(crate) async fn list_overdue(
    executor: impl sqlx::PgExecutor<'_>,
    now: time::PrimitiveDateTime,
) -> Result<Vec<(String, i32)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i32)>(
        "SELECT a.id, t.duration_seconds \
         FROM attempts a JOIN tests t ON t.id = a.test_id \
         WHERE a.state = $1 AND a.started_at + make_interval(secs => t.duration_seconds) <= $2",
    )
    .bind(AttemptState::InProgress)
    .bind(now)
    .fetch_all(executor)
    .await
}

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) test_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: time::PrimitiveDateTime,
    pub(crate) presentation_order: serde_json::Value,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

/// Create-if-absent against the open-attempt partial unique index. Returns
/// false when a concurrent start already created the row; the caller then
/// reads the winner.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO attempts (
            id, test_id, student_id, state, attempt_number, started_at,
            presentation_order, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        ON CONFLICT DO NOTHING",
    )
    .bind(attempt.id)
    .bind(attempt.test_id)
    .bind(attempt.student_id)
    .bind(AttemptState::InProgress)
    .bind(attempt.attempt_number)
    .bind(attempt.started_at)
    .bind(attempt.presentation_order)
    .bind(attempt.created_at)
    .bind(attempt.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Terminal transition. The state guard makes the call a no-op on an
/// already-completed attempt, so `finished_at` is written exactly once.
pub(crate) async fn complete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    finished_at: time::PrimitiveDateTime,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE attempts SET state = $1, finished_at = $2, updated_at = $3 \
         WHERE id = $4 AND state = $5",
    )
    .bind(AttemptState::Completed)
    .bind(finished_at)
    .bind(now)
    .bind(id)
    .bind(AttemptState::InProgress)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn set_retake_allowed(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    allowed: bool,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE attempts SET retake_allowed = $1, updated_at = $2 WHERE id = $3")
        .bind(allowed)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn set_intro_seen(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE attempts SET intro_seen = TRUE, updated_at = $1 WHERE id = $2")
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Writes the shadow fields only; `accumulated_score` stays untouched.
pub(crate) async fn update_override_fields(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    overridden_score: Option<f64>,
    pass_override: bool,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE attempts SET overridden_score = $1, pass_override = $2, updated_at = $3 \
         WHERE id = $4",
    )
    .bind(overridden_score)
    .bind(pass_override)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}
