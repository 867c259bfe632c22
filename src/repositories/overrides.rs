use sqlx::PgPool;

use crate::db::models::OverrideRecord;
use crate::db::types::ChangeType;

const COLUMNS: &str = "\
    id, attempt_id, previous_score, new_score, previous_pass_override, new_pass_override, \
    reason, change_type, changed_by, created_at";

pub(crate) struct CreateOverride<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) previous_score: Option<f64>,
    pub(crate) new_score: Option<f64>,
    pub(crate) previous_pass_override: bool,
    pub(crate) new_pass_override: bool,
    pub(crate) reason: &'a str,
    pub(crate) change_type: ChangeType,
    pub(crate) changed_by: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

/// Append-only; records are never updated or deleted.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateOverride<'_>,
) -> Result<OverrideRecord, sqlx::Error> {
    sqlx::query_as::<_, OverrideRecord>(&format!(
        "INSERT INTO attempt_overrides (
            id, attempt_id, previous_score, new_score, previous_pass_override,
            new_pass_override, reason, change_type, changed_by, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.previous_score)
    .bind(params.new_score)
    .bind(params.previous_pass_override)
    .bind(params.new_pass_override)
    .bind(params.reason)
    .bind(params.change_type)
    .bind(params.changed_by)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_attempt(
    pool: &PgPool,
    attempt_id: &str,
) -> Result<Vec<OverrideRecord>, sqlx::Error> {
    sqlx::query_as::<_, OverrideRecord>(&format!(
        "SELECT {COLUMNS} FROM attempt_overrides WHERE attempt_id = $1 ORDER BY created_at DESC"
    ))
    .bind(attempt_id)
    .fetch_all(pool)
    .await
}
