use crate::db::models::Answer;

const COLUMNS: &str = "\
    id, attempt_id, question_id, selected_option_ids, is_correct, score, created_at, updated_at";

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) selected_option_ids: serde_json::Value,
    pub(crate) is_correct: bool,
    pub(crate) score: f64,
    pub(crate) now: time::PrimitiveDateTime,
}

/// At most one answer per (attempt, question); resubmission replaces the
/// prior selection and score rather than adding a second row.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    answer: UpsertAnswer<'_>,
) -> Result<Answer, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "INSERT INTO answers (
            id, attempt_id, question_id, selected_option_ids, is_correct, score,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
        ON CONFLICT (attempt_id, question_id) DO UPDATE SET
            selected_option_ids = EXCLUDED.selected_option_ids,
            is_correct = EXCLUDED.is_correct,
            score = EXCLUDED.score,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(answer.id)
    .bind(answer.attempt_id)
    .bind(answer.question_id)
    .bind(answer.selected_option_ids)
    .bind(answer.is_correct)
    .bind(answer.score)
    .bind(answer.now)
    .fetch_one(executor)
    .await
}

/// Full-sum recompute rather than an incremental add, so the total stays
/// correct under resubmission and request interleaving.
pub(crate) async fn recompute_attempt_score(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar::<_, f64>(
        "UPDATE attempts SET
            accumulated_score = COALESCE(
                (SELECT SUM(score) FROM answers WHERE attempt_id = $1), 0),
            updated_at = $2
         WHERE id = $1
         RETURNING accumulated_score",
    )
    .bind(attempt_id)
    .bind(now)
    .fetch_one(executor)
    .await
}

/// (answered, correct) counts for the finish report.
pub(crate) async fn counts_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_correct) FROM answers WHERE attempt_id = $1",
    )
    .bind(attempt_id)
    .fetch_one(executor)
    .await
}
