use sqlx::PgPool;

use crate::db::models::TestDefinition;

pub(crate) const COLUMNS: &str = "\
    id, title, subject_ref, question_count, total_score, duration_seconds, pass_percent, \
    shuffle_questions, shuffle_options, question_block_size, question_ids, group_ids, \
    intro_video_url, active, created_by, created_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<TestDefinition>, sqlx::Error> {
    sqlx::query_as::<_, TestDefinition>(&format!("SELECT {COLUMNS} FROM tests WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateTest<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) subject_ref: Option<&'a str>,
    pub(crate) question_count: i32,
    pub(crate) total_score: i32,
    pub(crate) duration_seconds: i32,
    pub(crate) pass_percent: i32,
    pub(crate) shuffle_questions: bool,
    pub(crate) shuffle_options: bool,
    pub(crate) question_block_size: i32,
    pub(crate) question_ids: serde_json::Value,
    pub(crate) group_ids: serde_json::Value,
    pub(crate) intro_video_url: Option<&'a str>,
    pub(crate) active: bool,
    pub(crate) created_by: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

/// Authoring writes arrive through the external flow; this insert exists for
/// that collaborator and the test fixtures.
pub(crate) async fn create(
    pool: &PgPool,
    params: CreateTest<'_>,
) -> Result<TestDefinition, sqlx::Error> {
    sqlx::query_as::<_, TestDefinition>(&format!(
        "INSERT INTO tests (
            id, title, subject_ref, question_count, total_score, duration_seconds, pass_percent,
            shuffle_questions, shuffle_options, question_block_size, question_ids, group_ids,
            intro_video_url, active, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.subject_ref)
    .bind(params.question_count)
    .bind(params.total_score)
    .bind(params.duration_seconds)
    .bind(params.pass_percent)
    .bind(params.shuffle_questions)
    .bind(params.shuffle_options)
    .bind(params.question_block_size)
    .bind(params.question_ids)
    .bind(params.group_ids)
    .bind(params.intro_video_url)
    .bind(params.active)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}
