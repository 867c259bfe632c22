use sqlx::PgPool;

use crate::db::models::{AnswerOption, Question};
use crate::db::types::QuestionType;

const QUESTION_COLUMNS: &str =
    "id, text, question_type, image_url, created_by, created_at, updated_at";

const OPTION_COLUMNS: &str = "id, question_id, text, is_correct, order_index, created_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_options(
    pool: &PgPool,
    question_id: &str,
) -> Result<Vec<AnswerOption>, sqlx::Error> {
    sqlx::query_as::<_, AnswerOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM answer_options WHERE question_id = $1 ORDER BY order_index, id"
    ))
    .bind(question_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) text: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) image_url: Option<&'a str>,
    pub(crate) created_by: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (id, text, question_type, image_url, created_by, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {QUESTION_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.text)
    .bind(params.question_type)
    .bind(params.image_url)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct CreateAnswerOption<'a> {
    pub(crate) id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) text: &'a str,
    pub(crate) is_correct: bool,
    pub(crate) order_index: i32,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create_option(
    pool: &PgPool,
    params: CreateAnswerOption<'_>,
) -> Result<AnswerOption, sqlx::Error> {
    sqlx::query_as::<_, AnswerOption>(&format!(
        "INSERT INTO answer_options (id, question_id, text, is_correct, order_index, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {OPTION_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.question_id)
    .bind(params.text)
    .bind(params.is_correct)
    .bind(params.order_index)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}
