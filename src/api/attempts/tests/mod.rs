mod override_flows;

use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use crate::db::models::{AnswerOption, Question, TestDefinition, User};
use crate::db::types::QuestionType;
use crate::test_support::{self, TestContext, TestSpec};

pub(super) struct Fixture {
    pub(super) student: User,
    pub(super) student_token: String,
    pub(super) test: TestDefinition,
    pub(super) questions: Vec<(Question, Vec<AnswerOption>)>,
}

/// Four single-choice questions worth 25 points each, assigned to group-1,
/// no shuffling unless a test tweaks the definition afterwards.
pub(super) async fn setup_fixture(ctx: &TestContext) -> Fixture {
    let student = test_support::insert_student(ctx.state.db(), "student001", "group-1").await;

    let mut questions = Vec::new();
    for index in 0..4 {
        let question = test_support::insert_question(
            ctx.state.db(),
            &format!("Question {index}"),
            QuestionType::Single,
            &[("A", true), ("B", false), ("C", false)],
        )
        .await;
        questions.push(question);
    }

    let question_ids: Vec<String> =
        questions.iter().map(|(question, _)| question.id.clone()).collect();
    let test = test_support::insert_test(
        ctx.state.db(),
        TestSpec { question_ids, ..Default::default() },
    )
    .await;

    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());

    Fixture { student, student_token, test, questions }
}

pub(super) async fn start_attempt(app: Router, token: &str, test_id: &str) -> serde_json::Value {
    let (status, body) = start_attempt_raw(app, token, test_id).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    body
}

pub(super) async fn start_attempt_raw(
    app: Router,
    token: &str,
    test_id: &str,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/tests/{test_id}/attempts"),
            Some(token),
            None,
        ))
        .await
        .expect("start attempt");

    let status = response.status();
    let body = test_support::read_json(response).await;
    (status, body)
}

pub(super) async fn submit_answer(
    app: Router,
    token: &str,
    attempt_id: &str,
    question_id: &str,
    option_ids: &[&str],
) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/answers"),
            Some(token),
            Some(json!({
                "question_id": question_id,
                "selected_option_ids": option_ids,
            })),
        ))
        .await
        .expect("submit answer");

    let status = response.status();
    let body = test_support::read_json(response).await;
    (status, body)
}

pub(super) async fn finish_attempt(
    app: Router,
    token: &str,
    attempt_id: &str,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/finish"),
            Some(token),
            None,
        ))
        .await
        .expect("finish attempt");

    let status = response.status();
    let body = test_support::read_json(response).await;
    (status, body)
}

pub(super) async fn count_answers(pool: &sqlx::PgPool, attempt_id: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM answers WHERE attempt_id = $1")
        .bind(attempt_id)
        .fetch_one(pool)
        .await
        .expect("count answers")
}
