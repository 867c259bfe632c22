use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::{finish_attempt, setup_fixture, start_attempt, start_attempt_raw, submit_answer};
use crate::test_support;

async fn apply_override(
    app: axum::Router,
    token: &str,
    attempt_id: &str,
    payload: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/override"),
            Some(token),
            Some(payload),
        ))
        .await
        .expect("apply override");

    let status = response.status();
    let body = test_support::read_json(response).await;
    (status, body)
}

async fn list_overrides(
    app: axum::Router,
    token: &str,
    attempt_id: &str,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/attempts/{attempt_id}/overrides"),
            Some(token),
            None,
        ))
        .await
        .expect("list overrides");

    let status = response.status();
    let body = test_support::read_json(response).await;
    (status, body)
}

/// Drives the fixture to a raw score of 50/100: two correct, one wrong,
/// one unanswered, then finishes the attempt.
async fn complete_with_half_score(
    ctx: &test_support::TestContext,
    fixture: &super::Fixture,
) -> String {
    let attempt = start_attempt(ctx.app.clone(), &fixture.student_token, &fixture.test.id).await;
    let attempt_id = attempt["id"].as_str().expect("attempt id").to_string();

    for (index, correct) in [(0, true), (1, false), (2, true)] {
        let (question, options) = &fixture.questions[index];
        let option = if correct { options[0].id.as_str() } else { options[1].id.as_str() };
        let (status, body) = submit_answer(
            ctx.app.clone(),
            &fixture.student_token,
            &attempt_id,
            &question.id,
            &[option],
        )
        .await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
    }

    let (status, report) =
        finish_attempt(ctx.app.clone(), &fixture.student_token, &attempt_id).await;
    assert_eq!(status, StatusCode::OK, "response: {report}");
    assert_eq!(report["total_score"], 50.0);
    assert_eq!(report["effective_passed"], false);

    attempt_id
}

#[tokio::test]
async fn pass_override_forces_pass_and_preserves_the_raw_score() {
    let ctx = test_support::setup_test_context().await;
    let fixture = setup_fixture(&ctx).await;
    let attempt_id = complete_with_half_score(&ctx, &fixture).await;

    let admin = test_support::insert_admin(ctx.state.db(), "admin001").await;
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let (status, body) = apply_override(
        ctx.app.clone(),
        &admin_token,
        &attempt_id,
        json!({
            "pass_override": true,
            "reason": "medical exception",
            "change_type": "override",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["effective_passed"], true);
    assert_eq!(body["effective_score"], 50.0);
    assert_eq!(body["record"]["change_type"], "override");
    assert_eq!(body["record"]["previous_pass_override"], false);
    assert_eq!(body["record"]["new_pass_override"], true);
    assert_eq!(body["record"]["changed_by"], admin.id.as_str());

    // Forensic truth: the raw accumulated score is untouched.
    let accumulated: f64 =
        sqlx::query_scalar("SELECT accumulated_score FROM attempts WHERE id = $1")
            .bind(&attempt_id)
            .fetch_one(ctx.state.db())
            .await
            .expect("accumulated score");
    assert_eq!(accumulated, 50.0);

    let (status, records) = list_overrides(ctx.app.clone(), &admin_token, &attempt_id).await;
    assert_eq!(status, StatusCode::OK, "response: {records}");
    assert_eq!(records.as_array().expect("records").len(), 1);
}

#[tokio::test]
async fn override_then_revert_restores_the_raw_outcome() {
    let ctx = test_support::setup_test_context().await;
    let fixture = setup_fixture(&ctx).await;
    let attempt_id = complete_with_half_score(&ctx, &fixture).await;

    let admin = test_support::insert_admin(ctx.state.db(), "admin002").await;
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let (status, body) = apply_override(
        ctx.app.clone(),
        &admin_token,
        &attempt_id,
        json!({
            "new_score": 80.0,
            "reason": "appeal accepted",
            "change_type": "override",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["effective_score"], 80.0);
    assert_eq!(body["effective_passed"], true);

    let (status, body) = apply_override(
        ctx.app.clone(),
        &admin_token,
        &attempt_id,
        json!({
            "reason": "appeal withdrawn",
            "change_type": "revert",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["effective_score"], 50.0);
    assert_eq!(body["effective_passed"], false);
    assert_eq!(body["record"]["previous_score"], 80.0);
    assert_eq!(body["record"]["new_score"], serde_json::Value::Null);

    // Exactly two ledger rows, newest first.
    let (status, records) = list_overrides(ctx.app.clone(), &admin_token, &attempt_id).await;
    assert_eq!(status, StatusCode::OK, "response: {records}");
    let records = records.as_array().expect("records");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["change_type"], "revert");
    assert_eq!(records[1]["change_type"], "override");

    let overridden: Option<f64> =
        sqlx::query_scalar("SELECT overridden_score FROM attempts WHERE id = $1")
            .bind(&attempt_id)
            .fetch_one(ctx.state.db())
            .await
            .expect("overridden score");
    assert_eq!(overridden, None);
}

#[tokio::test]
async fn override_with_blank_reason_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let fixture = setup_fixture(&ctx).await;
    let attempt_id = complete_with_half_score(&ctx, &fixture).await;

    let admin = test_support::insert_admin(ctx.state.db(), "admin003").await;
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());

    for reason in ["", "   "] {
        let (status, error) = apply_override(
            ctx.app.clone(),
            &admin_token,
            &attempt_id,
            json!({
                "pass_override": true,
                "reason": reason,
                "change_type": "override",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "reason {reason:?}: {error}");
        assert_eq!(error["code"], "override_rejected");
    }

    let (status, records) = list_overrides(ctx.app.clone(), &admin_token, &attempt_id).await;
    assert_eq!(status, StatusCode::OK, "response: {records}");
    assert_eq!(records.as_array().expect("records").len(), 0);
}

#[tokio::test]
async fn override_requires_admin_authority() {
    let ctx = test_support::setup_test_context().await;
    let fixture = setup_fixture(&ctx).await;
    let attempt_id = complete_with_half_score(&ctx, &fixture).await;

    let controller = test_support::insert_controller(ctx.state.db(), "controller001").await;
    let controller_token = test_support::bearer_token(&controller.id, ctx.state.settings());

    let (status, error) = apply_override(
        ctx.app.clone(),
        &controller_token,
        &attempt_id,
        json!({
            "pass_override": true,
            "reason": "should not work",
            "change_type": "override",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "response: {error}");
}

#[tokio::test]
async fn retake_grant_permits_exactly_one_fresh_attempt() {
    let ctx = test_support::setup_test_context().await;
    let fixture = setup_fixture(&ctx).await;
    let first_attempt_id = complete_with_half_score(&ctx, &fixture).await;

    let controller = test_support::insert_controller(ctx.state.db(), "controller002").await;
    let controller_token = test_support::bearer_token(&controller.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{first_attempt_id}/retake"),
            Some(&controller_token),
            None,
        ))
        .await
        .expect("grant retake");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["retake_allowed"], true);

    let fresh = start_attempt(ctx.app.clone(), &fixture.student_token, &fixture.test.id).await;
    assert_ne!(fresh["id"].as_str(), Some(first_attempt_id.as_str()));
    assert_eq!(fresh["attempt_number"], 2);
    assert_eq!(fresh["student_id"], fixture.student.id.as_str());
    assert_eq!(fresh["accumulated_score"], 0.0);

    // The grant was consumed with the new attempt.
    let retake_allowed: bool =
        sqlx::query_scalar("SELECT retake_allowed FROM attempts WHERE id = $1")
            .bind(&first_attempt_id)
            .fetch_one(ctx.state.db())
            .await
            .expect("retake flag");
    assert!(!retake_allowed);

    // Finishing the fresh attempt leaves the student blocked again.
    let fresh_id = fresh["id"].as_str().expect("attempt id");
    let (status, report) = finish_attempt(ctx.app.clone(), &fixture.student_token, fresh_id).await;
    assert_eq!(status, StatusCode::OK, "response: {report}");

    let (status, error) =
        start_attempt_raw(ctx.app.clone(), &fixture.student_token, &fixture.test.id).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {error}");
    assert_eq!(error["code"], "already_completed");
}
