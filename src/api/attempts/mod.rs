mod answer;
mod finish;
mod helpers;
mod question;
mod review;
mod start;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/tests/:test_id/attempts",
            post(start::start_attempt).get(review::list_test_attempts),
        )
        .route("/attempts/:attempt_id", get(review::get_attempt))
        .route("/attempts/:attempt_id/questions/:question_id", get(question::get_question))
        .route("/attempts/:attempt_id/answers", post(answer::submit_answer))
        .route("/attempts/:attempt_id/finish", post(finish::finish_attempt))
        .route("/attempts/:attempt_id/remaining", get(finish::remaining_time))
        .route("/attempts/:attempt_id/intro-seen", post(start::mark_intro_seen))
        .route("/attempts/:attempt_id/retake", post(review::grant_retake))
        .route("/attempts/:attempt_id/override", post(review::apply_override))
        .route("/attempts/:attempt_id/overrides", get(review::list_overrides))
}

#[cfg(test)]
mod tests;
