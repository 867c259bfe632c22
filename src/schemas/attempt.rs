use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::types::{AttemptState, ChangeType, QuestionType};

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) state: AttemptState,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: String,
    pub(crate) finished_at: Option<String>,
    pub(crate) presentation_order: Vec<String>,
    pub(crate) accumulated_score: f64,
    pub(crate) overridden_score: Option<f64>,
    pub(crate) pass_override: bool,
    pub(crate) retake_allowed: bool,
    pub(crate) intro_seen: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    #[serde(flatten)]
    pub(crate) attempt: AttemptResponse,
    pub(crate) remaining_seconds: i64,
    pub(crate) intro_video_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptDetailResponse {
    #[serde(flatten)]
    pub(crate) attempt: AttemptResponse,
    pub(crate) effective_score: f64,
    pub(crate) effective_passed: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionOptionResponse {
    pub(crate) id: String,
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) image_url: Option<String>,
    pub(crate) options: Vec<QuestionOptionResponse>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitAnswerRequest {
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    pub(crate) selected_option_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAnswerResponse {
    pub(crate) question_id: String,
    pub(crate) is_correct: bool,
    pub(crate) score: f64,
    pub(crate) running_total: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct FinishAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) finished_at: String,
    pub(crate) total_score: f64,
    pub(crate) total_questions: i64,
    pub(crate) answered: i64,
    pub(crate) correct: i64,
    pub(crate) incorrect: i64,
    pub(crate) unanswered: i64,
    pub(crate) effective_score: f64,
    pub(crate) effective_passed: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct RemainingTimeResponse {
    pub(crate) attempt_id: String,
    pub(crate) remaining_seconds: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ApplyOverrideRequest {
    #[serde(default)]
    pub(crate) new_score: Option<f64>,
    #[serde(default)]
    pub(crate) pass_override: Option<bool>,
    #[validate(length(min = 1, message = "reason must not be empty"))]
    pub(crate) reason: String,
    pub(crate) change_type: ChangeType,
}

#[derive(Debug, Serialize)]
pub(crate) struct OverrideRecordResponse {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) previous_score: Option<f64>,
    pub(crate) new_score: Option<f64>,
    pub(crate) previous_pass_override: bool,
    pub(crate) new_pass_override: bool,
    pub(crate) reason: String,
    pub(crate) change_type: ChangeType,
    pub(crate) changed_by: Option<String>,
    pub(crate) created_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ApplyOverrideResponse {
    pub(crate) record: OverrideRecordResponse,
    pub(crate) effective_score: f64,
    pub(crate) effective_passed: bool,
}
