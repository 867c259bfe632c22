use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptState, ChangeType, QuestionType, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) group_id: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Frozen output of the authoring flow. The engine never mutates a test;
/// `question_ids` is the canonical ordered pool shared by every attempt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TestDefinition {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) subject_ref: Option<String>,
    pub(crate) question_count: i32,
    pub(crate) total_score: i32,
    pub(crate) duration_seconds: i32,
    pub(crate) pass_percent: i32,
    pub(crate) shuffle_questions: bool,
    pub(crate) shuffle_options: bool,
    pub(crate) question_block_size: i32,
    pub(crate) question_ids: Json<Vec<String>>,
    pub(crate) group_ids: Json<Vec<String>>,
    pub(crate) intro_video_url: Option<String>,
    pub(crate) active: bool,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) image_url: Option<String>,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AnswerOption {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
    pub(crate) order_index: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

/// One student's run through one test. `presentation_order` is fixed at
/// creation and never recomputed; `accumulated_score` is always the sum over
/// the recorded answers, while `overridden_score`/`pass_override` shadow it
/// for display without destroying the raw value.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) state: AttemptState,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) finished_at: Option<PrimitiveDateTime>,
    pub(crate) presentation_order: Json<Vec<String>>,
    pub(crate) accumulated_score: f64,
    pub(crate) overridden_score: Option<f64>,
    pub(crate) pass_override: bool,
    pub(crate) retake_allowed: bool,
    pub(crate) intro_seen: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Answer {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_option_ids: Json<Vec<String>>,
    pub(crate) is_correct: bool,
    pub(crate) score: f64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct OverrideRecord {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) previous_score: Option<f64>,
    pub(crate) new_score: Option<f64>,
    pub(crate) previous_pass_override: bool,
    pub(crate) new_pass_override: bool,
    pub(crate) reason: String,
    pub(crate) change_type: ChangeType,
    pub(crate) changed_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}
