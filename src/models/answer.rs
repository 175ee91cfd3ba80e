use serde::{Deserialize, Serialize};

/// Ephemeral answer record held in the answer store under
/// `qrush:answers:<game_id>:<question_index>:<user_id>`.
///
/// Written once on submission (conditional on absence), then overwritten with
/// evaluation results after the question closes so duplicate webhooks arriving
/// post-evaluation cannot race the verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub answer_text: String,
    pub submitted_at_unix_ms: i64,
    pub question_start_at_unix_ms: i64,
    pub time_limit_ms: i64,
    pub evaluated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_on_time: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

impl AnswerRecord {
    pub fn new(
        answer_text: String,
        submitted_at_unix_ms: i64,
        question_start_at_unix_ms: i64,
        time_limit_ms: i64,
    ) -> Self {
        Self {
            answer_text,
            submitted_at_unix_ms,
            question_start_at_unix_ms,
            time_limit_ms,
            evaluated: false,
            is_on_time: None,
            is_correct: None,
        }
    }

    pub fn response_time_ms(&self) -> i64 {
        self.submitted_at_unix_ms - self.question_start_at_unix_ms
    }
}

/// Evaluation verdict written back onto a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerEvaluation {
    pub is_on_time: bool,
    pub is_correct: bool,
}
