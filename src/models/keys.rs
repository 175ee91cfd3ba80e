use uuid::Uuid;

/// Redis key builder for consistent key naming across the application.
pub struct RedisKey;

impl RedisKey {
    pub fn answer(game_id: Uuid, question_index: usize, user_id: Uuid) -> String {
        format!("qrush:answers:{game_id}:{question_index}:{user_id}")
    }

    /// SCAN pattern matching every answer for one question.
    pub fn question_answers_pattern(game_id: Uuid, question_index: usize) -> String {
        format!("qrush:answers:{game_id}:{question_index}:*")
    }

    /// SCAN pattern matching every answer key a game ever produced.
    pub fn game_answers_pattern(game_id: Uuid) -> String {
        format!("qrush:answers:{game_id}:*")
    }

    /// The user id segment of an answer key, if the key is well-formed.
    pub fn user_of_answer_key(key: &str) -> Option<Uuid> {
        key.rsplit(':').next().and_then(|s| Uuid::parse_str(s).ok())
    }
}
