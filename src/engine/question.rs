use std::collections::HashMap;

use chrono::DateTime;
use rand::seq::{IndexedRandom, SliceRandom};
use uuid::Uuid;

use crate::models::Question;
use crate::models::answer::{AnswerEvaluation, AnswerRecord};
use crate::models::player_answer::PlayerAnswer;

/// Canonical form used for comparing player answers with the correct one:
/// lowercase, alphanumeric-and-whitespace only, single-spaced. Applying it
/// twice is the identity.
pub fn normalize_answer(text: &str) -> String {
    let filtered: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pick the three reply options for a question: the correct answer plus two
/// of the remaining options drawn without replacement, shuffled together.
pub fn select_buttons(question: &Question) -> Vec<String> {
    let mut rng = rand::rng();
    let wrong: Vec<&String> = question
        .options
        .iter()
        .filter(|o| **o != question.correct_answer)
        .collect();

    let mut picked: Vec<String> = wrong
        .choose_multiple(&mut rng, 2)
        .map(|s| (*s).clone())
        .collect();
    picked.push(question.correct_answer.clone());
    picked.shuffle(&mut rng);
    picked
}

/// On-time means the submission landed within the limit plus grace, measured
/// from the question start stamp carried on the record itself. Evaluation
/// time never enters the comparison, so store latency cannot skew verdicts.
pub fn is_on_time(record: &AnswerRecord, grace_ms: i64) -> bool {
    record.response_time_ms() <= record.time_limit_ms + grace_ms
}

pub fn evaluate_record(
    record: &AnswerRecord,
    correct_answer: &str,
    grace_ms: i64,
) -> AnswerEvaluation {
    AnswerEvaluation {
        is_on_time: is_on_time(record, grace_ms),
        is_correct: normalize_answer(&record.answer_text) == normalize_answer(correct_answer),
    }
}

/// Everything one question's deferred evaluation produces.
pub struct QuestionVerdicts {
    pub survivors: Vec<Uuid>,
    pub eliminated: Vec<Uuid>,
    /// Evaluations to write back onto the stored records.
    pub evaluations: Vec<(Uuid, AnswerEvaluation)>,
    /// Durable reporting rows for players that submitted anything.
    pub rows: Vec<PlayerAnswer>,
}

/// Judge one question: an alive player survives iff they have a record that
/// is both on time and correct; every other case (including no record at
/// all) eliminates them.
pub fn judge_question(
    alive: &[Uuid],
    records: &HashMap<Uuid, AnswerRecord>,
    question: &Question,
    grace_ms: i64,
) -> QuestionVerdicts {
    let mut verdicts = QuestionVerdicts {
        survivors: Vec::new(),
        eliminated: Vec::new(),
        evaluations: Vec::new(),
        rows: Vec::new(),
    };

    for &user_id in alive {
        match records.get(&user_id) {
            None => verdicts.eliminated.push(user_id),
            Some(record) => {
                let eval = evaluate_record(record, &question.correct_answer, grace_ms);
                if eval.is_on_time && eval.is_correct {
                    verdicts.survivors.push(user_id);
                } else {
                    verdicts.eliminated.push(user_id);
                }
                verdicts.evaluations.push((user_id, eval));
                verdicts.rows.push(PlayerAnswer {
                    game_id: question.game_id,
                    user_id,
                    question_id: question.id,
                    selected: record.answer_text.clone(),
                    is_correct: eval.is_correct,
                    response_time_ms: record.response_time_ms(),
                    question_number: question.question_order,
                    submitted_at: DateTime::from_timestamp_millis(record.submitted_at_unix_ms)
                        .unwrap_or_default(),
                });
            }
        }
    }

    verdicts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: &str, options: &[&str]) -> Question {
        Question {
            id: Uuid::new_v4(),
            game_id: Uuid::new_v4(),
            question_order: 0,
            text: "Capital of France?".into(),
            correct_answer: correct.into(),
            options: options.iter().map(|s| s.to_string()).collect(),
            time_limit_ms: 10_000,
        }
    }

    fn record(text: &str, submitted_ms: i64) -> AnswerRecord {
        AnswerRecord::new(text.into(), submitted_ms, 0, 10_000)
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["  Paris!  ", "PARIS", "pa ris", "Côte d'Ivoire", "A-B c"] {
            let once = normalize_answer(raw);
            assert_eq!(normalize_answer(&once), once);
        }
    }

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_answer("  Paris! "), "paris");
        assert_eq!(normalize_answer("NEW   york."), "new york");
    }

    #[test]
    fn buttons_contain_correct_option_exactly_once() {
        let q = question("Paris", &["Paris", "London", "Rome", "Berlin"]);
        for _ in 0..50 {
            let buttons = select_buttons(&q);
            assert_eq!(buttons.len(), 3);
            assert_eq!(buttons.iter().filter(|b| *b == "Paris").count(), 1);
            // The two fillers come from the remaining options, no repeats.
            let mut rest: Vec<&String> = buttons.iter().filter(|b| *b != "Paris").collect();
            rest.sort();
            rest.dedup();
            assert_eq!(rest.len(), 2);
            assert!(rest.iter().all(|b| q.options.contains(b)));
        }
    }

    #[test]
    fn exactly_at_limit_is_on_time() {
        assert!(is_on_time(&record("paris", 10_000), 1_000));
        assert!(is_on_time(&record("paris", 11_000), 1_000));
    }

    #[test]
    fn one_ms_past_grace_is_late() {
        assert!(!is_on_time(&record("paris", 11_001), 1_000));
    }

    #[test]
    fn judge_eliminates_wrong_late_and_missing() {
        let q = question("Paris", &["Paris", "London", "Rome", "Berlin"]);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();

        let mut records = HashMap::new();
        records.insert(a, record("Paris", 3_000));
        records.insert(b, record("London", 4_000));
        records.insert(d, record("Paris", 11_001));

        let verdicts = judge_question(&[a, b, c, d], &records, &q, 1_000);
        assert_eq!(verdicts.survivors, vec![a]);
        assert_eq!(verdicts.eliminated.len(), 3);
        assert!(verdicts.eliminated.contains(&b)); // wrong
        assert!(verdicts.eliminated.contains(&c)); // missing
        assert!(verdicts.eliminated.contains(&d)); // late

        // Reporting rows exist only for submitted answers.
        assert_eq!(verdicts.rows.len(), 3);
        assert!(verdicts.rows.iter().all(|r| r.user_id != c));
    }
}
