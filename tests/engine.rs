// End-to-end engine tests against the in-memory seams: full games driven
// through the event bus, answer ingress, and the outbound queue.

mod common;

use std::time::Duration;

use common::*;
use qrush_be::engine::{AnswerIngress, GameEvent};
use qrush_be::models::GameStatus;
use tokio::time::sleep;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Three players, one question. A answers correctly, B answers wrong, C
/// stays silent: A wins the whole pool, B and C are eliminated.
#[tokio::test(start_paused = true)]
async fn single_winner_takes_the_pool() {
    let h = harness();
    let game = scheduled_game(30.0, 0);
    let gid = game.id;
    h.persistence.add_game(game);
    let (a, b, c) = (player(1), player(2), player(3));
    for p in [&a, &b, &c] {
        h.persistence.add_player(gid, p.clone());
    }
    h.persistence.add_question(question(
        gid,
        0,
        "Capital of France?",
        "Paris",
        ["Paris", "London", "Rome", "Berlin"],
    ));

    h.engine.publish(GameEvent::GameStart { game_id: gid }).await;
    sleep(ms(2_100)).await; // past pre-roll, question 1 is open

    assert_eq!(
        h.engine.submit_answer(a.user_id, "Paris").await,
        AnswerIngress::Stored
    );
    assert_eq!(
        h.engine.submit_answer(b.user_id, "London").await,
        AnswerIngress::Stored
    );

    sleep(ms(12_000)).await; // past limit + grace: evaluated and finalized

    assert!(!h.engine.is_active(gid).await);
    assert_eq!(h.persistence.status_of(gid), Some(GameStatus::Finished));
    assert_eq!(h.persistence.winners_of(gid), Some(vec![a.user_id]));

    let a_msgs = h.transport.bodies_to(&a.handle);
    assert!(a_msgs.iter().any(|m| m == "Q1: Capital of France?"));
    assert!(a_msgs.iter().any(|m| m.contains("You're still in!")));
    assert!(a_msgs.iter().any(|m| m.contains("Prize: $30.00")));

    for loser in [&b, &c] {
        let msgs = h.transport.bodies_to(&loser.handle);
        assert!(msgs.iter().any(|m| m.contains("You're out this game")));
        assert!(msgs.iter().any(|m| m.contains("we have a winner")));
        assert!(!msgs.iter().any(|m| m.contains("Prize: $")));
    }
}

/// Three survivors split $30.00 into $10.00 each, and the winner copy
/// enumerates the split.
#[tokio::test(start_paused = true)]
async fn tie_splits_the_pool_evenly() {
    let h = harness();
    let game = scheduled_game(30.0, 0);
    let gid = game.id;
    h.persistence.add_game(game);
    let players: Vec<_> = (1..=3).map(player).collect();
    for p in &players {
        h.persistence.add_player(gid, p.clone());
    }
    h.persistence.add_question(question(
        gid,
        0,
        "Capital of France?",
        "Paris",
        ["Paris", "London", "Rome", "Berlin"],
    ));

    h.engine.publish(GameEvent::GameStart { game_id: gid }).await;
    sleep(ms(2_100)).await;

    for p in &players {
        assert_eq!(
            h.engine.submit_answer(p.user_id, "Paris").await,
            AnswerIngress::Stored
        );
    }

    // All alive players answered: evaluation runs without the timer.
    sleep(ms(500)).await;

    assert_eq!(h.persistence.status_of(gid), Some(GameStatus::Finished));
    let winners = h.persistence.winners_of(gid).unwrap();
    assert_eq!(winners.len(), 3);

    for p in &players {
        let msgs = h.transport.bodies_to(&p.handle);
        let winner_msg = msgs
            .iter()
            .find(|m| m.contains("Winners:"))
            .expect("winner copy missing");
        assert!(winner_msg.contains("Winners: 3"));
        assert!(winner_msg.contains("Prize pool: $30.00"));
        assert!(winner_msg.contains("Each winner receives: $10.00"));
    }
}

/// A second answer from the same player is refused and answered with the
/// locked-in copy; only one durable row is written.
#[tokio::test(start_paused = true)]
async fn duplicate_answer_is_locked_out() {
    let h = harness();
    let game = scheduled_game(20.0, 0);
    let gid = game.id;
    h.persistence.add_game(game);
    let (a, b) = (player(1), player(2));
    h.persistence.add_player(gid, a.clone());
    h.persistence.add_player(gid, b.clone());
    h.persistence.add_question(question(
        gid,
        0,
        "Capital of France?",
        "Paris",
        ["Paris", "London", "Rome", "Berlin"],
    ));

    h.engine.publish(GameEvent::GameStart { game_id: gid }).await;
    sleep(ms(2_100)).await;

    assert_eq!(
        h.engine.submit_answer(a.user_id, "Paris").await,
        AnswerIngress::Stored
    );
    assert_eq!(
        h.engine.submit_answer(a.user_id, "London").await,
        AnswerIngress::Duplicate
    );

    // The first answer holds the slot.
    let record = h.answers.record(gid, 0, a.user_id).unwrap();
    assert_eq!(record.answer_text, "paris");
    assert_eq!(h.answers.record_count(gid, 0), 1);

    sleep(ms(12_000)).await;

    let msgs = h.transport.bodies_to(&a.handle);
    assert!(msgs.iter().any(|m| m.contains("first answer was locked in")));

    let rows: Vec<_> = h
        .persistence
        .answer_rows()
        .into_iter()
        .filter(|r| r.user_id == a.user_id)
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].selected, "paris");
}

/// When every alive player has answered, evaluation fires without waiting
/// out the timer and the next question follows after the gap.
#[tokio::test(start_paused = true)]
async fn early_completion_cancels_the_timer() {
    let h = harness();
    let game = scheduled_game(10.0, 0);
    let gid = game.id;
    h.persistence.add_game(game);
    let (a, b) = (player(1), player(2));
    h.persistence.add_player(gid, a.clone());
    h.persistence.add_player(gid, b.clone());
    h.persistence.add_question(question(
        gid,
        0,
        "Capital of France?",
        "Paris",
        ["Paris", "London", "Rome", "Berlin"],
    ));
    h.persistence.add_question(question(
        gid,
        1,
        "Largest planet?",
        "Jupiter",
        ["Jupiter", "Mars", "Venus", "Saturn"],
    ));

    h.engine.publish(GameEvent::GameStart { game_id: gid }).await;
    sleep(ms(2_100)).await;

    h.engine.submit_answer(a.user_id, "Paris").await;
    h.engine.submit_answer(b.user_id, "Paris").await;

    // Inter-question gap is 3s; the full timer would be 11s. Seeing the next
    // question this early proves the timer was cancelled.
    sleep(ms(3_500)).await;
    for p in [&a, &b] {
        let msgs = h.transport.bodies_to(&p.handle);
        assert!(
            msgs.iter().any(|m| m == "Q2: Largest planet?"),
            "question 2 not announced early for {}",
            p.handle
        );
    }
}

/// Eliminated players get no further question fan-out and exactly one
/// locked-answers notice per question.
#[tokio::test(start_paused = true)]
async fn eliminated_players_are_excluded_from_fan_out() {
    let h = harness();
    let game = scheduled_game(10.0, 0);
    let gid = game.id;
    h.persistence.add_game(game);
    let (a, b, c) = (player(1), player(2), player(3));
    for p in [&a, &b, &c] {
        h.persistence.add_player(gid, p.clone());
    }
    h.persistence.add_question(question(
        gid,
        0,
        "Capital of France?",
        "Paris",
        ["Paris", "London", "Rome", "Berlin"],
    ));
    h.persistence.add_question(question(
        gid,
        1,
        "Largest planet?",
        "Jupiter",
        ["Jupiter", "Mars", "Venus", "Saturn"],
    ));

    h.engine.publish(GameEvent::GameStart { game_id: gid }).await;
    sleep(ms(2_100)).await;

    h.engine.submit_answer(a.user_id, "Paris").await;
    h.engine.submit_answer(b.user_id, "Paris").await;
    h.engine.submit_answer(c.user_id, "Rome").await;

    sleep(ms(3_500)).await; // question 2 is open now

    let c_msgs = h.transport.bodies_to(&c.handle);
    assert!(c_msgs.iter().any(|m| m == "Q1: Capital of France?"));
    assert!(!c_msgs.iter().any(|m| m.starts_with("Q2:")));

    // C tries to answer anyway: rejected, and noticed exactly once.
    assert_eq!(
        h.engine.submit_answer(c.user_id, "Jupiter").await,
        AnswerIngress::NotAlive
    );
    assert_eq!(
        h.engine.submit_answer(c.user_id, "Jupiter").await,
        AnswerIngress::NotAlive
    );
    sleep(ms(200)).await;
    let notices = h
        .transport
        .bodies_to(&c.handle)
        .iter()
        .filter(|m| m.contains("answers are locked"))
        .count();
    assert_eq!(notices, 1);
}

/// The question index advances by exactly one per completed question.
#[tokio::test(start_paused = true)]
async fn question_index_advances_monotonically() {
    let h = harness();
    let game = scheduled_game(10.0, 0);
    let gid = game.id;
    h.persistence.add_game(game);
    let (a, b) = (player(1), player(2));
    h.persistence.add_player(gid, a.clone());
    h.persistence.add_player(gid, b.clone());
    for (i, (text, correct)) in [
        ("Capital of France?", "Paris"),
        ("Largest planet?", "Jupiter"),
        ("Chemical symbol for gold?", "Au"),
    ]
    .iter()
    .enumerate()
    {
        h.persistence.add_question(question(
            gid,
            i as i32,
            text,
            correct,
            [*correct, "London", "Rome", "Berlin"],
        ));
    }

    h.engine.publish(GameEvent::GameStart { game_id: gid }).await;

    for answer in ["Paris", "Jupiter", "Au"] {
        sleep(ms(3_600)).await; // pre-roll or gap, plus slack
        h.engine.submit_answer(a.user_id, answer).await;
        h.engine.submit_answer(b.user_id, answer).await;
        sleep(ms(500)).await;
    }

    assert_eq!(h.persistence.question_indexes(), vec![0, 1, 2]);
    assert_eq!(h.persistence.status_of(gid), Some(GameStatus::Finished));
    assert_eq!(h.persistence.winners_of(gid).unwrap().len(), 2);
}

/// A sustained answer-store outage at evaluation cancels the game with an
/// apology to everyone; no durable rows are written for the failed question.
#[tokio::test(start_paused = true)]
async fn store_outage_at_evaluation_cancels_the_game() {
    let h = harness();
    let game = scheduled_game(25.0, 0);
    let gid = game.id;
    h.persistence.add_game(game);
    let players: Vec<_> = (1..=3).map(player).collect();
    for p in &players {
        h.persistence.add_player(gid, p.clone());
    }
    h.persistence.add_question(question(
        gid,
        0,
        "Capital of France?",
        "Paris",
        ["Paris", "London", "Rome", "Berlin"],
    ));

    h.engine.publish(GameEvent::GameStart { game_id: gid }).await;
    sleep(ms(2_100)).await;

    h.engine.submit_answer(players[0].user_id, "Paris").await;
    h.answers.fail_scans(true);

    sleep(ms(13_000)).await; // timer fires, three scan attempts fail

    assert!(h.persistence.was_cancelled(gid));
    assert!(!h.engine.is_active(gid).await);
    assert!(h.persistence.answer_rows().is_empty());
    for p in &players {
        let msgs = h.transport.bodies_to(&p.handle);
        assert!(
            msgs.iter().any(|m| m.contains("had to end the game early")),
            "apology missing for {}",
            p.handle
        );
    }
}

/// A store rejection on the write path answers the player with retry copy
/// and stores nothing.
#[tokio::test(start_paused = true)]
async fn store_rejection_asks_the_player_to_retry() {
    let h = harness();
    let game = scheduled_game(25.0, 0);
    let gid = game.id;
    h.persistence.add_game(game);
    let (a, b) = (player(1), player(2));
    h.persistence.add_player(gid, a.clone());
    h.persistence.add_player(gid, b.clone());
    h.persistence.add_question(question(
        gid,
        0,
        "Capital of France?",
        "Paris",
        ["Paris", "London", "Rome", "Berlin"],
    ));

    h.engine.publish(GameEvent::GameStart { game_id: gid }).await;
    sleep(ms(2_100)).await;

    h.answers.fail_puts(true);
    assert_eq!(
        h.engine.submit_answer(a.user_id, "Paris").await,
        AnswerIngress::StoreRejected
    );
    h.answers.fail_puts(false);

    sleep(ms(200)).await;
    let msgs = h.transport.bodies_to(&a.handle);
    assert!(msgs.iter().any(|m| m.contains("try again")));
    assert_eq!(h.answers.record_count(gid, 0), 0);
}

/// Emergency end is honored at the next mailbox poll: the game cancels
/// mid-question and everyone hears about it.
#[tokio::test(start_paused = true)]
async fn emergency_end_cancels_mid_question() {
    let h = harness();
    let game = scheduled_game(25.0, 0);
    let gid = game.id;
    h.persistence.add_game(game);
    let (a, b) = (player(1), player(2));
    h.persistence.add_player(gid, a.clone());
    h.persistence.add_player(gid, b.clone());
    h.persistence.add_question(question(
        gid,
        0,
        "Capital of France?",
        "Paris",
        ["Paris", "London", "Rome", "Berlin"],
    ));

    h.engine.publish(GameEvent::GameStart { game_id: gid }).await;
    sleep(ms(2_100)).await;

    h.engine
        .publish(GameEvent::EmergencyEnd { game_id: gid })
        .await;
    sleep(ms(500)).await;

    assert!(h.persistence.was_cancelled(gid));
    assert!(!h.engine.is_active(gid).await);
    for p in [&a, &b] {
        let msgs = h.transport.bodies_to(&p.handle);
        assert!(msgs.iter().any(|m| m.contains("had to end the game early")));
    }
}

/// The bus is the transition authority: a `questionTimeout` published for
/// the open question evaluates it immediately, while one for a stale index
/// fails its phase check and changes nothing.
#[tokio::test(start_paused = true)]
async fn question_timeout_event_drives_evaluation() {
    let h = harness();
    let game = scheduled_game(15.0, 0);
    let gid = game.id;
    h.persistence.add_game(game);
    let (a, b) = (player(1), player(2));
    h.persistence.add_player(gid, a.clone());
    h.persistence.add_player(gid, b.clone());
    h.persistence.add_question(question(
        gid,
        0,
        "Capital of France?",
        "Paris",
        ["Paris", "London", "Rome", "Berlin"],
    ));

    h.engine.publish(GameEvent::GameStart { game_id: gid }).await;
    sleep(ms(2_100)).await;

    // Wrong index: ignored, the question stays open.
    h.engine
        .publish(GameEvent::QuestionTimeout {
            game_id: gid,
            index: 7,
        })
        .await;
    sleep(ms(100)).await;
    assert!(h.engine.is_active(gid).await);
    assert_eq!(h.persistence.status_of(gid), Some(GameStatus::InProgress));

    // Matching index: evaluation runs now, far inside the 11s window.
    // Nobody answered, so both players fall and the game ends winnerless.
    h.engine
        .publish(GameEvent::QuestionTimeout {
            game_id: gid,
            index: 0,
        })
        .await;
    sleep(ms(500)).await;
    assert!(!h.engine.is_active(gid).await);
    assert_eq!(h.persistence.status_of(gid), Some(GameStatus::Finished));
    assert_eq!(h.persistence.winners_of(gid), Some(vec![]));
    for p in [&a, &b] {
        let msgs = h.transport.bodies_to(&p.handle);
        assert!(msgs.iter().any(|m| m.contains("You're out this game")));
    }
}

/// The conditional write admits exactly one record per player per question
/// under concurrent submissions.
#[tokio::test]
async fn concurrent_submissions_store_exactly_one_record() {
    use qrush_be::models::answer::AnswerRecord;
    use qrush_be::store::{AnswerStore, PutOutcome};
    use std::sync::Arc;
    use uuid::Uuid;

    let store = Arc::new(MemoryAnswerStore::default());
    let game_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let mut tasks = Vec::new();
    for n in 0..20 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store
                .put(
                    game_id,
                    0,
                    user_id,
                    AnswerRecord::new(format!("answer {n}"), n, 0, 10_000),
                )
                .await
                .unwrap()
        }));
    }

    let mut stored = 0;
    for task in tasks {
        if matches!(task.await.unwrap(), PutOutcome::Stored) {
            stored += 1;
        }
    }
    assert_eq!(stored, 1);
    assert_eq!(store.record_count(game_id, 0), 1);
}
