use serde::Serialize;

use crate::transport::Button;

/// Delivery urgency. Question fan-out and results go out high; ack chatter
/// goes out normal; informational copy can wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    High,
    Normal,
    Low,
}

/// One outbound message kind per user-visible situation. The copy lives in
/// `render`, so message content stays data all the way to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Free-form operator text.
    Text { body: String },
    /// Pre-game announcement sent on game start.
    GameStarting {
        total_questions: usize,
        prize_pool: f64,
    },
    /// A question with its three shuffled reply options. `number` is the
    /// 1-based user-facing ordinal.
    Question {
        number: usize,
        text: String,
        options: Vec<String>,
    },
    /// Player answered correctly and in time.
    Survived { correct_answer: String },
    /// Player answered wrong, late, or not at all.
    Eliminated { correct_answer: String },
    /// Sole survivor's prize message.
    WinnerSingle { prize: f64 },
    /// Split-pot prize message.
    WinnerMany {
        winners: usize,
        prize_pool: f64,
        individual_prize: f64,
    },
    /// End-of-game copy for players who did not win.
    GameOver,
    /// Neutral receipt for a stored answer.
    AnswerReceived,
    /// The player already has an answer locked in for this question.
    AnswerLocked,
    /// An eliminated player tried to answer.
    AlreadyOut,
    /// The answer store rejected the write; ask the player to resend.
    TryAgain,
    /// Registration confirmation for the next scheduled game.
    JoinConfirmed,
    /// Operator help copy.
    Help,
    /// There is no scheduled game to join or answer in.
    NoGame,
    /// The game had to be abandoned.
    Apology,
}

/// A message rendered to transport shape: a body and, when non-empty, reply
/// buttons.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub body: String,
    pub buttons: Vec<Button>,
}

impl OutboundMessage {
    pub fn render(&self) -> Rendered {
        match self {
            OutboundMessage::Text { body } => plain(body.clone()),
            OutboundMessage::GameStarting {
                total_questions,
                prize_pool,
            } => plain(format!(
                "🎮 The game is starting now!\n\n{total_questions} questions stand between \
                 you and the 💰 ${} prize pool. One wrong or late answer and you're out. \
                 Good luck!",
                money(*prize_pool)
            )),
            OutboundMessage::Question {
                number,
                text,
                options,
            } => Rendered {
                body: format!("Q{number}: {text}"),
                buttons: options
                    .iter()
                    .enumerate()
                    .map(|(i, title)| Button::numbered(i, title.clone()))
                    .collect(),
            },
            OutboundMessage::Survived { correct_answer } => plain(format!(
                "✅ Correct Answer: {correct_answer}\n\n🎉 You're still in!"
            )),
            OutboundMessage::Eliminated { correct_answer } => plain(format!(
                "❌ Correct Answer: {correct_answer}\n\n💀 You're out this game. \
                 Stick around for the final results!"
            )),
            OutboundMessage::WinnerSingle { prize } => plain(format!(
                "🏆 Game over — we have a winner!\n\n💰 Prize: ${}\n\nCongratulations, \
                 the pot is all yours!",
                money(*prize)
            )),
            OutboundMessage::WinnerMany {
                winners,
                prize_pool,
                individual_prize,
            } => plain(format!(
                "🏆 Game over!\n\n👑 Winners: {winners}\n💰 Prize pool: ${}\n💵 Each \
                 winner receives: ${}",
                money(*prize_pool),
                money(*individual_prize)
            )),
            OutboundMessage::GameOver => plain(
                "🏁 Game over — we have a winner!\n\nThanks for playing. Stick around \
                 for the next game!"
                    .to_string(),
            ),
            OutboundMessage::AnswerReceived => {
                plain("🔒 Answer received. Await the next round!".to_string())
            }
            OutboundMessage::AnswerLocked => {
                plain("Your first answer was locked in.".to_string())
            }
            OutboundMessage::AlreadyOut => plain(
                "💀 You've been eliminated from this game, so answers are locked. \
                 Stick around for the results!"
                    .to_string(),
            ),
            OutboundMessage::TryAgain => plain(
                "😬 We couldn't record that answer. Please try again.".to_string(),
            ),
            OutboundMessage::JoinConfirmed => plain(
                "✅ You're in! We'll message you here the moment the game starts."
                    .to_string(),
            ),
            OutboundMessage::Help => plain(
                "ℹ️ QRush trivia: reply JOIN to enter the next scheduled game. When a \
                 question arrives, tap one answer before the timer runs out. Wrong, \
                 late, or missing answers are eliminated; the last players standing \
                 split the prize pool."
                    .to_string(),
            ),
            OutboundMessage::NoGame => plain(
                "😴 There's no game scheduled right now. Watch this space for the next \
                 announcement!"
                    .to_string(),
            ),
            OutboundMessage::Apology => plain(
                "🙏 Sorry, we hit a technical problem and had to end the game early. \
                 Stay tuned for the next one."
                    .to_string(),
            ),
        }
    }
}

fn plain(body: String) -> Rendered {
    Rendered {
        body,
        buttons: Vec::new(),
    }
}

fn money(amount: f64) -> String {
    format!("{amount:.2}")
}
