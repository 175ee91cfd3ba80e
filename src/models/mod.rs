pub mod answer;
pub mod game;
pub mod game_player;
pub mod keys;
pub mod player_answer;
pub mod question;
pub mod user;

pub use answer::AnswerRecord;
pub use game::{Game, GameStatus};
pub use game_player::{GamePlayer, PlayerStatus};
pub use keys::RedisKey;
pub use player_answer::PlayerAnswer;
pub use question::Question;
pub use user::User;
