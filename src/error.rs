// Engine error taxonomy
//
// Only malformed input is an error. Running out of time and having no legal
// move are normal outcomes handled by the search.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("snake '{0}' has an empty body")]
    EmptyBody(String),
    #[error("snake '{0}' not found on the board")]
    SnakeNotFound(String),
    #[error("invalid board dimensions {width}x{height}")]
    InvalidBoard { width: i32, height: i32 },
    #[error("too many snakes on the board: {0}")]
    TooManySnakes(usize),
    #[error("board of {0} cells is too large to analyse")]
    BoardTooLarge(usize),
}
