// Simulation state
//
// A compact, owned copy of a game position. The search clones these freely
// and never mutates a state it was handed; every successor is a new value.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::EngineError;
use crate::rules::{Rules, MAX_HEALTH};
use crate::types::{Coord, GameState};

pub const MAX_SNAKES: usize = 16;
/// Largest board the spatial index will allocate
pub const MAX_BOARD_CELLS: usize = 1 << 16;

/// Why a snake left the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Elimination {
    Starvation,
    Wall,
    SelfCollision,
    /// Ran into the body of the snake with this index
    BodyCollision(usize),
    /// Lost (or tied) a head-to-head against the snake with this index
    HeadToHead(usize),
    /// A squad mate was eliminated under shared elimination
    Squad,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Snake {
    /// Head first, tail last. A snake that has just eaten repeats its tail.
    pub body: Vec<Coord>,
    pub health: i32,
    pub eliminated: Option<Elimination>,
    /// Set by the simulator when the last move landed on food
    pub ate: bool,
    pub squad: Option<u8>,
}

impl Snake {
    pub fn new(body: Vec<Coord>, health: i32) -> Self {
        Snake {
            body,
            health,
            eliminated: None,
            ate: false,
            squad: None,
        }
    }

    pub fn head(&self) -> Coord {
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn is_alive(&self) -> bool {
        self.eliminated.is_none()
    }

    /// The segment right behind the head, if it occupies a different cell
    pub fn neck(&self) -> Option<Coord> {
        self.body.get(1).copied().filter(|&n| n != self.head())
    }

    /// True when the tail cell is held twice, so it stays occupied next turn
    pub fn has_stacked_tail(&self) -> bool {
        let n = self.body.len();
        n >= 2 && self.body[n - 1] == self.body[n - 2]
    }

    pub fn is_teammate(&self, other: &Snake) -> bool {
        matches!((self.squad, other.squad), (Some(a), Some(b)) if a == b)
    }
}

#[derive(Debug, Clone)]
pub struct SimState {
    pub width: i32,
    pub height: i32,
    pub turn: i32,
    pub food: Vec<Coord>,
    /// Hazard cells. A coordinate listed more than once is a stacked hazard.
    pub hazards: Vec<Coord>,
    pub snakes: Vec<Snake>,
    /// Index of the snake this engine controls
    pub you: usize,
    pub rules: Arc<Rules>,
    /// Win conditions only apply to games that started with several snakes
    pub multiplayer: bool,
    ids: Arc<Vec<String>>,
}

impl SimState {
    /// Builds a simulation state from an API snapshot.
    /// Fails fast on structurally impossible input.
    pub fn from_game_state(state: &GameState, max_hazard_stack: u8) -> Result<Self, EngineError> {
        let board = &state.board;
        if board.width <= 0 || board.height <= 0 {
            return Err(EngineError::InvalidBoard {
                width: board.width,
                height: board.height,
            });
        }
        match (board.width as usize).checked_mul(board.height as usize) {
            Some(cells) if cells <= MAX_BOARD_CELLS => {}
            Some(cells) => return Err(EngineError::BoardTooLarge(cells)),
            None => {
                return Err(EngineError::InvalidBoard {
                    width: board.width,
                    height: board.height,
                })
            }
        }
        if board.snakes.len() > MAX_SNAKES {
            return Err(EngineError::TooManySnakes(board.snakes.len()));
        }

        let mut squads: HashMap<&str, u8> = HashMap::new();
        let mut snakes = Vec::with_capacity(board.snakes.len());
        let mut ids = Vec::with_capacity(board.snakes.len());

        for snake in &board.snakes {
            if snake.body.is_empty() {
                return Err(EngineError::EmptyBody(snake.id.clone()));
            }
            let squad = if snake.squad.is_empty() {
                None
            } else {
                let next = squads.len() as u8;
                Some(*squads.entry(snake.squad.as_str()).or_insert(next))
            };
            snakes.push(Snake {
                body: snake.body.clone(),
                health: snake.health.clamp(0, MAX_HEALTH),
                eliminated: None,
                ate: false,
                squad,
            });
            ids.push(snake.id.clone());
        }

        let you = board
            .snakes
            .iter()
            .position(|s| s.id == state.you.id)
            .ok_or_else(|| EngineError::SnakeNotFound(state.you.id.clone()))?;

        Ok(SimState {
            width: board.width,
            height: board.height,
            turn: state.turn,
            food: board.food.clone(),
            hazards: board.hazards.clone(),
            multiplayer: snakes.len() > 1,
            snakes,
            you,
            rules: Arc::new(Rules::from_game(&state.game, max_hazard_stack)),
            ids: Arc::new(ids),
        })
    }

    /// Builds a state directly from snakes, for local games and tests
    pub fn new(
        width: i32,
        height: i32,
        snakes: Vec<Snake>,
        food: Vec<Coord>,
        hazards: Vec<Coord>,
        rules: Rules,
    ) -> Self {
        let ids = (0..snakes.len()).map(|i| format!("snake-{}", i)).collect();
        SimState {
            width,
            height,
            turn: 0,
            food,
            hazards,
            multiplayer: snakes.len() > 1,
            snakes,
            you: 0,
            rules: Arc::new(rules),
            ids: Arc::new(ids),
        }
    }

    /// The next-turn position holding the given (already moved) snakes
    pub fn successor(&self, snakes: Vec<Snake>) -> Self {
        SimState {
            width: self.width,
            height: self.height,
            turn: self.turn + 1,
            food: self.food.clone(),
            hazards: self.hazards.clone(),
            snakes,
            you: self.you,
            rules: Arc::clone(&self.rules),
            multiplayer: self.multiplayer,
            ids: Arc::clone(&self.ids),
        }
    }

    /// The same position seen from another snake's point of view
    pub fn with_you(&self, you: usize) -> Self {
        let mut state = self.clone();
        state.you = you;
        state
    }

    pub fn snake_id(&self, idx: usize) -> &str {
        &self.ids[idx]
    }

    pub fn live_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.snakes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_alive())
            .map(|(i, _)| i)
    }

    pub fn live_count(&self) -> usize {
        self.snakes.iter().filter(|s| s.is_alive()).count()
    }

    /// A position is terminal once our snake is gone, or once at most one
    /// snake remains in a multiplayer game.
    pub fn is_terminal(&self) -> bool {
        if !self.snakes[self.you].is_alive() {
            return true;
        }
        self.multiplayer && self.live_count() <= 1
    }

    /// Maps a possibly off-board coordinate onto the board for wrapped
    /// rulesets; `None` means the coordinate is a wall.
    pub fn normalize(&self, c: Coord) -> Option<Coord> {
        if self.rules.wrapped {
            Some(Coord {
                x: c.x.rem_euclid(self.width),
                y: c.y.rem_euclid(self.height),
            })
        } else if c.x < 0 || c.y < 0 || c.x >= self.width || c.y >= self.height {
            None
        } else {
            Some(c)
        }
    }

    /// Cheap structural fingerprint used to key the search memo table.
    /// Covers every field that influences simulation or evaluation.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.turn.hash(&mut hasher);
        self.food.hash(&mut hasher);
        self.hazards.hash(&mut hasher);
        for snake in &self.snakes {
            snake.is_alive().hash(&mut hasher);
            if snake.is_alive() {
                snake.health.hash(&mut hasher);
                snake.ate.hash(&mut hasher);
                snake.body.hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Battlesnake, Board, Game};

    fn wire_snake(id: &str, body: Vec<Coord>) -> Battlesnake {
        Battlesnake {
            id: id.to_string(),
            name: id.to_string(),
            health: 90,
            head: body.first().copied().unwrap_or(Coord::new(0, 0)),
            length: body.len() as i32,
            body,
            latency: "0".to_string(),
            shout: None,
            squad: String::new(),
        }
    }

    fn game_state(snakes: Vec<Battlesnake>, you: &str) -> GameState {
        let you = snakes.iter().find(|s| s.id == you).cloned().unwrap_or_else(|| wire_snake(you, vec![]));
        GameState {
            game: Game::default(),
            turn: 7,
            board: Board {
                height: 11,
                width: 11,
                food: vec![],
                snakes,
                hazards: vec![],
            },
            you,
        }
    }

    #[test]
    fn test_empty_body_fails_fast() {
        let gs = game_state(
            vec![
                wire_snake("a", vec![Coord::new(1, 1), Coord::new(1, 0)]),
                wire_snake("b", vec![]),
            ],
            "a",
        );
        assert_eq!(
            SimState::from_game_state(&gs, 4).unwrap_err(),
            EngineError::EmptyBody("b".to_string())
        );
    }

    #[test]
    fn test_huge_board_rejected_before_allocation() {
        let mut gs = game_state(vec![wire_snake("a", vec![Coord::new(1, 1)])], "a");
        gs.board.width = 50_000;
        gs.board.height = 50_000;
        assert_eq!(
            SimState::from_game_state(&gs, 4).unwrap_err(),
            EngineError::BoardTooLarge(2_500_000_000)
        );

        gs.board.width = 256;
        gs.board.height = 256;
        assert!(SimState::from_game_state(&gs, 4).is_ok());
        gs.board.height = 257;
        assert!(matches!(
            SimState::from_game_state(&gs, 4),
            Err(EngineError::BoardTooLarge(_))
        ));
    }

    #[test]
    fn test_missing_you_is_an_error() {
        let gs = game_state(vec![wire_snake("a", vec![Coord::new(1, 1)])], "ghost");
        assert!(matches!(
            SimState::from_game_state(&gs, 4),
            Err(EngineError::SnakeNotFound(_))
        ));
    }

    #[test]
    fn test_you_index_resolved_by_id() {
        let gs = game_state(
            vec![
                wire_snake("a", vec![Coord::new(1, 1), Coord::new(1, 0)]),
                wire_snake("b", vec![Coord::new(5, 5), Coord::new(5, 4)]),
            ],
            "b",
        );
        let state = SimState::from_game_state(&gs, 4).unwrap();
        assert_eq!(state.you, 1);
        assert_eq!(state.snake_id(1), "b");
        assert!(state.multiplayer);
        assert_eq!(state.turn, 7);
    }

    #[test]
    fn test_fingerprint_tracks_bodies() {
        let rules = Rules::default();
        let a = SimState::new(
            11,
            11,
            vec![Snake::new(vec![Coord::new(2, 2), Coord::new(2, 1), Coord::new(2, 0)], 90)],
            vec![],
            vec![],
            rules.clone(),
        );
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.snakes[0].body[2] = Coord::new(1, 1);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_stacked_tail_detection() {
        let fed = Snake::new(vec![Coord::new(3, 3), Coord::new(3, 2), Coord::new(3, 2)], 100);
        assert!(fed.has_stacked_tail());
        let spawn = Snake::new(vec![Coord::new(1, 1); 3], 100);
        assert!(spawn.has_stacked_tail());
        assert_eq!(spawn.neck(), None);
    }
}
