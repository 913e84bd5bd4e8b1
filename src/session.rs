// Per-match session state
//
// One entry per running match, keyed by game id. Entries are created the
// first time a match is seen and removed when it ends. A missing entry is
// rebuilt from the current request, so losing one only costs history.

use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::rules::Rules;
use crate::types::GameState;

/// Tracks when the safe area shrinks next.
///
/// Royale games announce the period in the ruleset. Other maps that grow
/// their hazards on a fixed cadence are learned from observed changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardSchedule {
    pub shrink_every_n_turns: u32,
    pub last_hazard_count: usize,
    pub last_change_turn: Option<i32>,
    /// Gap between the last two observed expansions
    pub observed_period: Option<i32>,
}

impl HazardSchedule {
    pub fn new(rules: &Rules, hazard_count: usize) -> Self {
        HazardSchedule {
            shrink_every_n_turns: rules.shrink_every_n_turns,
            last_hazard_count: hazard_count,
            last_change_turn: None,
            observed_period: None,
        }
    }

    /// Records the hazard count seen on `turn`
    pub fn observe(&mut self, turn: i32, hazard_count: usize) {
        if hazard_count > self.last_hazard_count {
            if let Some(prev) = self.last_change_turn {
                if turn > prev {
                    self.observed_period = Some(turn - prev);
                }
            }
            self.last_change_turn = Some(turn);
        }
        self.last_hazard_count = hazard_count;
    }

    /// First turn after `turn` on which hazards are expected to grow
    pub fn next_expansion_turn(&self, turn: i32) -> Option<i32> {
        if self.shrink_every_n_turns > 0 {
            let n = self.shrink_every_n_turns as i32;
            return Some((turn / n + 1) * n);
        }
        let (last, period) = (self.last_change_turn?, self.observed_period?);
        if period <= 0 {
            return None;
        }
        let mut next = last + period;
        while next <= turn {
            next += period;
        }
        Some(next)
    }

    pub fn turns_until_expansion(&self, turn: i32) -> Option<i32> {
        self.next_expansion_turn(turn).map(|t| t - turn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSession {
    pub hazard_schedule: HazardSchedule,
    pub first_seen_turn: i32,
    pub last_turn: i32,
}

impl MatchSession {
    pub fn from_game_state(state: &GameState, rules: &Rules) -> Self {
        MatchSession {
            hazard_schedule: HazardSchedule::new(rules, state.board.hazards.len()),
            first_seen_turn: state.turn,
            last_turn: state.turn,
        }
    }
}

/// Key-value store of running matches
pub trait SessionStore: Send + Sync {
    fn get(&self, game_id: &str) -> Option<MatchSession>;
    fn put(&self, game_id: &str, session: MatchSession);
    fn remove(&self, game_id: &str) -> Option<MatchSession>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, MatchSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, game_id: &str) -> Option<MatchSession> {
        self.sessions.read().get(game_id).cloned()
    }

    fn put(&self, game_id: &str, session: MatchSession) {
        self.sessions.write().insert(game_id.to_string(), session);
    }

    fn remove(&self, game_id: &str) -> Option<MatchSession> {
        self.sessions.write().remove(game_id)
    }

    fn len(&self) -> usize {
        self.sessions.read().len()
    }
}

/// Loads (or lazily creates) the session for this request's match, folds in
/// what this turn shows and stores it back.
pub fn observe_turn(store: &dyn SessionStore, state: &GameState, rules: &Rules) -> MatchSession {
    let game_id = state.game.id.as_str();
    let mut session = match store.get(game_id) {
        Some(s) => s,
        None => {
            if state.turn > 0 {
                warn!(
                    "No session for game {} at turn {}, rebuilding from current state",
                    game_id, state.turn
                );
            } else {
                debug!("Opening session for game {}", game_id);
            }
            MatchSession::from_game_state(state, rules)
        }
    };

    session
        .hazard_schedule
        .observe(state.turn, state.board.hazards.len());
    session.last_turn = state.turn;
    store.put(game_id, session.clone());
    session
}
