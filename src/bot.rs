// Move decision entry points
//
// `Bot::decide` is the synchronous decision call. `Bot::get_move` wraps the
// same search for the HTTP layer: the CPU-bound work runs on a blocking
// thread and publishes every completed depth through lock-free atomics, while
// the async side polls until the budget runs out and answers with whatever
// is best at that moment.

use log::{info, warn};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::board2d::Board2d;
use crate::config::Config;
use crate::debug_logger::DebugLogger;
use crate::error::EngineError;
use crate::search::{Deadline, SearchResult, Searcher};
use crate::session::{self, InMemorySessionStore, SessionStore};
use crate::state::SimState;
use crate::tactics::Tactics;
use crate::types::{Direction, GameState};

/// Longest shout the game server accepts
const MAX_SHOUT_LEN: usize = 256;

/// What the engine answers for one turn
#[derive(Debug, Clone, PartialEq)]
pub struct MoveDecision {
    pub direction: Direction,
    pub score: f64,
    pub depth: u8,
    pub rationale: String,
}

impl From<SearchResult> for MoveDecision {
    fn from(r: SearchResult) -> Self {
        MoveDecision {
            direction: r.direction,
            score: r.score,
            depth: r.depth,
            rationale: r.rationale,
        }
    }
}

/// Lock-free shared state for communication between async poller and computation engine
#[derive(Debug)]
pub struct SharedSearchState {
    /// Best move found so far (encoded as direction index)
    best_move: AtomicU8,
    /// Best score for our snake, as f64 bits
    best_score: AtomicU64,
    /// Deepest completed iteration
    current_depth: AtomicU8,
    /// Flag indicating search completion
    search_complete: AtomicBool,
    rationale: Mutex<String>,
}

impl SharedSearchState {
    /// Starts out holding `initial` so the poller always has an answer
    pub fn new(initial: Direction) -> Self {
        SharedSearchState {
            best_move: AtomicU8::new(initial.index()),
            best_score: AtomicU64::new(f64::NEG_INFINITY.to_bits()),
            current_depth: AtomicU8::new(0),
            search_complete: AtomicBool::new(false),
            rationale: Mutex::new(format!("{} before any search completed", initial.as_str())),
        }
    }

    pub fn publish(&self, result: &SearchResult) {
        *self.rationale.lock() = result.rationale.clone();
        self.best_score.store(result.score.to_bits(), Ordering::Release);
        self.current_depth.store(result.depth, Ordering::Release);
        self.best_move.store(result.direction.index(), Ordering::Release);
    }

    pub fn mark_complete(&self) {
        self.search_complete.store(true, Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.search_complete.load(Ordering::Acquire)
    }

    pub fn get_best(&self) -> MoveDecision {
        MoveDecision {
            direction: Direction::from_index(self.best_move.load(Ordering::Acquire)),
            score: f64::from_bits(self.best_score.load(Ordering::Acquire)),
            depth: self.current_depth.load(Ordering::Acquire),
            rationale: self.rationale.lock().clone(),
        }
    }
}

/// Battlesnake Bot with OOP-style API
/// Takes static configuration dependencies and exposes methods corresponding to API endpoints
pub struct Bot {
    config: Config,
    searcher: Arc<Searcher>,
    sessions: Arc<dyn SessionStore>,
    debug_logger: DebugLogger,
}

impl Bot {
    /// Creates a new Bot instance with an in-memory session store and no
    /// debug log
    pub fn new(config: Config) -> Self {
        Self::with_parts(config, Arc::new(InMemorySessionStore::new()), DebugLogger::disabled())
    }

    pub fn with_parts(
        config: Config,
        sessions: Arc<dyn SessionStore>,
        debug_logger: DebugLogger,
    ) -> Self {
        Bot {
            searcher: Arc::new(Searcher::new(&config)),
            config,
            sessions,
            debug_logger,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Returns bot metadata and appearance
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        info!("INFO");

        json!({
            "apiversion": "1",
            "author": "ksiopiolosz-aterlo",
            "color": "#00DEAD",
            "head": "default",
            "tail": "default",
            "version": env!("CARGO_PKG_VERSION"),
        })
    }

    /// Called when a game starts
    /// Corresponds to POST /start endpoint
    pub fn start(&self, state: &GameState) {
        info!(
            "GAME START {} ({} on {}, {} snakes)",
            state.game.id,
            state.game.ruleset.name,
            state.game.map,
            state.board.snakes.len()
        );
        match SimState::from_game_state(state, self.config.game_rules.max_hazard_stack) {
            Ok(sim) => {
                session::observe_turn(self.sessions.as_ref(), state, &sim.rules);
            }
            Err(e) => warn!("Game {} started with an unusable board: {}", state.game.id, e),
        }
    }

    /// Called when a game ends
    /// Corresponds to POST /end endpoint
    pub fn end(&self, state: &GameState) {
        let won = state.board.snakes.iter().any(|s| s.id == state.you.id);
        info!(
            "GAME OVER {} at turn {} ({})",
            state.game.id,
            state.turn,
            if won { "survived" } else { "eliminated" }
        );
        if self.sessions.remove(&state.game.id).is_none() {
            warn!("No session to release for game {}", state.game.id);
        }
    }

    /// Chooses a move synchronously, searching until the budget derived from
    /// the game's timeout runs out.
    pub fn decide(&self, state: &GameState, start: Instant) -> Result<MoveDecision, EngineError> {
        let sim = SimState::from_game_state(state, self.config.game_rules.max_hazard_stack)?;
        let session = session::observe_turn(self.sessions.as_ref(), state, &sim.rules);
        self.warn_if_territory_unavailable(&sim);
        let deadline = Deadline::new(start, self.budget_ms(state));

        let result = self
            .searcher
            .choose_move(&sim, Some(&session.hazard_schedule), &deadline, |_| {});
        info!(
            "Turn {}: Chose {} (score: {:.1}, depth: {}, time: {}ms)",
            state.turn,
            result.direction.as_str(),
            result.score,
            result.depth,
            deadline.elapsed_ms()
        );
        Ok(result.into())
    }

    /// Computes and returns the next move
    /// Corresponds to POST /move endpoint
    ///
    /// 1. Spawns the search on a blocking thread
    /// 2. Polls the shared state until the budget is spent or the search ends
    /// 3. Returns the best move completed so far (anytime property)
    ///
    /// Never fails: malformed requests are answered with a fallback move.
    pub async fn get_move(&self, state: &GameState) -> Value {
        let start_time = Instant::now();
        info!("Turn {}: Computing move", state.turn);

        let sim = match SimState::from_game_state(state, self.config.game_rules.max_hazard_stack) {
            Ok(sim) => sim,
            Err(e) => {
                let fallback = wire_fallback(state);
                warn!(
                    "Turn {}: {}; answering fallback {}",
                    state.turn,
                    e,
                    fallback.as_str()
                );
                return json!({ "move": fallback.as_str(), "shout": "fallback" });
            }
        };
        let session = session::observe_turn(self.sessions.as_ref(), state, &sim.rules);
        self.warn_if_territory_unavailable(&sim);

        let budget = self.budget_ms(state);
        let deadline = Deadline::new(start_time, budget);
        let shared = Arc::new(SharedSearchState::new(tactical_fallback(&sim)));

        let shared_clone = shared.clone();
        let searcher = self.searcher.clone();
        let schedule = session.hazard_schedule;
        tokio::task::spawn_blocking(move || {
            searcher.choose_move(&sim, Some(&schedule), &deadline, |r| shared_clone.publish(r));
            shared_clone.mark_complete();
        });

        let polling_interval = Duration::from_millis(self.config.timing.polling_interval_ms.max(1));
        loop {
            tokio::time::sleep(polling_interval).await;
            if shared.is_complete() || start_time.elapsed().as_millis() as u64 >= budget {
                break;
            }
        }

        let decision = shared.get_best();
        info!(
            "Turn {}: Chose {} (score: {:.1}, depth: {}, time: {}ms)",
            state.turn,
            decision.direction.as_str(),
            decision.score,
            decision.depth,
            start_time.elapsed().as_millis()
        );
        self.debug_logger.log_move(state.clone(), &decision);

        json!({
            "move": decision.direction.as_str(),
            "shout": truncate_shout(&decision.rationale),
        })
    }

    fn budget_ms(&self, state: &GameState) -> u64 {
        self.config.timing.budget_for_timeout(state.game.timeout as u64)
    }

    fn warn_if_territory_unavailable(&self, sim: &SimState) {
        let cells = (sim.width as usize) * (sim.height as usize);
        if cells > self.config.territory.max_cells {
            warn!(
                "Board of {} cells exceeds territory limit {}, evaluating without territory",
                cells, self.config.territory.max_cells
            );
        }
    }
}

/// Best tactical move for our snake, used until the first iteration completes
pub fn tactical_fallback(sim: &SimState) -> Direction {
    let board = Board2d::new(sim);
    let tactics = Tactics::new(sim, &board);
    tactics
        .candidate_moves(sim.you)
        .first()
        .map(|&(d, _)| d)
        .unwrap_or(Direction::Up)
}

/// Move for requests the engine cannot model: the first direction that stays
/// on the board and does not reverse into the neck
pub fn wire_fallback(state: &GameState) -> Direction {
    let body = &state.you.body;
    let head = match body.first() {
        Some(&h) => h,
        None => return Direction::Up,
    };
    let neck = body.get(1).copied().filter(|&n| n != head);
    let (w, h) = (state.board.width, state.board.height);

    Direction::all()
        .iter()
        .copied()
        .find(|d| {
            let next = d.apply(&head);
            Some(next) != neck && next.x >= 0 && next.y >= 0 && next.x < w && next.y < h
        })
        .unwrap_or(Direction::Up)
}

fn truncate_shout(text: &str) -> String {
    text.chars().take(MAX_SHOUT_LEN).collect()
}
