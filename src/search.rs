// Search controller
//
// MaxN over the joint moves of every live snake, deepened one turn at a time
// until the deadline. Within a turn the snakes pick in a fixed order (ours
// first), each maximising its own component of the backed-up score vector.
// Only completed iterations are ever reported; an iteration interrupted by the
// deadline is thrown away whole.

use log::{debug, info};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::board2d::Board2d;
use crate::config::{Config, SearchConfig, TimingConfig};
use crate::eval::Evaluator;
use crate::session::HazardSchedule;
use crate::simple_profiler::{self, ProfileGuard};
use crate::simulator::advance;
use crate::state::SimState;
use crate::tactics::{KissOfDeathState, TacticalStates, Tactics};
use crate::types::Direction;

/// Wall-clock budget for one decision, threaded through every search call
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn new(start: Instant, budget_ms: u64) -> Self {
        Deadline {
            start,
            budget: Some(Duration::from_millis(budget_ms)),
        }
    }

    /// Never expires. Searches bounded this way stop at the depth limit.
    pub fn unlimited() -> Self {
        Deadline {
            start: Instant::now(),
            budget: None,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn remaining_ms(&self) -> u64 {
        match self.budget {
            Some(budget) => budget.saturating_sub(self.start.elapsed()).as_millis() as u64,
            None => u64::MAX,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.budget {
            Some(budget) => self.start.elapsed() >= budget,
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub direction: Direction,
    /// Backed-up score of the chosen move for our snake
    pub score: f64,
    /// Deepest completed iteration, 0 when no search was needed
    pub depth: u8,
    pub tactics: TacticalStates,
    pub rationale: String,
}

type Scores = Vec<f64>;

/// Backed-up scores plus whether any leaf below was cut by the depth limit
/// rather than by the game ending
type Backed = (Scores, bool);

/// Evaluated subtrees keyed by (position fingerprint, remaining depth)
struct Memo {
    table: HashMap<(u64, u8), Backed>,
    enabled: bool,
    capacity: usize,
}

impl Memo {
    fn new(config: &SearchConfig) -> Self {
        Memo {
            table: HashMap::new(),
            enabled: config.memoization,
            capacity: config.memo_capacity.max(1),
        }
    }

    fn get(&self, key: &(u64, u8)) -> Option<&Backed> {
        if !self.enabled {
            return None;
        }
        let hit = self.table.get(key);
        simple_profiler::record_memo_lookup(hit.is_some());
        hit
    }

    fn insert(&mut self, key: (u64, u8), value: Backed) {
        if !self.enabled {
            return;
        }
        if self.table.len() >= self.capacity {
            self.table.clear();
        }
        self.table.insert(key, value);
    }
}

/// Read-only inputs shared by every node of one iteration
struct Context<'a> {
    schedule: Option<&'a HazardSchedule>,
    deadline: &'a Deadline,
    nodes: AtomicU64,
}

pub struct Searcher {
    evaluator: Evaluator,
    search: SearchConfig,
    timing: TimingConfig,
}

impl Searcher {
    pub fn new(config: &Config) -> Self {
        Searcher {
            evaluator: Evaluator::new(config),
            search: config.search.clone(),
            timing: config.timing.clone(),
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Picks our snake's move for `state`.
    ///
    /// `on_depth` is called on this thread after every completed iteration
    /// with the best result so far, so a caller polling from elsewhere always
    /// has an answer.
    pub fn choose_move<F>(
        &self,
        state: &SimState,
        schedule: Option<&HazardSchedule>,
        deadline: &Deadline,
        on_depth: F,
    ) -> SearchResult
    where
        F: Fn(&SearchResult),
    {
        let you = state.you;
        let board = Board2d::new(state);
        let tactics = Tactics::new(state, &board);
        let candidates = tactics.candidate_moves(you);
        let static_score = self.evaluator.evaluate_all(state, schedule)[you];

        // candidate_moves never comes back empty
        let (first_dir, first_tactics) = candidates[0];
        if first_tactics.death.state == KissOfDeathState::Suicide {
            info!("No survivable move, taking {} as the least bad", first_dir.as_str());
            let result = SearchResult {
                direction: first_dir,
                score: static_score,
                depth: 0,
                tactics: first_tactics,
                rationale: format!("no safe move, {} is the least bad", first_dir.as_str()),
            };
            on_depth(&result);
            return result;
        }
        if candidates.len() == 1 {
            let result = SearchResult {
                direction: first_dir,
                score: static_score,
                depth: 0,
                tactics: first_tactics,
                rationale: format!("{} is the only safe move", first_dir.as_str()),
            };
            on_depth(&result);
            return result;
        }

        let mut best = SearchResult {
            direction: first_dir,
            score: static_score,
            depth: 0,
            tactics: first_tactics,
            rationale: format!("tactical choice {}", first_dir.as_str()),
        };

        let mut depth = self.timing.initial_depth.max(1);
        while depth <= self.timing.max_search_depth {
            let remaining = deadline.remaining_ms();
            if remaining < self.timing.min_time_remaining_ms {
                debug!("Stopping search: insufficient time remaining ({}ms)", remaining);
                break;
            }

            let ctx = Context {
                schedule,
                deadline,
                nodes: AtomicU64::new(0),
            };
            let scored = match self.search_root(state, &candidates, depth, &ctx) {
                Some(scored) => scored,
                None => {
                    debug!("Depth {} abandoned at the deadline", depth);
                    break;
                }
            };

            let mut horizon_reached = false;
            let mut chosen = 0;
            for (i, (_, _, (scores, cut))) in scored.iter().enumerate() {
                horizon_reached |= *cut;
                if scores[you] > (scored[chosen].2).0[you] {
                    chosen = i;
                }
            }
            let (dir, t, (scores, chosen_cut)) = &scored[chosen];
            best = SearchResult {
                direction: *dir,
                score: scores[you],
                depth,
                tactics: *t,
                rationale: rationale(*dir, depth, scores[you], t),
            };
            info!(
                "Depth {} complete: {} (score {:.1}, {} nodes, {}ms)",
                depth,
                dir.as_str(),
                scores[you],
                ctx.nodes.load(Ordering::Relaxed),
                deadline.elapsed_ms()
            );
            on_depth(&best);

            if !horizon_reached {
                debug!("Every line ends the game within {} turns, stopping", depth);
                break;
            }
            if !chosen_cut && scores[you] > self.evaluator.weights().non_terminal_limit {
                debug!("Forced win found at depth {}, stopping", depth);
                break;
            }
            depth += 1;
        }

        simple_profiler::merge_thread_local();
        best
    }

    /// One full iteration at `depth`. `None` when the deadline cut it short.
    fn search_root(
        &self,
        state: &SimState,
        candidates: &[(Direction, TacticalStates)],
        depth: u8,
        ctx: &Context,
    ) -> Option<Vec<(Direction, TacticalStates, Backed)>> {
        let _guard = ProfileGuard::new("maxn");
        let order = move_order(state);
        let board = Board2d::new(state);
        let tactics = Tactics::new(state, &board);
        let options: Vec<Vec<Direction>> = order
            .iter()
            .map(|&i| {
                if i == state.you {
                    candidates.iter().map(|&(d, _)| d).collect()
                } else {
                    tactics.candidate_moves(i).into_iter().map(|(d, _)| d).collect()
                }
            })
            .collect();

        let root_move = |dir: Direction, memo: &mut Memo| -> Option<Backed> {
            let mut joint = vec![Direction::Up; state.snakes.len()];
            joint[state.you] = dir;
            self.ply(state, &order, &options, 1, &mut joint, depth, ctx, memo)
        };

        if self.search.parallel_root {
            candidates
                .par_iter()
                .map(|&(dir, t)| {
                    let mut memo = Memo::new(&self.search);
                    let backed = root_move(dir, &mut memo);
                    simple_profiler::merge_thread_local();
                    backed.map(|b| (dir, t, b))
                })
                .collect()
        } else {
            let mut memo = Memo::new(&self.search);
            candidates
                .iter()
                .map(|&(dir, t)| root_move(dir, &mut memo).map(|b| (dir, t, b)))
                .collect()
        }
    }

    /// Lets the `k`-th snake of `order` pick its move given the picks of the
    /// snakes before it, then recurses. Once everybody has picked, the turn
    /// is simulated and the next one searched.
    #[allow(clippy::too_many_arguments)]
    fn ply(
        &self,
        state: &SimState,
        order: &[usize],
        options: &[Vec<Direction>],
        k: usize,
        joint: &mut Vec<Direction>,
        depth: u8,
        ctx: &Context,
        memo: &mut Memo,
    ) -> Option<Backed> {
        if k == order.len() {
            let next = advance(state, joint);
            return self.maxn(&next, depth - 1, ctx, memo);
        }

        let mover = order[k];
        let mut best: Option<Backed> = None;
        let mut cut = false;
        for &dir in &options[k] {
            joint[mover] = dir;
            let (scores, below) = self.ply(state, order, options, k + 1, joint, depth, ctx, memo)?;
            cut |= below;
            let better = match &best {
                Some((b, _)) => scores[mover] > b[mover],
                None => true,
            };
            if better {
                best = Some((scores, false));
            }
        }
        best.map(|(scores, _)| (scores, cut))
    }

    fn maxn(&self, state: &SimState, depth: u8, ctx: &Context, memo: &mut Memo) -> Option<Backed> {
        if ctx.deadline.is_expired() {
            return None;
        }
        ctx.nodes.fetch_add(1, Ordering::Relaxed);

        if state.is_terminal() {
            return Some((self.evaluator.evaluate_all(state, ctx.schedule), false));
        }
        if depth == 0 {
            return Some((self.evaluator.evaluate_all(state, ctx.schedule), true));
        }

        let key = (state.fingerprint(), depth);
        if let Some(hit) = memo.get(&key) {
            return Some(hit.clone());
        }

        let order = move_order(state);
        let board = Board2d::new(state);
        let tactics = Tactics::new(state, &board);
        let options: Vec<Vec<Direction>> = order
            .iter()
            .map(|&i| tactics.candidate_moves(i).into_iter().map(|(d, _)| d).collect())
            .collect();

        let mut joint = vec![Direction::Up; state.snakes.len()];
        let backed = self.ply(state, &order, &options, 0, &mut joint, depth, ctx, memo)?;
        memo.insert(key, backed.clone());
        Some(backed)
    }
}

/// Live snakes in picking order: ours first, the rest by index
pub fn move_order(state: &SimState) -> Vec<usize> {
    let mut order = Vec::with_capacity(state.snakes.len());
    if state.snakes[state.you].is_alive() {
        order.push(state.you);
    }
    order.extend(state.live_indices().filter(|&i| i != state.you));
    order
}

fn rationale(dir: Direction, depth: u8, score: f64, t: &TacticalStates) -> String {
    let mut text = format!("{} after {} turns of lookahead (score {:.1})", dir.as_str(), depth, score);
    if t.death.state != KissOfDeathState::NoThreat {
        text.push_str(&format!(", accepting {:?} kiss of death", t.death.state));
    }
    if t.murder.victims > 0 {
        text.push_str(&format!(", {:?} kiss of murder", t.murder.state));
    }
    text
}
