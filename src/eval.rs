// Heuristic evaluator
//
// Folds health, length, territory, tactics, food and hazard signals into one
// score per snake, each from that snake's own point of view. Terminal
// positions bypass the heuristics entirely so that any survival outranks
// any elimination and any win outranks everything else.

use log::debug;

use crate::board2d::Board2d;
use crate::config::{Config, ScoresConfig, TerritoryConfig};
use crate::session::HazardSchedule;
use crate::simple_profiler::ProfileGuard;
use crate::state::SimState;
use crate::tactics::{KissOfDeath, KissOfDeathState, KissOfMurder, KissOfMurderState, TacticalStates, Tactics};
use crate::territory::{self, TerritoryResult};
use crate::types::Coord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Win,
    Loss,
    /// Every snake went out on the same turn
    Tie,
}

/// Named components of one score. `total` is their weighted sum, or the
/// terminal value when the position is decided.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub health: f64,
    pub length: f64,
    pub territory: f64,
    pub tactics: f64,
    pub food: f64,
    pub hazard: f64,
    pub terminal: Option<Terminal>,
    /// Territory was unavailable and the remaining terms were scaled down
    pub degraded: bool,
    pub total: f64,
}

/// Everything about one position the evaluator needs, built once and shared
/// across the snakes being scored
pub struct Position<'a> {
    pub state: &'a SimState,
    pub board: &'a Board2d,
    pub territory: Option<&'a TerritoryResult>,
    /// Turns until the hazard area next grows, when known
    pub expansion_in: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    scores: ScoresConfig,
    territory: TerritoryConfig,
}

impl Evaluator {
    pub fn new(config: &Config) -> Self {
        Evaluator {
            scores: config.scores.clone(),
            territory: config.territory.clone(),
        }
    }

    pub fn weights(&self) -> &ScoresConfig {
        &self.scores
    }

    /// Scores every snake of `state`, indexed like `state.snakes`
    pub fn evaluate_all(&self, state: &SimState, schedule: Option<&HazardSchedule>) -> Vec<f64> {
        let _guard = ProfileGuard::new("eval");
        let board = Board2d::new(state);
        let territory = match territory::compute(state, &board, &self.territory) {
            Ok(t) => Some(t),
            Err(e) => {
                debug!("Territory unavailable, degrading evaluation: {}", e);
                None
            }
        };
        let tactics = Tactics::new(state, &board);
        let position = Position {
            state,
            board: &board,
            territory: territory.as_ref(),
            expansion_in: schedule.and_then(|s| s.turns_until_expansion(state.turn)),
        };

        (0..state.snakes.len())
            .map(|i| {
                let tactical = if state.snakes[i].is_alive() {
                    tactics
                        .ranked_moves(i)
                        .first()
                        .map(|&(_, t)| t)
                        .unwrap_or(TacticalStates::NEUTRAL)
                } else {
                    TacticalStates::NEUTRAL
                };
                self.evaluate(&position, i, tactical).total
            })
            .collect()
    }

    /// Scores snake `idx`. `tactical` describes the best move that snake has
    /// available from this position.
    pub fn evaluate(&self, pos: &Position, idx: usize, tactical: TacticalStates) -> ScoreBreakdown {
        let state = pos.state;
        let w = &self.scores;

        if let Some(terminal) = terminal_outcome(state, idx) {
            let turn = state.turn as f64;
            let total = match terminal {
                Terminal::Win => w.win_score - turn,
                Terminal::Loss => -w.win_score + turn,
                Terminal::Tie => -w.win_score / 2.0 + turn,
            };
            return ScoreBreakdown {
                terminal: Some(terminal),
                total,
                ..ScoreBreakdown::default()
            };
        }

        let snake = &state.snakes[idx];
        let head = snake.head();
        let mut b = ScoreBreakdown::default();

        b.health = w.weight_health * snake.health as f64;
        if snake.health < w.low_health_threshold {
            b.health -= w.low_health_penalty * (w.low_health_threshold - snake.health) as f64;
        }

        let longest_other = state
            .live_indices()
            .filter(|&j| j != idx && !snake.is_teammate(&state.snakes[j]))
            .map(|j| state.snakes[j].len())
            .max();
        let is_king = matches!(longest_other, Some(l) if snake.len() >= l + w.king_margin);
        b.length = w.weight_length * (snake.len() as f64 - longest_other.unwrap_or(0) as f64);
        if is_king {
            b.length += w.king_bonus;
        }

        if let Some(t) = pos.territory {
            b.territory = w.weight_territory * (t.score(idx) - t.best_other(idx));
        }

        b.tactics = self.death_penalty(&tactical.death) + self.murder_bonus(&tactical.murder);

        let hungry = snake.health < w.hungry_health_threshold;
        if hungry || !is_king {
            if let Some(d) = state.food.iter().map(|&f| distance(state, head, f)).min() {
                let urgency = if hungry { w.hungry_food_multiplier } else { 1.0 };
                b.food = -w.weight_food * d as f64 * urgency;
            }
        }

        b.hazard = -w.weight_hazard * pos.board.hazard_at(head) as f64;
        if let Some(turns) = pos.expansion_in {
            if turns <= w.frontier_horizon_turns && pos.board.is_hazard_frontier(head) {
                b.hazard -= w.hazard_frontier_penalty;
            }
        }

        let mut total = b.health + b.length + b.territory + b.tactics + b.food + b.hazard;
        if pos.territory.is_none() {
            b.degraded = true;
            // Only shrink gains; a bad position must not look better degraded
            if total > 0.0 {
                total *= w.degraded_eval_factor;
            }
        }
        b.total = total.clamp(-w.non_terminal_limit, w.non_terminal_limit);
        b
    }

    fn death_penalty(&self, death: &KissOfDeath) -> f64 {
        let w = &self.scores;
        let base = match death.state {
            KissOfDeathState::Suicide => w.death_suicide,
            KissOfDeathState::Certain => w.death_certain,
            KissOfDeathState::CertainMutual => w.death_certain_mutual,
            KissOfDeathState::Possible3To1 => w.death_possible_3to1,
            KissOfDeathState::Possible => w.death_possible,
            KissOfDeathState::PossibleMutual => w.death_possible_mutual,
            KissOfDeathState::NoThreat => 0.0,
        };
        if death.likely && !death.state.is_certain_death() {
            base * w.death_likely_multiplier
        } else {
            base
        }
    }

    fn murder_bonus(&self, murder: &KissOfMurder) -> f64 {
        let w = &self.scores;
        match murder.state {
            KissOfMurderState::Certain => w.murder_certain,
            KissOfMurderState::PossibleSafe => w.murder_possible_safe,
            KissOfMurderState::PossibleUnsafe => w.murder_possible_unsafe,
            KissOfMurderState::NoTarget => 0.0,
        }
    }
}

/// Decided outcome for snake `idx`, if any
pub fn terminal_outcome(state: &SimState, idx: usize) -> Option<Terminal> {
    let snake = &state.snakes[idx];
    if !snake.is_alive() {
        if state.multiplayer && state.live_count() == 0 {
            return Some(Terminal::Tie);
        }
        return Some(Terminal::Loss);
    }
    if !state.multiplayer {
        return None;
    }
    let rivals_left = state
        .live_indices()
        .any(|j| j != idx && !snake.is_teammate(&state.snakes[j]));
    if rivals_left {
        None
    } else {
        Some(Terminal::Win)
    }
}

/// Move distance between two cells, shortest way round on wrapped boards
fn distance(state: &SimState, a: Coord, b: Coord) -> i32 {
    let dx = (a.x - b.x).abs();
    let dy = (a.y - b.y).abs();
    if state.rules.wrapped {
        dx.min(state.width - dx) + dy.min(state.height - dy)
    } else {
        dx + dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rules;
    use crate::state::{Elimination, Snake};

    fn c(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    fn snake(body: &[(i32, i32)], health: i32) -> Snake {
        Snake::new(body.iter().map(|&(x, y)| c(x, y)).collect(), health)
    }

    fn duel(health: i32) -> SimState {
        SimState::new(
            11,
            11,
            vec![
                snake(&[(2, 5), (2, 4), (2, 3)], health),
                snake(&[(8, 5), (8, 4), (8, 3)], 100),
            ],
            vec![],
            vec![],
            Rules::default(),
        )
    }

    fn breakdown(state: &SimState, idx: usize, expansion_in: Option<i32>) -> ScoreBreakdown {
        let config = Config::default_hardcoded();
        let evaluator = Evaluator::new(&config);
        let board = Board2d::new(state);
        let territory = territory::compute(state, &board, &config.territory).ok();
        let pos = Position {
            state,
            board: &board,
            territory: territory.as_ref(),
            expansion_in,
        };
        evaluator.evaluate(&pos, idx, TacticalStates::NEUTRAL)
    }

    #[test]
    fn test_elimination_scores_below_any_survival() {
        let evaluator = Evaluator::new(&Config::default_hardcoded());
        let mut dead = duel(100);
        dead.snakes[0].eliminated = Some(Elimination::Wall);
        let mut starving = duel(1);
        starving.food = vec![c(10, 10)];

        let dead_score = evaluator.evaluate_all(&dead, None)[0];
        let alive_score = evaluator.evaluate_all(&starving, None)[0];
        assert!(dead_score < alive_score);
        assert!(dead_score <= -evaluator.weights().non_terminal_limit);
    }

    #[test]
    fn test_win_scores_above_any_non_terminal() {
        let evaluator = Evaluator::new(&Config::default_hardcoded());
        let mut won = duel(100);
        won.snakes[1].eliminated = Some(Elimination::HeadToHead(0));
        let scores = evaluator.evaluate_all(&won, None);
        assert!(scores[0] > evaluator.weights().non_terminal_limit);
        assert!(scores[1] < -evaluator.weights().non_terminal_limit);
    }

    #[test]
    fn test_tie_ranks_above_solitary_loss() {
        let mut tie = duel(100);
        tie.snakes[0].eliminated = Some(Elimination::HeadToHead(1));
        tie.snakes[1].eliminated = Some(Elimination::HeadToHead(0));
        let mut loss = duel(100);
        loss.snakes[0].eliminated = Some(Elimination::Wall);

        assert_eq!(terminal_outcome(&tie, 0), Some(Terminal::Tie));
        assert_eq!(terminal_outcome(&loss, 0), Some(Terminal::Loss));
        assert!(breakdown(&tie, 0, None).total > breakdown(&loss, 0, None).total);
    }

    #[test]
    fn test_faster_win_is_better() {
        let mut early = duel(100);
        early.snakes[1].eliminated = Some(Elimination::Starvation);
        let mut late = early.clone();
        late.turn = 40;
        assert!(breakdown(&early, 0, None).total > breakdown(&late, 0, None).total);
    }

    #[test]
    fn test_more_health_scores_higher() {
        assert!(breakdown(&duel(100), 0, None).total > breakdown(&duel(60), 0, None).total);
        // Below the threshold every point hurts more
        let drop_high = breakdown(&duel(60), 0, None).total - breakdown(&duel(50), 0, None).total;
        let drop_low = breakdown(&duel(20), 0, None).total - breakdown(&duel(10), 0, None).total;
        assert!(drop_low > drop_high);
    }

    #[test]
    fn test_standing_in_hazard_is_penalised() {
        let clear = duel(100);
        let mut hazy = duel(100);
        hazy.hazards = vec![c(2, 5)];
        let a = breakdown(&clear, 0, None);
        let b = breakdown(&hazy, 0, None);
        assert_eq!(a.hazard, 0.0);
        assert!(b.hazard < 0.0);
        assert!(b.total < a.total);
    }

    #[test]
    fn test_frontier_penalty_only_before_expansion() {
        let mut state = duel(100);
        state.snakes[0] = snake(&[(0, 5), (0, 4), (0, 3)], 100);
        assert_eq!(breakdown(&state, 0, None).hazard, 0.0);
        assert_eq!(breakdown(&state, 0, Some(20)).hazard, 0.0);
        assert!(breakdown(&state, 0, Some(2)).hazard < 0.0);
    }

    #[test]
    fn test_food_pulls_hungry_snake() {
        let mut near = duel(30);
        near.food = vec![c(2, 7)];
        let mut far = duel(30);
        far.food = vec![c(10, 10)];
        assert!(breakdown(&near, 0, None).food > breakdown(&far, 0, None).food);
    }

    #[test]
    fn test_king_ignores_food_until_hungry() {
        let mut state = duel(90);
        state.snakes[0] = snake(&[(2, 5), (2, 4), (2, 3), (2, 2), (2, 1), (2, 0), (1, 0)], 90);
        state.food = vec![c(9, 9)];
        let fed_king = breakdown(&state, 0, None);
        assert_eq!(fed_king.food, 0.0);
        assert!(fed_king.length > 0.0);

        state.snakes[0].health = 20;
        assert!(breakdown(&state, 0, None).food < 0.0);
    }

    #[test]
    fn test_tactical_states_shift_score() {
        let config = Config::default_hardcoded();
        let evaluator = Evaluator::new(&config);
        let state = duel(100);
        let board = Board2d::new(&state);
        let pos = Position {
            state: &state,
            board: &board,
            territory: None,
            expansion_in: None,
        };
        let threatened = TacticalStates {
            death: KissOfDeath {
                state: KissOfDeathState::Possible,
                attackers: 1,
                likely: false,
                fallback: 0,
            },
            murder: KissOfMurder::NONE,
        };
        let hunting = TacticalStates {
            death: KissOfDeath::NONE,
            murder: KissOfMurder {
                state: KissOfMurderState::Certain,
                victims: 1,
            },
        };
        let neutral = evaluator.evaluate(&pos, 0, TacticalStates::NEUTRAL).total;
        assert!(evaluator.evaluate(&pos, 0, threatened).total < neutral);
        assert!(evaluator.evaluate(&pos, 0, hunting).total > neutral);
    }

    #[test]
    fn test_territory_failure_degrades_instead_of_failing() {
        let mut config = Config::default_hardcoded();
        config.territory.max_cells = 16;
        let evaluator = Evaluator::new(&config);
        let state = duel(100);
        let board = Board2d::new(&state);
        let territory = territory::compute(&state, &board, &config.territory).ok();
        assert!(territory.is_none());
        let pos = Position {
            state: &state,
            board: &board,
            territory: territory.as_ref(),
            expansion_in: None,
        };
        let b = evaluator.evaluate(&pos, 0, TacticalStates::NEUTRAL);
        assert!(b.degraded);
        assert_eq!(b.territory, 0.0);
        assert!(b.total.is_finite());
        assert_eq!(evaluator.evaluate_all(&state, None).len(), 2);
    }

    #[test]
    fn test_degraded_evaluation_never_improves_a_position() {
        let evaluator = Evaluator::new(&Config::default_hardcoded());
        let state = duel(100);
        let board = Board2d::new(&state);
        let pos = Position {
            state: &state,
            board: &board,
            territory: None,
            expansion_in: None,
        };
        let doomed = TacticalStates {
            death: KissOfDeath {
                state: KissOfDeathState::Certain,
                attackers: 1,
                likely: true,
                fallback: 0,
            },
            murder: KissOfMurder::NONE,
        };
        for tactical in [TacticalStates::NEUTRAL, doomed].iter() {
            let b = evaluator.evaluate(&pos, 0, *tactical);
            let undegraded = b.health + b.length + b.territory + b.tactics + b.food + b.hazard;
            assert!(b.degraded);
            assert!(b.total <= undegraded);
        }
        let b = evaluator.evaluate(&pos, 0, doomed);
        assert!(b.total < 0.0);
        assert_eq!(b.total, (b.health + b.length + b.tactics + b.food + b.hazard).max(-evaluator.weights().non_terminal_limit));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let evaluator = Evaluator::new(&Config::default_hardcoded());
        let mut state = duel(70);
        state.food = vec![c(5, 5), c(1, 9)];
        assert_eq!(evaluator.evaluate_all(&state, None), evaluator.evaluate_all(&state, None));
    }
}
