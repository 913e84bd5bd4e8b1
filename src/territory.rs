// Territory estimator
//
// Multi-source breadth-first Voronoi over the board, seeded from every live
// head at once. A cell belongs to whoever reaches it in the fewest moves;
// simultaneous arrivals go to the longest snake, and equal-length arrivals
// split the cell. Hazard cells are worth a fraction of a free cell, and a
// snake cannot claim anything it would starve before reaching.

use crate::board2d::Board2d;
use crate::config::TerritoryConfig;
use crate::error::EngineError;
use crate::rules::MAX_HEALTH;
use crate::simple_profiler::ProfileGuard;
use crate::state::SimState;

/// Fractional reachable-cell count per snake, indexed like `state.snakes`
#[derive(Debug, Clone, PartialEq)]
pub struct TerritoryResult {
    pub scores: Vec<f64>,
    /// Cells still unclaimed by anybody
    pub unclaimed: usize,
}

impl TerritoryResult {
    pub fn score(&self, idx: usize) -> f64 {
        self.scores.get(idx).copied().unwrap_or(0.0)
    }

    /// Largest territory held by any snake other than `idx`
    pub fn best_other(&self, idx: usize) -> f64 {
        self.scores
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != idx)
            .map(|(_, &s)| s)
            .fold(0.0, f64::max)
    }
}

const UNCLAIMED: u16 = u16::MAX;

#[derive(Clone, Copy)]
struct Arrival {
    cell: usize,
    snake: usize,
    health: i32,
}

pub fn compute(
    state: &SimState,
    board: &Board2d,
    config: &TerritoryConfig,
) -> Result<TerritoryResult, EngineError> {
    let _guard = ProfileGuard::new("territory");
    let cells = board.cell_count();
    if cells > config.max_cells {
        return Err(EngineError::BoardTooLarge(cells));
    }

    let n = state.snakes.len();
    let damage = state.rules.hazard_damage_per_turn;
    let constrictor = state.rules.constrictor;
    let mut claimed_at = vec![UNCLAIMED; cells];
    let mut scores = vec![0.0; n];
    let mut frontiers: Vec<Vec<(usize, i32)>> = vec![Vec::new(); n];

    for i in state.live_indices() {
        let snake = &state.snakes[i];
        if let Some(head) = board.index(snake.head()) {
            claimed_at[head] = 0;
            frontiers[i].push((head, snake.health));
        }
    }

    let mut depth: u16 = 0;
    let mut arrivals: Vec<Arrival> = Vec::new();
    while frontiers.iter().any(|f| !f.is_empty()) {
        depth = depth.saturating_add(1);
        arrivals.clear();
        let mut waiting: Vec<Vec<(usize, i32)>> = vec![Vec::new(); n];

        for (snake, frontier) in frontiers.iter().enumerate() {
            for &(from, health) in frontier {
                let mut wait = false;
                for (_, next) in board.neighbors(board.coord_of(from)) {
                    let ni = match board.index(next) {
                        Some(ni) => ni,
                        None => continue,
                    };
                    if claimed_at[ni] != UNCLAIMED {
                        continue;
                    }
                    let cell = board.cell_at(ni);
                    if !cell.is_free_after(depth) {
                        // Body still there; try again once it has moved on
                        if cell.vacates_in != u16::MAX {
                            wait = true;
                        }
                        continue;
                    }

                    let health = if constrictor || cell.food {
                        MAX_HEALTH
                    } else {
                        health - 1 - cell.hazard as i32 * damage
                    };
                    if health <= 0 {
                        continue;
                    }
                    arrivals.push(Arrival {
                        cell: ni,
                        snake,
                        health,
                    });
                }
                if wait && health > 1 {
                    waiting[snake].push((from, health - 1));
                }
            }
        }

        if arrivals.is_empty() && waiting.iter().all(|w| w.is_empty()) {
            break;
        }

        // Group by cell, keeping each snake's healthiest arrival
        arrivals.sort_by(|a, b| {
            a.cell
                .cmp(&b.cell)
                .then(a.snake.cmp(&b.snake))
                .then(b.health.cmp(&a.health))
        });
        arrivals.dedup_by(|a, b| a.cell == b.cell && a.snake == b.snake);

        let mut next: Vec<Vec<(usize, i32)>> = waiting;
        let mut start = 0;
        while start < arrivals.len() {
            let cell = arrivals[start].cell;
            let mut end = start;
            while end < arrivals.len() && arrivals[end].cell == cell {
                end += 1;
            }
            let group = &arrivals[start..end];
            let longest = group
                .iter()
                .map(|a| state.snakes[a.snake].len())
                .max()
                .unwrap_or(0);
            let winners: Vec<&Arrival> = group
                .iter()
                .filter(|a| state.snakes[a.snake].len() == longest)
                .collect();

            claimed_at[cell] = depth;
            let value = cell_value(board.cell_at(cell).hazard, damage, config) / winners.len() as f64;
            for w in winners {
                scores[w.snake] += value;
                next[w.snake].push((cell, w.health));
            }
            start = end;
        }

        frontiers = next;
    }

    let unclaimed = claimed_at.iter().filter(|&&c| c == UNCLAIMED).count();
    Ok(TerritoryResult { scores, unclaimed })
}

/// Worth of one cell: a full point when safe, a damage-weighted fraction
/// per hazard layer otherwise
fn cell_value(hazard: u8, damage: i32, config: &TerritoryConfig) -> f64 {
    if hazard == 0 || damage <= 0 {
        1.0
    } else {
        config.hazard_cell_value.powi(hazard as i32)
    }
}
