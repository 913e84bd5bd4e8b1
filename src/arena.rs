// Local self-play arena
//
// Plays complete games on this machine with every snake driven by the engine.
// The turn loop mirrors a game server: collect one move per live snake,
// resolve the turn, spawn food, shrink royale maps.

use log::{debug, info};
use rand::Rng;
use std::time::Instant;

use crate::config::Config;
use crate::rules::{Rules, MAX_HEALTH};
use crate::search::{Deadline, Searcher};
use crate::session::HazardSchedule;
use crate::simulator;
use crate::state::{SimState, Snake};
use crate::types::{Coord, Direction};

/// Spawn points used by the standard 11x11 map, corners first
const STANDARD_SPAWNS: [(i32, i32); 8] = [
    (1, 1),
    (9, 9),
    (1, 9),
    (9, 1),
    (5, 1),
    (5, 9),
    (1, 5),
    (9, 5),
];

#[derive(Debug, Clone)]
pub struct ArenaSettings {
    pub width: i32,
    pub height: i32,
    pub snakes: usize,
    pub max_turns: i32,
    /// Per-move search budget; `None` searches to the configured depth cap
    pub move_budget_ms: Option<u64>,
    pub rules: Rules,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        ArenaSettings {
            width: 11,
            height: 11,
            snakes: 2,
            max_turns: 500,
            move_budget_ms: Some(100),
            rules: Rules::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOutcome {
    /// Index of the last snake standing; `None` on a draw or turn limit
    pub winner: Option<usize>,
    pub turns: i32,
    pub survivors: Vec<usize>,
}

/// Cells where food may appear: on the board and free of snakes and food
fn open_cells(state: &SimState) -> Vec<Coord> {
    let mut taken: Vec<Coord> = state
        .snakes
        .iter()
        .filter(|s| s.is_alive())
        .flat_map(|s| s.body.iter().copied())
        .collect();
    taken.extend(state.food.iter().copied());

    (0..state.height)
        .flat_map(|y| (0..state.width).map(move |x| Coord::new(x, y)))
        .filter(|c| !taken.contains(c))
        .collect()
}

/// Standard food placement: top up to the ruleset minimum, otherwise roll
/// `food_spawn_chance` percent for a single extra food.
pub fn spawn_food<R: Rng + ?Sized>(state: &mut SimState, rng: &mut R) {
    let minimum = state.rules.minimum_food as usize;
    let wanted = if state.food.len() < minimum {
        minimum - state.food.len()
    } else if state.rules.food_spawn_chance > 0
        && rng.random_range(0..100) < state.rules.food_spawn_chance
    {
        1
    } else {
        0
    };

    for _ in 0..wanted {
        let open = open_cells(state);
        if open.is_empty() {
            return;
        }
        let cell = open[rng.random_range(0..open.len())];
        state.food.push(cell);
    }
}

/// Current extent of the royale safe area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeArea {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl SafeArea {
    pub fn full(width: i32, height: i32) -> Self {
        SafeArea {
            min_x: 0,
            max_x: width - 1,
            min_y: 0,
            max_y: height - 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }
}

/// On every `shrink_every_n_turns`-th turn, turns one random edge line of the
/// safe area into hazard.
pub fn shrink_royale<R: Rng + ?Sized>(state: &mut SimState, area: &mut SafeArea, rng: &mut R) {
    let n = state.rules.shrink_every_n_turns as i32;
    if n <= 0 || state.turn <= 0 || state.turn % n != 0 || area.is_empty() {
        return;
    }

    let line: Vec<Coord> = match rng.random_range(0..4) {
        0 => {
            area.min_x += 1;
            (area.min_y..=area.max_y).map(|y| Coord::new(area.min_x - 1, y)).collect()
        }
        1 => {
            area.max_x -= 1;
            (area.min_y..=area.max_y).map(|y| Coord::new(area.max_x + 1, y)).collect()
        }
        2 => {
            area.min_y += 1;
            (area.min_x..=area.max_x).map(|x| Coord::new(x, area.min_y - 1)).collect()
        }
        _ => {
            area.max_y -= 1;
            (area.min_x..=area.max_x).map(|x| Coord::new(x, area.max_y + 1)).collect()
        }
    };
    debug!("Royale shrink on turn {}: {} cells", state.turn, line.len());
    state.hazards.extend(line);
}

/// Opening position with snakes stacked on the standard spawn points
pub fn standard_start<R: Rng + ?Sized>(settings: &ArenaSettings, rng: &mut R) -> SimState {
    let spawns: Vec<Coord> = if settings.width == 11 && settings.height == 11 {
        STANDARD_SPAWNS.iter().map(|&(x, y)| Coord::new(x, y)).collect()
    } else {
        let (w, h) = (settings.width, settings.height);
        vec![
            Coord::new(1, 1),
            Coord::new(w - 2, h - 2),
            Coord::new(1, h - 2),
            Coord::new(w - 2, 1),
        ]
    };

    let snakes: Vec<Snake> = spawns
        .iter()
        .take(settings.snakes)
        .map(|&p| Snake::new(vec![p; 3], MAX_HEALTH))
        .collect();

    let mut state = SimState::new(
        settings.width,
        settings.height,
        snakes,
        vec![],
        vec![],
        settings.rules.clone(),
    );
    // One food next to every snake, like the standard map
    for i in 0..state.snakes.len() {
        let head = state.snakes[i].head();
        let options: Vec<Coord> = [(-1, -1), (1, -1), (-1, 1), (1, 1)]
            .iter()
            .map(|&(dx, dy)| Coord::new(head.x + dx, head.y + dy))
            .filter(|c| c.x >= 0 && c.y >= 0 && c.x < state.width && c.y < state.height)
            .filter(|c| !state.food.contains(c))
            .collect();
        if !options.is_empty() {
            let food = options[rng.random_range(0..options.len())];
            state.food.push(food);
        }
    }
    state
}

/// Solo games run until the snake dies, others until one snake is left
fn game_over(state: &SimState) -> bool {
    let live = state.live_count();
    if state.snakes.len() > 1 {
        live <= 1
    } else {
        live == 0
    }
}

/// Plays one game to completion with every snake searching for itself.
pub fn play_game<R: Rng + ?Sized>(
    config: &Config,
    settings: &ArenaSettings,
    mut state: SimState,
    rng: &mut R,
) -> GameOutcome {
    let searcher = Searcher::new(config);
    let mut area = SafeArea::full(state.width, state.height);
    let mut schedule = HazardSchedule::new(&state.rules, state.hazards.len());

    while !game_over(&state) && state.turn < settings.max_turns {
        schedule.observe(state.turn, state.hazards.len());

        let moves: Vec<Direction> = (0..state.snakes.len())
            .map(|i| {
                if !state.snakes[i].is_alive() {
                    return Direction::Up;
                }
                let deadline = match settings.move_budget_ms {
                    Some(ms) => Deadline::new(Instant::now(), ms),
                    None => Deadline::unlimited(),
                };
                searcher
                    .choose_move(&state.with_you(i), Some(&schedule), &deadline, |_| {})
                    .direction
            })
            .collect();

        let alive_before: Vec<bool> = state.snakes.iter().map(|s| s.is_alive()).collect();
        state = simulator::advance(&state, &moves);
        for (i, snake) in state.snakes.iter().enumerate() {
            if let (true, Some(cause)) = (alive_before[i], snake.eliminated) {
                debug!("Turn {}: snake {} eliminated ({:?})", state.turn, i, cause);
            }
        }
        spawn_food(&mut state, rng);
        shrink_royale(&mut state, &mut area, rng);
    }

    let survivors: Vec<usize> = state.live_indices().collect();
    let winner = if survivors.len() == 1 && state.snakes.len() > 1 {
        Some(survivors[0])
    } else {
        None
    };
    info!(
        "Arena game over after {} turns: winner {:?}, survivors {:?}",
        state.turn, winner, survivors
    );

    GameOutcome {
        winner,
        turns: state.turn,
        survivors,
    }
}
