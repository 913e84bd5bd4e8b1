// State simulator
//
// Pure turn resolution. `apply_move` moves one snake, `resolve_after_moves`
// settles a fully-moved position, and `advance` does both for a joint move.
// Inputs are never mutated; every result is a freshly built value.

use crate::rules::MAX_HEALTH;
use crate::simple_profiler::ProfileGuard;
use crate::state::{Elimination, SimState, Snake};
use crate::types::{Coord, Direction};

/// Hazard layers on `c` in the given position, capped by the ruleset
pub fn hazard_intensity(state: &SimState, c: Coord) -> u8 {
    let count = state.hazards.iter().filter(|&&h| h == c).count();
    count.min(state.rules.max_hazard_stack as usize) as u8
}

/// Moves one snake one cell. Hazard damage uses the hazards of `state`, the
/// position the move starts from.
pub fn apply_move(state: &SimState, idx: usize, dir: Direction) -> Snake {
    let snake = &state.snakes[idx];
    let raw = dir.apply(&snake.head());
    // Off-board heads are kept as-is; resolution eliminates them
    let head = state.normalize(raw).unwrap_or(raw);
    let on_board = state.normalize(raw).is_some();

    let ate = on_board && state.food.contains(&head);
    let grows = ate || state.rules.constrictor;

    let keep = if grows {
        snake.body.len()
    } else {
        snake.body.len().saturating_sub(1)
    };
    let mut body = Vec::with_capacity(keep + 1);
    body.push(head);
    body.extend_from_slice(&snake.body[..keep]);

    let health = if state.rules.constrictor {
        MAX_HEALTH
    } else {
        let mut health = snake.health - 1;
        if on_board {
            let intensity = hazard_intensity(state, head) as i32;
            if intensity > 0 {
                health -= intensity * state.rules.hazard_damage_per_turn;
            }
        }
        if ate {
            MAX_HEALTH
        } else {
            health.clamp(0, MAX_HEALTH)
        }
    };

    Snake {
        body,
        health,
        eliminated: None,
        ate,
        squad: snake.squad,
    }
}

/// Settles a position in which every live snake has already moved.
///
/// Order: consumed food is removed, starving snakes are eliminated, then
/// walls, body and head-to-head collisions are judged against one snapshot
/// of the survivors so no elimination influences another this turn.
pub fn resolve_after_moves(mut state: SimState) -> SimState {
    let n = state.snakes.len();
    let alive_before: Vec<bool> = state.snakes.iter().map(|s| s.is_alive()).collect();

    let eaten: Vec<Coord> = state
        .snakes
        .iter()
        .filter(|s| s.is_alive() && s.ate)
        .map(|s| s.head())
        .collect();
    if !eaten.is_empty() {
        state.food.retain(|f| !eaten.contains(f));
    }

    for snake in state.snakes.iter_mut() {
        if snake.is_alive() && snake.health <= 0 {
            snake.health = 0;
            snake.eliminated = Some(Elimination::Starvation);
        }
    }

    for i in 0..n {
        if state.snakes[i].is_alive() && state.normalize(state.snakes[i].head()).is_none() {
            state.snakes[i].eliminated = Some(Elimination::Wall);
        }
    }

    let allow_squad = state.rules.allow_squad_collisions;
    let mut collisions: Vec<Option<Elimination>> = vec![None; n];

    for i in 0..n {
        let snake = &state.snakes[i];
        if !snake.is_alive() {
            continue;
        }
        let head = snake.head();

        if snake.body[1..].contains(&head) {
            collisions[i] = Some(Elimination::SelfCollision);
            continue;
        }

        let body_hit = (0..n).find(|&j| {
            let other = &state.snakes[j];
            j != i
                && other.is_alive()
                && !(allow_squad && snake.is_teammate(other))
                && other.body[1..].contains(&head)
                && !swapped_heads(snake, other)
        });
        if let Some(j) = body_hit {
            collisions[i] = Some(Elimination::BodyCollision(j));
            continue;
        }

        let head_loss = (0..n).find(|&j| {
            let other = &state.snakes[j];
            j != i
                && other.is_alive()
                && !(allow_squad && snake.is_teammate(other))
                && other.head() == head
                && snake.len() <= other.len()
        });
        if let Some(j) = head_loss {
            collisions[i] = Some(Elimination::HeadToHead(j));
        }
    }

    let mut eliminated_now: Vec<usize> = Vec::new();
    for (i, cause) in collisions.into_iter().enumerate() {
        if let Some(cause) = cause {
            state.snakes[i].eliminated = Some(cause);
        }
    }
    for (i, snake) in state.snakes.iter().enumerate() {
        if snake.eliminated.is_some() && alive_before[i] {
            eliminated_now.push(i);
        }
    }

    if state.rules.shared_elimination {
        let squads: Vec<u8> = eliminated_now
            .iter()
            .filter_map(|&i| state.snakes[i].squad)
            .collect();
        for snake in state.snakes.iter_mut() {
            if snake.is_alive() && snake.squad.map_or(false, |s| squads.contains(&s)) {
                snake.eliminated = Some(Elimination::Squad);
            }
        }
    }

    state
}

/// Two heads that trade cells pass each other: each lands on the other's
/// neck and neither is judged a body collision.
fn swapped_heads(a: &Snake, b: &Snake) -> bool {
    a.len() > 1
        && b.len() > 1
        && a.head() == b.body[1]
        && b.head() == a.body[1]
        && !b.body[2..].contains(&a.head())
}

/// Applies one direction per snake (indexed like `state.snakes`; entries for
/// eliminated snakes are ignored) and resolves the resulting position.
pub fn advance(state: &SimState, moves: &[Direction]) -> SimState {
    let _guard = ProfileGuard::new("apply_move");
    let snakes = state
        .snakes
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if s.is_alive() {
                apply_move(state, i, moves[i])
            } else {
                s.clone()
            }
        })
        .collect();

    resolve_after_moves(state.successor(snakes))
}
