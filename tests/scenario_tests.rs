// End-to-end scenarios built from wire-format requests
//
// Each scenario starts from the JSON a game server would send, goes through
// SimState::from_game_state and exercises the simulator, tactics or search.

use serde_json::json;
use snake_maxn::board2d::Board2d;
use snake_maxn::bot::Bot;
use snake_maxn::config::Config;
use snake_maxn::error::EngineError;
use snake_maxn::search::{Deadline, Searcher};
use snake_maxn::simulator;
use snake_maxn::state::{Elimination, SimState};
use snake_maxn::tactics;
use snake_maxn::types::{Coord, Direction, GameState};
use std::time::{Duration, Instant};

fn snake(id: &str, body: &[(i32, i32)], health: i32) -> serde_json::Value {
    let body: Vec<_> = body.iter().map(|&(x, y)| json!({ "x": x, "y": y })).collect();
    json!({
        "id": id,
        "name": id,
        "health": health,
        "body": body.clone(),
        "head": body[0].clone(),
        "length": body.len(),
    })
}

fn request(
    ruleset: serde_json::Value,
    snakes: serde_json::Value,
    food: &[(i32, i32)],
    hazards: &[(i32, i32)],
) -> GameState {
    let you = snakes[0].clone();
    let food: Vec<_> = food.iter().map(|&(x, y)| json!({ "x": x, "y": y })).collect();
    let hazards: Vec<_> = hazards.iter().map(|&(x, y)| json!({ "x": x, "y": y })).collect();
    serde_json::from_value(json!({
        "game": { "id": "scenario", "ruleset": ruleset, "map": "standard", "timeout": 500 },
        "turn": 10,
        "board": { "height": 11, "width": 11, "food": food, "hazards": hazards, "snakes": snakes },
        "you": you
    }))
    .unwrap()
}

fn standard() -> serde_json::Value {
    json!({ "name": "standard", "settings": { "hazardDamagePerTurn": 14 } })
}

fn sim(state: &GameState) -> SimState {
    SimState::from_game_state(state, 4).unwrap()
}

fn capped_searcher(depth: u8) -> Searcher {
    let mut config = Config::default_hardcoded();
    config.timing.max_search_depth = depth;
    Searcher::new(&config)
}

#[test]
fn test_lone_snake_only_avoids_its_neck() {
    let state = request(standard(), json!([snake("a", &[(2, 0), (1, 0), (0, 0)], 100)]), &[], &[]);
    let s = sim(&state);
    let board = Board2d::new(&s);

    let safe = tactics::safe_moves(&s, &board, 0);
    assert!(!safe.contains(&Direction::Left), "left is the neck");
    assert!(safe.contains(&Direction::Up));
    assert!(safe.contains(&Direction::Right));

    let result = capped_searcher(3).choose_move(&s, None, &Deadline::unlimited(), |_| {});
    assert_ne!(result.direction, Direction::Left);
}

#[test]
fn test_swapping_heads_both_survive() {
    let state = request(
        standard(),
        json!([
            snake("a", &[(5, 5), (4, 5), (3, 5), (2, 5), (1, 5)], 90),
            snake("b", &[(6, 5), (7, 5), (8, 5)], 90),
        ]),
        &[],
        &[],
    );
    let next = simulator::advance(&sim(&state), &[Direction::Right, Direction::Left]);
    assert!(next.snakes[0].is_alive());
    assert!(next.snakes[1].is_alive());
}

#[test]
fn test_head_to_head_by_length() {
    // Equal length: both go
    let state = request(
        standard(),
        json!([
            snake("a", &[(4, 5), (3, 5), (2, 5)], 90),
            snake("b", &[(6, 5), (7, 5), (8, 5)], 90),
        ]),
        &[],
        &[],
    );
    let next = simulator::advance(&sim(&state), &[Direction::Right, Direction::Left]);
    assert_eq!(next.snakes[0].eliminated, Some(Elimination::HeadToHead(1)));
    assert_eq!(next.snakes[1].eliminated, Some(Elimination::HeadToHead(0)));

    // Longer survives
    let state = request(
        standard(),
        json!([
            snake("a", &[(4, 5), (3, 5), (2, 5), (1, 5)], 90),
            snake("b", &[(6, 5), (7, 5), (8, 5)], 90),
        ]),
        &[],
        &[],
    );
    let next = simulator::advance(&sim(&state), &[Direction::Right, Direction::Left]);
    assert!(next.snakes[0].is_alive());
    assert_eq!(next.snakes[1].eliminated, Some(Elimination::HeadToHead(0)));
}

#[test]
fn test_starving_in_hazard() {
    let state = request(
        standard(),
        json!([snake("a", &[(5, 5), (5, 4), (5, 3)], 10)]),
        &[],
        &[(5, 6), (6, 6), (4, 6)],
    );
    let next = simulator::advance(&sim(&state), &[Direction::Up]);
    assert_eq!(next.snakes[0].health, 0);
    assert_eq!(next.snakes[0].eliminated, Some(Elimination::Starvation));
}

#[test]
fn test_tail_chase_unless_owner_eats() {
    // A tight loop: the head is next to its own tail
    let body = [(5, 5), (5, 4), (4, 4), (4, 5)];
    let state = request(standard(), json!([snake("a", &body, 80)]), &[], &[]);
    let next = simulator::advance(&sim(&state), &[Direction::Left]);
    assert!(next.snakes[0].is_alive(), "own tail moves away");

    // Another snake's tail, whose owner is about to eat, stays put
    let state = request(
        standard(),
        json!([
            snake("a", &[(3, 3), (3, 2), (3, 1)], 80),
            snake("b", &[(5, 4), (5, 3), (4, 3)], 80),
        ]),
        &[(6, 4)],
        &[],
    );
    let next = simulator::advance(&sim(&state), &[Direction::Right, Direction::Right]);
    assert_eq!(next.snakes[0].eliminated, Some(Elimination::BodyCollision(1)));
    assert!(next.snakes[1].is_alive());

    // The same tail without food is free
    let state = request(
        standard(),
        json!([
            snake("a", &[(3, 3), (3, 2), (3, 1)], 80),
            snake("b", &[(5, 4), (5, 3), (4, 3)], 80),
        ]),
        &[],
        &[],
    );
    let next = simulator::advance(&sim(&state), &[Direction::Right, Direction::Right]);
    assert!(next.snakes[0].is_alive());
}

#[test]
fn test_wrapped_ruleset_crosses_the_edge() {
    let state = request(
        json!({ "name": "wrapped" }),
        json!([snake("a", &[(0, 5), (1, 5), (2, 5)], 80)]),
        &[],
        &[],
    );
    let s = sim(&state);
    let board = Board2d::new(&s);
    assert!(tactics::safe_moves(&s, &board, 0).contains(&Direction::Left));
    let next = simulator::advance(&s, &[Direction::Left]);
    assert_eq!(next.snakes[0].head(), Coord::new(10, 5));
    assert!(next.snakes[0].is_alive());
}

#[test]
fn test_search_finds_the_kill() {
    // The rival's only way out of the corner is (1,10); we are longer
    let state = request(
        standard(),
        json!([
            snake("us", &[(2, 10), (3, 10), (4, 10), (5, 10)], 80),
            snake("rival", &[(0, 10), (0, 9), (0, 8)], 80),
        ]),
        &[],
        &[],
    );
    let result = capped_searcher(3).choose_move(&sim(&state), None, &Deadline::unlimited(), |_| {});
    assert_eq!(result.direction, Direction::Left);
    assert!(result.score > 1e6, "a forced win scores above every heuristic value");
}

#[test]
fn test_repeated_searches_agree() {
    let state = request(
        standard(),
        json!([
            snake("us", &[(3, 3), (3, 2), (3, 1)], 70),
            snake("b", &[(7, 7), (7, 8), (7, 9)], 70),
            snake("c", &[(7, 3), (8, 3), (9, 3)], 70),
        ]),
        &[(5, 5), (1, 9)],
        &[],
    );
    let s = sim(&state);
    let searcher = capped_searcher(2);
    let first = searcher.choose_move(&s, None, &Deadline::unlimited(), |_| {});
    let second = searcher.choose_move(&s, None, &Deadline::unlimited(), |_| {});
    assert_eq!(first.direction, second.direction);
    assert_eq!(first.depth, second.depth);
    assert_eq!(first.score, second.score);
}

#[test]
fn test_decision_respects_time_budget() {
    // Four snakes with the full default depth cap: only the clock stops it
    let state = request(
        standard(),
        json!([
            snake("us", &[(5, 5), (5, 4), (5, 3), (5, 2)], 90),
            snake("b", &[(1, 1), (1, 2), (1, 3)], 90),
            snake("c", &[(9, 9), (9, 8), (9, 7)], 90),
            snake("d", &[(1, 9), (2, 9), (3, 9)], 90),
        ]),
        &[(0, 0), (10, 10), (5, 8)],
        &[],
    );
    let bot = Bot::new(Config::default_hardcoded());
    let start = Instant::now();
    let decision = bot.decide(&state, start).unwrap();
    let elapsed = start.elapsed();

    let budget = Config::default_hardcoded().timing.budget_for_timeout(500);
    assert!(
        elapsed < Duration::from_millis(budget + 100),
        "took {:?} with a {}ms budget",
        elapsed,
        budget
    );
    assert!(decision.depth >= 1);
    assert_ne!(decision.direction, Direction::Down, "down is the neck");
}

#[test]
fn test_malformed_requests_fail_fast() {
    let mut state = request(standard(), json!([snake("a", &[(2, 2), (2, 1), (2, 0)], 80)]), &[], &[]);
    state.board.width = 0;
    assert_eq!(
        SimState::from_game_state(&state, 4).unwrap_err(),
        EngineError::InvalidBoard { width: 0, height: 11 }
    );

    let mut state = request(standard(), json!([snake("a", &[(2, 2), (2, 1), (2, 0)], 80)]), &[], &[]);
    state.you.id = "ghost".to_string();
    assert_eq!(
        Bot::new(Config::default_hardcoded())
            .decide(&state, Instant::now())
            .unwrap_err(),
        EngineError::SnakeNotFound("ghost".to_string())
    );
}
