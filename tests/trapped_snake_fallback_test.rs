// Integration tests for trapped snake fallback behavior
//
// When every direction is fatal the bot must still answer, and it should
// prefer dying in-bounds on a body over running into a wall or its own neck.

use serde_json::json;
use snake_maxn::bot::Bot;
use snake_maxn::config::Config;
use snake_maxn::types::GameState;
use std::time::Instant;

fn quick_bot() -> Bot {
    let mut config = Config::default_hardcoded();
    config.timing.response_time_budget_ms = 150;
    config.timing.max_search_depth = 4;
    Bot::new(config)
}

fn request(snakes: serde_json::Value) -> GameState {
    let you = snakes[0].clone();
    serde_json::from_value(json!({
        "game": { "id": "trapped", "ruleset": { "name": "standard" }, "timeout": 500 },
        "turn": 40,
        "board": { "height": 11, "width": 11, "food": [], "hazards": [], "snakes": snakes },
        "you": you
    }))
    .unwrap()
}

fn snake(id: &str, body: &[(i32, i32)]) -> serde_json::Value {
    let body: Vec<_> = body.iter().map(|&(x, y)| json!({ "x": x, "y": y })).collect();
    json!({
        "id": id,
        "name": id,
        "health": 50,
        "body": body.clone(),
        "head": body[0].clone(),
        "length": body.len(),
    })
}

/// Head against the top wall, own body on the left, opponent body on the
/// right, neck below: only the two body cells stay on the board
#[tokio::test]
async fn test_trapped_at_top_wall_dies_in_bounds() {
    let state = request(json!([
        snake("us", &[(5, 10), (5, 9), (4, 9), (4, 10), (3, 10), (2, 10)]),
        snake("them", &[(6, 8), (6, 9), (6, 10), (7, 10), (8, 10)]),
    ]));

    let response = quick_bot().get_move(&state).await;
    let chosen = response["move"].as_str().unwrap();

    assert!(
        chosen == "left" || chosen == "right",
        "expected an in-bounds body move, got {}",
        chosen
    );
    assert!(response["shout"].as_str().unwrap().contains("no safe move"));
}

/// Coiled against the bottom wall: down is the wall, up the neck
#[tokio::test]
async fn test_trapped_at_bottom_wall_avoids_down() {
    let state = request(json!([snake(
        "us",
        &[(5, 0), (5, 1), (4, 1), (4, 0), (3, 0), (2, 0), (1, 0), (0, 0), (0, 1), (0, 2), (1, 2), (2, 2), (3, 2), (4, 2), (5, 2), (6, 2), (6, 1), (6, 0), (7, 0)]
    )]));

    let response = quick_bot().get_move(&state).await;
    let chosen = response["move"].as_str().unwrap();

    assert_ne!(chosen, "down", "should not choose the wall at y=0");
    assert_ne!(chosen, "up", "should not choose the neck");
}

/// The synchronous call agrees with the HTTP path on forced choices
#[test]
fn test_decide_reports_least_bad_move() {
    let state = request(json!([
        snake("us", &[(5, 10), (5, 9), (4, 9), (4, 10), (3, 10), (2, 10)]),
        snake("them", &[(6, 8), (6, 9), (6, 10), (7, 10), (8, 10)]),
    ]));

    let decision = quick_bot().decide(&state, Instant::now()).unwrap();
    assert_eq!(decision.depth, 0);
    assert!(decision.rationale.contains("no safe move"));
    assert_ne!(decision.direction.as_str(), "up");
    assert_ne!(decision.direction.as_str(), "down");
}

/// A single open cell is taken immediately without a search
#[tokio::test]
async fn test_single_escape_is_taken() {
    // Left is the wall, down the neck, up the second snake; only right is open
    let mut state = request(json!([snake(
        "us",
        &[(0, 5), (0, 4), (1, 4), (1, 3), (0, 3), (0, 2), (0, 1)]
    )]));
    // Close the gap above the head with the body of a second snake
    let blocker: snake_maxn::types::Battlesnake =
        serde_json::from_value(snake("wall", &[(2, 8), (1, 8), (1, 7), (1, 6), (0, 6), (0, 7)]))
            .unwrap();
    state.board.snakes.push(blocker);

    let response = quick_bot().get_move(&state).await;
    assert_eq!(response["move"], "right");
    assert!(response["shout"].as_str().unwrap().contains("only safe move"));
}
