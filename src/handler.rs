// HTTP handler bindings for Battlesnake API endpoints
//
// Thin wrappers that bind Rocket routes to the Bot's methods. Handlers only
// deserialize the request, pull the Bot out of managed state and delegate.

use rocket::http::Status;
use rocket::serde::json::Json;
use serde_json::Value;

use snake_maxn::bot::Bot;
use snake_maxn::types::GameState;

/// GET / endpoint
/// Returns bot metadata and appearance configuration
#[get("/")]
pub fn index(bot: &rocket::State<Bot>) -> Json<Value> {
    Json(bot.info())
}

/// POST /start endpoint
/// Opens the match session
#[post("/start", format = "json", data = "<start_req>")]
pub fn start(bot: &rocket::State<Bot>, start_req: Json<GameState>) -> Status {
    bot.start(&start_req);

    Status::Ok
}

/// POST /move endpoint
/// Called each turn to compute and return the next move
#[post("/move", format = "json", data = "<move_req>")]
pub async fn get_move(bot: &rocket::State<Bot>, move_req: Json<GameState>) -> Json<Value> {
    Json(bot.get_move(&move_req).await)
}

/// POST /end endpoint
/// Releases the match session
#[post("/end", format = "json", data = "<end_req>")]
pub fn end(bot: &rocket::State<Bot>, end_req: Json<GameState>) -> Status {
    bot.end(&end_req);

    Status::Ok
}
