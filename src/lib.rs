// Library exports for the MaxN Battlesnake engine
// The HTTP server, replay tool and arena all drive the same core through here

pub mod arena;
pub mod board2d;
pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod error;
pub mod eval;
pub mod replay;
pub mod rules;
pub mod search;
pub mod session;
pub mod simple_profiler;
pub mod simulator;
pub mod state;
pub mod tactics;
pub mod territory;
pub mod types;
