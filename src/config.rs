// Configuration module for reading Snake.toml
// Every tunable constant of the engine lives here; nothing downstream hardcodes weights

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub timing: TimingConfig,
    pub search: SearchConfig,
    pub scores: ScoresConfig,
    pub territory: TerritoryConfig,
    pub game_rules: GameRulesConfig,
    pub debug: DebugConfig,
}

/// Timing and performance constants
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    pub response_time_budget_ms: u64,
    pub network_overhead_ms: u64,
    pub polling_interval_ms: u64,
    pub initial_depth: u8,
    pub max_search_depth: u8,
    /// Stop deepening when less than this is left on the clock
    pub min_time_remaining_ms: u64,
}

impl TimingConfig {
    /// Computes the effective computation budget
    pub fn effective_budget_ms(&self) -> u64 {
        self.response_time_budget_ms.saturating_sub(self.network_overhead_ms)
    }

    /// Budget for a game whose server announces `timeout_ms` per move.
    /// A zero timeout means the server did not send one.
    pub fn budget_for_timeout(&self, timeout_ms: u64) -> u64 {
        if timeout_ms == 0 {
            return self.effective_budget_ms();
        }
        self.response_time_budget_ms
            .min(timeout_ms)
            .saturating_sub(self.network_overhead_ms)
    }
}

/// Search controller switches
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Search root candidate moves on the rayon pool
    pub parallel_root: bool,
    pub memoization: bool,
    /// Entries per memo table before it is cleared
    pub memo_capacity: usize,
}

/// All evaluation and scoring constants
#[derive(Debug, Deserialize, Clone)]
pub struct ScoresConfig {
    // Health
    pub weight_health: f64,
    pub low_health_threshold: i32,
    pub low_health_penalty: f64,

    // Length and king snake
    pub weight_length: f64,
    pub king_margin: usize,
    pub king_bonus: f64,

    // Territory delta against the best other snake
    pub weight_territory: f64,

    // Food distance
    pub weight_food: f64,
    pub hungry_health_threshold: i32,
    pub hungry_food_multiplier: f64,

    // Hazard exposure
    pub weight_hazard: f64,
    pub hazard_frontier_penalty: f64,
    pub frontier_horizon_turns: i32,

    // Kiss of death, worst first
    pub death_suicide: f64,
    pub death_certain: f64,
    pub death_certain_mutual: f64,
    pub death_possible_3to1: f64,
    pub death_possible: f64,
    pub death_possible_mutual: f64,
    pub death_likely_multiplier: f64,

    // Kiss of murder
    pub murder_certain: f64,
    pub murder_possible_safe: f64,
    pub murder_possible_unsafe: f64,

    // Terminal scores
    pub win_score: f64,
    /// Non-terminal scores are clamped to +/- this value
    pub non_terminal_limit: f64,

    /// Applied to the remaining terms when territory could not be computed
    pub degraded_eval_factor: f64,
}

/// Territory estimator constants
#[derive(Debug, Deserialize, Clone)]
pub struct TerritoryConfig {
    /// Worth of one hazard layer relative to a free cell
    pub hazard_cell_value: f64,
    pub max_cells: usize,
}

/// Game rules constants
#[derive(Debug, Deserialize, Clone)]
pub struct GameRulesConfig {
    pub max_hazard_stack: u8,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Snake.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Loads default configuration from Snake.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Snake.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Snake.toml
    pub fn default_hardcoded() -> Self {
        Config {
            timing: TimingConfig {
                response_time_budget_ms: 400,
                network_overhead_ms: 50,
                polling_interval_ms: 20,
                initial_depth: 1,
                max_search_depth: 20,
                min_time_remaining_ms: 10,
            },
            search: SearchConfig {
                parallel_root: true,
                memoization: true,
                memo_capacity: 200_000,
            },
            scores: ScoresConfig {
                weight_health: 1.0,
                low_health_threshold: 25,
                low_health_penalty: 8.0,
                weight_length: 15.0,
                king_margin: 4,
                king_bonus: 120.0,
                weight_territory: 6.0,
                weight_food: 3.0,
                hungry_health_threshold: 40,
                hungry_food_multiplier: 3.0,
                weight_hazard: 20.0,
                hazard_frontier_penalty: 40.0,
                frontier_horizon_turns: 3,
                death_suicide: -1000.0,
                death_certain: -700.0,
                death_certain_mutual: -450.0,
                death_possible_3to1: -300.0,
                death_possible: -180.0,
                death_possible_mutual: -90.0,
                death_likely_multiplier: 1.5,
                murder_certain: 250.0,
                murder_possible_safe: 80.0,
                murder_possible_unsafe: 25.0,
                win_score: 1_000_000_000.0,
                non_terminal_limit: 1_000_000.0,
                degraded_eval_factor: 0.5,
            },
            territory: TerritoryConfig {
                hazard_cell_value: 0.375,
                max_cells: 4096,
            },
            game_rules: GameRulesConfig {
                max_hazard_stack: 4,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "battlesnake_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default()
            .unwrap_or_else(|e| {
                log::warn!("Could not load Snake.toml ({}), using hardcoded defaults", e);
                Self::default_hardcoded()
            })
    }
}
