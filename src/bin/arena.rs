// Local self-play tool
//
// Usage:
//   cargo run --release --bin arena -- [options]
//
// Options:
//   --games <n>        Number of games (default: 10)
//   --snakes <n>       Snakes per game (default: 2)
//   --turns <n>        Turn limit per game (default: 500)
//   --budget <ms>      Search budget per move (default: 100)
//   --seed <n>         RNG seed for food and royale shrinking (default: 1)
//   --royale <n>       Shrink the safe area every n turns
//   --config <path>    Path to Snake.toml (default: Snake.toml)

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::env;
use std::process;
use std::time::Instant;

use snake_maxn::arena::{self, ArenaSettings};
use snake_maxn::config::Config;
use snake_maxn::simple_profiler;

fn print_usage() {
    eprintln!("Battlesnake Arena");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  arena [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --games <n>        Number of games (default: 10)");
    eprintln!("  --snakes <n>       Snakes per game (default: 2)");
    eprintln!("  --turns <n>        Turn limit per game (default: 500)");
    eprintln!("  --budget <ms>      Search budget per move (default: 100)");
    eprintln!("  --seed <n>         RNG seed (default: 1)");
    eprintln!("  --royale <n>       Shrink the safe area every n turns");
    eprintln!("  --config <path>    Path to Snake.toml (default: Snake.toml)");
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> T {
    match value.map(|v| v.parse::<T>()) {
        Some(Ok(n)) => n,
        _ => {
            eprintln!("Error: {} requires a numeric argument", flag);
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut games: usize = 10;
    let mut seed: u64 = 1;
    let mut config_path = "Snake.toml".to_string();
    let mut settings = ArenaSettings::default();

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--games" => games = parse_number(arg, it.next()),
            "--snakes" => settings.snakes = parse_number(arg, it.next()),
            "--turns" => settings.max_turns = parse_number(arg, it.next()),
            "--budget" => settings.move_budget_ms = Some(parse_number(arg, it.next())),
            "--seed" => seed = parse_number(arg, it.next()),
            "--royale" => settings.rules.shrink_every_n_turns = parse_number(arg, it.next()),
            "--config" => match it.next() {
                Some(p) => config_path = p.clone(),
                None => {
                    eprintln!("Error: --config requires an argument");
                    process::exit(1);
                }
            },
            "--help" => {
                print_usage();
                process::exit(0);
            }
            other => {
                eprintln!("Error: Unknown option '{}'", other);
                print_usage();
                process::exit(1);
            }
        }
    }

    if settings.snakes == 0 || settings.snakes > 8 {
        eprintln!("Error: --snakes must be between 1 and 8");
        process::exit(1);
    }

    let config = Config::from_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from '{}': {}", config_path, e);
        eprintln!("Using default configuration");
        Config::default_hardcoded()
    });

    let mut rng = StdRng::seed_from_u64(seed);
    let mut wins: HashMap<Option<usize>, usize> = HashMap::new();
    let mut total_turns = 0;
    let started = Instant::now();

    for game in 0..games {
        let start = arena::standard_start(&settings, &mut rng);
        let outcome = arena::play_game(&config, &settings, start, &mut rng);
        println!(
            "Game {:>3}: {:>4} turns, winner {}",
            game + 1,
            outcome.turns,
            outcome
                .winner
                .map(|w| format!("snake {}", w))
                .unwrap_or_else(|| "none".to_string())
        );
        *wins.entry(outcome.winner).or_insert(0) += 1;
        total_turns += outcome.turns as usize;
    }

    println!("\n═══════════════════════════════════════════════════════════");
    println!("                    ARENA REPORT");
    println!("═══════════════════════════════════════════════════════════");
    for snake in 0..settings.snakes {
        println!("Snake {} wins:   {}", snake, wins.get(&Some(snake)).copied().unwrap_or(0));
    }
    println!("No winner:      {}", wins.get(&None).copied().unwrap_or(0));
    if games > 0 {
        println!("Average turns:  {:.1}", total_turns as f64 / games as f64);
    }
    println!("═══════════════════════════════════════════════════════════\n");

    if simple_profiler::is_profiling_enabled() {
        simple_profiler::print_report(started.elapsed().as_millis() as u64);
    }
}
