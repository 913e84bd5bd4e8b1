// Standalone replay tool for analyzing Battlesnake debug logs
//
// Usage:
//   cargo run --bin replay -- <log_file> [options]
//
// Options:
//   --all                  Replay all turns
//   --turns <turn1,turn2>  Replay specific turns (comma-separated)
//   --validate             Check logged moves against expectations
//   --verbose              Show detailed output for each turn
//   --config <path>        Path to Snake.toml (default: Snake.toml)
//
// Set BATTLESNAKE_PROFILE=1 to print a profiling report after the replay.

use std::env;
use std::process;
use std::time::Instant;

use snake_maxn::config::Config;
use snake_maxn::replay::{parse_expected_moves, ReplayEngine};
use snake_maxn::simple_profiler;

fn print_usage() {
    eprintln!("Battlesnake Replay Tool");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  replay <log_file> [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --all                   Replay all turns in the log");
    eprintln!("  --turns <T1,T2,...>     Replay specific turns (comma-separated)");
    eprintln!("  --validate <T:M,...>    Validate expected moves (format: turn:move,...)");
    eprintln!("  --verbose               Show detailed output for each turn");
    eprintln!("  --config <path>         Path to Snake.toml (default: Snake.toml)");
    eprintln!("  --help                  Show this help message");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("  replay battlesnake_debug.jsonl --all");
    eprintln!("  replay battlesnake_debug.jsonl --turns 5,10,15");
    eprintln!("  replay battlesnake_debug.jsonl --validate 5:up,10:right|down");
}

fn parse_turns(s: &str) -> Result<Vec<i32>, String> {
    s.split(',')
        .map(|t| {
            t.trim()
                .parse::<i32>()
                .map_err(|e| format!("Invalid turn number '{}': {}", t, e))
        })
        .collect()
}

enum Mode {
    All,
    Turns(String),
    Validate(String),
}

fn fail(message: String) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let wants_help = args.iter().any(|a| a == "--help");

    if args.len() < 2 || wants_help {
        print_usage();
        process::exit(if wants_help { 0 } else { 1 });
    }

    let log_file = &args[1];
    let mut config_path = "Snake.toml".to_string();
    let mut verbose = false;
    let mut mode = None;

    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--all" => mode = Some(Mode::All),
            "--turns" => match rest.next() {
                Some(v) => mode = Some(Mode::Turns(v.clone())),
                None => fail("--turns requires an argument".to_string()),
            },
            "--validate" => match rest.next() {
                Some(v) => mode = Some(Mode::Validate(v.clone())),
                None => fail("--validate requires an argument".to_string()),
            },
            "--config" => match rest.next() {
                Some(v) => config_path = v.clone(),
                None => fail("--config requires an argument".to_string()),
            },
            "--verbose" => verbose = true,
            other => {
                print_usage();
                fail(format!("Unknown option '{}'", other));
            }
        }
    }

    let mode = match mode {
        Some(m) => m,
        None => {
            print_usage();
            fail("Must specify --all, --turns, or --validate".to_string());
        }
    };

    let config = Config::from_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from '{}': {}", config_path, e);
        eprintln!("Using default configuration");
        Config::default_hardcoded()
    });

    println!("Loaded configuration from: {}", config_path);
    println!("Replay log file: {}", log_file);
    println!();

    let engine = ReplayEngine::new(config, verbose);

    let entries = engine
        .load_log_file(log_file)
        .unwrap_or_else(|e| fail(format!("loading log file: {}", e)));

    if entries.is_empty() {
        fail("Log file is empty".to_string());
    }

    println!("Loaded {} log entries\n", entries.len());
    let started = Instant::now();

    match mode {
        Mode::All => {
            println!("Replaying all {} turns...\n", entries.len());
            let results = engine.replay_all(&entries);
            engine.print_report(&results);
        }
        Mode::Turns(arg) => {
            let turns = parse_turns(&arg).unwrap_or_else(|e| fail(format!("parsing turns: {}", e)));
            println!("Replaying {} specific turn(s)...\n", turns.len());
            match engine.replay_turns(&entries, &turns) {
                Ok(results) => engine.print_report(&results),
                Err(e) => fail(format!("during replay: {}", e)),
            }
        }
        Mode::Validate(arg) => {
            let expected = parse_expected_moves(&arg)
                .unwrap_or_else(|e| fail(format!("parsing expected moves: {}", e)));
            println!("Validating {} expected move(s)...\n", expected.len());
            match engine.validate_expected_moves(&entries, &expected) {
                Ok(()) => println!("✓ All expected moves validated successfully!"),
                Err(e) => fail(format!("✗ Validation failed: {}", e)),
            }
        }
    }

    if simple_profiler::is_profiling_enabled() {
        simple_profiler::print_report(started.elapsed().as_millis() as u64);
    }
}
