//! Simple profiling guards using thread-local storage
//!
//! Lightweight timing without changing function signatures. Each worker thread
//! accumulates locally and folds into the global counters with
//! `merge_thread_local`. Enable with environment variable: BATTLESNAKE_PROFILE=1

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

const CATEGORIES: [&str; 7] = [
    "board_build",
    "apply_move",
    "move_gen",
    "tactics",
    "territory",
    "eval",
    "maxn",
];

const N: usize = CATEGORIES.len();

#[derive(Default, Clone, Copy)]
struct Local {
    time_ns: [u64; N],
    calls: [usize; N],
    memo_lookups: usize,
    memo_hits: usize,
}

thread_local! {
    static LOCAL: RefCell<Local> = RefCell::new(Local::default());
}

#[allow(clippy::declare_interior_mutable_const)]
const ZERO_U64: AtomicU64 = AtomicU64::new(0);
#[allow(clippy::declare_interior_mutable_const)]
const ZERO_USIZE: AtomicUsize = AtomicUsize::new(0);

// Global aggregators
static GLOBAL_TIME: [AtomicU64; N] = [ZERO_U64; N];
static GLOBAL_CALLS: [AtomicUsize; N] = [ZERO_USIZE; N];
static GLOBAL_MEMO_LOOKUPS: AtomicUsize = AtomicUsize::new(0);
static GLOBAL_MEMO_HITS: AtomicUsize = AtomicUsize::new(0);

#[inline]
pub fn is_profiling_enabled() -> bool {
    std::env::var("BATTLESNAKE_PROFILE").is_ok()
}

fn category_index(category: &str) -> Option<usize> {
    CATEGORIES.iter().position(|&c| c == category)
}

pub struct ProfileGuard {
    start: Instant,
    slot: usize,
}

impl ProfileGuard {
    pub fn new(category: &'static str) -> Option<Self> {
        if !is_profiling_enabled() {
            return None;
        }
        category_index(category).map(|slot| ProfileGuard {
            start: Instant::now(),
            slot,
        })
    }
}

impl Drop for ProfileGuard {
    fn drop(&mut self) {
        let elapsed_ns = self.start.elapsed().as_nanos() as u64;
        LOCAL.with(|l| {
            let mut l = l.borrow_mut();
            l.time_ns[self.slot] += elapsed_ns;
            l.calls[self.slot] += 1;
        });
    }
}

#[inline]
pub fn record_memo_lookup(hit: bool) {
    if is_profiling_enabled() {
        LOCAL.with(|l| {
            let mut l = l.borrow_mut();
            l.memo_lookups += 1;
            if hit {
                l.memo_hits += 1;
            }
        });
    }
}

/// Folds this thread's counters into the global totals
pub fn merge_thread_local() {
    if !is_profiling_enabled() {
        return;
    }
    let local = LOCAL.with(|l| std::mem::take(&mut *l.borrow_mut()));
    for i in 0..N {
        GLOBAL_TIME[i].fetch_add(local.time_ns[i], Ordering::Relaxed);
        GLOBAL_CALLS[i].fetch_add(local.calls[i], Ordering::Relaxed);
    }
    GLOBAL_MEMO_LOOKUPS.fetch_add(local.memo_lookups, Ordering::Relaxed);
    GLOBAL_MEMO_HITS.fetch_add(local.memo_hits, Ordering::Relaxed);
}

pub fn print_report(total_time_ms: u64) {
    if !is_profiling_enabled() {
        return;
    }

    let total_ns = total_time_ms * 1_000_000;

    eprintln!("\n═══════════════════════════════════════════════════════════");
    eprintln!("                 PERFORMANCE PROFILE");
    eprintln!("═══════════════════════════════════════════════════════════");
    eprintln!("Total Time: {}ms\n", total_time_ms);

    for (i, name) in CATEGORIES.iter().enumerate() {
        let time = GLOBAL_TIME[i].load(Ordering::Relaxed);
        let count = GLOBAL_CALLS[i].load(Ordering::Relaxed);
        let ms = time as f64 / 1_000_000.0;
        let pct = if total_ns > 0 { 100.0 * time as f64 / total_ns as f64 } else { 0.0 };
        let avg_us = if count > 0 { time as f64 / (count * 1000) as f64 } else { 0.0 };
        eprintln!(
            "  {:<12} {:>9.2}ms ({:>5.1}%) - {} calls, {:.2}µs avg",
            name, ms, pct, count, avg_us
        );
    }

    let lookups = GLOBAL_MEMO_LOOKUPS.load(Ordering::Relaxed);
    let hits = GLOBAL_MEMO_HITS.load(Ordering::Relaxed);
    let hit_rate = if lookups > 0 { 100.0 * hits as f64 / lookups as f64 } else { 0.0 };

    eprintln!("\nMemo Table:");
    eprintln!("  Lookups:    {}", lookups);
    eprintln!("  Hits:       {} ({:.1}%)", hits, hit_rate);
    eprintln!("═══════════════════════════════════════════════════════════\n");
}
