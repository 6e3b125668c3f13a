//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a stage produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and the headless runner rely on stages being 100% deterministic.
//! Sources of non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units live in a `BTreeMap` and are always visited in id order.
//!
//! - **System randomness**: Hit rolls and AI noise draw from the stage's
//!   seeded `ChaCha8Rng` only.
//!
//! - **Floating-point positions**: Render positions use fixed-point
//!   [`tactics_core::math::Vec2Fixed`]. Floats appear only in hit rates,
//!   which are computed the same way on every run.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use tactics_core::stage::Stage;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// All unique hashes (1 for a deterministic stage).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Stage is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Creates the initial state
/// * `step` - Advances the state by one tick
/// * `hash` - Computes the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a stage twice from the same setup and compare final hashes.
pub fn verify_stage_determinism<F>(setup_fn: F, num_ticks: u64, tick_ms: u64) -> bool
where
    F: Fn() -> Stage,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |stage| {
            stage.update(tick_ms);
        },
        Stage::state_hash,
    )
    .is_deterministic
}

/// Run `num_stages` stages on scoped threads and collect final hashes.
///
/// Each stage is built on its own thread, so the setup function only has
/// to be `Sync`.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_stages<F>(setup_fn: F, num_stages: usize, num_ticks: u64, tick_ms: u64) -> DeterminismResult
where
    F: Fn() -> Stage + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_stages)
            .map(|_| {
                s.spawn(|| {
                    let mut stage = setup_fn();
                    for _ in 0..num_ticks {
                        stage.update(tick_ms);
                    }
                    stage.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("stage thread panicked"))
            .collect()
    });

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick by tick and return the first tick at which they
/// differ, or `None`.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, tick_ms: u64) -> Option<u64>
where
    F: Fn() -> Stage,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.update(tick_ms);
        second.update(tick_ms);

        if first.state_hash() != second.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for grids, routes and stats.
pub mod strategies {
    use proptest::prelude::*;
    use tactics_core::combat::UnitClass;
    use tactics_core::grid::{Point, IMPASSABLE, NORMAL_COST};
    use tactics_core::pathfinding::{Direction, Route};
    use tactics_core::unit::Stats;

    /// A point inside a `width × height` grid.
    pub fn arb_point(width: u32, height: u32) -> impl Strategy<Value = Point> {
        (0..width as i32, 0..height as i32).prop_map(|(x, y)| Point::new(x, y))
    }

    /// A single direction.
    pub fn arb_direction() -> impl Strategy<Value = Direction> {
        prop_oneof![
            Just(Direction::Up),
            Just(Direction::Left),
            Just(Direction::Right),
            Just(Direction::Down),
        ]
    }

    /// A route of up to `max_len` steps.
    pub fn arb_route(max_len: usize) -> impl Strategy<Value = Route> {
        proptest::collection::vec(arb_direction(), 0..=max_len).prop_map(Route::from_iter)
    }

    /// A walk cost: mostly normal, sometimes rough, sometimes impassable.
    pub fn arb_cost() -> impl Strategy<Value = u32> {
        prop_oneof![
            6 => Just(NORMAL_COST),
            2 => (2u32..=5).prop_map(|n| n * 100),
            1 => Just(IMPASSABLE),
        ]
    }

    /// Dimensions and row-major costs of a grid up to `max_side` square.
    pub fn arb_cost_grid(max_side: u32) -> impl Strategy<Value = (u32, u32, Vec<u32>)> {
        (1..=max_side, 1..=max_side).prop_flat_map(|(w, h)| {
            proptest::collection::vec(arb_cost(), (w * h) as usize).prop_map(move |costs| (w, h, costs))
        })
    }

    /// A unit class.
    pub fn arb_class() -> impl Strategy<Value = UnitClass> {
        prop_oneof![
            Just(UnitClass::Close),
            Just(UnitClass::Mid),
            Just(UnitClass::Long),
        ]
    }

    /// Stats of a random class and level with random accuracy and
    /// avoidance.
    pub fn arb_stats() -> impl Strategy<Value = Stats> {
        (arb_class(), 1u32..20, 0u32..80, 0u32..60).prop_map(|(class, level, accuracy, avoidance)| Stats {
            accuracy,
            avoidance,
            ..Stats::for_class(class, level)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ally, auto_config, foe, grid_from_rows};
    use tactics_core::combat::UnitClass;
    use tactics_core::presenter::TimelinePresenter;

    fn skirmish() -> Stage {
        let grid = grid_from_rows(&["......", "..#...", "......"]);
        let mut stage = Stage::new(grid, auto_config(11), Box::new(TimelinePresenter::new()));
        for data in [
            ally("a", UnitClass::Close, 0, 0),
            ally("b", UnitClass::Long, 0, 2),
            foe("x", UnitClass::Mid, 5, 1),
        ] {
            stage.spawn(&data).expect("free block");
        }
        stage
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_skirmish_is_deterministic() {
        assert!(verify_stage_determinism(skirmish, 400, 50));
        assert_eq!(find_first_divergence(skirmish, 200, 50), None);
    }

    #[test]
    fn test_parallel_skirmishes_match() {
        run_parallel_stages(skirmish, 4, 300, 50).assert_deterministic();
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&(1u32, "a")), compute_hash(&(1u32, "a")));
    }
}
