//! Random condition assignment

use super::{Condition, ConditionCatalog};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source of uniform random indices
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..len`; `len` is never zero
    fn pick_index(&self, len: usize) -> usize;
}

/// Production source backed by the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn pick_index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Deterministic source that replays a fixed sequence, cycling at the end
#[derive(Debug)]
pub struct SequenceSource {
    picks: Vec<usize>,
    cursor: AtomicUsize,
}

impl SequenceSource {
    pub fn new(picks: Vec<usize>) -> Self {
        Self {
            picks,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl RandomSource for SequenceSource {
    fn pick_index(&self, len: usize) -> usize {
        if self.picks.is_empty() {
            return 0;
        }
        let at = self.cursor.fetch_add(1, Ordering::Relaxed) % self.picks.len();
        self.picks[at] % len
    }
}

/// Pick one condition uniformly at random
pub fn assign<'a>(catalog: &'a ConditionCatalog, rng: &dyn RandomSource) -> &'a Condition {
    catalog.nth_wrapping(rng.pick_index(catalog.len()))
}
