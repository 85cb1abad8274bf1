//! Tagger selection.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Chooses which roster slot becomes the initial tagger.
pub trait TaggerPicker: Send {
    /// Returns an index in `0..len`. Callers never pass `len == 0`.
    fn pick(&mut self, len: usize) -> usize;
}

/// Uniform selection backed by a seedable RNG.
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl TaggerPicker for RandomPicker {
    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed list of picks, then keeps returning the last one.
#[cfg(test)]
pub(crate) struct ScriptedPicker {
    picks: std::collections::VecDeque<usize>,
    last: usize,
}

#[cfg(test)]
impl ScriptedPicker {
    pub(crate) fn new(picks: &[usize]) -> Self {
        Self {
            picks: picks.iter().copied().collect(),
            last: 0,
        }
    }
}

#[cfg(test)]
impl TaggerPicker for ScriptedPicker {
    fn pick(&mut self, len: usize) -> usize {
        if let Some(next) = self.picks.pop_front() {
            self.last = next;
        }
        self.last.min(len.saturating_sub(1))
    }
}
