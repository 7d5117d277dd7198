//! Probabilistic node heights.
//!
//! Heights follow a geometric distribution with `p = 1/e`:
//! `P(height >= k + 1) = p^k`. Both the cumulative distribution and the size
//! thresholds that trigger head growth are precomputed once, so drawing a
//! height costs one random `f64` and a short table scan.
//!
//! ```text
//!   height:       1      2      3      4     ...
//!   P(height):  0.632  0.233  0.086  0.031   ...
//!   size_limit:   1      2      7     20     ...   (floor(e^h))
//! ```

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use super::skip_node::MAX_HEIGHT;

static SHARED: OnceLock<Arc<RandomHeight>> = OnceLock::new();

enum RandomSource {
    // Per-thread generator, no synchronization on the hot path
    ThreadLocal,
    // Reproducible sequence shared by every caller
    Seeded(Mutex<fastrand::Rng>),
}

/// Height oracle shared by the skip lists of a process (or a test).
pub struct RandomHeight {
    source: RandomSource,
    lookup_table: [f64; MAX_HEIGHT],
    size_limit_table: [usize; MAX_HEIGHT],
}

impl RandomHeight {
    /// Oracle drawing from the calling thread's generator.
    pub fn new() -> Self {
        Self::with_source(RandomSource::ThreadLocal)
    }

    /// Oracle drawing from a single seeded generator.
    ///
    /// Calls serialize on an internal mutex; meant for reproducible tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_source(RandomSource::Seeded(Mutex::new(fastrand::Rng::with_seed(seed))))
    }

    /// The process-wide oracle used when a list is built without one.
    pub fn shared() -> Arc<RandomHeight> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(RandomHeight::new())))
    }

    fn with_source(source: RandomSource) -> Self {
        let (lookup_table, size_limit_table) = Self::init_tables();
        RandomHeight {
            source,
            lookup_table,
            size_limit_table,
        }
    }

    fn init_tables() -> ([f64; MAX_HEIGHT], [usize; MAX_HEIGHT]) {
        let prob_inv = std::f64::consts::E;
        let prob = 1.0 / prob_inv;

        let mut lookup_table = [0.0; MAX_HEIGHT];
        let mut size_limit_table = [0usize; MAX_HEIGHT];

        let mut p = 1.0 - prob;
        let mut size_limit = 1.0f64;
        lookup_table[0] = p;
        size_limit_table[0] = 1;

        for i in 1..MAX_HEIGHT - 1 {
            p *= prob;
            size_limit *= prob_inv;
            lookup_table[i] = lookup_table[i - 1] + p;
            size_limit_table[i] = if size_limit >= usize::MAX as f64 {
                usize::MAX
            } else {
                size_limit as usize
            };
        }

        lookup_table[MAX_HEIGHT - 1] = 1.0;
        size_limit_table[MAX_HEIGHT - 1] = usize::MAX;

        (lookup_table, size_limit_table)
    }

    fn random_prob(&self) -> f64 {
        match &self.source {
            RandomSource::ThreadLocal => fastrand::f64(),
            RandomSource::Seeded(rng) => rng.lock().f64(),
        }
    }

    /// Draw a height in `[1, max_height]`.
    pub fn height(&self, max_height: usize) -> usize {
        debug_assert!((1..=MAX_HEIGHT).contains(&max_height));

        let p = self.random_prob();
        self.lookup_table
            .iter()
            .take(max_height)
            .position(|&limit| p < limit)
            .map_or(max_height, |index| index + 1)
    }

    /// Element count past which a list of `height` levels should grow.
    pub fn size_limit(&self, height: usize) -> usize {
        self.size_limit_table
            .get(height)
            .copied()
            .unwrap_or(usize::MAX)
    }
}

impl Default for RandomHeight {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RandomHeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match self.source {
            RandomSource::ThreadLocal => "thread_local",
            RandomSource::Seeded(_) => "seeded",
        };
        f.debug_struct("RandomHeight").field("source", &source).finish()
    }
}
