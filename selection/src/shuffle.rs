use crate::address::Address;
use crate::seed::SelectionSeed;
use crate::types::WinnerAssignment;

/// Regular winners drawn after the super winner.
pub const MAX_REGULAR_WINNERS: usize = 20;

// Generator constants. Published results depend on them: never change.
const LCG_MULTIPLIER: u64 = 1_103_515_245;
const LCG_INCREMENT: u64 = 12_345;
const LCG_MODULUS: u64 = 1 << 32;

/// Linear congruential generator driving the shuffle.
///
/// Not a secure generator; the unpredictability comes from the beacon-derived seed.
#[derive(Debug, Clone)]
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: &SelectionSeed) -> Self {
        Self {
            state: u64::from(seed.low_u32()),
        }
    }

    /// `state = (state * A + C) mod 2^32`. State stays below 2^32, so the
    /// product fits in a u64.
    fn next(&mut self) -> u64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.state
    }
}

/// Fisher–Yates shuffle of an owned copy of `items`.
///
/// For `i` from the last index down to 1: advance the generator, take
/// `j = state mod (i + 1)`, swap `i` and `j`.
pub fn shuffle<T: Clone>(items: &[T], seed: &SelectionSeed) -> Vec<T> {
    let mut out = items.to_vec();
    let mut rng = Lcg::new(seed);
    for i in (1..out.len()).rev() {
        let j = (rng.next() % (i as u64 + 1)) as usize;
        out.swap(i, j);
    }
    out
}

/// Select one super winner and up to [`MAX_REGULAR_WINNERS`] regular winners.
pub fn select_winners(pool: &[Address], seed: &SelectionSeed) -> WinnerAssignment {
    select_winners_with_limit(pool, seed, MAX_REGULAR_WINNERS)
}

/// [`select_winners`] with a custom regular-winner cap.
pub fn select_winners_with_limit(
    pool: &[Address],
    seed: &SelectionSeed,
    max_regular: usize,
) -> WinnerAssignment {
    let shuffled = shuffle(pool, seed);
    let mut iter = shuffled.into_iter();
    let super_winner = iter.next();
    let regular_winners = iter.take(max_regular).collect();

    WinnerAssignment {
        super_winner,
        regular_winners,
    }
}
