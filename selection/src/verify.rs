use crate::address::Address;
use crate::seed::{derive_seed, SelectionSeed};
use crate::shuffle::select_winners_with_limit;
use crate::types::{SelectionError, WinnerAssignment};

/// Re-derive a published assignment from its public inputs.
///
/// Anyone holding the pool (in the same order), the contract address, and the
/// beacon's `(round, randomness)` must land on exactly the same winners.
/// `max_regular` is the cap the publisher ran with (normally
/// [`MAX_REGULAR_WINNERS`](crate::shuffle::MAX_REGULAR_WINNERS)).
/// Returns the seed on success so callers can display it.
pub fn verify_assignment(
    pool: &[Address],
    contract: &Address,
    round: u64,
    randomness: &str,
    max_regular: usize,
    published: &WinnerAssignment,
) -> Result<SelectionSeed, SelectionError> {
    let seed = derive_seed(randomness, contract, round);
    let computed = select_winners_with_limit(pool, &seed, max_regular);

    if computed.super_winner != published.super_winner {
        return Err(SelectionError::SuperWinnerMismatch {
            published: published.super_winner,
            computed: computed.super_winner,
        });
    }

    let longest = computed.regular_winners.len().max(published.regular_winners.len());
    for position in 0..longest {
        if computed.regular_winners.get(position) != published.regular_winners.get(position) {
            return Err(SelectionError::RegularWinnersMismatch { position });
        }
    }

    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shuffle::{select_winners, MAX_REGULAR_WINNERS};

    const RANDOMNESS: &str = "deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef";

    fn contract() -> Address {
        "0xC80577C2C0e860fC2935c809609Fa46456cECC51".parse().unwrap()
    }

    fn pool(n: u8) -> Vec<Address> {
        (1..=n).map(|i| Address::from_bytes([i; 20])).collect()
    }

    #[test]
    fn accepts_honest_result() {
        let pool = pool(30);
        let seed = derive_seed(RANDOMNESS, &contract(), 100);
        let published = select_winners(&pool, &seed);

        let verified = verify_assignment(&pool, &contract(), 100, RANDOMNESS, MAX_REGULAR_WINNERS, &published).unwrap();
        assert_eq!(verified, seed);
    }

    #[test]
    fn rejects_swapped_super_winner() {
        let pool = pool(10);
        let seed = derive_seed(RANDOMNESS, &contract(), 100);
        let mut published = select_winners(&pool, &seed);
        let first_regular = published.regular_winners[0];
        published.regular_winners[0] = published.super_winner.unwrap();
        published.super_winner = Some(first_regular);

        assert!(matches!(
            verify_assignment(&pool, &contract(), 100, RANDOMNESS, MAX_REGULAR_WINNERS, &published),
            Err(SelectionError::SuperWinnerMismatch { .. })
        ));
    }

    #[test]
    fn rejects_truncated_list() {
        let pool = pool(30);
        let seed = derive_seed(RANDOMNESS, &contract(), 100);
        let mut published = select_winners(&pool, &seed);
        published.regular_winners.pop();

        assert_eq!(
            verify_assignment(&pool, &contract(), 100, RANDOMNESS, MAX_REGULAR_WINNERS, &published),
            Err(SelectionError::RegularWinnersMismatch { position: 19 })
        );
    }

    #[test]
    fn rejects_wrong_round() {
        let pool = pool(12);
        let published = select_winners(&pool, &derive_seed(RANDOMNESS, &contract(), 100));
        assert!(verify_assignment(&pool, &contract(), 101, RANDOMNESS, MAX_REGULAR_WINNERS, &published).is_err());
    }

    #[test]
    fn small_pool_verifies() {
        let pool = pool(3);
        let published = select_winners(&pool, &derive_seed(RANDOMNESS, &contract(), 5));
        assert_eq!(published.regular_winners.len(), 2);
        assert!(verify_assignment(&pool, &contract(), 5, RANDOMNESS, MAX_REGULAR_WINNERS, &published).is_ok());
    }
}
