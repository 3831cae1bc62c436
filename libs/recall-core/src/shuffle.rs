//! Card order permutation for study sessions.

use crate::types::CardId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Permutes a study queue in place.
pub trait Shuffler {
    fn shuffle(&mut self, cards: &mut [CardId]);
}

impl<F> Shuffler for F
where
    F: FnMut(&mut [CardId]),
{
    fn shuffle(&mut self, cards: &mut [CardId]) {
        self(cards)
    }
}

/// Uniform random permutation.
#[derive(Debug, Clone)]
pub struct RandomShuffler {
    rng: StdRng,
}

impl RandomShuffler {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible permutation sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomShuffler {
    fn default() -> Self {
        Self::new()
    }
}

impl Shuffler for RandomShuffler {
    fn shuffle(&mut self, cards: &mut [CardId]) {
        cards.shuffle(&mut self.rng);
    }
}

/// Leaves the queue in repository order.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepOrder;

impl Shuffler for KeepOrder {
    fn shuffle(&mut self, _cards: &mut [CardId]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(n: usize) -> Vec<CardId> {
        (0..n).map(|_| CardId::new()).collect()
    }

    #[test]
    fn seeded_shuffle_is_reproducible_permutation() {
        let original = ids(20);
        let mut a = original.clone();
        let mut b = original.clone();
        RandomShuffler::seeded(7).shuffle(&mut a);
        RandomShuffler::seeded(7).shuffle(&mut b);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort();
        let mut expected = original;
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn closure_shuffler() {
        let original = ids(3);
        let mut cards = original.clone();
        let mut reverse = |c: &mut [CardId]| c.reverse();
        reverse.shuffle(&mut cards);
        assert_eq!(cards, original.into_iter().rev().collect::<Vec<_>>());
    }
}
