use rand::Rng;
use thiserror::Error;

use crate::model::Flashcard;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error("no flashcards found")]
    EmptyPool,
}

//
// ─── WEIGHTED POOL ─────────────────────────────────────────────────────────────
//

/// Cumulative-weight sampler over a candidate pool of flashcards.
///
/// Each card's draw weight is `1 / max(1, mastery)`, so a mastery-1 card
/// is five times as likely to surface as a mastery-5 card. Sampling is an
/// inverse-CDF draw: pick a uniform point in `[0, total_weight)` and
/// binary-search the cumulative sums, giving an unbiased O(log n) draw
/// with `P(card) = weight(card) / Σ weights`.
///
/// The pool is rebuilt from a fresh store snapshot on every selection;
/// no draw state carries over between calls.
#[derive(Debug, Clone)]
pub struct WeightedPool {
    cumulative: Vec<f64>,
    total: f64,
}

impl WeightedPool {
    /// Build the cumulative weight table for a candidate pool.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::EmptyPool` if there are no candidates.
    pub fn from_cards(cards: &[Flashcard]) -> Result<Self, SchedulerError> {
        if cards.is_empty() {
            return Err(SchedulerError::EmptyPool);
        }

        let mut cumulative = Vec::with_capacity(cards.len());
        let mut total = 0.0;
        for card in cards {
            total += card.mastery.weight();
            cumulative.push(total);
        }

        Ok(Self { cumulative, total })
    }

    /// Number of candidates in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    /// Sum of all candidate weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.total
    }

    /// Draw one index according to the pool's weights.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let point = rng.random_range(0.0..self.total);
        // First cumulative sum strictly above the drawn point. The draw is
        // < total, so the index is always in bounds.
        self.cumulative
            .partition_point(|&bound| bound <= point)
            .min(self.cumulative.len() - 1)
    }
}

/// Select one card from the pool with a single weighted draw.
///
/// Selection never mutates card state; reporting the review outcome is a
/// separate operation.
///
/// # Errors
///
/// Returns `SchedulerError::EmptyPool` if `cards` is empty.
pub fn select_weighted<'a, R: Rng + ?Sized>(
    cards: &'a [Flashcard],
    rng: &mut R,
) -> Result<&'a Flashcard, SchedulerError> {
    let pool = WeightedPool::from_cards(cards)?;
    Ok(&cards[pool.sample(rng)])
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardId, Flashcard};
    use crate::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn build_card(id: &str, mastery: i64) -> Flashcard {
        Flashcard::from_persisted(
            CardId::new(id),
            format!("front-{id}"),
            format!("back-{id}"),
            "Spanish".into(),
            Some(mastery),
            Some(0),
            Some(fixed_now()),
        )
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert_eq!(
            WeightedPool::from_cards(&[]).unwrap_err(),
            SchedulerError::EmptyPool
        );
        let mut rng = StdRng::seed_from_u64(7);
        assert!(select_weighted(&[], &mut rng).is_err());
    }

    #[test]
    fn single_card_is_always_selected() {
        let cards = vec![build_card("only", 5)];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let chosen = select_weighted(&cards, &mut rng).unwrap();
            assert_eq!(chosen.id, cards[0].id);
        }
    }

    #[test]
    fn cumulative_totals_match_weights() {
        let cards = vec![build_card("a", 1), build_card("b", 2), build_card("c", 4)];
        let pool = WeightedPool::from_cards(&cards).unwrap();
        assert_eq!(pool.len(), 3);
        assert!((pool.total_weight() - (1.0 + 0.5 + 0.25)).abs() < 1e-12);
    }

    #[test]
    fn draw_ratio_approaches_five_to_one() {
        // Two cards with mastery 1 and 5: expected draw ratio 5:1.
        let cards = vec![build_card("easy", 1), build_card("hard", 5)];
        let mut rng = StdRng::seed_from_u64(42);

        let mut low_mastery_hits = 0_u32;
        let draws = 100_000;
        for _ in 0..draws {
            if select_weighted(&cards, &mut rng).unwrap().id == cards[0].id {
                low_mastery_hits += 1;
            }
        }

        // Expected share is 5/6 ≈ 0.8333; allow a generous tolerance for
        // the seeded sample.
        let share = f64::from(low_mastery_hits) / f64::from(draws);
        assert!((share - 5.0 / 6.0).abs() < 0.01, "observed share {share}");
    }

    #[test]
    fn uniform_pool_spreads_draws() {
        let cards: Vec<Flashcard> = (0..4)
            .map(|i| build_card(&format!("c{i}"), 3))
            .collect();
        let mut rng = StdRng::seed_from_u64(9);

        let mut counts = [0_u32; 4];
        for _ in 0..40_000 {
            let chosen = select_weighted(&cards, &mut rng).unwrap();
            let idx = cards.iter().position(|c| c.id == chosen.id).unwrap();
            counts[idx] += 1;
        }

        for count in counts {
            let share = f64::from(count) / 40_000.0;
            assert!((share - 0.25).abs() < 0.02, "observed share {share}");
        }
    }
}
