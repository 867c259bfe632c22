use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Computes the presentation order for a new attempt. Called exactly once per
/// attempt; re-entries must read the persisted order instead of coming back
/// here, otherwise a student could fish for a favorable order by reloading.
pub(crate) fn presentation_order(
    frozen: &[String],
    shuffle_questions: bool,
    question_block_size: i32,
    rng: &mut impl Rng,
) -> Vec<String> {
    let mut order: Vec<String> = frozen.to_vec();

    if !shuffle_questions || order.is_empty() {
        return order;
    }

    if question_block_size > 0 {
        // Shuffle inside fixed-size contiguous blocks; block positions stay
        // put so difficulty tiers never bleed into each other. The last
        // block may be shorter.
        for chunk in order.chunks_mut(question_block_size as usize) {
            chunk.shuffle(rng);
        }
    } else {
        order.shuffle(rng);
    }

    order
}

/// Stable per-(attempt, question) seed for option shuffling. Nothing is
/// persisted: the same attempt always derives the same order, while another
/// attempt at the same question shuffles independently.
pub(crate) fn option_order_seed(attempt_id: &str, question_id: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(attempt_id.as_bytes());
    hasher.update([0x1f]);
    hasher.update(question_id.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

pub(crate) fn shuffle_options_stable<T>(items: &mut [T], attempt_id: &str, question_id: &str) {
    let mut rng = StdRng::seed_from_u64(option_order_seed(attempt_id, question_id));
    items.shuffle(&mut rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pool(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("q{i}")).collect()
    }

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn no_shuffle_keeps_frozen_order() {
        let frozen = pool(7);
        let order = presentation_order(&frozen, false, 0, &mut seeded());
        assert_eq!(order, frozen);
    }

    #[test]
    fn full_shuffle_is_a_permutation() {
        let frozen = pool(20);
        let order = presentation_order(&frozen, true, 0, &mut seeded());

        assert_eq!(order.len(), frozen.len());
        let expected: HashSet<&String> = frozen.iter().collect();
        let actual: HashSet<&String> = order.iter().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn block_shuffle_never_crosses_block_boundaries() {
        let frozen = pool(10);
        let block = 3;

        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let order = presentation_order(&frozen, true, block, &mut rng);
            assert_eq!(order.len(), frozen.len());

            for (original_index, id) in frozen.iter().enumerate() {
                let new_index = order.iter().position(|item| item == id).expect("id present");
                assert_eq!(
                    original_index / block as usize,
                    new_index / block as usize,
                    "{id} moved from block of index {original_index} to {new_index}"
                );
            }
        }
    }

    #[test]
    fn block_shuffle_handles_short_last_block() {
        let frozen = pool(7);
        let order = presentation_order(&frozen, true, 4, &mut seeded());

        let expected_tail: HashSet<&String> = frozen[4..].iter().collect();
        let actual_tail: HashSet<&String> = order[4..].iter().collect();
        assert_eq!(actual_tail, expected_tail);
    }

    #[test]
    fn block_size_larger_than_pool_degenerates_to_full_shuffle() {
        let frozen = pool(5);
        let order = presentation_order(&frozen, true, 100, &mut seeded());
        let expected: HashSet<&String> = frozen.iter().collect();
        let actual: HashSet<&String> = order.iter().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn empty_pool_stays_empty() {
        let order = presentation_order(&[], true, 0, &mut seeded());
        assert!(order.is_empty());
    }

    #[test]
    fn option_order_is_stable_within_an_attempt() {
        let mut first: Vec<String> = (0..6).map(|i| format!("opt{i}")).collect();
        let mut second = first.clone();

        shuffle_options_stable(&mut first, "attempt-1", "question-9");
        shuffle_options_stable(&mut second, "attempt-1", "question-9");

        assert_eq!(first, second);
    }

    #[test]
    fn option_order_seed_varies_by_attempt_and_question() {
        let base = option_order_seed("attempt-1", "question-9");
        assert_ne!(base, option_order_seed("attempt-2", "question-9"));
        assert_ne!(base, option_order_seed("attempt-1", "question-10"));
    }

    #[test]
    fn option_order_seed_separator_prevents_ambiguity() {
        // "ab" + "c" must not collide with "a" + "bc".
        assert_ne!(option_order_seed("ab", "c"), option_order_seed("a", "bc"));
    }

    #[test]
    fn shuffled_options_remain_a_permutation() {
        let original: Vec<String> = (0..8).map(|i| format!("opt{i}")).collect();
        let mut shuffled = original.clone();
        shuffle_options_stable(&mut shuffled, "attempt-3", "question-1");

        let expected: HashSet<&String> = original.iter().collect();
        let actual: HashSet<&String> = shuffled.iter().collect();
        assert_eq!(actual, expected);
    }
}
