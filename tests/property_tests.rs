//! Property-based tests for the weight algorithms and the tiered playlist
//!
//! Every property checks an invariant that must survive arbitrary inputs:
//! weights stay a probability vector, unaffected items keep their relative
//! proportions, and the identity index always matches the tiers.

use driftmix::algorithm::{self, FeedbackStrategy};
use driftmix::config::EngineConfig;
use driftmix::engine::Playlist;
use proptest::prelude::*;
use std::collections::HashSet;

// ===== Helpers =====

fn probability_vector() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01f64..1.0, 2..20).prop_map(|raw| {
        let total: f64 = raw.iter().sum();
        raw.into_iter().map(|w| w / total).collect()
    })
}

fn strategy() -> impl Strategy<Value = FeedbackStrategy> {
    prop_oneof![
        Just(FeedbackStrategy::Proportional),
        Just(FeedbackStrategy::Midpoint)
    ]
}

fn assert_probability_vector(weights: &[f64]) -> Result<(), TestCaseError> {
    let total: f64 = weights.iter().sum();
    prop_assert!((total - 1.0).abs() < 1e-9, "sum {}", total);
    prop_assert!(weights.iter().all(|w| (0.0..=1.0).contains(w)), "{:?}", weights);
    Ok(())
}

#[derive(Debug, Clone)]
enum Op {
    Like(usize),
    Dislike(usize),
    Reinforce(usize, f64),
    Suppress(usize, f64),
    Select,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..12).prop_map(Op::Like),
        (0usize..12).prop_map(Op::Dislike),
        (0usize..12, 0.01f64..0.99).prop_map(|(i, p)| Op::Reinforce(i, p)),
        (0usize..12, 0.01f64..=1.0).prop_map(|(i, p)| Op::Suppress(i, p)),
        Just(Op::Select),
    ]
}

// ===== Property Tests =====

proptest! {
    /// Property: feedback keeps a probability vector
    #[test]
    fn feedback_preserves_total_mass(
        weights in probability_vector(),
        index_seed in any::<prop::sample::Index>(),
        percent in 0.01f64..0.99,
        strategy in strategy(),
    ) {
        let index = index_seed.index(weights.len());
        let up = algorithm::reinforce(&weights, index, percent, strategy).unwrap();
        assert_probability_vector(&up)?;
        prop_assert!(up[index] >= weights[index] - 1e-12);

        let down = algorithm::suppress(&weights, index, percent, strategy).unwrap();
        assert_probability_vector(&down)?;
        prop_assert!(down[index] <= weights[index] + 1e-12);
    }

    /// Property: proportional feedback keeps the others' ratios
    #[test]
    fn proportional_feedback_keeps_ratios(
        weights in probability_vector(),
        index_seed in any::<prop::sample::Index>(),
        percent in 0.01f64..0.99,
    ) {
        let index = index_seed.index(weights.len());
        let up = algorithm::reinforce(&weights, index, percent, FeedbackStrategy::Proportional).unwrap();
        let others: Vec<usize> = (0..weights.len()).filter(|&i| i != index).collect();
        for pair in others.windows(2) {
            let before = weights[pair[0]] / weights[pair[1]];
            let after = up[pair[0]] / up[pair[1]];
            prop_assert!((before - after).abs() < 1e-6 * before.max(1.0));
        }
    }

    /// Property: insert then remove of the same slot restores the others
    #[test]
    fn insert_remove_restores_weights(
        weights in probability_vector(),
        probability in 0.0f64..0.99,
    ) {
        let inserted = algorithm::rescale_for_insert(&weights, probability).unwrap();
        assert_probability_vector(&inserted)?;
        prop_assert!((inserted[weights.len()] - probability).abs() < 1e-12);

        let (restored, removed) = algorithm::rescale_for_remove(&inserted, weights.len()).unwrap();
        prop_assert!((removed - probability).abs() < 1e-12);
        for (a, b) in restored.iter().zip(&weights) {
            prop_assert!((a - b).abs() < 1e-9);
        }
    }

    /// Property: any feedback sequence leaves a consistent playlist
    #[test]
    fn playlist_invariants_hold(
        ops in prop::collection::vec(op(), 1..60),
        seed in any::<u64>(),
        flat in any::<bool>(),
    ) {
        let items: Vec<String> = (0..12).map(|i| format!("item{i}")).collect();
        let config = match flat {
            true => EngineConfig::flat(),
            false => EngineConfig::default(),
        };
        let mut playlist = Playlist::seeded(items.clone(), config, seed).unwrap();

        for op in ops {
            match op {
                Op::Like(i) => { playlist.like(&items[i]).unwrap(); }
                Op::Dislike(i) => { playlist.dislike(&items[i]).unwrap(); }
                Op::Reinforce(i, p) => { playlist.reinforce(&items[i], p).unwrap(); }
                Op::Suppress(i, p) => { playlist.suppress(&items[i], p).unwrap(); }
                Op::Select => {
                    let item = playlist.select();
                    prop_assert!(item.is_some_and(|item| items.contains(&item)));
                }
            }
            prop_assert!(playlist.selector().check_index().is_ok());
        }

        let total: f64 = items.iter().map(|i| playlist.probability_of(i).unwrap()).sum();
        prop_assert!((total - 1.0).abs() < 1e-9, "total {}", total);
        prop_assert!(playlist.snapshot().selector.tiers.validate().is_ok());
    }

    /// Property: sync leaves exactly the requested item set
    #[test]
    fn sync_tracks_exactly_current_items(
        initial in prop::collection::hash_set("[a-z]{1,4}", 1..15),
        current in prop::collection::vec("[a-z]{1,4}", 0..20),
        dislikes in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
    ) {
        let initial: Vec<String> = initial.into_iter().collect();
        let mut playlist = Playlist::seeded(initial.clone(), EngineConfig::default(), 1).unwrap();
        for index in dislikes {
            playlist.dislike(&initial[index.index(initial.len())]).unwrap();
        }

        let report = playlist.sync(current.clone()).unwrap();
        let expected: HashSet<&String> = current.iter().collect();
        let tracked: HashSet<&String> = playlist.items().into_iter().collect();
        prop_assert_eq!(tracked, expected);
        prop_assert_eq!(playlist.len(), playlist.items().len());
        prop_assert!(report.removed.iter().all(|item| !current.contains(item)));
        prop_assert!(playlist.selector().check_index().is_ok());
        prop_assert_eq!(playlist.select().is_some(), !current.is_empty());
    }
}
