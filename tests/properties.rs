//! Property tests for the structural promises of the pipeline.
//!
//! 1. **Coverage is a probability**: for any rule, `N` and `p`, coverage lies in `[0, 1]`.
//! 2. **Mass conservation**: the multinomial pmf summed over the lattice is 1.
//! 3. **Canonical candidates**: every candidate is non-decreasing, distinct from the
//!    others, drawn from the grid, and completes to a valid `K`-vector.
//! 4. **Optimality**: the reported minimum is attained by the reported vector and no
//!    candidate has lower coverage.
//! 5. **Determinism**: parallel and sequential runs agree bit for bit.
//! 6. **Weighted bounds**: the skewed average lies between the least and greatest
//!    candidate coverage.

use std::collections::BTreeSet;

use mincov::{
    Budget, EngineConfig, FitzpatrickScott, FnWeight, PerCategory, Wald, Wilson, complete,
    coverage_probability, evaluate_candidates, find_minimizer, find_representative,
    generate_candidates, rank_endpoints, total_mass,
};
use proptest::prelude::*;

/// A point on the open simplex of dimension `k`.
fn simplex_point(k: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01f64..1.0, k).prop_map(|raw| {
        let s: f64 = raw.iter().sum();
        raw.iter().map(|x| x / s).collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn coverage_is_a_probability(
        n in 1u64..25,
        p in (2usize..5).prop_flat_map(simplex_point),
        alpha in 0.01f64..0.3,
    ) {
        let cfg = EngineConfig::default();
        let fs = FitzpatrickScott::new(alpha).unwrap();
        let wilson = PerCategory(Wilson::new(alpha).unwrap());
        let wald = PerCategory(Wald::new(alpha).unwrap());
        for cov in [
            coverage_probability(n, &p, &fs, &cfg).unwrap(),
            coverage_probability(n, &p, &wilson, &cfg).unwrap(),
            coverage_probability(n, &p, &wald, &cfg).unwrap(),
        ] {
            prop_assert!((0.0..=1.0).contains(&cov), "coverage {cov}");
        }
    }

    #[test]
    fn lattice_mass_is_one(
        n in 1u64..40,
        p in (1usize..5).prop_flat_map(simplex_point),
    ) {
        let mass = total_mass(n, &p).unwrap();
        prop_assert!((mass - 1.0).abs() < 1e-10, "mass {mass}");
    }

    #[test]
    fn candidates_are_canonical(n in 1u64..12, k in 2usize..5) {
        let cfg = EngineConfig::default();
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let grid = rank_endpoints(n, &fs, cfg.precision).unwrap();
        let set = generate_candidates(k - 1, &grid, &cfg).unwrap();

        let mut seen = BTreeSet::new();
        for v in set.iter() {
            prop_assert!(v.windows(2).all(|w| w[0] <= w[1]));
            prop_assert!(v.iter().all(|x| grid.points().contains(x)));
            let key: Vec<u64> = v.iter().map(|x| x.to_bits()).collect();
            prop_assert!(seen.insert(key), "duplicate candidate {v:?}");

            let full = complete(v, cfg.precision).unwrap();
            prop_assert_eq!(full.len(), k);
            prop_assert!((full.iter().sum::<f64>() - 1.0).abs() < 1e-8);
        }
    }

    #[test]
    fn minimizer_is_optimal(n in 2u64..10, k in 2usize..4) {
        let cfg = EngineConfig::default();
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let grid = rank_endpoints(n, &fs, cfg.precision).unwrap();
        let set = generate_candidates(k - 1, &grid, &cfg).unwrap();
        prop_assume!(!set.is_empty());

        let min = find_minimizer(n, &set, &fs, &cfg).unwrap();
        let all = evaluate_candidates(n, &set, &fs, &cfg, &Budget::unbounded()).unwrap();
        prop_assert!(all.iter().all(|c| c.coverage >= min.value));
        prop_assert_eq!(all[min.index].coverage, min.value);
        prop_assert!(all[..min.index].iter().all(|c| c.coverage > min.value));

        let direct = coverage_probability(n, &min.vector, &fs, &cfg).unwrap();
        prop_assert_eq!(direct.to_bits(), min.value.to_bits());
    }

    #[test]
    fn parallel_matches_sequential(n in 2u64..12, k in 2usize..4) {
        let par = EngineConfig::default();
        let seq = par.sequential();
        let wilson = PerCategory(Wilson::new(0.1).unwrap());
        let grid = rank_endpoints(n, &wilson, par.precision).unwrap();
        let set = generate_candidates(k - 1, &grid, &par).unwrap();
        prop_assume!(!set.is_empty());

        let a = evaluate_candidates(n, &set, &wilson, &par, &Budget::unbounded()).unwrap();
        let b = evaluate_candidates(n, &set, &wilson, &seq, &Budget::unbounded()).unwrap();
        prop_assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            prop_assert_eq!(x.coverage.to_bits(), y.coverage.to_bits());
        }
    }

    #[test]
    fn skewed_average_is_bracketed(n in 2u64..9, tilt in 0.0f64..5.0) {
        let cfg = EngineConfig::default();
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let grid = rank_endpoints(n, &fs, cfg.precision).unwrap();
        let set = generate_candidates(2, &grid, &cfg).unwrap();
        prop_assume!(!set.is_empty());

        let skew = FnWeight::new("tilted", move |p: &[f64]| (tilt * p[0]).exp());
        let rep = find_representative(n, &set, &fs, &skew, &cfg).unwrap();
        let all = evaluate_candidates(n, &set, &fs, &cfg, &Budget::unbounded()).unwrap();
        let lo = all.iter().map(|c| c.coverage).fold(f64::INFINITY, f64::min);
        let hi = all.iter().map(|c| c.coverage).fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(rep.skewed_average >= lo - 1e-12 && rep.skewed_average <= hi + 1e-12);
        prop_assert!(all.iter().all(|c| (c.coverage - rep.skewed_average).abs() >= rep.distance));
    }
}
