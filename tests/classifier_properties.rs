use navmesh_collector::{
    classify, evaluate, is_non_conflicting, BaseSources, ChainFacts, ContainmentKind, Decision,
    Exclusion, OverrideChain, Policy, SourceId,
};
use proptest::prelude::*;
use proptest::sample::subsequence;

/// Load order used by every property, lowest priority first.
const LOAD_ORDER: [&str; 8] = [
    "Skyrim.esm",
    "Update.esm",
    "Dawnguard.esm",
    "Unofficial.esp",
    "Caves.esp",
    "Roads.esp",
    "Lights.esl",
    "Fixes.esp",
];

fn base() -> BaseSources {
    BaseSources::official()
}

fn build_chain(sources: &[&str], values: &[u8]) -> OverrideChain<u8> {
    OverrideChain::from_pairs(
        sources
            .iter()
            .zip(values)
            .map(|(name, value)| (name.parse::<SourceId>().unwrap(), *value)),
    )
    .unwrap()
}

fn chain_strategy(len: std::ops::RangeInclusive<usize>) -> impl Strategy<Value = OverrideChain<u8>> {
    (
        subsequence(LOAD_ORDER.to_vec(), len),
        prop::collection::vec(0u8..3, LOAD_ORDER.len()),
    )
        .prop_map(|(sources, values)| build_chain(&sources, &values))
}

fn containment_strategy() -> impl Strategy<Value = ContainmentKind> {
    prop_oneof![
        Just(ContainmentKind::Interior),
        Just(ContainmentKind::Exterior),
        Just(ContainmentKind::Unclassified),
    ]
}

fn policy_strategy() -> impl Strategy<Value = Policy> {
    any::<[bool; 8]>().prop_map(|flags| Policy {
        interior_cells: flags[0],
        exterior_cells: flags[1],
        modded_cells: flags[2],
        include_singles: flags[3],
        include_identicals: flags[4],
        include_no_conflicts: flags[5],
        include_base_conflicts: flags[6],
        include_base_overrides: flags[7],
        ..Policy::default()
    })
}

fn permissive() -> Policy {
    Policy {
        interior_cells: true,
        exterior_cells: true,
        modded_cells: true,
        include_singles: true,
        include_identicals: true,
        include_no_conflicts: true,
        include_base_conflicts: true,
        include_base_overrides: true,
        ..Policy::default()
    }
}

proptest! {
    #[test]
    fn singleton_depends_only_on_singles_switch(
        chain in chain_strategy(1..=1),
        containment in containment_strategy(),
        policy in policy_strategy(),
    ) {
        let policy = Policy {
            interior_cells: true,
            exterior_cells: true,
            modded_cells: true,
            ..policy
        };
        let from_base = base().contains(&chain.origin().source);
        prop_assert_eq!(
            classify(&chain, containment, from_base, &policy, &base()),
            policy.include_singles
        );
    }

    #[test]
    fn identical_chains_need_identicals_switch(
        sources in subsequence(LOAD_ORDER.to_vec(), 2..=6),
        value in 0u8..3,
        containment in containment_strategy(),
        policy in policy_strategy(),
    ) {
        let chain = build_chain(&sources, &vec![value; sources.len()]);
        let from_base = base().contains(&chain.origin().source);
        let policy = Policy { include_identicals: false, ..policy };
        prop_assert!(!classify(&chain, containment, from_base, &policy, &base()));
        prop_assert!(ChainFacts::compute(&chain, &base()).is_fully_identical);
    }

    #[test]
    fn two_entry_chains_are_never_conflicts(chain in chain_strategy(2..=2)) {
        prop_assert!(chain.is_no_conflict());
        prop_assert!(ChainFacts::compute(&chain, &base()).is_no_conflict);
    }

    #[test]
    fn no_conflict_means_two_values_in_one_run(values in prop::collection::vec(0u8..3, 3..10)) {
        let expected = {
            let first = values[0];
            let switch = values.iter().position(|v| *v != first);
            match switch {
                None => false,
                Some(at) => {
                    let second = values[at];
                    values[at..].iter().all(|v| *v == second)
                }
            }
        };
        prop_assert_eq!(is_non_conflicting(&values), expected);
    }

    #[test]
    fn evaluation_is_deterministic(
        chain in chain_strategy(1..=8),
        containment in containment_strategy(),
        from_base in any::<bool>(),
        policy in policy_strategy(),
    ) {
        let first = evaluate(&chain, containment, from_base, &policy, &base());
        let second = evaluate(&chain, containment, from_base, &policy, &base());
        prop_assert_eq!(first, second);
        prop_assert_eq!(first.is_included(), classify(&chain, containment, from_base, &policy, &base()));
    }

    #[test]
    fn permissive_policy_includes_everything(
        chain in chain_strategy(1..=8),
        containment in containment_strategy(),
        from_base in any::<bool>(),
    ) {
        prop_assert_eq!(
            evaluate(&chain, containment, from_base, &permissive(), &base()),
            Decision::Include
        );
    }

    #[test]
    fn exclusion_names_a_switch_that_is_off(
        chain in chain_strategy(1..=8),
        containment in containment_strategy(),
        from_base in any::<bool>(),
        policy in policy_strategy(),
    ) {
        if let Decision::Exclude(reason) = evaluate(&chain, containment, from_base, &policy, &base()) {
            let switch = match reason {
                Exclusion::BaseOverride => policy.include_base_overrides,
                Exclusion::InteriorCell => policy.interior_cells,
                Exclusion::ExteriorCell => policy.exterior_cells,
                Exclusion::ModdedCell => policy.modded_cells,
                Exclusion::Single => policy.include_singles,
                Exclusion::Identical => policy.include_identicals,
                Exclusion::NoConflict => policy.include_no_conflicts,
                Exclusion::BaseConflict => policy.include_base_conflicts,
            };
            prop_assert!(!switch, "{reason} fired with its switch on");
        }
    }
}

#[test]
fn returning_value_breaks_no_conflict() {
    assert!(!is_non_conflicting(&["A", "B", "A"]));
    assert!(is_non_conflicting(&["A", "B", "B"]));
    assert!(is_non_conflicting(&["A", "A"]));
    assert!(!is_non_conflicting::<u8>(&[]));
}

#[test]
fn base_only_conflict_counts_non_base_variants() {
    // Three distinct variants, two from base sources.
    let chain = build_chain(&["Skyrim.esm", "Update.esm", "Caves.esp"], &[0, 1, 2]);
    assert!(ChainFacts::compute(&chain, &base()).is_base_only_conflict);

    // Three distinct variants, one from a base source.
    let chain = build_chain(&["Skyrim.esm", "Caves.esp", "Fixes.esp"], &[0, 1, 2]);
    assert!(!ChainFacts::compute(&chain, &base()).is_base_only_conflict);
}
