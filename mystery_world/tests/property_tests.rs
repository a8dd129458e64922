use mystery_world::{EntityId, Fact, FactStore, Transaction};
use proptest::prelude::*;

fn arb_fact() -> impl Strategy<Value = Fact> {
    let labels = prop::sample::select(vec!["_ is alive", "_ is at _", "_ is upset at _", "murder has happened"]);
    (labels, prop::collection::vec(0u32..6, 2)).prop_map(|(label, ids)| {
        let arity = Fact::arity_of(label);
        Fact::new(label, ids.into_iter().take(arity).map(EntityId).collect::<Vec<_>>())
    })
}

proptest! {
    #[test]
    fn assert_then_holds(facts in prop::collection::vec(arb_fact(), 0..20), probe in arb_fact()) {
        let mut store = FactStore::with_facts(facts);
        store.assert(probe.clone());
        prop_assert!(store.holds(&probe));
    }

    #[test]
    fn retract_then_not_holds(facts in prop::collection::vec(arb_fact(), 0..20), probe in arb_fact()) {
        let mut store = FactStore::with_facts(facts);
        store.retract(&probe);
        prop_assert!(!store.holds(&probe));
    }

    #[test]
    fn commit_matches_sequential_application(
        initial in prop::collection::vec(arb_fact(), 0..10),
        ops in prop::collection::vec((any::<bool>(), arb_fact()), 0..20),
    ) {
        let mut committed = FactStore::with_facts(initial.clone());
        let mut sequential = FactStore::with_facts(initial);

        let mut tx = Transaction::new();
        for (is_assert, fact) in &ops {
            if *is_assert {
                tx.assert(fact.clone());
                sequential.assert(fact.clone());
            } else {
                tx.retract(fact.clone());
                sequential.retract(fact);
            }
        }
        committed.commit(tx).unwrap();

        prop_assert_eq!(committed.sorted(), sequential.sorted());
        prop_assert_eq!(committed.len(), sequential.len());
    }
}
