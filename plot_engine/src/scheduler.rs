//! Selection scheduler - picks one (rule, grounding) pair per step.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use mystery_world::WorldState;

use crate::catalog::Rule;
use crate::grounding::{Grounder, Grounding};

/// How a rule's probability affects selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityMode {
    /// Independent Bernoulli filter per candidate, then a uniform pick.
    #[default]
    Gate,
    /// One draw over all candidates, weighted by probability.
    Weighted,
}

/// A rule together with one of its groundings.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'r> {
    pub rule: &'r Rule,
    pub grounding: Grounding,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionScheduler {
    mode: ProbabilityMode,
}

impl SelectionScheduler {
    pub fn new(mode: ProbabilityMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ProbabilityMode {
        self.mode
    }

    /// Every valid (rule, grounding) pair, in rule then grounding order.
    pub fn candidates<'r>(&self, rules: impl IntoIterator<Item = &'r Rule>, world: &WorldState) -> Vec<Candidate<'r>> {
        let grounder = Grounder::new(world);
        rules
            .into_iter()
            .flat_map(|rule| {
                grounder
                    .ground(rule)
                    .into_iter()
                    .map(move |grounding| Candidate { rule, grounding })
            })
            .collect()
    }

    /// Pick at most one candidate.
    pub fn select<'r>(&self, candidates: Vec<Candidate<'r>>, rng: &mut dyn RngCore) -> Option<Candidate<'r>> {
        match self.mode {
            ProbabilityMode::Gate => {
                let mut survivors: Vec<_> = candidates
                    .into_iter()
                    .filter(|c| c.rule.is_certain() || rng.gen_bool(c.rule.probability))
                    .collect();
                if survivors.is_empty() {
                    return None;
                }
                let pick = rng.gen_range(0..survivors.len());
                Some(survivors.swap_remove(pick))
            }
            ProbabilityMode::Weighted => {
                let total: f64 = candidates.iter().map(|c| c.rule.probability).sum();
                if candidates.is_empty() || total <= 0.0 {
                    return None;
                }
                let mut roll = rng.gen::<f64>() * total;
                let last = candidates.len() - 1;
                candidates.into_iter().enumerate().find_map(|(i, c)| {
                    if roll < c.rule.probability || i == last {
                        Some(c)
                    } else {
                        roll -= c.rule.probability;
                        None
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RuleCatalog;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn world() -> WorldState {
        let mut world = WorldState::new();
        for name in ["Alice", "Bob"] {
            let id = world.add_character(name).unwrap();
            world.state("_ is alive", &[id]).unwrap();
        }
        world
    }

    const RULES: &str = "$Common\nroles:\n    A:Character\npreconditions:\n    (A is alive)\n\n$Rare\nprob:0.1\nroles:\n    A:Character\npreconditions:\n    (A is alive)\n";

    #[test]
    fn test_candidates_cover_every_grounding() {
        let catalog = RuleCatalog::parse(RULES).unwrap();
        let world = world();
        let candidates = SelectionScheduler::default().candidates(catalog.iter(), &world);
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[0].rule.id, "Common");
        assert_eq!(candidates[3].rule.id, "Rare");
    }

    #[test]
    fn test_select_from_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for mode in [ProbabilityMode::Gate, ProbabilityMode::Weighted] {
            assert!(SelectionScheduler::new(mode).select(Vec::new(), &mut rng).is_none());
        }
    }

    #[test]
    fn test_probability_skews_selection() {
        let catalog = RuleCatalog::parse(RULES).unwrap();
        let world = world();
        for mode in [ProbabilityMode::Gate, ProbabilityMode::Weighted] {
            let scheduler = SelectionScheduler::new(mode);
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            let mut rare = 0;
            let mut common = 0;
            for _ in 0..2000 {
                let candidates = scheduler.candidates(catalog.iter(), &world);
                match scheduler.select(candidates, &mut rng).map(|c| c.rule.id.as_str()) {
                    Some("Rare") => rare += 1,
                    Some(_) => common += 1,
                    None => {}
                }
            }
            assert!(rare > 0, "{:?}", mode);
            assert!(rare * 5 < common, "{:?}: rare={} common={}", mode, rare, common);
        }
    }

    #[test]
    fn test_certain_rules_skip_the_gate() {
        let catalog = RuleCatalog::parse("$Sure\nroles:\n    A:Character\npreconditions:\n    (A is alive)\n").unwrap();
        assert!(catalog.get("Sure").is_some_and(|r| r.is_certain()));
        assert!(RuleCatalog::parse(RULES).unwrap().get("Rare").is_some_and(|r| !r.is_certain()));

        let world = world();
        let scheduler = SelectionScheduler::new(ProbabilityMode::Gate);
        assert_eq!(scheduler.mode(), ProbabilityMode::Gate);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            assert!(scheduler.select(scheduler.candidates(catalog.iter(), &world), &mut rng).is_some());
        }
    }

    #[test]
    fn test_same_seed_same_choice() {
        let catalog = RuleCatalog::parse(RULES).unwrap();
        let world = world();
        let scheduler = SelectionScheduler::default();
        let picks = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..20)
                .map(|_| {
                    scheduler
                        .select(scheduler.candidates(catalog.iter(), &world), &mut rng)
                        .map(|c| (c.rule.id.clone(), c.grounding))
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(7), picks(7));
    }
}
