//! Response resolver - follows a beat's response menu with pinned roles.

use rand::RngCore;

use mystery_world::{EntityId, WorldState};

use crate::apply::apply;
use crate::beat::StoryBeat;
use crate::catalog::RuleCatalog;
use crate::error::EngineError;
use crate::grounding::Grounder;
use crate::scheduler::{Candidate, SelectionScheduler};

/// Chains responses after a beat, one follow-up per level, up to a depth cap.
#[derive(Debug, Clone, Copy)]
pub struct ResponseResolver<'c> {
    catalog: &'c RuleCatalog,
    scheduler: SelectionScheduler,
    max_depth: usize,
}

impl<'c> ResponseResolver<'c> {
    pub fn new(catalog: &'c RuleCatalog, scheduler: SelectionScheduler, max_depth: usize) -> Self {
        Self {
            catalog,
            scheduler,
            max_depth,
        }
    }

    /// Candidates offered by `parent`'s response menu.
    ///
    /// A menu entry pinning from a role the parent left unbound is skipped.
    pub fn candidates(&self, world: &WorldState, parent: &StoryBeat) -> Vec<Candidate<'c>> {
        let Some(rule) = self.catalog.get(&parent.rule_id) else {
            return Vec::new();
        };
        let grounder = Grounder::new(world);
        let mut candidates = Vec::new();
        for response in &rule.responses {
            let Some(target) = self.catalog.get(&response.rule_id) else {
                continue;
            };
            let pins: Option<Vec<(usize, EntityId)>> = response
                .pins
                .iter()
                .map(|(pinned, source)| Some((target.role_index(pinned)?, parent.role(source)?)))
                .collect();
            let Some(pins) = pins else {
                continue;
            };
            candidates.extend(
                grounder
                    .ground_pinned(target, &pins)
                    .into_iter()
                    .map(|grounding| Candidate { rule: target, grounding }),
            );
        }
        candidates
    }

    /// Apply at most one response to `parent`, then recurse on it.
    ///
    /// Every beat produced is appended to `beats`, whose length is the next beat index.
    pub fn resolve(
        &self,
        world: &mut WorldState,
        parent: &StoryBeat,
        rng: &mut dyn RngCore,
        beats: &mut Vec<StoryBeat>,
    ) -> Result<(), EngineError> {
        let has_menu = self
            .catalog
            .get(&parent.rule_id)
            .is_some_and(|rule| !rule.responses.is_empty());
        if !has_menu {
            return Ok(());
        }

        let depth = parent.depth + 1;
        if depth > self.max_depth {
            tracing::warn!(
                rule = %parent.rule_id,
                beat = parent.index,
                depth,
                max_depth = self.max_depth,
                "response chain truncated"
            );
            return Ok(());
        }

        let candidates = self.candidates(world, parent);
        let Some(choice) = self.scheduler.select(candidates, rng) else {
            tracing::debug!(rule = %parent.rule_id, beat = parent.index, "no response applies");
            return Ok(());
        };

        let beat = apply(world, choice.rule, &choice.grounding, beats.len(), depth, Some(parent.index))?;
        beats.push(beat.clone());
        self.resolve(world, &beat, rng, beats)
    }
}
