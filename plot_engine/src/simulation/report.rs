use serde::{Deserialize, Serialize};

use mystery_world::{EntityId, WorldState};

use super::SimulationState;
use crate::beat::StoryBeat;

/// Everything a finished run hands to text realization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub state: SimulationState,
    pub steps: usize,
    /// Seed the run actually used, for replay.
    pub seed: u64,
    pub beats: Vec<StoryBeat>,
    pub world: WorldState,
    /// Structural errors that aborted individual steps.
    pub errors: Vec<String>,
}

impl SimulationReport {
    /// Only a briefed case is a complete mystery.
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Beats produced by one rule, in order.
    pub fn produced(&self, rule_id: &str) -> Vec<&StoryBeat> {
        self.beats.iter().filter(|b| b.rule_id == rule_id).collect()
    }

    pub fn beats_involving(&self, entity: EntityId) -> Vec<&StoryBeat> {
        self.beats.iter().filter(|b| b.involves(entity)).collect()
    }

    /// Entities for which a one-slot fact holds at the end, e.g. `_ is the culprit`.
    pub fn entities_with(&self, label: &str) -> Vec<EntityId> {
        self.world.entities_with(label)
    }

    /// The beat sequence as JSON.
    pub fn beats_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.beats)
    }
}
