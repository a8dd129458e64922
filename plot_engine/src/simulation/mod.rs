//! Simulation driver - the step loop and its terminal states.

mod config;
mod report;

pub use config::*;
pub use report::*;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use mystery_world::{EntityId, Fact, WorldState};

use crate::apply::apply;
use crate::beat::StoryBeat;
use crate::catalog::RuleCatalog;
use crate::error::EngineError;
use crate::grounding::Grounder;
use crate::responses::ResponseResolver;
use crate::scheduler::SelectionScheduler;

/// Where a run stands. Every state but `Running` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationState {
    Running,
    /// The case was closed but nobody briefed on it.
    Closed,
    /// The case was closed and briefed: a complete mystery.
    Briefed,
    /// A top-level step found nothing to apply.
    Stalled,
    BudgetExhausted,
}

impl SimulationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SimulationState::Running)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, SimulationState::Briefed)
    }
}

impl std::fmt::Display for SimulationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationState::Running => write!(f, "running"),
            SimulationState::Closed => write!(f, "closed"),
            SimulationState::Briefed => write!(f, "briefed"),
            SimulationState::Stalled => write!(f, "stalled"),
            SimulationState::BudgetExhausted => write!(f, "budget exhausted"),
        }
    }
}

/// What one top-level step did.
#[derive(Debug, Clone, PartialEq)]
enum StepOutcome {
    /// A beat was applied, followed by this many responses.
    Applied { responses: usize },
    /// No candidate survived selection.
    Idle,
    /// The chosen application failed structurally; nothing changed.
    Aborted(EngineError),
}

/// Owns the world and runs rules against it until a terminal state.
#[derive(Debug)]
pub struct Simulation {
    catalog: RuleCatalog,
    world: WorldState,
    config: SimulationConfig,
    scheduler: SelectionScheduler,
    rng: ChaCha8Rng,
    seed: u64,
    beats: Vec<StoryBeat>,
    steps: usize,
    state: SimulationState,
    errors: Vec<String>,
}

impl Simulation {
    pub fn new(catalog: RuleCatalog, world: WorldState, config: SimulationConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let scheduler = SelectionScheduler::new(config.probability_mode);
        tracing::info!(
            seed,
            max_steps = config.max_steps,
            max_response_depth = config.max_response_depth,
            probability_mode = ?scheduler.mode(),
            rules = catalog.len(),
            "starting simulation"
        );
        Self {
            scheduler,
            rng: ChaCha8Rng::seed_from_u64(seed),
            catalog,
            world,
            config,
            seed,
            beats: Vec::new(),
            steps: 0,
            state: SimulationState::Running,
            errors: Vec::new(),
        }
    }

    /// Run one top-level step with its responses, then update the state.
    pub fn step(&mut self) -> SimulationState {
        if self.state.is_terminal() {
            return self.state;
        }
        if self.steps >= self.config.max_steps {
            self.finish(SimulationState::BudgetExhausted);
            return self.state;
        }

        self.steps += 1;
        let outcome = self.advance();
        match &outcome {
            StepOutcome::Applied { responses } => {
                tracing::debug!(step = self.steps, responses, "step applied");
            }
            StepOutcome::Aborted(err) => {
                tracing::error!(step = self.steps, error = %err, "step aborted");
                self.errors.push(err.to_string());
            }
            StepOutcome::Idle => {}
        }

        let next = match self.fact_state() {
            Some(state) => state,
            None if outcome == StepOutcome::Idle => SimulationState::Stalled,
            None if self.steps >= self.config.max_steps => SimulationState::BudgetExhausted,
            None => SimulationState::Running,
        };
        if next.is_terminal() {
            self.finish(next);
        }
        self.state
    }

    /// Step until a terminal state and hand back the report.
    pub fn run(mut self) -> SimulationReport {
        while !self.state.is_terminal() {
            self.step();
        }
        self.into_report()
    }

    /// Apply `rule_id` now with some roles pinned by name, then resolve its responses.
    ///
    /// Probability is not consulted; one grounding is picked by the PRNG. Does
    /// not count as a step. Returns the beats produced.
    pub fn apply_with(&mut self, rule_id: &str, pins: &[(&str, EntityId)]) -> Result<Vec<StoryBeat>, EngineError> {
        let Self {
            catalog,
            world,
            config,
            scheduler,
            rng,
            beats,
            ..
        } = self;

        let rule = catalog
            .get(rule_id)
            .ok_or_else(|| EngineError::UnknownRule(rule_id.to_string()))?;
        let pins = pins
            .iter()
            .map(|(name, id)| {
                rule.role_index(name)
                    .filter(|&i| rule.roles[i].is_bindable())
                    .map(|i| (i, *id))
                    .ok_or_else(|| EngineError::UnknownRole {
                        rule: rule.id.clone(),
                        role: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let groundings: Vec<_> = Grounder::new(world).ground_pinned(rule, &pins).into_iter().collect();
        if groundings.is_empty() {
            return Err(EngineError::NotApplicable(rule.id.clone()));
        }
        let grounding = &groundings[rng.gen_range(0..groundings.len())];

        let first = beats.len();
        let beat = apply(world, rule, grounding, first, 0, None)?;
        beats.push(beat.clone());
        let resolved = ResponseResolver::new(catalog, *scheduler, config.max_response_depth).resolve(world, &beat, rng, beats);
        let produced = beats[first..].to_vec();

        if let Some(state) = self.fact_state() {
            self.finish(state);
        }
        resolved.map(|_| produced)
    }

    fn advance(&mut self) -> StepOutcome {
        let Self {
            catalog,
            world,
            config,
            scheduler,
            rng,
            beats,
            errors,
            steps,
            ..
        } = self;

        let candidates = scheduler.candidates(catalog.top_level(), world);
        let Some(choice) = scheduler.select(candidates, rng) else {
            tracing::debug!(step = *steps, "no rule applies");
            return StepOutcome::Idle;
        };

        let beat = match apply(world, choice.rule, &choice.grounding, beats.len(), 0, None) {
            Ok(beat) => beat,
            Err(err) => return StepOutcome::Aborted(err),
        };
        beats.push(beat.clone());

        let before = beats.len();
        let resolver = ResponseResolver::new(catalog, *scheduler, config.max_response_depth);
        if let Err(err) = resolver.resolve(world, &beat, rng, beats) {
            // The top-level beat stands; only the failed response is dropped.
            tracing::error!(step = *steps, error = %err, "response aborted");
            errors.push(err.to_string());
        }
        StepOutcome::Applied {
            responses: beats.len() - before,
        }
    }

    /// Terminal state implied by the world's facts, briefed before closed.
    fn fact_state(&self) -> Option<SimulationState> {
        if self.world.facts.holds(&Fact::flag(self.config.briefed_fact.as_str())) {
            Some(SimulationState::Briefed)
        } else if self.world.facts.holds(&Fact::flag(self.config.closed_fact.as_str())) {
            Some(SimulationState::Closed)
        } else {
            None
        }
    }

    fn finish(&mut self, state: SimulationState) {
        self.state = state;
        tracing::info!(state = %state, steps = self.steps, beats = self.beats.len(), "simulation finished");
    }

    pub fn into_report(self) -> SimulationReport {
        SimulationReport {
            state: self.state,
            steps: self.steps,
            seed: self.seed,
            beats: self.beats,
            world: self.world,
            errors: self.errors,
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn beats(&self) -> &[StoryBeat] {
        &self.beats
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}
