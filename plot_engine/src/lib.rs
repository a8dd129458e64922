//! # Plot Engine
//!
//! Generates murder-mystery plots by running declarative rules against a
//! [`mystery_world::WorldState`]. Each step grounds every rule, filters the
//! candidates by probability, applies one, and lets it pull in follow-up
//! responses. The output is a sequence of story beats for a separate text
//! realization stage; the engine never produces prose.
//!
//! ## Core Components
//!
//! - **catalog**: Rules text parsing and load-time validation
//! - **grounding**: Backtracking search for role assignments that satisfy preconditions
//! - **scheduler**: Per-step selection among (rule, grounding) candidates
//! - **apply**: Transactional effect application and entity construction
//! - **responses**: Pinned follow-up rules chained after a beat
//! - **simulation**: The step loop, its configuration and final report
//!
//! ## Design Philosophy
//!
//! - **Data, not code**: New story content is new rules text, never new engine branches
//! - **Replayable**: One seeded PRNG drives every random choice

pub mod apply;
pub mod beat;
pub mod catalog;
pub mod content;
pub mod error;
pub mod grounding;
pub mod responses;
pub mod scheduler;
pub mod simulation;

pub use apply::*;
pub use beat::*;
pub use catalog::*;
pub use error::*;
pub use grounding::*;
pub use responses::*;
pub use scheduler::*;
pub use simulation::*;
