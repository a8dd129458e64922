//! # Mystery World
//!
//! The world model behind plot generation: typed entities with stable identity
//! and a closed-world store of facts about them. This crate is the single source
//! of truth for simulation state and knows nothing about rules.

pub mod entities;
pub mod error;
pub mod facts;
pub mod world_state;

pub use entities::*;
pub use error::*;
pub use facts::*;
pub use world_state::*;
