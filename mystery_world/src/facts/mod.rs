//! Facts module - the only mutable state of the world.
//!
//! - **Fact**: a predicate label with entity slots, true or false
//! - **FactStore**: closed-world storage indexed by label, with atomic commits
//! - **FactPattern**: queries with free variables over the store

mod fact;
mod pattern;
mod store;

pub use fact::*;
pub use pattern::*;
pub use store::*;
