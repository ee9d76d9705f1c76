//! Buddy policy delegation.
//!
//! When a module cannot satisfy a class or resource lookup from its own symbol
//! table, its [`PolicyHandler`] walks an ordered chain of delegation
//! strategies over the wiring graph and returns the first hit.
//!
//! # Purpose
//!
//! - Owns: the strategy chain per module, strategy caching, cycle breaking and
//!   cache invalidation on topology change.
//! - Does not own: the wiring graph, symbol storage, or module lifecycle; those
//!   are consumed through [`kith_wiring::GraphQuery`] and
//!   [`kith_wiring::SymbolTable`].
//!
//! # Strategies
//!
//! | Token | Strategy | Searches |
//! |---|---|---|
//! | `dependent` | [`DependentPolicy`] | dependents, one hop per miss |
//! | `registered` | [`RegisteredPolicy`] | direct dependents that opted in |
//! | `global` | [`GlobalPolicy`] | any provider of the symbol's namespace |
//! | `boot`, `platform`, `application` | [`SystemPolicy`] | a shared system tier |
//! | `parent` | [`SystemPolicy`] | the handler's parent delegate |
//!
//! # Invariants
//!
//! | Invariant | Enforced in | Tested by |
//! |---|---|---|
//! | Strategies run in descriptor order; the first hit wins | `PolicyHandler::resolve_class` | `invariants::test_chain_order_preserved` |
//! | Reentrant lookups for the same name on one thread yield nothing | [`CycleGuard::enter`] | `invariants::test_cycle_terminates` |
//! | The dependent frontier grows only on a miss, one hop at a time | `DependentPolicy::expand_through` | `invariants::test_frontier_grows_lazily` |
//! | The registered filter never grows after construction | [`RegisteredPolicy::new`] | `invariants::test_registered_filter_fixed` |
//! | Rewiring events discard every cached strategy | [`PolicyHandler::invalidate`] | `invariants::test_topology_change_rematerializes` |
//! | Aggregated resources hold each locator once | [`PolicyHandler::resolve_resources`] | `invariants::test_resources_deduplicated` |
//! | The guard entry is released on every exit path | `InFlight::drop` | `invariants::test_guard_released_on_error` |
//! | A slot is materialized once per generation | `PolicyHandler::policy_at` | `invariants::test_concurrent_lookups_agree` |
//!
//! # Failure modes
//!
//! - Unknown token: reported once through
//!   [`GraphQuery::report_error`](kith_wiring::GraphQuery::report_error); the
//!   slot yields nothing.
//! - Collaborator error: returned to the caller of a single-value lookup.
//! - Resource scan error: that strategy's results are dropped with a warning.

pub mod descriptor;
pub mod guard;
pub mod handler;
pub mod loader;
pub mod resources;
mod snapshot;
pub mod strategy;
pub mod world;

#[cfg(test)]
pub(crate) mod invariants;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use descriptor::{PolicyDescriptor, PolicyKind};
pub use guard::{CycleGuard, InFlight};
pub use handler::PolicyHandler;
pub use loader::ModuleLoader;
pub use resources::Resources;
pub use strategy::{
	BuddyPolicy, DependentPolicy, EmptyTier, GlobalPolicy, RegisteredPolicy, StaticTier, Strategy,
	SystemPolicy, SystemTier, TierDelegate, TierRegistry,
};
pub use world::{World, tier_registry};
