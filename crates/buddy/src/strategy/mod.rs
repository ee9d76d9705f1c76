//! Delegation strategies.
//!
//! The strategy set is closed: [`Strategy`] has one variant per recognized
//! kind and dispatches with a plain `match`. Every variant honours the same
//! three-operation [`BuddyPolicy`] contract.

use std::sync::Arc;

use kith_wiring::{GraphQuery, Locator, ModuleId, Result, Symbol, SymbolTable};

mod dependent;
mod global;
mod registered;
mod system;

pub use dependent::DependentPolicy;
pub use global::GlobalPolicy;
pub use registered::RegisteredPolicy;
pub use system::{EmptyTier, StaticTier, SystemPolicy, SystemTier, TierDelegate, TierRegistry};

/// Contract shared by all delegation strategies.
pub trait BuddyPolicy: Send + Sync {
	/// First class named `name` this strategy can reach.
	fn resolve_class(&self, name: &str) -> Result<Option<Symbol>>;

	/// First resource named `name` this strategy can reach.
	fn resolve_resource(&self, name: &str) -> Result<Option<Locator>>;

	/// Every resource named `name` this strategy can reach, in search order.
	fn resolve_resources(&self, name: &str) -> Result<Vec<Locator>>;
}

/// A materialized strategy instance.
pub enum Strategy {
	Dependent(DependentPolicy),
	Registered(RegisteredPolicy),
	Global(GlobalPolicy),
	System(Arc<SystemPolicy>),
}

impl Strategy {
	pub fn label(&self) -> &'static str {
		match self {
			Self::Dependent(_) => "dependent",
			Self::Registered(_) => "registered",
			Self::Global(_) => "global",
			Self::System(policy) => policy.label(),
		}
	}

	pub fn as_dependent(&self) -> Option<&DependentPolicy> {
		match self {
			Self::Dependent(policy) => Some(policy),
			_ => None,
		}
	}

	pub fn as_registered(&self) -> Option<&RegisteredPolicy> {
		match self {
			Self::Registered(policy) => Some(policy),
			_ => None,
		}
	}

	fn inner(&self) -> &dyn BuddyPolicy {
		match self {
			Self::Dependent(policy) => policy,
			Self::Registered(policy) => policy,
			Self::Global(policy) => policy,
			Self::System(policy) => &**policy,
		}
	}
}

impl std::fmt::Debug for Strategy {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("Strategy").field(&self.label()).finish()
	}
}

impl BuddyPolicy for Strategy {
	fn resolve_class(&self, name: &str) -> Result<Option<Symbol>> {
		self.inner().resolve_class(name)
	}

	fn resolve_resource(&self, name: &str) -> Result<Option<Locator>> {
		self.inner().resolve_resource(name)
	}

	fn resolve_resources(&self, name: &str) -> Result<Vec<Locator>> {
		self.inner().resolve_resources(name)
	}
}

/// Symbol table of `module`, revalidated against the graph.
///
/// Modules that are no longer resolved, and fragments, yield nothing.
pub(crate) fn live_table(graph: &dyn GraphQuery, module: ModuleId) -> Option<Arc<dyn SymbolTable>> {
	if !graph.is_resolved(module) {
		return None;
	}
	graph.symbol_table(module)
}

/// Drains a local resource scan. A failure part way through discards the scan.
pub(crate) fn collect_resources(table: &dyn SymbolTable, name: &str) -> Result<Vec<Locator>> {
	table.find_local_resources(name)?.collect()
}

/// One local probe against a candidate's symbol table.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Probe {
	Class,
	Resource,
}

/// Result of a [`Probe`].
pub(crate) enum Hit {
	Class(Symbol),
	Resource(Locator),
}

impl Probe {
	pub(crate) fn run(self, table: &dyn SymbolTable, name: &str) -> Result<Option<Hit>> {
		Ok(match self {
			Self::Class => table.find_local_class(name)?.map(Hit::Class),
			Self::Resource => table.find_local_resource(name)?.map(Hit::Resource),
		})
	}
}

impl Hit {
	pub(crate) fn into_class(self) -> Option<Symbol> {
		match self {
			Self::Class(symbol) => Some(symbol),
			Self::Resource(_) => None,
		}
	}

	pub(crate) fn into_resource(self) -> Option<Locator> {
		match self {
			Self::Resource(locator) => Some(locator),
			Self::Class(_) => None,
		}
	}
}
