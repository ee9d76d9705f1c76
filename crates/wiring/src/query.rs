//! Read-only seams consumed by the resolver.

use std::sync::Arc;

use crate::{Locator, ModuleId, Result, Symbol};

/// Iterator over locators produced by a local resource scan.
///
/// Items are fallible so a scan can fail part way through.
pub type LocatorIter<'a> = Box<dyn Iterator<Item = Result<Locator>> + Send + 'a>;

/// Per-module local symbol lookup.
///
/// Implementations must answer from the module's own content only. They must
/// not delegate to other modules or to a parent tier.
pub trait SymbolTable: Send + Sync {
	fn find_local_class(&self, name: &str) -> Result<Option<Symbol>>;

	fn find_local_resource(&self, name: &str) -> Result<Option<Locator>>;

	fn find_local_resources(&self, name: &str) -> Result<LocatorIter<'_>>;
}

/// A module that provides a capability in a given namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Provider {
	pub module: ModuleId,
	pub namespace: Arc<str>,
	/// Set when the provider is a fragment attached to a host and therefore
	/// has no symbol table of its own.
	pub fragment: bool,
}

/// Read-only view of the module wiring graph.
///
/// The resolver never mutates the graph through this trait. Every method may
/// be called concurrently from many lookup threads.
pub trait GraphQuery: Send + Sync {
	/// Whether `module` is still installed and resolved.
	fn is_resolved(&self, module: ModuleId) -> bool;

	/// Symbolic name the module was configured with.
	fn symbolic_name(&self, module: ModuleId) -> Option<Arc<str>>;

	/// Modules that hold a requirement wire to `module` (one hop, reverse
	/// edges), in wiring order and without duplicates.
	fn immediate_dependents(&self, module: ModuleId) -> Result<Vec<ModuleId>>;

	/// Every resolved provider of `namespace` across the whole graph.
	///
	/// Order is whatever the graph finds first; no ranking is implied.
	fn find_capability_providers(&self, namespace: &str) -> Result<Vec<Provider>>;

	/// Host a fragment is attached to.
	fn host_of(&self, fragment: ModuleId) -> Option<ModuleId>;

	/// Names of requesters `module` opts in to serving through the
	/// `registered` strategy.
	fn registered_buddies(&self, module: ModuleId) -> Vec<Arc<str>>;

	/// Local symbol table of `module`, if it has one.
	fn symbol_table(&self, module: ModuleId) -> Option<Arc<dyn SymbolTable>>;

	/// Diagnostic channel for configuration problems detected on behalf of
	/// `module`.
	fn report_error(&self, module: ModuleId, message: &str) {
		tracing::error!(module = %module, "{message}");
	}
}
