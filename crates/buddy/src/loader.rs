//! Local-then-buddy lookup facade for one module.

use std::sync::Arc;

use kith_wiring::{GraphQuery, Locator, ModuleId, Result, Symbol};
use rustc_hash::FxHashSet;

use crate::handler::PolicyHandler;
use crate::strategy::TierDelegate;

/// Answers lookups for a module from its own symbol table, falling back to
/// its buddy chain on a miss.
#[derive(Clone)]
pub struct ModuleLoader {
	module: ModuleId,
	graph: Arc<dyn GraphQuery>,
	policy: Option<Arc<PolicyHandler>>,
}

impl ModuleLoader {
	pub fn new(module: ModuleId, graph: Arc<dyn GraphQuery>) -> Self {
		Self {
			module,
			graph,
			policy: None,
		}
	}

	pub fn with_policy(mut self, policy: Arc<PolicyHandler>) -> Self {
		self.policy = Some(policy);
		self
	}

	pub fn module(&self) -> ModuleId {
		self.module
	}

	pub fn policy(&self) -> Option<&Arc<PolicyHandler>> {
		self.policy.as_ref()
	}

	pub fn find_class(&self, name: &str) -> Result<Option<Symbol>> {
		if let Some(table) = self.graph.symbol_table(self.module)
			&& let Some(symbol) = table.find_local_class(name)?
		{
			return Ok(Some(symbol));
		}
		match &self.policy {
			Some(policy) => policy.resolve_class(name),
			None => Ok(None),
		}
	}

	pub fn find_resource(&self, name: &str) -> Result<Option<Locator>> {
		if let Some(table) = self.graph.symbol_table(self.module)
			&& let Some(locator) = table.find_local_resource(name)?
		{
			return Ok(Some(locator));
		}
		match &self.policy {
			Some(policy) => policy.resolve_resource(name),
			None => Ok(None),
		}
	}

	/// Local matches followed by buddy matches, each locator once.
	pub fn find_resources(&self, name: &str) -> Result<Vec<Locator>> {
		let mut found: Vec<Locator> = match self.graph.symbol_table(self.module) {
			Some(table) => table.find_local_resources(name)?.collect::<Result<_>>()?,
			None => Vec::new(),
		};
		if let Some(policy) = &self.policy {
			let mut seen: FxHashSet<Locator> = found.iter().cloned().collect();
			found.extend(
				policy
					.resolve_resources(name)
					.filter(|locator| seen.insert(locator.clone())),
			);
		}
		Ok(found)
	}
}

impl TierDelegate for ModuleLoader {
	fn load_class(&self, name: &str) -> Result<Option<Symbol>> {
		self.find_class(name)
	}

	fn find_resource(&self, name: &str) -> Result<Option<Locator>> {
		ModuleLoader::find_resource(self, name)
	}

	fn find_resources(&self, name: &str) -> Result<Vec<Locator>> {
		ModuleLoader::find_resources(self, name)
	}
}

impl std::fmt::Debug for ModuleLoader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ModuleLoader")
			.field("module", &self.module)
			.field("policy", &self.policy)
			.finish()
	}
}
