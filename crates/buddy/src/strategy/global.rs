//! Search every provider of the symbol's namespace.
//!
//! Providers come back in graph-query order and the first live one answers
//! single-value lookups; when several modules provide the same namespace the
//! winner is whichever the graph lists first. Fragment providers are
//! redirected to their host, since fragments have no symbol table.

use std::sync::Arc;

use kith_wiring::{
	GraphQuery, Locator, ModuleId, Result, Symbol, class_namespace, resource_namespace,
};

use super::{BuddyPolicy, collect_resources, live_table};

pub struct GlobalPolicy {
	graph: Arc<dyn GraphQuery>,
}

impl GlobalPolicy {
	pub fn new(graph: Arc<dyn GraphQuery>) -> Self {
		Self { graph }
	}

	/// Modules able to answer for `namespace`, hosts substituted for
	/// fragments, without duplicates.
	pub fn providers(&self, namespace: &str) -> Result<Vec<ModuleId>> {
		let mut modules = Vec::new();
		for provider in self.graph.find_capability_providers(namespace)? {
			let target = if provider.fragment {
				match self.graph.host_of(provider.module) {
					Some(host) => host,
					None => continue,
				}
			} else {
				provider.module
			};
			if !modules.contains(&target) {
				modules.push(target);
			}
		}
		Ok(modules)
	}
}

impl BuddyPolicy for GlobalPolicy {
	fn resolve_class(&self, name: &str) -> Result<Option<Symbol>> {
		for provider in self.providers(class_namespace(name))? {
			if let Some(table) = live_table(&*self.graph, provider) {
				return table.find_local_class(name);
			}
		}
		Ok(None)
	}

	fn resolve_resource(&self, name: &str) -> Result<Option<Locator>> {
		for provider in self.providers(&resource_namespace(name))? {
			if let Some(table) = live_table(&*self.graph, provider) {
				return table.find_local_resource(name);
			}
		}
		Ok(None)
	}

	fn resolve_resources(&self, name: &str) -> Result<Vec<Locator>> {
		let mut found = Vec::new();
		for provider in self.providers(&resource_namespace(name))? {
			if let Some(table) = live_table(&*self.graph, provider) {
				found.extend(collect_resources(&*table, name)?);
			}
		}
		Ok(found)
	}
}
