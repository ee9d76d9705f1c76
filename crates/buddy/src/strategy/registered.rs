//! Search direct dependents that opted in to serving the policed module.
//!
//! A dependent opts in by listing the policed module's symbolic name among
//! its registered buddies. The filtered set is computed once at construction
//! and never grows; graph changes are picked up only when the orchestrator
//! rebuilds its snapshot.

use std::sync::Arc;

use kith_wiring::{GraphQuery, Locator, ModuleId, Result, Symbol};

use super::dependent::immediate_dependents;
use super::{BuddyPolicy, Hit, Probe, collect_resources, live_table};

pub struct RegisteredPolicy {
	module: ModuleId,
	graph: Arc<dyn GraphQuery>,
	/// `None` when filtering left nothing to search.
	candidates: Option<Box<[ModuleId]>>,
}

impl RegisteredPolicy {
	pub fn new(module: ModuleId, graph: Arc<dyn GraphQuery>) -> Result<Self> {
		let candidates = match graph.symbolic_name(module) {
			Some(requester) => immediate_dependents(&*graph, module)?
				.into_iter()
				.filter(|dependent| {
					graph
						.registered_buddies(*dependent)
						.iter()
						.any(|buddy| **buddy == *requester)
				})
				.collect::<Vec<_>>(),
			None => Vec::new(),
		};

		tracing::trace!(module = %module, candidates = candidates.len(), "registered buddies filtered");
		Ok(Self {
			module,
			graph,
			candidates: (!candidates.is_empty()).then(|| candidates.into_boxed_slice()),
		})
	}

	pub fn module(&self) -> ModuleId {
		self.module
	}

	pub fn is_inert(&self) -> bool {
		self.candidates.is_none()
	}

	/// Opted-in dependents, in search order.
	pub fn candidates(&self) -> &[ModuleId] {
		self.candidates.as_deref().unwrap_or_default()
	}

	fn find_first(&self, name: &str, probe: Probe) -> Result<Option<Hit>> {
		for candidate in self.candidates() {
			if let Some(table) = live_table(&*self.graph, *candidate)
				&& let Some(hit) = probe.run(&*table, name)?
			{
				return Ok(Some(hit));
			}
		}
		Ok(None)
	}
}

impl BuddyPolicy for RegisteredPolicy {
	fn resolve_class(&self, name: &str) -> Result<Option<Symbol>> {
		Ok(self.find_first(name, Probe::Class)?.and_then(Hit::into_class))
	}

	fn resolve_resource(&self, name: &str) -> Result<Option<Locator>> {
		Ok(self
			.find_first(name, Probe::Resource)?
			.and_then(Hit::into_resource))
	}

	fn resolve_resources(&self, name: &str) -> Result<Vec<Locator>> {
		let mut found = Vec::new();
		for candidate in self.candidates() {
			if let Some(table) = live_table(&*self.graph, *candidate) {
				found.extend(collect_resources(&*table, name)?);
			}
		}
		Ok(found)
	}
}
