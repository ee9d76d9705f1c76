//! Search the modules that depend on the policed module.
//!
//! The frontier starts with the immediate dependents and grows one hop at a
//! time, only when a lookup walks past a candidate without a hit. Lookups
//! that succeed early never pay for discovering the rest of the graph.
//!
//! # Invariants
//!
//! - The frontier never shrinks and never holds a module twice.
//! - The policed module is never part of its own frontier.
//! - Each candidate's dependents are added at most once; `expanded` is the
//!   high-water mark of candidates whose dependents are already in the list.
//! - Expansion runs under the frontier lock so concurrent lookups never see a
//!   half-added hop. Symbol table probes run outside it.

use std::sync::Arc;

use kith_wiring::{GraphQuery, Locator, ModuleId, Result, Symbol, WiringError};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use super::{BuddyPolicy, Probe, collect_resources, live_table};

pub struct DependentPolicy {
	module: ModuleId,
	graph: Arc<dyn GraphQuery>,
	/// `None` when the module had no dependents at construction.
	frontier: Option<Mutex<Frontier>>,
}

#[derive(Debug)]
struct Frontier {
	modules: Vec<ModuleId>,
	seen: FxHashSet<ModuleId>,
	expanded: usize,
}

impl Frontier {
	fn seeded(origin: ModuleId, seeds: Vec<ModuleId>) -> Self {
		let mut frontier = Self {
			modules: Vec::with_capacity(seeds.len()),
			seen: FxHashSet::default(),
			expanded: 0,
		};
		frontier.seen.insert(origin);
		frontier.extend(seeds);
		frontier
	}

	fn extend(&mut self, modules: Vec<ModuleId>) {
		for module in modules {
			if self.seen.insert(module) {
				self.modules.push(module);
			}
		}
	}
}

/// Immediate dependents of `module`, excluding the module itself.
///
/// Shared with the registered strategy, which filters this set.
pub(super) fn immediate_dependents(graph: &dyn GraphQuery, module: ModuleId) -> Result<Vec<ModuleId>> {
	let mut dependents = graph.immediate_dependents(module)?;
	dependents.retain(|d| *d != module);
	Ok(dependents)
}

impl DependentPolicy {
	pub fn new(module: ModuleId, graph: Arc<dyn GraphQuery>) -> Result<Self> {
		let seeds = immediate_dependents(&*graph, module)?;
		let frontier = (!seeds.is_empty()).then(|| Mutex::new(Frontier::seeded(module, seeds)));
		if frontier.is_none() {
			tracing::trace!(module = %module, "no dependents; dependent policy is inert");
		}
		Ok(Self {
			module,
			graph,
			frontier,
		})
	}

	pub fn module(&self) -> ModuleId {
		self.module
	}

	/// Whether the strategy can never produce a result.
	pub fn is_inert(&self) -> bool {
		self.frontier.is_none()
	}

	/// Candidates discovered so far, in search order.
	pub fn frontier(&self) -> Vec<ModuleId> {
		self.frontier
			.as_ref()
			.map(|f| f.lock().modules.clone())
			.unwrap_or_default()
	}

	pub fn frontier_len(&self) -> usize {
		self.frontier.as_ref().map_or(0, |f| f.lock().modules.len())
	}

	fn candidate(frontier: &Mutex<Frontier>, index: usize) -> Option<ModuleId> {
		frontier.lock().modules.get(index).copied()
	}

	/// Adds the dependents of every candidate up to and including `index`
	/// that has not been expanded yet.
	fn expand_through(&self, frontier: &Mutex<Frontier>, index: usize) -> Result<()> {
		let mut frontier = frontier.lock();
		while frontier.expanded <= index && frontier.expanded < frontier.modules.len() {
			let next = frontier.modules[frontier.expanded];
			let dependents = if self.graph.is_resolved(next) {
				match self.graph.immediate_dependents(next) {
					Err(WiringError::ModuleGone(_)) => Vec::new(),
					other => other?,
				}
			} else {
				Vec::new()
			};
			let before = frontier.modules.len();
			frontier.extend(dependents);
			frontier.expanded += 1;
			if frontier.modules.len() > before {
				tracing::trace!(
					module = %self.module,
					via = %next,
					added = frontier.modules.len() - before,
					"expanded dependent frontier"
				);
			}
		}
		Ok(())
	}

	fn find_first(&self, name: &str, probe: Probe) -> Result<Option<super::Hit>> {
		let Some(frontier) = &self.frontier else {
			return Ok(None);
		};
		let mut index = 0;
		while let Some(candidate) = Self::candidate(frontier, index) {
			if let Some(table) = live_table(&*self.graph, candidate)
				&& let Some(hit) = probe.run(&*table, name)?
			{
				return Ok(Some(hit));
			}
			self.expand_through(frontier, index)?;
			index += 1;
		}
		Ok(None)
	}
}

impl BuddyPolicy for DependentPolicy {
	fn resolve_class(&self, name: &str) -> Result<Option<Symbol>> {
		Ok(self
			.find_first(name, Probe::Class)?
			.and_then(super::Hit::into_class))
	}

	fn resolve_resource(&self, name: &str) -> Result<Option<Locator>> {
		Ok(self
			.find_first(name, Probe::Resource)?
			.and_then(super::Hit::into_resource))
	}

	fn resolve_resources(&self, name: &str) -> Result<Vec<Locator>> {
		let Some(frontier) = &self.frontier else {
			return Ok(Vec::new());
		};
		let mut found = Vec::new();
		let mut index = 0;
		while let Some(candidate) = Self::candidate(frontier, index) {
			if let Some(table) = live_table(&*self.graph, candidate) {
				found.extend(collect_resources(&*table, name)?);
			}
			self.expand_through(frontier, index)?;
			index += 1;
		}
		Ok(found)
	}
}
