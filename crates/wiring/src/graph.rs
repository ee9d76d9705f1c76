//! In-memory wiring graph.
//!
//! # Purpose
//!
//! Reference implementation of [`GraphQuery`] used by the inspector and by
//! tests. It owns module lifecycle (install, resolve, unresolve, uninstall),
//! requirement wires, fragment attachment and a diagnostics sink, and
//! publishes a [`TopologyEvent`] for every lifecycle transition.
//!
//! # Invariants
//!
//! - Events are published after the graph lock is released, so listeners may
//!   query the graph from inside `topology_changed`.
//! - Dependents are reported in wire insertion order and without duplicates.
//! - Unresolving a module drops the wires it declared as a requirer.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::{
	GraphQuery, LocalSymbols, ModuleId, Provider, Result, SymbolTable, TopologyChange,
	TopologyEvent, TopologyEvents, WiringError,
};

/// Relation carried by a requirement wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum WireKind {
	/// The requirer imports a namespace the provider exports.
	Package,
	/// The requirer requires the provider module as a whole.
	Module,
}

/// Description of a module to install.
#[derive(Debug, Clone, Default)]
pub struct ModuleSpec {
	pub name: Arc<str>,
	pub fragment_host: Option<ModuleId>,
	pub exports: Vec<Arc<str>>,
	pub registered_buddies: Vec<Arc<str>>,
	pub classes: Vec<Arc<str>>,
	pub resources: Vec<Arc<str>>,
}

impl ModuleSpec {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	pub fn fragment_of(mut self, host: ModuleId) -> Self {
		self.fragment_host = Some(host);
		self
	}

	pub fn export(mut self, namespace: impl Into<Arc<str>>) -> Self {
		self.exports.push(namespace.into());
		self
	}

	pub fn register_buddy(mut self, requester: impl Into<Arc<str>>) -> Self {
		self.registered_buddies.push(requester.into());
		self
	}

	pub fn class(mut self, name: impl Into<Arc<str>>) -> Self {
		self.classes.push(name.into());
		self
	}

	pub fn resource(mut self, path: impl Into<Arc<str>>) -> Self {
		self.resources.push(path.into());
		self
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Wire {
	requirer: ModuleId,
	provider: ModuleId,
	kind: WireKind,
}

#[derive(Debug)]
struct ModuleEntry {
	spec: ModuleSpec,
	resolved: bool,
}

#[derive(Debug, Default)]
struct GraphInner {
	modules: FxHashMap<ModuleId, ModuleEntry>,
	by_name: FxHashMap<Arc<str>, ModuleId>,
	/// Install order, used for capability search.
	order: Vec<ModuleId>,
	wires: Vec<Wire>,
	next_id: u32,
}

impl GraphInner {
	fn entry(&self, id: ModuleId) -> Result<&ModuleEntry> {
		self.modules.get(&id).ok_or(WiringError::ModuleGone(id))
	}
}

/// Mutable module graph with a read-only [`GraphQuery`] face.
pub struct WiringGraph {
	inner: RwLock<GraphInner>,
	events: Arc<TopologyEvents>,
	diagnostics: Mutex<Vec<(ModuleId, String)>>,
}

impl Default for WiringGraph {
	fn default() -> Self {
		Self::new()
	}
}

impl WiringGraph {
	pub fn new() -> Self {
		Self::with_events(Arc::new(TopologyEvents::new()))
	}

	/// Creates a graph that publishes into an existing event source.
	pub fn with_events(events: Arc<TopologyEvents>) -> Self {
		Self {
			inner: RwLock::new(GraphInner::default()),
			events,
			diagnostics: Mutex::new(Vec::new()),
		}
	}

	pub fn events(&self) -> &Arc<TopologyEvents> {
		&self.events
	}

	/// Installs a module in the unresolved state.
	///
	/// Symbolic names are last-wins: installing a second module under a name
	/// already in use points [`lookup`](Self::lookup) at the newcomer. The
	/// shadowed module stays installed and reachable by id.
	pub fn install(&self, spec: ModuleSpec) -> ModuleId {
		let id = {
			let mut inner = self.inner.write();
			let id = ModuleId::new(inner.next_id);
			inner.next_id += 1;
			if let Some(shadowed) = inner.by_name.insert(spec.name.clone(), id) {
				tracing::warn!(name = %spec.name, %shadowed, module = %id, "module name reused");
			}
			inner.order.push(id);
			inner.modules.insert(
				id,
				ModuleEntry {
					spec,
					resolved: false,
				},
			);
			id
		};
		self.events
			.publish(TopologyEvent::new(id, TopologyChange::Installed));
		id
	}

	/// Looks up a module by symbolic name.
	pub fn lookup(&self, name: &str) -> Option<ModuleId> {
		self.inner.read().by_name.get(name).copied()
	}

	/// Adds a requirement wire from `requirer` to `provider`.
	pub fn wire(&self, requirer: ModuleId, provider: ModuleId, kind: WireKind) -> Result<()> {
		let mut inner = self.inner.write();
		inner.entry(requirer)?;
		inner.entry(provider)?;
		let wire = Wire {
			requirer,
			provider,
			kind,
		};
		if !inner.wires.contains(&wire) {
			inner.wires.push(wire);
		}
		Ok(())
	}

	/// Marks a module resolved and publishes [`TopologyChange::Resolved`].
	pub fn resolve(&self, id: ModuleId) -> Result<()> {
		self.set_resolved(id, true)?;
		self.events
			.publish(TopologyEvent::new(id, TopologyChange::Resolved));
		Ok(())
	}

	/// Marks a module unresolved, drops its requirement wires and publishes
	/// [`TopologyChange::Unresolved`].
	pub fn unresolve(&self, id: ModuleId) -> Result<()> {
		self.set_resolved(id, false)?;
		self.inner.write().wires.retain(|w| w.requirer != id);
		self.events
			.publish(TopologyEvent::new(id, TopologyChange::Unresolved));
		Ok(())
	}

	/// Removes a module and every wire touching it.
	pub fn uninstall(&self, id: ModuleId) -> Result<()> {
		let was_resolved = {
			let mut inner = self.inner.write();
			let entry = inner
				.modules
				.remove(&id)
				.ok_or(WiringError::ModuleGone(id))?;
			if inner.by_name.get(&entry.spec.name) == Some(&id) {
				inner.by_name.remove(&entry.spec.name);
			}
			inner.order.retain(|m| *m != id);
			inner
				.wires
				.retain(|w| w.requirer != id && w.provider != id);
			entry.resolved
		};
		if was_resolved {
			self.events
				.publish(TopologyEvent::new(id, TopologyChange::Unresolved));
		}
		self.events
			.publish(TopologyEvent::new(id, TopologyChange::Uninstalled));
		Ok(())
	}

	fn set_resolved(&self, id: ModuleId, resolved: bool) -> Result<()> {
		let mut inner = self.inner.write();
		let entry = inner
			.modules
			.get_mut(&id)
			.ok_or(WiringError::ModuleGone(id))?;
		entry.resolved = resolved;
		Ok(())
	}

	/// Wires of `requirer`, in insertion order.
	pub fn wires_of(&self, requirer: ModuleId) -> Vec<(ModuleId, WireKind)> {
		self.inner
			.read()
			.wires
			.iter()
			.filter(|w| w.requirer == requirer)
			.map(|w| (w.provider, w.kind))
			.collect()
	}

	/// Messages reported through [`GraphQuery::report_error`].
	pub fn diagnostics(&self) -> Vec<(ModuleId, String)> {
		self.diagnostics.lock().clone()
	}
}

impl GraphQuery for WiringGraph {
	fn is_resolved(&self, module: ModuleId) -> bool {
		self.inner
			.read()
			.modules
			.get(&module)
			.is_some_and(|m| m.resolved)
	}

	fn symbolic_name(&self, module: ModuleId) -> Option<Arc<str>> {
		self.inner
			.read()
			.modules
			.get(&module)
			.map(|m| m.spec.name.clone())
	}

	fn immediate_dependents(&self, module: ModuleId) -> Result<Vec<ModuleId>> {
		let inner = self.inner.read();
		inner.entry(module)?;
		let mut out: Vec<ModuleId> = Vec::new();
		for wire in inner.wires.iter().filter(|w| w.provider == module) {
			let live = inner
				.modules
				.get(&wire.requirer)
				.is_some_and(|m| m.resolved);
			if live && !out.contains(&wire.requirer) {
				out.push(wire.requirer);
			}
		}
		Ok(out)
	}

	fn find_capability_providers(&self, namespace: &str) -> Result<Vec<Provider>> {
		let inner = self.inner.read();
		Ok(inner
			.order
			.iter()
			.filter_map(|id| {
				let entry = inner.modules.get(id)?;
				let exported = entry.spec.exports.iter().any(|e| &**e == namespace);
				(entry.resolved && exported).then(|| Provider {
					module: *id,
					namespace: namespace.into(),
					fragment: entry.spec.fragment_host.is_some(),
				})
			})
			.collect())
	}

	fn host_of(&self, fragment: ModuleId) -> Option<ModuleId> {
		self.inner
			.read()
			.modules
			.get(&fragment)
			.and_then(|m| m.spec.fragment_host)
	}

	fn registered_buddies(&self, module: ModuleId) -> Vec<Arc<str>> {
		self.inner
			.read()
			.modules
			.get(&module)
			.map(|m| m.spec.registered_buddies.clone())
			.unwrap_or_default()
	}

	fn symbol_table(&self, module: ModuleId) -> Option<Arc<dyn SymbolTable>> {
		let inner = self.inner.read();
		let host = inner.modules.get(&module)?;
		if host.spec.fragment_host.is_some() {
			return None;
		}

		let mut table = LocalSymbols::new();
		table.contribute(
			module,
			host.spec.classes.iter().cloned(),
			host.spec.resources.iter().cloned(),
		);
		for id in &inner.order {
			if let Some(fragment) = inner.modules.get(id)
				&& fragment.spec.fragment_host == Some(module)
			{
				table.contribute(
					*id,
					fragment.spec.classes.iter().cloned(),
					fragment.spec.resources.iter().cloned(),
				);
			}
		}
		Some(Arc::new(table))
	}

	fn report_error(&self, module: ModuleId, message: &str) {
		tracing::error!(module = %module, "{message}");
		self.diagnostics.lock().push((module, message.to_owned()));
	}
}
