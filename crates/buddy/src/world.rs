//! Loaders for every module of a world manifest.

use std::sync::Arc;

use kith_wiring::{
	GraphQuery, ManifestError, ModuleId, TierManifest, TierManifests, WiringGraph, WorldManifest,
};
use rustc_hash::FxHashMap;

use crate::descriptor::PolicyDescriptor;
use crate::handler::PolicyHandler;
use crate::loader::ModuleLoader;
use crate::strategy::{StaticTier, SystemTier, TierRegistry};

/// Builds a tier registry serving the manifest's `[tiers]` content.
pub fn tier_registry(tiers: &TierManifests) -> TierRegistry {
	let mut registry = TierRegistry::new();
	for (tier, manifest) in [
		(SystemTier::Boot, &tiers.boot),
		(SystemTier::Platform, &tiers.platform),
		(SystemTier::Application, &tiers.application),
	] {
		if let Some(TierManifest { classes, resources }) = manifest {
			let content = StaticTier::for_tier(tier)
				.with_classes(classes.iter().map(String::as_str))
				.with_resources(resources);
			registry = registry.with_tier(tier, Arc::new(content));
		}
	}
	registry
}

/// An installed world: the graph, the shared tiers and one loader per module.
pub struct World {
	graph: Arc<WiringGraph>,
	tiers: Arc<TierRegistry>,
	ids: FxHashMap<String, ModuleId>,
	loaders: FxHashMap<ModuleId, ModuleLoader>,
}

impl World {
	/// Installs `manifest` into a fresh graph and attaches a handler to every
	/// module that declares a buddy policy.
	pub fn build(manifest: &WorldManifest) -> Result<Self, ManifestError> {
		let graph = Arc::new(WiringGraph::new());
		let ids = manifest.install_into(&graph)?;
		let tiers = Arc::new(tier_registry(&manifest.tiers));

		let mut loaders = FxHashMap::default();
		for module in &manifest.modules {
			let id = ids[module.name.as_str()];
			let mut loader = ModuleLoader::new(id, graph.clone());
			let descriptor = PolicyDescriptor::new(&module.buddy_policy);
			if !descriptor.is_empty() {
				let handler = Arc::new(PolicyHandler::new(
					id,
					descriptor,
					graph.clone(),
					tiers.clone(),
				));
				handler.open(graph.events());
				loader = loader.with_policy(handler);
			}
			loaders.insert(id, loader);
		}

		tracing::debug!(modules = loaders.len(), "world ready");
		Ok(Self {
			graph,
			tiers,
			ids,
			loaders,
		})
	}

	pub fn graph(&self) -> &Arc<WiringGraph> {
		&self.graph
	}

	pub fn tiers(&self) -> &Arc<TierRegistry> {
		&self.tiers
	}

	pub fn module_id(&self, name: &str) -> Option<ModuleId> {
		self.ids.get(name).copied()
	}

	/// Symbolic name of `module`, or the tier it stands for.
	pub fn display_name(&self, module: ModuleId) -> String {
		if let Some(name) = self.graph.symbolic_name(module) {
			return name.to_string();
		}
		[SystemTier::Boot, SystemTier::Platform, SystemTier::Application]
			.into_iter()
			.find(|tier| tier.module_id() == module)
			.map_or_else(|| module.to_string(), |tier| format!("<{tier}>"))
	}

	pub fn loader(&self, name: &str) -> Option<&ModuleLoader> {
		self.loaders.get(&self.module_id(name)?)
	}
}

impl Drop for World {
	fn drop(&mut self) {
		for loader in self.loaders.values() {
			if let Some(handler) = loader.policy() {
				handler.close(self.graph.events());
			}
		}
	}
}
