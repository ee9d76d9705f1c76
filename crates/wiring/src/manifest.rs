//! World manifests: a TOML description of modules and their wiring.
//!
//! ```toml
//! [[module]]
//! name = "app"
//! imports = ["lib.api"]
//! buddy_policy = ["registered", "global"]
//! classes = ["app.Main"]
//!
//! [[module]]
//! name = "lib"
//! exports = ["lib.api"]
//! registered_buddies = ["app"]
//! buddy_policy = "dependent, global"
//!
//! [tiers.boot]
//! classes = ["java.lang.Object"]
//! ```
//!
//! Loading installs every module, wires imports to the first exporter of the
//! namespace (fragments are wired through their host) and `requires` to the
//! named module, then resolves hosts before fragments.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::{ManifestError, ModuleId, ModuleSpec, WireKind, WiringGraph};

/// Parsed manifest document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldManifest {
	#[serde(default, rename = "module")]
	pub modules: Vec<ModuleManifest>,
	#[serde(default)]
	pub tiers: TierManifests,
}

/// One `[[module]]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleManifest {
	pub name: String,
	#[serde(default)]
	pub fragment_host: Option<String>,
	#[serde(default)]
	pub exports: Vec<String>,
	#[serde(default)]
	pub imports: Vec<String>,
	#[serde(default)]
	pub requires: Vec<String>,
	#[serde(default)]
	pub registered_buddies: Vec<String>,
	/// Raw policy tokens; interpreted by the resolver, not by the graph.
	/// Accepts a header string (`"dependent, global"`) or an array.
	#[serde(default, deserialize_with = "policy_tokens")]
	pub buddy_policy: Vec<String>,
	#[serde(default)]
	pub classes: Vec<String>,
	#[serde(default)]
	pub resources: Vec<String>,
}

/// Content of the system tiers outside the module graph.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierManifests {
	#[serde(default)]
	pub boot: Option<TierManifest>,
	#[serde(default)]
	pub platform: Option<TierManifest>,
	#[serde(default)]
	pub application: Option<TierManifest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierManifest {
	#[serde(default)]
	pub classes: Vec<String>,
	#[serde(default)]
	pub resources: Vec<String>,
}

impl WorldManifest {
	pub fn parse(input: &str) -> Result<Self, ManifestError> {
		Ok(toml::from_str(input)?)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|error| ManifestError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&content)
	}

	pub fn module(&self, name: &str) -> Option<&ModuleManifest> {
		self.modules.iter().find(|m| m.name == name)
	}

	/// Installs, wires and resolves every module into `graph`.
	///
	/// Returns the assigned ids keyed by module name.
	pub fn install_into(
		&self,
		graph: &WiringGraph,
	) -> Result<FxHashMap<String, ModuleId>, ManifestError> {
		self.validate()?;

		let mut ids: FxHashMap<String, ModuleId> = FxHashMap::default();
		let (hosts, fragments): (Vec<_>, Vec<_>) =
			self.modules.iter().partition(|m| m.fragment_host.is_none());

		for module in hosts.iter().chain(fragments.iter()) {
			let mut spec = ModuleSpec::new(module.name.as_str());
			if let Some(host) = &module.fragment_host {
				spec = spec.fragment_of(ids[host.as_str()]);
			}
			spec.exports = arcs(&module.exports);
			spec.registered_buddies = arcs(&module.registered_buddies);
			spec.classes = arcs(&module.classes);
			spec.resources = arcs(&module.resources);
			ids.insert(module.name.clone(), graph.install(spec));
		}

		for module in &self.modules {
			let requirer = ids[module.name.as_str()];
			for namespace in &module.imports {
				let provider = self.exporter_of(namespace).ok_or_else(|| {
					ManifestError::UnresolvedImport {
						from: module.name.clone(),
						namespace: namespace.clone(),
					}
				})?;
				let target = provider.fragment_host.as_deref().unwrap_or(&provider.name);
				graph
					.wire(requirer, ids[target], WireKind::Package)
					.map_err(|_| unknown(&module.name, target))?;
			}
			for name in &module.requires {
				graph
					.wire(requirer, ids[name.as_str()], WireKind::Module)
					.map_err(|_| unknown(&module.name, name))?;
			}
		}

		for module in hosts.iter().chain(fragments.iter()) {
			let id = ids[module.name.as_str()];
			graph
				.resolve(id)
				.map_err(|_| unknown(&module.name, &module.name))?;
		}

		tracing::debug!(modules = ids.len(), "installed world manifest");
		Ok(ids)
	}

	fn exporter_of(&self, namespace: &str) -> Option<&ModuleManifest> {
		self.modules
			.iter()
			.find(|m| m.exports.iter().any(|e| e == namespace))
	}

	fn validate(&self) -> Result<(), ManifestError> {
		let mut seen: FxHashMap<&str, &ModuleManifest> = FxHashMap::default();
		for module in &self.modules {
			if seen.insert(module.name.as_str(), module).is_some() {
				return Err(ManifestError::DuplicateModule(module.name.clone()));
			}
		}
		for module in &self.modules {
			if let Some(host) = &module.fragment_host {
				let target = seen
					.get(host.as_str())
					.ok_or_else(|| unknown(&module.name, host))?;
				if target.fragment_host.is_some() {
					return Err(ManifestError::NestedFragment {
						fragment: module.name.clone(),
						host: host.clone(),
					});
				}
			}
			if let Some(missing) = module
				.requires
				.iter()
				.find(|name| !seen.contains_key(name.as_str()))
			{
				return Err(unknown(&module.name, missing));
			}
		}
		Ok(())
	}
}

fn policy_tokens<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum RawPolicy {
		Header(String),
		List(Vec<String>),
	}

	Ok(match RawPolicy::deserialize(deserializer)? {
		RawPolicy::Header(header) => header.split(',').map(str::to_owned).collect(),
		RawPolicy::List(tokens) => tokens,
	})
}

fn arcs(values: &[String]) -> Vec<Arc<str>> {
	values.iter().map(|v| Arc::from(v.as_str())).collect()
}

fn unknown(from: &str, name: &str) -> ManifestError {
	ManifestError::UnknownModule {
		from: from.to_owned(),
		name: name.to_owned(),
	}
}
