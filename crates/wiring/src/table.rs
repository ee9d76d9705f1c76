use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::{Locator, LocatorIter, ModuleId, Result, Symbol, SymbolTable};

/// In-memory symbol table over a fixed set of classes and resources.
///
/// A host's table also carries the content of fragments attached to it; each
/// entry remembers the module that contributed it.
#[derive(Debug, Clone, Default)]
pub struct LocalSymbols {
	classes: Vec<(ModuleId, FxHashSet<Arc<str>>)>,
	resources: Vec<Locator>,
}

impl LocalSymbols {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds content contributed by `owner`.
	pub fn contribute<C, R>(&mut self, owner: ModuleId, classes: C, resources: R)
	where
		C: IntoIterator<Item = Arc<str>>,
		R: IntoIterator<Item = Arc<str>>,
	{
		self.classes.push((owner, classes.into_iter().collect()));
		self.resources.extend(
			resources
				.into_iter()
				.map(|path| Locator::new(owner, normalize(&path))),
		);
	}

	pub fn is_empty(&self) -> bool {
		self.resources.is_empty() && self.classes.iter().all(|(_, c)| c.is_empty())
	}
}

fn normalize(path: &str) -> &str {
	path.trim_start_matches('/')
}

impl SymbolTable for LocalSymbols {
	fn find_local_class(&self, name: &str) -> Result<Option<Symbol>> {
		Ok(self
			.classes
			.iter()
			.find(|(_, classes)| classes.contains(name))
			.map(|(owner, _)| Symbol::new(name, *owner)))
	}

	fn find_local_resource(&self, name: &str) -> Result<Option<Locator>> {
		let name = normalize(name);
		Ok(self.resources.iter().find(|l| l.path() == name).cloned())
	}

	fn find_local_resources(&self, name: &str) -> Result<LocatorIter<'_>> {
		let name = normalize(name).to_owned();
		Ok(Box::new(
			self.resources
				.iter()
				.filter(move |l| l.path() == name)
				.cloned()
				.map(Ok),
		))
	}
}
