//! Instrumented collaborators shared by the crate's tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use kith_wiring::{
	GraphQuery, Locator, LocatorIter, ModuleId, Provider, Result, Symbol, SymbolTable,
	WiringError, WiringGraph,
};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::strategy::{StaticTier, TierDelegate};

/// [`GraphQuery`] over a [`WiringGraph`] that counts calls and can break
/// individual modules' symbol tables.
pub(crate) struct CountingGraph {
	pub(crate) inner: Arc<WiringGraph>,
	pub(crate) dependents_calls: AtomicUsize,
	pub(crate) provider_calls: AtomicUsize,
	pub(crate) table_calls: AtomicUsize,
	failing: Mutex<FxHashSet<ModuleId>>,
	partial: Mutex<FxHashSet<ModuleId>>,
}

impl CountingGraph {
	pub(crate) fn new(inner: Arc<WiringGraph>) -> Self {
		Self {
			inner,
			dependents_calls: AtomicUsize::new(0),
			provider_calls: AtomicUsize::new(0),
			table_calls: AtomicUsize::new(0),
			failing: Mutex::new(FxHashSet::default()),
			partial: Mutex::new(FxHashSet::default()),
		}
	}

	/// Every lookup against `module`'s symbol table fails.
	pub(crate) fn fail_table(&self, module: ModuleId) {
		self.failing.lock().insert(module);
	}

	/// Resource scans of `module` yield their first match, then fail.
	pub(crate) fn break_scan(&self, module: ModuleId) {
		self.partial.lock().insert(module);
	}

	pub(crate) fn dependents_calls(&self) -> usize {
		self.dependents_calls.load(Ordering::SeqCst)
	}
}

impl GraphQuery for CountingGraph {
	fn is_resolved(&self, module: ModuleId) -> bool {
		self.inner.is_resolved(module)
	}

	fn symbolic_name(&self, module: ModuleId) -> Option<Arc<str>> {
		self.inner.symbolic_name(module)
	}

	fn immediate_dependents(&self, module: ModuleId) -> Result<Vec<ModuleId>> {
		self.dependents_calls.fetch_add(1, Ordering::SeqCst);
		self.inner.immediate_dependents(module)
	}

	fn find_capability_providers(&self, namespace: &str) -> Result<Vec<Provider>> {
		self.provider_calls.fetch_add(1, Ordering::SeqCst);
		self.inner.find_capability_providers(namespace)
	}

	fn host_of(&self, fragment: ModuleId) -> Option<ModuleId> {
		self.inner.host_of(fragment)
	}

	fn registered_buddies(&self, module: ModuleId) -> Vec<Arc<str>> {
		self.inner.registered_buddies(module)
	}

	fn symbol_table(&self, module: ModuleId) -> Option<Arc<dyn SymbolTable>> {
		self.table_calls.fetch_add(1, Ordering::SeqCst);
		if self.failing.lock().contains(&module) {
			return Some(Arc::new(FailingTable(module)));
		}
		let table = self.inner.symbol_table(module)?;
		if self.partial.lock().contains(&module) {
			return Some(Arc::new(BrokenScan { module, table }));
		}
		Some(table)
	}

	fn report_error(&self, module: ModuleId, message: &str) {
		self.inner.report_error(module, message);
	}
}

struct FailingTable(ModuleId);

impl FailingTable {
	fn error(&self) -> WiringError {
		WiringError::SymbolTable {
			module: self.0,
			reason: "storage unavailable".into(),
		}
	}
}

impl SymbolTable for FailingTable {
	fn find_local_class(&self, _name: &str) -> Result<Option<Symbol>> {
		Err(self.error())
	}

	fn find_local_resource(&self, _name: &str) -> Result<Option<Locator>> {
		Err(self.error())
	}

	fn find_local_resources(&self, _name: &str) -> Result<LocatorIter<'_>> {
		Err(self.error())
	}
}

struct BrokenScan {
	module: ModuleId,
	table: Arc<dyn SymbolTable>,
}

impl SymbolTable for BrokenScan {
	fn find_local_class(&self, name: &str) -> Result<Option<Symbol>> {
		self.table.find_local_class(name)
	}

	fn find_local_resource(&self, name: &str) -> Result<Option<Locator>> {
		self.table.find_local_resource(name)
	}

	fn find_local_resources(&self, name: &str) -> Result<LocatorIter<'_>> {
		let failure = WiringError::SymbolTable {
			module: self.module,
			reason: "scan interrupted".into(),
		};
		Ok(Box::new(
			self.table
				.find_local_resources(name)?
				.take(1)
				.chain(std::iter::once(Err(failure))),
		))
	}
}

/// Tier that records each lookup under its label before answering.
pub(crate) struct RecordingTier {
	label: &'static str,
	log: Arc<Mutex<Vec<&'static str>>>,
	inner: StaticTier,
}

impl RecordingTier {
	pub(crate) fn new(label: &'static str, log: Arc<Mutex<Vec<&'static str>>>, inner: StaticTier) -> Self {
		Self { label, log, inner }
	}
}

impl TierDelegate for RecordingTier {
	fn load_class(&self, name: &str) -> Result<Option<Symbol>> {
		self.log.lock().push(self.label);
		self.inner.load_class(name)
	}

	fn find_resource(&self, name: &str) -> Result<Option<Locator>> {
		self.log.lock().push(self.label);
		self.inner.find_resource(name)
	}

	fn find_resources(&self, name: &str) -> Result<Vec<Locator>> {
		self.log.lock().push(self.label);
		self.inner.find_resources(name)
	}
}

/// Delegate whose target is supplied after construction, for wiring two
/// handlers into each other.
#[derive(Default)]
pub(crate) struct LateDelegate {
	target: OnceLock<Arc<dyn TierDelegate>>,
	pub(crate) calls: AtomicUsize,
}

impl LateDelegate {
	pub(crate) fn bind(&self, target: Arc<dyn TierDelegate>) {
		let _ = self.target.set(target);
	}

	pub(crate) fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn target(&self) -> Result<&Arc<dyn TierDelegate>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.target
			.get()
			.ok_or_else(|| WiringError::Graph("late delegate unbound".into()))
	}
}

impl TierDelegate for LateDelegate {
	fn load_class(&self, name: &str) -> Result<Option<Symbol>> {
		self.target()?.load_class(name)
	}

	fn find_resource(&self, name: &str) -> Result<Option<Locator>> {
		self.target()?.find_resource(name)
	}

	fn find_resources(&self, name: &str) -> Result<Vec<Locator>> {
		self.target()?.find_resources(name)
	}
}
