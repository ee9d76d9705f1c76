//! Policy chain orchestrator.
//!
//! # Role
//!
//! Drives a module's lookups through its ordered strategy chain, materializing
//! each strategy the first time its slot is reached, and throws the cached
//! strategies away whenever the wiring topology changes.
//!
//! # Invariants
//!
//! - Slots are visited in descriptor order on every call; a single-value
//!   lookup stops at the first hit.
//! - A slot is materialized at most once per snapshot generation; racing first
//!   uses are settled under that generation's lock with a re-check.
//! - Invalidation publishes a fresh raw snapshot; in-flight lookups keep the
//!   generation they loaded.
//! - The cycle-guard entry for a name is released when the lookup ends, on
//!   every path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use kith_wiring::{
	GraphQuery, ListenerId, Locator, ModuleId, Result, Symbol, TopologyEvent, TopologyEvents,
	TopologyListener,
};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::descriptor::{PolicyDescriptor, PolicyKind};
use crate::guard::{CycleGuard, InFlight};
use crate::resources::Resources;
use crate::snapshot::{PolicySnapshot, Slot};
use crate::strategy::{
	BuddyPolicy, DependentPolicy, GlobalPolicy, RegisteredPolicy, Strategy, SystemPolicy,
	SystemTier, TierDelegate, TierRegistry,
};

/// Buddy policy chain for one module.
pub struct PolicyHandler {
	module: ModuleId,
	descriptor: PolicyDescriptor,
	graph: Arc<dyn GraphQuery>,
	tiers: Arc<TierRegistry>,
	parent: Option<Arc<dyn TierDelegate>>,
	snapshot: ArcSwap<PolicySnapshot>,
	guard: CycleGuard,
	subscription: Mutex<Option<ListenerId>>,
	/// Slots whose unknown token has already been reported.
	reported: Mutex<FxHashSet<usize>>,
	materialized: AtomicU64,
}

impl PolicyHandler {
	pub fn new(
		module: ModuleId,
		descriptor: PolicyDescriptor,
		graph: Arc<dyn GraphQuery>,
		tiers: Arc<TierRegistry>,
	) -> Self {
		let snapshot = PolicySnapshot::raw(descriptor.shared_tokens(), 0);
		Self {
			module,
			descriptor,
			graph,
			tiers,
			parent: None,
			snapshot: ArcSwap::from_pointee(snapshot),
			guard: CycleGuard::new(),
			subscription: Mutex::new(None),
			reported: Mutex::new(FxHashSet::default()),
			materialized: AtomicU64::new(0),
		}
	}

	/// Sets the delegate the `parent` strategy forwards to.
	pub fn with_parent(mut self, parent: Arc<dyn TierDelegate>) -> Self {
		self.parent = Some(parent);
		self
	}

	pub fn module(&self) -> ModuleId {
		self.module
	}

	pub fn descriptor(&self) -> &PolicyDescriptor {
		&self.descriptor
	}

	/// Snapshot generation; bumped by every invalidation.
	pub fn generation(&self) -> u64 {
		self.snapshot.load().generation()
	}

	/// Strategy instances created over the handler's lifetime.
	pub fn materialized(&self) -> u64 {
		self.materialized.load(Ordering::Relaxed)
	}

	/// The strategy cached in slot `index` of the current generation, without
	/// materializing it.
	pub fn cached(&self, index: usize) -> Option<Arc<Strategy>> {
		self.snapshot.load().slot(index).and_then(Slot::strategy)
	}

	/// Finds a class through the chain. The first strategy with a hit wins.
	pub fn resolve_class(&self, name: &str) -> Result<Option<Symbol>> {
		let Some(_in_flight) = self.enter(name) else {
			return Ok(None);
		};
		let snapshot = self.snapshot.load_full();
		for index in 0..snapshot.len() {
			let Some(policy) = self.policy_at(&snapshot, index)? else {
				continue;
			};
			if let Some(symbol) = policy.resolve_class(name)? {
				tracing::trace!(module = %self.module, name, via = policy.label(), found = %symbol, "buddy class hit");
				return Ok(Some(symbol));
			}
		}
		Ok(None)
	}

	/// Finds a resource through the chain. The first strategy with a hit wins.
	pub fn resolve_resource(&self, name: &str) -> Result<Option<Locator>> {
		let Some(_in_flight) = self.enter(name) else {
			return Ok(None);
		};
		let snapshot = self.snapshot.load_full();
		for index in 0..snapshot.len() {
			let Some(policy) = self.policy_at(&snapshot, index)? else {
				continue;
			};
			if let Some(locator) = policy.resolve_resource(name)? {
				return Ok(Some(locator));
			}
		}
		Ok(None)
	}

	/// Gathers every resource named `name` from every strategy.
	///
	/// Best effort: a strategy that fails, or cannot be materialized,
	/// contributes nothing and the rest of the chain still runs. Each locator
	/// appears once, at the position it was first found.
	pub fn resolve_resources(&self, name: &str) -> Resources {
		let Some(_in_flight) = self.enter(name) else {
			return Resources::empty();
		};
		let snapshot = self.snapshot.load_full();
		let mut seen: FxHashSet<Locator> = FxHashSet::default();
		let mut found = Vec::new();
		for index in 0..snapshot.len() {
			let policy = match self.policy_at(&snapshot, index) {
				Ok(Some(policy)) => policy,
				Ok(None) => continue,
				Err(error) => {
					tracing::warn!(module = %self.module, slot = index, %error, "strategy unavailable for resource scan");
					continue;
				}
			};
			match policy.resolve_resources(name) {
				Ok(locators) => {
					for locator in locators {
						if seen.insert(locator.clone()) {
							found.push(locator);
						}
					}
				}
				Err(error) => {
					tracing::warn!(module = %self.module, name, via = policy.label(), %error, "dropping partial resource scan");
				}
			}
		}
		Resources::new(found)
	}

	/// Attaches the handler to `events` so rewiring invalidates its cache.
	/// Calling it while already attached does nothing.
	pub fn open(self: &Arc<Self>, events: &TopologyEvents) {
		let mut subscription = self.subscription.lock();
		if subscription.is_none() {
			let weak: Weak<Self> = Arc::downgrade(self);
			*subscription = Some(events.subscribe(weak));
		}
	}

	/// Detaches the handler from `events`. Returns false if it was not attached.
	pub fn close(&self, events: &TopologyEvents) -> bool {
		match self.subscription.lock().take() {
			Some(id) => events.unsubscribe(id),
			None => false,
		}
	}

	pub fn is_open(&self) -> bool {
		self.subscription.lock().is_some()
	}

	/// Publishes a fresh, unmaterialized snapshot one generation past the
	/// current one. Concurrent invalidations each land exactly once.
	pub fn invalidate(&self) {
		let previous = self.snapshot.rcu(|current| {
			PolicySnapshot::raw(self.descriptor.shared_tokens(), current.generation() + 1)
		});
		let generation = previous.generation() + 1;
		tracing::debug!(module = %self.module, generation, "buddy policies invalidated");
	}

	fn enter(&self, name: &str) -> Option<InFlight> {
		if name.is_empty() {
			return None;
		}
		let entry = self.guard.enter(name);
		if entry.is_none() {
			tracing::trace!(module = %self.module, name, "reentrant lookup refused");
		}
		entry
	}

	fn policy_at(&self, snapshot: &PolicySnapshot, index: usize) -> Result<Option<Arc<Strategy>>> {
		if let Some(slot) = snapshot.slot(index) {
			return Ok(slot.strategy());
		}
		let _lock = snapshot.lock();
		if let Some(slot) = snapshot.slot(index) {
			return Ok(slot.strategy());
		}
		let slot = self.materialize(snapshot, index)?;
		Ok(snapshot.publish(index, slot))
	}

	fn materialize(&self, snapshot: &PolicySnapshot, index: usize) -> Result<Slot> {
		let token = snapshot.token(index);
		let Some(kind) = PolicyKind::from_token(token) else {
			self.report_unknown(snapshot, index, token);
			return Ok(Slot::Disabled);
		};

		let strategy = match kind {
			PolicyKind::Dependent => {
				Strategy::Dependent(DependentPolicy::new(self.module, self.graph.clone())?)
			}
			PolicyKind::Registered => {
				Strategy::Registered(RegisteredPolicy::new(self.module, self.graph.clone())?)
			}
			PolicyKind::Global => Strategy::Global(GlobalPolicy::new(self.graph.clone())),
			PolicyKind::Boot => Strategy::System(self.tiers.policy(SystemTier::Boot)),
			PolicyKind::Platform => Strategy::System(self.tiers.policy(SystemTier::Platform)),
			PolicyKind::Application => {
				Strategy::System(self.tiers.policy(SystemTier::Application))
			}
			PolicyKind::Parent => match &self.parent {
				Some(parent) => Strategy::System(Arc::new(SystemPolicy::parent(parent.clone()))),
				None => {
					tracing::debug!(module = %self.module, "parent policy without a parent delegate");
					return Ok(Slot::Disabled);
				}
			},
		};

		self.materialized.fetch_add(1, Ordering::Relaxed);
		tracing::trace!(
			module = %self.module,
			generation = snapshot.generation(),
			slot = index,
			strategy = strategy.label(),
			"materialized buddy policy"
		);
		Ok(Slot::Ready(Arc::new(strategy)))
	}

	fn report_unknown(&self, snapshot: &PolicySnapshot, index: usize, token: &str) {
		if !self.reported.lock().insert(index) {
			return;
		}
		tracing::error!(
			module = %self.module,
			generation = snapshot.generation(),
			slot = index,
			token,
			"unknown buddy policy"
		);
		self.graph
			.report_error(self.module, &format!("unknown buddy policy: {token}"));
	}
}

impl TopologyListener for PolicyHandler {
	fn topology_changed(&self, event: &TopologyEvent) {
		if event.change.rewires() {
			tracing::trace!(module = %self.module, changed = %event.module, change = %event.change, "topology changed");
			self.invalidate();
		}
	}
}

impl std::fmt::Debug for PolicyHandler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PolicyHandler")
			.field("module", &self.module)
			.field("descriptor", &self.descriptor.to_string())
			.field("generation", &self.generation())
			.finish()
	}
}
