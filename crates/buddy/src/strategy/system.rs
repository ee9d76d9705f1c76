//! Delegation to tiers outside the module graph.
//!
//! The boot, platform and application tiers are shared: a [`TierRegistry`]
//! memoizes one [`SystemPolicy`] per tier for its whole lifetime and is
//! passed to every orchestrator that needs it. The parent variant wraps the
//! single delegate an orchestrator was built with.
//!
//! Tier failures never escape: an error from a delegate is a miss.

use std::sync::{Arc, OnceLock};

use kith_wiring::{Locator, ModuleId, Result, Symbol};
use rustc_hash::FxHashSet;

use super::BuddyPolicy;

/// Fixed system tiers, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum SystemTier {
	Boot,
	Platform,
	Application,
}

impl SystemTier {
	const COUNT: usize = 3;

	fn index(self) -> usize {
		self as usize
	}

	/// Identity reserved for symbols served by this tier.
	///
	/// Tier ids sit at the top of the id space, above anything a graph hands out.
	pub const fn module_id(self) -> ModuleId {
		ModuleId::new(u32::MAX - self as u32)
	}
}

/// Lookup surface of an external tier or parent delegate.
pub trait TierDelegate: Send + Sync {
	fn load_class(&self, name: &str) -> Result<Option<Symbol>>;

	fn find_resource(&self, name: &str) -> Result<Option<Locator>>;

	fn find_resources(&self, name: &str) -> Result<Vec<Locator>>;
}

/// Tier with no content.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyTier;

impl TierDelegate for EmptyTier {
	fn load_class(&self, _name: &str) -> Result<Option<Symbol>> {
		Ok(None)
	}

	fn find_resource(&self, _name: &str) -> Result<Option<Locator>> {
		Ok(None)
	}

	fn find_resources(&self, _name: &str) -> Result<Vec<Locator>> {
		Ok(Vec::new())
	}
}

/// In-memory tier serving a fixed set of classes and resources.
#[derive(Debug, Clone)]
pub struct StaticTier {
	origin: ModuleId,
	classes: FxHashSet<Arc<str>>,
	resources: Vec<Arc<str>>,
}

impl StaticTier {
	pub fn new(origin: ModuleId) -> Self {
		Self {
			origin,
			classes: FxHashSet::default(),
			resources: Vec::new(),
		}
	}

	pub fn for_tier(tier: SystemTier) -> Self {
		Self::new(tier.module_id())
	}

	pub fn with_classes<I, S>(mut self, classes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<Arc<str>>,
	{
		self.classes.extend(classes.into_iter().map(Into::into));
		self
	}

	pub fn with_resources<I, S>(mut self, resources: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.resources.extend(
			resources
				.into_iter()
				.map(|r| Arc::from(r.as_ref().trim_start_matches('/'))),
		);
		self
	}

	fn matching<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Locator> + 'a {
		let name = name.trim_start_matches('/');
		self.resources
			.iter()
			.filter(move |r| &***r == name)
			.map(move |r| Locator::new(self.origin, r.clone()))
	}
}

impl TierDelegate for StaticTier {
	fn load_class(&self, name: &str) -> Result<Option<Symbol>> {
		Ok(self
			.classes
			.contains(name)
			.then(|| Symbol::new(name, self.origin)))
	}

	fn find_resource(&self, name: &str) -> Result<Option<Locator>> {
		Ok(self.matching(name).next())
	}

	fn find_resources(&self, name: &str) -> Result<Vec<Locator>> {
		Ok(self.matching(name).collect())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
	Tier(SystemTier),
	Parent,
}

/// Strategy that forwards to one external delegate.
pub struct SystemPolicy {
	origin: Origin,
	delegate: Arc<dyn TierDelegate>,
}

impl SystemPolicy {
	/// Wraps an explicit parent delegate.
	pub fn parent(delegate: Arc<dyn TierDelegate>) -> Self {
		Self {
			origin: Origin::Parent,
			delegate,
		}
	}

	fn tier(tier: SystemTier, delegate: Arc<dyn TierDelegate>) -> Self {
		Self {
			origin: Origin::Tier(tier),
			delegate,
		}
	}

	pub fn label(&self) -> &'static str {
		match self.origin {
			Origin::Tier(SystemTier::Boot) => "boot",
			Origin::Tier(SystemTier::Platform) => "platform",
			Origin::Tier(SystemTier::Application) => "application",
			Origin::Parent => "parent",
		}
	}

	fn miss<T>(&self, name: &str, result: Result<T>) -> Option<T> {
		result
			.inspect_err(|error| {
				tracing::debug!(tier = self.label(), name, %error, "tier lookup failed");
			})
			.ok()
	}
}

impl BuddyPolicy for SystemPolicy {
	fn resolve_class(&self, name: &str) -> Result<Option<Symbol>> {
		Ok(self.miss(name, self.delegate.load_class(name)).flatten())
	}

	fn resolve_resource(&self, name: &str) -> Result<Option<Locator>> {
		Ok(self.miss(name, self.delegate.find_resource(name)).flatten())
	}

	fn resolve_resources(&self, name: &str) -> Result<Vec<Locator>> {
		Ok(self
			.miss(name, self.delegate.find_resources(name))
			.unwrap_or_default())
	}
}

/// Process-wide table of system tiers.
///
/// Build one at startup and share it by reference with every orchestrator.
/// Tiers without a delegate behave as [`EmptyTier`].
#[derive(Default)]
pub struct TierRegistry {
	delegates: [Option<Arc<dyn TierDelegate>>; SystemTier::COUNT],
	instances: [OnceLock<Arc<SystemPolicy>>; SystemTier::COUNT],
}

impl TierRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_tier(mut self, tier: SystemTier, delegate: Arc<dyn TierDelegate>) -> Self {
		self.delegates[tier.index()] = Some(delegate);
		self
	}

	/// The memoized strategy for `tier`.
	pub fn policy(&self, tier: SystemTier) -> Arc<SystemPolicy> {
		self.instances[tier.index()]
			.get_or_init(|| {
				let delegate = self.delegates[tier.index()]
					.clone()
					.unwrap_or_else(|| Arc::new(EmptyTier) as Arc<dyn TierDelegate>);
				tracing::debug!(%tier, "materialized system tier");
				Arc::new(SystemPolicy::tier(tier, delegate))
			})
			.clone()
	}
}
