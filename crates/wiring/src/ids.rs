use std::fmt;

/// Opaque identity of an installed module.
///
/// Identities are handed out by the module system and never reused while the
/// owning graph is alive. Holding a `ModuleId` does not keep the module
/// installed; callers revalidate through [`crate::GraphQuery::is_resolved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
	pub const fn new(raw: u32) -> Self {
		Self(raw)
	}

	pub const fn as_u32(self) -> u32 {
		self.0
	}
}

impl fmt::Display for ModuleId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "m{}", self.0)
	}
}

/// Handle returned by [`crate::TopologyEvents::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
