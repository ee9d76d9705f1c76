//! Synchronous topology change notifications.
//!
//! Listeners are held weakly: dropping the last strong reference to a
//! listener detaches it on the next publication.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::{ListenerId, ModuleId};

/// Kind of change a module went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TopologyChange {
	Installed,
	Resolved,
	Unresolved,
	Updated,
	Uninstalled,
}

impl TopologyChange {
	/// Whether the change alters the wiring between modules.
	pub fn rewires(self) -> bool {
		matches!(self, Self::Resolved | Self::Unresolved)
	}
}

/// One topology notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyEvent {
	pub module: ModuleId,
	pub change: TopologyChange,
}

impl TopologyEvent {
	pub fn new(module: ModuleId, change: TopologyChange) -> Self {
		Self { module, change }
	}
}

/// Receiver of topology notifications.
///
/// Called on the publishing thread; implementations must not block.
pub trait TopologyListener: Send + Sync {
	fn topology_changed(&self, event: &TopologyEvent);
}

/// Event source for topology changes.
#[derive(Default)]
pub struct TopologyEvents {
	listeners: RwLock<Vec<(ListenerId, Weak<dyn TopologyListener>)>>,
	next_id: AtomicU64,
}

impl TopologyEvents {
	pub fn new() -> Self {
		Self::default()
	}

	/// Attaches a listener. The source keeps only a weak reference.
	pub fn subscribe(&self, listener: Weak<dyn TopologyListener>) -> ListenerId {
		let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.listeners.write().push((id, listener));
		id
	}

	/// Detaches a listener. Returns false if it was not attached.
	pub fn unsubscribe(&self, id: ListenerId) -> bool {
		let mut listeners = self.listeners.write();
		let before = listeners.len();
		listeners.retain(|(existing, _)| *existing != id);
		listeners.len() != before
	}

	/// Delivers `event` to every live listener and returns how many received it.
	pub fn publish(&self, event: TopologyEvent) -> usize {
		let live: Vec<Arc<dyn TopologyListener>> = {
			let listeners = self.listeners.read();
			listeners.iter().filter_map(|(_, l)| l.upgrade()).collect()
		};

		if live.len() != self.listeners.read().len() {
			self.listeners
				.write()
				.retain(|(_, l)| l.strong_count() > 0);
		}

		tracing::trace!(module = %event.module, change = %event.change, listeners = live.len(), "publishing topology event");
		for listener in &live {
			listener.topology_changed(&event);
		}
		live.len()
	}

	/// Number of attached listeners, live or not yet pruned.
	pub fn listener_count(&self) -> usize {
		self.listeners.read().len()
	}
}
