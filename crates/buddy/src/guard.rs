//! Per-thread reentrancy guard.
//!
//! A lookup records its name before walking the chain and releases it when
//! the returned [`InFlight`] drops. A reentrant lookup for the same name on
//! the same thread, through the same guard, is refused; other threads are
//! never affected.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::{FxHashMap, FxHashSet};

static NEXT_OWNER: AtomicU64 = AtomicU64::new(0);

thread_local! {
	static IN_FLIGHT: RefCell<FxHashMap<u64, FxHashSet<Box<str>>>> =
		RefCell::new(FxHashMap::default());
}

/// Guard scoped to one orchestrator.
#[derive(Debug)]
pub struct CycleGuard {
	owner: u64,
}

impl Default for CycleGuard {
	fn default() -> Self {
		Self::new()
	}
}

impl CycleGuard {
	pub fn new() -> Self {
		Self {
			owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
		}
	}

	/// Records `name` as in flight on this thread.
	///
	/// Returns `None` when `name` is already being resolved here, which
	/// breaks the cycle.
	pub fn enter(&self, name: &str) -> Option<InFlight> {
		let inserted = IN_FLIGHT.with(|cell| {
			cell.borrow_mut()
				.entry(self.owner)
				.or_default()
				.insert(Box::from(name))
		});
		inserted.then(|| InFlight {
			owner: self.owner,
			name: Box::from(name),
			_thread_bound: PhantomData,
		})
	}

	pub fn is_in_flight(&self, name: &str) -> bool {
		IN_FLIGHT.with(|cell| {
			cell.borrow()
				.get(&self.owner)
				.is_some_and(|names| names.contains(name))
		})
	}

	/// Number of names in flight for this guard on the current thread.
	pub fn depth(&self) -> usize {
		IN_FLIGHT.with(|cell| cell.borrow().get(&self.owner).map_or(0, FxHashSet::len))
	}
}

/// Entry held for the duration of one lookup. Dropping it releases the name,
/// whether the lookup returned, failed with `?`, or unwound.
#[derive(Debug)]
#[must_use = "the name is released as soon as the entry drops"]
pub struct InFlight {
	owner: u64,
	name: Box<str>,
	// Thread-local bookkeeping: the entry must be released on the thread that made it.
	_thread_bound: PhantomData<*const ()>,
}

impl Drop for InFlight {
	fn drop(&mut self) {
		let _ = IN_FLIGHT.try_with(|cell| {
			let mut map = cell.borrow_mut();
			if let Some(names) = map.get_mut(&self.owner) {
				names.remove(&*self.name);
				if names.is_empty() {
					map.remove(&self.owner);
				}
			}
		});
	}
}
