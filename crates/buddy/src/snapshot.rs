//! One published generation of a handler's strategy slots.
//!
//! A snapshot is immutable after publication except for slot materialization,
//! which fills each [`OnceLock`] at most once under the snapshot's own lock.
//! Invalidation publishes a new snapshot; it never touches an old one, so a
//! lookup that loaded the old snapshot finishes against it.

use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, MutexGuard};

use crate::strategy::Strategy;

/// Materialized state of one slot.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
	Ready(Arc<Strategy>),
	/// The token could not be turned into a strategy; the slot yields nothing.
	Disabled,
}

impl Slot {
	pub(crate) fn strategy(&self) -> Option<Arc<Strategy>> {
		match self {
			Self::Ready(strategy) => Some(strategy.clone()),
			Self::Disabled => None,
		}
	}
}

pub(crate) struct PolicySnapshot {
	generation: u64,
	tokens: Arc<[Arc<str>]>,
	slots: Box<[OnceLock<Slot>]>,
	materialize: Mutex<()>,
}

impl PolicySnapshot {
	/// A fresh generation with every slot still holding its raw token.
	pub(crate) fn raw(tokens: Arc<[Arc<str>]>, generation: u64) -> Self {
		let slots = tokens.iter().map(|_| OnceLock::new()).collect();
		Self {
			generation,
			tokens,
			slots,
			materialize: Mutex::new(()),
		}
	}

	pub(crate) fn generation(&self) -> u64 {
		self.generation
	}

	pub(crate) fn len(&self) -> usize {
		self.slots.len()
	}

	pub(crate) fn token(&self, index: usize) -> &str {
		&self.tokens[index]
	}

	/// The slot's state if it has been materialized in this generation.
	pub(crate) fn slot(&self, index: usize) -> Option<&Slot> {
		self.slots.get(index)?.get()
	}

	/// Locks slot materialization for this generation only.
	pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
		self.materialize.lock()
	}

	/// Publishes a materialized slot. Must be called with [`Self::lock`] held.
	pub(crate) fn publish(&self, index: usize, slot: Slot) -> Option<Arc<Strategy>> {
		let cell = &self.slots[index];
		let _ = cell.set(slot);
		cell.get().and_then(Slot::strategy)
	}
}
