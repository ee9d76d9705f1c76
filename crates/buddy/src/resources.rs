use std::iter::FusedIterator;

use kith_wiring::Locator;

/// Aggregated result of a resources lookup.
///
/// A finite, single-pass sequence: once drained it stays empty. Call the
/// lookup again to enumerate afresh.
#[derive(Debug, Clone, Default)]
pub struct Resources {
	inner: std::vec::IntoIter<Locator>,
}

impl Resources {
	pub(crate) fn new(found: Vec<Locator>) -> Self {
		Self {
			inner: found.into_iter(),
		}
	}

	pub fn empty() -> Self {
		Self::default()
	}
}

impl Iterator for Resources {
	type Item = Locator;

	fn next(&mut self) -> Option<Locator> {
		self.inner.next()
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.inner.size_hint()
	}
}

impl ExactSizeIterator for Resources {}

impl FusedIterator for Resources {}
