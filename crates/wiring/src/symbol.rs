//! Values that cross the symbol table seam.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::ModuleId;

/// Namespace used for names that carry no separator.
pub const DEFAULT_NAMESPACE: &str = ".";

/// A class-like symbol defined by a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
	name: Arc<str>,
	module: ModuleId,
}

impl Symbol {
	pub fn new(name: impl Into<Arc<str>>, module: ModuleId) -> Self {
		Self {
			name: name.into(),
			module,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Module whose symbol table defined this symbol.
	pub fn module(&self) -> ModuleId {
		self.module
	}
}

impl fmt::Display for Symbol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}@{}", self.name, self.module)
	}
}

/// Location of a resource inside a module.
///
/// Two locators are the same resource when both the owning module and the
/// path match; aggregated lookups de-duplicate on this identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator {
	module: ModuleId,
	path: Arc<str>,
}

impl Locator {
	pub fn new(module: ModuleId, path: impl Into<Arc<str>>) -> Self {
		Self {
			module,
			path: path.into(),
		}
	}

	pub fn module(&self) -> ModuleId {
		self.module
	}

	pub fn path(&self) -> &str {
		&self.path
	}
}

impl fmt::Display for Locator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "module://{}/{}", self.module, self.path.trim_start_matches('/'))
	}
}

/// Returns the namespace (package) of a dotted class name.
///
/// `"pkg.sub.Name"` lives in `"pkg.sub"`; a bare `"Name"` lives in
/// [`DEFAULT_NAMESPACE`].
pub fn class_namespace(name: &str) -> &str {
	match name.rfind('.') {
		Some(idx) if idx > 0 => &name[..idx],
		_ => DEFAULT_NAMESPACE,
	}
}

/// Returns the namespace of a slash separated resource path.
///
/// A single leading `/` is ignored and the remaining directory segments are
/// joined with `.`: `"/pkg/sub/data.txt"` lives in `"pkg.sub"`.
pub fn resource_namespace(name: &str) -> Cow<'_, str> {
	let begin = if name.len() > 1 && name.starts_with('/') {
		1
	} else {
		0
	};
	match name.rfind('/') {
		Some(end) if end > begin => Cow::Owned(name[begin..end].replace('/', ".")),
		_ => Cow::Borrowed(DEFAULT_NAMESPACE),
	}
}
