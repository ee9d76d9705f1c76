//! Error types for the wiring seams.

use std::path::PathBuf;

use thiserror::Error;

use crate::ModuleId;

/// Failures raised by graph or symbol table collaborators.
///
/// The resolver forwards these to the caller of a lookup untouched.
#[derive(Debug, Clone, Error)]
pub enum WiringError {
	/// The module was uninstalled while a lookup was using it.
	#[error("module {0} is no longer installed")]
	ModuleGone(ModuleId),

	/// A module's symbol table failed to answer.
	#[error("symbol table of {module} failed: {reason}")]
	SymbolTable {
		/// Module whose table failed.
		module: ModuleId,
		/// Collaborator supplied detail.
		reason: String,
	},

	/// The graph query interface failed to answer.
	#[error("graph query failed: {0}")]
	Graph(String),
}

/// Result type for collaborator calls.
pub type Result<T> = std::result::Result<T, WiringError>;

/// Errors that can occur while loading a world manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
	/// Error reading a manifest file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Two modules declare the same symbolic name.
	#[error("duplicate module name: {0}")]
	DuplicateModule(String),

	/// A module references a name no module declares.
	#[error("{from} references unknown module {name}")]
	UnknownModule {
		/// Referencing module.
		from: String,
		/// Missing module name.
		name: String,
	},

	/// No module exports an imported namespace.
	#[error("{from} imports {namespace} but no module exports it")]
	UnresolvedImport {
		/// Importing module.
		from: String,
		/// Namespace without a provider.
		namespace: String,
	},

	/// A fragment names a host that is itself a fragment.
	#[error("fragment {fragment} cannot attach to fragment {host}")]
	NestedFragment {
		/// The fragment being installed.
		fragment: String,
		/// Host named by the fragment.
		host: String,
	},
}
