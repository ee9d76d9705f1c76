//! Module wiring seams.
//!
//! This crate holds everything the buddy resolver consumes from the
//! surrounding module system:
//!
//! - [`GraphQuery`]: read-only view of the wiring graph (dependents,
//!   capability providers, fragment hosts, opt-in attributes).
//! - [`SymbolTable`]: per-module local lookup that never delegates.
//! - [`TopologyEvents`]: synchronous source of [`TopologyEvent`]s.
//!
//! It also ships [`WiringGraph`], an in-memory graph implementing those seams,
//! and [`WorldManifest`], a TOML loader that populates one.

pub mod error;
pub mod events;
pub mod graph;
pub mod ids;
pub mod manifest;
pub mod query;
pub mod symbol;
pub mod table;

pub use error::{ManifestError, Result, WiringError};
pub use events::{TopologyChange, TopologyEvent, TopologyEvents, TopologyListener};
pub use graph::{ModuleSpec, WireKind, WiringGraph};
pub use ids::{ListenerId, ModuleId};
pub use manifest::{ModuleManifest, TierManifest, TierManifests, WorldManifest};
pub use query::{GraphQuery, LocatorIter, Provider, SymbolTable};
pub use symbol::{DEFAULT_NAMESPACE, Locator, Symbol, class_namespace, resource_namespace};
pub use table::LocalSymbols;
