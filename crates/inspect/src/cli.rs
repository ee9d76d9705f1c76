use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug)]
#[command(name = "kith-inspect")]
#[command(about = "Resolve a class or resource through a module's buddy policy")]
#[command(version)]
#[command(group(ArgGroup::new("lookup").required(true).args(["class", "resource", "resources"])))]
/// Command-line arguments.
pub struct Cli {
	/// World manifest describing modules, wiring and tiers
	#[arg(long, short = 'w', value_name = "PATH")]
	pub world: PathBuf,

	/// Module the lookup is issued from
	#[arg(long, short = 'm')]
	pub module: String,

	/// Class to resolve, e.g. `pkg.Name`
	#[arg(long)]
	pub class: Option<String>,

	/// Resource to resolve, e.g. `conf/app.toml`
	#[arg(long)]
	pub resource: Option<String>,

	/// Resource to enumerate across every reachable module
	#[arg(long)]
	pub resources: Option<String>,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,
}

/// The lookup requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
	Class(&'a str),
	Resource(&'a str),
	Resources(&'a str),
}

impl Cli {
	pub fn lookup(&self) -> Option<Lookup<'_>> {
		if let Some(name) = &self.class {
			return Some(Lookup::Class(name));
		}
		if let Some(name) = &self.resource {
			return Some(Lookup::Resource(name));
		}
		self.resources.as_deref().map(Lookup::Resources)
	}
}
