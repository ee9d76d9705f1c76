//! Kith inspector.
//!
//! Loads a world manifest, builds a loader for every module and runs one
//! lookup on behalf of the named module, printing where it was found.

mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use cli::{Cli, Lookup};
use kith_buddy::World;
use kith_wiring::WorldManifest;
use tracing::info;

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	for line in run(&cli)? {
		println!("{line}");
	}
	Ok(())
}

/// Runs the requested lookup and renders one line per result.
fn run(cli: &Cli) -> anyhow::Result<Vec<String>> {
	let manifest = WorldManifest::load(&cli.world)
		.with_context(|| format!("loading {}", cli.world.display()))?;
	let world = World::build(&manifest).context("installing world")?;
	info!(world = %cli.world.display(), modules = manifest.modules.len(), "world loaded");

	let Some(loader) = world.loader(&cli.module) else {
		bail!("no module named {:?} in {}", cli.module, cli.world.display());
	};
	let Some(lookup) = cli.lookup() else {
		bail!("no lookup requested");
	};

	let lines: Vec<String> = match lookup {
		Lookup::Class(name) => loader
			.find_class(name)?
			.map(|symbol| format!("{} {}", symbol.name(), world.display_name(symbol.module())))
			.into_iter()
			.collect(),
		Lookup::Resource(name) => loader
			.find_resource(name)?
			.map(|locator| format!("{} {}", locator.path(), world.display_name(locator.module())))
			.into_iter()
			.collect(),
		Lookup::Resources(name) => loader
			.find_resources(name)?
			.into_iter()
			.map(|locator| format!("{} {}", locator.path(), world.display_name(locator.module())))
			.collect(),
	};
	if lines.is_empty() {
		info!(module = %cli.module, ?lookup, "not found");
	}
	Ok(lines)
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("KITH_LOG").unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("kith_buddy=trace,debug")
		} else {
			EnvFilter::new("info")
		}
	});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
