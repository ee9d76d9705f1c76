#![allow(dead_code)]

use std::sync::Arc;
use std::thread;

use kith_wiring::{
	GraphQuery, Locator, ModuleId, ModuleSpec, Symbol, WireKind, WiringError, WiringGraph,
};
use parking_lot::Mutex;

use crate::descriptor::PolicyDescriptor;
use crate::handler::PolicyHandler;
use crate::loader::ModuleLoader;
use crate::strategy::{BuddyPolicy, StaticTier, Strategy, SystemTier, TierDelegate, TierRegistry};
use crate::test_fixtures::{CountingGraph, LateDelegate, RecordingTier};

fn add(graph: &WiringGraph, spec: ModuleSpec, requires: &[ModuleId]) -> ModuleId {
	let id = graph.install(spec);
	for provider in requires {
		graph.wire(id, *provider, WireKind::Module).unwrap();
	}
	graph.resolve(id).unwrap();
	id
}

fn handler(graph: Arc<dyn GraphQuery>, module: ModuleId, descriptor: &str) -> PolicyHandler {
	PolicyHandler::new(
		module,
		PolicyDescriptor::parse(descriptor),
		graph,
		Arc::new(TierRegistry::new()),
	)
}

/// Invariant: Strategies are consulted in descriptor order, each once, until one hits.
///
/// - Enforced in: `PolicyHandler::resolve_class`
/// - Failure symptom: A lower-priority buddy shadows a higher-priority one, or a
///   strategy is probed twice per lookup.
pub(crate) fn inv_chain_order_preserved() {
	let log = Arc::new(Mutex::new(Vec::new()));
	let tiers = TierRegistry::new()
		.with_tier(
			SystemTier::Boot,
			Arc::new(RecordingTier::new("boot", log.clone(), StaticTier::for_tier(SystemTier::Boot))),
		)
		.with_tier(
			SystemTier::Platform,
			Arc::new(RecordingTier::new(
				"platform",
				log.clone(),
				StaticTier::for_tier(SystemTier::Platform),
			)),
		)
		.with_tier(
			SystemTier::Application,
			Arc::new(RecordingTier::new(
				"application",
				log.clone(),
				StaticTier::for_tier(SystemTier::Application).with_classes(["pkg.Name"]),
			)),
		);

	let graph = Arc::new(WiringGraph::new());
	let m = add(&graph, ModuleSpec::new("m"), &[]);
	let h = PolicyHandler::new(
		m,
		PolicyDescriptor::parse("boot, platform, application"),
		graph,
		Arc::new(tiers),
	);

	assert_eq!(
		h.resolve_class("pkg.Name").unwrap(),
		Some(Symbol::new("pkg.Name", SystemTier::Application.module_id()))
	);
	assert_eq!(*log.lock(), vec!["boot", "platform", "application"]);

	log.lock().clear();
	assert_eq!(h.resolve_class("pkg.Other").unwrap(), None);
	assert_eq!(*log.lock(), vec!["boot", "platform", "application"]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_chain_order_preserved() {
	inv_chain_order_preserved()
}

/// Invariant: Mutual delegation between two modules terminates with no result.
///
/// - Enforced in: `CycleGuard::enter`, `PolicyHandler::resolve_class`
/// - Failure symptom: Stack overflow when two modules name each other as parent.
pub(crate) fn inv_cycle_terminates() {
	let graph = Arc::new(WiringGraph::new());
	let m1 = add(&graph, ModuleSpec::new("m1"), &[]);
	let m2 = add(&graph, ModuleSpec::new("m2"), &[]);

	let to_m2 = Arc::new(LateDelegate::default());
	let to_m1 = Arc::new(LateDelegate::default());
	let tiers = Arc::new(TierRegistry::new());

	let h1 = Arc::new(
		PolicyHandler::new(m1, PolicyDescriptor::parse("parent"), graph.clone(), tiers.clone())
			.with_parent(to_m2.clone()),
	);
	let h2 = Arc::new(
		PolicyHandler::new(m2, PolicyDescriptor::parse("parent"), graph.clone(), tiers)
			.with_parent(to_m1.clone()),
	);
	let l1 = Arc::new(ModuleLoader::new(m1, graph.clone()).with_policy(h1.clone()));
	let l2 = Arc::new(ModuleLoader::new(m2, graph).with_policy(h2));
	to_m2.bind(l2);
	to_m1.bind(l1.clone());

	assert_eq!(l1.find_class("pkg.Loop").unwrap(), None);
	assert_eq!(to_m2.calls(), 1);
	assert_eq!(to_m1.calls(), 1);
	assert!(l1.find_resources("pkg/loop.txt").unwrap().is_empty());
}

#[cfg_attr(test, test)]
pub(crate) fn test_cycle_terminates() {
	inv_cycle_terminates()
}

/// Invariant: The dependent frontier grows one hop at a time, only on a miss.
///
/// - Enforced in: `DependentPolicy::expand_through`
/// - Failure symptom: Construction walks the whole transitive closure, or a
///   symbol two hops away is never found.
pub(crate) fn inv_frontier_grows_lazily() {
	let graph = Arc::new(WiringGraph::new());
	let m = add(&graph, ModuleSpec::new("m"), &[]);
	let d1 = add(&graph, ModuleSpec::new("d1"), &[m]);
	let d2 = add(&graph, ModuleSpec::new("d2"), &[m]);
	let d3 = add(&graph, ModuleSpec::new("d3").class("pkg.Deep"), &[d1]);
	let _d4 = add(&graph, ModuleSpec::new("d4"), &[d3]);

	let h = handler(graph, m, "dependent");
	assert_eq!(
		h.resolve_class("pkg.Deep").unwrap(),
		Some(Symbol::new("pkg.Deep", d3))
	);

	let strategy = h.cached(0).unwrap();
	let dependent = strategy.as_dependent().unwrap();
	assert_eq!(dependent.frontier(), vec![d1, d2, d3]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_frontier_grows_lazily() {
	inv_frontier_grows_lazily()
}

/// Invariant: The registered filter is computed once per materialization.
///
/// - Enforced in: `RegisteredPolicy::new`
/// - Failure symptom: A dependent wired after first use is searched without
///   the handler being rebuilt.
pub(crate) fn inv_registered_filter_fixed() {
	let graph = Arc::new(WiringGraph::new());
	let m = add(&graph, ModuleSpec::new("m"), &[]);
	let early = add(
		&graph,
		ModuleSpec::new("early").register_buddy("m").class("pkg.Early"),
		&[m],
	);

	let h = handler(graph.clone(), m, "registered");
	assert_eq!(
		h.resolve_class("pkg.Early").unwrap(),
		Some(Symbol::new("pkg.Early", early))
	);

	let _late = add(
		&graph,
		ModuleSpec::new("late").register_buddy("m").class("pkg.Late"),
		&[m],
	);
	assert_eq!(h.resolve_class("pkg.Late").unwrap(), None);
	assert_eq!(h.cached(0).unwrap().as_registered().unwrap().candidates(), &[early]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_registered_filter_fixed() {
	inv_registered_filter_fixed()
}

/// Invariant: A rewiring event makes the next lookup rebuild cached strategies.
///
/// - Enforced in: `PolicyHandler::topology_changed`, `PolicyHandler::invalidate`
/// - Failure symptom: Newly resolved dependents stay invisible until restart.
pub(crate) fn inv_topology_change_rematerializes() {
	let wiring = Arc::new(WiringGraph::new());
	let m = add(&wiring, ModuleSpec::new("m"), &[]);
	let _d = add(&wiring, ModuleSpec::new("d").class("pkg.Name"), &[m]);
	let graph = Arc::new(CountingGraph::new(wiring.clone()));

	let h = Arc::new(handler(graph.clone(), m, "dependent"));
	h.open(wiring.events());

	h.resolve_class("pkg.Name").unwrap();
	h.resolve_class("pkg.Name").unwrap();
	assert_eq!(graph.dependents_calls(), 1);
	assert_eq!(h.generation(), 0);

	let late = add(&wiring, ModuleSpec::new("late").class("pkg.Late"), &[m]);
	assert!(h.generation() > 0);
	assert!(h.cached(0).is_none());

	assert_eq!(
		h.resolve_class("pkg.Late").unwrap(),
		Some(Symbol::new("pkg.Late", late))
	);
	// Rebuild seeds the frontier again, then expands `d` on its miss.
	assert_eq!(graph.dependents_calls(), 3);
	assert_eq!(h.materialized(), 2);
	h.close(wiring.events());
}

#[cfg_attr(test, test)]
pub(crate) fn test_topology_change_rematerializes() {
	inv_topology_change_rematerializes()
}

/// Invariant: Resource aggregation yields each locator once.
///
/// - Enforced in: `PolicyHandler::resolve_resources`
/// - Failure symptom: The same file is returned once per strategy that reaches it.
pub(crate) fn inv_resources_deduplicated() {
	let graph = Arc::new(WiringGraph::new());
	let m = add(&graph, ModuleSpec::new("m"), &[]);
	let d = add(
		&graph,
		ModuleSpec::new("d").export("conf").resource("conf/app.toml"),
		&[m],
	);
	let other = add(
		&graph,
		ModuleSpec::new("other").export("conf").resource("conf/app.toml"),
		&[],
	);

	let h = handler(graph, m, "dependent, global");
	let found: Vec<Locator> = h.resolve_resources("conf/app.toml").collect();
	assert_eq!(
		found,
		vec![
			Locator::new(d, "conf/app.toml"),
			Locator::new(other, "conf/app.toml")
		]
	);
}

#[cfg_attr(test, test)]
pub(crate) fn test_resources_deduplicated() {
	inv_resources_deduplicated()
}

/// Invariant: A dependent strategy with no dependents contributes nothing and
/// the chain falls through to the next strategy.
///
/// - Enforced in: `DependentPolicy::new`, `PolicyHandler::resolve_class`
/// - Failure symptom: An isolated module cannot reach a global provider.
pub(crate) fn inv_isolated_module_reaches_global() {
	let graph = Arc::new(WiringGraph::new());
	let m = add(&graph, ModuleSpec::new("m"), &[]);
	let g = add(&graph, ModuleSpec::new("g").export("pkg").class("pkg.Name"), &[]);

	let h = handler(graph, m, "dependent, global");
	assert_eq!(
		h.resolve_class("pkg.Name").unwrap(),
		Some(Symbol::new("pkg.Name", g))
	);

	let dependent = h.cached(0).unwrap();
	assert!(dependent.as_dependent().unwrap().is_inert());
	assert_eq!(dependent.as_dependent().unwrap().frontier_len(), 0);
	assert_eq!(h.cached(1).unwrap().label(), "global");
}

#[cfg_attr(test, test)]
pub(crate) fn test_isolated_module_reaches_global() {
	inv_isolated_module_reaches_global()
}

/// Invariant: Collaborator failures reach the caller and release the guard.
///
/// - Enforced in: `InFlight::drop`
/// - Failure symptom: After one failed lookup, every later lookup for the same
///   name on that thread silently returns nothing.
pub(crate) fn inv_guard_released_on_error() {
	let wiring = Arc::new(WiringGraph::new());
	let m = add(&wiring, ModuleSpec::new("m"), &[]);
	let d = add(&wiring, ModuleSpec::new("d").class("pkg.Name"), &[m]);
	let graph = Arc::new(CountingGraph::new(wiring));
	graph.fail_table(d);

	let h = handler(graph, m, "dependent");
	let error = h.resolve_class("pkg.Name").unwrap_err();
	assert!(matches!(error, WiringError::SymbolTable { module, .. } if module == d));

	let again = h.resolve_class("pkg.Name").unwrap_err();
	assert!(matches!(again, WiringError::SymbolTable { .. }));
}

#[cfg_attr(test, test)]
pub(crate) fn test_guard_released_on_error() {
	inv_guard_released_on_error()
}

/// Invariant: A failed resource scan drops only that strategy's results.
///
/// - Enforced in: `PolicyHandler::resolve_resources`
/// - Failure symptom: One broken module hides every other module's resources.
pub(crate) fn inv_partial_resource_failure_isolated() {
	let wiring = Arc::new(WiringGraph::new());
	let m = add(&wiring, ModuleSpec::new("m"), &[]);
	let d = add(&wiring, ModuleSpec::new("d").resource("r/a.txt"), &[m]);
	let g = add(&wiring, ModuleSpec::new("g").export("r").resource("r/a.txt"), &[]);
	let graph = Arc::new(CountingGraph::new(wiring));
	graph.break_scan(d);

	let h = handler(graph, m, "dependent, global");
	let found: Vec<Locator> = h.resolve_resources("r/a.txt").collect();
	assert_eq!(found, vec![Locator::new(g, "r/a.txt")]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_partial_resource_failure_isolated() {
	inv_partial_resource_failure_isolated()
}

/// Invariant: Concurrent lookups agree and share one materialization per slot.
///
/// - Enforced in: `PolicyHandler::policy_at`
/// - Failure symptom: Racing threads each build their own strategy, or one
///   observes a half-built slot.
pub(crate) fn inv_concurrent_lookups_agree() {
	let graph = Arc::new(WiringGraph::new());
	let m = add(&graph, ModuleSpec::new("m"), &[]);
	let d = add(&graph, ModuleSpec::new("d"), &[m]);
	let deep = add(&graph, ModuleSpec::new("deep").class("pkg.Name"), &[d]);

	let h = Arc::new(handler(graph, m, "dependent, registered, global"));
	let results: Vec<Option<Symbol>> = thread::scope(|scope| {
		let workers: Vec<_> = (0..8)
			.map(|_| {
				let h = &h;
				scope.spawn(move || h.resolve_class("pkg.Name").unwrap())
			})
			.collect();
		workers.into_iter().map(|w| w.join().unwrap()).collect()
	});

	assert!(results.iter().all(|r| *r == Some(Symbol::new("pkg.Name", deep))));
	assert_eq!(h.materialized(), 1);
	assert_eq!(h.cached(0).unwrap().as_dependent().unwrap().frontier(), vec![d, deep]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_concurrent_lookups_agree() {
	inv_concurrent_lookups_agree()
}

/// Invariant: Invalidation never disturbs a snapshot already loaded by a reader.
///
/// - Enforced in: `PolicyHandler::invalidate`
/// - Failure symptom: A lookup racing a topology change sees a mix of old and
///   new slots.
pub(crate) fn inv_invalidation_keeps_old_generation() {
	let graph = Arc::new(WiringGraph::new());
	let m = add(&graph, ModuleSpec::new("m"), &[]);
	let g = add(&graph, ModuleSpec::new("g").export("pkg").class("pkg.Name"), &[]);

	let h = handler(graph, m, "global");
	h.resolve_class("pkg.Name").unwrap();
	let before = h.cached(0).unwrap();

	h.invalidate();
	assert_eq!(h.generation(), 1);
	assert!(h.cached(0).is_none());
	assert_eq!(
		before.resolve_class("pkg.Name").unwrap(),
		Some(Symbol::new("pkg.Name", g))
	);

	h.resolve_class("pkg.Name").unwrap();
	assert!(!Arc::ptr_eq(&before, &h.cached(0).unwrap()));
}

#[cfg_attr(test, test)]
pub(crate) fn test_invalidation_keeps_old_generation() {
	inv_invalidation_keeps_old_generation()
}

/// Invariant: System tiers are shared across handlers through the registry.
///
/// - Enforced in: `TierRegistry::policy`
/// - Failure symptom: Each module builds its own copy of the boot tier.
pub(crate) fn inv_tiers_shared_across_handlers() {
	let graph = Arc::new(WiringGraph::new());
	let a = add(&graph, ModuleSpec::new("a"), &[]);
	let b = add(&graph, ModuleSpec::new("b"), &[]);
	let tiers = Arc::new(TierRegistry::new().with_tier(
		SystemTier::Boot,
		Arc::new(StaticTier::for_tier(SystemTier::Boot).with_classes(["core.Object"]))
			as Arc<dyn TierDelegate>,
	));

	let ha = PolicyHandler::new(a, PolicyDescriptor::parse("boot"), graph.clone(), tiers.clone());
	let hb = PolicyHandler::new(b, PolicyDescriptor::parse("boot"), graph, tiers);
	assert!(ha.resolve_class("core.Object").unwrap().is_some());
	assert!(hb.resolve_class("core.Object").unwrap().is_some());

	let (Some(sa), Some(sb)) = (ha.cached(0), hb.cached(0)) else {
		panic!("boot slots materialized");
	};
	match (&*sa, &*sb) {
		(Strategy::System(pa), Strategy::System(pb)) => {
			assert!(Arc::ptr_eq(pa, pb));
		}
		other => panic!("unexpected strategies {other:?}"),
	}
}

#[cfg_attr(test, test)]
pub(crate) fn test_tiers_shared_across_handlers() {
	inv_tiers_shared_across_handlers()
}
