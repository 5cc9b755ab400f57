//! The lifetime-aware memory-node provider (spec §4.6): narrows the
//! agnostic provider's whole-program memory set per lambda using
//! call-summary classification and points-to information.
//!
//! The reference implementation (`original_source/.../LifetimeAwareMemoryNodeProvider.cpp`)
//! leaves every one of its per-region/per-call queries `JLM_UNREACHABLE`d;
//! the policy below is this crate's resolution of those open cases (see
//! DESIGN.md).

use core::cell::RefCell;

use smallvec::SmallVec;

use crate::{
    ids::{NodeId, RegionId},
    ir::{Graph, InputOwner},
    ops::Operation,
    points_to::{MemoryNode, PointsToGraph},
    provisioning::MemoryNodeProvider,
    traversal,
    FxHashMap, FxHashSet,
};

/// Lifetime-aware provider: prunes local `alloca`s out of a lambda's
/// memory-state set when the lambda's call summary proves they cannot
/// escape to callers (spec §4.6).
///
/// Per-lambda results are memoized; a fresh provider must be built if the
/// graph or points-to graph changes (no cache-invalidation hooks are wired
/// to `Graph`'s rewrite API the way call summaries are, since provisioning
/// is normally run once, right before lowering, rather than interleaved
/// with further rewrites).
pub struct LifetimeAwareProvider<'p, P> {
    points_to: &'p P,
    cache: RefCell<FxHashMap<NodeId, Vec<MemoryNode>>>,
}

impl<'p, P: PointsToGraph> LifetimeAwareProvider<'p, P> {
    pub fn new(points_to: &'p P) -> Self {
        Self {
            points_to,
            cache: RefCell::new(FxHashMap::default()),
        }
    }

    fn agnostic_set(&self) -> Vec<MemoryNode> {
        self.points_to.memory_nodes().to_vec()
    }

    /// The `alloca` nodes lexically inside `lambda`'s subregion (not
    /// counting allocas inside a nested lambda, which get their own
    /// provisioning when that lambda is visited).
    fn local_allocas(&self, graph: &Graph, lambda: NodeId) -> FxHashSet<MemoryNode> {
        let subregion = lambda_subregion(graph, lambda);
        let mut allocas = FxHashSet::default();
        traversal::walk_topdown(graph, subregion, &mut |node| {
            if matches!(graph.node(node).operation(), Some(Operation::Alloca { .. })) {
                allocas.insert(MemoryNode::Alloca(node));
            }
        });
        allocas
    }

    /// Memory nodes reachable from one of `lambda`'s own formal parameters'
    /// points-to sets. A local alloca in this set aliases a pointer the
    /// lambda received from its caller, so it cannot be assumed private
    /// (spec §4.6, only-exported case).
    fn reachable_from_params(&self, graph: &Graph, lambda: NodeId) -> FxHashSet<MemoryNode> {
        let data = graph
            .node(lambda)
            .as_structural()
            .and_then(|k| k.as_lambda())
            .expect("lifetime-aware provider queried with a non-lambda node");
        let region = graph.region(data.subregion);
        let mut reachable = FxHashSet::default();
        for &arg in region.arguments().iter().skip(data.num_context_vars) {
            for &m in self.points_to.points_to(arg) {
                reachable.insert(m);
            }
        }
        reachable
    }

    /// Local allocas this lambda's body may drop from its memory-state set:
    /// neither reachable from a parameter nor observed to escape by the
    /// points-to analysis.
    fn prunable_locals(&self, graph: &Graph, lambda: NodeId) -> FxHashSet<MemoryNode> {
        let locals = self.local_allocas(graph, lambda);
        let reachable = self.reachable_from_params(graph, lambda);
        locals
            .into_iter()
            .filter(|n| !reachable.contains(n) && !self.points_to.escapes(*n))
            .collect()
    }

    fn compute(&self, graph: &Graph, lambda: NodeId) -> Vec<MemoryNode> {
        if let Some(cached) = self.cache.borrow().get(&lambda) {
            return cached.clone();
        }
        // Guard recursive (mutually-calling) direct-call chains: seed the
        // cache with the always-sound agnostic answer before recursing, so
        // a cycle back to `lambda` sees a safe, if coarse, value rather than
        // looping forever.
        self.cache.borrow_mut().insert(lambda, self.agnostic_set());

        let summary = graph.call_summary(lambda);
        let result = if summary.is_dead() {
            // No caller observes this lambda's memory-state requirements at
            // all; it contributes nothing to any live set (spec §7,
            // "Unimplemented cases" — `IsDead` is fully handled here, not
            // left unreachable as in the reference implementation).
            Vec::new()
        } else if summary.is_only_exported() {
            let prune = self.prunable_locals(graph, lambda);
            self.agnostic_set()
                .into_iter()
                .filter(|n| !prune.contains(n))
                .collect()
        } else if summary.has_only_direct_calls() {
            let output = graph.node(lambda).outputs()[0];
            let mut acc: FxHashSet<MemoryNode> = FxHashSet::default();
            let mut fell_back = false;
            for &user in graph.output(output).users() {
                if let InputOwner::Node(apply_node, _) = graph.input(user).owner {
                    match enclosing_lambda(graph, graph.node(apply_node).region()) {
                        Some(caller) => acc.extend(self.compute(graph, caller)),
                        None => {
                            // Called from the root region itself (no
                            // enclosing lambda) — conservatively keep
                            // everything live rather than guess.
                            fell_back = true;
                            break;
                        }
                    }
                }
            }
            if fell_back {
                self.agnostic_set()
            } else {
                let prune = self.prunable_locals(graph, lambda);
                acc.into_iter().filter(|n| !prune.contains(n)).collect()
            }
        } else {
            // Reachable indirectly (passed as a value, not just applied):
            // its call sites cannot be enumerated exhaustively, so fall back
            // to the agnostic policy (spec §4.6).
            self.agnostic_set()
        };

        self.cache.borrow_mut().insert(lambda, result.clone());
        result
    }
}

/// The subregion of `lambda`'s structural node.
fn lambda_subregion(graph: &Graph, lambda: NodeId) -> RegionId {
    graph
        .node(lambda)
        .as_structural()
        .and_then(|k| k.as_lambda())
        .expect("not a lambda node")
        .subregion
}

/// Walks up from `region` to the nearest enclosing lambda's node id, or
/// `None` if `region` is (nested directly in) the root region.
fn enclosing_lambda(graph: &Graph, mut region: RegionId) -> Option<NodeId> {
    loop {
        let owner = graph.region(region).parent()?;
        if graph.node(owner).as_structural().and_then(|k| k.as_lambda()).is_some() {
            return Some(owner);
        }
        region = graph.node(owner).region();
    }
}

impl<'p, P: PointsToGraph> MemoryNodeProvider for LifetimeAwareProvider<'p, P> {
    fn live_memory_nodes(&self, graph: &Graph, lambda: Option<NodeId>) -> Vec<MemoryNode> {
        match lambda {
            None => self.agnostic_set(),
            Some(lambda) => self.compute(graph, lambda),
        }
    }
}

/// Convenience query (spec §4.6, "Convenience queries for lambda... project
/// these onto the right subregion"): the set of memory nodes a `load`/`store`
/// inside `lambda` must thread, as a `SmallVec` sized for the common
/// small-set case.
pub fn live_memory_nodes_smallvec<P: PointsToGraph>(
    provider: &LifetimeAwareProvider<'_, P>,
    graph: &Graph,
    lambda: NodeId,
) -> SmallVec<[MemoryNode; 8]> {
    provider.live_memory_nodes(graph, Some(lambda)).into()
}
