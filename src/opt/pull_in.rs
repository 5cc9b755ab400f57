//! Node pull-in (spec §4.7): a node in a structural node's own region that is
//! consumed exclusively from within one of that structural node's
//! subregions is duplicated into that subregion instead. This shrinks the
//! outer region and gives later passes (constant folding, common-node
//! elimination) a chance to act on the duplicate in the narrower context it
//! is actually used in — the classic motivating case is a constant or
//! pointer computation that's only read inside one gamma alternative.
//!
//! The origin values a pulled-in node reads remain valid in the subregion
//! without any extra plumbing: and ancestor region's outputs already
//! dominate every region nested under it (spec §3 invariant 1), so the
//! duplicate can reference them directly, the same way a context variable's
//! captured origin does.

use smallvec::SmallVec;

use crate::{
    ids::{NodeId, OutputId, RegionId},
    ir::{Graph, InputOwner},
    pass::{Pass, PassCounters},
    traversal,
    Result,
};

pub struct PullIn;

impl Pass for PullIn {
    fn name(&self) -> &'static str {
        "pull-in"
    }

    fn run(&mut self, graph: &mut Graph) -> Result<PassCounters> {
        let pulled = run(graph)?;
        let mut counters = PassCounters::new();
        counters.set("pulled", pulled);
        Ok(counters)
    }
}

pub fn run(graph: &mut Graph) -> Result<u64> {
    let mut structural_nodes = Vec::new();
    traversal::walk_topdown(graph, graph.root(), &mut |n| {
        if graph.node(n).as_structural().is_some() {
            structural_nodes.push(n);
        }
    });

    let mut total = 0u64;
    for structural in structural_nodes {
        if graph.node(structural).is_removed() {
            continue;
        }
        total += pull_into_subregions(graph, structural)?;
    }
    Ok(total)
}

fn pull_into_subregions(graph: &mut Graph, structural: NodeId) -> Result<u64> {
    let region = graph.node(structural).region();
    let subregions = graph
        .node(structural)
        .as_structural()
        .expect("structural node")
        .subregions()
        .to_vec();

    let siblings = graph.region(region).nodes().to_vec();
    let mut count = 0u64;
    for candidate in siblings {
        if candidate == structural || graph.node(candidate).is_removed() {
            continue;
        }
        let op = match graph.node(candidate).operation() {
            Some(op) if !op.is_state_carrying() => op.clone(),
            _ => continue,
        };
        let Some(target) = sole_consuming_subregion(graph, candidate, &subregions) else {
            continue;
        };

        let origins: SmallVec<[OutputId; 4]> = graph
            .node(candidate)
            .inputs()
            .iter()
            .map(|&i| graph.input(i).origin())
            .collect();
        let clone = graph.create_node(target, op, &origins)?;
        let clone_outputs = graph.node(clone).outputs().to_vec();
        let old_outputs = graph.node(candidate).outputs().to_vec();
        for (&old_out, &new_out) in old_outputs.iter().zip(clone_outputs.iter()) {
            let users: Vec<_> = graph.output(old_out).users().to_vec();
            for user in users {
                graph.redirect_input(user, new_out)?;
            }
        }
        count += 1;
    }
    Ok(count)
}

/// The single subregion every user of `node` lives under, or `None` if its
/// users are spread across more than one subregion, live outside all of
/// them (e.g. it feeds the structural node's own predicate/entry wiring),
/// or it has no users at all.
fn sole_consuming_subregion(graph: &Graph, node: NodeId, subregions: &[RegionId]) -> Option<RegionId> {
    let mut found: Option<RegionId> = None;
    for &output in graph.node(node).outputs() {
        for &user in graph.output(output).users() {
            let user_region = match graph.input(user).owner {
                InputOwner::Node(n, _) => graph.node(n).region(),
                InputOwner::RegionResult(r, _) => r,
            };
            let owning = subregions.iter().copied().find(|&s| graph.region_dominates(s, user_region))?;
            match found {
                None => found = Some(owning),
                Some(f) if f == owning => {}
                Some(_) => return None,
            }
        }
    }
    found
}
