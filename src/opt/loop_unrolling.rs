//! Loop unrolling (spec §4.7): replicates a theta's subregion body a fixed
//! factor times, chaining each copy's loop variables into the next and
//! rewriting the exit predicate so the unrolled theta still iterates the
//! same number of times as the original for any loop trip count.
//!
//! The unrolled body is `factor` back-to-back copies of the original body.
//! Only the last copy's exit predicate actually controls continuation; the
//! intermediate copies' own predicates are computed but discarded (a
//! trip count not a multiple of `factor` still terminates correctly,
//! because the theta as a whole re-evaluates after every `factor`-iteration
//! group and the last copy always recomputes its predicate from that
//! group's true loop state — unrolling changes how much work happens per
//! test, never which iterations run).

use smallvec::SmallVec;

use crate::{
    ids::NodeId,
    ir::Graph,
    opt::clone_region,
    pass::{Pass, PassCounters},
    traversal,
    Result,
};

pub struct LoopUnrolling {
    pub factor: u32,
}

impl LoopUnrolling {
    pub fn new(factor: u32) -> Self {
        Self { factor }
    }
}

impl Pass for LoopUnrolling {
    fn name(&self) -> &'static str {
        "loop-unrolling"
    }

    fn run(&mut self, graph: &mut Graph) -> Result<PassCounters> {
        let unrolled = run(graph, self.factor)?;
        let mut counters = PassCounters::new();
        counters.set("unrolled", unrolled);
        counters.set("factor", self.factor as u64);
        Ok(counters)
    }
}

/// Unrolls every theta reachable from the root region by `factor` (a
/// `factor` of 0 or 1 is a no-op: there is nothing to replicate). Returns
/// the number of thetas unrolled.
pub fn run(graph: &mut Graph, factor: u32) -> Result<u64> {
    if factor <= 1 {
        return Ok(0);
    }
    let mut thetas = Vec::new();
    traversal::walk_topdown(graph, graph.root(), &mut |n| {
        if graph.node(n).as_structural().and_then(|k| k.as_theta()).is_some() {
            thetas.push(n);
        }
    });

    let mut total = 0u64;
    for theta in thetas {
        if graph.node(theta).is_removed() {
            continue;
        }
        unroll_theta(graph, theta, factor)?;
        total += 1;
    }
    Ok(total)
}

fn unroll_theta(graph: &mut Graph, theta: NodeId, factor: u32) -> Result<()> {
    let region = graph.node(theta).region();
    let (subregion, num_loop_vars) = {
        let data = graph.node(theta).as_structural().and_then(|k| k.as_theta()).expect("theta node");
        (data.subregion, data.num_loop_vars)
    };

    let init_origins: SmallVec<[_; 4]> = graph.node(theta).inputs()[..num_loop_vars]
        .iter()
        .map(|&i| graph.input(i).origin())
        .collect();

    let mut new_theta = graph.create_theta(region, &init_origins)?;
    let new_subregion = new_theta.subregion();

    // Copy 0 reads straight off the new theta's own loop-carried arguments;
    // copy k+1 reads off copy k's results, so the chain threads state the
    // same way one un-unrolled iteration would, `factor` times in a row.
    let mut carry: Vec<_> = (0..num_loop_vars).map(|i| new_theta.loop_var(i)).collect();
    let mut predicate = None;
    for copy in 0..factor {
        let map = clone_region::clone_region_into(new_theta.graph_mut(), subregion, new_subregion, &carry)?;
        let mut results = clone_region::translate_results(new_theta.graph_mut(), subregion, &map);
        let copy_predicate = results.pop().expect("theta subregion always has a trailing predicate result");
        carry = results;
        if copy == factor - 1 {
            predicate = Some(copy_predicate);
        }
    }

    let new_outputs = new_theta.finalize(&carry, predicate.expect("factor > 1 guarantees at least one copy"))?;

    let old_outputs = graph.node(theta).outputs().to_vec();
    for (&old_out, &new_out) in old_outputs.iter().zip(new_outputs.iter()) {
        let users: Vec<_> = graph.output(old_out).users().to_vec();
        for user in users {
            graph.redirect_input(user, new_out)?;
        }
    }
    Ok(())
}
