//! Theta-gamma inversion (spec §4.7): when a loop's entire body is a single
//! two-way branch on a predicate that does not depend on the loop's own
//! carried state, the branch can be hoisted above the loop instead of
//! re-tested on every iteration — turning `loop { if (p) A else B }` into
//! `if (p) { loop A } else { loop B }`, two simpler loops each with a single
//! straight-line body.
//!
//! This only fires on the narrow, easy-to-verify shape the spec names: a
//! theta whose subregion contains nothing but one gamma, whose entry
//! variables are exactly the theta's own loop-carried variables (in order)
//! and whose `num_loop_vars + 1` outputs are exactly the subregion's results
//! (the new loop-carried values plus the new exit predicate) — and whose
//! predicate is defined strictly outside the loop body, so it reads the same
//! value on every iteration by construction, not merely by happening not to
//! change. Anything else is left alone rather than risk an unsound rewrite
//! (spec §7: passes either fire cleanly or leave the graph unchanged).

use crate::{
    ids::{NodeId, OutputId, RegionId},
    ir::{Graph, OutputOwner},
    opt::clone_region,
    pass::{Pass, PassCounters},
    structural::StructuralKind,
    traversal,
    Result,
};

pub struct ThetaGammaInversion;

impl Pass for ThetaGammaInversion {
    fn name(&self) -> &'static str {
        "theta-gamma-inversion"
    }

    fn run(&mut self, graph: &mut Graph) -> Result<PassCounters> {
        let inverted = run(graph)?;
        let mut counters = PassCounters::new();
        counters.set("inverted", inverted);
        Ok(counters)
    }
}

pub fn run(graph: &mut Graph) -> Result<u64> {
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
        if invert_if_matches(graph, theta)? {
            total += 1;
        }
    }
    Ok(total)
}

fn output_region(graph: &Graph, output: OutputId) -> RegionId {
    match graph.output(output).owner {
        OutputOwner::Node(n, _) => graph.node(n).region(),
        OutputOwner::RegionArgument(r, _) => r,
    }
}

/// Checks the exact shape this pass recognizes and, if the theta matches,
/// performs the rewrite and returns `true`. Pure inspection otherwise.
fn invert_if_matches(graph: &mut Graph, theta: NodeId) -> Result<bool> {
    let outer_region = graph.node(theta).region();
    let (body, num_loop_vars) = {
        let data = graph.node(theta).as_structural().and_then(|k| k.as_theta()).expect("theta node");
        (data.subregion, data.num_loop_vars)
    };

    let body_nodes = graph.region(body).nodes().to_vec();
    let gamma = match body_nodes.as_slice() {
        [gamma] => *gamma,
        _ => return Ok(false),
    };
    let gamma_data = match graph.node(gamma).as_structural() {
        Some(StructuralKind::Gamma(d)) => d,
        _ => return Ok(false),
    };
    if gamma_data.subregions.len() != 2 || gamma_data.num_entry_vars != num_loop_vars {
        return Ok(false);
    }
    let (old_sub0, old_sub1) = (gamma_data.subregions[0], gamma_data.subregions[1]);

    let body_args = graph.region(body).arguments().to_vec();
    let entry_origins: Vec<OutputId> = graph.node(gamma).inputs()[1..1 + num_loop_vars]
        .iter()
        .map(|&i| graph.input(i).origin())
        .collect();
    if entry_origins != body_args {
        // Gamma's entries aren't literally the loop's own carried
        // variables passed straight through — some other computation feeds
        // it, which this narrow shape doesn't attempt to look through.
        return Ok(false);
    }

    let gamma_outputs = graph.node(gamma).outputs().to_vec();
    if gamma_outputs.len() != num_loop_vars + 1 {
        return Ok(false);
    }
    let body_results = graph.region(body).results().to_vec();
    if body_results.len() != num_loop_vars + 1 {
        return Ok(false);
    }
    for (&result_input, &gamma_out) in body_results.iter().zip(gamma_outputs.iter()) {
        if graph.input(result_input).origin() != gamma_out {
            // The body does something with the gamma's outputs beyond
            // returning them verbatim (or returns something else instead).
            return Ok(false);
        }
    }

    let predicate_input = graph.node(gamma).inputs()[0];
    let predicate_origin = graph.input(predicate_input).origin();
    if output_region(graph, predicate_origin) == body {
        // Recomputed inside the loop body: not provably loop-invariant by
        // this pass's (deliberately conservative) test.
        return Ok(false);
    }

    invert(graph, theta, outer_region, body, old_sub0, old_sub1, num_loop_vars, predicate_origin)?;
    Ok(true)
}

#[allow(clippy::too_many_arguments)]
fn invert(
    graph: &mut Graph,
    theta: NodeId,
    outer_region: RegionId,
    _body: RegionId,
    old_sub0: RegionId,
    old_sub1: RegionId,
    num_loop_vars: usize,
    predicate_origin: OutputId,
) -> Result<()> {
    let init_origins: Vec<OutputId> = graph.node(theta).inputs()[..num_loop_vars]
        .iter()
        .map(|&i| graph.input(i).origin())
        .collect();

    let mut gamma = graph.create_gamma(outer_region, predicate_origin, 2, &init_origins)?;

    let outputs_a = build_inner_loop(&mut gamma, 0, old_sub0, num_loop_vars)?;
    let outputs_b = build_inner_loop(&mut gamma, 1, old_sub1, num_loop_vars)?;

    let gamma_outputs = gamma.finalize(&[outputs_a, outputs_b])?;

    let old_outputs = graph.node(theta).outputs().to_vec();
    for (&old_out, &new_out) in old_outputs.iter().zip(gamma_outputs.iter()) {
        let users: Vec<_> = graph.output(old_out).users().to_vec();
        for user in users {
            graph.redirect_input(user, new_out)?;
        }
    }
    Ok(())
}

/// Builds the single-branch replacement loop for one of the original
/// gamma's two alternatives, living inside the new outer gamma's matching
/// subregion, and returns that subregion's results (the new loop's final
/// loop-carried values).
fn build_inner_loop(
    gamma: &mut crate::structural::GammaBuilder<'_>,
    alternative: usize,
    old_alt: RegionId,
    num_loop_vars: usize,
) -> Result<Vec<OutputId>> {
    let new_subregion = gamma.subregion(alternative);
    let entry: Vec<OutputId> = (0..num_loop_vars).map(|i| gamma.entry_var(alternative, i)).collect();
    let mut inner = gamma.graph_mut().create_theta(new_subregion, &entry)?;
    let inner_subregion = inner.subregion();
    let arg_subst: Vec<OutputId> = (0..num_loop_vars).map(|i| inner.loop_var(i)).collect();
    let map = clone_region::clone_region_into(inner.graph_mut(), old_alt, inner_subregion, &arg_subst)?;
    let mut results = clone_region::translate_results(inner.graph_mut(), old_alt, &map);
    let predicate = results.pop().expect("loop body always has a trailing predicate result");
    let outputs = inner.finalize(&results, predicate)?;
    Ok(outputs.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        opt::dead_node_elimination,
        ops::{BinOpKind, Operation},
    };

    /// `p` is computed once, before the loop; the whole body is `if (p) {
    /// i += 2 } else { i += 1 }`, looping forever (exit predicate constant
    /// `continue` in both arms, for a minimal but shape-complete example).
    #[test]
    fn inverts_loop_invariant_branch() {
        let mut g = Graph::new();
        let root = g.root();
        let i0 = g.create_node(root, Operation::BitConstant { value: 0, width: 32 }, &[]).unwrap();
        let i0_out = g.node(i0).outputs()[0];
        let p = g
            .create_node(root, Operation::ControlConstant { alt: 0, num_alternatives: 2 }, &[])
            .unwrap();
        let p_out = g.node(p).outputs()[0];

        let mut theta = g.create_theta(root, &[i0_out]).unwrap();
        let i_arg = theta.loop_var(0);
        let body = theta.subregion();

        let mut gamma = theta.graph_mut().create_gamma(body, p_out, 2, &[i_arg]).unwrap();
        let sub0 = gamma.subregion(0);
        let sub1 = gamma.subregion(1);
        let e0 = gamma.entry_var(0, 0);
        let e1 = gamma.entry_var(1, 0);

        let two = gamma.graph_mut().create_node(sub0, Operation::BitConstant { value: 2, width: 32 }, &[]).unwrap();
        let two_out = gamma.graph_mut().node(two).outputs()[0];
        let add2 = gamma.graph_mut().create_node(sub0, Operation::Binary(BinOpKind::Add), &[e0, two_out]).unwrap();
        let add2_out = gamma.graph_mut().node(add2).outputs()[0];
        let cont0 = gamma
            .graph_mut()
            .create_node(sub0, Operation::ControlConstant { alt: 0, num_alternatives: 2 }, &[])
            .unwrap();
        let cont0_out = gamma.graph_mut().node(cont0).outputs()[0];

        let one = gamma.graph_mut().create_node(sub1, Operation::BitConstant { value: 1, width: 32 }, &[]).unwrap();
        let one_out = gamma.graph_mut().node(one).outputs()[0];
        let add1 = gamma.graph_mut().create_node(sub1, Operation::Binary(BinOpKind::Add), &[e1, one_out]).unwrap();
        let add1_out = gamma.graph_mut().node(add1).outputs()[0];
        let cont1 = gamma
            .graph_mut()
            .create_node(sub1, Operation::ControlConstant { alt: 0, num_alternatives: 2 }, &[])
            .unwrap();
        let cont1_out = gamma.graph_mut().node(cont1).outputs()[0];

        let gamma_outputs = gamma
            .finalize(&[vec![add2_out, cont0_out], vec![add1_out, cont1_out]])
            .unwrap();
        let theta_node = theta.node();
        let outputs = theta.finalize(&[gamma_outputs[0]], gamma_outputs[1]).unwrap();
        g.add_export("i", outputs[0]).unwrap();

        let inverted = run(&mut g).unwrap();
        assert_eq!(inverted, 1);

        dead_node_elimination::run(&mut g).unwrap();
        assert!(g.node(theta_node).is_removed());

        // The export's new origin is an outer gamma's output, not the old
        // theta's.
        let export_origin = g.input(g.exports()[0].input).origin();
        assert_ne!(output_region(&g, export_origin), body);
    }

    #[test]
    fn leaves_loop_with_variant_predicate_unchanged() {
        let mut g = Graph::new();
        let root = g.root();
        let i0 = g.create_node(root, Operation::BitConstant { value: 0, width: 32 }, &[]).unwrap();
        let i0_out = g.node(i0).outputs()[0];

        let mut theta = g.create_theta(root, &[i0_out]).unwrap();
        let i_arg = theta.loop_var(0);
        let body = theta.subregion();
        // predicate computed from the loop variable itself, inside the body.
        let zero = theta.graph_mut().create_node(body, Operation::BitConstant { value: 0, width: 32 }, &[]).unwrap();
        let zero_out = theta.graph_mut().node(zero).outputs()[0];
        let cmp = theta
            .graph_mut()
            .create_node(body, Operation::Compare(crate::ops::CmpOpKind::Eq), &[i_arg, zero_out])
            .unwrap();
        let cmp_out = theta.graph_mut().node(cmp).outputs()[0];
        let p = theta
            .graph_mut()
            .create_node(
                body,
                Operation::Match {
                    input_width: 1,
                    num_alternatives: 2,
                    mapping: smallvec::smallvec![(1, 1)],
                    default: 0,
                },
                &[cmp_out],
            )
            .unwrap();
        let p_out = theta.graph_mut().node(p).outputs()[0];

        let mut gamma = theta.graph_mut().create_gamma(body, p_out, 2, &[i_arg]).unwrap();
        let sub0 = gamma.subregion(0);
        let sub1 = gamma.subregion(1);
        let e0 = gamma.entry_var(0, 0);
        let e1 = gamma.entry_var(1, 0);
        let cont0 = gamma
            .graph_mut()
            .create_node(sub0, Operation::ControlConstant { alt: 1, num_alternatives: 2 }, &[])
            .unwrap();
        let cont0_out = gamma.graph_mut().node(cont0).outputs()[0];
        let cont1 = gamma
            .graph_mut()
            .create_node(sub1, Operation::ControlConstant { alt: 0, num_alternatives: 2 }, &[])
            .unwrap();
        let cont1_out = gamma.graph_mut().node(cont1).outputs()[0];
        let gamma_outputs = gamma.finalize(&[vec![e0, cont0_out], vec![e1, cont1_out]]).unwrap();
        let outputs = theta.finalize(&[gamma_outputs[0]], gamma_outputs[1]).unwrap();
        g.add_export("i", outputs[0]).unwrap();

        let inverted = run(&mut g).unwrap();
        assert_eq!(inverted, 0);
    }
}
