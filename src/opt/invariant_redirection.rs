//! Invariant redirection (spec §4.7): a theta loop-carried variable whose
//! iteration result is literally its own entry argument never changes across
//! iterations, so consumers of the theta's output can read the pre-loop value
//! directly; a gamma result that every alternative produces by passing the
//! same entry variable straight through doesn't depend on the predicate at
//! all, so consumers can read that entry value directly. Both patterns arise
//! routinely from loop-invariant code motion and from branches that only
//! touch some of their entry variables.
//!
//! Neither case deletes the structural node — other loop-carried
//! variables/gamma results may still be live — so this only ever redirects
//! the one output in question and leaves cleanup to dead-node elimination.

use crate::{
    ids::{NodeId, OutputId},
    ir::Graph,
    pass::{Pass, PassCounters},
    structural::StructuralKind,
    traversal,
    Result,
};

pub struct InvariantRedirection;

impl Pass for InvariantRedirection {
    fn name(&self) -> &'static str {
        "invariant-redirection"
    }

    fn run(&mut self, graph: &mut Graph) -> Result<PassCounters> {
        let redirected = run(graph)?;
        let mut counters = PassCounters::new();
        counters.set("redirected", redirected);
        Ok(counters)
    }
}

pub fn run(graph: &mut Graph) -> Result<u64> {
    let mut redirected = 0u64;
    let mut nodes = Vec::new();
    traversal::walk_topdown(graph, graph.root(), &mut |n| nodes.push(n));
    for node in nodes {
        if graph.node(node).is_removed() {
            continue;
        }
        redirected += redirect_node(graph, node)?;
    }
    Ok(redirected)
}

fn redirect_node(graph: &mut Graph, node: NodeId) -> Result<u64> {
    let kind_is_theta = matches!(graph.node(node).as_structural(), Some(StructuralKind::Theta(_)));
    let kind_is_gamma = matches!(graph.node(node).as_structural(), Some(StructuralKind::Gamma(_)));
    if kind_is_theta {
        redirect_theta(graph, node)
    } else if kind_is_gamma {
        redirect_gamma(graph, node)
    } else {
        Ok(0)
    }
}

fn redirect_theta(graph: &mut Graph, node: NodeId) -> Result<u64> {
    let (subregion, num_loop_vars) = {
        let data = graph.node(node).as_structural().and_then(|k| k.as_theta()).unwrap();
        (data.subregion, data.num_loop_vars)
    };

    let mut count = 0u64;
    for i in 0..num_loop_vars {
        let arg = graph.region(subregion).arguments()[i];
        let result_input = graph.region(subregion).results()[i];
        let result_origin = graph.input(result_input).origin();
        if result_origin != arg {
            continue;
        }
        // The loop body feeds this variable's own entry value straight back
        // out: every iteration keeps it at its initial value.
        let entry_input = graph.node(node).inputs()[i];
        let initial_value = graph.input(entry_input).origin();
        let output = graph.node(node).outputs()[i];
        if redirect_users(graph, output, initial_value)? {
            count += 1;
        }
    }
    Ok(count)
}

fn redirect_gamma(graph: &mut Graph, node: NodeId) -> Result<u64> {
    let subregions = {
        let data = graph.node(node).as_structural().and_then(|k| k.as_gamma()).unwrap();
        data.subregions.clone()
    };

    let mut count = 0u64;
    let outputs = graph.node(node).outputs().to_vec();
    for (i, &output) in outputs.iter().enumerate() {
        if let Some(entry_index) = invariant_entry_index(graph, &subregions, i) {
            // Alternative 0's entry vars occupy input indices `1..1+num_entry_vars`,
            // and every alternative was seeded with the same origin per entry
            // index, so alt 0's copy is as good as any other.
            let entry_input = graph.node(node).inputs()[1 + entry_index];
            let entry_value = graph.input(entry_input).origin();
            if redirect_users(graph, output, entry_value)? {
                count += 1;
            }
        }
    }
    Ok(count)
}

/// If every subregion's `result_index`-th result is literally the same entry
/// variable (by argument position), returns that variable's index.
fn invariant_entry_index(graph: &Graph, subregions: &[crate::ids::RegionId], result_index: usize) -> Option<usize> {
    let first = subregions[0];
    let first_origin = graph.input(graph.region(first).results()[result_index]).origin();
    let entry_index = graph.region(first).arguments().iter().position(|&a| a == first_origin)?;

    for &sub in &subregions[1..] {
        let origin = graph.input(graph.region(sub).results()[result_index]).origin();
        if graph.region(sub).arguments().get(entry_index) != Some(&origin) {
            return None;
        }
    }
    Some(entry_index)
}

fn redirect_users(graph: &mut Graph, output: OutputId, new_origin: OutputId) -> Result<bool> {
    if output == new_origin {
        return Ok(false);
    }
    let users: Vec<_> = graph.output(output).users().to_vec();
    if users.is_empty() {
        return Ok(false);
    }
    for user in users {
        graph.redirect_input(user, new_origin)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{BinOpKind, Operation};

    #[test]
    fn theta_passthrough_loop_var_is_redirected_to_entry_value() {
        // while (cond) { acc = acc; i = i + 1 } — `acc` is loop-invariant,
        // `i` genuinely changes each iteration.
        let mut g = Graph::new();
        let root = g.root();
        let acc0 = g.create_node(root, Operation::BitConstant { value: 7, width: 32 }, &[]).unwrap();
        let acc0_out = g.node(acc0).outputs()[0];
        let i0 = g.create_node(root, Operation::BitConstant { value: 0, width: 32 }, &[]).unwrap();
        let i0_out = g.node(i0).outputs()[0];

        let mut theta = g.create_theta(root, &[acc0_out, i0_out]).unwrap();
        let acc_arg = theta.loop_var(0);
        let i_arg = theta.loop_var(1);
        let subregion = theta.subregion();
        let one = theta.graph_mut().create_node(subregion, Operation::BitConstant { value: 1, width: 32 }, &[]).unwrap();
        let one_out = theta.graph_mut().node(one).outputs()[0];
        let i_next = theta
            .graph_mut()
            .create_node(subregion, Operation::Binary(BinOpKind::Add), &[i_arg, one_out])
            .unwrap();
        let i_next_out = theta.graph_mut().node(i_next).outputs()[0];
        let predicate = theta
            .graph_mut()
            .create_node(subregion, Operation::ControlConstant { alt: 0, num_alternatives: 2 }, &[])
            .unwrap();
        let predicate_out = theta.graph_mut().node(predicate).outputs()[0];
        let outputs = theta.finalize(&[acc_arg, i_next_out], predicate_out).unwrap();

        g.add_export("acc", outputs[0]).unwrap();
        g.add_export("i", outputs[1]).unwrap();

        let redirected = run(&mut g).unwrap();
        assert_eq!(redirected, 1);

        let acc_export_origin = g.input(g.exports()[0].input).origin();
        assert_eq!(acc_export_origin, acc0_out);
    }

    #[test]
    fn gamma_passthrough_result_is_redirected_to_entry_value() {
        let mut g = Graph::new();
        let root = g.root();
        let x = g.create_node(root, Operation::BitConstant { value: 9, width: 32 }, &[]).unwrap();
        let x_out = g.node(x).outputs()[0];
        let pred = g
            .create_node(root, Operation::ControlConstant { alt: 0, num_alternatives: 2 }, &[])
            .unwrap();
        let pred_out = g.node(pred).outputs()[0];

        let mut gamma = g.create_gamma(root, pred_out, 2, &[x_out]).unwrap();
        let entry0 = gamma.entry_var(0, 0);
        let entry1 = gamma.entry_var(1, 0);
        let outputs = gamma.finalize(&[vec![entry0], vec![entry1]]).unwrap();
        g.add_export("y", outputs[0]).unwrap();

        let redirected = run(&mut g).unwrap();
        assert_eq!(redirected, 1);
        let export_origin = g.input(g.exports()[0].input).origin();
        assert_eq!(export_origin, x_out);
    }

    #[test]
    fn theta_genuinely_changing_var_is_not_redirected() {
        let mut g = Graph::new();
        let root = g.root();
        let i0 = g.create_node(root, Operation::BitConstant { value: 0, width: 32 }, &[]).unwrap();
        let i0_out = g.node(i0).outputs()[0];
        let mut theta = g.create_theta(root, &[i0_out]).unwrap();
        let i_arg = theta.loop_var(0);
        let subregion = theta.subregion();
        let one = theta.graph_mut().create_node(subregion, Operation::BitConstant { value: 1, width: 32 }, &[]).unwrap();
        let one_out = theta.graph_mut().node(one).outputs()[0];
        let i_next = theta
            .graph_mut()
            .create_node(subregion, Operation::Binary(BinOpKind::Add), &[i_arg, one_out])
            .unwrap();
        let i_next_out = theta.graph_mut().node(i_next).outputs()[0];
        let predicate = theta
            .graph_mut()
            .create_node(subregion, Operation::ControlConstant { alt: 1, num_alternatives: 2 }, &[])
            .unwrap();
        let predicate_out = theta.graph_mut().node(predicate).outputs()[0];
        let outputs = theta.finalize(&[i_next_out], predicate_out).unwrap();
        g.add_export("i", outputs[0]).unwrap();

        let redirected = run(&mut g).unwrap();
        assert_eq!(redirected, 0);
    }
}
