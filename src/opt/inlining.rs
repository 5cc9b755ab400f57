//! Direct-call inlining (spec §4.7, §8 scenario 4): replaces an `apply` whose
//! function-pointer operand is directly a lambda's own output with a clone of
//! that lambda's body spliced into the call's region, substituting the
//! lambda's context variables and parameters for the values actually
//! supplied at the call site.
//!
//! This never removes the lambda itself — if the call was its last use,
//! [`super::dead_node_elimination`] picks it up afterward (spec §8 scenario
//! 4's expected end state), exactly the way the cloned-and-left-behind
//! pattern already works for [`super::clone_region`]'s other client, loop
//! unrolling.

use crate::{
    ids::NodeId,
    ir::{Graph, OutputOwner},
    ops::Operation,
    opt::clone_region,
    pass::{Pass, PassCounters},
    traversal,
    Result,
};

pub struct Inlining;

impl Pass for Inlining {
    fn name(&self) -> &'static str {
        "inlining"
    }

    fn run(&mut self, graph: &mut Graph) -> Result<PassCounters> {
        let inlined = run(graph)?;
        let mut counters = PassCounters::new();
        counters.set("inlined", inlined);
        Ok(counters)
    }
}

/// Inlines every direct call reachable from the root region, to a fixpoint
/// (inlining one call can expose further direct calls nested in the spliced
/// body). Returns the number of call sites inlined.
pub fn run(graph: &mut Graph) -> Result<u64> {
    let mut total = 0u64;
    loop {
        let candidate = find_candidate(graph);
        let Some(call) = candidate else {
            break;
        };
        inline_call(graph, call)?;
        total += 1;
    }
    Ok(total)
}

fn find_candidate(graph: &Graph) -> Option<NodeId> {
    let mut found = None;
    traversal::walk_topdown(graph, graph.root(), &mut |node| {
        if found.is_some() || graph.node(node).is_removed() {
            return;
        }
        if direct_callee(graph, node).is_some() {
            found = Some(node);
        }
    });
    found
}

/// If `call` is an `apply` whose function-pointer operand is directly a
/// (finalized) lambda's own output, returns that lambda's node id. A call
/// whose operand is itself a lambda argument, a gamma/theta-carried
/// function value, or any other indirection is not a candidate here — the
/// call summary for that lambda would record it as an "other user", not a
/// direct call, and this pass only ever touches the direct-call case.
fn direct_callee(graph: &Graph, call: NodeId) -> Option<NodeId> {
    match graph.node(call).operation() {
        Some(Operation::Apply { .. }) => {}
        _ => return None,
    }
    let fn_ptr_input = graph.node(call).inputs()[0];
    let origin = graph.input(fn_ptr_input).origin();
    let producer = match graph.output(origin).owner {
        OutputOwner::Node(producer, _) => producer,
        OutputOwner::RegionArgument(..) => return None,
    };
    let lambda_subregion = graph
        .node(producer)
        .as_structural()
        .and_then(|k| k.as_lambda())
        .map(|d| d.subregion)?;

    let call_region = graph.node(call).region();
    if graph.region_dominates(lambda_subregion, call_region) {
        // The call lives inside the lambda's own body: inlining it would
        // splice the body into itself and never terminate. Recursive calls
        // are expressed through a phi's recursion variable, not like this,
        // but the guard costs nothing to keep.
        return None;
    }
    Some(producer)
}

fn inline_call(graph: &mut Graph, call: NodeId) -> Result<()> {
    let lambda = direct_callee(graph, call).expect("caller already validated this call site");
    let (subregion, num_context_vars) = {
        let data = graph
            .node(lambda)
            .as_structural()
            .and_then(|k| k.as_lambda())
            .expect("direct_callee only returns lambda nodes");
        (data.subregion, data.num_context_vars)
    };

    let call_region = graph.node(call).region();
    let call_operands: Vec<_> = graph.node(call).inputs()[1..]
        .iter()
        .map(|&i| graph.input(i).origin())
        .collect();
    let ctx_origins: Vec<_> = graph.node(lambda).inputs()[..num_context_vars]
        .iter()
        .map(|&i| graph.input(i).origin())
        .collect();

    let mut arg_subst = ctx_origins;
    arg_subst.extend(call_operands);
    assert_eq!(
        arg_subst.len(),
        graph.region(subregion).arguments().len(),
        "callee's subregion argument count must match its context vars plus the call's operands"
    );

    let map = clone_region::clone_region_into(graph, subregion, call_region, &arg_subst)?;
    let new_results = clone_region::translate_results(graph, subregion, &map);

    let call_outputs = graph.node(call).outputs().to_vec();
    assert_eq!(
        call_outputs.len(),
        new_results.len(),
        "callee's result count must match the call's output count"
    );
    for (&old_out, &new_origin) in call_outputs.iter().zip(new_results.iter()) {
        let users: Vec<_> = graph.output(old_out).users().to_vec();
        for user in users {
            graph.redirect_input(user, new_origin)?;
        }
    }
    graph.remove_node(call)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        opt::dead_node_elimination,
        ops::BinOpKind,
        types::{widths, FunctionType},
    };

    #[test]
    fn inlines_direct_call_and_leaves_callee_for_dne() {
        // f(x) = x + 1; g() = apply(f, 10) (spec §8 scenario 4).
        let mut g = Graph::new();
        let root = g.root();

        let f_sig = FunctionType { args: vec![widths::i32()], results: vec![widths::i32()] };
        let mut f = g.create_lambda(root, f_sig, &[]).unwrap();
        let x = f.param(0);
        let subregion = f.subregion();
        let one_node = f
            .graph_mut()
            .create_node(subregion, Operation::BitConstant { value: 1, width: 32 }, &[])
            .unwrap();
        let one_out = f.graph_mut().node(one_node).outputs()[0];
        let sum = f
            .graph_mut()
            .create_node(subregion, Operation::Binary(BinOpKind::Add), &[x, one_out])
            .unwrap();
        let sum_out = f.graph_mut().node(sum).outputs()[0];
        let f_ptr = f.finalize(&[sum_out]).unwrap();
        let f_node = match g.output(f_ptr).owner {
            OutputOwner::Node(n, _) => n,
            _ => unreachable!(),
        };

        let ten = g.create_node(root, Operation::BitConstant { value: 10, width: 32 }, &[]).unwrap();
        let ten_out = g.node(ten).outputs()[0];
        let call = g
            .create_node(
                root,
                Operation::Apply {
                    result_types: smallvec::smallvec![widths::i32()],
                    num_args: 1,
                    num_states: 0,
                },
                &[f_ptr, ten_out],
            )
            .unwrap();
        let call_out = g.node(call).outputs()[0];
        g.add_export("result", call_out).unwrap();

        let inlined = run(&mut g).unwrap();
        assert_eq!(inlined, 1);
        assert!(g.node(call).is_removed());

        dead_node_elimination::run(&mut g).unwrap();
        assert!(g.node(f_node).is_removed());
    }
}
