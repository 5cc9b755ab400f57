//! Cross-module scenario tests exercising the graph, structural-node
//! builders, call summary, and optimization passes together, the way a
//! frontend assembling a real module would use them.

use pretty_assertions::assert_eq;

use rvsdg::{
    ir::{Graph, OutputOwner},
    ops::Operation,
    opt,
    pass::Pass,
    types::{widths, FunctionType, PortType, StateType},
};

/// Mutually recursive globals: a phi node with two recursion variables
/// `r1, r2` and two deltas, delta1 depending on r2 and delta2 depending on
/// r1. The group should survive every pass unchanged in shape.
#[test]
fn mutually_recursive_globals_survive_optimization() {
    let mut g = Graph::new();
    let root = g.root();

    let elem_ty = widths::i32();
    let mut phi = g
        .create_phi(root, &[], &[elem_ty.clone(), elem_ty.clone()])
        .unwrap();
    let r1 = phi.recursion_var(0);
    let r2 = phi.recursion_var(1);
    let subregion = phi.subregion();

    let mut delta1 = phi
        .graph_mut()
        .create_delta(subregion, elem_ty.clone(), &[r2])
        .unwrap();
    let delta1_ctx = delta1.context_var(0);
    let delta1_ptr = delta1.finalize(delta1_ctx).unwrap();

    let mut delta2 = phi
        .graph_mut()
        .create_delta(subregion, elem_ty.clone(), &[r1])
        .unwrap();
    let delta2_ctx = delta2.context_var(0);
    let delta2_ptr = delta2.finalize(delta2_ctx).unwrap();

    let outputs = phi.finalize(&[delta1_ptr, delta2_ptr]).unwrap();
    assert_eq!(outputs.len(), 2);
    g.add_export("g1", outputs[0]).unwrap();
    g.add_export("g2", outputs[1]).unwrap();

    let mut manager = rvsdg::pass::PassManager::new();
    manager.add(opt::DeadNodeElimination);
    manager.add(opt::CommonNodeElimination);
    manager.add(opt::NodeReductions);
    manager.run(&mut g, None).unwrap();

    // Both exports still resolve to deltas; the phi's shape is untouched.
    for (name, expected_output) in [("g1", outputs[0]), ("g2", outputs[1])] {
        let export = g
            .exports()
            .iter()
            .find(|e| e.name == name)
            .unwrap_or_else(|| panic!("export {name} missing"));
        assert_eq!(g.input(export.input).origin(), expected_output);
        match g.output(expected_output).owner {
            OutputOwner::Node(n, _) => {
                assert!(g.node(n).as_structural().and_then(|k| k.as_delta()).is_some());
                assert!(!g.node(n).is_removed());
            }
            OutputOwner::RegionArgument(..) => panic!("delta output should be a node output"),
        }
    }
}

/// A lambda passed as a value to another function (not applied directly)
/// is an indirect use: its call summary must record it as an "other user",
/// not a direct call, and `has_only_direct_calls` must be false.
#[test]
fn call_summary_distinguishes_indirect_use_from_direct_call() {
    let mut g = Graph::new();
    let root = g.root();

    let callee_sig = FunctionType {
        args: vec![],
        results: vec![],
    };
    let callee = g.create_lambda(root, callee_sig, &[]).unwrap();
    let callee_ptr = callee.finalize(&[]).unwrap();
    let callee_node = match g.output(callee_ptr).owner {
        OutputOwner::Node(n, _) => n,
        _ => unreachable!(),
    };

    // `higher_order(f)` just returns the function pointer it was handed —
    // `callee_ptr` is passed in as an ordinary value argument, not applied.
    let fn_ptr_ty = g.output(callee_ptr).ty.clone();
    let value_ty = match fn_ptr_ty {
        PortType::Value(ty) => ty,
        _ => unreachable!(),
    };
    let higher_order_sig = FunctionType {
        args: vec![value_ty],
        results: vec![],
    };
    let higher_order = g
        .create_lambda(root, higher_order_sig, &[callee_ptr])
        .unwrap();
    let ctx = higher_order.context_var(0);
    let _ = ctx;
    let higher_order_ptr = higher_order.finalize(&[]).unwrap();
    g.add_export("higher_order", higher_order_ptr).unwrap();

    let summary = g.call_summary(callee_node);
    assert_eq!(summary.num_direct_calls, 0);
    assert!(summary.num_other_users >= 1);
    assert!(!summary.has_only_direct_calls());
}

/// The agnostic provider's entry set for a lambda always contains the
/// lifetime-aware provider's entry set for the same lambda (spec's
/// round-trip property).
#[test]
fn agnostic_set_is_a_superset_of_lifetime_aware_set() {
    use rvsdg::points_to::{MemoryNode, PointsToGraphBuilder};
    use rvsdg::provisioning::{AgnosticProvider, LifetimeAwareProvider, MemoryNodeProvider};

    let mut g = Graph::new();
    let root = g.root();
    let sig = FunctionType {
        args: vec![],
        results: vec![],
    };
    // A memory-state import at the root gives the lambda a context variable
    // to thread the alloca's incoming state through, using only the public
    // construction surface (`push_region_argument` is crate-private).
    let mem_import = g.add_import("mem", PortType::State(StateType::Memory));
    let mut lambda = g.create_lambda(root, sig, &[mem_import]).unwrap();
    let lambda_node = lambda.node();
    let subregion = lambda.subregion();
    let mem_in = lambda.context_var(0);
    let alloca = lambda
        .graph_mut()
        .create_node(
            subregion,
            Operation::Alloca {
                value_type: widths::i32(),
                size: 1,
            },
            &[mem_in],
        )
        .unwrap();
    let _fn_ptr = lambda.finalize(&[]).unwrap();
    g.add_export("f", _fn_ptr).unwrap();

    let mut builder = PointsToGraphBuilder::new();
    builder.declare(MemoryNode::Lambda(lambda_node));
    builder.declare(MemoryNode::External);
    builder.declare(MemoryNode::Alloca(alloca));
    let points_to = builder.build();

    let agnostic = AgnosticProvider::new(&points_to);
    let lifetime_aware = LifetimeAwareProvider::new(&points_to);

    let agnostic_set = agnostic.live_memory_nodes(&g, Some(lambda_node));
    let lifetime_set = lifetime_aware.live_memory_nodes(&g, Some(lambda_node));
    for node in &lifetime_set {
        assert!(agnostic_set.contains(node));
    }
}
