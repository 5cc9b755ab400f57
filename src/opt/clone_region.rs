//! A generic region cloner: copies every node of a source region into a
//! target region under a caller-supplied substitution for the source
//! region's own arguments.
//!
//! This is the one piece of graph-rewriting machinery [`super::inlining`]
//! (splice a callee's body into its caller) and [`super::loop_unrolling`]
//! (replicate a theta's body `k` times) both need, so it is factored out
//! rather than duplicated between them.

use smallvec::SmallVec;

use crate::{
    ids::{NodeId, OutputId, RegionId},
    ir::Graph,
    structural::StructuralKind,
    Result, FxHashMap,
};

/// Clones every node of `source_region` into `target_region`. `arg_subst`
/// gives, in order, the `target_region`-visible origin each of
/// `source_region`'s own arguments should be replaced by (typically the
/// actual arguments at a call site, or a previous unrolled iteration's
/// results). Returns the full old-output → new-output map accumulated
/// during the clone, so the caller can look up what a source region
/// *result* now corresponds to in `target_region`.
pub fn clone_region_into(
    graph: &mut Graph,
    source_region: RegionId,
    target_region: RegionId,
    arg_subst: &[OutputId],
) -> Result<FxHashMap<OutputId, OutputId>> {
    let mut map = FxHashMap::default();
    let source_args = graph.region(source_region).arguments().to_vec();
    assert_eq!(
        source_args.len(),
        arg_subst.len(),
        "argument substitution must cover every source-region argument"
    );
    for (&old_arg, &new_origin) in source_args.iter().zip(arg_subst) {
        map.insert(old_arg, new_origin);
    }

    for node in crate::traversal::topdown_region(graph, source_region) {
        clone_node(graph, node, target_region, &mut map)?;
    }
    Ok(map)
}

/// The result origins of `region`, translated through a completed clone's
/// output map (falls back to the untranslated origin if it was never
/// touched by the clone, e.g. a result that passes a value through
/// unchanged from some ancestor scope — which cannot happen for a
/// fully-cloned region, but keeps this total rather than panicking).
pub fn translate_results(graph: &Graph, region: RegionId, map: &FxHashMap<OutputId, OutputId>) -> Vec<OutputId> {
    graph
        .region(region)
        .results()
        .iter()
        .map(|&r| {
            let origin = graph.input(r).origin();
            *map.get(&origin).unwrap_or(&origin)
        })
        .collect()
}

fn translate(map: &FxHashMap<OutputId, OutputId>, origin: OutputId) -> OutputId {
    *map.get(&origin).unwrap_or(&origin)
}

fn clone_node(
    graph: &mut Graph,
    node: NodeId,
    target_region: RegionId,
    map: &mut FxHashMap<OutputId, OutputId>,
) -> Result<()> {
    if graph.node(node).as_structural().is_some() {
        return clone_structural(graph, node, target_region, map);
    }

    let op = graph.node(node).operation().unwrap().clone();
    let origins: SmallVec<[OutputId; 4]> = graph
        .node(node)
        .inputs()
        .iter()
        .map(|&i| translate(map, graph.input(i).origin()))
        .collect();
    let new_node = graph.create_node(target_region, op, &origins)?;
    for (&old_out, &new_out) in graph.node(node).outputs().iter().zip(graph.node(new_node).outputs()) {
        map.insert(old_out, new_out);
    }
    Ok(())
}

/// Clones a structural node as a structural copy in `target_region` — its
/// own subregion(s) are rebuilt node-for-node rather than spliced, since a
/// nested lambda/gamma/theta/phi/delta being cloned (as opposed to the one
/// top-level region an inlining/unrolling pass is actually splicing) keeps
/// its own scope.
enum Kind {
    Lambda,
    Gamma,
    Theta,
    Phi,
    Delta,
}

fn clone_structural(
    graph: &mut Graph,
    node: NodeId,
    target_region: RegionId,
    map: &mut FxHashMap<OutputId, OutputId>,
) -> Result<()> {
    let kind = match graph.node(node).as_structural().expect("structural node") {
        StructuralKind::Lambda(_) => Kind::Lambda,
        StructuralKind::Gamma(_) => Kind::Gamma,
        StructuralKind::Theta(_) => Kind::Theta,
        StructuralKind::Phi(_) => Kind::Phi,
        StructuralKind::Delta(_) => Kind::Delta,
    };
    match kind {
        Kind::Lambda => clone_lambda(graph, node, target_region, map),
        Kind::Gamma => clone_gamma(graph, node, target_region, map),
        Kind::Theta => clone_theta(graph, node, target_region, map),
        Kind::Phi => clone_phi(graph, node, target_region, map),
        Kind::Delta => clone_delta(graph, node, target_region, map),
    }
}

fn translated_context_vars(
    graph: &Graph,
    node: NodeId,
    num_context_vars: usize,
    map: &FxHashMap<OutputId, OutputId>,
) -> Vec<OutputId> {
    graph.node(node).inputs()[..num_context_vars]
        .iter()
        .map(|&i| translate(map, graph.input(i).origin()))
        .collect()
}

fn clone_lambda(
    graph: &mut Graph,
    node: NodeId,
    target_region: RegionId,
    map: &mut FxHashMap<OutputId, OutputId>,
) -> Result<()> {
    let data = graph.node(node).as_structural().and_then(|k| k.as_lambda()).unwrap();
    let (subregion, num_context_vars, signature) =
        (data.subregion, data.num_context_vars, data.signature.clone());
    let ctx_origins = translated_context_vars(graph, node, num_context_vars, map);

    let mut builder = graph.create_lambda(target_region, signature, &ctx_origins)?;
    let new_subregion = builder.subregion();
    let old_args = builder.graph_mut().region(subregion).arguments().to_vec();
    let new_args = builder.graph_mut().region(new_subregion).arguments().to_vec();
    let mut inner_map: FxHashMap<OutputId, OutputId> =
        old_args.into_iter().zip(new_args).collect();

    for inner_node in crate::traversal::topdown_region(builder.graph_mut(), subregion) {
        clone_node(builder.graph_mut(), inner_node, new_subregion, &mut inner_map)?;
    }
    let new_results = translate_results(builder.graph_mut(), subregion, &inner_map);
    let new_output = builder.finalize(&new_results)?;

    map.insert(graph.node(node).outputs()[0], new_output);
    Ok(())
}

fn clone_gamma(
    graph: &mut Graph,
    node: NodeId,
    target_region: RegionId,
    map: &mut FxHashMap<OutputId, OutputId>,
) -> Result<()> {
    let data = graph.node(node).as_structural().and_then(|k| k.as_gamma()).unwrap();
    let subregions = data.subregions.clone();
    let num_entry_vars = data.num_entry_vars;

    let predicate_input = graph.node(node).inputs()[0];
    let predicate = translate(map, graph.input(predicate_input).origin());
    let num_alternatives = subregions.len();
    let entry_origins: Vec<OutputId> = graph.node(node).inputs()[1..1 + num_entry_vars]
        .iter()
        .map(|&i| translate(map, graph.input(i).origin()))
        .collect();

    let mut builder = graph.create_gamma(target_region, predicate, num_alternatives as u32, &entry_origins)?;

    let mut per_sub_results: Vec<Vec<OutputId>> = Vec::with_capacity(num_alternatives);
    for (alt, &old_subregion) in subregions.iter().enumerate() {
        let new_subregion = builder.subregion(alt);
        let old_args = builder.graph_mut().region(old_subregion).arguments().to_vec();
        let new_args = builder.graph_mut().region(new_subregion).arguments().to_vec();
        let mut inner_map: FxHashMap<OutputId, OutputId> =
            old_args.into_iter().zip(new_args).collect();
        for inner_node in crate::traversal::topdown_region(builder.graph_mut(), old_subregion) {
            clone_node(builder.graph_mut(), inner_node, new_subregion, &mut inner_map)?;
        }
        per_sub_results.push(translate_results(builder.graph_mut(), old_subregion, &inner_map));
    }
    let new_outputs = builder.finalize(&per_sub_results)?;

    for (&old_out, &new_out) in graph.node(node).outputs().iter().zip(new_outputs.iter()) {
        map.insert(old_out, new_out);
    }
    Ok(())
}

fn clone_theta(
    graph: &mut Graph,
    node: NodeId,
    target_region: RegionId,
    map: &mut FxHashMap<OutputId, OutputId>,
) -> Result<()> {
    let data = graph.node(node).as_structural().and_then(|k| k.as_theta()).unwrap();
    let subregion = data.subregion;
    let num_loop_vars = data.num_loop_vars;

    let loop_var_origins: Vec<OutputId> = graph.node(node).inputs()[..num_loop_vars]
        .iter()
        .map(|&i| translate(map, graph.input(i).origin()))
        .collect();

    let mut builder = graph.create_theta(target_region, &loop_var_origins)?;
    let new_subregion = builder.subregion();
    let old_args = builder.graph_mut().region(subregion).arguments().to_vec();
    let new_args = builder.graph_mut().region(new_subregion).arguments().to_vec();
    let mut inner_map: FxHashMap<OutputId, OutputId> =
        old_args.into_iter().zip(new_args).collect();
    for inner_node in crate::traversal::topdown_region(builder.graph_mut(), subregion) {
        clone_node(builder.graph_mut(), inner_node, new_subregion, &mut inner_map)?;
    }
    let mut new_results = translate_results(builder.graph_mut(), subregion, &inner_map);
    let predicate = new_results.pop().expect("theta subregion always has a trailing predicate result");
    let new_outputs = builder.finalize(&new_results, predicate)?;

    for (&old_out, &new_out) in graph.node(node).outputs().iter().zip(new_outputs.iter()) {
        map.insert(old_out, new_out);
    }
    Ok(())
}

fn clone_phi(
    graph: &mut Graph,
    node: NodeId,
    target_region: RegionId,
    map: &mut FxHashMap<OutputId, OutputId>,
) -> Result<()> {
    let data = graph.node(node).as_structural().and_then(|k| k.as_phi()).unwrap();
    let subregion = data.subregion;
    let num_context_vars = data.num_context_vars;
    let num_recursion_vars = data.num_recursion_vars;
    let ctx_origins = translated_context_vars(graph, node, num_context_vars, map);
    let recursion_types: Vec<crate::types::Type> = graph.region(subregion).arguments()
        [num_context_vars..num_context_vars + num_recursion_vars]
        .iter()
        .map(|&a| match &graph.output(a).ty {
            crate::types::PortType::Value(crate::types::Type::Pointer(inner)) => (**inner).clone(),
            other => panic!("phi recursion variable must be pointer-typed, got {other:?}"),
        })
        .collect();

    let mut builder = graph.create_phi(target_region, &ctx_origins, &recursion_types)?;
    let new_subregion = builder.subregion();
    let old_args = builder.graph_mut().region(subregion).arguments().to_vec();
    let new_args = builder.graph_mut().region(new_subregion).arguments().to_vec();
    let mut inner_map: FxHashMap<OutputId, OutputId> =
        old_args.into_iter().zip(new_args).collect();
    for inner_node in crate::traversal::topdown_region(builder.graph_mut(), subregion) {
        clone_node(builder.graph_mut(), inner_node, new_subregion, &mut inner_map)?;
    }
    let definitions = translate_results(builder.graph_mut(), subregion, &inner_map);
    let new_outputs = builder.finalize(&definitions)?;

    for (&old_out, &new_out) in graph.node(node).outputs().iter().zip(new_outputs.iter()) {
        map.insert(old_out, new_out);
    }
    Ok(())
}

fn clone_delta(
    graph: &mut Graph,
    node: NodeId,
    target_region: RegionId,
    map: &mut FxHashMap<OutputId, OutputId>,
) -> Result<()> {
    let data = graph.node(node).as_structural().and_then(|k| k.as_delta()).unwrap();
    let subregion = data.subregion;
    let num_context_vars = data.num_context_vars;
    let value_type = match &graph.output(graph.node(node).outputs()[0]).ty {
        crate::types::PortType::Value(crate::types::Type::Pointer(inner)) => (**inner).clone(),
        other => panic!("delta output must be pointer-typed, got {other:?}"),
    };
    let ctx_origins = translated_context_vars(graph, node, num_context_vars, map);

    let mut builder = graph.create_delta(target_region, value_type, &ctx_origins)?;
    let new_subregion = builder.subregion();
    let old_args = builder.graph_mut().region(subregion).arguments().to_vec();
    let new_args = builder.graph_mut().region(new_subregion).arguments().to_vec();
    let mut inner_map: FxHashMap<OutputId, OutputId> =
        old_args.into_iter().zip(new_args).collect();
    for inner_node in crate::traversal::topdown_region(builder.graph_mut(), subregion) {
        clone_node(builder.graph_mut(), inner_node, new_subregion, &mut inner_map)?;
    }
    let mut results = translate_results(builder.graph_mut(), subregion, &inner_map);
    let value = results.pop().expect("delta subregion always has exactly one result");
    let new_output = builder.finalize(value)?;

    map.insert(graph.node(node).outputs()[0], new_output);
    Ok(())
}
