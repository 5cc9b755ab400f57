//! Node reductions (spec §4.7): local, per-op algebraic simplifications —
//! constant folding and identity elimination — driven by pattern rules
//! rather than a general term rewriter, since the operation catalog is
//! closed and small.
//!
//! A reduction only ever introduces a new node or redirects existing
//! consumers to an existing output; it never deletes anything itself —
//! the now-unreferenced original is left for [`super::dead_node_elimination`]
//! to clean up, exactly as inlining leaves the inlined call behind dead.

use crate::{
    ids::NodeId,
    ir::Graph,
    ops::{BinOpKind, CmpOpKind, Operation},
    pass::{Pass, PassCounters},
    traversal,
    Result,
};

pub struct NodeReductions;

impl Pass for NodeReductions {
    fn name(&self) -> &'static str {
        "node-reductions"
    }

    fn run(&mut self, graph: &mut Graph) -> Result<PassCounters> {
        let folded = run(graph)?;
        let mut counters = PassCounters::new();
        counters.set("folded", folded);
        Ok(counters)
    }
}

pub fn run(graph: &mut Graph) -> Result<u64> {
    let mut folded = 0u64;
    let mut nodes = Vec::new();
    traversal::walk_topdown(graph, graph.root(), &mut |n| nodes.push(n));
    for node in nodes {
        if graph.node(node).is_removed() {
            continue;
        }
        if reduce_node(graph, node)? {
            folded += 1;
        }
    }
    Ok(folded)
}

fn const_operand(graph: &Graph, node: NodeId, index: usize) -> Option<(u64, u32)> {
    let input = *graph.node(node).inputs().get(index)?;
    let origin = graph.input(input).origin();
    let producer = match graph.output(origin).owner {
        crate::ir::OutputOwner::Node(n, _) => n,
        crate::ir::OutputOwner::RegionArgument(..) => return None,
    };
    match graph.node(producer).operation() {
        Some(Operation::BitConstant { value, width }) => Some((*value, *width)),
        _ => None,
    }
}

fn truncate(value: u64, width: u32) -> u64 {
    if width >= 64 {
        value
    } else {
        value & ((1u64 << width) - 1)
    }
}

fn sign_extend(value: u64, width: u32) -> i64 {
    if width == 0 || width >= 64 {
        return value as i64;
    }
    let shift = 64 - width;
    ((value << shift) as i64) >> shift
}

/// Attempts one reduction on `node`; returns whether it fired.
fn reduce_node(graph: &mut Graph, node: NodeId) -> Result<bool> {
    let op = match graph.node(node).operation() {
        Some(op) => op.clone(),
        None => return Ok(false),
    };

    match op {
        Operation::Binary(kind) => {
            if let (Some((lhs, width)), Some((rhs, _))) =
                (const_operand(graph, node, 0), const_operand(graph, node, 1))
            {
                if let Some(folded) = fold_binary(kind, lhs, rhs, width) {
                    return replace_with_constant(graph, node, folded, width);
                }
            }
            Ok(false)
        }
        Operation::Compare(kind) => {
            if let (Some((lhs, width)), Some((rhs, _))) =
                (const_operand(graph, node, 0), const_operand(graph, node, 1))
            {
                let result = fold_compare(kind, lhs, rhs, width);
                return replace_with_constant(graph, node, result as u64, 1);
            }
            Ok(false)
        }
        Operation::Bitcast { target } => {
            // Identity bitcast: operand's type already equals the target
            // type, so downstream consumers can read straight through to it.
            let input = graph.node(node).inputs()[0];
            let origin = graph.input(input).origin();
            if graph.output(origin).ty == crate::types::PortType::Value(target) {
                redirect_all_users(graph, node, 0, origin)?;
                return Ok(true);
            }
            Ok(false)
        }
        _ => Ok(false),
    }
}

fn fold_binary(kind: BinOpKind, lhs: u64, rhs: u64, width: u32) -> Option<u64> {
    let result = match kind {
        BinOpKind::Add => lhs.wrapping_add(rhs),
        BinOpKind::Sub => lhs.wrapping_sub(rhs),
        BinOpKind::Mul => lhs.wrapping_mul(rhs),
        BinOpKind::And => lhs & rhs,
        BinOpKind::Or => lhs | rhs,
        BinOpKind::Xor => lhs ^ rhs,
        BinOpKind::Shl => lhs.wrapping_shl(rhs as u32),
        BinOpKind::Shr => lhs.wrapping_shr(rhs as u32),
        BinOpKind::UDiv if rhs != 0 => lhs / rhs,
        BinOpKind::UMod if rhs != 0 => lhs % rhs,
        BinOpKind::SDiv if rhs != 0 => {
            let l = sign_extend(lhs, width);
            let r = sign_extend(rhs, width);
            (l.wrapping_div(r)) as u64
        }
        BinOpKind::SMod if rhs != 0 => {
            let l = sign_extend(lhs, width);
            let r = sign_extend(rhs, width);
            (l.wrapping_rem(r)) as u64
        }
        BinOpKind::AShr => {
            let l = sign_extend(lhs, width);
            (l.wrapping_shr(rhs as u32)) as u64
        }
        _ => return None, // division/modulo by zero: leave for the frontend to diagnose
    };
    Some(truncate(result, width))
}

fn fold_compare(kind: CmpOpKind, lhs: u64, rhs: u64, width: u32) -> bool {
    let (l, r) = (sign_extend(lhs, width), sign_extend(rhs, width));
    match kind {
        CmpOpKind::Eq => lhs == rhs,
        CmpOpKind::Ne => lhs != rhs,
        CmpOpKind::Sge => l >= r,
        CmpOpKind::Sgt => l > r,
        CmpOpKind::Sle => l <= r,
        CmpOpKind::Slt => l < r,
        CmpOpKind::Uge => lhs >= rhs,
        CmpOpKind::Ugt => lhs > rhs,
        CmpOpKind::Ule => lhs <= rhs,
        CmpOpKind::Ult => lhs < rhs,
    }
}

fn replace_with_constant(graph: &mut Graph, node: NodeId, value: u64, width: u32) -> Result<bool> {
    let region = graph.node(node).region();
    let folded = graph.create_node(region, Operation::BitConstant { value, width }, &[])?;
    let folded_out = graph.node(folded).outputs()[0];
    redirect_all_users(graph, node, 0, folded_out)?;
    Ok(true)
}

fn redirect_all_users(
    graph: &mut Graph,
    node: NodeId,
    output_index: usize,
    new_origin: crate::ids::OutputId,
) -> Result<()> {
    let output = graph.node(node).outputs()[output_index];
    if output == new_origin {
        return Ok(());
    }
    let users: Vec<_> = graph.output(output).users().to_vec();
    for user in users {
        graph.redirect_input(user, new_origin)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opt::dead_node_elimination;

    #[test]
    fn folds_constant_add() {
        // spec §8 scenario 1: add(const 3, const 4) folds to a single
        // const 7, and the add node becomes dead afterward.
        let mut g = Graph::new();
        let root = g.root();
        let a = g.create_node(root, Operation::BitConstant { value: 3, width: 32 }, &[]).unwrap();
        let b = g.create_node(root, Operation::BitConstant { value: 4, width: 32 }, &[]).unwrap();
        let a_out = g.node(a).outputs()[0];
        let b_out = g.node(b).outputs()[0];
        let sum = g.create_node(root, Operation::Binary(BinOpKind::Add), &[a_out, b_out]).unwrap();
        let sum_out = g.node(sum).outputs()[0];
        g.add_export("r", sum_out).unwrap();

        let folded = run(&mut g).unwrap();
        assert_eq!(folded, 1);
        dead_node_elimination::run(&mut g).unwrap();
        assert!(g.node(sum).is_removed());

        let export_origin = g.input(g.exports()[0].input).origin();
        match g.output(export_origin).owner {
            crate::ir::OutputOwner::Node(n, _) => {
                assert_eq!(g.node(n).operation(), Some(&Operation::BitConstant { value: 7, width: 32 }));
            }
            _ => panic!("expected a node output"),
        }
    }

    #[test]
    fn leaves_non_constant_operands_alone() {
        let mut g = Graph::new();
        let root = g.root();
        let param = g.add_import("x", crate::types::PortType::Value(crate::types::widths::i32()));
        let a = g.create_node(root, Operation::BitConstant { value: 3, width: 32 }, &[]).unwrap();
        let a_out = g.node(a).outputs()[0];
        let sum = g.create_node(root, Operation::Binary(BinOpKind::Add), &[param, a_out]).unwrap();
        let sum_out = g.node(sum).outputs()[0];
        g.add_export("r", sum_out).unwrap();

        let folded = run(&mut g).unwrap();
        assert_eq!(folded, 0);
    }
}
