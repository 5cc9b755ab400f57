//! Call summary analysis (spec §4.3): classifies how a lambda's single
//! output is used, so optimization passes (inlining, dead-lambda removal) can
//! decide without re-walking the whole use list each time.

use crate::{
    ids::NodeId,
    ir::{Graph, InputOwner},
    ops::Operation,
};

/// How a lambda is used, seen from its function-pointer output's user list.
///
/// Computed lazily and cached per lambda node (spec §9, "call summary
/// caching"); any rewrite touching one of the lambda's users invalidates the
/// cache entry through [`Graph::invalidate_call_summaries_touching`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallSummary {
    pub num_direct_calls: usize,
    pub num_other_users: usize,
    pub is_exported: bool,
}

impl CallSummary {
    /// No uses at all: not called, not exported, not passed around.
    pub fn is_dead(&self) -> bool {
        self.num_direct_calls == 0 && self.num_other_users == 0 && !self.is_exported
    }

    pub fn is_exported(&self) -> bool {
        self.is_exported
    }

    /// Exported, and otherwise entirely unused inside the module.
    pub fn is_only_exported(&self) -> bool {
        self.is_exported && self.num_direct_calls == 0 && self.num_other_users == 0
    }

    /// Every use is a direct `apply` on this lambda's own function pointer:
    /// no indirect call could possibly reach it, so its call sites are known
    /// exhaustively (a precondition for inlining and for the lifetime-aware
    /// memory-node provider treating it as fully analyzable).
    pub fn has_only_direct_calls(&self) -> bool {
        self.num_direct_calls > 0 && self.num_other_users == 0
    }
}

impl Graph {
    /// The call summary of the lambda node `lambda`. Panics if `lambda` is
    /// not a lambda node.
    pub fn call_summary(&self, lambda: NodeId) -> CallSummary {
        if let Some(cached) = self.call_summaries.borrow().get(&lambda) {
            return *cached;
        }

        let node = self.node(lambda);
        assert!(
            node.as_structural()
                .and_then(|k| k.as_lambda())
                .is_some(),
            "call_summary requires a lambda node"
        );
        let output = node.outputs()[0];

        let mut summary = CallSummary::default();
        for &user in self.output(output).users() {
            match self.input(user).owner {
                InputOwner::Node(callee_node, operand_index) => {
                    let is_direct_call = operand_index == 0
                        && matches!(self.node(callee_node).operation(), Some(Operation::Apply { .. }));
                    if is_direct_call {
                        summary.num_direct_calls += 1;
                    } else {
                        summary.num_other_users += 1;
                    }
                }
                InputOwner::RegionResult(region, _) if region == self.root() => {
                    summary.is_exported = true;
                }
                InputOwner::RegionResult(..) => {
                    summary.num_other_users += 1;
                }
            }
        }

        self.call_summaries.borrow_mut().insert(lambda, summary);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{widths, FunctionType};

    fn identity_signature() -> FunctionType {
        FunctionType {
            args: vec![widths::i32()],
            results: vec![widths::i32()],
        }
    }

    #[test]
    fn unused_lambda_is_dead() {
        let mut g = Graph::new();
        let lambda = g.create_lambda(g.root(), identity_signature(), &[]).unwrap();
        let param = lambda.param(0);
        let fn_ptr = lambda.finalize(&[param]).unwrap();
        let node = g.output(fn_ptr).owner;
        let node_id = match node {
            crate::ir::OutputOwner::Node(n, _) => n,
            _ => unreachable!(),
        };
        let summary = g.call_summary(node_id);
        assert!(summary.is_dead());
    }

    #[test]
    fn exported_only_lambda_is_only_exported() {
        let mut g = Graph::new();
        let lambda = g.create_lambda(g.root(), identity_signature(), &[]).unwrap();
        let param = lambda.param(0);
        let fn_ptr = lambda.finalize(&[param]).unwrap();
        g.add_export("identity", fn_ptr).unwrap();
        let node_id = match g.output(fn_ptr).owner {
            crate::ir::OutputOwner::Node(n, _) => n,
            _ => unreachable!(),
        };
        let summary = g.call_summary(node_id);
        assert!(summary.is_only_exported());
        assert!(!summary.is_dead());
    }

    #[test]
    fn direct_call_counts_as_direct() {
        let mut g = Graph::new();
        let lambda = g.create_lambda(g.root(), identity_signature(), &[]).unwrap();
        let param = lambda.param(0);
        let fn_ptr = lambda.finalize(&[param]).unwrap();

        let arg = g
            .create_node(g.root(), Operation::BitConstant { value: 1, width: 32 }, &[])
            .unwrap();
        let arg_out = g.node(arg).outputs()[0];
        let call = g
            .create_node(
                g.root(),
                Operation::Apply {
                    result_types: smallvec::smallvec![widths::i32()],
                    num_args: 1,
                    num_states: 0,
                },
                &[fn_ptr, arg_out],
            )
            .unwrap();
        let call_result = g.node(call).outputs()[0];
        g.add_export("result", call_result).unwrap();

        let node_id = match g.output(fn_ptr).owner {
            crate::ir::OutputOwner::Node(n, _) => n,
            _ => unreachable!(),
        };
        let summary = g.call_summary(node_id);
        assert!(summary.has_only_direct_calls());
        assert_eq!(summary.num_direct_calls, 1);
    }
}
