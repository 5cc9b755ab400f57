//! Lambda: function definition (spec §3, "Lambda").

use crate::{
    error::{DomainError, Error, Result},
    ids::{NodeId, OutputId, RegionId},
    ir::Graph,
    structural::{LambdaData, StructuralKind},
    types::{FunctionType, PortType, Type},
};

/// Builds a lambda node: one subregion, context variables captured from the
/// enclosing region, and the formal parameters of `signature`, both surfaced
/// as subregion arguments in that order.
pub struct LambdaBuilder<'g> {
    graph: &'g mut Graph,
    node: NodeId,
    subregion: RegionId,
    signature: FunctionType,
    context_vars: Vec<OutputId>,
    params: Vec<OutputId>,
}

impl Graph {
    /// Begins construction of a lambda node in `region`, capturing
    /// `context_var_origins` (values from `region`) as context variables.
    pub fn create_lambda(
        &mut self,
        region: RegionId,
        signature: FunctionType,
        context_var_origins: &[OutputId],
    ) -> Result<LambdaBuilder<'_>> {
        let node = self.reserve_structural_node(region);
        let subregion = self.new_region(node);

        let mut context_vars = Vec::with_capacity(context_var_origins.len());
        for &origin in context_var_origins {
            self.push_node_input(node, origin)?;
            let ty = self.output(origin).ty.clone();
            context_vars.push(self.push_region_argument(subregion, ty));
        }

        let mut params = Vec::with_capacity(signature.args.len());
        for arg_ty in signature.args.clone() {
            params.push(self.push_region_argument(subregion, PortType::Value(arg_ty)));
        }

        Ok(LambdaBuilder {
            graph: self,
            node,
            subregion,
            signature,
            context_vars,
            params,
        })
    }
}

impl<'g> LambdaBuilder<'g> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn subregion(&self) -> RegionId {
        self.subregion
    }

    pub fn context_var(&self, index: usize) -> OutputId {
        self.context_vars[index]
    }

    pub fn param(&self, index: usize) -> OutputId {
        self.params[index]
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        self.graph
    }

    /// Finalizes the lambda by setting the subregion's results and thereby
    /// fixing its shape (spec §3, "Lifecycle"). Returns the lambda's single
    /// output, a function-pointer-typed value.
    pub fn finalize(self, results: &[OutputId]) -> Result<OutputId> {
        if results.len() != self.signature.results.len() {
            return Err(Error::Domain(DomainError::ResultArityMismatch {
                declared: self.signature.results.len(),
                actual: results.len(),
            }));
        }
        for &result in results {
            self.graph.push_region_result(self.subregion, result)?;
        }

        let fn_ty = Type::Function(self.signature.clone());
        let output = self
            .graph
            .push_node_output(self.node, PortType::Value(Type::pointer(fn_ty)));

        self.graph.install_structural_kind(
            self.node,
            StructuralKind::Lambda(LambdaData {
                subregion: self.subregion,
                num_context_vars: self.context_vars.len(),
                num_params: self.params.len(),
                signature: self.signature,
                finalized: true,
            }),
        );
        log::trace!(target: "rvsdg::graph", "finalized lambda node {}", self.node);
        Ok(output)
    }
}
