//! Delta: a global datum (spec §3, "Delta").

use crate::{
    error::{DomainError, Error, Result},
    ids::{NodeId, OutputId, RegionId},
    ir::Graph,
    structural::{DeltaData, StructuralKind},
    types::{PortType, Type},
};

/// Builds a delta node: a subregion that computes a constant value of
/// `value_type`, context variables captured from the enclosing region, and
/// one output naming the datum by its address.
pub struct DeltaBuilder<'g> {
    graph: &'g mut Graph,
    node: NodeId,
    subregion: RegionId,
    value_type: Type,
    context_vars: Vec<OutputId>,
}

impl Graph {
    /// Begins construction of a delta node in `region`, computing a datum of
    /// `value_type`.
    pub fn create_delta(
        &mut self,
        region: RegionId,
        value_type: Type,
        context_var_origins: &[OutputId],
    ) -> Result<DeltaBuilder<'_>> {
        let node = self.reserve_structural_node(region);
        let subregion = self.new_region(node);

        let mut context_vars = Vec::with_capacity(context_var_origins.len());
        for &origin in context_var_origins {
            self.push_node_input(node, origin)?;
            let ty = self.output(origin).ty.clone();
            context_vars.push(self.push_region_argument(subregion, ty));
        }

        Ok(DeltaBuilder {
            graph: self,
            node,
            subregion,
            value_type,
            context_vars,
        })
    }
}

impl<'g> DeltaBuilder<'g> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn subregion(&self) -> RegionId {
        self.subregion
    }

    pub fn context_var(&self, index: usize) -> OutputId {
        self.context_vars[index]
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        self.graph
    }

    /// Finalizes the delta, wiring `value` in as the subregion's sole
    /// result. Returns a pointer-typed output naming the datum.
    pub fn finalize(self, value: OutputId) -> Result<OutputId> {
        let actual = self.graph.output(value).ty.clone();
        let expected = PortType::Value(self.value_type.clone());
        if actual != expected {
            return Err(Error::Domain(DomainError::OperandTypeMismatch {
                op: "delta",
                index: 0,
                expected,
                actual,
            }));
        }
        self.graph.push_region_result(self.subregion, value)?;

        let output = self
            .graph
            .push_node_output(self.node, PortType::Value(Type::pointer(self.value_type.clone())));

        self.graph.install_structural_kind(
            self.node,
            StructuralKind::Delta(DeltaData {
                subregion: self.subregion,
                num_context_vars: self.context_vars.len(),
                finalized: true,
            }),
        );
        log::trace!(target: "rvsdg::graph", "finalized delta node {}", self.node);
        Ok(output)
    }
}
