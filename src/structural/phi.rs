//! Phi: a mutual recursion group (spec §3, "Phi").

use smallvec::SmallVec;

use crate::{
    error::{DomainError, Error, Result},
    ids::{NodeId, OutputId, RegionId},
    ir::Graph,
    structural::{PhiData, StructuralKind},
    types::{PortType, Type},
};

/// Builds a phi node: context variables captured from the enclosing region,
/// plus `n` recursion variables. Each recursion variable has a subregion
/// argument (how members of the group call each other), a subregion result
/// (its actual definition), and an outside output (how callers outside the
/// group see it).
pub struct PhiBuilder<'g> {
    graph: &'g mut Graph,
    node: NodeId,
    subregion: RegionId,
    context_vars: Vec<OutputId>,
    recursion_vars: Vec<OutputId>,
    recursion_var_types: Vec<PortType>,
}

impl Graph {
    /// Begins construction of a phi node in `region`. `recursion_var_types`
    /// fixes the group's arity and each member's type up front (typically
    /// function-pointer types, one per mutually recursive definition).
    pub fn create_phi(
        &mut self,
        region: RegionId,
        context_var_origins: &[OutputId],
        recursion_var_types: &[Type],
    ) -> Result<PhiBuilder<'_>> {
        let node = self.reserve_structural_node(region);
        let subregion = self.new_region(node);

        let mut context_vars = Vec::with_capacity(context_var_origins.len());
        for &origin in context_var_origins {
            self.push_node_input(node, origin)?;
            let ty = self.output(origin).ty.clone();
            context_vars.push(self.push_region_argument(subregion, ty));
        }

        let mut recursion_vars = Vec::with_capacity(recursion_var_types.len());
        let mut types = Vec::with_capacity(recursion_var_types.len());
        for ty in recursion_var_types {
            let port_ty = PortType::Value(Type::pointer(ty.clone()));
            recursion_vars.push(self.push_region_argument(subregion, port_ty.clone()));
            types.push(port_ty);
        }

        Ok(PhiBuilder {
            graph: self,
            node,
            subregion,
            context_vars,
            recursion_vars,
            recursion_var_types: types,
        })
    }
}

impl<'g> PhiBuilder<'g> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn subregion(&self) -> RegionId {
        self.subregion
    }

    pub fn context_var(&self, index: usize) -> OutputId {
        self.context_vars[index]
    }

    /// The subregion argument members of the group use to call recursion
    /// variable `index` (i.e. to call each other, including themselves).
    pub fn recursion_var(&self, index: usize) -> OutputId {
        self.recursion_vars[index]
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        self.graph
    }

    /// Finalizes the phi. `definitions[i]` is recursion variable `i`'s actual
    /// definition (e.g. a lambda's output), wired in as the subregion's `i`th
    /// result. Returns one outside-use output per recursion variable.
    pub fn finalize(self, definitions: &[OutputId]) -> Result<SmallVec<[OutputId; 4]>> {
        if definitions.len() != self.recursion_var_types.len() {
            return Err(Error::Domain(DomainError::ResultArityMismatch {
                declared: self.recursion_var_types.len(),
                actual: definitions.len(),
            }));
        }
        for (i, (&def, expected)) in definitions
            .iter()
            .zip(self.recursion_var_types.iter())
            .enumerate()
        {
            let actual = self.graph.output(def).ty.clone();
            if actual != *expected {
                return Err(Error::Domain(DomainError::OperandTypeMismatch {
                    op: "phi",
                    index: i,
                    expected: expected.clone(),
                    actual,
                }));
            }
            self.graph.push_region_result(self.subregion, def)?;
        }

        let mut outputs = SmallVec::new();
        for ty in self.recursion_var_types.iter().cloned() {
            outputs.push(self.graph.push_node_output(self.node, ty));
        }

        self.graph.install_structural_kind(
            self.node,
            StructuralKind::Phi(PhiData {
                subregion: self.subregion,
                num_context_vars: self.context_vars.len(),
                num_recursion_vars: self.recursion_vars.len(),
                finalized: true,
            }),
        );
        log::trace!(target: "rvsdg::graph", "finalized phi node {}", self.node);
        Ok(outputs)
    }
}
