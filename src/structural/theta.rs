//! Theta: a tail-controlled loop (spec §3, "Theta").

use smallvec::SmallVec;

use crate::{
    error::{DomainError, Error, Result},
    ids::{NodeId, OutputId, RegionId},
    ir::Graph,
    structural::{StructuralKind, ThetaData},
    types::{PortType, StateType},
};

/// Builds a theta node: one subregion whose arguments are the loop-carried
/// variables on entry and whose results are those same variables' values at
/// the end of one iteration, plus a trailing control predicate choosing
/// `continue` or `exit`.
pub struct ThetaBuilder<'g> {
    graph: &'g mut Graph,
    node: NodeId,
    subregion: RegionId,
    loop_var_types: SmallVec<[PortType; 4]>,
}

impl Graph {
    /// Begins construction of a theta node in `region`, seeded with
    /// `loop_var_origins` as the loop-carried variables' initial values.
    pub fn create_theta(
        &mut self,
        region: RegionId,
        loop_var_origins: &[OutputId],
    ) -> Result<ThetaBuilder<'_>> {
        let node = self.reserve_structural_node(region);
        let subregion = self.new_region(node);

        let mut loop_var_types = SmallVec::new();
        for &origin in loop_var_origins {
            self.push_node_input(node, origin)?;
            let ty = self.output(origin).ty.clone();
            self.push_region_argument(subregion, ty.clone());
            loop_var_types.push(ty);
        }

        Ok(ThetaBuilder {
            graph: self,
            node,
            subregion,
            loop_var_types,
        })
    }
}

impl<'g> ThetaBuilder<'g> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn subregion(&self) -> RegionId {
        self.subregion
    }

    pub fn loop_var(&self, index: usize) -> OutputId {
        self.graph.region(self.subregion).arguments()[index]
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        self.graph
    }

    /// Finalizes the theta. `results[i]` must carry the same type as
    /// `loop_var(i)`; `predicate` is the trailing control value (2
    /// alternatives: continue, exit) appended as the subregion's final
    /// result.
    pub fn finalize(
        self,
        results: &[OutputId],
        predicate: OutputId,
    ) -> Result<SmallVec<[OutputId; 4]>> {
        if results.len() != self.loop_var_types.len() {
            return Err(Error::Domain(DomainError::ThetaArityMismatch));
        }
        for (i, (&result, expected)) in results.iter().zip(self.loop_var_types.iter()).enumerate()
        {
            let actual = self.graph.output(result).ty.clone();
            if actual != *expected {
                return Err(Error::Domain(DomainError::OperandTypeMismatch {
                    op: "theta",
                    index: i,
                    expected: expected.clone(),
                    actual,
                }));
            }
        }
        let predicate_ty = self.graph.output(predicate).ty.clone();
        if predicate_ty != PortType::State(StateType::Control(2)) {
            return Err(Error::Domain(DomainError::ThetaMissingPredicate));
        }

        for &result in results {
            self.graph.push_region_result(self.subregion, result)?;
        }
        self.graph.push_region_result(self.subregion, predicate)?;

        let mut outputs = SmallVec::new();
        for ty in self.loop_var_types.iter().cloned() {
            outputs.push(self.graph.push_node_output(self.node, ty));
        }

        self.graph.install_structural_kind(
            self.node,
            StructuralKind::Theta(ThetaData {
                subregion: self.subregion,
                num_loop_vars: outputs.len(),
                finalized: true,
            }),
        );
        log::trace!(target: "rvsdg::graph", "finalized theta node {}", self.node);
        Ok(outputs)
    }
}
