//! Gamma: a multi-way branch over `n` subregions (spec §3, "Gamma").

use smallvec::SmallVec;

use crate::{
    error::{DomainError, Error, Result},
    ids::{NodeId, OutputId, RegionId},
    ir::Graph,
    structural::{GammaData, StructuralKind},
    types::{PortType, StateType},
};

/// Builds a gamma node: a control-typed predicate selects one of
/// `num_alternatives` subregions to execute, each seeded with the same entry
/// variables and required to produce the same result arity.
pub struct GammaBuilder<'g> {
    graph: &'g mut Graph,
    node: NodeId,
    subregions: Vec<RegionId>,
    num_entry_vars: usize,
}

impl Graph {
    /// Begins construction of a gamma node in `region`. `predicate` must be a
    /// `control(num_alternatives)`-typed value selecting the active
    /// subregion; `entry_var_origins` are replicated as arguments into every
    /// subregion in the same order.
    pub fn create_gamma(
        &mut self,
        region: RegionId,
        predicate: OutputId,
        num_alternatives: u32,
        entry_var_origins: &[OutputId],
    ) -> Result<GammaBuilder<'_>> {
        let predicate_ty = self.output(predicate).ty.clone();
        if predicate_ty != PortType::State(StateType::Control(num_alternatives)) {
            return Err(Error::Domain(DomainError::OperandTypeMismatch {
                op: "gamma",
                index: 0,
                expected: PortType::State(StateType::Control(num_alternatives)),
                actual: predicate_ty,
            }));
        }

        let node = self.reserve_structural_node(region);
        self.push_node_input(node, predicate)?;

        let mut subregions = Vec::with_capacity(num_alternatives as usize);
        for _ in 0..num_alternatives {
            let subregion = self.new_region(node);
            for &origin in entry_var_origins {
                self.push_node_input(node, origin)?;
                let ty = self.output(origin).ty.clone();
                self.push_region_argument(subregion, ty);
            }
            subregions.push(subregion);
        }

        Ok(GammaBuilder {
            graph: self,
            node,
            subregions,
            num_entry_vars: entry_var_origins.len(),
        })
    }
}

impl<'g> GammaBuilder<'g> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn subregion(&self, alternative: usize) -> RegionId {
        self.subregions[alternative]
    }

    /// The entry-variable argument surfaced in `alternative`'s subregion.
    pub fn entry_var(&self, alternative: usize, index: usize) -> OutputId {
        self.graph.region(self.subregions[alternative]).arguments()[index]
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        self.graph
    }

    /// Finalizes the gamma. `results[i]` is the list of result origins
    /// produced by subregion `i`; every subregion must contribute the same
    /// number of results, and corresponding results across subregions must
    /// agree in type (the value observed outside does not depend on which
    /// alternative ran).
    pub fn finalize(self, results: &[Vec<OutputId>]) -> Result<SmallVec<[OutputId; 4]>> {
        if results.len() != self.subregions.len() {
            return Err(Error::Domain(DomainError::GammaSubregionArityMismatch));
        }
        let arity = results[0].len();
        if results.iter().any(|r| r.len() != arity) {
            return Err(Error::Domain(DomainError::GammaSubregionArityMismatch));
        }

        let mut result_types: Vec<PortType> = Vec::with_capacity(arity);
        for (subregion, origins) in self.subregions.iter().zip(results.iter()) {
            for (i, &origin) in origins.iter().enumerate() {
                let ty = self.graph.output(origin).ty.clone();
                match result_types.get(i) {
                    Some(expected) if *expected != ty => {
                        return Err(Error::Domain(DomainError::OperandTypeMismatch {
                            op: "gamma",
                            index: i,
                            expected: expected.clone(),
                            actual: ty,
                        }));
                    }
                    Some(_) => {}
                    None => result_types.push(ty),
                }
                self.graph.push_region_result(*subregion, origin)?;
            }
        }

        let mut outputs = SmallVec::new();
        for ty in result_types {
            outputs.push(self.graph.push_node_output(self.node, ty));
        }

        self.graph.install_structural_kind(
            self.node,
            StructuralKind::Gamma(GammaData {
                subregions: self.subregions,
                num_entry_vars: self.num_entry_vars,
                finalized: true,
            }),
        );
        log::trace!(target: "rvsdg::graph", "finalized gamma node {}", self.node);
        Ok(outputs)
    }
}
