//! The graph substrate (spec §4.1): arena ownership, region/node/edge
//! construction, rewiring, and deletion, plus the invariant checks that make
//! those operations safe.

use core::cell::RefCell;

use compact_str::CompactString as SmallStr;
use cranelift_entity::PrimaryMap;
use smallvec::{smallvec, SmallVec};

use crate::{
    call_summary::CallSummary,
    error::{DomainError, Error, InvariantViolation, Result},
    ids::{InputId, NodeId, OutputId, RegionId, StructDeclId},
    ir::{
        node::{NodeData, NodeKind},
        port::{InputData, InputOwner, OutputData, OutputOwner},
        region::RegionData,
    },
    ops::Operation,
    structural::StructuralKind,
    types::PortType,
    FxHashMap,
};

/// A root-region argument imported from outside the module, with linkage
/// metadata (spec §6, "add imports and exports... with linkage metadata").
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub name: SmallStr,
    pub output: OutputId,
}

/// A root-region result exported to the outside world.
#[derive(Debug, Clone)]
pub struct ExportDecl {
    pub name: SmallStr,
    pub input: InputId,
}

/// A named struct declaration; recursive struct types reference other
/// declarations by id rather than unfolding into a cyclic value
/// representation (design note on recursive struct types).
#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: SmallStr,
}

/// The RVSDG, root region included. Owns every region, node, output, and
/// input reachable from the root; destroying the `Graph` releases them all
/// (spec §5, "resource discipline").
pub struct Graph {
    regions: PrimaryMap<RegionId, RegionData>,
    nodes: PrimaryMap<NodeId, NodeData>,
    outputs: PrimaryMap<OutputId, OutputData>,
    inputs: PrimaryMap<InputId, InputData>,
    struct_decls: PrimaryMap<StructDeclId, StructDecl>,
    root: RegionId,
    imports: Vec<ImportDecl>,
    exports: Vec<ExportDecl>,
    /// Per-lambda call-summary cache (spec §9, "call summary caching"); a
    /// `RefCell` because summaries are computed lazily behind `&self`
    /// queries but invalidated by `&mut self` rewrites.
    pub(crate) call_summaries: RefCell<FxHashMap<NodeId, CallSummary>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        let mut regions = PrimaryMap::new();
        let root = regions.push(RegionData::new(None));
        Self {
            regions,
            nodes: PrimaryMap::new(),
            outputs: PrimaryMap::new(),
            inputs: PrimaryMap::new(),
            struct_decls: PrimaryMap::new(),
            root,
            imports: Vec::new(),
            exports: Vec::new(),
            call_summaries: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn root(&self) -> RegionId {
        self.root
    }

    pub fn region(&self, id: RegionId) -> &RegionData {
        &self.regions[id]
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id]
    }

    pub fn output(&self, id: OutputId) -> &OutputData {
        &self.outputs[id]
    }

    pub fn input(&self, id: InputId) -> &InputData {
        &self.inputs[id]
    }

    pub fn imports(&self) -> &[ImportDecl] {
        &self.imports
    }

    pub fn exports(&self) -> &[ExportDecl] {
        &self.exports
    }

    pub fn declare_struct(&mut self, name: impl Into<SmallStr>) -> StructDeclId {
        self.struct_decls.push(StructDecl { name: name.into() })
    }

    pub fn struct_decl(&self, id: StructDeclId) -> &StructDecl {
        &self.struct_decls[id]
    }

    /// All nodes that currently exist in the arena, live and removed alike.
    /// Most callers want [`RegionData::nodes`] instead; this is used by the
    /// agnostic memory-node provider, which needs every allocation site in
    /// the whole program regardless of region nesting.
    pub fn all_node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys()
    }

    // -- Dominance -----------------------------------------------------

    fn output_region(&self, id: OutputId) -> RegionId {
        match self.outputs[id].owner {
            OutputOwner::Node(node, _) => self.nodes[node].region,
            OutputOwner::RegionArgument(region, _) => region,
        }
    }

    fn input_region(&self, id: InputId) -> RegionId {
        match self.inputs[id].owner {
            InputOwner::Node(node, _) => self.nodes[node].region,
            InputOwner::RegionResult(region, _) => region,
        }
    }

    /// Is `ancestor` the same region as `region`, or a structural ancestor
    /// of it? (spec §3 invariant 1: "Every input's origin belongs to a
    /// region that structurally dominates the input's region (ancestor,
    /// including equal)".)
    pub fn region_dominates(&self, ancestor: RegionId, region: RegionId) -> bool {
        let mut cur = region;
        loop {
            if cur == ancestor {
                return true;
            }
            match self.regions[cur].parent {
                Some(owner_node) => cur = self.nodes[owner_node].region,
                None => return false,
            }
        }
    }

    /// The chain of regions from `region` up to (and including) the root.
    pub fn region_ancestors(&self, region: RegionId) -> Vec<RegionId> {
        let mut chain = vec![region];
        let mut cur = region;
        while let Some(owner_node) = self.regions[cur].parent {
            cur = self.nodes[owner_node].region;
            chain.push(cur);
        }
        chain
    }

    // -- Imports / exports -----------------------------------------------

    pub fn add_import(&mut self, name: impl Into<SmallStr>, ty: PortType) -> OutputId {
        let output = self.push_region_argument(self.root, ty);
        self.imports.push(ImportDecl {
            name: name.into(),
            output,
        });
        output
    }

    pub fn add_export(&mut self, name: impl Into<SmallStr>, origin: OutputId) -> Result<InputId> {
        let input = self.push_region_result(self.root, origin)?;
        self.exports.push(ExportDecl {
            name: name.into(),
            input,
        });
        self.invalidate_call_summaries_touching(origin);
        Ok(input)
    }

    // -- Construction: simple nodes -----------------------------------

    /// Creates a simple node wrapping `op`, reading from `origins`. The
    /// operation's signature determines output arity/types; every origin
    /// must live in a region that dominates `region` (spec §4.1).
    pub fn create_node(
        &mut self,
        region: RegionId,
        op: Operation,
        origins: &[OutputId],
    ) -> Result<NodeId> {
        let operand_types: SmallVec<[PortType; 4]> =
            origins.iter().map(|&o| self.outputs[o].ty.clone()).collect();
        let result_types = op.signature(&operand_types).map_err(Error::from)?;

        for &origin in origins {
            let origin_region = self.output_region(origin);
            if !self.region_dominates(origin_region, region) {
                return Err(Error::InvariantViolation(
                    InvariantViolation::NonDominatingOrigin,
                ));
            }
        }

        let name = op.name();
        let node_id = self.nodes.push(NodeData {
            region,
            kind: NodeKind::Pending,
            inputs: SmallVec::new(),
            outputs: SmallVec::new(),
            removed: false,
        });

        let mut inputs = SmallVec::new();
        for (i, (&origin, ty)) in origins.iter().zip(operand_types.into_iter()).enumerate() {
            let input_id = self.inputs.push(InputData {
                ty,
                origin,
                owner: InputOwner::Node(node_id, i as u16),
            });
            self.outputs[origin].users.push(input_id);
            inputs.push(input_id);
        }

        let mut outputs = SmallVec::new();
        for (i, ty) in result_types.into_iter().enumerate() {
            let output_id = self.outputs.push(OutputData {
                ty,
                owner: OutputOwner::Node(node_id, i as u16),
                users: smallvec![],
            });
            outputs.push(output_id);
        }

        let node = &mut self.nodes[node_id];
        node.kind = NodeKind::Simple(op);
        node.inputs = inputs;
        node.outputs = outputs;
        self.regions[region].nodes.push(node_id);

        log::trace!(target: "rvsdg::graph", "created {name} node {node_id}");
        Ok(node_id)
    }

    // -- Rewiring / deletion ---------------------------------------------

    /// Replaces `input`'s origin with `new_origin`. Both the port type and
    /// dominance invariants are re-checked, since a rewrite may otherwise
    /// silently produce an unsound graph.
    pub fn redirect_input(&mut self, input: InputId, new_origin: OutputId) -> Result<()> {
        let expected = self.inputs[input].ty.clone();
        let actual = self.outputs[new_origin].ty.clone();
        if expected != actual {
            return Err(Error::Domain(DomainError::OriginTypeMismatch { expected, actual }));
        }

        let consumer_region = self.input_region(input);
        let origin_region = self.output_region(new_origin);
        if !self.region_dominates(origin_region, consumer_region) {
            return Err(Error::InvariantViolation(
                InvariantViolation::NonDominatingOrigin,
            ));
        }

        let old_origin = self.inputs[input].origin;
        if old_origin == new_origin {
            return Ok(());
        }
        self.outputs[old_origin].users.retain(|&u| u != input);
        self.outputs[new_origin].users.push(input);
        self.inputs[input].origin = new_origin;

        self.invalidate_call_summaries_touching(old_origin);
        self.invalidate_call_summaries_touching(new_origin);
        Ok(())
    }

    /// Removes a node whose outputs have no remaining consumers (spec §4.1).
    /// Detaches its inputs from their origins' user lists and drops it from
    /// its region's node list; the arena slot itself is retained (see the
    /// design note on arena ownership).
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if self.nodes[node].outputs.iter().any(|o| self.outputs[*o].has_users()) {
            return Err(Error::InvariantViolation(
                InvariantViolation::NodeStillHasConsumers,
            ));
        }

        let inputs = self.nodes[node].inputs.clone();
        for input in &inputs {
            let origin = self.inputs[*input].origin;
            self.outputs[origin].users.retain(|&u| u != *input);
            self.invalidate_call_summaries_touching(origin);
        }

        let region = self.nodes[node].region;
        self.regions[region].nodes.retain(|&n| n != node);
        self.nodes[node].removed = true;
        log::trace!(target: "rvsdg::graph", "removed node {node}");
        Ok(())
    }

    // -- Construction: regions, arguments, results (used by structural
    //    node builders) -------------------------------------------------

    pub(crate) fn reserve_structural_node(&mut self, region: RegionId) -> NodeId {
        self.nodes.push(NodeData {
            region,
            kind: NodeKind::Pending,
            inputs: SmallVec::new(),
            outputs: SmallVec::new(),
            removed: false,
        })
    }

    pub(crate) fn install_structural_kind(&mut self, node: NodeId, kind: StructuralKind) {
        self.nodes[node].kind = NodeKind::Structural(kind);
        let region = self.nodes[node].region;
        self.regions[region].nodes.push(node);
    }

    pub(crate) fn new_region(&mut self, parent: NodeId) -> RegionId {
        self.regions.push(RegionData::new(Some(parent)))
    }

    pub(crate) fn push_region_argument(&mut self, region: RegionId, ty: PortType) -> OutputId {
        let index = self.regions[region].arguments.len() as u16;
        let output = self.outputs.push(OutputData {
            ty,
            owner: OutputOwner::RegionArgument(region, index),
            users: smallvec![],
        });
        self.regions[region].arguments.push(output);
        output
    }

    /// A region's results must read values actually computed *within* that
    /// region (one of its own nodes' outputs, or a pass-through of one of
    /// its own arguments) — not merely a value from some dominating
    /// ancestor region, which would skip the context-variable protocol that
    /// surfaces outer values as this region's own arguments. This is
    /// stricter than the general dominance check `redirect_input` performs
    /// on ordinary operand rewiring (spec §8, "Finalizing a lambda whose
    /// result belongs to the root region... fails with a region-mismatch
    /// error").
    pub(crate) fn push_region_result(&mut self, region: RegionId, origin: OutputId) -> Result<InputId> {
        let origin_region = self.output_region(origin);
        if origin_region != region {
            return Err(Error::Domain(DomainError::ResultRegionMismatch));
        }
        let index = self.regions[region].results.len() as u16;
        let ty = self.outputs[origin].ty.clone();
        let input = self.inputs.push(InputData {
            ty,
            origin,
            owner: InputOwner::RegionResult(region, index),
        });
        self.outputs[origin].users.push(input);
        self.regions[region].results.push(input);
        Ok(input)
    }

    /// Appends an output to an already-reserved structural node (used while
    /// a builder is assembling context variables, before the node's
    /// [`StructuralKind`] is installed).
    pub(crate) fn push_node_output(&mut self, node: NodeId, ty: PortType) -> OutputId {
        let index = self.nodes[node].outputs.len() as u16;
        let output = self.outputs.push(OutputData {
            ty,
            owner: OutputOwner::Node(node, index),
            users: smallvec![],
        });
        self.nodes[node].outputs.push(output);
        output
    }

    /// Appends an operand input to an already-reserved structural node,
    /// reading from `origin` (used for context variables: the outer value a
    /// lambda/gamma/theta/phi/delta captures from its enclosing region).
    pub(crate) fn push_node_input(&mut self, node: NodeId, origin: OutputId) -> Result<InputId> {
        let consumer_region = self.nodes[node].region;
        let origin_region = self.output_region(origin);
        if !self.region_dominates(origin_region, consumer_region) {
            return Err(Error::InvariantViolation(
                InvariantViolation::NonDominatingOrigin,
            ));
        }
        let index = self.nodes[node].inputs.len() as u16;
        let ty = self.outputs[origin].ty.clone();
        let input = self.inputs.push(InputData {
            ty,
            origin,
            owner: InputOwner::Node(node, index),
        });
        self.outputs[origin].users.push(input);
        self.nodes[node].inputs.push(input);
        Ok(input)
    }

    pub(crate) fn structural_mut(&mut self, node: NodeId) -> &mut StructuralKind {
        self.nodes[node]
            .as_structural_mut()
            .expect("node is not a structural node")
    }

    // -- Call-summary cache invalidation -----------------------------------

    /// Coarse invalidation policy (spec §9): if `origin` is a lambda's
    /// function-pointer output, drop its cached summary, since some rewrite
    /// just added/removed/redirected one of its users.
    pub(crate) fn invalidate_call_summaries_touching(&mut self, origin: OutputId) {
        if let OutputOwner::Node(node, _) = self.outputs[origin].owner {
            if matches!(self.nodes[node].as_structural(), Some(StructuralKind::Lambda(_))) {
                self.call_summaries.borrow_mut().remove(&node);
            }
        }
    }

    /// Drops every cached call summary. Conservative fallback used by passes
    /// (e.g. inlining) that touch an unbounded number of lambdas' users.
    pub fn invalidate_all_call_summaries(&mut self) {
        self.call_summaries.borrow_mut().clear();
    }
}
