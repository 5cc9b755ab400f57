//! Typed endpoints: [`Output`]s (value-producing) and [`Input`]s
//! (value-consuming). The input-output relation is the sole edge relation of
//! the graph (spec §3, "Port"/"Output"/"Input").

use smallvec::SmallVec;

use crate::{
    ids::{InputId, NodeId, OutputId, RegionId},
    types::PortType,
};

/// Where an [`OutputData`] is defined: a node result, or a region argument
/// (the value flowing into a region from its parent structural node).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputOwner {
    Node(NodeId, u16),
    RegionArgument(RegionId, u16),
}

/// Where an [`InputData`] is consumed: a node operand, or a region result
/// (the value flowing out of a region to its parent structural node).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOwner {
    Node(NodeId, u16),
    RegionResult(RegionId, u16),
}

/// A unique value-producing endpoint. Single-assignment: the defining site
/// never changes after creation, though an input may be redirected to point
/// at a *different* existing output.
#[derive(Debug)]
pub struct OutputData {
    pub ty: PortType,
    pub owner: OutputOwner,
    pub(crate) users: SmallVec<[InputId; 4]>,
}

impl OutputData {
    pub fn users(&self) -> &[InputId] {
        &self.users
    }

    pub fn has_users(&self) -> bool {
        !self.users.is_empty()
    }
}

/// A value-consuming endpoint with exactly one origin.
#[derive(Debug)]
pub struct InputData {
    pub ty: PortType,
    pub(crate) origin: OutputId,
    pub owner: InputOwner,
}

impl InputData {
    pub fn origin(&self) -> OutputId {
        self.origin
    }
}
