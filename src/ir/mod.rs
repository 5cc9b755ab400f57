//! The graph substrate: regions, nodes, typed ports, and the edges between
//! them (spec §3, §4.1).

mod graph;
mod node;
mod port;
mod region;

pub use self::{
    graph::{ExportDecl, Graph, ImportDecl, StructDecl},
    node::{NodeData, NodeKind},
    port::{InputData, InputOwner, OutputData, OutputOwner},
    region::RegionData,
};
