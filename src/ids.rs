//! Arena index types for the graph substrate.
//!
//! The RVSDG is a DAG by construction, but a node's inputs reference values
//! that may live in enclosing regions, and passes insert and delete nodes
//! continuously; tracking that with ordinary references would fight the
//! borrow checker for no benefit. Per the "arena-with-indices" design note,
//! every region, node, output, and input is instead stored in a
//! [`cranelift_entity::PrimaryMap`] and referred to everywhere else by a
//! small `Copy` index newtype, the same idiom `cranelift-codegen`'s egraph
//! representation uses for its `Id` type.

use cranelift_entity::entity_impl;

/// Identifies a [`crate::ir::Region`] within a [`crate::ir::Graph`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(u32);
entity_impl!(RegionId, "region");

/// Identifies a [`crate::ir::Node`] within a [`crate::ir::Graph`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);
entity_impl!(NodeId, "node");

/// Identifies an [`crate::ir::Output`]: a unique value-producing endpoint,
/// either a node's result or a region's argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(u32);
entity_impl!(OutputId, "out");

/// Identifies an [`crate::ir::Input`]: a value-consuming endpoint, either a
/// node's operand or a region's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputId(u32);
entity_impl!(InputId, "in");

/// Identifies a named struct declaration (see design note on recursive
/// struct types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructDeclId(u32);
entity_impl!(StructDeclId, "struct");
