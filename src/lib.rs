//! A Regionalized Value State Dependency Graph (RVSDG): a hierarchical,
//! data-flow oriented intermediate representation and the rewrites that
//! optimize it.
//!
//! The crate is organized the way the IR itself is layered: [`types`] and
//! [`ops`] describe what a node can carry and compute; [`ir`] is the graph
//! substrate (arenas, regions, ports, edges) that [`structural`] builds
//! lambda/gamma/theta/phi/delta nodes on top of; [`traversal`],
//! [`call_summary`] and [`points_to`] are read-only analyses;
//! [`provisioning`] turns a points-to graph into concrete memory-state
//! wiring; [`pass`] and [`opt`] are the optimizing rewrites themselves.

pub mod call_summary;
pub mod error;
pub mod ids;
pub mod ir;
pub mod opt;
pub mod ops;
pub mod pass;
pub mod points_to;
pub mod provisioning;
pub mod structural;
pub mod traversal;
pub mod types;

pub use error::{Error, Result};
pub use ir::Graph;

pub(crate) type FxHashMap<K, V> = hashbrown::HashMap<K, V, rustc_hash::FxBuildHasher>;
pub(crate) type FxHashSet<T> = hashbrown::HashSet<T, rustc_hash::FxBuildHasher>;
