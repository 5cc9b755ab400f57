//! Optimization passes (spec §4.7): a library of semantics-preserving
//! rewrites over an RVSDG, each implementing [`crate::pass::Pass`] so a
//! [`crate::pass::PassManager`] can compose them in any order.
//!
//! [`clone_region`] is shared rewriting machinery rather than a pass itself
//! (no [`crate::pass::Pass`] impl, nothing registered with the driver); it
//! backs both [`inlining`] (splice a callee's body into its caller) and
//! [`loop_unrolling`] (replicate a theta's body `k` times).

pub mod clone_region;
pub mod common_node_elimination;
pub mod dead_node_elimination;
pub mod inlining;
pub mod invariant_redirection;
pub mod loop_unrolling;
pub mod pull_in;
pub mod push_out;
pub mod reductions;
pub mod theta_gamma_inversion;

pub use common_node_elimination::CommonNodeElimination;
pub use dead_node_elimination::DeadNodeElimination;
pub use inlining::Inlining;
pub use invariant_redirection::InvariantRedirection;
pub use loop_unrolling::LoopUnrolling;
pub use pull_in::PullIn;
pub use push_out::PushOut;
pub use reductions::NodeReductions;
pub use theta_gamma_inversion::ThetaGammaInversion;
