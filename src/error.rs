//! Error categories for the RVSDG core, per the four classes in the error
//! handling design: domain errors, invariant violations, unimplemented
//! provisioning/optimization cases, and (elsewhere, not modeled here)
//! external errors owned by the frontend/driver.

use crate::types::PortType;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors raised by the construction and rewriting API.
///
/// The core prefers failing fast at construction over producing an unsound
/// graph: domain errors abort the construction call that triggered them,
/// leaving the partially built graph unusable. Invariant violations are
/// raised by passes that detect a broken precondition and indicate a bug in
/// the pass, not in the input program.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed construction: wrong port count, type mismatch, finalizing a
    /// structural node whose results live in the wrong region, etc.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// An invariant that must hold between rewrites was found to be broken.
    /// This is always a bug in whichever pass last touched the graph.
    #[error("invariant violation: {0}")]
    InvariantViolation(#[from] InvariantViolation),

    /// A code path whose analysis is deliberately not implemented was taken.
    /// The provider aborts deterministically instead of guessing at a
    /// possibly-unsound answer.
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("operation {op} expects {expected} operand(s), got {actual}")]
    OperandCountMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("operand {index} of {op} expects type {expected:?}, got {actual:?}")]
    OperandTypeMismatch {
        op: &'static str,
        index: usize,
        expected: PortType,
        actual: PortType,
    },

    #[error(
        "cannot redirect input to an output of type {actual:?}, expected {expected:?}"
    )]
    OriginTypeMismatch { expected: PortType, actual: PortType },

    #[error("region result arity mismatch: region declares {declared}, got {actual}")]
    ResultArityMismatch { declared: usize, actual: usize },

    #[error("cannot finalize: result origin lives outside the node's own subregion")]
    ResultRegionMismatch,

    #[error("structural node is already finalized; its shape is immutable")]
    AlreadyFinalized,

    #[error("gamma subregions must all produce the same result arity")]
    GammaSubregionArityMismatch,

    #[error("theta subregion arguments must match its results in type and count")]
    ThetaArityMismatch,

    #[error("theta's final result must be a control-typed exit predicate")]
    ThetaMissingPredicate,
}

#[derive(Debug, thiserror::Error)]
pub enum InvariantViolation {
    #[error("origin region does not dominate consuming region")]
    NonDominatingOrigin,

    #[error("node deletion requested while outputs still have consumers")]
    NodeStillHasConsumers,

    #[error("state-typed output has more than one non-merge consumer")]
    StateEdgeForked,

    #[error("structural node shape changed after finalization")]
    ShapeChangedAfterFinalization,
}
