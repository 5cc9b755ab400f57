//! Structural nodes: lambda, gamma, theta, phi, delta (spec §3). Each owns
//! one or more subregions and a context-variable protocol linking outer
//! outputs to inner region arguments.

mod delta;
mod gamma;
mod lambda;
mod phi;
mod theta;

pub use self::{
    delta::DeltaBuilder, gamma::GammaBuilder, lambda::LambdaBuilder, phi::PhiBuilder,
    theta::ThetaBuilder,
};

use crate::{ids::RegionId, types::FunctionType};

/// The kind-specific data carried by a structural node, beyond the common
/// subregion(s)/context-variable bookkeeping the graph substrate already
/// tracks via each subregion's argument/result lists.
///
/// A structural node's shape (context-variable count, formal-argument count,
/// recursion-variable count) is fixed once `finalized` is set; after that
/// only edge origins may be redirected and nodes deleted (spec §3 invariant
/// 4, "Lifecycle").
#[derive(Debug)]
pub enum StructuralKind {
    Lambda(LambdaData),
    Gamma(GammaData),
    Theta(ThetaData),
    Phi(PhiData),
    Delta(DeltaData),
}

impl StructuralKind {
    pub fn subregions(&self) -> &[RegionId] {
        match self {
            StructuralKind::Lambda(d) => core::slice::from_ref(&d.subregion),
            StructuralKind::Gamma(d) => &d.subregions,
            StructuralKind::Theta(d) => core::slice::from_ref(&d.subregion),
            StructuralKind::Phi(d) => core::slice::from_ref(&d.subregion),
            StructuralKind::Delta(d) => core::slice::from_ref(&d.subregion),
        }
    }

    pub fn is_finalized(&self) -> bool {
        match self {
            StructuralKind::Lambda(d) => d.finalized,
            StructuralKind::Gamma(d) => d.finalized,
            StructuralKind::Theta(d) => d.finalized,
            StructuralKind::Phi(d) => d.finalized,
            StructuralKind::Delta(d) => d.finalized,
        }
    }

    pub fn as_lambda(&self) -> Option<&LambdaData> {
        match self {
            StructuralKind::Lambda(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_gamma(&self) -> Option<&GammaData> {
        match self {
            StructuralKind::Gamma(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_theta(&self) -> Option<&ThetaData> {
        match self {
            StructuralKind::Theta(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_phi(&self) -> Option<&PhiData> {
        match self {
            StructuralKind::Phi(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_delta(&self) -> Option<&DeltaData> {
        match self {
            StructuralKind::Delta(d) => Some(d),
            _ => None,
        }
    }
}

/// One subregion. Context variables are captured from the enclosing region
/// and surfaced as the first `num_context_vars` subregion arguments; formal
/// function arguments follow as the remaining `num_params` arguments. The
/// subregion's results are the function's results. A lambda has exactly one
/// output: a value of function-pointer type.
#[derive(Debug)]
pub struct LambdaData {
    pub subregion: RegionId,
    pub num_context_vars: usize,
    pub num_params: usize,
    pub signature: FunctionType,
    pub(crate) finalized: bool,
}

/// One control-typed predicate input selecting among `subregions.len()`
/// subregions, plus that many entry values replicated into each subregion as
/// arguments. Each subregion produces the same number of results; the gamma
/// has that many outputs.
#[derive(Debug)]
pub struct GammaData {
    pub subregions: Vec<RegionId>,
    pub num_entry_vars: usize,
    pub(crate) finalized: bool,
}

/// A tail-controlled loop: the subregion's arguments match its results in
/// type and count (the loop-carried variables); the subregion's last result
/// is a control value with alternatives `{continue, exit}`.
#[derive(Debug)]
pub struct ThetaData {
    pub subregion: RegionId,
    pub num_loop_vars: usize,
    pub(crate) finalized: bool,
}

/// A mutual recursion group: context variables plus recursion variables.
/// Each recursion variable has a subregion argument (inside uses), a
/// subregion result (inside definition), and an outside output (outside
/// use).
#[derive(Debug)]
pub struct PhiData {
    pub subregion: RegionId,
    pub num_context_vars: usize,
    pub num_recursion_vars: usize,
    pub(crate) finalized: bool,
}

/// A global datum: a subregion that computes a constant value, context
/// variables captured from the enclosing region, and one output of pointer
/// type naming the datum.
#[derive(Debug)]
pub struct DeltaData {
    pub subregion: RegionId,
    pub num_context_vars: usize,
    pub(crate) finalized: bool,
}
