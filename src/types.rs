//! The RVSDG type system: value types (bitstrings, pointers, arrays, structs,
//! function signatures) and state types (io, memory, loop, control-N).
//!
//! Types are compared structurally, except that two struct types with the
//! same declared name refer to the same declaration (see design note on
//! recursive struct types) rather than being unfolded and compared field by
//! field, which would diverge on recursive layouts.

use compact_str::CompactString as SmallStr;

/// A value-carrying type: the type of a register/output in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// A fixed-width bitstring, e.g. `bit(32)` for a 32-bit integer.
    Bit(u32),
    /// A pointer to a value of the given element type.
    Pointer(Box<Type>),
    /// A fixed-length array of a homogeneous element type.
    Array(u64, Box<Type>),
    /// A (possibly named) aggregate of heterogeneously typed fields.
    Struct(StructType),
    /// A function signature: argument and result types. The function
    /// *value* itself (as produced by a lambda) is always `Function`, never
    /// something a simple node operates on bit-for-bit.
    Function(FunctionType),
    /// A control-flow selector produced by `match` / gamma predicates that is
    /// not (yet) promoted to a state type; carries the same alternative
    /// count as `StateType::Control`. Present so value-typed predicates can
    /// be folded like any other value before being consumed by a gamma.
    Control(u32),
}

impl Type {
    pub fn bit(width: u32) -> Self {
        Type::Bit(width)
    }

    pub fn pointer(elem: Type) -> Self {
        Type::Pointer(Box::new(elem))
    }

    pub fn array(len: u64, elem: Type) -> Self {
        Type::Array(len, Box::new(elem))
    }

    /// The canonical 1-bit boolean type used by comparison operations.
    pub fn bool() -> Self {
        Type::Bit(1)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn as_bit_width(&self) -> Option<u32> {
        match self {
            Type::Bit(n) => Some(*n),
            _ => None,
        }
    }
}

/// A named or anonymous struct declaration. Structs with the same `name`
/// refer to the same declaration: equality on `StructType` with a `name`
/// compares only the name, not the (possibly still being constructed, or
/// recursively referencing) field list. Anonymous structs (`name: None`)
/// compare their field lists structurally.
#[derive(Debug, Clone)]
pub struct StructType {
    pub name: Option<SmallStr>,
    pub packed: bool,
    pub fields: Vec<Type>,
}

impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.packed == other.packed && self.fields == other.fields,
            _ => false,
        }
    }
}
impl Eq for StructType {}
impl core::hash::Hash for StructType {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        match &self.name {
            Some(name) => name.hash(state),
            None => {
                self.packed.hash(state);
                self.fields.hash(state);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub args: Vec<Type>,
    pub results: Vec<Type>,
}

/// A state-carrying type: threads a linear, single-consumer edge through the
/// graph to express ordering of effects (memory, I/O) or control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateType {
    /// External, opaque I/O effects (syscalls, observable side effects).
    Io,
    /// Abstract machine memory, threaded by loads/stores/calls.
    Memory,
    /// The control token threaded around a theta's tail-controlled loop.
    Loop,
    /// A control value selecting among `n` alternatives (predicates/matches).
    Control(u32),
}

/// A port's carried type: either a value type or a state type. Every input
/// and output of every node carries exactly one `PortType`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortType {
    Value(Type),
    State(StateType),
}

impl PortType {
    pub fn value(ty: Type) -> Self {
        PortType::Value(ty)
    }

    pub fn state(ty: StateType) -> Self {
        PortType::State(ty)
    }

    pub fn is_state(&self) -> bool {
        matches!(self, PortType::State(_))
    }

    pub fn as_value(&self) -> Option<&Type> {
        match self {
            PortType::Value(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_state(&self) -> Option<StateType> {
        match self {
            PortType::State(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<Type> for PortType {
    fn from(ty: Type) -> Self {
        PortType::Value(ty)
    }
}
impl From<StateType> for PortType {
    fn from(ty: StateType) -> Self {
        PortType::State(ty)
    }
}

/// Convenience constructors mirroring common widths used throughout tests
/// and the operation catalog.
pub mod widths {
    use super::Type;

    pub fn i1() -> Type {
        Type::Bit(1)
    }
    pub fn i32() -> Type {
        Type::Bit(32)
    }
    pub fn i64() -> Type {
        Type::Bit(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structs_with_same_name_are_equal_regardless_of_fields() {
        let a = Type::Struct(StructType {
            name: Some("Node".into()),
            packed: false,
            fields: vec![Type::bit(32)],
        });
        let b = Type::Struct(StructType {
            name: Some("Node".into()),
            packed: false,
            fields: vec![],
        });
        assert_eq!(a, b);
    }

    #[test]
    fn anonymous_structs_compare_fields() {
        let a = Type::Struct(StructType {
            name: None,
            packed: false,
            fields: vec![Type::bit(32)],
        });
        let b = Type::Struct(StructType {
            name: None,
            packed: false,
            fields: vec![Type::bit(64)],
        });
        assert_ne!(a, b);
    }
}
