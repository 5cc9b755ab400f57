//! The operations catalog (spec §4.2): a closed tagged family of simple
//! (stateless-shape, though several thread state) operations. Each variant
//! carries its static attribute data and can compute its result port types
//! from the types of the operands actually supplied.
//!
//! `Operation` derives structural equality/hash on its attributes, which is
//! exactly the "operation equals" spec §4.2 asks for; common-node
//! elimination separately zips that with the tuple of input origins.

use smallvec::SmallVec;

use crate::{
    error::DomainError,
    types::{PortType, StateType, StructType, Type},
};

pub type ResultTypes = SmallVec<[PortType; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SMod,
    UMod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AShr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOpKind {
    Eq,
    Ne,
    Sge,
    Sgt,
    Sle,
    Slt,
    Uge,
    Ugt,
    Ule,
    Ult,
}

/// The closed operation catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    // -- Constants --------------------------------------------------------
    BitConstant { value: u64, width: u32 },
    ControlConstant { alt: u32, num_alternatives: u32 },
    Undef(Type),

    // -- Bit arithmetic -----------------------------------------------------
    Binary(BinOpKind),
    Bitcast { target: Type },

    // -- Comparisons --------------------------------------------------------
    Compare(CmpOpKind),

    // -- Match ----------------------------------------------------------
    /// Maps `bit(input_width)` to `control(num_alternatives)` via an
    /// explicit table plus a default alternative.
    Match {
        input_width: u32,
        num_alternatives: u32,
        mapping: SmallVec<[(u64, u32); 4]>,
        default: u32,
    },

    // -- Memory -----------------------------------------------------------
    /// `alloca(valueType, size, state) -> pointer, state`.
    Alloca { value_type: Type, size: u64 },
    /// `load(addr, state*) -> value, state*`.
    Load { result_type: Type, num_states: u16 },
    /// `store(addr, value, state*) -> state*`.
    Store { num_states: u16 },
    /// `memcpy(dst, src, len, state*) -> state*`.
    Memcpy { length_width: u32, num_states: u16 },
    /// Merges `n` memory state threads into one; the sole operation allowed
    /// to consume a forked state output more than once downstream of it.
    MemoryStateMerge { arity: u16 },
    /// Splits one memory state thread into `n`.
    MemoryStateSplit { arity: u16 },

    // -- Pointer ------------------------------------------------------------
    /// `getelementptr(base, indices[]) -> pointer`; indices are bit(n)
    /// value operands, not attributes (scalar-pointer case only; see design
    /// note on the deferred vector-of-pointers case).
    GetElementPtr {
        result_type: Type,
        num_indices: u16,
    },

    // -- Aggregate ------------------------------------------------------------
    ConstantDataArray { element_type: Type, len: u32 },
    ConstantStruct { struct_type: StructType },
    ExtractValue { result_type: Type, index: u32 },
    InsertValue { aggregate_type: Type, index: u32 },

    // -- Call -----------------------------------------------------------
    /// `apply(fnPtr, args[]) -> results[]`; operand/result lists include the
    /// state threads that flow through the call alongside the value args.
    Apply {
        result_types: SmallVec<[Type; 2]>,
        num_args: u16,
        num_states: u16,
    },

    // -- Misc -----------------------------------------------------------
    /// Variadic-argument list constructor.
    Valist { element_types: SmallVec<[Type; 4]> },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::BitConstant { .. } => "bit-constant",
            Operation::ControlConstant { .. } => "control-constant",
            Operation::Undef(_) => "undef",
            Operation::Binary(k) => match k {
                BinOpKind::Add => "add",
                BinOpKind::Sub => "sub",
                BinOpKind::Mul => "mul",
                BinOpKind::SDiv => "sdiv",
                BinOpKind::UDiv => "udiv",
                BinOpKind::SMod => "smod",
                BinOpKind::UMod => "umod",
                BinOpKind::And => "and",
                BinOpKind::Or => "or",
                BinOpKind::Xor => "xor",
                BinOpKind::Shl => "shl",
                BinOpKind::Shr => "shr",
                BinOpKind::AShr => "ashr",
            },
            Operation::Bitcast { .. } => "bitcast",
            Operation::Compare(k) => match k {
                CmpOpKind::Eq => "eq",
                CmpOpKind::Ne => "ne",
                CmpOpKind::Sge => "sge",
                CmpOpKind::Sgt => "sgt",
                CmpOpKind::Sle => "sle",
                CmpOpKind::Slt => "slt",
                CmpOpKind::Uge => "uge",
                CmpOpKind::Ugt => "ugt",
                CmpOpKind::Ule => "ule",
                CmpOpKind::Ult => "ult",
            },
            Operation::Match { .. } => "match",
            Operation::Alloca { .. } => "alloca",
            Operation::Load { .. } => "load",
            Operation::Store { .. } => "store",
            Operation::Memcpy { .. } => "memcpy",
            Operation::MemoryStateMerge { .. } => "mem-state-merge",
            Operation::MemoryStateSplit { .. } => "mem-state-split",
            Operation::GetElementPtr { .. } => "getelementptr",
            Operation::ConstantDataArray { .. } => "constant-data-array",
            Operation::ConstantStruct { .. } => "constant-struct",
            Operation::ExtractValue { .. } => "extractvalue",
            Operation::InsertValue { .. } => "insertvalue",
            Operation::Apply { .. } => "apply",
            Operation::Valist { .. } => "valist",
        }
    }

    /// Does this operation consume or produce any state-typed port? Used by
    /// common-node elimination to skip state-carrying ops unless their
    /// operands are known not to alias (spec §4.7).
    pub fn is_state_carrying(&self) -> bool {
        matches!(
            self,
            Operation::Alloca { .. }
                | Operation::Load { .. }
                | Operation::Store { .. }
                | Operation::Memcpy { .. }
                | Operation::MemoryStateMerge { .. }
                | Operation::MemoryStateSplit { .. }
                | Operation::Apply { .. }
        )
    }

    /// Validates that `operands` is an acceptable argument list for this
    /// operation and returns the port types of its results.
    pub fn signature(&self, operands: &[PortType]) -> Result<ResultTypes, DomainError> {
        let name = self.name();
        let mut out = ResultTypes::new();

        macro_rules! expect_arity {
            ($n:expr) => {
                if operands.len() != $n {
                    return Err(DomainError::OperandCountMismatch {
                        op: name,
                        expected: $n,
                        actual: operands.len(),
                    });
                }
            };
        }
        macro_rules! expect_value_type {
            ($idx:expr, $ty:expr) => {{
                match &operands[$idx] {
                    PortType::Value(actual) if *actual == $ty => {}
                    other => {
                        return Err(DomainError::OperandTypeMismatch {
                            op: name,
                            index: $idx,
                            expected: PortType::Value($ty.clone()),
                            actual: other.clone(),
                        })
                    }
                }
            }};
        }
        macro_rules! expect_state {
            ($idx:expr, $st:expr) => {{
                match operands[$idx].as_state() {
                    Some(st) if st == $st => {}
                    _ => {
                        return Err(DomainError::OperandTypeMismatch {
                            op: name,
                            index: $idx,
                            expected: PortType::State($st),
                            actual: operands[$idx].clone(),
                        })
                    }
                }
            }};
        }

        match self {
            Operation::BitConstant { width, .. } => {
                expect_arity!(0);
                out.push(PortType::Value(Type::Bit(*width)));
            }
            Operation::ControlConstant {
                num_alternatives, ..
            } => {
                expect_arity!(0);
                out.push(PortType::State(StateType::Control(*num_alternatives)));
            }
            Operation::Undef(ty) => {
                expect_arity!(0);
                out.push(PortType::Value(ty.clone()));
            }
            Operation::Binary(_) => {
                expect_arity!(2);
                let lhs = operands[0]
                    .as_value()
                    .and_then(Type::as_bit_width)
                    .ok_or(DomainError::OperandTypeMismatch {
                        op: name,
                        index: 0,
                        expected: PortType::Value(Type::Bit(0)),
                        actual: operands[0].clone(),
                    })?;
                expect_value_type!(1, Type::Bit(lhs));
                out.push(PortType::Value(Type::Bit(lhs)));
            }
            Operation::Bitcast { target } => {
                expect_arity!(1);
                out.push(PortType::Value(target.clone()));
            }
            Operation::Compare(_) => {
                expect_arity!(2);
                let lhs = operands[0]
                    .as_value()
                    .and_then(Type::as_bit_width)
                    .ok_or(DomainError::OperandTypeMismatch {
                        op: name,
                        index: 0,
                        expected: PortType::Value(Type::Bit(0)),
                        actual: operands[0].clone(),
                    })?;
                expect_value_type!(1, Type::Bit(lhs));
                out.push(PortType::Value(Type::Bit(1)));
            }
            Operation::Match {
                input_width,
                num_alternatives,
                ..
            } => {
                expect_arity!(1);
                expect_value_type!(0, Type::Bit(*input_width));
                out.push(PortType::State(StateType::Control(*num_alternatives)));
            }
            Operation::Alloca { value_type, .. } => {
                expect_arity!(1);
                expect_state!(0, StateType::Memory);
                out.push(PortType::Value(Type::pointer(value_type.clone())));
                out.push(PortType::State(StateType::Memory));
            }
            Operation::Load {
                result_type,
                num_states,
            } => {
                let n = *num_states as usize;
                expect_arity!(1 + n);
                if !operands[0].as_value().is_some_and(Type::is_pointer) {
                    return Err(DomainError::OperandTypeMismatch {
                        op: name,
                        index: 0,
                        expected: PortType::Value(Type::pointer(result_type.clone())),
                        actual: operands[0].clone(),
                    });
                }
                for i in 0..n {
                    expect_state!(1 + i, StateType::Memory);
                }
                out.push(PortType::Value(result_type.clone()));
                for _ in 0..n {
                    out.push(PortType::State(StateType::Memory));
                }
            }
            Operation::Store { num_states } => {
                let n = *num_states as usize;
                expect_arity!(2 + n);
                if !operands[0].as_value().is_some_and(Type::is_pointer) {
                    return Err(DomainError::OperandTypeMismatch {
                        op: name,
                        index: 0,
                        expected: PortType::Value(Type::pointer(Type::Bit(0))),
                        actual: operands[0].clone(),
                    });
                }
                for i in 0..n {
                    expect_state!(2 + i, StateType::Memory);
                }
                for _ in 0..n {
                    out.push(PortType::State(StateType::Memory));
                }
            }
            Operation::Memcpy {
                length_width,
                num_states,
            } => {
                let n = *num_states as usize;
                expect_arity!(3 + n);
                expect_value_type!(2, Type::Bit(*length_width));
                for i in 0..n {
                    expect_state!(3 + i, StateType::Memory);
                }
                for _ in 0..n {
                    out.push(PortType::State(StateType::Memory));
                }
            }
            Operation::MemoryStateMerge { arity } => {
                expect_arity!(*arity as usize);
                for i in 0..*arity as usize {
                    expect_state!(i, StateType::Memory);
                }
                out.push(PortType::State(StateType::Memory));
            }
            Operation::MemoryStateSplit { arity } => {
                expect_arity!(1);
                expect_state!(0, StateType::Memory);
                for _ in 0..*arity {
                    out.push(PortType::State(StateType::Memory));
                }
            }
            Operation::GetElementPtr {
                result_type,
                num_indices,
            } => {
                let n = *num_indices as usize;
                expect_arity!(1 + n);
                if !operands[0].as_value().is_some_and(Type::is_pointer) {
                    return Err(DomainError::OperandTypeMismatch {
                        op: name,
                        index: 0,
                        expected: PortType::Value(Type::pointer(result_type.clone())),
                        actual: operands[0].clone(),
                    });
                }
                for i in 0..n {
                    if operands[1 + i].as_value().and_then(Type::as_bit_width).is_none() {
                        return Err(DomainError::OperandTypeMismatch {
                            op: name,
                            index: 1 + i,
                            expected: PortType::Value(Type::Bit(64)),
                            actual: operands[1 + i].clone(),
                        });
                    }
                }
                out.push(PortType::Value(Type::pointer(result_type.clone())));
            }
            Operation::ConstantDataArray { element_type, len } => {
                expect_arity!(*len as usize);
                for i in 0..*len as usize {
                    expect_value_type!(i, *element_type.clone());
                }
                out.push(PortType::Value(Type::array(*len as u64, element_type.clone())));
            }
            Operation::ConstantStruct { struct_type } => {
                expect_arity!(struct_type.fields.len());
                for (i, field_ty) in struct_type.fields.iter().enumerate() {
                    expect_value_type!(i, field_ty.clone());
                }
                out.push(PortType::Value(Type::Struct(struct_type.clone())));
            }
            Operation::ExtractValue { result_type, .. } => {
                expect_arity!(1);
                out.push(PortType::Value(result_type.clone()));
            }
            Operation::InsertValue { aggregate_type, .. } => {
                expect_arity!(2);
                expect_value_type!(0, aggregate_type.clone());
                out.push(PortType::Value(aggregate_type.clone()));
            }
            Operation::Apply {
                result_types,
                num_args,
                num_states,
            } => {
                let n_args = *num_args as usize;
                let n_states = *num_states as usize;
                expect_arity!(1 + n_args + n_states);
                if !operands[0].as_value().is_some_and(Type::is_pointer) {
                    return Err(DomainError::OperandTypeMismatch {
                        op: name,
                        index: 0,
                        expected: PortType::Value(Type::pointer(Type::Bit(0))),
                        actual: operands[0].clone(),
                    });
                }
                for i in 0..n_states {
                    expect_state!(1 + n_args + i, StateType::Memory);
                }
                for ty in result_types {
                    out.push(PortType::Value(ty.clone()));
                }
                for _ in 0..n_states {
                    out.push(PortType::State(StateType::Memory));
                }
            }
            Operation::Valist { element_types } => {
                expect_arity!(element_types.len());
                for (i, ty) in element_types.iter().enumerate() {
                    expect_value_type!(i, ty.clone());
                }
                out.push(PortType::Value(Type::pointer(Type::Struct(StructType {
                    name: Some("valist".into()),
                    packed: false,
                    fields: element_types.clone().into_vec(),
                }))));
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_add_requires_matching_widths() {
        let op = Operation::Binary(BinOpKind::Add);
        let ok = op.signature(&[PortType::Value(Type::Bit(32)), PortType::Value(Type::Bit(32))]);
        assert!(ok.is_ok());
        let bad = op.signature(&[PortType::Value(Type::Bit(32)), PortType::Value(Type::Bit(64))]);
        assert!(bad.is_err());
    }

    #[test]
    fn compare_always_produces_bit1() {
        let op = Operation::Compare(CmpOpKind::Slt);
        let sig = op
            .signature(&[PortType::Value(Type::Bit(64)), PortType::Value(Type::Bit(64))])
            .unwrap();
        assert_eq!(sig.as_slice(), &[PortType::Value(Type::Bit(1))]);
    }

    #[test]
    fn operations_with_same_attributes_are_equal() {
        let a = Operation::BitConstant { value: 7, width: 32 };
        let b = Operation::BitConstant { value: 7, width: 32 };
        let c = Operation::BitConstant { value: 8, width: 32 };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
