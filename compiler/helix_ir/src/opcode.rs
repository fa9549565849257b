//! IR opcodes.
//!
//! A fixed node vocabulary: loads, stores, indirect loads and stores,
//! calls, arithmetic, constants, address arithmetic, and the statement
//! wrappers `Anchor` and `NullCheck`. Opcodes are parameterized by
//! [`DataType`], so retagging a node from reference form to scalar or
//! vector form is a plain opcode replacement that keeps node identity.

use crate::types::DataType;

/// Elementwise binary operator carried by [`Opcode::Binary`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryIrOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
}

/// Opcode of an IR node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Constant; payload in `Node::const_value`. `Const(Address)` is a
    /// known reference constant (`null` or a boxed constant object).
    Const(DataType),
    /// Direct load of a storage location. Requires a symbol reference.
    Load(DataType),
    /// Direct store to a storage location; child 0 is the stored value.
    Store(DataType),
    /// Load through an address child (child 0). Requires a shadow symbol.
    LoadIndirect(DataType),
    /// Store through an address child; child 0 is the address, child 1
    /// the stored value. Requires a shadow symbol.
    StoreIndirect(DataType),
    /// Address of a storage location. Requires a symbol reference.
    LoadAddress,
    /// Widen a 32-bit index to 64 bits.
    IntToLong,
    /// 64-bit left shift; child 1 is the shift amount.
    ShiftLeft,
    /// 64-bit integer add (address arithmetic component).
    LongAdd,
    /// Address plus 64-bit byte offset.
    AddressAdd,
    /// Elementwise binary arithmetic. Scalar when the data type is an
    /// element type; one hardware-wide operation when it is a vector.
    Binary(BinaryIrOp, DataType),
    /// Elementwise negate.
    Neg(DataType),
    /// Call returning the given type (`Address` for reference-returning
    /// calls). Requires a method symbol reference. For non-static
    /// targets child 0 is the receiver.
    Call(DataType),
    /// Statement root anchoring a value child for evaluation order.
    Anchor,
    /// Statement root that null-checks its child before evaluating it.
    NullCheck,
    /// Method return; `Return(Address)` returns a reference.
    Return(DataType),
}

impl Opcode {
    /// Returns `true` for direct and indirect stores.
    #[inline]
    pub fn is_store(self) -> bool {
        matches!(self, Opcode::Store(_) | Opcode::StoreIndirect(_))
    }

    /// Returns `true` for direct and indirect loads.
    #[inline]
    pub fn is_load(self) -> bool {
        matches!(self, Opcode::Load(_) | Opcode::LoadIndirect(_))
    }

    /// Returns `true` for call opcodes.
    #[inline]
    pub fn is_function_call(self) -> bool {
        matches!(self, Opcode::Call(_))
    }

    /// Returns `true` if nodes with this opcode carry a symbol reference.
    #[inline]
    pub fn has_sym_ref(self) -> bool {
        matches!(
            self,
            Opcode::Load(_)
                | Opcode::Store(_)
                | Opcode::LoadIndirect(_)
                | Opcode::StoreIndirect(_)
                | Opcode::LoadAddress
                | Opcode::Call(_)
        )
    }

    /// Returns `true` for a direct store to a reference-typed location.
    #[inline]
    pub fn is_address_store(self) -> bool {
        matches!(self, Opcode::Store(DataType::Address))
    }

    /// Returns `true` for a known reference constant (`null` or boxed).
    #[inline]
    pub fn is_address_const(self) -> bool {
        matches!(self, Opcode::Const(DataType::Address))
    }

    /// Returns `true` for a node that reads a reference out of storage or
    /// produces one from a call — the shapes the alias graph links.
    #[inline]
    pub fn is_address_producer(self) -> bool {
        matches!(
            self,
            Opcode::Load(DataType::Address)
                | Opcode::LoadIndirect(DataType::Address)
                | Opcode::Call(DataType::Address)
        )
    }

    /// The data type this opcode produces or stores.
    #[inline]
    pub fn data_type(self) -> DataType {
        match self {
            Opcode::Const(dt)
            | Opcode::Load(dt)
            | Opcode::Store(dt)
            | Opcode::LoadIndirect(dt)
            | Opcode::StoreIndirect(dt)
            | Opcode::Binary(_, dt)
            | Opcode::Neg(dt)
            | Opcode::Call(dt)
            | Opcode::Return(dt) => dt,
            Opcode::LoadAddress | Opcode::AddressAdd => DataType::Address,
            Opcode::IntToLong | Opcode::ShiftLeft | Opcode::LongAdd => {
                DataType::Element(crate::types::ElementType::Int64)
            }
            Opcode::Anchor | Opcode::NullCheck => DataType::NoType,
        }
    }
}
