//! Operator-to-opcode mapping for elementwise intrinsics.
//!
//! A fixed table from abstract vector operator plus concrete element type
//! to the concrete IR opcode. An unmapped combination (bitwise on a
//! floating type, integer divide, or an operator with no lowering at all)
//! returns `None`; the feasibility checks turn that into class
//! invalidation before any rewrite is attempted.

use helix_ir::{BinaryIrOp, DataType, ElementType, Opcode};

/// Abstract elementwise operator named by a catalog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VectorOperator {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    And,
    Or,
    Xor,
    // Recognized tags with no lowering. Kept in the enum so the catalog
    // can name them; every table lookup for these returns `None`.
    Abs,
    Sqrt,
    Min,
    Max,
    Fma,
}

fn opcode_for(op: VectorOperator, elem: ElementType, dt: DataType) -> Option<Opcode> {
    match op {
        VectorOperator::Add => Some(Opcode::Binary(BinaryIrOp::Add, dt)),
        VectorOperator::Sub => Some(Opcode::Binary(BinaryIrOp::Sub, dt)),
        VectorOperator::Mul => Some(Opcode::Binary(BinaryIrOp::Mul, dt)),
        VectorOperator::Div => elem
            .is_floating()
            .then_some(Opcode::Binary(BinaryIrOp::Div, dt)),
        VectorOperator::And => elem
            .is_integral()
            .then_some(Opcode::Binary(BinaryIrOp::And, dt)),
        VectorOperator::Or => elem
            .is_integral()
            .then_some(Opcode::Binary(BinaryIrOp::Or, dt)),
        VectorOperator::Xor => elem
            .is_integral()
            .then_some(Opcode::Binary(BinaryIrOp::Xor, dt)),
        VectorOperator::Neg => Some(Opcode::Neg(dt)),
        VectorOperator::Abs
        | VectorOperator::Sqrt
        | VectorOperator::Min
        | VectorOperator::Max
        | VectorOperator::Fma => None,
    }
}

/// Scalar opcode for one lane of `op` over `elem`, or `None` when the
/// combination has no lowering.
pub fn scalar_opcode(op: VectorOperator, elem: ElementType) -> Option<Opcode> {
    opcode_for(op, elem, DataType::Element(elem))
}

/// Hardware-wide opcode for `op` over a `bits`-wide vector of `elem`.
pub fn vector_opcode(op: VectorOperator, elem: ElementType, bits: u32) -> Option<Opcode> {
    opcode_for(op, elem, DataType::Vector { elem, bits })
}

/// Whether any lowering exists for `op` over `elem`. The table's gaps
/// are the same for the scalar and wide forms.
pub fn supported(op: VectorOperator, elem: ElementType) -> bool {
    scalar_opcode(op, elem).is_some()
}
