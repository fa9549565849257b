//! Intrinsic catalog and call classifier.
//!
//! One immutable row per recognized Vector API method, keyed by
//! [`RecognizedMethod`]: the lowering handler kind, the fixed element
//! type (or `None` when inferred from descriptor arguments), the return
//! role, and the role of every argument position. The catalog is pure
//! data; classification is table lookup plus receiver adjustment.

use helix_ir::{ElementType, RecognizedMethod, SymRefId, SymbolTable, VecWidth};

use crate::ops::{self, VectorOperator};

/// Role of one argument position at a recognized call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgRole {
    /// An ordinary value (an index, a flag).
    Plain,
    /// The backing array of a load or store.
    Array,
    /// A vector operand.
    Vector,
    /// A species descriptor fixing element type and total width.
    Species,
    /// A class constant naming the element type.
    ElementTypeDescr,
    /// A compile-time lane count.
    LaneCountDescr,
    /// A mask operand. Recognized, never supported.
    Mask,
}

/// Role of a recognized call's return value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnRole {
    Plain,
    Vector,
}

/// Handler kind for a catalog entry.
///
/// A closed set of variants, each implementing the four-mode contract:
/// two pure feasibility checks consulted during validation, and the two
/// rewrites (in `lowering`) applied to committed classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntrinsicKind {
    /// Load `numLanes` elements starting at `array[index]`.
    FromArray,
    /// Store a vector operand into `array[index..]`.
    IntoArray,
    /// Elementwise binary operation on two vector operands.
    Binary(VectorOperator),
    /// Elementwise unary operation on one vector operand.
    Unary(VectorOperator),
    /// Recognized method with no lowering (masked variants, species
    /// queries). Always fails both feasibility checks.
    Unsupported,
}

impl IntrinsicKind {
    /// Can this intrinsic be lowered to per-lane scalar code for the
    /// given element type? Pure; no IR is touched.
    pub fn check_scalar(self, elem: Option<ElementType>, _width: VecWidth) -> bool {
        match self {
            IntrinsicKind::Unsupported => false,
            IntrinsicKind::FromArray | IntrinsicKind::IntoArray => elem.is_some(),
            IntrinsicKind::Binary(op) | IntrinsicKind::Unary(op) => {
                elem.is_some_and(|e| ops::supported(op, e))
            }
        }
    }

    /// Can this intrinsic be lowered to one hardware-wide operation?
    pub fn check_vector(self, elem: Option<ElementType>, _width: VecWidth) -> bool {
        match self {
            IntrinsicKind::Unsupported => false,
            IntrinsicKind::FromArray | IntrinsicKind::IntoArray => elem.is_some(),
            IntrinsicKind::Binary(op) | IntrinsicKind::Unary(op) => {
                elem.is_some_and(|e| ops::supported(op, e))
            }
        }
    }
}

/// One catalog row.
#[derive(Debug)]
pub struct CatalogEntry {
    /// Static methods have no receiver; instance methods take their
    /// vector receiver as call child 0.
    pub is_static: bool,
    pub kind: IntrinsicKind,
    /// Fixed element type of the typed wrapper classes, or `None` when
    /// inferred from an `ElementTypeDescr` argument.
    pub element_type: Option<ElementType>,
    pub return_role: ReturnRole,
    /// Declared argument roles, receiver excluded.
    pub arg_roles: &'static [ArgRole],
}

/// Look up the catalog row for a recognized method.
pub fn entry(method: RecognizedMethod) -> &'static CatalogEntry {
    use ArgRole::{Array, ElementTypeDescr, LaneCountDescr, Mask, Plain, Species, Vector};
    use ElementType::{Float32, Int32};
    use IntrinsicKind::{Binary, FromArray, IntoArray, Unary, Unsupported};
    use RecognizedMethod as M;
    use ReturnRole as R;

    match method {
        M::FloatVectorFromArray => &CatalogEntry {
            is_static: true,
            kind: FromArray,
            element_type: Some(Float32),
            return_role: R::Vector,
            arg_roles: &[Species, Array, Plain],
        },
        M::FloatVectorIntoArray => &CatalogEntry {
            is_static: false,
            kind: IntoArray,
            element_type: Some(Float32),
            return_role: R::Plain,
            arg_roles: &[Array, Plain],
        },
        M::FloatVectorAdd => &CatalogEntry {
            is_static: false,
            kind: Binary(VectorOperator::Add),
            element_type: Some(Float32),
            return_role: R::Vector,
            arg_roles: &[Vector],
        },
        M::FloatVectorSub => &CatalogEntry {
            is_static: false,
            kind: Binary(VectorOperator::Sub),
            element_type: Some(Float32),
            return_role: R::Vector,
            arg_roles: &[Vector],
        },
        M::FloatVectorMul => &CatalogEntry {
            is_static: false,
            kind: Binary(VectorOperator::Mul),
            element_type: Some(Float32),
            return_role: R::Vector,
            arg_roles: &[Vector],
        },
        M::FloatVectorDiv => &CatalogEntry {
            is_static: false,
            kind: Binary(VectorOperator::Div),
            element_type: Some(Float32),
            return_role: R::Vector,
            arg_roles: &[Vector],
        },
        M::FloatVectorNeg => &CatalogEntry {
            is_static: false,
            kind: Unary(VectorOperator::Neg),
            element_type: Some(Float32),
            return_role: R::Vector,
            arg_roles: &[],
        },
        M::FloatVectorAbs => &CatalogEntry {
            is_static: false,
            kind: Unary(VectorOperator::Abs),
            element_type: Some(Float32),
            return_role: R::Vector,
            arg_roles: &[],
        },
        M::FloatVectorSqrt => &CatalogEntry {
            is_static: false,
            kind: Unary(VectorOperator::Sqrt),
            element_type: Some(Float32),
            return_role: R::Vector,
            arg_roles: &[],
        },
        M::FloatVectorMin => &CatalogEntry {
            is_static: false,
            kind: Binary(VectorOperator::Min),
            element_type: Some(Float32),
            return_role: R::Vector,
            arg_roles: &[Vector],
        },
        M::FloatVectorMax => &CatalogEntry {
            is_static: false,
            kind: Binary(VectorOperator::Max),
            element_type: Some(Float32),
            return_role: R::Vector,
            arg_roles: &[Vector],
        },
        M::FloatVectorFma => &CatalogEntry {
            is_static: false,
            kind: Binary(VectorOperator::Fma),
            element_type: Some(Float32),
            return_role: R::Vector,
            arg_roles: &[Vector, Vector],
        },
        M::FloatVectorFromArrayMasked => &CatalogEntry {
            is_static: true,
            kind: Unsupported,
            element_type: Some(Float32),
            return_role: R::Vector,
            arg_roles: &[Species, Array, Plain, Mask],
        },
        M::FloatVectorIntoArrayMasked => &CatalogEntry {
            is_static: false,
            kind: Unsupported,
            element_type: Some(Float32),
            return_role: R::Plain,
            arg_roles: &[Array, Plain, Mask],
        },
        M::IntVectorFromArray => &CatalogEntry {
            is_static: true,
            kind: FromArray,
            element_type: Some(Int32),
            return_role: R::Vector,
            arg_roles: &[Species, Array, Plain],
        },
        M::IntVectorIntoArray => &CatalogEntry {
            is_static: false,
            kind: IntoArray,
            element_type: Some(Int32),
            return_role: R::Plain,
            arg_roles: &[Array, Plain],
        },
        M::IntVectorAdd => &CatalogEntry {
            is_static: false,
            kind: Binary(VectorOperator::Add),
            element_type: Some(Int32),
            return_role: R::Vector,
            arg_roles: &[Vector],
        },
        M::IntVectorDiv => &CatalogEntry {
            is_static: false,
            kind: Binary(VectorOperator::Div),
            element_type: Some(Int32),
            return_role: R::Vector,
            arg_roles: &[Vector],
        },
        M::IntVectorAnd => &CatalogEntry {
            is_static: false,
            kind: Binary(VectorOperator::And),
            element_type: Some(Int32),
            return_role: R::Vector,
            arg_roles: &[Vector],
        },
        M::IntVectorOr => &CatalogEntry {
            is_static: false,
            kind: Binary(VectorOperator::Or),
            element_type: Some(Int32),
            return_role: R::Vector,
            arg_roles: &[Vector],
        },
        M::IntVectorXor => &CatalogEntry {
            is_static: false,
            kind: Binary(VectorOperator::Xor),
            element_type: Some(Int32),
            return_role: R::Vector,
            arg_roles: &[Vector],
        },
        M::VectorSpeciesIndexInRange => &CatalogEntry {
            is_static: false,
            kind: Unsupported,
            element_type: None,
            return_role: R::Plain,
            arg_roles: &[Plain, Plain],
        },
        M::VectorSupportLoad => &CatalogEntry {
            is_static: true,
            kind: FromArray,
            element_type: None,
            return_role: R::Vector,
            arg_roles: &[ElementTypeDescr, LaneCountDescr, Array, Plain],
        },
        M::VectorSupportStore => &CatalogEntry {
            is_static: true,
            kind: IntoArray,
            element_type: None,
            return_role: R::Plain,
            arg_roles: &[ElementTypeDescr, LaneCountDescr, Array, Plain, Vector],
        },
    }
}

/// Is the call target a recognized Vector API method?
pub fn is_intrinsic(symtab: &SymbolTable, sym: SymRefId) -> bool {
    symtab.recognized_method(sym).is_some()
}

/// Does the recognized method return a vector value?
pub fn returns_vector(method: RecognizedMethod) -> bool {
    entry(method).return_role == ReturnRole::Vector
}

/// Role of the call child at `child_index`.
///
/// Indices are call-site-relative: for instance methods child 0 is the
/// receiver (reported as the vector operand) and declared argument roles
/// start at child 1. Asking past the declared arity is a fatal internal
/// error — a correct caller never does.
pub fn arg_role(method: RecognizedMethod, child_index: usize) -> ArgRole {
    let row = entry(method);
    let arg_index = if row.is_static {
        child_index
    } else {
        if child_index == 0 {
            return ArgRole::Vector;
        }
        child_index - 1
    };
    assert!(
        arg_index < row.arg_roles.len(),
        "argument index {arg_index} past declared arity of {method:?}"
    );
    row.arg_roles[arg_index]
}
