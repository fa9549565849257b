//! Data types carried by IR nodes and storage locations.
//!
//! The vocabulary is deliberately small: the scalar primitive types the
//! backend can load and store directly, the opaque `Address` type for
//! object references, and fixed-width `Vector` types produced by the
//! vector expansion pass.

/// Primitive element type of a scalar value or a vector lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl ElementType {
    /// Size of one element in bytes.
    #[inline]
    pub fn size_bytes(self) -> u32 {
        match self {
            ElementType::Int8 => 1,
            ElementType::Int16 => 2,
            ElementType::Int32 | ElementType::Float32 => 4,
            ElementType::Int64 | ElementType::Float64 => 8,
        }
    }

    /// Size of one element in bits.
    #[inline]
    pub fn bits(self) -> u32 {
        self.size_bytes() * 8
    }

    /// Returns `true` for the integer element types.
    #[inline]
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            ElementType::Int8 | ElementType::Int16 | ElementType::Int32 | ElementType::Int64
        )
    }

    /// Returns `true` for the floating-point element types.
    #[inline]
    pub fn is_floating(self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }
}

/// Data type of an IR node or a symbol table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// A scalar primitive value.
    Element(ElementType),
    /// An object reference (arrays, boxed vectors, species descriptors).
    Address,
    /// A hardware vector value of `bits` total width.
    Vector { elem: ElementType, bits: u32 },
    /// No value (calls with no result, placeholder symbols).
    NoType,
}

impl DataType {
    /// Returns `true` if this is the object-reference type.
    #[inline]
    pub fn is_address(self) -> bool {
        matches!(self, DataType::Address)
    }

    /// Returns `true` if this is a vector type.
    #[inline]
    pub fn is_vector(self) -> bool {
        matches!(self, DataType::Vector { .. })
    }

    /// The lane element type of a vector, or the scalar element type.
    #[inline]
    pub fn element(self) -> Option<ElementType> {
        match self {
            DataType::Element(e) | DataType::Vector { elem: e, .. } => Some(e),
            DataType::Address | DataType::NoType => None,
        }
    }
}

/// Vector bit width recorded for a storage location or call result.
///
/// `Unset` means no width has been observed yet; `Unknown` means a width
/// was observed but could not be proven constant, or two observations
/// conflicted. Only `Bits(w)` permits lowering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum VecWidth {
    /// No width observed yet.
    #[default]
    Unset,
    /// Observed but not provably constant, or conflicting observations.
    Unknown,
    /// A concrete, compile-time-known width in bits.
    Bits(u32),
}

impl VecWidth {
    /// The concrete width in bits, if one is known.
    #[inline]
    pub fn concrete(self) -> Option<u32> {
        match self {
            VecWidth::Bits(w) => Some(w),
            VecWidth::Unset | VecWidth::Unknown => None,
        }
    }
}
