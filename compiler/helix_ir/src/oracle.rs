//! Read-only oracle over compile-time-known constant objects.
//!
//! The optimizer may fold a reference to a constant object (a species
//! descriptor, an element-class constant) into a [`KnownObjectId`]. The
//! oracle resolves such constants to the run-time metadata the vector
//! expansion pass needs. Implementations read live object state, so the
//! host environment's safe-access discipline applies; results are treated
//! as immutable for the remainder of a pass invocation.
//!
//! Every query returns `Option`: a constant that turns out not to be
//! resolvable degrades to "unknown", never to an error.

use crate::symtab::KnownObjectId;
use crate::types::ElementType;

/// Resolves constant descriptor objects to their run-time shape.
pub trait TypeOracle {
    /// Total bit width recorded in a species constant's shape field.
    fn species_bit_width(&self, obj: KnownObjectId) -> Option<u32>;

    /// Primitive element type named by a class constant.
    fn element_type_of_class(&self, obj: KnownObjectId) -> Option<ElementType>;

    /// Contiguous array header size in bytes, from the object model.
    fn array_header_size(&self) -> i64 {
        16
    }
}
