//! Recognized library-method identities.
//!
//! The host front end resolves call targets against the class library and
//! records an identity here for the methods the optimizer knows about.
//! The vector expansion pass keys its intrinsic catalog on this enum.

/// Identity of a recognized Vector API method.
///
/// Two families: typed wrapper methods (`FloatVector.fromArray`,
/// `IntVector.add`, ...) whose element type is fixed by the class, and
/// generic support methods (`VectorSupport.load`/`store`) that carry the
/// element type and lane count as descriptor arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecognizedMethod {
    FloatVectorFromArray,
    FloatVectorIntoArray,
    FloatVectorAdd,
    FloatVectorSub,
    FloatVectorMul,
    FloatVectorDiv,
    FloatVectorNeg,
    FloatVectorAbs,
    FloatVectorSqrt,
    FloatVectorMin,
    FloatVectorMax,
    FloatVectorFma,
    FloatVectorFromArrayMasked,
    FloatVectorIntoArrayMasked,
    IntVectorFromArray,
    IntVectorIntoArray,
    IntVectorAdd,
    IntVectorDiv,
    IntVectorAnd,
    IntVectorOr,
    IntVectorXor,
    VectorSpeciesIndexInRange,
    VectorSupportLoad,
    VectorSupportStore,
}
