//! Vector API expansion for the Helix JIT.
//!
//! Rewrites recognized Vector API calls in one compiled method into
//! either explicit per-lane scalar code or true hardware-vector
//! operations, whichever the surrounding code proves safe.
//!
//! # Pipeline
//!
//! Run once per compiled method, each stage consuming the previous
//! stage's output:
//!
//! 1. **Catalog lookup** ([`catalog`]) — classify recognized calls:
//!    handler kind, element type, argument roles.
//! 2. **Alias graph** ([`aliasing`]) — one IR traversal linking every
//!    storage location and call result that must share a representation,
//!    resolving species/descriptor arguments through the type oracle,
//!    and invalidating anything that escapes.
//! 3. **Equivalence classes** ([`classes`]) — worklist closure over the
//!    alias graph; poison spreads transitively.
//! 4. **Validation** ([`classes`]) — one element type, one concrete
//!    width per class, every member's operation lowerable; otherwise the
//!    class is invalidated and its code left untouched.
//! 5. **Lowering** ([`lowering`]) — second traversal rewriting committed
//!    classes in place, per the run's [`LoweringStrategy`].
//!
//! # Concurrency
//!
//! All mutable state (alias table, lane-expansion cache, visited sets)
//! is constructed fresh per invocation and dropped at exit. Independent
//! methods can be expanded concurrently by independent invocations; the
//! only shared input is the read-only [`TypeOracle`].
//!
//! # Failure model
//!
//! A shape or operation the pass cannot prove safe silently invalidates
//! its class — the call sites keep their original, boxed behavior, and
//! no error ever reaches the user. Internal inconsistencies (a handler
//! rejecting what validation accepted, a node missing a required symbol
//! reference) panic: they are bugs in the pass, not in the input.

pub mod aliasing;
pub mod catalog;
pub mod classes;
pub mod lowering;
pub mod ops;

use helix_ir::{ElementType, MethodBody, TypeOracle};

pub use aliasing::{AliasEntry, AliasTable, ClassId, CLASS_INVALID, CLASS_UNCLASSIFIED};
pub use catalog::{ArgRole, CatalogEntry, IntrinsicKind, ReturnRole};
pub use ops::VectorOperator;

/// Which lowering a committed class receives.
///
/// One fixed default per run: a class is lowered exactly one way, never
/// negotiated per class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoweringStrategy {
    /// Expand every operation into per-lane scalar code.
    #[default]
    Scalarize,
    /// Emit one hardware-wide operation per call site.
    Vectorize,
}

/// Options for one pass invocation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpansionOptions {
    pub strategy: LoweringStrategy,
}

/// Last-moment veto over a validated class.
///
/// Fired exactly once per class, at the first member the lowering
/// traversal visits and before any member is rewritten, so a veto never
/// leaves a class partially transformed. Hosts hang profitability or
/// cost models here.
pub trait CommitGate {
    fn should_commit(&self, class: ClassId, elem: ElementType, width_bits: u32) -> bool;
}

/// Gate that commits every validated class.
pub struct CommitAll;

impl CommitGate for CommitAll {
    fn should_commit(&self, _class: ClassId, _elem: ElementType, _width_bits: u32) -> bool {
        true
    }
}

/// Expand every provably safe Vector API use in `method`.
///
/// Returns whether any rewrite occurred. The worst outcome for any call
/// site is that it keeps its original object-oriented form.
pub fn expand_vector_api(
    method: &mut MethodBody,
    oracle: &dyn TypeOracle,
    options: &ExpansionOptions,
) -> bool {
    expand_vector_api_with_gate(method, oracle, options, &CommitAll)
}

/// [`expand_vector_api`] with an external commit gate.
pub fn expand_vector_api_with_gate(
    method: &mut MethodBody,
    oracle: &dyn TypeOracle,
    options: &ExpansionOptions,
    gate: &dyn CommitGate,
) -> bool {
    if !aliasing::find_vector_methods(method) {
        tracing::debug!("no recognized vector methods; skipping expansion");
        return false;
    }
    tracing::debug!(strategy = ?options.strategy, "running vector API expansion");

    let mut table = AliasTable::new(method.symtab.num_sym_refs());
    aliasing::build_aliases(method, oracle, options.strategy, &mut table);
    classes::build_classes(&mut table);
    classes::validate_classes(&mut table, &method.symtab, options.strategy);

    let rewrote = lowering::lower(method, oracle, options.strategy, &mut table, gate);
    if rewrote {
        tracing::trace!(trees = %method.dump(), "method trees after vector expansion");
    }
    rewrote
}

#[cfg(test)]
mod test_helpers;
#[cfg(test)]
mod tests;
