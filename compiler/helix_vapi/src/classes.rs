//! Equivalence class construction and validation.
//!
//! Collapses the symmetric alias graph into classes keyed by a
//! representative sym-ref id, then checks each class for one consistent
//! element type and one concrete vector width. A class that fails any
//! check is invalidated whole; its members keep their original code.
//!
//! # Algorithm
//!
//! Class construction is a worklist closure, not a recursion: alias
//! chains produced by long store sequences can be arbitrarily deep.
//! Poison (an already-invalid member) spreads to the entire class but
//! does not stop enumeration — membership must be complete so that
//! invalidation reaches every member.

use rustc_hash::FxHashSet;

use helix_ir::{ElementType, SymRefId, SymbolTable, VecWidth};

use crate::aliasing::{AliasTable, ClassId, CLASS_INVALID, CLASS_UNCLASSIFIED};
use crate::catalog;
use crate::LoweringStrategy;

/// Collapse the alias graph into equivalence classes.
///
/// After this runs, every location has a non-zero class id: its own id
/// (singleton or representative), a representative's id, or `-1`.
pub(crate) fn build_classes(table: &mut AliasTable) {
    tracing::debug!(num_locations = table.len(), "building alias classes");
    for raw in 1..table.len() {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "sym-ref ids never exceed u32"
        )]
        let id = SymRefId::new(raw as u32);
        if table.class_id(id) != CLASS_UNCLASSIFIED {
            continue;
        }
        if table.entry(id).aliases.is_none() {
            // No recorded aliases: a singleton class.
            table.entry_mut(id).class_id = class_of(id);
            continue;
        }
        close_class(table, id);
    }
}

#[expect(
    clippy::cast_possible_wrap,
    reason = "sym-ref ids stay far below i32::MAX"
)]
fn class_of(rep: SymRefId) -> ClassId {
    rep.raw() as ClassId
}

/// Union everything reachable from `rep` into one class, copying
/// membership into the representative's alias set.
fn close_class(table: &mut AliasTable, rep: SymRefId) {
    let class_id = class_of(rep);
    table.entry_mut(rep).class_id = class_id;

    // Iterate a snapshot of the representative's own set; the live set
    // is mutated while the closure runs.
    let mut stack: Vec<SymRefId> = table.entry(rep).aliases.iter().flatten().copied().collect();
    let mut seen: FxHashSet<SymRefId> = FxHashSet::default();
    seen.insert(rep);
    let mut saw_invalid = false;

    while let Some(m) = stack.pop() {
        if !seen.insert(m) {
            continue;
        }
        if table.class_id(m) > 0 {
            continue; // already fully classified elsewhere
        }
        if table.class_id(m) == CLASS_INVALID {
            saw_invalid = true; // poison spreads; keep enumerating
        } else {
            table.entry_mut(m).class_id = class_id;
        }
        if let Some(aliases) = table.entry_mut(rep).aliases.as_mut() {
            aliases.insert(m);
        }
        let neighbors: Vec<SymRefId> = table.entry(m).aliases.iter().flatten().copied().collect();
        stack.extend(neighbors);
    }

    if saw_invalid {
        tracing::trace!(class = class_id, "class poisoned by invalid member");
        table.invalidate_class(rep);
    }
}

/// Validate every class against the single-type, single-width rule.
pub(crate) fn validate_classes(
    table: &mut AliasTable,
    symtab: &SymbolTable,
    strategy: LoweringStrategy,
) {
    tracing::debug!("validating alias classes");
    for raw in 1..table.len() {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "sym-ref ids never exceed u32"
        )]
        let rep = SymRefId::new(raw as u32);
        if table.class_id(rep) != class_of(rep) {
            continue; // not a representative
        }
        validate_class(table, symtab, strategy, rep);
    }
}

fn validate_class(
    table: &mut AliasTable,
    symtab: &SymbolTable,
    strategy: LoweringStrategy,
    rep: SymRefId,
) {
    tracing::trace!(class = rep.raw(), "verifying class");

    let mut members: Vec<SymRefId> = table.entry(rep).aliases.iter().flatten().copied().collect();
    if !members.contains(&rep) {
        // A singleton has no alias set; check the id itself directly.
        members.push(rep);
    }
    members.sort_unstable();

    let mut ok = true;
    let mut class_elem: Option<ElementType> = None;
    let mut class_width = VecWidth::Unset;

    for &m in &members {
        tracing::trace!(member = m.raw(), "verifying member");
        if table.class_id(m) == CLASS_INVALID {
            tracing::trace!(class = rep.raw(), member = m.raw(), "invalid member");
            ok = false;
            break;
        }
        if symtab.is_shadow(m) || symtab.is_static(m) || symtab.is_param(m) {
            // These cannot be privatized into fresh locals.
            tracing::trace!(class = rep.raw(), member = m.raw(), "unprivatizable member");
            ok = false;
            break;
        }
        if symtab.is_method(m) {
            let Some(recognized) = symtab.recognized_method(m) else {
                tracing::trace!(class = rep.raw(), member = m.raw(), "non-intrinsic method");
                ok = false;
                break;
            };
            let row = catalog::entry(recognized);
            let m_elem = table.entry(m).elem_type;
            let m_width = table.entry(m).width;

            let feasible = match strategy {
                LoweringStrategy::Scalarize => row.kind.check_scalar(m_elem, m_width),
                LoweringStrategy::Vectorize => row.kind.check_vector(m_elem, m_width),
            };
            if !feasible {
                tracing::trace!(class = rep.raw(), member = m.raw(), "unsupported operation");
                ok = false;
                break;
            }

            // First concrete value wins; later values must agree.
            match (class_width, m_width) {
                (VecWidth::Unset, w) => class_width = w,
                (_, VecWidth::Unset) => {}
                (c, w) if c == w => {}
                (c, w) => {
                    tracing::trace!(class = rep.raw(), member = m.raw(), ?c, ?w, "width mismatch");
                    ok = false;
                    break;
                }
            }
            match (class_elem, m_elem) {
                (None, e) => class_elem = e,
                (_, None) => {}
                (Some(c), Some(e)) if c == e => {}
                (c, e) => {
                    tracing::trace!(class = rep.raw(), member = m.raw(), ?c, ?e, "type mismatch");
                    ok = false;
                    break;
                }
            }
        }
    }

    // Record the accumulated shape even for invalid classes; the trace
    // output reports it.
    table.entry_mut(rep).elem_type = class_elem;
    table.entry_mut(rep).width = class_width;

    if ok && class_width.concrete().is_some() {
        tracing::trace!(class = rep.raw(), ?class_elem, ?class_width, "class validated");
        return;
    }

    tracing::trace!(class = rep.raw(), "invalidating class");
    table.invalidate_class(rep);
}
