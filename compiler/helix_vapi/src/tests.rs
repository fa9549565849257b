//! End-to-end pipeline tests over complete method bodies.

use pretty_assertions::assert_eq;

use helix_ir::{BinaryIrOp, DataType, MethodBody, Opcode, RecognizedMethod};

use crate::test_helpers::{count_nodes, float_kernel, float_kernel_with, FixedOracle, ADDRESS, F32, I32};
use crate::{expand_vector_api, ExpansionOptions, LoweringStrategy};

fn scalar_options() -> ExpansionOptions {
    ExpansionOptions {
        strategy: LoweringStrategy::Scalarize,
    }
}

/// Constant species, 32-bit float elements: the class validates at
/// width 128 and scalarization produces four loads, adds, and stores.
#[test]
fn constant_species_kernel_scalarizes_completely() {
    let kernel = float_kernel();
    let mut body = kernel.body;
    assert!(expand_vector_api(&mut body, &kernel.oracle, &scalar_options()));

    // Lane 0 of every call is the original node, rewritten in place.
    assert_eq!(body.arena.opcode(kernel.call_from), Opcode::LoadIndirect(F32));
    assert_eq!(
        body.arena.opcode(kernel.call_add),
        Opcode::Binary(BinaryIrOp::Add, F32)
    );
    assert_eq!(body.arena.opcode(kernel.call_into), Opcode::StoreIndirect(F32));
    assert_eq!(body.arena.opcode(kernel.store_v), Opcode::Store(F32));
    assert_eq!(body.arena.opcode(kernel.store_v2), Opcode::Store(F32));

    assert_eq!(count_nodes(&body, |op| op == Opcode::LoadIndirect(F32)), 4);
    assert_eq!(
        count_nodes(&body, |op| matches!(op, Opcode::Binary(_, dt) if dt == F32)),
        4
    );
    assert_eq!(count_nodes(&body, |op| op == Opcode::StoreIndirect(F32)), 4);
    // The boxed locals are gone: no reference stores, no calls remain.
    assert_eq!(count_nodes(&body, |op| op == Opcode::Store(ADDRESS)), 0);
    assert_eq!(count_nodes(&body, |op| op.is_function_call()), 0);
}

/// A species that is not a compile-time constant leaves the width
/// unknowable; every call site must survive structurally unchanged.
#[test]
fn unknown_species_round_trips_unchanged() {
    let kernel = float_kernel_with(None);
    let mut body = kernel.body;
    let before = body.clone();

    assert!(!expand_vector_api(&mut body, &kernel.oracle, &scalar_options()));
    assert_eq!(body, before);
}

/// A vector-typed local stored with a literal null is invalidated
/// immediately; the rest of the method keeps its original form.
#[test]
fn null_store_forces_object_fallback() {
    let kernel = float_kernel();
    let mut body = kernel.body;
    // v = null somewhere in the method.
    let null = body.arena.create_const(ADDRESS, 0);
    let store_null = body
        .arena
        .create_with_sym_ref(Opcode::Store(ADDRESS), &[null], kernel.v);
    body.append_stmt(store_null);
    let before = body.clone();

    assert!(!expand_vector_api(&mut body, &kernel.oracle, &scalar_options()));
    assert_eq!(body, before);
}

/// A vector value passed to a non-intrinsic call escapes; its whole web
/// is left in object form.
#[test]
fn escape_through_uncontrolled_call_forces_object_fallback() {
    let kernel = float_kernel();
    let mut body = kernel.body;
    let m_helper = body.symtab.alloc_method(None);
    let v_load = body
        .arena
        .create_with_sym_ref(Opcode::Load(ADDRESS), &[], kernel.v);
    let call = body.arena.create_with_sym_ref(
        Opcode::Call(DataType::NoType),
        &[v_load],
        m_helper,
    );
    let anchor = body.arena.create(Opcode::Anchor, &[call]);
    body.append_stmt(anchor);
    let before = body.clone();

    assert!(!expand_vector_api(&mut body, &kernel.oracle, &scalar_options()));
    assert_eq!(body, before);
}

/// A method with no recognized calls is skipped outright.
#[test]
fn method_without_vector_calls_is_skipped() {
    let mut body = MethodBody::new();
    let x = body.symtab.alloc_local(I32);
    let c = body.arena.create_const(I32, 42);
    let store = body.arena.create_with_sym_ref(Opcode::Store(I32), &[c], x);
    body.append_stmt(store);
    let before = body.clone();

    assert!(!expand_vector_api(&mut body, &FixedOracle::default(), &scalar_options()));
    assert_eq!(body, before);
}

/// Two independent webs: one supported, one poisoned by an unsupported
/// operation. Only the supported web is rewritten.
#[test]
fn independent_webs_are_decided_independently() {
    let kernel = float_kernel();
    let mut body = kernel.body;
    // A second, unrelated web: u2 = u.min(u) — min has no lowering.
    let u = body.symtab.alloc_local(ADDRESS);
    let u2 = body.symtab.alloc_local(ADDRESS);
    let m_min = body
        .symtab
        .alloc_method(Some(RecognizedMethod::FloatVectorMin));
    let u_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], u);
    let call_min = body
        .arena
        .create_with_sym_ref(Opcode::Call(ADDRESS), &[u_load, u_load], m_min);
    let anchor = body.arena.create(Opcode::Anchor, &[call_min]);
    body.append_stmt(anchor);
    let store_u2 = body
        .arena
        .create_with_sym_ref(Opcode::Store(ADDRESS), &[call_min], u2);
    body.append_stmt(store_u2);

    assert!(expand_vector_api(&mut body, &kernel.oracle, &scalar_options()));

    // The float kernel was expanded...
    assert_eq!(count_nodes(&body, |op| op == Opcode::LoadIndirect(F32)), 4);
    // ...while the min web kept its original call and reference store.
    assert_eq!(body.arena.opcode(call_min), Opcode::Call(ADDRESS));
    assert_eq!(body.arena.opcode(store_u2), Opcode::Store(ADDRESS));
}

/// Running the pass twice is harmless: the first run consumes every
/// recognized call, so the second finds nothing to do.
#[test]
fn second_run_finds_nothing() {
    let kernel = float_kernel();
    let mut body = kernel.body;
    assert!(expand_vector_api(&mut body, &kernel.oracle, &scalar_options()));
    let after_first = body.clone();
    assert!(!expand_vector_api(&mut body, &kernel.oracle, &scalar_options()));
    assert_eq!(body, after_first);
}
