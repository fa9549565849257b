use helix_ir::{
    DataType, ElementType, KnownObjectId, MethodBody, NodeFlags, Opcode, RecognizedMethod,
    SymRefId, VecWidth,
};

use crate::aliasing::{build_aliases, find_vector_methods, AliasTable, LaneExpansion, CLASS_INVALID};
use crate::test_helpers::{float_kernel, float_kernel_with, FixedOracle, ADDRESS, I32};
use crate::LoweringStrategy;

fn build(body: &MethodBody, oracle: &FixedOracle) -> AliasTable {
    let mut table = AliasTable::new(body.symtab.num_sym_refs());
    build_aliases(body, oracle, LoweringStrategy::Scalarize, &mut table);
    table
}

fn linked(table: &AliasTable, a: SymRefId, b: SymRefId) -> bool {
    table
        .entry(a)
        .aliases
        .as_ref()
        .is_some_and(|set| set.contains(&b))
}

#[test]
fn find_vector_methods_gates_the_pass() {
    let kernel = float_kernel();
    assert!(find_vector_methods(&kernel.body));

    let mut plain = MethodBody::new();
    let m = plain.symtab.alloc_method(None);
    let call = plain
        .arena
        .create_with_sym_ref(Opcode::Call(DataType::NoType), &[], m);
    let anchor = plain.arena.create(Opcode::Anchor, &[call]);
    plain.append_stmt(anchor);
    assert!(!find_vector_methods(&plain));
}

#[test]
fn alias_links_are_symmetric() {
    let kernel = float_kernel();
    let table = build(&kernel.body, &kernel.oracle);

    for raw in 1..table.len() {
        let a = SymRefId::new(u32::try_from(raw).unwrap_or(0));
        let Some(aliases) = table.entry(a).aliases.as_ref() else {
            continue;
        };
        for &b in aliases {
            assert!(linked(&table, b, a), "#{} -> #{} not mirrored", a.raw(), b.raw());
        }
    }

    // The kernel's web: stores link locals to call results, call
    // receivers link results to their operands.
    assert!(linked(&table, kernel.v, kernel.m_from));
    assert!(linked(&table, kernel.v, kernel.m_add));
    assert!(linked(&table, kernel.v2, kernel.m_add));
    assert!(linked(&table, kernel.v2, kernel.m_into));
}

#[test]
fn species_and_array_arguments_are_not_linked() {
    let kernel = float_kernel();
    let table = build(&kernel.body, &kernel.oracle);
    assert!(!linked(&table, kernel.m_from, kernel.arr));
    assert!(table.entry(kernel.arr).aliases.is_none());
}

#[test]
fn known_species_records_a_concrete_width() {
    let kernel = float_kernel();
    let table = build(&kernel.body, &kernel.oracle);
    assert_eq!(table.entry(kernel.m_from).width, VecWidth::Bits(128));
    assert_eq!(
        table.entry(kernel.m_from).elem_type,
        Some(ElementType::Float32)
    );
    // The add call has no species argument; its width is left unset.
    assert_eq!(table.entry(kernel.m_add).width, VecWidth::Unset);
}

#[test]
fn unresolvable_species_degrades_to_unknown() {
    let kernel = float_kernel_with(None);
    let table = build(&kernel.body, &kernel.oracle);
    assert_eq!(table.entry(kernel.m_from).width, VecWidth::Unknown);
    // Unknown is trackable, not invalid.
    assert_ne!(table.class_id(kernel.m_from), CLASS_INVALID);
}

#[test]
fn conflicting_species_observations_downgrade_to_unknown() {
    let mut body = MethodBody::new();
    let obj_a = KnownObjectId::new(1);
    let obj_b = KnownObjectId::new(2);
    let mut oracle = FixedOracle::with_species(obj_a, 128);
    oracle.species.insert(obj_b, 256);

    let arr = body.symtab.alloc_param(ADDRESS);
    let i = body.symtab.alloc_local(I32);
    let species_a = body.symtab.alloc_static(ADDRESS);
    body.symtab.set_known_object(species_a, obj_a);
    let species_b = body.symtab.alloc_static(ADDRESS);
    body.symtab.set_known_object(species_b, obj_b);
    // One method symbol shared by two call sites with different species.
    let m_from = body
        .symtab
        .alloc_method(Some(RecognizedMethod::FloatVectorFromArray));

    for species in [species_a, species_b] {
        let species_load = body
            .arena
            .create_with_sym_ref(Opcode::Load(ADDRESS), &[], species);
        let arr_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], arr);
        let i_load = body.arena.create_with_sym_ref(Opcode::Load(I32), &[], i);
        let call = body.arena.create_with_sym_ref(
            Opcode::Call(ADDRESS),
            &[species_load, arr_load, i_load],
            m_from,
        );
        let anchor = body.arena.create(Opcode::Anchor, &[call]);
        body.append_stmt(anchor);
    }

    let table = build(&body, &oracle);
    assert_eq!(table.entry(m_from).width, VecWidth::Unknown);
}

#[test]
fn null_store_invalidates_the_target() {
    let mut body = MethodBody::new();
    let v = body.symtab.alloc_local(ADDRESS);
    let null = body.arena.create_const(ADDRESS, 0);
    let store = body.arena.create_with_sym_ref(Opcode::Store(ADDRESS), &[null], v);
    body.append_stmt(store);

    let table = build(&body, &FixedOracle::default());
    assert_eq!(table.class_id(v), CLASS_INVALID);
}

#[test]
fn irrelevant_stored_value_is_skipped() {
    let mut body = MethodBody::new();
    let v = body.symtab.alloc_local(ADDRESS);
    let null = body.arena.create_const(ADDRESS, 0);
    let store = body.arena.create_with_sym_ref(Opcode::Store(ADDRESS), &[null], v);
    body.arena
        .set_flags(store, NodeFlags::STORED_VALUE_IS_IRRELEVANT);
    body.append_stmt(store);

    let table = build(&body, &FixedOracle::default());
    assert_ne!(table.class_id(v), CLASS_INVALID);
}

#[test]
fn non_intrinsic_call_result_is_invalidated() {
    let mut body = MethodBody::new();
    let v = body.symtab.alloc_local(ADDRESS);
    let m = body.symtab.alloc_method(None);
    let v_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], v);
    let call = body
        .arena
        .create_with_sym_ref(Opcode::Call(DataType::NoType), &[v_load], m);
    let anchor = body.arena.create(Opcode::Anchor, &[call]);
    body.append_stmt(anchor);

    let table = build(&body, &FixedOracle::default());
    assert_eq!(table.class_id(m), CLASS_INVALID);
    // The argument is still linked, so the poison will reach it when
    // classes are built.
    assert!(linked(&table, m, v));
}

#[test]
fn returning_a_reference_escapes_it() {
    let mut body = MethodBody::new();
    let v = body.symtab.alloc_local(ADDRESS);
    let v_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], v);
    let ret = body.arena.create(Opcode::Return(ADDRESS), &[v_load]);
    body.append_stmt(ret);

    let table = build(&body, &FixedOracle::default());
    assert_eq!(table.class_id(v), CLASS_INVALID);
}

#[test]
fn taking_an_address_escapes_the_location() {
    let mut body = MethodBody::new();
    let v = body.symtab.alloc_local(ADDRESS);
    let addr = body.arena.create_with_sym_ref(Opcode::LoadAddress, &[], v);
    let anchor = body.arena.create(Opcode::Anchor, &[addr]);
    body.append_stmt(anchor);

    let table = build(&body, &FixedOracle::default());
    assert_eq!(table.class_id(v), CLASS_INVALID);
}

#[test]
fn dereferencing_a_tracked_reference_escapes_it() {
    let mut body = MethodBody::new();
    let v = body.symtab.alloc_local(ADDRESS);
    let shadow = body.symtab.array_shadow(I32);
    let v_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], v);
    let deref = body
        .arena
        .create_with_sym_ref(Opcode::LoadIndirect(I32), &[v_load], shadow);
    let anchor = body.arena.create(Opcode::Anchor, &[deref]);
    body.append_stmt(anchor);

    let table = build(&body, &FixedOracle::default());
    assert_eq!(table.class_id(v), CLASS_INVALID);
}

#[test]
fn generic_descriptors_resolve_element_type_and_width() {
    let mut body = MethodBody::new();
    let etype_obj = KnownObjectId::new(7);
    let mut oracle = FixedOracle::default();
    oracle.classes.insert(etype_obj, ElementType::Float32);

    let arr = body.symtab.alloc_param(ADDRESS);
    let i = body.symtab.alloc_local(I32);
    let etype = body.symtab.alloc_static(ADDRESS);
    body.symtab.set_known_object(etype, etype_obj);
    let m_load = body
        .symtab
        .alloc_method(Some(RecognizedMethod::VectorSupportLoad));

    let etype_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], etype);
    let lanes = body.arena.create_const(I32, 4);
    let arr_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], arr);
    let i_load = body.arena.create_with_sym_ref(Opcode::Load(I32), &[], i);
    let call = body.arena.create_with_sym_ref(
        Opcode::Call(ADDRESS),
        &[etype_load, lanes, arr_load, i_load],
        m_load,
    );
    let anchor = body.arena.create(Opcode::Anchor, &[call]);
    body.append_stmt(anchor);

    let table = build(&body, &oracle);
    assert_eq!(table.entry(m_load).elem_type, Some(ElementType::Float32));
    assert_eq!(table.entry(m_load).width, VecWidth::Bits(128));
    assert_ne!(table.class_id(m_load), CLASS_INVALID);
}

#[test]
fn unresolved_element_descriptor_invalidates_the_call() {
    let mut body = MethodBody::new();
    let arr = body.symtab.alloc_param(ADDRESS);
    let i = body.symtab.alloc_local(I32);
    // No known object on the descriptor: the oracle cannot resolve it.
    let etype = body.symtab.alloc_static(ADDRESS);
    let m_load = body
        .symtab
        .alloc_method(Some(RecognizedMethod::VectorSupportLoad));

    let etype_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], etype);
    let lanes = body.arena.create_const(I32, 4);
    let arr_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], arr);
    let i_load = body.arena.create_with_sym_ref(Opcode::Load(I32), &[], i);
    let call = body.arena.create_with_sym_ref(
        Opcode::Call(ADDRESS),
        &[etype_load, lanes, arr_load, i_load],
        m_load,
    );
    let anchor = body.arena.create(Opcode::Anchor, &[call]);
    body.append_stmt(anchor);

    let table = build(&body, &FixedOracle::default());
    assert_eq!(table.class_id(m_load), CLASS_INVALID);
}

#[test]
fn non_constant_lane_count_degrades_to_unknown() {
    let mut body = MethodBody::new();
    let etype_obj = KnownObjectId::new(7);
    let mut oracle = FixedOracle::default();
    oracle.classes.insert(etype_obj, ElementType::Float32);

    let arr = body.symtab.alloc_param(ADDRESS);
    let i = body.symtab.alloc_local(I32);
    let n = body.symtab.alloc_local(I32);
    let etype = body.symtab.alloc_static(ADDRESS);
    body.symtab.set_known_object(etype, etype_obj);
    let m_load = body
        .symtab
        .alloc_method(Some(RecognizedMethod::VectorSupportLoad));

    let etype_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], etype);
    let lanes = body.arena.create_with_sym_ref(Opcode::Load(I32), &[], n);
    let arr_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], arr);
    let i_load = body.arena.create_with_sym_ref(Opcode::Load(I32), &[], i);
    let call = body.arena.create_with_sym_ref(
        Opcode::Call(ADDRESS),
        &[etype_load, lanes, arr_load, i_load],
        m_load,
    );
    let anchor = body.arena.create(Opcode::Anchor, &[call]);
    body.append_stmt(anchor);

    let table = build(&body, &oracle);
    assert_eq!(table.entry(m_load).width, VecWidth::Unknown);
    assert_ne!(table.class_id(m_load), CLASS_INVALID);
}

#[test]
fn lane_expansion_lane_zero_is_the_original() {
    let mut body = MethodBody::new();
    let c = body.arena.create_const(I32, 1);
    let lanes = LaneExpansion::default();
    assert_eq!(lanes.get(c, 0), c);
}

#[test]
#[should_panic(expected = "requested before expansion")]
fn lane_expansion_missing_lane_is_fatal() {
    let mut body = MethodBody::new();
    let c = body.arena.create_const(I32, 1);
    let lanes = LaneExpansion::default();
    let _ = lanes.get(c, 1);
}
