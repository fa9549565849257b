//! Shared test utilities for the expansion pass.
//!
//! Consolidates the method-body builders and counting helpers used by
//! the `aliasing`, `classes`, `lowering`, and pipeline tests. Only
//! compiled in test builds.

use rustc_hash::{FxHashMap, FxHashSet};

use helix_ir::{
    DataType, ElementType, KnownObjectId, MethodBody, NodeId, Opcode, RecognizedMethod, SymRefId,
    TypeOracle,
};

/// Oracle backed by fixed maps, as the host's known-object table would
/// answer for constants folded at compile time.
#[derive(Default)]
pub(crate) struct FixedOracle {
    pub species: FxHashMap<KnownObjectId, u32>,
    pub classes: FxHashMap<KnownObjectId, ElementType>,
}

impl FixedOracle {
    pub(crate) fn with_species(obj: KnownObjectId, bits: u32) -> Self {
        let mut oracle = Self::default();
        oracle.species.insert(obj, bits);
        oracle
    }
}

impl TypeOracle for FixedOracle {
    fn species_bit_width(&self, obj: KnownObjectId) -> Option<u32> {
        self.species.get(&obj).copied()
    }

    fn element_type_of_class(&self, obj: KnownObjectId) -> Option<ElementType> {
        self.classes.get(&obj).copied()
    }
}

pub(crate) const ADDRESS: DataType = DataType::Address;
pub(crate) const F32: DataType = DataType::Element(ElementType::Float32);
pub(crate) const I32: DataType = DataType::Element(ElementType::Int32);

/// The float kernel of the pipeline tests:
///
/// ```text
/// v  = FloatVector.fromArray(SPECIES, arr, i);
/// v2 = v.add(v);
/// v2.intoArray(arr, i);
/// ```
///
/// Calls are anchored under their own statements, and the stores
/// reference the call nodes as shared children, the shape the inliner
/// leaves behind.
pub(crate) struct FloatKernel {
    pub body: MethodBody,
    pub oracle: FixedOracle,
    pub arr: SymRefId,
    pub v: SymRefId,
    pub v2: SymRefId,
    pub m_from: SymRefId,
    pub m_add: SymRefId,
    pub m_into: SymRefId,
    pub call_from: NodeId,
    pub call_add: NodeId,
    pub call_into: NodeId,
    pub store_v: NodeId,
    pub store_v2: NodeId,
}

/// Build the float kernel with a compile-time-known 128-bit species.
pub(crate) fn float_kernel() -> FloatKernel {
    float_kernel_with(Some(128))
}

/// Build the float kernel; `species_bits: None` leaves the species
/// constant unresolvable (a species that reached the method as plain
/// data, e.g. through a parameter).
pub(crate) fn float_kernel_with(species_bits: Option<u32>) -> FloatKernel {
    let mut body = MethodBody::new();
    let species_obj = KnownObjectId::new(1);
    let oracle = match species_bits {
        Some(bits) => FixedOracle::with_species(species_obj, bits),
        None => FixedOracle::default(),
    };

    let arr = body.symtab.alloc_param(ADDRESS);
    let i = body.symtab.alloc_local(I32);
    let species = body.symtab.alloc_static(ADDRESS);
    body.symtab.set_known_object(species, species_obj);
    let v = body.symtab.alloc_local(ADDRESS);
    let v2 = body.symtab.alloc_local(ADDRESS);
    let m_from = body
        .symtab
        .alloc_method(Some(RecognizedMethod::FloatVectorFromArray));
    let m_add = body
        .symtab
        .alloc_method(Some(RecognizedMethod::FloatVectorAdd));
    let m_into = body
        .symtab
        .alloc_method(Some(RecognizedMethod::FloatVectorIntoArray));

    // v = FloatVector.fromArray(SPECIES, arr, i)
    let species_load = body
        .arena
        .create_with_sym_ref(Opcode::Load(ADDRESS), &[], species);
    let arr_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], arr);
    let i_load = body.arena.create_with_sym_ref(Opcode::Load(I32), &[], i);
    let call_from = body.arena.create_with_sym_ref(
        Opcode::Call(ADDRESS),
        &[species_load, arr_load, i_load],
        m_from,
    );
    let anchor_from = body.arena.create(Opcode::Anchor, &[call_from]);
    body.append_stmt(anchor_from);
    let store_v = body
        .arena
        .create_with_sym_ref(Opcode::Store(ADDRESS), &[call_from], v);
    body.append_stmt(store_v);

    // v2 = v.add(v)
    let v_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], v);
    let call_add = body
        .arena
        .create_with_sym_ref(Opcode::Call(ADDRESS), &[v_load, v_load], m_add);
    let anchor_add = body.arena.create(Opcode::Anchor, &[call_add]);
    body.append_stmt(anchor_add);
    let store_v2 = body
        .arena
        .create_with_sym_ref(Opcode::Store(ADDRESS), &[call_add], v2);
    body.append_stmt(store_v2);

    // v2.intoArray(arr, i)
    let v2_load = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], v2);
    let arr_load2 = body.arena.create_with_sym_ref(Opcode::Load(ADDRESS), &[], arr);
    let i_load2 = body.arena.create_with_sym_ref(Opcode::Load(I32), &[], i);
    let call_into = body.arena.create_with_sym_ref(
        Opcode::Call(DataType::NoType),
        &[v2_load, arr_load2, i_load2],
        m_into,
    );
    let anchor_into = body.arena.create(Opcode::Anchor, &[call_into]);
    body.append_stmt(anchor_into);

    FloatKernel {
        body,
        oracle,
        arr,
        v,
        v2,
        m_from,
        m_add,
        m_into,
        call_from,
        call_add,
        call_into,
        store_v,
        store_v2,
    }
}

/// Count distinct nodes reachable from the statement list that satisfy
/// `pred`. Shared children are counted once.
pub(crate) fn count_nodes(body: &MethodBody, pred: impl Fn(Opcode) -> bool) -> usize {
    let mut seen = FxHashSet::default();
    let mut count = 0;
    for idx in 0..body.num_stmts() {
        count_from(body, body.stmt(idx), &pred, &mut seen, &mut count);
    }
    count
}

fn count_from(
    body: &MethodBody,
    node: NodeId,
    pred: &impl Fn(Opcode) -> bool,
    seen: &mut FxHashSet<NodeId>,
    count: &mut usize,
) {
    if !seen.insert(node) {
        return;
    }
    if pred(body.arena.opcode(node)) {
        *count += 1;
    }
    for &child in body.arena.children(node) {
        count_from(body, child, pred, seen, count);
    }
}
