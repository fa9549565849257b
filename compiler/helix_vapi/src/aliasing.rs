//! Alias table and alias graph construction.
//!
//! One traversal over the method body links every storage location (and
//! every addressable call result) that must carry the same vector
//! representation, and permanently invalidates locations whose value or
//! address escapes the region the pass can reason about.
//!
//! # Invalidation
//!
//! Invalidation (`class_id = -1`) is monotone: nothing later in the pass
//! ever marks an invalidated location valid again. The worst outcome for
//! any location is that its call sites keep their original, boxed,
//! object-oriented behavior.

use rustc_hash::{FxHashMap, FxHashSet};

use helix_ir::{
    DataType, ElementType, MethodBody, NodeFlags, NodeId, Opcode, RecognizedMethod, SymRefId,
    TypeOracle, VecWidth,
};

use crate::catalog::{self, ArgRole};
use crate::LoweringStrategy;

/// Alias class id of a storage location: `0` = unclassified, `-1` =
/// permanently invalid, `N > 0` = the representative's sym-ref id.
pub type ClassId = i32;

pub const CLASS_UNCLASSIFIED: ClassId = 0;
pub const CLASS_INVALID: ClassId = -1;

/// Per-location state, indexed by sym-ref id.
#[derive(Clone, Debug, Default)]
pub struct AliasEntry {
    /// Locations this one has been linked to. Symmetric by construction.
    pub aliases: Option<FxHashSet<SymRefId>>,
    pub class_id: ClassId,
    /// Element type observed at this location (recognized calls only).
    pub elem_type: Option<ElementType>,
    /// Vector width observed at this location.
    pub width: VecWidth,
    /// Wide temporary allocated when the class vectorizes.
    pub vec_sym: Option<SymRefId>,
    /// Per-lane temporaries allocated when the class scalarizes.
    pub scalar_syms: Option<Vec<SymRefId>>,
}

/// Pass-local alias table. Constructed fresh for every invocation; never
/// shared across concurrently compiled methods.
#[derive(Debug)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    /// Create a table covering the method's current symbol references.
    pub fn new(num_sym_refs: usize) -> Self {
        Self {
            entries: vec![AliasEntry::default(); num_sym_refs],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, sym: SymRefId) -> &AliasEntry {
        &self.entries[sym.index()]
    }

    pub fn entry_mut(&mut self, sym: SymRefId) -> &mut AliasEntry {
        &mut self.entries[sym.index()]
    }

    /// Class id of a location. Symbols allocated after table
    /// construction (lane temporaries, shadows created during lowering)
    /// are reported unclassified.
    pub fn class_id(&self, sym: SymRefId) -> ClassId {
        self.entries
            .get(sym.index())
            .map_or(CLASS_UNCLASSIFIED, |e| e.class_id)
    }

    /// Link two locations into the same alias class. Symmetric.
    pub fn alias(&mut self, a: SymRefId, b: SymRefId) {
        tracing::trace!(a = a.raw(), b = b.raw(), "aliasing");
        self.entries[a.index()]
            .aliases
            .get_or_insert_with(FxHashSet::default)
            .insert(b);
        self.entries[b.index()]
            .aliases
            .get_or_insert_with(FxHashSet::default)
            .insert(a);
    }

    /// Permanently invalidate a location's class.
    pub fn invalidate(&mut self, sym: SymRefId) {
        tracing::trace!(sym = sym.raw(), "invalidating");
        self.entries[sym.index()].class_id = CLASS_INVALID;
    }

    /// Invalidate a whole class through its representative.
    pub(crate) fn invalidate_class(&mut self, rep: SymRefId) {
        let members: Vec<SymRefId> = self.entry(rep).aliases.iter().flatten().copied().collect();
        for m in members {
            self.entries[m.index()].class_id = CLASS_INVALID;
        }
        self.entries[rep.index()].class_id = CLASS_INVALID;
    }
}

/// Cheap pre-scan: does the method call any recognized Vector API method
/// at all? The pass exits immediately when it does not.
pub(crate) fn find_vector_methods(method: &MethodBody) -> bool {
    (0..method.num_stmts()).any(|idx| {
        let (node, _) = method.stmt_value(idx);
        method.arena.opcode(node).is_function_call()
            && method
                .arena
                .sym_ref(node)
                .is_some_and(|sym| method.symtab.recognized_method(sym).is_some())
    })
}

/// Build the alias graph for one method.
pub(crate) fn build_aliases(
    method: &MethodBody,
    oracle: &dyn TypeOracle,
    strategy: LoweringStrategy,
    table: &mut AliasTable,
) {
    tracing::debug!(num_stmts = method.num_stmts(), "building vector aliases");
    let mut builder = AliasBuilder {
        method,
        oracle,
        strategy,
        table,
        visited: FxHashSet::default(),
    };
    for idx in 0..method.num_stmts() {
        let (node, _) = method.stmt_value(idx);
        builder.visit(node);
    }
}

struct AliasBuilder<'a> {
    method: &'a MethodBody,
    oracle: &'a dyn TypeOracle,
    strategy: LoweringStrategy,
    table: &'a mut AliasTable,
    /// The IR is a shared DAG; each node is processed exactly once.
    visited: FxHashSet<NodeId>,
}

impl AliasBuilder<'_> {
    fn visit(&mut self, node: NodeId) {
        if !self.visited.insert(node) {
            return;
        }
        let arena = &self.method.arena;
        match arena.opcode(node) {
            Opcode::Store(DataType::Address) => {
                self.visit_ref_store(node, arena.child(node, 0));
            }
            Opcode::StoreIndirect(dt) => {
                // Storing through a tracked reference escapes it.
                self.invalidate_if_storage_read(arena.child(node, 0));
                if dt.is_address() {
                    self.visit_ref_store(node, arena.child(node, 1));
                }
            }
            Opcode::LoadIndirect(_) => {
                // Dereferencing a tracked reference escapes it.
                self.invalidate_if_storage_read(arena.child(node, 0));
            }
            Opcode::LoadAddress => {
                self.table.invalidate(arena.require_sym_ref(node));
            }
            Opcode::Return(DataType::Address) => {
                self.invalidate_if_storage_read(arena.child(node, 0));
            }
            Opcode::Call(_) => self.visit_call(node),
            _ => {}
        }
        for &child in arena.children(node) {
            self.visit(child);
        }
    }

    /// A reference leaving the method through an address-of, an indirect
    /// access, or a return can never be privatized: kill its class.
    fn invalidate_if_storage_read(&mut self, child: NodeId) {
        if self.method.arena.opcode(child) == Opcode::Load(DataType::Address) {
            let sym = self.method.arena.require_sym_ref(child);
            tracing::trace!(sym = sym.raw(), "reference escapes; invalidating");
            self.table.invalidate(sym);
        }
    }

    fn visit_ref_store(&mut self, node: NodeId, rhs: NodeId) {
        let arena = &self.method.arena;
        if arena
            .flags(node)
            .contains(NodeFlags::STORED_VALUE_IS_IRRELEVANT)
        {
            return;
        }
        let rhs_op = arena.opcode(rhs);
        if rhs_op.is_address_const() {
            // A constant reference (null, boxed constant) cannot be
            // unified with a vector representation.
            tracing::trace!(node = node.raw(), "constant rhs; invalidating store target");
            self.table.invalidate(arena.require_sym_ref(node));
        } else if rhs_op.is_address_producer() {
            self.table
                .alias(arena.require_sym_ref(node), arena.require_sym_ref(rhs));
        }
    }

    fn visit_call(&mut self, node: NodeId) {
        let arena = &self.method.arena;
        let call_sym = arena.require_sym_ref(node);
        let recognized = self.method.symtab.recognized_method(call_sym);

        for (i, &child) in arena.children(node).iter().enumerate() {
            if let Some(m) = recognized {
                // Descriptor arguments never carry a vector value.
                if matches!(
                    catalog::arg_role(m, i),
                    ArgRole::Species
                        | ArgRole::Array
                        | ArgRole::ElementTypeDescr
                        | ArgRole::LaneCountDescr
                ) {
                    continue;
                }
            }
            let child_op = arena.opcode(child);
            if child_op.is_address_producer() {
                self.table.alias(call_sym, arena.require_sym_ref(child));
            } else if child_op.is_address_const() {
                tracing::trace!(node = node.raw(), "constant argument; invalidating call");
                self.table.invalidate(call_sym);
            }
        }

        match recognized {
            None => {
                // Feeding a vector value into uncontrolled code is
                // unsupported; the result (and everything linked to it)
                // must stay in object form.
                tracing::trace!(sym = call_sym.raw(), "non-intrinsic call; invalidating result");
                self.table.invalidate(call_sym);
            }
            Some(m) => self.update_call_shape(node, call_sym, m),
        }
    }

    /// Resolve the species / element-class / lane-count arguments of a
    /// recognized call and record element type and width on its result
    /// location.
    fn update_call_shape(&mut self, node: NodeId, call_sym: SymRefId, m: RecognizedMethod) {
        let arena = &self.method.arena;
        let symtab = &self.method.symtab;
        let row = catalog::entry(m);

        let mut elem = row.element_type;
        let mut width = self.table.entry(call_sym).width;

        for (i, &child) in arena.children(node).iter().enumerate() {
            match catalog::arg_role(m, i) {
                ArgRole::Species => {
                    let resolved = arena
                        .sym_ref(child)
                        .and_then(|sym| symtab.known_object(sym))
                        .and_then(|obj| self.oracle.species_bit_width(obj))
                        .map_or(VecWidth::Unknown, VecWidth::Bits);
                    tracing::trace!(node = node.raw(), ?resolved, "species width");
                    width = reconcile_width(width, resolved);
                }
                ArgRole::ElementTypeDescr => {
                    if elem.is_none() {
                        elem = arena
                            .sym_ref(child)
                            .and_then(|sym| symtab.known_object(sym))
                            .and_then(|obj| self.oracle.element_type_of_class(obj));
                    }
                }
                ArgRole::LaneCountDescr => {
                    let resolved = match (arena.opcode(child), elem) {
                        (Opcode::Const(_), Some(e)) => {
                            match u32::try_from(arena.node(child).const_value) {
                                Ok(lanes) if lanes > 0 => VecWidth::Bits(lanes * e.bits()),
                                _ => VecWidth::Unknown,
                            }
                        }
                        _ => VecWidth::Unknown,
                    };
                    width = reconcile_width(width, resolved);
                }
                _ => {}
            }
        }

        tracing::trace!(sym = call_sym.raw(), ?elem, ?width, "recorded call shape");
        {
            let e = self.table.entry_mut(call_sym);
            e.elem_type = elem;
            e.width = width;
        }

        let feasible = match self.strategy {
            LoweringStrategy::Scalarize => row.kind.check_scalar(elem, width),
            LoweringStrategy::Vectorize => row.kind.check_vector(elem, width),
        };
        let has_width_source = row
            .arg_roles
            .iter()
            .any(|r| matches!(r, ArgRole::Species | ArgRole::LaneCountDescr));
        if elem.is_none() || (has_width_source && width == VecWidth::Unset) || !feasible {
            tracing::trace!(sym = call_sym.raw(), "unsupported call shape; invalidating");
            self.table.invalidate(call_sym);
        }
    }
}

/// Merge a newly observed width into the running one. A disagreement
/// downgrades to `Unknown` — still trackable, never vectorizable.
fn reconcile_width(cur: VecWidth, new: VecWidth) -> VecWidth {
    match (cur, new) {
        (VecWidth::Unset, n) => n,
        (c, VecWidth::Unset) => c,
        (c, n) if c == n => c,
        _ => VecWidth::Unknown,
    }
}

/// Lane expansion cache: `(original node, lane index ≥ 1)` → the node
/// computing that lane's value. Lane 0 is the original node, mutated in
/// place. Exists only while one method is being scalarized.
#[derive(Debug, Default)]
pub(crate) struct LaneExpansion {
    map: FxHashMap<NodeId, smallvec::SmallVec<[NodeId; 8]>>,
}

impl LaneExpansion {
    /// Record the node computing `lane` of `node`. Lanes are registered
    /// in order, starting at 1.
    pub(crate) fn set(&mut self, node: NodeId, lane: usize, expanded: NodeId) {
        debug_assert!(lane >= 1, "lane 0 is the original node");
        let lanes = self.map.entry(node).or_default();
        debug_assert_eq!(lanes.len(), lane - 1, "lanes must be registered in order");
        lanes.push(expanded);
    }

    /// The node computing `lane` of `node`. Lane 0 is `node` itself.
    /// Panics if the lane has not been registered — operands are always
    /// lowered before their uses in program order.
    #[track_caller]
    pub(crate) fn get(&self, node: NodeId, lane: usize) -> NodeId {
        if lane == 0 {
            return node;
        }
        match self.map.get(&node).and_then(|lanes| lanes.get(lane - 1)) {
            Some(&expanded) => expanded,
            None => panic!(
                "lane {lane} of node n{} requested before expansion",
                node.raw()
            ),
        }
    }
}

#[cfg(test)]
mod tests;
