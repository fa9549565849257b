//! Lowering engine: rewrites committed classes in place.
//!
//! Second program-order traversal. Statements that are a reference store
//! or a recognized intrinsic call whose class survived validation are
//! rewritten according to the run's strategy:
//!
//! - **Scalarize** — the original node becomes lane 0; lanes `1..N` are
//!   fresh sibling nodes registered in the [`LaneExpansion`] cache and
//!   spliced, each under its own `Anchor` statement, immediately after
//!   the original statement.
//! - **Vectorize** — the node is retagged to one hardware-wide opcode
//!   bound to a single wide temporary or a vector array shadow.
//!
//! Operand lanes are resolved transitively through the cache: program
//! order respects data dependencies for straight-line array code, so an
//! operand's lanes always exist by the time a use is rewritten.
//!
//! Children of a node about to be destructively retagged are first
//! anchored into standalone evaluation statements spliced before the
//! rewritten statement, preserving their original evaluation order.

use rustc_hash::FxHashMap;

use helix_ir::{
    DataType, ElementType, MethodBody, NodeFlags, NodeId, Opcode, RecognizedMethod, SymRefId,
    TypeOracle,
};

use crate::aliasing::{AliasTable, ClassId, LaneExpansion};
use crate::catalog::{self, ArgRole, IntrinsicKind};
use crate::ops::{self, VectorOperator};
use crate::{CommitGate, LoweringStrategy};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClassDecision {
    Committed,
    Vetoed,
}

/// Run the lowering traversal. Returns whether any rewrite occurred.
pub(crate) fn lower(
    method: &mut MethodBody,
    oracle: &dyn TypeOracle,
    strategy: LoweringStrategy,
    table: &mut AliasTable,
    gate: &dyn CommitGate,
) -> bool {
    tracing::debug!(?strategy, "lowering surviving classes");
    let mut lw = Lowerer {
        method,
        oracle,
        strategy,
        table,
        lanes: LaneExpansion::default(),
        decisions: FxHashMap::default(),
        cur: 0,
        rewrote: false,
    };
    while lw.cur < lw.method.num_stmts() {
        lw.lower_stmt(gate);
        lw.cur += 1;
    }
    lw.rewrote
}

struct Lowerer<'a> {
    method: &'a mut MethodBody,
    oracle: &'a dyn TypeOracle,
    strategy: LoweringStrategy,
    table: &'a mut AliasTable,
    lanes: LaneExpansion,
    /// One-shot commit decision per class, made at the first visited
    /// member, before any of the class is rewritten.
    decisions: FxHashMap<ClassId, ClassDecision>,
    /// Index of the statement currently being rewritten.
    cur: usize,
    rewrote: bool,
}

impl Lowerer<'_> {
    fn lower_stmt(&mut self, gate: &dyn CommitGate) {
        let (node, wrapper) = self.method.stmt_value(self.cur);
        let opcode = self.method.arena.opcode(node);
        if !opcode.has_sym_ref() {
            return;
        }
        let Some(sym) = self.method.arena.sym_ref(node) else {
            return;
        };
        let class_id = self.table.class_id(sym);
        if class_id <= 0 {
            return;
        }
        if self
            .method
            .arena
            .flags(node)
            .contains(NodeFlags::STORED_VALUE_IS_IRRELEVANT)
        {
            return;
        }

        let is_ref_store = opcode.is_address_store();
        let recognized = if opcode.is_function_call() {
            self.method.symtab.recognized_method(sym)
        } else {
            None
        };
        if !is_ref_store && recognized.is_none() {
            return;
        }

        // Class shape comes from the representative.
        #[expect(
            clippy::cast_sign_loss,
            reason = "class ids greater than zero are sym-ref ids"
        )]
        let rep = SymRefId::new(class_id as u32);
        let Some(elem) = self.table.entry(rep).elem_type else {
            panic!("validated class {class_id} has no element type");
        };
        let Some(bits) = self.table.entry(rep).width.concrete() else {
            panic!("validated class {class_id} has no concrete width");
        };

        match self.decide(gate, class_id, rep, elem, bits) {
            ClassDecision::Vetoed => return,
            ClassDecision::Committed => {}
        }

        let num_lanes = (bits / elem.bits()) as usize;
        tracing::trace!(node = node.raw(), class = class_id, "transforming node");

        if is_ref_store {
            self.store_handler(node, elem, bits, num_lanes);
        } else if let Some(m) = recognized {
            // The call is being replaced; a null-check wrapper is no
            // longer meaningful once the receiver dispatch is gone.
            if let Some(w) = wrapper {
                if self.method.arena.opcode(w) == Opcode::NullCheck {
                    self.method.arena.recreate(w, Opcode::Anchor);
                }
            }
            let row = catalog::entry(m);
            let width = self.table.entry(rep).width;
            let feasible = match self.strategy {
                LoweringStrategy::Scalarize => row.kind.check_scalar(Some(elem), width),
                LoweringStrategy::Vectorize => row.kind.check_vector(Some(elem), width),
            };
            assert!(
                feasible,
                "validation accepted {m:?} but its handler cannot lower it"
            );
            self.apply(row.kind, m, node, elem, bits, num_lanes);
        }
        self.rewrote = true;

        // Splice the per-lane statements, preserving evaluation order.
        if self.strategy == LoweringStrategy::Scalarize {
            let mut after = self.cur;
            for lane in 1..num_lanes {
                let lane_node = self.lanes.get(node, lane);
                let anchor = self.method.arena.create(Opcode::Anchor, &[lane_node]);
                self.method.insert_after(after, anchor);
                after += 1;
            }
            self.cur = after;
        }
    }

    /// One-shot commit decision for a class. A veto invalidates the
    /// whole class before any member is rewritten.
    fn decide(
        &mut self,
        gate: &dyn CommitGate,
        class_id: ClassId,
        rep: SymRefId,
        elem: ElementType,
        bits: u32,
    ) -> ClassDecision {
        if let Some(&d) = self.decisions.get(&class_id) {
            return d;
        }
        let d = if gate.should_commit(class_id, elem, bits) {
            ClassDecision::Committed
        } else {
            tracing::debug!(class = class_id, "class vetoed at commit point");
            self.table.invalidate_class(rep);
            ClassDecision::Vetoed
        };
        self.decisions.insert(class_id, d);
        d
    }

    fn apply(
        &mut self,
        kind: IntrinsicKind,
        m: RecognizedMethod,
        node: NodeId,
        elem: ElementType,
        bits: u32,
        num_lanes: usize,
    ) {
        match kind {
            IntrinsicKind::FromArray => self.from_array(m, node, elem, bits, num_lanes),
            IntrinsicKind::IntoArray => self.into_array(m, node, elem, bits, num_lanes),
            IntrinsicKind::Binary(op) => self.binary(op, m, node, elem, bits, num_lanes),
            IntrinsicKind::Unary(op) => self.unary(op, m, node, elem, bits, num_lanes),
            IntrinsicKind::Unsupported => {
                unreachable!("unsupported intrinsic {m:?} survived validation")
            }
        }
    }

    // ── Storage rewrites ────────────────────────────────────────────

    /// Per-lane temporaries for a location, allocated on first use.
    fn scalar_syms_for(
        &mut self,
        sym: SymRefId,
        elem: ElementType,
        num_lanes: usize,
    ) -> Vec<SymRefId> {
        if let Some(syms) = &self.table.entry(sym).scalar_syms {
            return syms.clone();
        }
        let dt = DataType::Element(elem);
        let syms: Vec<SymRefId> = (0..num_lanes)
            .map(|_| self.method.symtab.alloc_local(dt))
            .collect();
        for &s in &syms {
            tracing::trace!(scalar = s.raw(), original = sym.raw(), "created scalar temp");
        }
        self.table.entry_mut(sym).scalar_syms = Some(syms.clone());
        syms
    }

    /// Wide temporary for a location, allocated on first use.
    fn vec_sym_for(&mut self, sym: SymRefId, vt: DataType) -> SymRefId {
        if let Some(vec_sym) = self.table.entry(sym).vec_sym {
            return vec_sym;
        }
        let vec_sym = self.method.symtab.alloc_local(vt);
        tracing::trace!(vector = vec_sym.raw(), original = sym.raw(), "created vector temp");
        self.table.entry_mut(sym).vec_sym = Some(vec_sym);
        vec_sym
    }

    /// Retag a direct reference load or store to its lane-0 scalar form
    /// and return the class's per-lane temporaries.
    fn scalarize_load_or_store(
        &mut self,
        node: NodeId,
        elem: ElementType,
        num_lanes: usize,
    ) -> Vec<SymRefId> {
        let sym = self.method.arena.require_sym_ref(node);
        let syms = self.scalar_syms_for(sym, elem, num_lanes);
        let dt = DataType::Element(elem);
        if self.method.arena.opcode(node).is_store() {
            self.method.arena.recreate(node, Opcode::Store(dt));
        } else {
            self.method.arena.recreate(node, Opcode::Load(dt));
        }
        self.method.arena.set_sym_ref(node, syms[0]);
        syms
    }

    /// Retag a direct reference load or store to its wide-vector form.
    fn vectorize_load_or_store(&mut self, node: NodeId, vt: DataType) {
        let sym = self.method.arena.require_sym_ref(node);
        let vec_sym = self.vec_sym_for(sym, vt);
        if self.method.arena.opcode(node).is_store() {
            self.method.arena.recreate(node, Opcode::Store(vt));
        } else {
            self.method.arena.recreate(node, Opcode::Load(vt));
        }
        self.method.arena.set_sym_ref(node, vec_sym);
    }

    /// Expand a direct reference load feeding an intrinsic operand.
    fn load_handler(&mut self, node: NodeId, elem: ElementType, bits: u32, num_lanes: usize) {
        match self.strategy {
            LoweringStrategy::Scalarize => {
                let syms = self.scalarize_load_or_store(node, elem, num_lanes);
                for lane in 1..num_lanes {
                    let load = self.method.arena.create_with_sym_ref(
                        Opcode::Load(DataType::Element(elem)),
                        &[],
                        syms[lane],
                    );
                    self.lanes.set(node, lane, load);
                }
            }
            LoweringStrategy::Vectorize => {
                self.vectorize_load_or_store(node, DataType::Vector { elem, bits });
            }
        }
    }

    /// Rewrite a reference store whose class committed.
    fn store_handler(&mut self, node: NodeId, elem: ElementType, bits: u32, num_lanes: usize) {
        let rhs = self.method.arena.child(node, 0);
        match self.strategy {
            LoweringStrategy::Scalarize => {
                let syms = self.scalarize_load_or_store(node, elem, num_lanes);
                if self.method.arena.opcode(rhs) == Opcode::Load(DataType::Address) {
                    self.load_handler(rhs, elem, bits, num_lanes);
                }
                for lane in 1..num_lanes {
                    let value = self.lanes.get(rhs, lane);
                    let store = self.method.arena.create_with_sym_ref(
                        Opcode::Store(DataType::Element(elem)),
                        &[value],
                        syms[lane],
                    );
                    self.lanes.set(node, lane, store);
                }
            }
            LoweringStrategy::Vectorize => {
                let vt = DataType::Vector { elem, bits };
                self.vectorize_load_or_store(node, vt);
                if self.method.arena.opcode(rhs) == Opcode::Load(DataType::Address) {
                    self.vectorize_load_or_store(rhs, vt);
                }
            }
        }
    }

    // ── Intrinsic handlers ──────────────────────────────────────────

    /// Locate the array argument and the element index that follows it.
    fn array_and_index(&self, m: RecognizedMethod, node: NodeId) -> (NodeId, NodeId) {
        let children = self.method.arena.children(node);
        for (i, &child) in children.iter().enumerate() {
            if catalog::arg_role(m, i) == ArgRole::Array {
                return (child, children[i + 1]);
            }
        }
        panic!("intrinsic {m:?} has no array argument");
    }

    /// The vector operand of a store intrinsic: the receiver for
    /// instance methods, the declared vector argument otherwise.
    fn stored_value(&self, m: RecognizedMethod, node: NodeId) -> NodeId {
        if !catalog::entry(m).is_static {
            return self.method.arena.child(node, 0);
        }
        let children = self.method.arena.children(node);
        for (i, &child) in children.iter().enumerate() {
            if catalog::arg_role(m, i) == ArgRole::Vector {
                return child;
            }
        }
        panic!("intrinsic {m:?} has no vector operand");
    }

    /// All vector operands of an elementwise intrinsic, receiver first.
    fn vector_operands(&self, m: RecognizedMethod, node: NodeId) -> Vec<NodeId> {
        self.method
            .arena
            .children(node)
            .iter()
            .enumerate()
            .filter(|&(i, _)| catalog::arg_role(m, i) == ArgRole::Vector)
            .map(|(_, &child)| child)
            .collect()
    }

    /// Anchor every child that the rewrite is about to detach into its
    /// own evaluation statement before the current one, so the child's
    /// original evaluation order and liveness survive the retag.
    fn anchor_detached_children(&mut self, node: NodeId, kept: &[NodeId]) {
        let detached: Vec<NodeId> = self
            .method
            .arena
            .children(node)
            .iter()
            .copied()
            .filter(|c| !kept.contains(c))
            .collect();
        for child in detached {
            tracing::trace!(child = child.raw(), "anchoring detached child");
            let anchor = self.method.arena.create(Opcode::Anchor, &[child]);
            self.method.insert_before(self.cur, anchor);
            self.cur += 1;
        }
    }

    /// Effective element address: `array + header + (index << log2(size))`.
    fn gen_address(&mut self, array: NodeId, index: NodeId, elem_size: i64) -> NodeId {
        let mut shift = 0i64;
        let mut size = elem_size;
        while size > 1 {
            size >>= 1;
            shift += 1;
        }
        let arena = &mut self.method.arena;
        let i2l = arena.create(Opcode::IntToLong, &[index]);
        let shift_amount = arena.create_const(DataType::Element(ElementType::Int32), shift);
        let shl = arena.create(Opcode::ShiftLeft, &[i2l, shift_amount]);
        let header = arena.create_const(
            DataType::Element(ElementType::Int64),
            self.oracle.array_header_size(),
        );
        let ladd = arena.create(Opcode::LongAdd, &[shl, header]);
        arena.create(Opcode::AddressAdd, &[array, ladd])
    }

    /// Same base address, displaced by `lane * elem_size` bytes.
    fn lane_address(&mut self, base: NodeId, lane: usize, elem_size: i64) -> NodeId {
        let offset = self.method.arena.create_const(
            DataType::Element(ElementType::Int64),
            lane as i64 * elem_size,
        );
        self.method.arena.create(Opcode::AddressAdd, &[base, offset])
    }

    fn from_array(
        &mut self,
        m: RecognizedMethod,
        node: NodeId,
        elem: ElementType,
        bits: u32,
        num_lanes: usize,
    ) {
        tracing::trace!(node = node.raw(), "from-array handler");
        let (array, index) = self.array_and_index(m, node);
        self.anchor_detached_children(node, &[array, index]);
        let elem_size = i64::from(elem.size_bytes());
        let addr = self.gen_address(array, index, elem_size);

        match self.strategy {
            LoweringStrategy::Scalarize => {
                let dt = DataType::Element(elem);
                let shadow = self.method.symtab.array_shadow(dt);
                self.method.arena.recreate(node, Opcode::LoadIndirect(dt));
                self.method.arena.set_sym_ref(node, shadow);
                self.method.arena.set_children(node, &[addr]);
                for lane in 1..num_lanes {
                    let lane_addr = self.lane_address(addr, lane, elem_size);
                    let load = self.method.arena.create_with_sym_ref(
                        Opcode::LoadIndirect(dt),
                        &[lane_addr],
                        shadow,
                    );
                    self.lanes.set(node, lane, load);
                }
            }
            LoweringStrategy::Vectorize => {
                let vt = DataType::Vector { elem, bits };
                let shadow = self.method.symtab.array_shadow(vt);
                self.method.arena.recreate(node, Opcode::LoadIndirect(vt));
                self.method.arena.set_sym_ref(node, shadow);
                self.method.arena.set_children(node, &[addr]);
            }
        }
    }

    fn into_array(
        &mut self,
        m: RecognizedMethod,
        node: NodeId,
        elem: ElementType,
        bits: u32,
        num_lanes: usize,
    ) {
        tracing::trace!(node = node.raw(), "into-array handler");
        let (array, index) = self.array_and_index(m, node);
        let value = self.stored_value(m, node);
        self.anchor_detached_children(node, &[array, index, value]);
        let elem_size = i64::from(elem.size_bytes());
        let addr = self.gen_address(array, index, elem_size);

        match self.strategy {
            LoweringStrategy::Scalarize => {
                if self.method.arena.opcode(value) == Opcode::Load(DataType::Address) {
                    self.load_handler(value, elem, bits, num_lanes);
                }
                let dt = DataType::Element(elem);
                let shadow = self.method.symtab.array_shadow(dt);
                self.method.arena.recreate(node, Opcode::StoreIndirect(dt));
                self.method.arena.set_sym_ref(node, shadow);
                self.method.arena.set_children(node, &[addr, value]);
                for lane in 1..num_lanes {
                    let lane_addr = self.lane_address(addr, lane, elem_size);
                    let lane_value = self.lanes.get(value, lane);
                    let store = self.method.arena.create_with_sym_ref(
                        Opcode::StoreIndirect(dt),
                        &[lane_addr, lane_value],
                        shadow,
                    );
                    self.lanes.set(node, lane, store);
                }
            }
            LoweringStrategy::Vectorize => {
                let vt = DataType::Vector { elem, bits };
                if self.method.arena.opcode(value) == Opcode::Load(DataType::Address) {
                    self.vectorize_load_or_store(value, vt);
                }
                let shadow = self.method.symtab.array_shadow(vt);
                self.method.arena.recreate(node, Opcode::StoreIndirect(vt));
                self.method.arena.set_sym_ref(node, shadow);
                self.method.arena.set_children(node, &[addr, value]);
            }
        }
    }

    fn binary(
        &mut self,
        op: VectorOperator,
        m: RecognizedMethod,
        node: NodeId,
        elem: ElementType,
        bits: u32,
        num_lanes: usize,
    ) {
        tracing::trace!(node = node.raw(), ?op, "binary handler");
        let operands = self.vector_operands(m, node);
        assert!(
            operands.len() == 2,
            "binary intrinsic {m:?} expects two vector operands"
        );
        self.anchor_detached_children(node, &operands);

        match self.strategy {
            LoweringStrategy::Scalarize => {
                for &operand in &operands {
                    if self.method.arena.opcode(operand) == Opcode::Load(DataType::Address) {
                        self.load_handler(operand, elem, bits, num_lanes);
                    }
                }
                let Some(opcode) = ops::scalar_opcode(op, elem) else {
                    unreachable!("operator {op:?} on {elem:?} survived validation")
                };
                self.method.arena.recreate(node, opcode);
                self.method.arena.clear_sym_ref(node);
                self.method.arena.set_children(node, &[operands[0], operands[1]]);
                for lane in 1..num_lanes {
                    let lhs = self.lanes.get(operands[0], lane);
                    let rhs = self.lanes.get(operands[1], lane);
                    let lane_node = self.method.arena.create(opcode, &[lhs, rhs]);
                    self.lanes.set(node, lane, lane_node);
                }
            }
            LoweringStrategy::Vectorize => {
                let vt = DataType::Vector { elem, bits };
                for &operand in &operands {
                    if self.method.arena.opcode(operand) == Opcode::Load(DataType::Address) {
                        self.vectorize_load_or_store(operand, vt);
                    }
                }
                let Some(opcode) = ops::vector_opcode(op, elem, bits) else {
                    unreachable!("operator {op:?} on {elem:?} survived validation")
                };
                self.method.arena.recreate(node, opcode);
                self.method.arena.clear_sym_ref(node);
                self.method.arena.set_children(node, &[operands[0], operands[1]]);
            }
        }
    }

    fn unary(
        &mut self,
        op: VectorOperator,
        m: RecognizedMethod,
        node: NodeId,
        elem: ElementType,
        bits: u32,
        num_lanes: usize,
    ) {
        tracing::trace!(node = node.raw(), ?op, "unary handler");
        let operands = self.vector_operands(m, node);
        assert!(
            operands.len() == 1,
            "unary intrinsic {m:?} expects one vector operand"
        );
        let operand = operands[0];
        self.anchor_detached_children(node, &operands);

        match self.strategy {
            LoweringStrategy::Scalarize => {
                if self.method.arena.opcode(operand) == Opcode::Load(DataType::Address) {
                    self.load_handler(operand, elem, bits, num_lanes);
                }
                let Some(opcode) = ops::scalar_opcode(op, elem) else {
                    unreachable!("operator {op:?} on {elem:?} survived validation")
                };
                self.method.arena.recreate(node, opcode);
                self.method.arena.clear_sym_ref(node);
                self.method.arena.set_children(node, &[operand]);
                for lane in 1..num_lanes {
                    let value = self.lanes.get(operand, lane);
                    let lane_node = self.method.arena.create(opcode, &[value]);
                    self.lanes.set(node, lane, lane_node);
                }
            }
            LoweringStrategy::Vectorize => {
                let vt = DataType::Vector { elem, bits };
                if self.method.arena.opcode(operand) == Opcode::Load(DataType::Address) {
                    self.vectorize_load_or_store(operand, vt);
                }
                let Some(opcode) = ops::vector_opcode(op, elem, bits) else {
                    unreachable!("operator {op:?} on {elem:?} survived validation")
                };
                self.method.arena.recreate(node, opcode);
                self.method.arena.clear_sym_ref(node);
                self.method.arena.set_children(node, &[operand]);
            }
        }
    }
}
