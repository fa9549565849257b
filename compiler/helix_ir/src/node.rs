//! IR nodes and the per-method node arena.
//!
//! Nodes form a shared DAG: a child may appear under several parents
//! (a call result referenced by a later store, an address subtree reused
//! by per-lane accesses). Passes that traverse the DAG must therefore
//! guard recursion with a visited set keyed by [`NodeId`].
//!
//! Nodes are mutated in place: `recreate` retags a node's opcode while
//! keeping its identity, children, and symbol reference, so every other
//! parent of the node observes the rewrite.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::opcode::Opcode;
use crate::symtab::SymRefId;
use crate::types::DataType;

/// Node ID within one method's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a node ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    /// Per-node flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u8 {
        /// The stored value of this store is dead (kept only for frame
        /// shape); the alias builder and lowering engine skip it.
        const STORED_VALUE_IS_IRRELEVANT = 1 << 0;
    }
}

/// A single IR node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub opcode: Opcode,
    pub children: SmallVec<[NodeId; 4]>,
    pub sym_ref: Option<SymRefId>,
    /// Constant payload for `Const` opcodes (bit pattern for floats).
    pub const_value: i64,
    pub flags: NodeFlags,
}

/// Arena of nodes for one method body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever created.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "node counts never exceed u32"
    )]
    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a node with the given children.
    pub fn create(&mut self, opcode: Opcode, children: &[NodeId]) -> NodeId {
        self.push(Node {
            opcode,
            children: SmallVec::from_slice(children),
            sym_ref: None,
            const_value: 0,
            flags: NodeFlags::empty(),
        })
    }

    /// Create a node bound to a symbol reference.
    pub fn create_with_sym_ref(
        &mut self,
        opcode: Opcode,
        children: &[NodeId],
        sym_ref: SymRefId,
    ) -> NodeId {
        let id = self.create(opcode, children);
        self.nodes[id.index()].sym_ref = Some(sym_ref);
        id
    }

    /// Create a constant node. For floating constants `value` holds the
    /// bit pattern.
    pub fn create_const(&mut self, dt: DataType, value: i64) -> NodeId {
        let id = self.create(Opcode::Const(dt), &[]);
        self.nodes[id.index()].const_value = value;
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Retag a node's opcode in place, keeping identity, children, and
    /// symbol reference. Every parent sharing the node sees the change.
    pub fn recreate(&mut self, id: NodeId, opcode: Opcode) {
        self.nodes[id.index()].opcode = opcode;
    }

    #[inline]
    pub fn opcode(&self, id: NodeId) -> Opcode {
        self.nodes[id.index()].opcode
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    #[inline]
    pub fn child(&self, id: NodeId, i: usize) -> NodeId {
        self.nodes[id.index()].children[i]
    }

    pub fn set_children(&mut self, id: NodeId, children: &[NodeId]) {
        self.nodes[id.index()].children = SmallVec::from_slice(children);
    }

    pub fn set_child(&mut self, id: NodeId, i: usize, child: NodeId) {
        self.nodes[id.index()].children[i] = child;
    }

    #[inline]
    pub fn sym_ref(&self, id: NodeId) -> Option<SymRefId> {
        self.nodes[id.index()].sym_ref
    }

    pub fn set_sym_ref(&mut self, id: NodeId, sym_ref: SymRefId) {
        self.nodes[id.index()].sym_ref = Some(sym_ref);
    }

    /// Drop a node's symbol reference (used when retagging to an opcode
    /// that carries none).
    pub fn clear_sym_ref(&mut self, id: NodeId) {
        self.nodes[id.index()].sym_ref = None;
    }

    /// The node's symbol reference. Panics if the node has none — callers
    /// use this only where the IR shape guarantees a symbol reference, so
    /// absence is a compiler bug.
    #[track_caller]
    pub fn require_sym_ref(&self, id: NodeId) -> SymRefId {
        match self.nodes[id.index()].sym_ref {
            Some(sym) => sym,
            None => panic!("node n{} should have a symbol reference", id.raw()),
        }
    }

    #[inline]
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.nodes[id.index()].flags
    }

    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        self.nodes[id.index()].flags = flags;
    }
}
