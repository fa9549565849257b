//! Method body: an ordered, mutable statement list over one node arena.
//!
//! Statements are node IDs of statement roots (stores, anchored calls,
//! returns). Optimization passes walk the list by explicit index so they
//! can splice new statements while iterating.

use std::fmt::Write as _;

use rustc_hash::FxHashSet;

use crate::node::{NodeArena, NodeId};
use crate::opcode::Opcode;
use crate::symtab::SymbolTable;

/// One method's IR: nodes, symbols, and the ordered statement list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MethodBody {
    pub arena: NodeArena,
    pub symtab: SymbolTable,
    pub stmts: Vec<NodeId>,
}

impl MethodBody {
    pub fn new() -> Self {
        Self {
            arena: NodeArena::new(),
            symtab: SymbolTable::new(),
            stmts: Vec::new(),
        }
    }

    /// Append a statement root, returning its index.
    pub fn append_stmt(&mut self, root: NodeId) -> usize {
        self.stmts.push(root);
        self.stmts.len() - 1
    }

    pub fn num_stmts(&self) -> usize {
        self.stmts.len()
    }

    pub fn stmt(&self, idx: usize) -> NodeId {
        self.stmts[idx]
    }

    /// Splice a new statement immediately before `idx`.
    pub fn insert_before(&mut self, idx: usize, root: NodeId) {
        self.stmts.insert(idx, root);
    }

    /// Splice a new statement immediately after `idx`.
    pub fn insert_after(&mut self, idx: usize, root: NodeId) {
        self.stmts.insert(idx + 1, root);
    }

    /// The value node of a statement, skipping a transparent `Anchor` or
    /// `NullCheck` wrapper. Returns `(value, wrapper)`.
    pub fn stmt_value(&self, idx: usize) -> (NodeId, Option<NodeId>) {
        let root = self.stmts[idx];
        match self.arena.opcode(root) {
            Opcode::Anchor | Opcode::NullCheck => (self.arena.child(root, 0), Some(root)),
            _ => (root, None),
        }
    }

    /// Render the statement trees as indented text, for trace output.
    /// A node already printed under the current statement is shown as a
    /// back reference (`==> nN`) instead of being expanded again.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (idx, &root) in self.stmts.iter().enumerate() {
            let _ = writeln!(out, "stmt {idx}:");
            let mut seen = FxHashSet::default();
            self.dump_node(&mut out, root, 1, &mut seen);
        }
        out
    }

    fn dump_node(&self, out: &mut String, id: NodeId, depth: usize, seen: &mut FxHashSet<NodeId>) {
        let indent = "  ".repeat(depth);
        if !seen.insert(id) {
            let _ = writeln!(out, "{indent}==> n{}", id.raw());
            return;
        }
        let node = self.arena.node(id);
        let _ = write!(out, "{indent}n{} {:?}", id.raw(), node.opcode);
        if let Some(sym) = node.sym_ref {
            let _ = write!(out, " #{}", sym.raw());
        }
        if matches!(node.opcode, Opcode::Const(_)) {
            let _ = write!(out, " {}", node.const_value);
        }
        let _ = writeln!(out);
        for &child in &node.children {
            self.dump_node(out, child, depth + 1, seen);
        }
    }
}
