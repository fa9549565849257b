//! Intermediate representation types for the Helix JIT compiler.
//!
//! This crate provides:
//!
//! - **Opcodes and data types** ([`Opcode`], [`DataType`], [`ElementType`]) —
//!   a fixed node vocabulary of loads, stores, indirect accesses, calls,
//!   arithmetic, constants, and address arithmetic.
//! - **Nodes** ([`Node`], [`NodeArena`], [`NodeId`]) — a per-method arena
//!   of IR nodes forming a shared DAG, mutable in place.
//! - **Method bodies** ([`MethodBody`]) — the ordered statement list with
//!   splicing, plus the per-method [`SymbolTable`].
//! - **Recognized methods** ([`RecognizedMethod`]) — host-resolved
//!   identities of known library calls.
//! - **Type oracle** ([`TypeOracle`]) — read-only resolution of
//!   compile-time-known constant objects to run-time metadata.
//!
//! # Design
//!
//! Optimization passes mutate the IR through the arena: `recreate` retags
//! a node's opcode while keeping its identity, so rewrites are visible to
//! every parent sharing the node. All state is per-method; nothing in
//! this crate is process-wide, so independent methods can be compiled
//! concurrently by independent pass instances.

mod method;
mod node;
mod opcode;
mod oracle;
mod recognized;
mod symtab;
mod types;

pub use method::MethodBody;
pub use node::{Node, NodeArena, NodeFlags, NodeId};
pub use opcode::{BinaryIrOp, Opcode};
pub use oracle::TypeOracle;
pub use recognized::RecognizedMethod;
pub use symtab::{KnownObjectId, SymRefId, Symbol, SymbolKind, SymbolTable};
pub use types::{DataType, ElementType, VecWidth};
