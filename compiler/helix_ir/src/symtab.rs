//! Symbol table: storage locations, shadows, and method symbols.
//!
//! Every addressable slot in a method — locals, parameters, statics,
//! array-element shadows, and method targets — is a [`Symbol`] keyed by a
//! small integer [`SymRefId`]. Call results are addressable through their
//! call's method symbol reference, so the alias analysis can treat them
//! as storage locations.
//!
//! ID 0 is reserved; real symbol references start at 1.

use rustc_hash::FxHashMap;

use crate::recognized::RecognizedMethod;
use crate::types::DataType;

/// Symbol reference ID within one method's symbol table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SymRefId(u32);

impl SymRefId {
    /// Create a symbol reference ID from a raw index.
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

/// Index of a compile-time-known constant object, resolvable through the
/// type oracle (a species constant, an element-class constant).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct KnownObjectId(u32);

impl KnownObjectId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// What kind of storage or target a symbol names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A method-local slot (including pass-synthesized temporaries).
    Auto,
    /// An incoming parameter slot.
    Param,
    /// A static field.
    Static,
    /// An array-element shadow: the storage named by indirect accesses.
    ArrayShadow,
    /// A call target. `recognized` is the host-resolved method identity
    /// when the target is a known library method.
    Method {
        recognized: Option<RecognizedMethod>,
    },
}

/// One symbol table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub ty: DataType,
    /// Set when the symbol's value is a compile-time-known constant
    /// object the oracle can resolve.
    pub known_object: Option<KnownObjectId>,
}

/// Per-method symbol table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    shadows: FxHashMap<DataType, SymRefId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Create a table with ID 0 reserved.
    pub fn new() -> Self {
        Self {
            symbols: vec![Symbol {
                kind: SymbolKind::Auto,
                ty: DataType::NoType,
                known_object: None,
            }],
            shadows: FxHashMap::default(),
        }
    }

    /// Total number of symbol references, including the reserved ID 0.
    pub fn num_sym_refs(&self) -> usize {
        self.symbols.len()
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "symbol counts never exceed u32"
    )]
    fn push(&mut self, symbol: Symbol) -> SymRefId {
        let id = SymRefId::new(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    /// Allocate a fresh local slot of the given type.
    pub fn alloc_local(&mut self, ty: DataType) -> SymRefId {
        self.push(Symbol {
            kind: SymbolKind::Auto,
            ty,
            known_object: None,
        })
    }

    /// Allocate a parameter slot.
    pub fn alloc_param(&mut self, ty: DataType) -> SymRefId {
        self.push(Symbol {
            kind: SymbolKind::Param,
            ty,
            known_object: None,
        })
    }

    /// Allocate a static-field slot.
    pub fn alloc_static(&mut self, ty: DataType) -> SymRefId {
        self.push(Symbol {
            kind: SymbolKind::Static,
            ty,
            known_object: None,
        })
    }

    /// Allocate a method symbol, optionally with a recognized identity.
    pub fn alloc_method(&mut self, recognized: Option<RecognizedMethod>) -> SymRefId {
        self.push(Symbol {
            kind: SymbolKind::Method { recognized },
            ty: DataType::NoType,
            known_object: None,
        })
    }

    /// Find or create the array-element shadow symbol for a data type.
    pub fn array_shadow(&mut self, ty: DataType) -> SymRefId {
        if let Some(&sym) = self.shadows.get(&ty) {
            return sym;
        }
        let sym = self.push(Symbol {
            kind: SymbolKind::ArrayShadow,
            ty,
            known_object: None,
        });
        self.shadows.insert(ty, sym);
        sym
    }

    /// Mark a symbol as holding a compile-time-known constant object.
    pub fn set_known_object(&mut self, sym: SymRefId, obj: KnownObjectId) {
        self.symbols[sym.index()].known_object = Some(obj);
    }

    pub fn symbol(&self, sym: SymRefId) -> &Symbol {
        &self.symbols[sym.index()]
    }

    pub fn is_param(&self, sym: SymRefId) -> bool {
        matches!(self.symbol(sym).kind, SymbolKind::Param)
    }

    pub fn is_static(&self, sym: SymRefId) -> bool {
        matches!(self.symbol(sym).kind, SymbolKind::Static)
    }

    pub fn is_shadow(&self, sym: SymRefId) -> bool {
        matches!(self.symbol(sym).kind, SymbolKind::ArrayShadow)
    }

    pub fn is_method(&self, sym: SymRefId) -> bool {
        matches!(self.symbol(sym).kind, SymbolKind::Method { .. })
    }

    /// The recognized identity of a method symbol, if any.
    pub fn recognized_method(&self, sym: SymRefId) -> Option<RecognizedMethod> {
        match self.symbol(sym).kind {
            SymbolKind::Method { recognized } => recognized,
            _ => None,
        }
    }

    /// The known-object index of a symbol, if it holds a constant.
    pub fn known_object(&self, sym: SymRefId) -> Option<KnownObjectId> {
        self.symbol(sym).known_object
    }
}
