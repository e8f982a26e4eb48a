//! Read-only AST view over a translation unit produced by an external front end.
//!
//! This module owns no parser and no Clang bindings — it defines the shape
//! that an external Clang-based adapter is expected to hand us (functions,
//! statements, tokens, declarations) and builds a concrete, reference-counted
//! tree from it. Downstream components (`miner`, `freeuse`, `preamble`,
//! `assemble`, `tokens`) only ever read this tree.
//!
//! Node identity follows the source spec literally: two `Statement`s or
//! `Decl`s are the same node iff they are the same allocation, tested via
//! `Rc::ptr_eq` / `Rc::as_ptr`, never by structural equality of their fields.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub mod json;

/// A single lexed token covered by some statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token's literal spelling, e.g. `"for"`, `"i"`, `"+="`.
    pub spelling: String,
    /// Clang's token-kind spelling, e.g. `"identifier"`, `"l_paren"`, `"pragma"`.
    pub kind: String,
    /// Global source-order index, used to re-sort tokens gathered from
    /// multiple statements back into source order.
    pub index: u32,
}

impl Token {
    pub fn is_pragma(&self) -> bool {
        self.kind.contains("pragma")
    }
}

/// The subtype tag a `Typedef` decl carries, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedefKind {
    /// Aliases a builtin scalar type, e.g. `typedef unsigned long size_t;`.
    Builtin,
    /// Aliases a parenthesised type, e.g. a function-pointer typedef.
    Paren,
    /// Any other aliasing typedef.
    Other,
}

#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub name: String,
    pub type_string: String,
    /// Set when this variable's type involves a record; the DFS root for
    /// the required-record closure (spec.md §4.C step 2).
    pub record_type: Option<Record>,
    /// Set when this variable's declared type is itself a typedef alias.
    pub referenced_typedef: Option<Typedef>,
    /// The `DeclStmt` (or similar) node that introduces this variable, when
    /// it is declared somewhere inside a function body rather than at file
    /// scope. `freeuse::free_decls` uses this to recognise a loop-local
    /// variable (spec.md §4.C step 1's "declared inside the subtree" test)
    /// instead of emitting an extern for it.
    pub declaring_stmt: Option<Statement>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    /// Full prototype, e.g. `"int (int, int *)"` — callers locate the
    /// parameter list via `type_string.find('(')`.
    pub type_string: String,
    /// See `VariableDecl::declaring_stmt`; a function is "local" only in the
    /// rare case of a nested function definition.
    pub declaring_stmt: Option<Statement>,
}

#[derive(Debug)]
struct RecordData {
    name: String,
    /// Full textual definition, e.g. `struct Point { int x; int y; }`.
    tokens: Vec<Token>,
    // `RefCell` because record-to-record edges may cycle (spec.md §3
    // invariant 1, e.g. mutually recursive `struct A*`/`struct B*`
    // fields): the only way to build a cyclic graph of immutable `Rc`
    // nodes is to allocate the nodes first and wire up the edges in a
    // second pass. Adapters must finish wiring before handing the tree to
    // any other module; nothing in this crate mutates it afterwards.
    referenced_records: RefCell<Vec<Record>>,
    referenced_enums: RefCell<Vec<Enum>>,
    referenced_typedefs: RefCell<Vec<Typedef>>,
}

/// A struct/union definition. Cheap to clone — internally an `Rc`.
#[derive(Debug, Clone)]
pub struct Record(Rc<RecordData>);

impl Record {
    pub fn new(
        name: impl Into<String>,
        tokens: Vec<Token>,
        referenced_records: Vec<Record>,
        referenced_enums: Vec<Enum>,
        referenced_typedefs: Vec<Typedef>,
    ) -> Self {
        Record(Rc::new(RecordData {
            name: name.into(),
            tokens,
            referenced_records: RefCell::new(referenced_records),
            referenced_enums: RefCell::new(referenced_enums),
            referenced_typedefs: RefCell::new(referenced_typedefs),
        }))
    }

    /// Create a record with no structural edges yet, to be wired up with
    /// `set_referenced_records` once the rest of a (possibly cyclic) record
    /// graph exists.
    pub fn new_unlinked(name: impl Into<String>, tokens: Vec<Token>) -> Self {
        Self::new(name, tokens, vec![], vec![], vec![])
    }

    pub fn set_referenced_records(&self, records: Vec<Record>) {
        *self.0.referenced_records.borrow_mut() = records;
    }

    pub fn set_referenced_enums(&self, enums: Vec<Enum>) {
        *self.0.referenced_enums.borrow_mut() = enums;
    }

    pub fn set_referenced_typedefs(&self, typedefs: Vec<Typedef>) {
        *self.0.referenced_typedefs.borrow_mut() = typedefs;
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0.tokens
    }

    pub fn referenced_records(&self) -> Vec<Record> {
        self.0.referenced_records.borrow().clone()
    }

    pub fn referenced_enums(&self) -> Vec<Enum> {
        self.0.referenced_enums.borrow().clone()
    }

    pub fn referenced_typedefs(&self) -> Vec<Typedef> {
        self.0.referenced_typedefs.borrow().clone()
    }

    /// `(anonymous)` is Clang's marker for a record with no tag name.
    pub fn is_anonymous(&self) -> bool {
        self.0.name.contains("(anonymous)")
    }

    /// Stable identity for this node, used as a hash/equality key.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Record {}
impl std::hash::Hash for Record {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

#[derive(Debug, Clone)]
struct EnumData {
    name: String,
    tokens: Vec<Token>,
}

#[derive(Debug, Clone)]
pub struct Enum(Rc<EnumData>);

impl Enum {
    pub fn new(name: impl Into<String>, tokens: Vec<Token>) -> Self {
        Enum(Rc::new(EnumData {
            name: name.into(),
            tokens,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0.tokens
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Enum {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Enum {}
impl std::hash::Hash for Enum {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

#[derive(Debug, Clone)]
struct TypedefData {
    name: String,
    kind: TypedefKind,
    tokens: Vec<Token>,
}

#[derive(Debug, Clone)]
pub struct Typedef(Rc<TypedefData>);

impl Typedef {
    pub fn new(name: impl Into<String>, kind: TypedefKind, tokens: Vec<Token>) -> Self {
        Typedef(Rc::new(TypedefData {
            name: name.into(),
            kind,
            tokens,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> TypedefKind {
        self.0.kind
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0.tokens
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Typedef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Typedef {}
impl std::hash::Hash for Typedef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

/// A declaration referenced from inside a statement: a variable, a called
/// function, or one of the type-level decls a variable's type drags in.
///
/// Tagged union per spec.md §3; equality and hashing are always by node
/// identity of the wrapped `Rc`, never by name (two distinct `int x;`
/// declarations with the same name are different decls).
#[derive(Debug, Clone)]
pub enum Decl {
    Variable(Rc<VariableDecl>),
    Function(Rc<FunctionDecl>),
    Record(Record),
    Enum(Enum),
    Typedef(Typedef),
}

impl Decl {
    pub fn variable(
        name: impl Into<String>,
        type_string: impl Into<String>,
        record_type: Option<Record>,
        referenced_typedef: Option<Typedef>,
    ) -> Self {
        Decl::Variable(Rc::new(VariableDecl {
            name: name.into(),
            type_string: type_string.into(),
            record_type,
            referenced_typedef,
            declaring_stmt: None,
        }))
    }

    /// Like [`Decl::variable`], but marked as declared by `stmt` (typically
    /// the `DeclStmt` introducing it) — free-use analysis will not treat it
    /// as free when `stmt` lies inside the loop subtree being reconstructed.
    pub fn local_variable(
        name: impl Into<String>,
        type_string: impl Into<String>,
        record_type: Option<Record>,
        referenced_typedef: Option<Typedef>,
        declaring_stmt: Statement,
    ) -> Self {
        Decl::Variable(Rc::new(VariableDecl {
            name: name.into(),
            type_string: type_string.into(),
            record_type,
            referenced_typedef,
            declaring_stmt: Some(declaring_stmt),
        }))
    }

    pub fn function(name: impl Into<String>, type_string: impl Into<String>) -> Self {
        Decl::Function(Rc::new(FunctionDecl {
            name: name.into(),
            type_string: type_string.into(),
            declaring_stmt: None,
        }))
    }

    /// Stable identity of the statement that declares this decl, if any
    /// (see `VariableDecl::declaring_stmt`).
    pub fn declaring_stmt(&self) -> Option<&Statement> {
        match self {
            Decl::Variable(v) => v.declaring_stmt.as_ref(),
            Decl::Function(f) => f.declaring_stmt.as_ref(),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Decl::Variable(v) => &v.name,
            Decl::Function(f) => &f.name,
            Decl::Record(r) => r.name(),
            Decl::Enum(e) => e.name(),
            Decl::Typedef(t) => t.name(),
        }
    }

    /// Stable identity of the underlying node, used for the free-decl set
    /// and for the shadowing/dedup logic in `preamble`.
    pub fn id(&self) -> usize {
        match self {
            Decl::Variable(v) => Rc::as_ptr(v) as usize,
            Decl::Function(f) => Rc::as_ptr(f) as usize,
            Decl::Record(r) => r.id(),
            Decl::Enum(e) => e.id(),
            Decl::Typedef(t) => t.id(),
        }
    }
}

impl PartialEq for Decl {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
impl Eq for Decl {}
impl std::hash::Hash for Decl {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

#[derive(Debug, Clone)]
struct StatementData {
    /// AST node kind, e.g. `"ForStmt"`, `"BinaryOperator"`, `"ArraySubscriptExpr"`.
    kind: String,
    children: Vec<Statement>,
    references: Vec<Decl>,
    tokens: Vec<Token>,
}

/// One AST node within a function body. Cheap to clone — internally an `Rc`.
#[derive(Debug, Clone)]
pub struct Statement(Rc<StatementData>);

impl Statement {
    pub fn new(
        kind: impl Into<String>,
        children: Vec<Statement>,
        references: Vec<Decl>,
        tokens: Vec<Token>,
    ) -> Self {
        Statement(Rc::new(StatementData {
            kind: kind.into(),
            children,
            references,
            tokens,
        }))
    }

    pub fn kind(&self) -> &str {
        &self.0.kind
    }

    pub fn children(&self) -> &[Statement] {
        &self.0.children
    }

    pub fn references(&self) -> &[Decl] {
        &self.0.references
    }

    /// Tokens belonging directly to this node (not its descendants). Use
    /// `tokens::tokens_of` for the full subtree, per spec.md's invariant 2.
    pub fn own_tokens(&self) -> &[Token] {
        &self.0.tokens
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn is_for_stmt(&self) -> bool {
        self.kind() == "ForStmt"
    }
}

impl PartialEq for Statement {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Statement {}
impl std::hash::Hash for Statement {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:x}", self.kind(), self.id())
    }
}

/// A function found in a translation unit.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub entry_stmt: Statement,
}

/// The result of parsing one compilation invocation.
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    pub functions: Vec<Function>,
}

/// Language selection for a parse request, part of the §6 configuration
/// surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cxx,
}

/// Whether an include directory came from the user (`-I`) or the system
/// include search path, per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeDirKind {
    User,
    System,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IncludePath {
    pub path: String,
    pub kind: IncludeDirKind,
}

/// Optimisation level passed through to the front end; mined kernels don't
/// depend on it but a real Clang adapter needs it to reproduce the original
/// compilation's preprocessor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum OptimizationLevel {
    O0,
    #[default]
    O1,
    O2,
    O3,
}

/// Per-parse options, the input half of the §6 configuration surface.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub language: Option<Language>,
    pub optimization_level: OptimizationLevel,
    pub include_paths: Vec<IncludePath>,
    pub flags: Vec<String>,
    /// Filename used for diagnostics; not required to exist on disk.
    pub filename: Option<String>,
}

/// The boundary the core consumes (spec.md §6): something that turns a
/// compilation invocation into a `TranslationUnit`. The core ships exactly
/// one implementation (`json::JsonTranslationUnitProvider`); a real
/// deployment swaps in a libclang-backed adapter without touching any other
/// module in this crate.
pub trait TranslationUnitProvider {
    type Error: std::error::Error + 'static;

    fn parse(&self, source: &str, opts: &ParseOptions) -> Result<TranslationUnit, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decl_identity_is_by_node_not_name() {
        let a = Decl::variable("x", "int", None, None);
        let b = Decl::variable("x", "int", None, None);
        assert_ne!(a, b, "two distinct allocations with the same name must differ");
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn record_reports_anonymous_marker() {
        let anon = Record::new("(anonymous)", vec![], vec![], vec![], vec![]);
        let named = Record::new("Point", vec![], vec![], vec![], vec![]);
        assert!(anon.is_anonymous());
        assert!(!named.is_anonymous());
    }

    #[test]
    fn statement_children_preserve_insertion_order() {
        let leaf = Statement::new("IntegerLiteral", vec![], vec![], vec![]);
        let parent = Statement::new("ReturnStmt", vec![leaf.clone()], vec![], vec![]);
        assert_eq!(parent.children().len(), 1);
        assert_eq!(parent.children()[0], leaf);
    }
}
