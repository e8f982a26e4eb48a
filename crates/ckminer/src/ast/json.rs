//! A concrete `TranslationUnitProvider` that deserializes a translation unit
//! dumped as JSON by an out-of-scope Clang adapter.
//!
//! Real deployments replace this with a `libclang`-backed adapter (spec.md
//! §1's "out of scope" list); this one exists so the crate has something
//! concrete and testable to run end-to-end, and so the seed scenarios in
//! spec.md §8 can be expressed as fixtures instead of hand-built `Rc` trees.
//!
//! Node identity (spec.md §3) is recovered from the JSON's string `id`
//! fields: every `Record`/`Enum`/`Typedef` that can be shared or form a
//! cycle is declared once in a top-level table and referenced elsewhere by
//! id, mirroring how a real Clang adapter would hand back the same
//! canonical pointer for every use of one declaration. `Variable` decls are
//! built lazily while walking a function's statement tree (see
//! `resolve_variable`) so that a local variable's `declaring_stmt` can point
//! at the real `Statement` node that introduces it, not a stand-in.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use super::{
    Decl, Enum, Function, ParseOptions, Record, Statement, Token, TranslationUnit,
    TranslationUnitProvider, Typedef, TypedefKind,
};

#[derive(Debug, Deserialize)]
struct TokenJson {
    spelling: String,
    kind: String,
    index: u32,
}

fn tokens_of(tokens: Vec<TokenJson>) -> Vec<Token> {
    tokens
        .into_iter()
        .map(|t| Token {
            spelling: t.spelling,
            kind: t.kind,
            index: t.index,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TypedefKindJson {
    Builtin,
    Paren,
    Other,
}

impl From<TypedefKindJson> for TypedefKind {
    fn from(k: TypedefKindJson) -> Self {
        match k {
            TypedefKindJson::Builtin => TypedefKind::Builtin,
            TypedefKindJson::Paren => TypedefKind::Paren,
            TypedefKindJson::Other => TypedefKind::Other,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnumJson {
    id: String,
    name: String,
    #[serde(default)]
    tokens: Vec<TokenJson>,
}

#[derive(Debug, Deserialize)]
struct TypedefJson {
    id: String,
    name: String,
    kind: TypedefKindJson,
    #[serde(default)]
    tokens: Vec<TokenJson>,
}

#[derive(Debug, Deserialize)]
struct RecordJson {
    id: String,
    name: String,
    #[serde(default)]
    tokens: Vec<TokenJson>,
    #[serde(default)]
    referenced_records: Vec<String>,
    #[serde(default)]
    referenced_enums: Vec<String>,
    #[serde(default)]
    referenced_typedefs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VariableJson {
    name: String,
    type_string: String,
    #[serde(default)]
    record_type: Option<String>,
    #[serde(default)]
    referenced_typedef: Option<String>,
    /// Id of the statement (in the same function's tree) that locally
    /// declares this variable, if any. Must name a statement that appears
    /// before this variable's first reference in source order — true of any
    /// real, compiling C program. See `VariableDecl::declaring_stmt`.
    #[serde(default)]
    declared_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FunctionDeclJson {
    id: String,
    name: String,
    type_string: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "decl", rename_all = "lowercase")]
enum DeclRefJson {
    Variable { id: String },
    Function { id: String },
    Record { id: String },
    Enum { id: String },
    Typedef { id: String },
}

#[derive(Debug, Deserialize)]
struct StatementJson {
    /// Only needed when some `VariableJson::declared_at` points at this
    /// node; statements that never declare anything may omit it.
    #[serde(default)]
    id: Option<String>,
    kind: String,
    #[serde(default)]
    children: Vec<StatementJson>,
    #[serde(default)]
    references: Vec<DeclRefJson>,
    #[serde(default)]
    tokens: Vec<TokenJson>,
}

#[derive(Debug, Deserialize)]
struct FunctionJson {
    name: String,
    entry: StatementJson,
}

#[derive(Debug, Deserialize)]
pub struct TranslationUnitJson {
    #[serde(default)]
    enums: Vec<EnumJson>,
    #[serde(default)]
    typedefs: Vec<TypedefJson>,
    #[serde(default)]
    records: Vec<RecordJson>,
    #[serde(default)]
    variables: HashMap<String, VariableJson>,
    #[serde(default)]
    function_decls: Vec<FunctionDeclJson>,
    #[serde(default)]
    functions: Vec<FunctionJson>,
}

/// Infrastructural failure per spec.md §7: the translation unit JSON did not
/// parse, or referenced an id that no table entry defines. Never used to
/// signal a per-loop condition.
#[derive(Debug)]
pub enum JsonAdapterError {
    Syntax(serde_json::Error),
    UnknownId { table: &'static str, id: String },
}

impl fmt::Display for JsonAdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonAdapterError::Syntax(e) => write!(f, "invalid translation unit JSON: {e}"),
            JsonAdapterError::UnknownId { table, id } => {
                write!(f, "reference to unknown {table} id {id:?}")
            }
        }
    }
}

impl std::error::Error for JsonAdapterError {}

impl From<serde_json::Error> for JsonAdapterError {
    fn from(e: serde_json::Error) -> Self {
        JsonAdapterError::Syntax(e)
    }
}

/// The one concrete `TranslationUnitProvider` shipped by this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonTranslationUnitProvider;

impl TranslationUnitProvider for JsonTranslationUnitProvider {
    type Error = JsonAdapterError;

    fn parse(&self, source: &str, _opts: &ParseOptions) -> Result<TranslationUnit, Self::Error> {
        let doc: TranslationUnitJson = serde_json::from_str(source)?;
        Builder::new(&doc)?.build(doc)
    }
}

fn lookup<T: Clone>(
    table: &HashMap<String, T>,
    id: &str,
    table_name: &'static str,
) -> Result<T, JsonAdapterError> {
    table
        .get(id)
        .cloned()
        .ok_or_else(|| JsonAdapterError::UnknownId {
            table: table_name,
            id: id.to_string(),
        })
}

/// Scratch state threaded through one translation unit's construction.
struct Builder<'a> {
    records: HashMap<String, Record>,
    enums: HashMap<String, Enum>,
    typedefs: HashMap<String, Typedef>,
    function_decls: HashMap<String, Decl>,
    variables_json: &'a HashMap<String, VariableJson>,
    /// Built lazily as variables are first referenced, so a local
    /// variable's `declaring_stmt` can point at an already-built `Statement`.
    variables: HashMap<String, Decl>,
    /// Statements that carry an `id`, indexed as they are finished.
    stmt_by_id: HashMap<String, Statement>,
}

impl<'a> Builder<'a> {
    fn new(doc: &'a TranslationUnitJson) -> Result<Self, JsonAdapterError> {
        let mut enums = HashMap::new();
        for e in &doc.enums {
            enums.insert(e.id.clone(), Enum::new(e.name.clone(), tokens_clone(&e.tokens)));
        }

        let mut typedefs = HashMap::new();
        for t in &doc.typedefs {
            typedefs.insert(
                t.id.clone(),
                Typedef::new(t.name.clone(), t.kind.into(), tokens_clone(&t.tokens)),
            );
        }

        // Records may reference each other cyclically: allocate unlinked
        // nodes first, then wire edges in a second pass.
        let mut records = HashMap::new();
        for r in &doc.records {
            records.insert(r.id.clone(), Record::new_unlinked(r.name.clone(), tokens_clone(&r.tokens)));
        }
        for r in &doc.records {
            let record = lookup(&records, &r.id, "record")?;
            let referenced_records = r
                .referenced_records
                .iter()
                .map(|id| lookup(&records, id, "record"))
                .collect::<Result<Vec<_>, _>>()?;
            let referenced_enums = r
                .referenced_enums
                .iter()
                .map(|id| lookup(&enums, id, "enum"))
                .collect::<Result<Vec<_>, _>>()?;
            let referenced_typedefs = r
                .referenced_typedefs
                .iter()
                .map(|id| lookup(&typedefs, id, "typedef"))
                .collect::<Result<Vec<_>, _>>()?;
            record.set_referenced_records(referenced_records);
            record.set_referenced_enums(referenced_enums);
            record.set_referenced_typedefs(referenced_typedefs);
        }

        let mut function_decls = HashMap::new();
        for f in &doc.function_decls {
            function_decls.insert(f.id.clone(), Decl::function(f.name.clone(), f.type_string.clone()));
        }

        Ok(Builder {
            records,
            enums,
            typedefs,
            function_decls,
            variables_json: &doc.variables,
            variables: HashMap::new(),
            stmt_by_id: HashMap::new(),
        })
    }

    fn build(mut self, doc: TranslationUnitJson) -> Result<TranslationUnit, JsonAdapterError> {
        let mut functions = Vec::with_capacity(doc.functions.len());
        for f in doc.functions {
            let entry_stmt = self.build_statement(f.entry)?;
            functions.push(Function { name: f.name, entry_stmt });
        }
        Ok(TranslationUnit { functions })
    }

    fn build_statement(&mut self, json: StatementJson) -> Result<Statement, JsonAdapterError> {
        let mut children = Vec::with_capacity(json.children.len());
        for child in json.children {
            let child_id = child.id.clone();
            let stmt = self.build_statement(child)?;
            if let Some(id) = child_id {
                self.stmt_by_id.insert(id, stmt.clone());
            }
            children.push(stmt);
        }
        let mut references = Vec::with_capacity(json.references.len());
        for r in &json.references {
            references.push(self.resolve_ref(r)?);
        }
        Ok(Statement::new(json.kind, children, references, tokens_of(json.tokens)))
    }

    fn resolve_ref(&mut self, r: &DeclRefJson) -> Result<Decl, JsonAdapterError> {
        Ok(match r {
            DeclRefJson::Variable { id } => self.resolve_variable(id)?,
            DeclRefJson::Function { id } => lookup(&self.function_decls, id, "function_decl")?,
            DeclRefJson::Record { id } => Decl::Record(lookup(&self.records, id, "record")?),
            DeclRefJson::Enum { id } => Decl::Enum(lookup(&self.enums, id, "enum")?),
            DeclRefJson::Typedef { id } => Decl::Typedef(lookup(&self.typedefs, id, "typedef")?),
        })
    }

    fn resolve_variable(&mut self, id: &str) -> Result<Decl, JsonAdapterError> {
        if let Some(d) = self.variables.get(id) {
            return Ok(d.clone());
        }
        let vj = self
            .variables_json
            .get(id)
            .ok_or_else(|| JsonAdapterError::UnknownId {
                table: "variable",
                id: id.to_string(),
            })?;
        let record_type = vj
            .record_type
            .as_ref()
            .map(|rid| lookup(&self.records, rid, "record"))
            .transpose()?;
        let referenced_typedef = vj
            .referenced_typedef
            .as_ref()
            .map(|tid| lookup(&self.typedefs, tid, "typedef"))
            .transpose()?;
        let decl = match &vj.declared_at {
            Some(stmt_id) => {
                let stmt = lookup(&self.stmt_by_id, stmt_id, "statement")?;
                Decl::local_variable(vj.name.clone(), vj.type_string.clone(), record_type, referenced_typedef, stmt)
            }
            None => Decl::variable(vj.name.clone(), vj.type_string.clone(), record_type, referenced_typedef),
        };
        self.variables.insert(id.to_string(), decl.clone());
        Ok(decl)
    }
}

fn tokens_clone(tokens: &[TokenJson]) -> Vec<Token> {
    tokens
        .iter()
        .map(|t| Token {
            spelling: t.spelling.clone(),
            kind: t.kind.clone(),
            index: t.index,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TranslationUnitProvider;

    #[test]
    fn parses_single_level_loop_over_array_parameter() {
        let json = r#"
        {
          "variables": {
            "x": { "name": "x", "type_string": "int" },
            "y": { "name": "y", "type_string": "int *" }
          },
          "functions": [
            {
              "name": "foo",
              "entry": {
                "kind": "CompoundStmt",
                "children": [
                  {
                    "kind": "ForStmt",
                    "references": [ { "decl": "variable", "id": "x" } ],
                    "children": [
                      {
                        "kind": "ArraySubscriptExpr",
                        "references": [
                          { "decl": "variable", "id": "y" },
                          { "decl": "variable", "id": "x" }
                        ],
                        "tokens": [
                          { "spelling": "y", "kind": "identifier", "index": 0 },
                          { "spelling": "[", "kind": "l_square", "index": 1 },
                          { "spelling": "x", "kind": "identifier", "index": 2 },
                          { "spelling": "]", "kind": "r_square", "index": 3 },
                          { "spelling": "+=", "kind": "plusequal", "index": 4 },
                          { "spelling": "1", "kind": "numeric_constant", "index": 5 }
                        ]
                      }
                    ]
                  }
                ]
              }
            }
          ]
        }
        "#;

        let provider = JsonTranslationUnitProvider;
        let tu = provider.parse(json, &ParseOptions::default()).unwrap();
        assert_eq!(tu.functions.len(), 1);
        assert_eq!(tu.functions[0].name, "foo");
        let for_stmt = &tu.functions[0].entry_stmt.children()[0];
        assert!(for_stmt.is_for_stmt());
        assert_eq!(for_stmt.references().len(), 1);
    }

    #[test]
    fn unknown_id_is_reported_as_infrastructural_error() {
        let json = r#"
        {
          "functions": [
            {
              "name": "foo",
              "entry": {
                "kind": "CompoundStmt",
                "references": [ { "decl": "variable", "id": "missing" } ]
              }
            }
          ]
        }
        "#;
        let provider = JsonTranslationUnitProvider;
        let err = provider.parse(json, &ParseOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            JsonAdapterError::UnknownId { table: "variable", .. }
        ));
    }

    #[test]
    fn local_variable_declaration_is_reachable_by_id() {
        let json = r#"
        {
          "variables": {
            "bar": { "name": "bar", "type_string": "int", "declared_at": "decl_bar" }
          },
          "functions": [
            {
              "name": "foo",
              "entry": {
                "kind": "CompoundStmt",
                "children": [
                  {
                    "id": "decl_bar",
                    "kind": "DeclStmt",
                    "tokens": [
                      { "spelling": "int", "kind": "identifier", "index": 0 },
                      { "spelling": "bar", "kind": "identifier", "index": 1 },
                      { "spelling": "=", "kind": "equal", "index": 2 },
                      { "spelling": "1337", "kind": "numeric_constant", "index": 3 },
                      { "spelling": ";", "kind": "semi", "index": 4 }
                    ]
                  },
                  {
                    "kind": "ForStmt",
                    "references": [ { "decl": "variable", "id": "bar" } ],
                    "tokens": [ { "spelling": "for", "kind": "identifier", "index": 5 } ]
                  }
                ]
              }
            }
          ]
        }
        "#;
        let provider = JsonTranslationUnitProvider;
        let tu = provider.parse(json, &ParseOptions::default()).unwrap();
        let compound = &tu.functions[0].entry_stmt;
        let for_stmt = &compound.children()[1];
        let decl = &for_stmt.references()[0];
        assert!(decl.declaring_stmt().is_some());
        assert_eq!(decl.declaring_stmt().unwrap(), &compound.children()[0]);
    }
}
