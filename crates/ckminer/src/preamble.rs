//! Topologically-ordered C preamble synthesis (spec.md §4.D).

use std::collections::BTreeMap;

use crate::ast::{Decl, TypedefKind};
use crate::freeuse::FreeUse;
use crate::tokens::render;

const FIXED_HEADERS: &str = "#include <stdint.h>\n#include <stdio.h>\n";

/// One free variable or function, shaped into a valid C declaration.
#[derive(Debug, Clone)]
pub struct ExternDecl {
    /// The declaration as it appears in the preamble, e.g. `"extern int x;"`.
    pub extern_text: String,
    /// The same declaration without the `extern`/`;` wrapping, suitable as a
    /// wrapper-function parameter (spec.md §4.E step 2).
    pub param_text: String,
}

/// Everything the kernel assembler needs: the preamble text plus the
/// parameter list for the synthetic wrapper function.
#[derive(Debug, Clone)]
pub struct Preamble {
    pub text: String,
    pub variable_params: Vec<String>,
}

/// Assemble the seven-section preamble described in spec.md §4.D.
pub fn synthesize(free_use: &FreeUse) -> Preamble {
    let mut sections = Vec::new();
    sections.push(FIXED_HEADERS.trim_end().to_string());

    // 2. Builtin typedef aliases used by referenced records. A typedef
    // decl's own tokens stop short of the trailing `;` (Clang doesn't
    // include it in the decl's range), so it must be appended here.
    let builtin_typedefs = dedup_longest_named(
        free_use
            .required_typedefs
            .iter()
            .filter(|t| t.kind() == TypedefKind::Builtin)
            .map(|t| (t.name().to_string(), format!("{};", render(t.tokens())))),
    );
    sections.extend(builtin_typedefs.values().cloned());

    // 3. Variable-reached typedefs. Same missing-`;` caveat as section 2.
    let variable_typedefs = dedup_longest_named(
        free_use
            .variable_typedefs
            .iter()
            .map(|t| (t.name().to_string(), format!("{};", render(t.tokens())))),
    );
    sections.extend(variable_typedefs.values().cloned());

    // 4. Enum definitions reached via records.
    let enum_text = |e: &crate::ast::Enum| format!("{};", render(e.tokens()));
    for e in &free_use.required_enums {
        sections.push(enum_text(e));
    }
    let concatenated_enum_text: String = free_use
        .required_enums
        .iter()
        .map(|e| render(e.tokens()))
        .collect::<Vec<_>>()
        .join(" ");

    // 5. Record forward declarations.
    for record in &free_use.required_records {
        if record.is_anonymous() {
            continue;
        }
        sections.push(format!("typedef struct {0} {0};", record.name()));
    }

    // 6. Record definitions, longest textual variant per name, in the
    // §4.C DFS post-order — a by-value nested member needs its dependency's
    // *definition* (not just the section-5 forward decl) to appear first,
    // so this must stay in `required_records` order, not name-sorted.
    sections.extend(dedup_longest_keep_order(
        free_use
            .required_records
            .iter()
            .filter(|r| !r.is_anonymous())
            .map(|r| (r.name().to_string(), format!("typedef {} {};", render(r.tokens()), r.name()))),
    ));

    // 7. Free variable / function externs, shadowing-filtered and deduped
    // by their final emitted declaration string.
    let mut seen_externs = BTreeMap::new();
    let mut variable_params = Vec::new();
    for decl in &free_use.free_decls {
        if is_shadowed_by_enum_constant(decl, &concatenated_enum_text) {
            tracing::trace!(name = decl.name(), "skipping decl, shadowed by enum constant");
            continue;
        }
        let Some(shaped) = shape_decl(decl) else {
            continue;
        };
        if seen_externs.insert(shaped.extern_text.clone(), ()).is_none() {
            sections.push(shaped.extern_text.clone());
        }
        if matches!(decl, Decl::Variable(_)) {
            variable_params.push(shaped.param_text);
        }
    }

    Preamble {
        text: sections.join("\n"),
        variable_params,
    }
}

fn is_shadowed_by_enum_constant(decl: &Decl, concatenated_enum_text: &str) -> bool {
    let name = decl.name();
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_uppercase())
        && concatenated_enum_text.contains(name)
}

/// Shape a free `Function`/`Variable` Decl into its extern declaration and,
/// for variables, its bare parameter form. Returns `None` for Decl variants
/// that are not emitted in this section (records/enums/typedefs have their
/// own sections above).
fn shape_decl(decl: &Decl) -> Option<ExternDecl> {
    match decl {
        Decl::Function(f) => {
            let i = f.type_string.find('(')?;
            let param = format!("{} {} {}", &f.type_string[..i], f.name, &f.type_string[i..]);
            Some(ExternDecl {
                extern_text: format!("extern {param};"),
                param_text: param,
            })
        }
        Decl::Variable(v) => {
            let param = shape_variable_decl(&v.type_string, &v.name);
            Some(ExternDecl {
                extern_text: format!("extern {param};"),
                param_text: param,
            })
        }
        Decl::Record(_) | Decl::Enum(_) | Decl::Typedef(_) => None,
    }
}

/// Render a variable's declaration as `"{type} {name}"`, handling the two
/// type shapes that need surgery rather than simple concatenation.
fn shape_variable_decl(type_string: &str, name: &str) -> String {
    if let Some(i) = type_string.find("(*)") {
        let mut out = String::with_capacity(type_string.len() + name.len() + 2);
        out.push_str(&type_string[..i]);
        out.push_str(&format!("(*{name})"));
        out.push_str(&type_string[i + "(*)".len()..]);
        return out;
    }
    if let Some(i) = type_string.find('[') {
        let mut out = String::with_capacity(type_string.len() + name.len() + 1);
        out.push_str(&type_string[..i]);
        out.push(' ');
        out.push_str(name);
        out.push(' ');
        out.push_str(&type_string[i..]);
        return out;
    }
    format!("{type_string} {name}")
}

/// Keep the longest textual form seen per name, returned in alphabetical
/// name order (a `BTreeMap`'s iteration order) — fine where no particular
/// emission order is required, e.g. the typedef sections.
fn dedup_longest_named(items: impl Iterator<Item = (String, String)>) -> BTreeMap<String, String> {
    let mut by_name: BTreeMap<String, String> = BTreeMap::new();
    for (name, text) in items {
        by_name
            .entry(name)
            .and_modify(|existing| {
                if text.len() > existing.len() {
                    *existing = text.clone();
                }
            })
            .or_insert(text);
    }
    by_name
}

/// Like `dedup_longest_named`, but preserves the order names were first
/// seen in rather than sorting them — required for record definitions
/// (spec.md §4.D step 6), which must stay in `required_records`' §4.C DFS
/// post-order for by-value (non-pointer) nested members to type-check.
fn dedup_longest_keep_order(items: impl Iterator<Item = (String, String)>) -> Vec<String> {
    let mut index_by_name: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut texts: Vec<String> = Vec::new();
    for (name, text) in items {
        match index_by_name.get(&name) {
            Some(&i) => {
                if text.len() > texts[i].len() {
                    texts[i] = text;
                }
            }
            None => {
                index_by_name.insert(name, texts.len());
                texts.push(text);
            }
        }
    }
    texts
}
