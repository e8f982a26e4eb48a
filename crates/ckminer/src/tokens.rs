//! Ordered token rendering, shared by the free-use analyser, preamble
//! synthesiser and kernel assembler (spec.md §4.F).

use crate::ast::{Statement, Token};

/// Collect every token covered by `stmt`'s subtree, in the order the AST
/// visited them (not yet re-sorted by source index).
pub fn tokens_of(stmt: &Statement) -> Vec<Token> {
    let mut out = Vec::new();
    collect(stmt, &mut out);
    out
}

fn collect(stmt: &Statement, out: &mut Vec<Token>) {
    out.extend(stmt.own_tokens().iter().cloned());
    for child in stmt.children() {
        collect(child, out);
    }
}

/// `token_render`: stable sort by global source-order index, drop `#pragma`
/// tokens, join spellings with a single space.
pub fn render(tokens: &[Token]) -> String {
    let mut ordered: Vec<&Token> = tokens.iter().filter(|t| !t.is_pragma()).collect();
    ordered.sort_by_key(|t| t.index);
    ordered
        .iter()
        .map(|t| t.spelling.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convenience: gather `stmt`'s subtree tokens and render them in one call.
pub fn render_subtree(stmt: &Statement) -> String {
    render(&tokens_of(stmt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Decl;

    fn tok(spelling: &str, kind: &str, index: u32) -> Token {
        Token {
            spelling: spelling.to_string(),
            kind: kind.to_string(),
            index,
        }
    }

    #[test]
    fn render_sorts_by_index_not_by_gathering_order() {
        let tokens = vec![tok("b", "identifier", 1), tok("a", "identifier", 0)];
        assert_eq!(render(&tokens), "a b");
    }

    #[test]
    fn render_strips_pragma_tokens() {
        let tokens = vec![
            tok("#pragma", "pragma", 0),
            tok("omp", "pragma_omp", 1),
            tok("for", "identifier", 2),
        ];
        assert_eq!(render(&tokens), "for");
    }

    #[test]
    fn tokens_of_walks_children_in_order() {
        let leaf1 = Statement::new("IntegerLiteral", vec![], vec![], vec![tok("1", "numeric_constant", 0)]);
        let leaf2 = Statement::new("IntegerLiteral", vec![], vec![], vec![tok("2", "numeric_constant", 1)]);
        let parent = Statement::new(
            "BinaryOperator",
            vec![leaf1, leaf2],
            vec![Decl::variable("unused", "int", None, None)],
            vec![tok("+", "plus", 2)],
        );
        let gathered = tokens_of(&parent);
        assert_eq!(gathered.len(), 3);
        assert_eq!(render(&gathered), "1 2 +");
    }
}
