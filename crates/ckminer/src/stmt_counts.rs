//! Statement-count histogram (spec.md's "Statement-count metadata" section),
//! part of a kernel record's `meta`.

use std::collections::BTreeMap;

use crate::ast::Statement;

const COUNTED_MARKERS: [&str; 4] = ["Stmt", "Expr", "Operator", "Literal"];

/// A kind contributes an entry when its name contains one of the markers
/// above. Unary/binary operators additionally contribute a refined key built
/// from their own tokens' kinds, so `a + b` and `a * b` are counted
/// separately rather than collapsing into one `BinaryOperator` bucket.
pub fn histogram(root: &Statement) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    walk(root, &mut counts);
    counts
}

fn walk(stmt: &Statement, counts: &mut BTreeMap<String, u64>) {
    if is_counted(stmt.kind()) {
        *counts.entry(stmt.kind().to_string()).or_insert(0) += 1;
        if let Some(refined) = refined_operator_key(stmt) {
            *counts.entry(refined).or_insert(0) += 1;
        }
    }
    for child in stmt.children() {
        walk(child, counts);
    }
}

fn is_counted(kind: &str) -> bool {
    COUNTED_MARKERS.iter().any(|marker| kind.contains(marker))
}

fn refined_operator_key(stmt: &Statement) -> Option<String> {
    if stmt.kind() != "BinaryOperator" && stmt.kind() != "UnaryOperator" {
        return None;
    }
    let token_kinds: Vec<&str> = stmt.own_tokens().iter().map(|t| t.kind.as_str()).collect();
    if token_kinds.is_empty() {
        return None;
    }
    Some(format!("{}_{}", stmt.kind(), token_kinds.join("_")))
}
