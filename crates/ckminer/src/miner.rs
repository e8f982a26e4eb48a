//! Loop discovery over a function body (spec.md §4.B).

use crate::ast::Statement;

/// An innermost `for`-loop together with the depth of the `for`-nest chain
/// that ends at it.
#[derive(Debug, Clone)]
pub struct LoopCandidate {
    pub for_stmt: Statement,
    pub depth: u32,
}

/// Walk `entry`'s subtree and return every innermost `for`-loop over an
/// array subscript, in source order, with its nest depth.
///
/// `depth_min` is the minimum nest-chain length to keep (spec.md's Open
/// Question resolution: default 1, tested with `>=`).
pub fn mine(entry: &Statement, depth_min: u32) -> Vec<LoopCandidate> {
    let mut candidates = Vec::new();
    walk(entry, 0, &mut candidates);
    candidates.retain(|c| c.depth >= depth_min);
    candidates
}

fn walk(stmt: &Statement, parent_for_depth: u32, out: &mut Vec<LoopCandidate>) {
    let depth = if stmt.is_for_stmt() {
        parent_for_depth + 1
    } else {
        parent_for_depth
    };

    if stmt.is_for_stmt() && is_innermost(stmt) && contains_array_subscript(stmt) {
        out.push(LoopCandidate {
            for_stmt: stmt.clone(),
            depth,
        });
    }

    for child in stmt.children() {
        walk(child, depth, out);
    }
}

/// "Own subtree contains exactly one `ForStmt`" — itself, and no nested
/// `for` beneath it.
fn is_innermost(stmt: &Statement) -> bool {
    count_for_stmts(stmt) == 1
}

fn count_for_stmts(stmt: &Statement) -> u32 {
    let mut count = if stmt.is_for_stmt() { 1 } else { 0 };
    for child in stmt.children() {
        count += count_for_stmts(child);
    }
    count
}

fn contains_array_subscript(stmt: &Statement) -> bool {
    if stmt.kind() == "ArraySubscriptExpr" {
        return true;
    }
    stmt.children().iter().any(contains_array_subscript)
}
