//! The output schema (spec.md §3, §6): one record per mined loop.

use std::collections::BTreeMap;

use serde::Serialize;

/// Per-kernel metadata. Typed `INT`-or-text columns if a harness lays these
/// out in SQLite, per spec.md §6.
#[derive(Debug, Clone, Serialize)]
pub struct KernelMeta {
    pub max_loop_depth: u32,
    pub num_tokens: usize,
    pub stmt_counts: BTreeMap<String, u64>,
    pub clang_returncode: i32,
    pub filename: String,
    pub dataset_name: String,
}

/// A single reconstructed, compile-checked loop kernel.
#[derive(Debug, Clone, Serialize)]
pub struct KernelRecord {
    /// The full synthesised compilation unit (headers ∥ preamble ∥ wrapper).
    pub src: String,
    /// Just the loop body, verbatim from its original context.
    pub body: String,
    pub meta: KernelMeta,
}
