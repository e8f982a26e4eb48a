//! Kernel assembly and compile-check verification (spec.md §4.E).

use crate::ast::Function;
use crate::config::MiningConfig;
use crate::external::{CCompiler, Indenter, SpawnError};
use crate::freeuse::{self, FreeUse};
use crate::kernel::{KernelMeta, KernelRecord};
use crate::miner::{self, LoopCandidate};
use crate::preamble;
use crate::stmt_counts;
use crate::tokens;

/// Mine every qualifying loop out of one function and assemble a kernel
/// record for each, in source order (spec.md §5's ordering note).
///
/// Propagates `SpawnError` only for the compiler invocation itself being
/// unrunnable (spec.md §7: a missing compiler is infrastructural, unlike a
/// non-zero or timed-out check, which is recorded in `clang_returncode`).
pub fn mine_function(
    function: &Function,
    config: &MiningConfig,
    indenter: &Indenter,
    compiler: &CCompiler,
    filename: &str,
) -> Result<Vec<KernelRecord>, SpawnError> {
    miner::mine(&function.entry_stmt, config.depth_min)
        .iter()
        .map(|candidate| assemble_kernel(candidate, config, indenter, compiler, filename))
        .collect()
}

/// Reconstruct and verify a single loop candidate.
pub fn assemble_kernel(
    candidate: &LoopCandidate,
    config: &MiningConfig,
    indenter: &Indenter,
    compiler: &CCompiler,
    filename: &str,
) -> Result<KernelRecord, SpawnError> {
    let free_use = freeuse::analyze(&candidate.for_stmt);
    let (externs_only, hoisted_locals) = split_hoisted_locals(free_use);

    let preamble = preamble::synthesize(&externs_only);

    // A free variable declared just outside the loop (but inside the same
    // function) can't be `extern`'d — it's a real stack local. Re-declare it
    // verbatim at the top of the wrapper body instead of adding it to the
    // parameter list, keeping its original initializer.
    let mut body = String::new();
    for stmt in &hoisted_locals {
        body.push_str(&tokens::render_subtree(stmt));
        body.push(' ');
    }
    body.push_str(&tokens::render_subtree(&candidate.for_stmt));

    let wrapper = format!("int fn({}) {{ {} }}", preamble.variable_params.join(", "), body);
    let unformatted_src = format!("{}\n\n{}", preamble.text, wrapper);
    let src = indenter.format(&unformatted_src);
    let clang_returncode = compiler.check(&src)?;

    let meta = KernelMeta {
        max_loop_depth: candidate.depth,
        num_tokens: tokens::tokens_of(&candidate.for_stmt).len(),
        stmt_counts: stmt_counts::histogram(&candidate.for_stmt),
        clang_returncode,
        filename: filename.to_string(),
        dataset_name: config.dataset_name.clone(),
    };

    Ok(KernelRecord { src, body, meta })
}

/// Split a loop's free declarations into the ones that go through the
/// normal extern/parameter pipeline and the ones that must instead be
/// re-declared inline in the wrapper body (see `assemble_kernel`).
fn split_hoisted_locals(mut free_use: FreeUse) -> (FreeUse, Vec<crate::ast::Statement>) {
    let mut hoisted = Vec::new();
    free_use.free_decls.retain(|d| match d.declaring_stmt() {
        Some(stmt) => {
            hoisted.push(stmt.clone());
            false
        }
        None => true,
    });
    (free_use, hoisted)
}
