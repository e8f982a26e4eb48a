//! ckernel-miner: mines compilable, self-contained C loop kernels out of an
//! already-parsed translation unit.
//!
//! The pipeline is five small components, leaves first:
//!
//! - [`ast`]: the read-only AST view the rest of the crate walks, plus the
//!   one concrete front end shipped here ([`ast::json`]).
//! - [`miner`]: finds innermost `for`-loops over an array subscript.
//! - [`freeuse`]: for one such loop, the free declarations and the record
//!   closure those declarations drag in.
//! - [`preamble`]: turns a [`freeuse::FreeUse`] into topologically-ordered C.
//! - [`assemble`]: wraps the loop body, pretty-prints, compile-checks.
//!
//! [`tokens`] and [`stmt_counts`] are shared leaves; [`external`] wraps the
//! two subprocess collaborators; [`config`] and [`kernel`] are the
//! surrounding configuration and output schema.

pub mod assemble;
pub mod ast;
pub mod config;
pub mod external;
pub mod freeuse;
pub mod kernel;
pub mod miner;
pub mod preamble;
pub mod stmt_counts;
pub mod tokens;

pub use assemble::{assemble_kernel, mine_function};
pub use config::MiningConfig;
pub use kernel::{KernelMeta, KernelRecord};
pub use miner::LoopCandidate;
