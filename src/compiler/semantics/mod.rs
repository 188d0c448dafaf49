/*
 * The scope model of a program and the passes which rewrite it in place
 * before memory is laid out:
 * 1. Mangling: gives every declared identifier a flat, globally unique name.
 * 2. Pruning: removes top level procedures that are never called.
 */
mod error;
mod tests;

pub mod call_tree;
pub mod mangle;
pub mod symbol_table;

pub use error::ModelError;

use super::CompilerError;

/// Captures the Failure state of building a scope tree from a program model.
pub type ModelResult<T> = Result<T, CompilerError<ModelError>>;
