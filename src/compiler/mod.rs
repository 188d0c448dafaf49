/*!
The translator from a program model into C source code for the XCOM-I
runtime library.

A program model is the output of the parser: a tree of nested scopes holding
declarations and statements.  Translation runs through a fixed series of
stages, each of which either rewrites the scope tree in place or reads it:

1. `semantics`: builds the arena-backed scope tree, mangles identifiers into
globally unique C names and prunes procedures which are never called.
2. `memory`: assigns every variable an address in a simulated 24-bit memory
and builds the initial memory image and the memory map.
3. `c`: emits one C function per procedure plus the data files that the
runtime library is compiled with.

Errors caused by the input program are reported as a [`CompilerError`],
which carries the line and text of the offending statement and a stage
specific inner error.  Once the memory layout succeeds, the only errors left
are unsupported constructs found by the code generator.
*/
pub mod ast;
pub mod c;
pub mod config;
pub mod memory;
pub mod semantics;

mod compiler;
mod error;
mod tests;

pub use compiler::{translate, Translation, TranslationError};
pub use error::{AtLine, CompilerError, CompilerErrorDisplay};
