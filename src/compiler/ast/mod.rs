/*!
The abstract syntax consumed by the code generator: expression trees,
statements, and the primitive types.  These are produced by the parser and are
only ever read by the later passes.
*/
mod expression;
mod statement;
mod ty;

pub use expression::*;
pub use statement::*;
pub use ty::*;
