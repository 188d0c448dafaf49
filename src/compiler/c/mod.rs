/*!
Translation of a laid out program into C.

Every PROCEDURE becomes a parameterless C function in a file of its own, and
the top level statements become `main`.  The generated code never names a
variable: every access goes through the runtime library's `get` and `put`
functions at the address that the memory layout assigned.  The initial
memory image and the memory map are written as C data for the runtime
library to load.
*/
mod artifacts;
mod builtins;
mod error;
mod expression;
mod statement;
mod types;

pub use artifacts::{
    configuration_h, function_file, memory_c, memory_map_comment, procedures_h, GeneratedFile,
};
pub use error::CodegenError;
pub use expression::{Call, ExpressionGenerator};
pub use statement::{placeholder, CaseState, Counters, FunctionEmitter};
pub use types::{convert, conversions, Code, Conversion};

use log::debug;

use super::{
    config::GeneratorConfig, memory::Layout, semantics::symbol_table::ScopeTree, CompilerError,
};

pub type CodegenResult<T> = Result<T, CompilerError<CodegenError>>;

/**
Generates every file of the translated program: one C file per function,
followed by `procedures.h`, `memory.c` and `configuration.h`.  `tree` must
already be laid out by `layout`.
 */
pub fn generate(
    tree: &ScopeTree,
    layout: &Layout,
    config: &GeneratorConfig,
) -> CodegenResult<Vec<GeneratedFile>> {
    debug!("Generating C");
    let mut counters = Counters::default();
    let mut files = vec![];
    for scope in tree.functions() {
        files.push(function_file(tree, scope, layout, config, &mut counters)?);
    }
    files.push(procedures_h(tree, config));
    files.push(memory_c(layout));
    files.push(configuration_h(layout, config));
    debug!("Finished generating C: {} files", files.len());
    Ok(files)
}
