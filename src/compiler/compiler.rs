use log::debug;

use super::{
    c::{self, CodegenError, GeneratedFile},
    config::GeneratorConfig,
    memory::{self, Layout, LayoutError},
    semantics::{call_tree, mangle::mangle, symbol_table::ScopeTree, ModelError},
    CompilerError, CompilerErrorDisplay,
};
use crate::project::model::ScopeModel;

/// The output of translating one program.
pub struct Translation {
    pub files: Vec<GeneratedFile>,
    /// Top level procedures for which no code was generated.
    pub removed: Vec<String>,
    pub layout: Layout,
    pub tree: ScopeTree,
}

/// A failure in one of the stages of [`translate`].
#[derive(Clone, Debug, PartialEq)]
pub enum TranslationError {
    Model(CompilerError<ModelError>),
    Layout(CompilerError<LayoutError>),
    Codegen(CompilerError<CodegenError>),
}

impl CompilerErrorDisplay for TranslationError {
    fn format(&self) -> String {
        match self {
            TranslationError::Model(e) => e.format(),
            TranslationError::Layout(e) => e.format(),
            TranslationError::Codegen(e) => e.format(),
        }
    }
}

impl From<CompilerError<ModelError>> for TranslationError {
    fn from(e: CompilerError<ModelError>) -> Self {
        TranslationError::Model(e)
    }
}

impl From<CompilerError<LayoutError>> for TranslationError {
    fn from(e: CompilerError<LayoutError>) -> Self {
        TranslationError::Layout(e)
    }
}

impl From<CompilerError<CodegenError>> for TranslationError {
    fn from(e: CompilerError<CodegenError>) -> Self {
        TranslationError::Codegen(e)
    }
}

/**
Translates a program model into C, running each stage in order:
1. Build the scope tree from the model.
2. Mangle every identifier.
3. Remove the top level procedures that are never called.
4. Lay out simulated memory.
5. Generate the C files.
 */
pub fn translate(
    model: &ScopeModel,
    config: &GeneratorConfig,
) -> Result<Translation, TranslationError> {
    debug!("Translating program");
    let mut tree = ScopeTree::from_model(model)?;
    mangle(&mut tree)?;
    let removed = call_tree::prune(&mut tree);
    let layout = memory::layout(&mut tree, config)?;
    let files = c::generate(&tree, &layout, config)?;
    debug!("Finished translating program");
    Ok(Translation {
        files,
        removed,
        layout,
        tree,
    })
}
