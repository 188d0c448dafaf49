use crate::compiler::CompilerErrorDisplay;

/// Errors found while converting the parser's program model into a
/// [`ScopeTree`](super::symbol_table::ScopeTree).
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    AlreadyDeclared(String),
    InvalidIdentifier(String),
    EmptyRecord(String),
    DuplicateField(String, String),
    DuplicateMangledName(String, String),
    UndeclaredParameter(String, String),
}

impl CompilerErrorDisplay for ModelError {
    fn format(&self) -> String {
        match self {
            ModelError::AlreadyDeclared(name) => {
                format!("{} is declared more than once in the same scope", name)
            }
            ModelError::InvalidIdentifier(name) => format!("{} is not a valid identifier", name),
            ModelError::EmptyRecord(name) => format!("BASED RECORD {} has no fields", name),
            ModelError::DuplicateField(name, field) => {
                format!("BASED RECORD {} has more than one {} field", name, field)
            }
            ModelError::DuplicateMangledName(name, mangled) => format!(
                "{} is declared again in a nested DO block of the same PROCEDURE and would be mangled to {} twice",
                name, mangled
            ),
            ModelError::UndeclaredParameter(proc, param) => format!(
                "Parameter {} is not DECLAREd within PROCEDURE {}",
                param, proc
            ),
        }
    }
}
