use std::collections::HashMap;

use log::debug;

use super::{
    symbol_table::{BlockType, ScopeTree},
    ModelError, ModelResult,
};
use crate::compiler::CompilerError;

/// Separates the names of nested procedures in a mangled name.
pub const SEPARATOR: char = 'x';

/// Replaces the characters which XPL allows in identifiers, but C does not,
/// with lower case letters.  Identifiers are upper case, so the result can
/// never collide with another identifier.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '@' => 'a',
            '#' => 'p',
            '$' => 'd',
            c => c,
        })
        .collect()
}

/// True if `name` is made only of characters that [`sanitize`] can turn
/// into a C identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || "_@#$".contains(c) => (),
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || "_@#$".contains(c))
}

/**
Computes the mangling prefix of every scope and the mangled name of every
declared identifier.  A scope's prefix is the prefix of its parent followed,
for procedure scopes, by the procedure's own sanitized name and the
separator.  DO blocks and the root add nothing.  A procedure `C` nested in
`B` nested in `A` therefore has the prefix `AxBxCx` and is generated as the
function `AxBxC`.

Because DO blocks add nothing to the prefix, a block which redeclares a name
of its procedure would share that name's mangled form.  That is an error.
 */
pub fn mangle(tree: &mut ScopeTree) -> ModelResult<()> {
    debug!("Mangling identifiers");
    let mut seen: HashMap<String, u32> = HashMap::new();
    for id in tree.walk(tree.root()) {
        let scope = tree.get(id);
        let parent_prefix = match scope.parent() {
            Some(p) => tree.get(p).prefix().to_string(),
            None => String::new(),
        };
        let prefix = match scope.block() {
            BlockType::Procedure => {
                format!("{}{}{}", parent_prefix, sanitize(scope.symbol()), SEPARATOR)
            }
            _ => parent_prefix,
        };

        let scope = tree.get_mut(id);
        for var in scope.table_mut().iter_mut() {
            var.mangled = format!("{}{}", prefix, sanitize(&var.name));
            if seen.insert(var.mangled.clone(), var.line).is_some() {
                return Err(CompilerError::new(
                    var.line,
                    ModelError::DuplicateMangledName(var.name.clone(), var.mangled.clone()),
                ));
            }
        }
        scope.set_prefix(prefix);
    }
    debug!("Finished mangling identifiers");
    Ok(())
}
