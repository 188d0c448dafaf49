use std::collections::HashMap;

use log::{debug, info};

use crate::compiler::ast::{Expression, StatementKind};

use super::symbol_table::{BlockType, ScopeId, ScopeTree};

/// Top level procedures that are replaced by the runtime library and are
/// never generated, whether or not they are called.
pub const OVERRIDDEN: [&str; 2] = ["COMPACTIFY", "RECORD_LINK"];

/**
Removes every top level procedure which nothing calls.  A call counts if it
is a `CALL` statement naming the procedure or any identifier token naming it
within an expression, found anywhere in the program except inside the
procedure's own body.  Removing a procedure can leave others without
callers, so the count is repeated until nothing more is removed.

Returns the names of the removed procedures in the order they were removed.
 */
pub fn prune(tree: &mut ScopeTree) -> Vec<String> {
    debug!("Pruning unreferenced procedures");
    let mut removed = vec![];

    for name in OVERRIDDEN.iter() {
        if remove_procedure(tree, name) {
            removed.push(name.to_string());
        }
    }

    loop {
        let counts = count_references(tree);
        let root = tree.root();
        let mut unused = vec![];
        for var in tree.get_mut(root).table_mut().iter_mut() {
            let name = var.name.clone();
            if let Some(proc) = var.get_procedure_mut() {
                proc.calls = *counts.get(&name).unwrap_or(&0);
                if proc.calls == 0 {
                    unused.push(name);
                }
            }
        }

        if unused.is_empty() {
            break;
        }

        for name in unused {
            remove_procedure(tree, &name);
            removed.push(name);
        }
    }

    for name in &removed {
        info!("No code is generated for unused or overridden PROCEDURE {}", name);
    }
    debug!("Finished pruning: {} removed", removed.len());
    removed
}

fn remove_procedure(tree: &mut ScopeTree, name: &str) -> bool {
    let root = tree.root();
    let is_procedure = tree
        .get(root)
        .table()
        .get(name)
        .map(|v| v.get_procedure().is_some())
        .unwrap_or(false);
    if !is_procedure {
        return false;
    }

    if let Some(var) = tree.get_mut(root).table_mut().remove(name) {
        if let Some(proc) = var.get_procedure() {
            tree.detach(proc.scope);
        }
    }
    true
}

/// Counts, for every top level procedure, the references to it from outside
/// of its own body.
pub fn count_references(tree: &ScopeTree) -> HashMap<String, u32> {
    let root = tree.root();
    let mut counts: HashMap<String, u32> = tree
        .get(root)
        .table()
        .iter()
        .filter(|v| v.get_procedure().is_some())
        .map(|v| (v.name.clone(), 0))
        .collect();

    let owners = top_level_owners(tree);
    for id in tree.walk(root) {
        let owner = owners.get(&id).and_then(|o| o.as_deref());
        for stmt in tree.get(id).code() {
            let mut count = |name: &str| {
                if Some(name) != owner {
                    if let Some(c) = counts.get_mut(name) {
                        *c += 1;
                    }
                }
            };
            if let StatementKind::Call { name, .. } = &stmt.kind {
                count(name);
            }
            for expr in stmt.kind.expressions() {
                count_in_expression(expr, &mut count);
            }
        }
    }
    counts
}

fn count_in_expression<F: FnMut(&str)>(expr: &Expression, count: &mut F) {
    expr.for_each(&mut |e| {
        if let Some(id) = e.get_identifier() {
            count(id)
        }
    })
}

/// Maps every reachable scope to the name of the top level procedure whose
/// body contains it, or `None` for scopes that are part of the top level.
fn top_level_owners(tree: &ScopeTree) -> HashMap<ScopeId, Option<String>> {
    let mut owners = HashMap::new();
    let root = tree.root();
    owners.insert(root, None);
    for id in tree.walk(root) {
        let owner = owners.get(&id).cloned().unwrap_or(None);
        for child in tree.get(id).children() {
            let child_owner = match (&owner, tree.get(*child).block()) {
                (None, BlockType::Procedure) => Some(tree.get(*child).symbol().to_string()),
                _ => owner.clone(),
            };
            owners.insert(*child, child_owner);
        }
    }
    owners
}
