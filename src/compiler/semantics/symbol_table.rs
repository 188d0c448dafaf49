use serde::{Deserialize, Serialize};

use crate::compiler::ast::{Datatype, Scalar, Statement, StorageClass};

use super::error::ModelError;

/// Identifies one [`Scope`] within a [`ScopeTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}", self.0))
    }
}

/// What kind of construct opened a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockType {
    Root,
    Procedure,
    DoBlock,
    DoCase,
    DoWhile,
    DoUntil,
    DoFor,
}

impl BlockType {
    pub fn is_loop(&self) -> bool {
        matches!(self, BlockType::DoWhile | BlockType::DoUntil | BlockType::DoFor)
    }

    /// The name used in the comment closing the generated block.
    pub fn describe(&self) -> &'static str {
        match self {
            BlockType::Root => "program",
            BlockType::Procedure => "PROCEDURE",
            BlockType::DoBlock => "DO block",
            BlockType::DoCase => "DO CASE block",
            BlockType::DoWhile => "DO WHILE block",
            BlockType::DoUntil => "DO UNTIL block",
            BlockType::DoFor => "DO FOR block",
        }
    }
}

/// A value from an `INITIAL` list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Initial {
    Number(i64),
    Text(String),
}

/// A field of a BASED RECORD.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Scalar,
    pub top: Option<u32>,
    pub offset: u32,
}

impl Field {
    pub fn stride(&self) -> u32 {
        self.ty.stride()
    }

    pub fn num_elements(&self) -> u32 {
        self.top.map(|t| t + 1).unwrap_or(0)
    }

    fn size(&self) -> u32 {
        self.stride() * self.top.map(|t| t + 1).unwrap_or(1)
    }
}

/// The shape of a BASED RECORD: its fields, laid out in declaration order,
/// and the total number of bytes that one record occupies.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    fields: Vec<Field>,
    size: u32,
}

impl Record {
    pub fn new(fields: Vec<(String, Scalar, Option<u32>)>) -> Record {
        let mut offset = 0;
        let fields: Vec<Field> = fields
            .into_iter()
            .map(|(name, ty, top)| {
                let field = Field {
                    name,
                    ty,
                    top,
                    offset,
                };
                offset += field.size();
                field
            })
            .collect();
        Record {
            fields,
            size: offset,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BasedTarget {
    Element(Scalar),
    Record(Record),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Procedure {
    pub parameters: Vec<String>,
    pub returns: Option<Scalar>,
    pub scope: ScopeId,
    pub calls: u32,
}

impl Procedure {
    /// Procedures without a declared type still return a FIXED.
    pub fn return_type(&self) -> Scalar {
        self.returns.unwrap_or(Scalar::Fixed)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum VarKind {
    Fixed,
    Bit(u32),
    Character,
    Based(BasedTarget),
    Procedure(Procedure),
}

/// A single entry in a [`SymbolTable`].
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub mangled: String,
    pub line: u32,
    pub storage: StorageClass,
    pub top: Option<u32>,
    pub initial: Vec<Initial>,
    pub address: Option<u32>,
    pub kind: VarKind,
}

impl Variable {
    pub fn new(name: &str, kind: VarKind) -> Variable {
        Variable {
            name: name.into(),
            mangled: String::new(),
            line: 0,
            storage: StorageClass::NonCommon,
            top: None,
            initial: vec![],
            address: None,
            kind,
        }
    }

    /// The scalar type of a plain FIXED, BIT or CHARACTER variable.
    pub fn scalar(&self) -> Option<Scalar> {
        match self.kind {
            VarKind::Fixed => Some(Scalar::Fixed),
            VarKind::Bit(w) => Some(Scalar::Bit(w)),
            VarKind::Character => Some(Scalar::Character),
            _ => None,
        }
    }

    /// The scalar type of the elements addressed through this variable: its
    /// own type for plain variables, the element type for a BASED scalar.
    pub fn element(&self) -> Option<Scalar> {
        match &self.kind {
            VarKind::Based(BasedTarget::Element(s)) => Some(*s),
            _ => self.scalar(),
        }
    }

    pub fn datatype(&self) -> Option<Datatype> {
        self.element().map(|s| s.datatype())
    }

    pub fn is_based(&self) -> bool {
        matches!(self.kind, VarKind::Based(_))
    }

    pub fn get_procedure(&self) -> Option<&Procedure> {
        match &self.kind {
            VarKind::Procedure(p) => Some(p),
            _ => None,
        }
    }

    pub fn get_procedure_mut(&mut self) -> Option<&mut Procedure> {
        match &mut self.kind {
            VarKind::Procedure(p) => Some(p),
            _ => None,
        }
    }

    pub fn get_record(&self) -> Option<&Record> {
        match &self.kind {
            VarKind::Based(BasedTarget::Record(r)) => Some(r),
            _ => None,
        }
    }

    /// Distance in bytes between consecutive elements.
    pub fn stride(&self) -> u32 {
        match &self.kind {
            VarKind::Fixed | VarKind::Character => 4,
            VarKind::Bit(w) => Scalar::Bit(*w).stride(),
            VarKind::Based(BasedTarget::Element(s)) => s.stride(),
            VarKind::Based(BasedTarget::Record(r)) => r.size(),
            VarKind::Procedure(_) => 0,
        }
    }

    /// Number of elements declared, 1 for a variable without an extent.
    pub fn count(&self) -> u32 {
        self.top.map(|t| t + 1).unwrap_or(1)
    }

    /// Number of bytes reserved at the variable's own address.  A BASED
    /// variable only owns its pointer.
    pub fn slot_size(&self) -> u32 {
        match &self.kind {
            VarKind::Based(_) => 4,
            VarKind::Procedure(_) => 0,
            _ => self.stride() * self.count(),
        }
    }
}

/**
`SymbolTable` holds every identifier declared directly within one scope, in
declaration order.  Identifiers are unique within a table; lookups that need
to see enclosing declarations go through [`ScopeTree::lookup`].
 */
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SymbolTable {
    sym: Vec<Variable>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { sym: vec![] }
    }

    pub fn add(&mut self, var: Variable) -> Result<(), ModelError> {
        if self.get(&var.name).is_some() {
            return Err(ModelError::AlreadyDeclared(var.name));
        }
        self.sym.push(var);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.sym.iter().find(|v| v.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.sym.iter_mut().find(|v| v.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        let idx = self.sym.iter().position(|v| v.name == name)?;
        Some(self.sym.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.sym.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Variable> {
        self.sym.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.sym.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sym.is_empty()
    }
}

/// A node in the scope tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Scope {
    symbol: String,
    label: Option<String>,
    block: BlockType,
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    table: SymbolTable,
    code: Vec<Statement>,
    prefix: String,
}

impl Scope {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn block(&self) -> BlockType {
        self.block
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut SymbolTable {
        &mut self.table
    }

    pub fn code(&self) -> &[Statement] {
        &self.code
    }

    pub fn push_statement(&mut self, stmt: Statement) {
        self.code.push(stmt)
    }

    /// The mangling prefix shared by every identifier declared here.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(super) fn set_prefix(&mut self, prefix: String) {
        self.prefix = prefix
    }
}

/**
The lexical scopes of a program.  Scopes are stored in an arena and refer to
each other by [`ScopeId`]; a scope owns its children through the `children`
list while the `parent` link is only used for lookups.  The first scope is
always the root, which holds the program's top level declarations and
statements.

Removing a scope (see [`ScopeTree::detach`]) unlinks it from its parent so
that no traversal starting at the root will reach it again.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> ScopeTree {
        ScopeTree {
            scopes: vec![Scope {
                symbol: String::new(),
                label: None,
                block: BlockType::Root,
                parent: None,
                children: vec![],
                table: SymbolTable::new(),
                code: vec![],
                prefix: String::new(),
            }],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    /// Creates a new, empty scope as the last child of `parent`.
    pub fn add_scope(
        &mut self,
        parent: ScopeId,
        symbol: &str,
        block: BlockType,
        label: Option<String>,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            symbol: symbol.into(),
            label,
            block,
            parent: Some(parent),
            children: vec![],
            table: SymbolTable::new(),
            code: vec![],
            prefix: String::new(),
        });
        self.scopes[parent.0].children.push(id);
        id
    }

    /// Unlinks `id` and everything beneath it from the tree.
    pub fn detach(&mut self, id: ScopeId) {
        if let Some(parent) = self.scopes[id.0].parent {
            self.scopes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Every scope reachable from `from`, parents before their children and
    /// siblings in order.
    pub fn walk(&self, from: ScopeId) -> Vec<ScopeId> {
        let mut order = vec![];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            order.push(id);
            for child in self.get(id).children.iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    /// Every reachable scope that becomes its own generated function: the
    /// root followed by each procedure.
    pub fn functions(&self) -> Vec<ScopeId> {
        self.walk(self.root())
            .into_iter()
            .filter(|id| {
                matches!(
                    self.get(*id).block,
                    BlockType::Root | BlockType::Procedure
                )
            })
            .collect()
    }

    /// Finds the declaration of `name` visible from `scope`, searching
    /// outward through the enclosing scopes.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Variable> {
        self.lookup_with_scope(scope, name).map(|(_, v)| v)
    }

    pub fn lookup_with_scope(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, &Variable)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.get(id);
            if let Some(v) = s.table.get(name) {
                return Some((id, v));
            }
            current = s.parent;
        }
        None
    }

    /// The innermost procedure scope enclosing `scope` (including `scope`
    /// itself), or `None` when `scope` is part of the top level.
    pub fn enclosing_procedure(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.get(id);
            match s.block {
                BlockType::Procedure => return Some(id),
                BlockType::Root => return None,
                _ => current = s.parent,
            }
        }
        None
    }

    /// The declaration of the procedure whose body is `scope`.
    pub fn procedure_of(&self, scope: ScopeId) -> Option<&Procedure> {
        let s = self.get(scope);
        if s.block != BlockType::Procedure {
            return None;
        }
        let parent = s.parent?;
        self.get(parent)
            .table
            .get(&s.symbol)
            .and_then(|v| v.get_procedure())
    }

    /// The name of the generated function for the root or a procedure.
    pub fn function_name(&self, scope: ScopeId) -> String {
        let s = self.get(scope);
        match s.block {
            BlockType::Root => "main".into(),
            _ => s.prefix.strip_suffix('x').unwrap_or(&s.prefix).into(),
        }
    }
}
