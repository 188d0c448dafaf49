use super::Expression;
use crate::compiler::semantics::symbol_table::ScopeId;

/// One statement of a scope, along with the source line it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub line: u32,
    pub text: String,
    pub kind: StatementKind,
}

/**
The statement kinds produced by the parser.  Statements which open a
`DO ... END` block own the block's scope through its [`ScopeId`]; the
statements within the block are stored in that scope.
 */
#[derive(Clone, Debug, PartialEq)]
pub enum StatementKind {
    Assign {
        lhs: Vec<Expression>,
        rhs: Expression,
    },
    For {
        index: Expression,
        from: Expression,
        to: Expression,
        by: Expression,
        block: ScopeId,
    },
    While {
        cond: Expression,
        block: ScopeId,
    },
    Until {
        cond: Expression,
        block: ScopeId,
    },
    Block(ScopeId),
    If(Expression),
    Else,
    Case {
        selector: Expression,
        block: ScopeId,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
    Return(Option<Expression>),
    Goto(String),
    Target(String),
    Escape(Option<String>),
    Repeat(Option<String>),
    Empty,
}

impl StatementKind {
    /// The nested block opened by this statement, if any.
    pub fn block(&self) -> Option<ScopeId> {
        match self {
            StatementKind::For { block, .. }
            | StatementKind::While { block, .. }
            | StatementKind::Until { block, .. }
            | StatementKind::Case { block, .. }
            | StatementKind::Block(block) => Some(*block),
            _ => None,
        }
    }

    /// Every expression directly held by this statement.
    pub fn expressions(&self) -> Vec<&Expression> {
        match self {
            StatementKind::Assign { lhs, rhs } => {
                let mut v = vec![rhs];
                v.extend(lhs.iter());
                v
            }
            StatementKind::For {
                index, from, to, by, ..
            } => vec![index, from, to, by],
            StatementKind::While { cond, .. } | StatementKind::Until { cond, .. } => vec![cond],
            StatementKind::If(cond) => vec![cond],
            StatementKind::Case { selector, .. } => vec![selector],
            StatementKind::Call { args, .. } => args.iter().collect(),
            StatementKind::Return(Some(e)) => vec![e],
            _ => vec![],
        }
    }
}
