use serde::{Deserialize, Serialize};

/// Operators that can appear in an [`Expression`] token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "|")]
    Or,
    #[serde(rename = "&")]
    And,
    #[serde(rename = "~")]
    Not,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "mod")]
    Mod,
    #[serde(rename = "||")]
    Concat,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "~=")]
    NotEq,
    #[serde(rename = "~<")]
    NotLt,
    #[serde(rename = "~>")]
    NotGt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">=")]
    GtEq,
    #[serde(rename = ".")]
    Field,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Operator::*;
        let op = match self {
            Or => "|",
            And => "&",
            Not => "~",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "mod",
            Concat => "||",
            Eq => "=",
            Lt => "<",
            Gt => ">",
            NotEq => "~=",
            NotLt => "~<",
            NotGt => "~>",
            LtEq => "<=",
            GtEq => ">=",
            Field => ".",
        };
        f.write_str(op)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    Number(i64),
    String(String),
    Operator(Operator),
    Identifier(String),
    Builtin(String),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => f.write_fmt(format_args!("{}", n)),
            Token::String(s) => f.write_fmt(format_args!("'{}'", s)),
            Token::Operator(op) => f.write_fmt(format_args!("{}", op)),
            Token::Identifier(id) => f.write_str(id),
            Token::Builtin(b) => f.write_str(b),
        }
    }
}

/**
A node in an expression tree as produced by the parser.  The meaning of
`children` depends upon the token: operands of an operator, subscripts of an
identifier, arguments of a procedure or builtin, and for the `.` operator the
record base followed by the field.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub token: Token,
    #[serde(default)]
    pub children: Vec<Expression>,
}

impl Expression {
    pub fn number(n: i64) -> Expression {
        Expression {
            token: Token::Number(n),
            children: vec![],
        }
    }

    pub fn identifier(id: &str) -> Expression {
        Expression {
            token: Token::Identifier(id.into()),
            children: vec![],
        }
    }

    pub fn builtin(name: &str, children: Vec<Expression>) -> Expression {
        Expression {
            token: Token::Builtin(name.into()),
            children,
        }
    }

    pub fn get_identifier(&self) -> Option<&str> {
        match &self.token {
            Token::Identifier(id) => Some(id),
            _ => None,
        }
    }

    pub fn get_builtin(&self) -> Option<&str> {
        match &self.token {
            Token::Builtin(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.get_builtin() == Some(name)
    }

    /// Upper-cases every identifier and builtin name in this tree.
    pub fn fold_case(&mut self) {
        match &mut self.token {
            Token::Identifier(id) | Token::Builtin(id) => *id = id.to_uppercase(),
            _ => (),
        }
        for child in self.children.iter_mut() {
            child.fold_case();
        }
    }

    /// Calls `f` on this node and on every node beneath it.
    pub fn for_each<F: FnMut(&Expression)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.for_each(f);
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}", self.token))?;
        if !self.children.is_empty() {
            f.write_str("(")?;
            for (i, c) in self.children.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_fmt(format_args!("{}", c))?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}
