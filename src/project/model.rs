use log::debug;
use serde::{Deserialize, Serialize};

use crate::compiler::{
    ast::{Expression, Scalar, Statement, StatementKind, StorageClass},
    semantics::{
        mangle::is_identifier,
        symbol_table::{
            BasedTarget, BlockType, Initial, Procedure, Record, ScopeId, ScopeTree, VarKind,
            Variable,
        },
        ModelError, ModelResult,
    },
    CompilerError,
};

/**
The program model handed over by the parser: one nested scope per `DO ...
END` block or procedure body.  The root of a program model file is the
top level scope.
 */
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ScopeModel {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub variables: Vec<DeclarationModel>,
    #[serde(default)]
    pub code: Vec<StatementModel>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeclarationModel {
    pub name: String,
    #[serde(default)]
    pub line: u32,
    #[serde(rename = "type")]
    pub ty: TypeModel,
    #[serde(default)]
    pub common: bool,
    #[serde(default)]
    pub top: Option<u32>,
    #[serde(default)]
    pub initial: Vec<Initial>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeModel {
    Fixed,
    Bit(u32),
    Character,
    Based(BasedModel),
    Procedure(ProcedureModel),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasedModel {
    Element(Scalar),
    Record(Vec<FieldModel>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldModel {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Scalar,
    #[serde(default)]
    pub top: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcedureModel {
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub returns: Option<Scalar>,
    #[serde(default)]
    pub scope: ScopeModel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatementModel {
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub text: String,
    pub kind: KindModel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KindModel {
    Assign {
        lhs: Vec<Expression>,
        rhs: Expression,
    },
    For {
        index: Expression,
        from: Expression,
        to: Expression,
        #[serde(default = "step_of_one")]
        by: Expression,
        block: ScopeModel,
    },
    While {
        cond: Expression,
        block: ScopeModel,
    },
    Until {
        cond: Expression,
        block: ScopeModel,
    },
    Block(ScopeModel),
    If(Expression),
    Else,
    Case {
        selector: Expression,
        block: ScopeModel,
    },
    Call {
        name: String,
        #[serde(default)]
        args: Vec<Expression>,
    },
    Return(Option<Expression>),
    Goto(String),
    Target(String),
    Escape(Option<String>),
    Repeat(Option<String>),
    Empty,
}

fn step_of_one() -> Expression {
    Expression::number(1)
}

impl ScopeTree {
    /**
    Converts a program model into a scope tree.  Every identifier, label and
    builtin name is folded to upper case.  Names listed as parameters of a
    procedure mark the matching declarations in the procedure's body as
    parameters.  Declaring the same identifier twice in one scope is an
    error.
     */
    pub fn from_model(model: &ScopeModel) -> ModelResult<ScopeTree> {
        debug!("Building scope tree from program model");
        let mut tree = ScopeTree::new();
        let root = tree.root();
        fill_scope(&mut tree, root, model)?;
        debug!("Finished scope tree: {} scopes", tree.walk(root).len());
        Ok(tree)
    }
}

fn fill_scope(tree: &mut ScopeTree, id: ScopeId, model: &ScopeModel) -> ModelResult<()> {
    for decl in &model.variables {
        let var = declare(tree, id, decl)?;
        tree.get_mut(id)
            .table_mut()
            .add(var)
            .map_err(|e| CompilerError::new(decl.line, e))?;
    }

    for stmt in &model.code {
        let kind = statement_kind(tree, id, &stmt.kind)?;
        tree.get_mut(id).push_statement(Statement {
            line: stmt.line,
            text: stmt.text.clone(),
            kind,
        });
    }
    Ok(())
}

fn declare(tree: &mut ScopeTree, id: ScopeId, decl: &DeclarationModel) -> ModelResult<Variable> {
    let name = fold(&decl.name);
    if !is_identifier(&name) {
        return Err(CompilerError::new(
            decl.line,
            ModelError::InvalidIdentifier(decl.name.clone()),
        ));
    }

    let kind = match &decl.ty {
        TypeModel::Fixed => VarKind::Fixed,
        TypeModel::Bit(w) => VarKind::Bit(*w),
        TypeModel::Character => VarKind::Character,
        TypeModel::Based(BasedModel::Element(s)) => VarKind::Based(BasedTarget::Element(*s)),
        TypeModel::Based(BasedModel::Record(fields)) => {
            VarKind::Based(BasedTarget::Record(record(&name, decl.line, fields)?))
        }
        TypeModel::Procedure(p) => {
            let body = tree.add_scope(id, &name, BlockType::Procedure, None);
            fill_scope(tree, body, &p.scope)?;
            let parameters: Vec<String> = p.parameters.iter().map(|p| fold(p)).collect();
            for param in &parameters {
                match tree.get_mut(body).table_mut().get_mut(param) {
                    Some(v) => v.storage = StorageClass::Parameter,
                    None => {
                        return Err(CompilerError::new(
                            decl.line,
                            ModelError::UndeclaredParameter(name.clone(), param.clone()),
                        ))
                    }
                }
            }
            VarKind::Procedure(Procedure {
                parameters,
                returns: p.returns,
                scope: body,
                calls: 0,
            })
        }
    };

    let mut var = Variable::new(&name, kind);
    var.line = decl.line;
    var.storage = if decl.common {
        StorageClass::Common
    } else {
        StorageClass::NonCommon
    };
    var.top = decl.top;
    var.initial = decl.initial.clone();
    Ok(var)
}

fn record(name: &str, line: u32, fields: &[FieldModel]) -> ModelResult<Record> {
    if fields.is_empty() {
        return Err(CompilerError::new(line, ModelError::EmptyRecord(name.into())));
    }
    let mut shape: Vec<(String, Scalar, Option<u32>)> = vec![];
    for f in fields {
        let field = fold(&f.name);
        if shape.iter().any(|(n, _, _)| *n == field) {
            return Err(CompilerError::new(
                line,
                ModelError::DuplicateField(name.into(), field),
            ));
        }
        shape.push((field, f.ty, f.top));
    }
    Ok(Record::new(shape))
}

fn statement_kind(tree: &mut ScopeTree, id: ScopeId, kind: &KindModel) -> ModelResult<StatementKind> {
    let block = |tree: &mut ScopeTree, model: &ScopeModel, ty: BlockType| -> ModelResult<ScopeId> {
        let label = model.label.as_deref().map(fold);
        let block = tree.add_scope(id, "", ty, label);
        fill_scope(tree, block, model)?;
        Ok(block)
    };

    Ok(match kind {
        KindModel::Assign { lhs, rhs } => StatementKind::Assign {
            lhs: lhs.iter().map(folded).collect(),
            rhs: folded(rhs),
        },
        KindModel::For {
            index,
            from,
            to,
            by,
            block: body,
        } => StatementKind::For {
            index: folded(index),
            from: folded(from),
            to: folded(to),
            by: folded(by),
            block: block(tree, body, BlockType::DoFor)?,
        },
        KindModel::While { cond, block: body } => StatementKind::While {
            cond: folded(cond),
            block: block(tree, body, BlockType::DoWhile)?,
        },
        KindModel::Until { cond, block: body } => StatementKind::Until {
            cond: folded(cond),
            block: block(tree, body, BlockType::DoUntil)?,
        },
        KindModel::Block(body) => StatementKind::Block(block(tree, body, BlockType::DoBlock)?),
        KindModel::If(cond) => StatementKind::If(folded(cond)),
        KindModel::Else => StatementKind::Else,
        KindModel::Case {
            selector,
            block: body,
        } => StatementKind::Case {
            selector: folded(selector),
            block: block(tree, body, BlockType::DoCase)?,
        },
        KindModel::Call { name, args } => StatementKind::Call {
            name: fold(name),
            args: args.iter().map(folded).collect(),
        },
        KindModel::Return(value) => StatementKind::Return(value.as_ref().map(folded)),
        KindModel::Goto(label) => StatementKind::Goto(fold(label)),
        KindModel::Target(label) => StatementKind::Target(fold(label)),
        KindModel::Escape(label) => StatementKind::Escape(label.as_deref().map(fold)),
        KindModel::Repeat(label) => StatementKind::Repeat(label.as_deref().map(fold)),
        KindModel::Empty => StatementKind::Empty,
    })
}

fn fold(name: &str) -> String {
    name.to_uppercase()
}

fn folded(expr: &Expression) -> Expression {
    let mut expr = expr.clone();
    expr.fold_case();
    expr
}
