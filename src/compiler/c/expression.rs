use crate::compiler::{
    ast::{Datatype, Expression, Operator, Scalar, Token},
    config::GeneratorConfig,
    semantics::symbol_table::{Field, Procedure, ScopeId, ScopeTree, Variable},
};

use super::{
    error::CodegenError,
    types::{self, Code},
};

/// The pieces of a call to a PROCEDURE: the stores of the arguments into
/// the parameters' addresses, then the call of the generated function.
pub struct Call {
    pub stores: Vec<String>,
    pub function: String,
    pub returns: Scalar,
}

/**
Translates expressions, as seen from one scope, into C expressions over the
runtime library.  Every variable is accessed through its fixed address in
simulated memory, so the generated code never refers to the variables by
name.
 */
pub struct ExpressionGenerator<'a> {
    pub(super) tree: &'a ScopeTree,
    pub(super) scope: ScopeId,
    pub(super) config: &'a GeneratorConfig,
}

impl<'a> ExpressionGenerator<'a> {
    pub fn new(
        tree: &'a ScopeTree,
        scope: ScopeId,
        config: &'a GeneratorConfig,
    ) -> ExpressionGenerator<'a> {
        ExpressionGenerator {
            tree,
            scope,
            config,
        }
    }

    pub fn generate(&self, expr: &Expression) -> Result<Code, CodegenError> {
        match &expr.token {
            Token::Number(n) => Ok(Code::fixed(n.to_string())),
            Token::String(s) => Ok(Code::new(Datatype::Character, quote(s))),
            Token::Operator(Operator::Field) => {
                let (ty, address) = self.field_address(expr)?;
                Ok(read(ty, address))
            }
            Token::Operator(op) => match expr.children.as_slice() {
                [operand] => types::unary(*op, self.generate(operand)?),
                [left, right] => {
                    types::binary(*op, self.generate(left)?, self.generate(right)?)
                }
                children => Err(CodegenError::OperatorArity(*op, children.len())),
            },
            Token::Identifier(name) => self.identifier(name, &expr.children),
            Token::Builtin(name) => self.builtin(name, &expr.children),
        }
    }

    /**
    Like [`generate`](Self::generate), except that a bare identifier which is
    not declared anywhere in scope yields `None`, so that the caller may fall
    back on some other interpretation of it.  Every other failure is still
    an error.
     */
    pub fn generate_or_unknown(&self, expr: &Expression) -> Result<Option<Code>, CodegenError> {
        match expr.get_identifier() {
            Some(name) if expr.children.is_empty() && self.tree.lookup(self.scope, name).is_none() => {
                Ok(None)
            }
            _ => self.generate(expr).map(Some),
        }
    }

    /// Generates `expr` converted to `ty`.
    pub fn generate_as(&self, expr: &Expression, ty: Datatype) -> Result<Code, CodegenError> {
        types::convert(self.generate(expr)?, &[ty])
    }

    pub fn lookup(&self, name: &str) -> Result<&'a Variable, CodegenError> {
        self.tree
            .lookup(self.scope, name)
            .ok_or_else(|| CodegenError::UnknownIdentifier(name.into()))
    }

    /// The address of the storage that a variable refers to: its own address,
    /// or for a BASED variable the address held in its pointer.
    pub fn base_address(&self, var: &Variable) -> Result<String, CodegenError> {
        let address = var
            .address
            .ok_or_else(|| CodegenError::NotAllocated(var.name.clone()))?;
        Ok(if var.is_based() {
            format!("getFIXED({})", address)
        } else {
            address.to_string()
        })
    }

    /// The single subscript of `name`, if any, converted to FIXED.
    pub fn subscript(
        &self,
        name: &str,
        subscripts: &[Expression],
    ) -> Result<Option<String>, CodegenError> {
        match subscripts {
            [] => Ok(None),
            [index] => Ok(Some(self.generate_as(index, Datatype::Fixed)?.text)),
            _ => Err(CodegenError::MultiDimensional(name.into())),
        }
    }

    /// The scalar type of a variable's elements and the address of the
    /// element selected by `subscripts`.
    pub fn element_address(
        &self,
        name: &str,
        subscripts: &[Expression],
    ) -> Result<(Scalar, String, Option<String>), CodegenError> {
        let var = self.lookup(name)?;
        let ty = var
            .element()
            .ok_or_else(|| CodegenError::UnsupportedVariable(name.into()))?;
        let base = self.base_address(var)?;
        let index = self.subscript(name, subscripts)?;
        Ok((ty, base, index.map(|i| format!("{}*{}", var.stride(), i))))
    }

    fn identifier(&self, name: &str, children: &[Expression]) -> Result<Code, CodegenError> {
        let var = self.lookup(name)?;
        if let Some(proc) = var.get_procedure() {
            let call = self.call(var, proc, children)?;
            let text = if call.stores.is_empty() {
                format!("{}()", call.function)
            } else {
                format!("( {}, {}() )", call.stores.join(", "), call.function)
            };
            return Ok(Code::new(call.returns.datatype(), text));
        }

        let (ty, base, offset) = self.element_address(name, children)?;
        let address = match offset {
            Some(offset) => format!("{} + {}", base, offset),
            None => base,
        };
        Ok(read(ty, address))
    }

    /**
    Lowers a call of `var`, the declaration of a PROCEDURE, with the actual
    arguments `args`.  Parameters are not passed on a stack; each argument is
    converted to the type of the matching parameter and stored at the
    parameter's address before the call.
     */
    pub fn call(
        &self,
        var: &Variable,
        proc: &Procedure,
        args: &[Expression],
    ) -> Result<Call, CodegenError> {
        if args.len() > proc.parameters.len() {
            return Err(CodegenError::TooManyArguments(var.name.clone()));
        }
        let body = self.tree.get(proc.scope).table();
        let mut stores = vec![];
        for (arg, param) in args.iter().zip(&proc.parameters) {
            let formal = body
                .get(param)
                .ok_or_else(|| CodegenError::UndeclaredParameter(var.name.clone(), param.clone()))?;
            let ty = formal
                .scalar()
                .ok_or_else(|| CodegenError::ParameterType(var.name.clone(), param.clone()))?;
            let address = formal
                .address
                .ok_or_else(|| CodegenError::NotAllocated(formal.name.clone()))?;
            let value = self.generate_as(arg, ty.datatype())?;
            stores.push(write(ty, &address.to_string(), &value.text));
        }
        Ok(Call {
            stores,
            function: var.mangled.clone(),
            returns: proc.return_type(),
        })
    }

    /**
    The field selected by a `base(i).field(j)` expression and the address of
    the selected element:

    ```text
    getFIXED(base) + recordSize * (i) + offset + stride * (j)
    ```
     */
    pub fn field_address(&self, expr: &Expression) -> Result<(Scalar, String), CodegenError> {
        let (base, field) = match expr.children.as_slice() {
            [base, field] => (base, field),
            _ => return Err(CodegenError::FieldOperands),
        };
        let (base_name, field_name) = match (base.get_identifier(), field.get_identifier()) {
            (Some(b), Some(f)) => (b, f),
            _ => return Err(CodegenError::FieldOperands),
        };

        let var = self.lookup(base_name)?;
        if !var.is_based() {
            return Err(CodegenError::NotBased(base_name.into()));
        }
        let record = var
            .get_record()
            .ok_or_else(|| CodegenError::NotARecord(base_name.into()))?;
        let f: &Field = record
            .get(field_name)
            .ok_or_else(|| CodegenError::NoSuchField(base_name.into(), field_name.into()))?;

        let i = self.field_subscript(base_name, &base.children)?;
        let j = self.field_subscript(&format!("{}.{}", base_name, field_name), &field.children)?;
        let address = format!(
            "{} + {} * ({}) + {} + {} * ({})",
            self.base_address(var)?,
            record.size(),
            i,
            f.offset,
            f.stride(),
            j
        );
        Ok((f.ty, address))
    }

    fn field_subscript(&self, name: &str, subscripts: &[Expression]) -> Result<String, CodegenError> {
        match subscripts {
            [] => Ok("0".into()),
            [index] => Ok(self.generate_as(index, Datatype::Fixed)?.text),
            _ => Err(CodegenError::ImproperSubscripts(name.into())),
        }
    }

    /// The address of the element that `expr` names, as computed by the
    /// runtime's `ADDR`.  An unsubscripted identifier means its element 0.
    pub fn element_addr(&self, expr: &Expression) -> Result<String, CodegenError> {
        let mut operand = expr.clone();
        if operand.get_identifier().is_some() && operand.children.is_empty() {
            operand.children.push(Expression::number(0));
        }
        Ok(self.generate(&Expression::builtin("ADDR", vec![operand]))?.text)
    }
}

/// The C read of a value of type `ty` stored at `address`.
pub fn read(ty: Scalar, address: String) -> Code {
    match ty {
        Scalar::Fixed => Code::fixed(format!("getFIXED({})", address)),
        Scalar::Bit(w) => Code::new(Datatype::Bit, format!("getBIT({}, {})", w, address)),
        Scalar::Character => Code::character_at(address),
    }
}

/// The C store of `value` into a value of type `ty` at `address`.
pub fn write(ty: Scalar, address: &str, value: &str) -> String {
    match ty {
        Scalar::Fixed => format!("putFIXED({}, {})", address, value),
        Scalar::Bit(w) => format!("putBIT({}, {}, {})", w, address, value),
        Scalar::Character => format!("putCHARACTER({}, {})", address, value),
    }
}

/// A C string literal holding `text`.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
