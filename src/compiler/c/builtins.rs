use log::warn;

use crate::compiler::ast::{Datatype, Expression, Operator, Token};

use super::{
    error::CodegenError,
    expression::ExpressionGenerator,
    types::{self, Code},
};

/// Builtins implemented by a runtime library function of the same name,
/// with the datatype that the function returns.
const RUNTIME: [(&str, Datatype); 20] = [
    ("INPUT", Datatype::Character),
    ("LENGTH", Datatype::Fixed),
    ("SUBSTR", Datatype::Character),
    ("BYTE", Datatype::Fixed),
    ("SHL", Datatype::Fixed),
    ("SHR", Datatype::Fixed),
    ("DATE", Datatype::Fixed),
    ("TIME", Datatype::Fixed),
    ("DATE_OF_GENERATION", Datatype::Fixed),
    ("COREBYTE", Datatype::Fixed),
    ("COREWORD", Datatype::Fixed),
    ("FREEPOINT", Datatype::Fixed),
    ("TIME_OF_GENERATION", Datatype::Fixed),
    ("FREELIMIT", Datatype::Fixed),
    ("FREEBASE", Datatype::Fixed),
    ("ABS", Datatype::Fixed),
    ("STRING", Datatype::Fixed),
    ("STRING_GT", Datatype::Fixed),
    ("COREHALFWORD", Datatype::Fixed),
    ("PARM_FIELD", Datatype::Fixed),
];

/// MONITOR function numbers which return a value.  Every one of them returns
/// a FIXED except 12, which returns a CHARACTER.
const MONITOR_FUNCTIONS: [i64; 15] = [1, 2, 6, 7, 9, 10, 12, 13, 14, 15, 18, 21, 22, 23, 32];

/// The datatype that argument `n` of the runtime function `function` must be
/// converted to, if the function requires any particular one.
fn argument_type(function: &str, n: usize) -> Option<Datatype> {
    match (n, function) {
        (0, "ABS") | (0, "COREBYTE") | (0, "COREWORD") | (0, "SHL") | (0, "SHR")
        | (0, "INPUT") | (0, "STRING") | (0, "COREHALFWORD") => Some(Datatype::Fixed),
        (0, "BYTE") | (0, "BYTE1") | (0, "LENGTH") | (0, "STRING_GT") | (0, "SUBSTR")
        | (0, "SUBSTR2") => Some(Datatype::Character),
        (1, "BYTE") | (1, "BYTE2") | (1, "SHL") | (1, "SHR") | (1, "SUBSTR") | (1, "SUBSTR2") => {
            Some(Datatype::Fixed)
        }
        (1, "STRING_GT") => Some(Datatype::Character),
        (2, "SUBSTR") => Some(Datatype::Fixed),
        _ => None,
    }
}

impl<'a> ExpressionGenerator<'a> {
    pub(super) fn builtin(&self, name: &str, args: &[Expression]) -> Result<Code, CodegenError> {
        match name {
            "RECORD_WIDTH" => self.record_width(args),
            "LINE_COUNT" => Ok(Code::fixed("LINE_COUNT".into())),
            "MONITOR" => self.monitor(args),
            "ADDR" => match args {
                [operand] => Ok(Code::fixed(self.addr(operand)?)),
                _ => Err(CodegenError::BuiltinArguments(name.into())),
            },
            "RECORD_TOP" => Ok(Code::fixed("0".into())),
            _ => match RUNTIME.iter().find(|(n, _)| *n == name) {
                Some((_, returns)) => self.runtime(name, *returns, args),
                None => Err(CodegenError::UnknownBuiltin(name.into())),
            },
        }
    }

    /**
    A call of a runtime library builtin.  Some builtins have variants, which
    the runtime library implements as differently named functions: `INPUT()`
    reads from device 0, `SUBSTR` with two arguments is `SUBSTR2`, `BYTE`
    with one argument is `BYTE1`, and `BYTE` of a BIT is `BYTE2`.
     */
    fn runtime(&self, name: &str, returns: Datatype, args: &[Expression]) -> Result<Code, CodegenError> {
        let mut function = match (name, args.len()) {
            ("SUBSTR", 2) => "SUBSTR2",
            ("BYTE", 1) => "BYTE1",
            _ => name,
        };

        let mut parameters = vec![];
        if name == "INPUT" && args.is_empty() {
            parameters.push("0".to_string());
        }
        for (n, arg) in args.iter().enumerate() {
            let code = self.generate(arg)?;
            if n == 0 && name == "BYTE" && code.ty == Datatype::Bit {
                function = "BYTE2";
            }
            let code = match argument_type(function, n) {
                Some(ty) if ty != code.ty => types::convert(code, &[ty])?,
                _ => code,
            };
            parameters.push(code.text);
        }
        Ok(Code::new(
            returns,
            format!("{}({})", function, parameters.join(", ")),
        ))
    }

    /// `RECORD_WIDTH(b)`: the size of one record of the BASED variable `b`.
    fn record_width(&self, args: &[Expression]) -> Result<Code, CodegenError> {
        let name = match args {
            [arg] => arg
                .get_identifier()
                .ok_or_else(|| CodegenError::BuiltinArguments("RECORD_WIDTH".into()))?,
            _ => return Err(CodegenError::BuiltinArguments("RECORD_WIDTH".into())),
        };
        let var = self.lookup(name)?;
        if !var.is_based() {
            return Err(CodegenError::RecordWidth(name.into()));
        }
        Ok(Code::fixed(var.stride().to_string()))
    }

    /// `MONITOR(n, ...)` as an expression.  The function number must be a
    /// literal, since it selects the runtime function that is called.
    fn monitor(&self, args: &[Expression]) -> Result<Code, CodegenError> {
        let number = match args.first().map(|a| &a.token) {
            Some(Token::Number(n)) => *n,
            _ => return Err(CodegenError::MonitorNumber),
        };
        if !MONITOR_FUNCTIONS.contains(&number) {
            return Err(CodegenError::MonitorFunction(number));
        }
        let returns = if number == 12 {
            Datatype::Character
        } else {
            Datatype::Fixed
        };
        let parameters = args[1..]
            .iter()
            .map(|a| self.generate(a).map(|c| c.text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Code::new(
            returns,
            format!("MONITOR{}({})", number, parameters.join(", ")),
        ))
    }

    /**
    `ADDR(x)`, which the runtime library computes from the names of the
    variables involved, since it needs to tell apart the address of a BASED
    variable's pointer from the address of its data.

    ```text
    ADDR(B)        ADDR("B", 0x80000000, NULL, 0)
    ADDR(B(i))     ADDR("B", i, NULL, 0)
    ADDR(V(i))     ADDR(NULL, 0, "V", i)
    ADDR(B(i).F(j)) ADDR("B", i, "F", j)
    ```
     */
    pub fn addr(&self, operand: &Expression) -> Result<String, CodegenError> {
        match &operand.token {
            Token::Builtin(name) if self.config.is_standard() => {
                warn!("ADDR({}) of a builtin is always 0", name);
                Ok("0".into())
            }
            Token::Identifier(name) => {
                let var = self.lookup(name)?;
                let index = self.addr_subscript(name, &operand.children)?;
                if var.is_based() {
                    Ok(match index {
                        None => format!("ADDR(\"{}\", 0x80000000, NULL, 0)", var.mangled),
                        Some(i) => format!("ADDR(\"{}\", {}, NULL, 0)", var.mangled, i),
                    })
                } else {
                    Ok(format!(
                        "ADDR(NULL, 0, \"{}\", {})",
                        var.mangled,
                        index.unwrap_or_else(|| "0".into())
                    ))
                }
            }
            Token::Operator(Operator::Field) => {
                let (base, field) = match operand.children.as_slice() {
                    [base, field] => (base, field),
                    _ => return Err(CodegenError::FieldOperands),
                };
                let (base_name, field_name) = match (base.get_identifier(), field.get_identifier()) {
                    (Some(b), Some(f)) => (b, f),
                    _ => return Err(CodegenError::FieldOperands),
                };
                let var = self.lookup(base_name)?;
                let i = self.addr_subscript(base_name, &base.children)?;
                let j = self.addr_subscript(field_name, &field.children)?;
                Ok(format!(
                    "ADDR(\"{}\", {}, \"{}\", {})",
                    var.mangled,
                    i.unwrap_or_else(|| "0".into()),
                    field_name,
                    j.unwrap_or_else(|| "0".into())
                ))
            }
            _ => Err(CodegenError::AddrOperand(operand.to_string())),
        }
    }

    fn addr_subscript(&self, name: &str, subscripts: &[Expression]) -> Result<Option<String>, CodegenError> {
        match subscripts {
            [] => Ok(None),
            [index] => Ok(Some(self.generate_as(index, Datatype::Fixed)?.text)),
            _ => Err(CodegenError::ImproperSubscripts(name.into())),
        }
    }

    /// The device and record numbers of a `FILE(device, record)`.
    pub fn file_parameters(&self, file: &Expression) -> Result<(String, String), CodegenError> {
        match file.children.as_slice() {
            [device, record] => Ok((
                self.generate_as(device, Datatype::Fixed)?.text,
                self.generate_as(record, Datatype::Fixed)?.text,
            )),
            _ => Err(CodegenError::FileArguments),
        }
    }
}
