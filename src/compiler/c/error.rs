use crate::compiler::{
    ast::{Datatype, Operator},
    CompilerErrorDisplay,
};

/// Errors found while translating statements and expressions into C.
#[derive(Clone, Debug, PartialEq)]
pub enum CodegenError {
    UnknownIdentifier(String),
    NotAllocated(String),
    NotAProcedure(String),
    ProcedureNotFound(String),
    UnsupportedVariable(String),
    FieldOperands,
    NotBased(String),
    NotARecord(String),
    NoSuchField(String, String),
    ImproperSubscripts(String),
    MultiDimensional(String),
    Conversion { from: Datatype, to: Vec<Datatype> },
    NoPromotion(Operator),
    OperatorArity(Operator, usize),
    TooManyArguments(String),
    UndeclaredParameter(String, String),
    ParameterType(String, String),
    UnknownBuiltin(String),
    BuiltinArguments(String),
    MonitorNumber,
    MonitorFunction(i64),
    RecordWidth(String),
    AddrOperand(String),
    FileArguments,
    UnsupportedTarget(String),
    SubscriptedLoopCounter(String),
    LoopCounter(String),
    LabelNotFound(String),
    NoEnclosingBlock(&'static str),
}

impl CompilerErrorDisplay for CodegenError {
    fn format(&self) -> String {
        match self {
            CodegenError::UnknownIdentifier(name) => format!("Unknown variable {}", name),
            CodegenError::NotAllocated(name) => format!("{} has no address in memory", name),
            CodegenError::NotAProcedure(name) => format!("{} is not a PROCEDURE", name),
            CodegenError::ProcedureNotFound(name) => {
                format!("PROCEDURE {} declaration not found", name)
            }
            CodegenError::UnsupportedVariable(name) => {
                format!("{} cannot be used as a value", name)
            }
            CodegenError::FieldOperands => {
                "Both operands of '.' must be identifiers".into()
            }
            CodegenError::NotBased(name) => {
                format!("Base ({}) of '.' operator is not a BASED variable", name)
            }
            CodegenError::NotARecord(name) => format!("BASED variable {} is not a RECORD", name),
            CodegenError::NoSuchField(base, field) => {
                format!("BASED RECORD variable {} has no {} field", base, field)
            }
            CodegenError::ImproperSubscripts(name) => {
                format!("{} not subscripted properly", name)
            }
            CodegenError::MultiDimensional(name) => {
                format!("Multi-dimensional arrays not allowed: {}", name)
            }
            CodegenError::Conversion { from, to } => format!(
                "Cannot convert type {} to any of [{}]",
                from,
                to.iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            CodegenError::NoPromotion(op) => {
                format!("No possible operand promotions found for operator {}", op)
            }
            CodegenError::OperatorArity(op, n) => {
                format!("Wrong number of operands ({}) for operator {}", n, op)
            }
            CodegenError::TooManyArguments(name) => format!("Too many parameters in {}", name),
            CodegenError::UndeclaredParameter(proc, param) => format!(
                "Parameter {} is not DECLAREd within PROCEDURE {}",
                param, proc
            ),
            CodegenError::ParameterType(proc, param) => format!(
                "Parameter {} of PROCEDURE {} is not FIXED, BIT or CHARACTER",
                param, proc
            ),
            CodegenError::UnknownBuiltin(name) => format!("Builtin {} not supported", name),
            CodegenError::BuiltinArguments(name) => {
                format!("Wrong number of arguments for {}", name)
            }
            CodegenError::MonitorNumber => {
                "MONITOR function number must be a number".into()
            }
            CodegenError::MonitorFunction(n) => {
                format!("MONITOR({}) unimplemented or returns no value", n)
            }
            CodegenError::RecordWidth(name) => {
                format!("{} has no associated record width", name)
            }
            CodegenError::AddrOperand(operand) => format!("Cannot take ADDR of {}", operand),
            CodegenError::FileArguments => "FILE(...) has wrong number of arguments".into(),
            CodegenError::UnsupportedTarget(target) => {
                format!("Cannot assign to {}", target)
            }
            CodegenError::SubscriptedLoopCounter(name) => {
                format!("Subscripted loop variable {} not supported", name)
            }
            CodegenError::LoopCounter(name) => {
                format!("Loop counter {} is not FIXED or BIT(n)", name)
            }
            CodegenError::LabelNotFound(label) => {
                format!("DO ... END block labeled {} not found", label)
            }
            CodegenError::NoEnclosingBlock(stmt) => {
                format!("{} is not within a DO ... END block", stmt)
            }
        }
    }
}
