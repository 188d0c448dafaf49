use crate::compiler::ast::{Datatype, Operator};

use super::error::CodegenError;

/// A fragment of generated C code which evaluates to a value of type `ty`.
#[derive(Clone, Debug, PartialEq)]
pub struct Code {
    pub ty: Datatype,
    pub text: String,
    /// For a read of a CHARACTER variable, the address of its descriptor.
    pub descriptor: Option<String>,
}

impl Code {
    pub fn new(ty: Datatype, text: String) -> Code {
        Code {
            ty,
            text,
            descriptor: None,
        }
    }

    pub fn fixed(text: String) -> Code {
        Code::new(Datatype::Fixed, text)
    }

    /// A read of the CHARACTER whose descriptor is at `address`.
    pub fn character_at(address: String) -> Code {
        Code {
            ty: Datatype::Character,
            text: format!("getCHARACTER({})", address),
            descriptor: Some(address),
        }
    }
}

/// A conversion between datatypes which the runtime library performs.
#[derive(Clone, Debug, PartialEq)]
pub enum Conversion {
    Identity(Datatype),
    BitToFixed,
    BitToCharacter,
    FixedToBit,
    FixedToCharacter,
    /// Reads the descriptor of a CHARACTER variable as a FIXED.
    DescriptorToFixed(String),
}

impl Conversion {
    pub fn target(&self) -> Datatype {
        match self {
            Conversion::Identity(ty) => *ty,
            Conversion::BitToFixed | Conversion::DescriptorToFixed(_) => Datatype::Fixed,
            Conversion::FixedToBit => Datatype::Bit,
            Conversion::BitToCharacter | Conversion::FixedToCharacter => Datatype::Character,
        }
    }

    /// The C code applying this conversion to `source`.
    pub fn wrap(&self, source: &str) -> String {
        match self {
            Conversion::Identity(_) => source.into(),
            Conversion::BitToFixed => format!("bitToFixed({})", source),
            Conversion::BitToCharacter => format!("fixedToCharacter(bitToFixed({}))", source),
            Conversion::FixedToBit => format!("fixedToBit(32, (int32_t) ({}))", source),
            Conversion::FixedToCharacter => format!("fixedToCharacter({})", source),
            Conversion::DescriptorToFixed(address) => format!("getFIXED({})", address),
        }
    }

    pub fn apply(&self, source: &Code) -> Code {
        Code::new(self.target(), self.wrap(&source.text))
    }
}

/**
Every conversion of a value of type `from` into one of the `allowed` types,
in order of preference: the identity first, then widening to FIXED, then
BIT, then CHARACTER.  A CHARACTER value can only ever stay a CHARACTER here;
see [`convert`] for the one exception.
 */
pub fn conversions(from: Datatype, allowed: &[Datatype]) -> Vec<Conversion> {
    let candidates = match from {
        Datatype::Character => vec![Conversion::Identity(Datatype::Character)],
        Datatype::Bit => vec![
            Conversion::Identity(Datatype::Bit),
            Conversion::BitToFixed,
            Conversion::BitToCharacter,
        ],
        Datatype::Fixed => vec![
            Conversion::Identity(Datatype::Fixed),
            Conversion::FixedToBit,
            Conversion::FixedToCharacter,
        ],
    };
    candidates
        .into_iter()
        .filter(|c| allowed.contains(&c.target()))
        .collect()
}

/**
Converts `source` into the first of the `allowed` types it can reach.  A read
of a CHARACTER variable may become a FIXED: the value is then the variable's
descriptor rather than its text, and this takes priority over keeping it a
CHARACTER.
 */
pub fn convert(source: Code, allowed: &[Datatype]) -> Result<Code, CodegenError> {
    if let (Datatype::Character, Some(address)) = (source.ty, &source.descriptor) {
        if allowed.contains(&Datatype::Fixed) {
            return Ok(Conversion::DescriptorToFixed(address.clone()).apply(&source));
        }
    }

    match conversions(source.ty, allowed).first() {
        Some(Conversion::Identity(_)) => Ok(source),
        Some(c) => Ok(c.apply(&source)),
        None => Err(CodegenError::Conversion {
            from: source.ty,
            to: allowed.to_vec(),
        }),
    }
}

struct OperatorType {
    arity: usize,
    operand: Datatype,
    op: Operator,
    result: Datatype,
    function: &'static str,
}

macro_rules! op {
    ($arity:expr, $operand:ident, $op:ident, $result:ident, $function:expr) => {
        OperatorType {
            arity: $arity,
            operand: Datatype::$operand,
            op: Operator::$op,
            result: Datatype::$result,
            function: $function,
        }
    };
}

/// The runtime library function implementing each operator, by the number
/// and the datatype of its operands.
static OPERATORS: &[OperatorType] = &[
    op!(1, Fixed, Sub, Fixed, "xminus"),
    op!(1, Bit, Not, Bit, "xNOT"),
    op!(2, Fixed, Add, Fixed, "xadd"),
    op!(2, Fixed, Sub, Fixed, "xsubtract"),
    op!(2, Fixed, Mul, Fixed, "xmultiply"),
    op!(2, Fixed, Div, Fixed, "xdivide"),
    op!(2, Fixed, Mod, Fixed, "xmod"),
    op!(2, Fixed, Eq, Bit, "xEQ"),
    op!(2, Fixed, Lt, Bit, "xLT"),
    op!(2, Fixed, Gt, Bit, "xGT"),
    op!(2, Fixed, NotEq, Bit, "xNEQ"),
    op!(2, Fixed, NotLt, Bit, "xGE"),
    op!(2, Fixed, NotGt, Bit, "xLE"),
    op!(2, Fixed, LtEq, Bit, "xLE"),
    op!(2, Fixed, GtEq, Bit, "xGE"),
    op!(2, Bit, Or, Bit, "xOR"),
    op!(2, Bit, And, Bit, "xAND"),
    op!(2, Character, Concat, Character, "xsCAT"),
    op!(2, Character, Eq, Bit, "xsEQ"),
    op!(2, Character, Lt, Bit, "xsLT"),
    op!(2, Character, Gt, Bit, "xsGT"),
    op!(2, Character, NotEq, Bit, "xsNEQ"),
    op!(2, Character, NotLt, Bit, "xsGE"),
    op!(2, Character, NotGt, Bit, "xsLE"),
    op!(2, Character, LtEq, Bit, "xsLE"),
    op!(2, Character, GtEq, Bit, "xsGE"),
];

fn lookup(arity: usize, operand: Datatype, op: Operator) -> Option<&'static OperatorType> {
    OPERATORS
        .iter()
        .find(|o| o.arity == arity && o.operand == operand && o.op == op)
}

/// The operand datatypes that `op` accepts with `arity` operands.
pub fn operand_types(arity: usize, op: Operator) -> Vec<Datatype> {
    Datatype::ALL
        .iter()
        .copied()
        .filter(|ty| lookup(arity, *ty, op).is_some())
        .collect()
}

/**
Resolves a binary operator by searching the conversions of both operands, in
order of preference, for the first pair which reaches the same datatype.
 */
pub fn binary(op: Operator, left: Code, right: Code) -> Result<Code, CodegenError> {
    let allowed = operand_types(2, op);
    let lefts = non_empty(conversions(left.ty, &allowed), left.ty, &allowed)?;
    let rights = non_empty(conversions(right.ty, &allowed), right.ty, &allowed)?;

    for l in &lefts {
        for r in &rights {
            if l.target() == r.target() {
                if let Some(o) = lookup(2, l.target(), op) {
                    return Ok(Code::new(
                        o.result,
                        format!("{}({}, {})", o.function, l.wrap(&left.text), r.wrap(&right.text)),
                    ));
                }
            }
        }
    }
    Err(CodegenError::NoPromotion(op))
}

pub fn unary(op: Operator, operand: Code) -> Result<Code, CodegenError> {
    let allowed = operand_types(1, op);
    let operand = convert(operand, &allowed)?;
    match lookup(1, operand.ty, op) {
        Some(o) => Ok(Code::new(o.result, format!("{}({})", o.function, operand.text))),
        None => Err(CodegenError::NoPromotion(op)),
    }
}

fn non_empty(
    list: Vec<Conversion>,
    from: Datatype,
    allowed: &[Datatype],
) -> Result<Vec<Conversion>, CodegenError> {
    if list.is_empty() {
        Err(CodegenError::Conversion {
            from,
            to: allowed.to_vec(),
        })
    } else {
        Ok(list)
    }
}
