use serde::{Deserialize, Serialize};

/**
The three primitive datatypes which a value can have.  Every expression
resolves to exactly one of these, and every storage cell in simulated memory
holds one of these (CHARACTER cells hold a descriptor which points at the
character data).
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datatype {
    Fixed,
    Bit,
    Character,
}

impl Datatype {
    /// Every datatype, in the order that operator and conversion tables are
    /// searched.
    pub const ALL: [Datatype; 3] = [Datatype::Fixed, Datatype::Bit, Datatype::Character];
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Datatype::Fixed => f.write_str("FIXED"),
            Datatype::Bit => f.write_str("BIT"),
            Datatype::Character => f.write_str("CHARACTER"),
        }
    }
}

/// A declared scalar type: the datatype plus, for BIT, the declared width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    Fixed,
    Bit(u32),
    Character,
}

pub const MAX_BIT_WIDTH: u32 = 2048;

impl Scalar {
    pub fn datatype(&self) -> Datatype {
        match self {
            Scalar::Fixed => Datatype::Fixed,
            Scalar::Bit(_) => Datatype::Bit,
            Scalar::Character => Datatype::Character,
        }
    }

    pub fn bit_width(&self) -> Option<u32> {
        match self {
            Scalar::Bit(w) => Some(*w),
            _ => None,
        }
    }

    /// Number of bytes the value of a BIT(`width`) occupies.  Three byte
    /// values are widened to a full word.
    pub fn bit_bytes(width: u32) -> u32 {
        match (width + 7) / 8 {
            3 => 4,
            n => n,
        }
    }

    /// Distance in bytes between consecutive elements of an array of this
    /// type.  CHARACTER and wide BIT elements are stored as 4 byte
    /// descriptors.
    pub fn stride(&self) -> u32 {
        match self {
            Scalar::Fixed | Scalar::Character => 4,
            Scalar::Bit(w) if *w > 32 => 4,
            Scalar::Bit(w) => Self::bit_bytes(*w),
        }
    }

    /// The C type used for values of this type in generated code.
    pub fn c_type(&self) -> &'static str {
        match self {
            Scalar::Fixed => "int32_t",
            Scalar::Bit(_) => "bit_t *",
            Scalar::Character => "char *",
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Fixed => f.write_str("FIXED"),
            Scalar::Bit(w) => f.write_fmt(format_args!("BIT({})", w)),
            Scalar::Character => f.write_str("CHARACTER"),
        }
    }
}

/// Which partition of simulated memory a variable is allocated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageClass {
    Common,
    NonCommon,
    Parameter,
}

impl StorageClass {
    pub fn is_common(&self) -> bool {
        *self == StorageClass::Common
    }
}
