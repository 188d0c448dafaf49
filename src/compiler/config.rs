use std::path::PathBuf;

/// The physical convention used for storing BIT values whose width is not a
/// multiple of 8.  `Packed` leaves the value right justified in its bytes,
/// `Shifted` left justifies it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitPacking {
    Packed,
    Shifted,
}

impl BitPacking {
    pub fn from_number(n: u32) -> Option<BitPacking> {
        match n {
            1 => Some(BitPacking::Packed),
            2 => Some(BitPacking::Shifted),
            _ => None,
        }
    }

    pub fn number(&self) -> u32 {
        match self {
            BitPacking::Packed => 1,
            BitPacking::Shifted => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    /// Plain XPL as documented by McKeeman.
    Standard,
    /// XPL/I, the dialect used for the HAL/S-FC compiler sources.
    Extended,
}

pub const DEFAULT_IDENTIFIER: &str = "XCOM-I";

/// Settings which change what the code generator emits.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorConfig {
    pub bit_packing: BitPacking,
    pub dialect: Dialect,
    pub pfs: bool,
    pub identifier: String,
    pub time_of_generation: u64,
    pub patch_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            bit_packing: BitPacking::Shifted,
            dialect: Dialect::Extended,
            pfs: true,
            identifier: DEFAULT_IDENTIFIER.into(),
            time_of_generation: 0,
            patch_dir: None,
            verbose: false,
        }
    }
}

impl GeneratorConfig {
    pub fn is_standard(&self) -> bool {
        self.dialect == Dialect::Standard
    }
}
