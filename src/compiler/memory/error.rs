use crate::compiler::CompilerErrorDisplay;

/// Errors found while laying out and initializing simulated memory.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutError {
    TooManyInitializers(String),
    InitializerNotInteger(String, String),
    InitialOnBased(String),
    StringTooLong(usize),
    Unencodable(char),
    BitWidth(String, u32),
    OutOfMemory { cursor: u32, limit: u32 },
    AddressOutOfRange(u32),
    DescriptorMismatch { address: u32, expected: u32, found: u32 },
}

impl CompilerErrorDisplay for LayoutError {
    fn format(&self) -> String {
        match self {
            LayoutError::TooManyInitializers(name) => format!("Too many initializers for {}", name),
            LayoutError::InitializerNotInteger(name, value) => {
                format!("Initializer {} of {} is not an integer", value, name)
            }
            LayoutError::InitialOnBased(name) => {
                format!("BASED variable {} cannot be initialized", name)
            }
            LayoutError::StringTooLong(len) => format!("String initializer is {} characters", len),
            LayoutError::Unencodable(c) => {
                format!("Character {:?} has no EBCDIC encoding", c)
            }
            LayoutError::BitWidth(name, w) => {
                format!("BIT({}) of {} is outside of 1 to 2048", w, name)
            }
            LayoutError::OutOfMemory { cursor, limit } => format!(
                "Memory exhausted: allocated area reaches 0x{:06X} but free limit is 0x{:06X}",
                cursor, limit
            ),
            LayoutError::AddressOutOfRange(address) => {
                format!("Address 0x{:X} is outside of the 24-bit address space", address)
            }
            LayoutError::DescriptorMismatch {
                address,
                expected,
                found,
            } => format!(
                "Descriptor at 0x{:06X} is for {} bytes, but {} bytes are required",
                address, found, expected
            ),
        }
    }
}
