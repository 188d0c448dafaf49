/**
 * Compile time simulation of the 24-bit memory that a translated program
 * runs in.
 *
 * The following tasks are performed by this submodule
 * 1. Assign every variable a fixed address, in the COMMON, non-COMMON and
 * character data partitions.
 * 2. Reserve the memory that the runtime library uses to answer monitor
 * calls 13 and 23.
 * 3. Write the initial values of variables into the memory image, storing
 * character data as EBCDIC.
 * 4. Record everything allocated in a memory map, which the runtime library
 * uses for introspection and for reading and writing COMMON.
 */
mod error;
mod image;
mod layout;
mod memory_map;
mod tests;

pub mod ebcdic;

pub use error::LayoutError;
pub use image::{MemoryImage, MAX_STRING, MEMORY_SIZE};
pub use layout::{layout, Layout};
pub use memory_map::{MapDatatype, MapEntry, MapField, MemoryMap};

use super::CompilerError;

pub type LayoutResult<T> = Result<T, CompilerError<LayoutError>>;
