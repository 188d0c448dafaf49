#![allow(dead_code)]

pub mod result;

pub mod cli;
pub mod compiler;
pub mod diagnostics;
pub mod io;
pub mod project;

pub use cli::*;
pub use compiler::{translate, Translation, TranslationError};
pub use diagnostics::configure_logging;
pub use io::{get_program_name, read_model, write_files, write_manifest};
pub use project::{Manifest, ScopeModel};
