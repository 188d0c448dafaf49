pub mod manifest;
pub mod model;
mod tests;

pub use manifest::Manifest;
pub use model::ScopeModel;
