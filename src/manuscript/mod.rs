//! Manuscript tooling: text quality audit and section assembly.

pub mod assemble;
pub mod audit;

pub use assemble::{assemble, discover_sections};
pub use audit::audit_text;
