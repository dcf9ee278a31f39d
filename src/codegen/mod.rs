//! # Go Code Generation
//!
//! Go code generation for block programs.

mod go_codegen;
pub mod imports;
pub mod literal;
mod node_handlers;

pub use go_codegen::*;
pub use imports::{infer_imports, package_short_name, ImportTable, STANDARD_IMPORT_CANDIDATES};
pub use node_handlers::{register_builtin_blocks, HTTP_METHODS};
