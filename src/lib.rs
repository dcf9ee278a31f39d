//! # Go Blocks
//!
//! Compiler for visual block programs: turns a tree of editor blocks into a
//! Go `package main` and packages it as a downloadable archive.
//!
//! Go Blocks provides:
//! - A registry of block types, each paired with a code generator
//! - Built-in scaffolding blocks (entry point, HTTP server, routes, lifecycle hooks)
//! - Block types generated from Go function/struct metadata
//! - Import inference from the packages each block references
//! - Zip export of the generated source
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use goblocks::{BlockInstance, Program, Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::default());
//!
//! let mut program = Program::new();
//! program.add_block(BlockInstance::new("main", "main"));
//! session.set_program(program);
//!
//! let archive = session.export("github.com/me/app")?;
//! archive.write_to("dist")?;
//! # Ok::<(), goblocks::GoBlocksError>(())
//! ```
//!
//! ## Architecture
//!
//! A session goes through these phases:
//!
//! 1. **Registration** - Built-in blocks, then blocks from package metadata
//! 2. **Generation** - Root blocks are generated child-first; fragments carry
//!    the packages their subtree references
//! 3. **Import Inference** - Entry points import the candidates they use
//! 4. **Assembly** - Header, import block and declarations
//! 5. **Export** - The unit is zipped under `cmd/main.go`

pub mod archive;
pub mod block;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod error;
pub mod metadata;
pub mod packages;
pub mod registry;
pub mod remote;
pub mod session;
pub mod storage;

// Re-export the main compilation API
pub use compiler::{compile_program, compile_program_with_candidates, generate_unit, GeneratedUnit};

pub use archive::{package_archive, ExportArchive};
pub use block::{BlockInstance, FieldValue, Position, Program};
pub use codegen::{register_builtin_blocks, Emitter, Fragment, ImportTable, Order};
pub use config::SessionConfig;
pub use error::{GoBlocksError, Result};
pub use metadata::{FunctionDescriptor, LoadReport, StructDescriptor};
pub use packages::PackageList;
pub use registry::{BlockGenerator, BlockRegistry, BlockShape, BlockTypeDescriptor};
pub use remote::{DescriptorSource, HttpDescriptorSource, HttpProgramStorage, ProgramStorage};
pub use session::Session;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
