//! # Program Compiler
//!
//! Main entry points for compiling block programs to Go source.

use crate::block::Program;
use crate::codegen::{Emitter, ImportTable, STANDARD_IMPORT_CANDIDATES};
use crate::config::SessionConfig;
use crate::error::Result;
use crate::registry::BlockRegistry;

pub const GENERATED_HEADER: &str = "// Code generated by goblocks. DO NOT EDIT.";
pub const PACKAGE_CLAUSE: &str = "package main";

/// Imports and body of a generated compilation unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub imports: ImportTable,
    pub body: String,
}

impl GeneratedUnit {
    /// Header, package clause, import block, then the body
    pub fn render(&self, indent: &str) -> String {
        let mut code = String::new();
        code.push_str(GENERATED_HEADER);
        code.push_str("\n\n");
        code.push_str(PACKAGE_CLAUSE);
        code.push_str("\n\n");

        let imports = self.imports.render(indent);
        if !imports.is_empty() {
            code.push_str(&imports);
            code.push('\n');
        }

        code.push_str(&self.body);
        code
    }
}

/// Compile a block program to Go source
///
/// Uses the default configuration and only the standard packages as import
/// candidates.
///
/// # Examples
///
/// ```rust
/// use goblocks::{compile_program, register_builtin_blocks, BlockInstance, BlockRegistry, Program};
///
/// let mut registry = BlockRegistry::new();
/// register_builtin_blocks(&mut registry);
///
/// let mut program = Program::new();
/// program.add_block(
///     BlockInstance::new("main", "main")
///         .with_statement("children", BlockInstance::new("l", "go").with_field("line", "log.Println(\"hi\")")),
/// );
///
/// let code = compile_program(&registry, &program).unwrap();
/// assert!(code.contains("import \"log\""));
/// ```
pub fn compile_program(registry: &BlockRegistry, program: &Program) -> Result<String> {
    let candidates: Vec<String> = STANDARD_IMPORT_CANDIDATES.iter().map(|p| p.to_string()).collect();
    compile_program_with_candidates(registry, &candidates, program, &SessionConfig::default())
}

/// Compile with explicit import candidates and configuration
///
/// # Arguments
///
/// * `registry` - Block types available to the program
/// * `candidates` - Import paths entry points may import on demand
/// * `program` - The block program
/// * `config` - Indentation and unknown-block handling
pub fn compile_program_with_candidates(
    registry: &BlockRegistry,
    candidates: &[String],
    program: &Program,
    config: &SessionConfig,
) -> Result<String> {
    let unit = generate_unit(registry, candidates, program, config)?;
    let code = unit.render(&config.indent);
    tracing::info!("[GOBLOCKS] Code generation complete ({} bytes)", code.len());
    Ok(code)
}

/// Generate every root block and collect the imports they declare
pub fn generate_unit(
    registry: &BlockRegistry,
    candidates: &[String],
    program: &Program,
    config: &SessionConfig,
) -> Result<GeneratedUnit> {
    tracing::info!("[GOBLOCKS] Starting compilation ({} root blocks)", program.blocks.len());

    let mut emitter = Emitter::new(registry, candidates).with_indent(&config.indent);
    if !config.strict_block_types {
        emitter = emitter.lenient();
    }

    let mut imports = ImportTable::new();
    let mut sections = Vec::new();

    for root in program.ordered_roots() {
        let fragment = emitter.generate(root)?;
        imports.extend(fragment.usage.imports.iter().cloned());

        if fragment.code.trim().is_empty() {
            continue;
        }
        let mut code = fragment.code;
        if !code.ends_with('\n') {
            code.push('\n');
        }
        sections.push(code);
    }

    tracing::info!(
        "[GOBLOCKS] {} declarations, {} imports",
        sections.len(),
        imports.len()
    );

    Ok(GeneratedUnit {
        imports,
        body: sections.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockInstance;
    use crate::codegen::register_builtin_blocks;
    use crate::error::GoBlocksError;

    fn builtins() -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        register_builtin_blocks(&mut registry);
        registry
    }

    #[test]
    fn test_empty_program() {
        let code = compile_program(&builtins(), &Program::new()).unwrap();
        assert_eq!(code, "// Code generated by goblocks. DO NOT EDIT.\n\npackage main\n\n");
    }

    #[test]
    fn test_explicit_import_hoisted_above_body() {
        let mut program = Program::new();
        program.add_block(
            BlockInstance::new("m", "main")
                .at(0.0, 0.0)
                .with_statement("children", BlockInstance::new("g", "go").with_field("line", "fmt.Println(\"hi\")")),
        );
        program.add_block(
            BlockInstance::new("r", "require")
                .at(0.0, 300.0)
                .with_value("VALUE", BlockInstance::new("t", "text").with_field("TEXT", "fmt")),
        );

        let code = compile_program(&builtins(), &program).unwrap();
        assert_eq!(
            code,
            "// Code generated by goblocks. DO NOT EDIT.\n\npackage main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n"
        );
    }

    #[test]
    fn test_sections_separated_by_blank_line() {
        let mut program = Program::new();
        program.add_block(BlockInstance::new("a", "go").with_field("line", "var a = 1"));
        program.add_block(BlockInstance::new("b", "go").with_field("line", "var b = 2"));

        let unit = generate_unit(&builtins(), &[], &program, &SessionConfig::default()).unwrap();
        assert_eq!(unit.body, "var a = 1\n\nvar b = 2\n");
        assert!(unit.imports.is_empty());
    }

    #[test]
    fn test_unknown_root_block() {
        let mut program = Program::new();
        program.add_block(BlockInstance::new("x", "fmt_Println"));

        let strict = compile_program(&builtins(), &program);
        assert!(matches!(strict, Err(GoBlocksError::UnknownBlockType(_))));

        let config = SessionConfig {
            strict_block_types: false,
            ..SessionConfig::default()
        };
        let lenient = compile_program_with_candidates(&builtins(), &[], &program, &config).unwrap();
        assert!(lenient.ends_with("package main\n\n"));
    }
}
