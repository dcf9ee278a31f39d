//! # Go Code Emitter
//!
//! Walks a block tree child-first and collects the generated fragments. Each
//! fragment carries the set of packages its subtree referenced, which is what
//! entry-point blocks use to decide their imports.

use super::imports::infer_imports;
use crate::block::BlockInstance;
use crate::error::{GoBlocksError, Result};
use crate::registry::BlockRegistry;
use std::collections::BTreeSet;

/// Binding strength of a generated Go expression, tightest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Order {
    Atomic,
    /// Selectors, calls, index expressions
    Member,
    Unary,
    Multiplicative,
    Additive,
    Relational,
    And,
    Or,
    /// Loosest; also used by slots that never need parentheses
    None,
}

impl Order {
    /// Whether an expression of this order needs parentheses when placed in a
    /// slot that requires `outer`.
    pub fn needs_parens(self, outer: Order) -> bool {
        self > outer
    }
}

/// Packages and imports a fragment's subtree depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolUsage {
    /// Package names used as qualifiers (`http` in `http.Get`)
    pub packages: BTreeSet<String>,
    /// Import paths declared explicitly, in declaration order
    pub imports: Vec<String>,
}

impl SymbolUsage {
    pub fn merge(&mut self, other: &SymbolUsage) {
        self.packages.extend(other.packages.iter().cloned());
        for path in &other.imports {
            if !self.imports.contains(path) {
                self.imports.push(path.clone());
            }
        }
    }
}

/// Generated code for one block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub code: String,
    /// Set for value blocks only
    pub order: Option<Order>,
    pub usage: SymbolUsage,
}

impl Fragment {
    pub fn statement(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            order: None,
            usage: SymbolUsage::default(),
        }
    }

    pub fn value(code: impl Into<String>, order: Order) -> Self {
        Self {
            code: code.into(),
            order: Some(order),
            usage: SymbolUsage::default(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn uses(mut self, package: impl Into<String>) -> Self {
        self.usage.packages.insert(package.into());
        self
    }

    pub fn with_import(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !self.usage.imports.contains(&path) {
            self.usage.imports.push(path);
        }
        self
    }

    pub fn is_value(&self) -> bool {
        self.order.is_some()
    }
}

/// Single generation pass over a program. Created per pass, never reused.
pub struct Emitter<'a> {
    registry: &'a BlockRegistry,
    import_candidates: &'a [String],
    indent: &'a str,
    strict: bool,
    frames: Vec<SymbolUsage>,
}

impl<'a> Emitter<'a> {
    pub fn new(registry: &'a BlockRegistry, import_candidates: &'a [String]) -> Self {
        Self {
            registry,
            import_candidates,
            indent: "\t",
            strict: true,
            frames: Vec::new(),
        }
    }

    pub fn with_indent(mut self, indent: &'a str) -> Self {
        self.indent = indent;
        self
    }

    /// Unknown block types produce empty output instead of an error
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn indent(&self) -> &str {
        self.indent
    }

    /// Generate one block. Its children are generated from inside its
    /// generator, so the returned usage covers the whole subtree.
    pub fn generate(&mut self, block: &BlockInstance) -> Result<Fragment> {
        let registry = self.registry;
        let entry = match registry.lookup(&block.block_type) {
            Some(entry) => entry,
            None if self.strict => {
                return Err(GoBlocksError::UnknownBlockType(block.block_type.clone()));
            }
            None => {
                tracing::warn!(
                    "[GOBLOCKS] No generator for block type '{}' (block {}), emitting nothing",
                    block.block_type,
                    block.id
                );
                return Ok(Fragment::empty());
            }
        };

        tracing::debug!("[CODEGEN] Generating block {} ({})", block.id, block.block_type);

        self.frames.push(SymbolUsage::default());
        let result = entry.generator.generate(self, block);
        let children = self.frames.pop().unwrap_or_default();

        let mut fragment = result?;
        fragment.usage.merge(&children);
        if let Some(parent) = self.frames.last_mut() {
            parent.merge(&fragment.usage);
        }
        Ok(fragment)
    }

    /// Code of the value block plugged into `input`, parenthesized when it
    /// binds looser than `outer`. An empty slot yields an empty string.
    pub fn value_to_code(&mut self, block: &BlockInstance, input: &str, outer: Order) -> Result<String> {
        let Some(child) = block.value(input) else {
            return Ok(String::new());
        };

        let fragment = self.generate(child)?;
        if fragment.code.is_empty() {
            return Ok(String::new());
        }

        let order = fragment.order.ok_or_else(|| {
            GoBlocksError::CodeGeneration(format!(
                "Block '{}' ({}) in input '{}' of block '{}' does not produce a value",
                child.id, child.block_type, input, block.id
            ))
        })?;

        if order.needs_parens(outer) {
            Ok(format!("({})", fragment.code))
        } else {
            Ok(fragment.code)
        }
    }

    /// Concatenated code of the statements in `input`, without indentation
    pub fn statement_sequence(&mut self, block: &BlockInstance, input: &str) -> Result<String> {
        let mut code = String::new();
        for child in block.statements(input) {
            let fragment = self.generate(child)?;
            code.push_str(&fragment.code);
        }
        Ok(code)
    }

    /// Statements in `input`, indented one level
    pub fn statement_to_code(&mut self, block: &BlockInstance, input: &str) -> Result<String> {
        let code = self.statement_sequence(block, input)?;
        Ok(prefix_lines(&code, self.indent))
    }

    /// Record a package referenced by the block being generated
    pub fn use_package(&mut self, package: impl Into<String>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.packages.insert(package.into());
        }
    }

    pub fn use_packages<I>(&mut self, packages: I)
    where
        I: IntoIterator<Item = String>,
    {
        for package in packages {
            self.use_package(package);
        }
    }

    /// Packages referenced so far by the block being generated and its
    /// already generated children
    pub fn used_packages(&self) -> BTreeSet<String> {
        self.frames
            .last()
            .map(|frame| frame.packages.clone())
            .unwrap_or_default()
    }

    /// Paths that entry points import on demand instead of by explicit
    /// import blocks
    pub fn is_import_candidate(&self, path: &str) -> bool {
        self.import_candidates.iter().any(|candidate| candidate == path)
    }

    /// Import paths needed by the packages used so far, plus `always`
    pub fn infer_imports(&self, always: &[&str]) -> Vec<String> {
        infer_imports(
            self.import_candidates,
            &self.used_packages(),
            always,
            self.registry.package_names(),
        )
    }
}

/// Indent every non-blank line of `code`
pub fn prefix_lines(code: &str, indent: &str) -> String {
    let mut out = String::with_capacity(code.len());
    for line in code.split_inclusive('\n') {
        if !line.trim().is_empty() {
            out.push_str(indent);
        }
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BlockShape, BlockTypeDescriptor};

    fn echo_value(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
        let _ = emitter;
        Ok(Fragment::value(block.field_text_or("code", ""), Order::Additive).uses("math"))
    }

    fn wrap(emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
        let inner = emitter.value_to_code(block, "X", Order::Unary)?;
        let body = emitter.statement_to_code(block, "body")?;
        Ok(Fragment::statement(format!("-{}\n{}", inner, body)).uses("fmt"))
    }

    fn registry() -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        registry.register(BlockTypeDescriptor::new("sum", "Sum", BlockShape::Value), echo_value);
        registry.register(BlockTypeDescriptor::new("wrap", "Wrap", BlockShape::Statement), wrap);
        registry
    }

    #[test]
    fn test_order_parenthesization() {
        assert!(Order::None.needs_parens(Order::Atomic));
        assert!(!Order::Atomic.needs_parens(Order::Member));
        assert!(!Order::None.needs_parens(Order::None));
        assert!(!Order::Additive.needs_parens(Order::Additive));
    }

    #[test]
    fn test_children_usage_bubbles_up() {
        let registry = registry();
        let candidates = Vec::new();
        let mut emitter = Emitter::new(&registry, &candidates);

        let block = BlockInstance::new("w", "wrap")
            .with_value("X", BlockInstance::new("s", "sum").with_field("code", "a + b"))
            .with_statement("body", BlockInstance::new("w2", "wrap"));

        let fragment = emitter.generate(&block).unwrap();
        assert_eq!(fragment.code, "-(a + b)\n\t-\n");
        let packages: Vec<_> = fragment.usage.packages.iter().map(String::as_str).collect();
        assert_eq!(packages, vec!["fmt", "math"]);
    }

    #[test]
    fn test_unknown_block_strict_and_lenient() {
        let registry = registry();
        let candidates = Vec::new();
        let block = BlockInstance::new("x", "mystery");

        let mut strict = Emitter::new(&registry, &candidates);
        assert!(matches!(
            strict.generate(&block),
            Err(GoBlocksError::UnknownBlockType(t)) if t == "mystery"
        ));

        let mut lenient = Emitter::new(&registry, &candidates).lenient();
        assert_eq!(lenient.generate(&block).unwrap(), Fragment::empty());
    }

    #[test]
    fn test_statement_in_value_slot_is_rejected() {
        let registry = registry();
        let candidates = Vec::new();
        let mut emitter = Emitter::new(&registry, &candidates);
        let block = BlockInstance::new("w", "wrap").with_value("X", BlockInstance::new("w2", "wrap"));
        assert!(matches!(
            emitter.generate(&block),
            Err(GoBlocksError::CodeGeneration(_))
        ));
    }

    #[test]
    fn test_prefix_lines_skips_blank_lines() {
        assert_eq!(prefix_lines("a\n\nb\n", "  "), "  a\n\n  b\n");
        assert_eq!(prefix_lines("", "\t"), "");
    }
}
