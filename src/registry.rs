//! # Block Registry
//!
//! Maps block type identifiers to their descriptor and code generator. The
//! registry is owned by a [`Session`](crate::session::Session); nothing in the
//! crate keeps a global one.

use crate::block::BlockInstance;
use crate::codegen::{Emitter, Fragment};
use crate::error::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// How a block connects to its neighbours in the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockShape {
    /// Top-level block producing a declaration
    Root,
    /// Chains with previous/next statements
    Statement,
    /// Plugs into a value input
    Value,
}

/// Editable field widgets
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum FieldKind {
    Text { default: String },
    Number { default: f64 },
    Checkbox { default: bool },
    Dropdown { options: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputKind {
    /// Slot for one value block. `accepts_text` marks slots typed `string`.
    Value { accepts_text: bool },
    /// Slot for a statement sequence
    Statement,
    Field(FieldKind),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSpec {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: InputKind,
}

impl InputSpec {
    pub fn value(name: impl Into<String>, label: impl Into<String>, accepts_text: bool) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: InputKind::Value { accepts_text },
        }
    }

    pub fn statement(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: InputKind::Statement,
        }
    }

    pub fn field(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: InputKind::Field(kind),
        }
    }
}

/// Schema and appearance of a block type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockTypeDescriptor {
    pub id: String,
    pub label: String,
    pub shape: BlockShape,
    pub inputs: Vec<InputSpec>,
    /// Hue in degrees
    pub colour: u16,
    pub tooltip: String,
    pub help_url: String,
}

impl BlockTypeDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>, shape: BlockShape) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            shape,
            inputs: Vec::new(),
            colour: 230,
            tooltip: String::new(),
            help_url: String::new(),
        }
    }

    pub fn input(mut self, input: InputSpec) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn colour(mut self, colour: u16) -> Self {
        self.colour = colour;
        self
    }

    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = tooltip.into();
        self
    }

    pub fn help_url(mut self, help_url: impl Into<String>) -> Self {
        self.help_url = help_url.into();
        self
    }
}

/// Produces the fragment for one block instance. Children are generated
/// through the emitter, so their code is complete before the parent's.
pub trait BlockGenerator: Send + Sync {
    fn generate(&self, emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment>;
}

impl<F> BlockGenerator for F
where
    F: for<'e> Fn(&mut Emitter<'e>, &BlockInstance) -> Result<Fragment> + Send + Sync,
{
    fn generate(&self, emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
        self(emitter, block)
    }
}

pub struct RegisteredBlock {
    pub descriptor: BlockTypeDescriptor,
    pub generator: Arc<dyn BlockGenerator>,
}

impl std::fmt::Debug for RegisteredBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredBlock")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Palette section listing block types in display order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolboxCategory {
    pub name: String,
    pub colour: u16,
    pub block_types: Vec<String>,
}

#[derive(Debug, Default)]
pub struct BlockRegistry {
    blocks: HashMap<String, RegisteredBlock>,
    categories: Vec<ToolboxCategory>,
    /// Import path to the package names its descriptors declare
    package_names: BTreeMap<String, BTreeSet<String>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block type. A previous registration under the same id is
    /// replaced and returned.
    pub fn register(
        &mut self,
        descriptor: BlockTypeDescriptor,
        generator: impl BlockGenerator + 'static,
    ) -> Option<RegisteredBlock> {
        let id = descriptor.id.clone();
        let previous = self.blocks.insert(
            id.clone(),
            RegisteredBlock {
                descriptor,
                generator: Arc::new(generator),
            },
        );
        if previous.is_some() {
            tracing::debug!("[GOBLOCKS] Block type '{}' re-registered, previous definition replaced", id);
        }
        previous
    }

    pub fn lookup(&self, id: &str) -> Option<&RegisteredBlock> {
        self.blocks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Registered block type ids, sorted
    pub fn block_types(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.blocks.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &BlockTypeDescriptor> {
        self.blocks.values().map(|entry| &entry.descriptor)
    }

    /// Add a palette category. A category with the same name is replaced in
    /// place.
    pub fn add_category(&mut self, category: ToolboxCategory) {
        match self.categories.iter_mut().find(|c| c.name == category.name) {
            Some(existing) => *existing = category,
            None => self.categories.push(category),
        }
    }

    pub fn categories(&self) -> &[ToolboxCategory] {
        &self.categories
    }

    /// Record that blocks loaded from `import_path` qualify their calls with
    /// `name`
    pub fn record_package_name(&mut self, import_path: &str, name: &str) {
        self.package_names
            .entry(import_path.trim().to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub fn package_names(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.package_names
    }

    /// Palette as JSON for the host editor
    pub fn toolbox_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.categories)?)
    }
}
