//! # Package Metadata
//!
//! Turns the function and struct descriptors served by the metadata endpoints
//! into registered block types.
//!
//! Descriptors are validated into [`FunctionBlockSpec`] / [`StructBlockSpec`]
//! first; the generator of each block type is a plain struct holding its spec.

use crate::block::BlockInstance;
use crate::codegen::literal::{is_go_identifier, normalize_quoted_value};
use crate::codegen::{package_short_name, Emitter, Fragment, Order};
use crate::config::SessionConfig;
use crate::error::{GoBlocksError, Result};
use crate::registry::{
    BlockGenerator, BlockRegistry, BlockShape, BlockTypeDescriptor, FieldKind, InputSpec, ToolboxCategory,
};
use serde::{Deserialize, Serialize};

/// Function entry of the `/map` endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionDescriptor {
    pub namespace: String,
    pub name: String,
    /// `name type` pairs separated by commas
    pub params: String,
    pub comment: String,
    pub returns: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Struct entry of the `/map_struct` endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructDescriptor {
    pub namespace: String,
    pub name: String,
    pub fields: Vec<StructField>,
    pub comment: String,
}

pub fn parse_function_descriptors(json: &str) -> Result<Vec<FunctionDescriptor>> {
    Ok(serde_json::from_str(json)?)
}

pub fn parse_struct_descriptors(json: &str) -> Result<Vec<StructDescriptor>> {
    Ok(serde_json::from_str(json)?)
}

/// A typed function parameter or struct field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: String,
}

impl Param {
    /// Slots typed `string` accept quoted text blocks
    pub fn accepts_text(&self) -> bool {
        self.ty.trim() == "string"
    }

    pub fn label(&self) -> String {
        if self.ty.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.ty)
        }
    }
}

/// Split a parameter list on top-level commas. Commas nested in brackets
/// (`func(a, b int)`, `map[K]V`) stay part of the type.
pub fn parse_params(params: &str) -> Vec<Param> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in params.chars() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => pieces.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    pieces.push(current);

    pieces
        .iter()
        .map(|piece| piece.trim())
        .filter(|piece| !piece.is_empty())
        .map(|piece| match piece.split_once(char::is_whitespace) {
            Some((name, ty)) => Param {
                name: name.to_string(),
                ty: ty.trim().to_string(),
            },
            None => Param {
                name: piece.to_string(),
                ty: String::new(),
            },
        })
        .collect()
}

/// Doc comment text without comment markers
pub fn clean_comment(comment: &str) -> String {
    comment
        .lines()
        .map(|line| {
            let line = line.trim();
            let line = line.strip_prefix("//").unwrap_or(line);
            let line = line.strip_prefix("/*").unwrap_or(line);
            let line = line.strip_suffix("*/").unwrap_or(line);
            line.trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn validate_names(namespace: &str, name: &str, params: &[Param]) -> Result<()> {
    let invalid = |reason: String| GoBlocksError::InvalidDescriptor {
        name: format!("{}.{}", namespace, name),
        reason,
    };

    if !is_go_identifier(namespace) {
        return Err(invalid(format!("namespace '{}' is not an identifier", namespace)));
    }
    if !is_go_identifier(name) {
        return Err(invalid(format!("name '{}' is not an identifier", name)));
    }
    for (index, param) in params.iter().enumerate() {
        if !is_go_identifier(&param.name) {
            return Err(invalid(format!("'{}' is not an identifier", param.name)));
        }
        if params[..index].iter().any(|p| p.name == param.name) {
            return Err(invalid(format!("'{}' is declared twice", param.name)));
        }
    }
    Ok(())
}

/// Validated function block definition
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBlockSpec {
    pub namespace: String,
    pub name: String,
    pub params: Vec<Param>,
    pub returns: String,
    pub doc: String,
    pub help_url: String,
    pub colour: u16,
}

impl FunctionBlockSpec {
    pub fn from_descriptor(descriptor: &FunctionDescriptor, help_url: &str, colour: u16) -> Result<Self> {
        let params = parse_params(&descriptor.params);
        validate_names(&descriptor.namespace, &descriptor.name, &params)?;
        Ok(Self {
            namespace: descriptor.namespace.clone(),
            name: descriptor.name.clone(),
            params,
            returns: descriptor.returns.trim().to_string(),
            doc: clean_comment(&descriptor.comment),
            help_url: help_url.to_string(),
            colour,
        })
    }

    pub fn block_type(&self) -> String {
        format!("{}_{}", self.namespace, self.name)
    }

    pub fn descriptor(&self) -> BlockTypeDescriptor {
        let mut descriptor = BlockTypeDescriptor::new(self.block_type(), self.name.clone(), BlockShape::Statement)
            .colour(self.colour)
            .tooltip(self.doc.clone())
            .help_url(self.help_url.clone());
        for param in &self.params {
            descriptor = descriptor.input(InputSpec::value(param.name.clone(), param.label(), param.accepts_text()));
        }
        descriptor
    }
}

/// Emits `ns.Name(arg, ...)`. Empty slots are skipped; with no arguments at
/// all the call target is emitted bare.
#[derive(Debug, Clone)]
pub struct FunctionCallGenerator {
    spec: FunctionBlockSpec,
}

impl FunctionCallGenerator {
    pub fn new(spec: FunctionBlockSpec) -> Self {
        Self { spec }
    }
}

impl BlockGenerator for FunctionCallGenerator {
    fn generate(&self, emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
        let mut args = Vec::new();
        for param in &self.spec.params {
            let value = emitter.value_to_code(block, &param.name, Order::None)?;
            if value.is_empty() {
                continue;
            }
            args.push(normalize_quoted_value(&value));
        }

        let target = format!("{}.{}", self.spec.namespace, self.spec.name);
        let code = if args.is_empty() {
            format!("{}\n", target)
        } else {
            format!("{}({})\n", target, args.join(", "))
        };
        Ok(Fragment::statement(code).uses(self.spec.namespace.clone()))
    }
}

/// Validated struct block definition
#[derive(Debug, Clone, PartialEq)]
pub struct StructBlockSpec {
    pub namespace: String,
    pub name: String,
    pub fields: Vec<Param>,
    pub doc: String,
    pub help_url: String,
    pub colour: u16,
}

impl StructBlockSpec {
    pub fn from_descriptor(descriptor: &StructDescriptor, help_url: &str, colour: u16) -> Result<Self> {
        let fields: Vec<Param> = descriptor
            .fields
            .iter()
            .filter(|field| !field.name.trim().is_empty())
            .map(|field| Param {
                name: field.name.trim().to_string(),
                ty: field.ty.trim().to_string(),
            })
            .collect();
        validate_names(&descriptor.namespace, &descriptor.name, &fields)?;
        Ok(Self {
            namespace: descriptor.namespace.clone(),
            name: descriptor.name.clone(),
            fields,
            doc: clean_comment(&descriptor.comment),
            help_url: help_url.to_string(),
            colour,
        })
    }

    pub fn block_type(&self) -> String {
        format!("{}_{}", self.namespace, self.name)
    }

    pub fn descriptor(&self) -> BlockTypeDescriptor {
        let mut descriptor = BlockTypeDescriptor::new(self.block_type(), self.name.clone(), BlockShape::Value)
            .colour(self.colour)
            .tooltip(self.doc.clone())
            .help_url(self.help_url.clone());
        for field in &self.fields {
            descriptor = descriptor.input(InputSpec::value(field.name.clone(), field.label(), field.accepts_text()));
        }
        descriptor.input(InputSpec::field(
            POINTER_FIELD,
            "Pointer",
            FieldKind::Checkbox { default: true },
        ))
    }
}

/// Checkbox toggling the `&` in front of struct literals
pub const POINTER_FIELD: &str = "pointer";

/// Emits `&ns.Name{field: value, ...}` as a value
#[derive(Debug, Clone)]
pub struct StructLiteralGenerator {
    spec: StructBlockSpec,
}

impl StructLiteralGenerator {
    pub fn new(spec: StructBlockSpec) -> Self {
        Self { spec }
    }
}

impl BlockGenerator for StructLiteralGenerator {
    fn generate(&self, emitter: &mut Emitter<'_>, block: &BlockInstance) -> Result<Fragment> {
        let mut entries = Vec::new();
        for field in &self.spec.fields {
            let value = emitter.value_to_code(block, &field.name, Order::None)?;
            if value.is_empty() {
                continue;
            }
            entries.push(format!("{}: {}", field.name, normalize_quoted_value(&value)));
        }

        let pointer = if block.field_flag_or(POINTER_FIELD, true) { "&" } else { "" };
        let code = format!(
            "{}{}.{}{{{}}}",
            pointer,
            self.spec.namespace,
            self.spec.name,
            entries.join(", ")
        );
        Ok(Fragment::value(code, Order::None).uses(self.spec.namespace.clone()))
    }
}

/// Outcome of loading one descriptor set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Block types registered, in descriptor order
    pub registered: Vec<String>,
    /// Rejected descriptors with the reason
    pub skipped: Vec<String>,
}

impl LoadReport {
    pub fn merge(&mut self, other: LoadReport) {
        self.registered.extend(other.registered);
        self.skipped.extend(other.skipped);
    }
}

/// Registers function blocks for the package at position `index` of the
/// package list and adds its palette category.
pub fn load_function_blocks(
    registry: &mut BlockRegistry,
    import_path: &str,
    index: usize,
    descriptors: &[FunctionDescriptor],
    config: &SessionConfig,
) -> LoadReport {
    let colour = config.function_colour(index);
    let mut report = LoadReport::default();

    for descriptor in descriptors {
        if descriptor.name.trim().is_empty() {
            continue;
        }
        match FunctionBlockSpec::from_descriptor(descriptor, import_path, colour) {
            Ok(spec) => {
                let block_type = spec.block_type();
                registry.record_package_name(import_path, &spec.namespace);
                registry.register(spec.descriptor(), FunctionCallGenerator::new(spec));
                report.registered.push(block_type);
            }
            Err(e) => {
                tracing::warn!("[GOBLOCKS] Skipping function from {}: {}", import_path, e);
                report.skipped.push(e.to_string());
            }
        }
    }

    registry.add_category(ToolboxCategory {
        name: package_short_name(import_path).to_string(),
        colour,
        block_types: report.registered.clone(),
    });
    tracing::info!(
        "[GOBLOCKS] {}: {} function blocks registered, {} skipped",
        import_path,
        report.registered.len(),
        report.skipped.len()
    );
    report
}

/// Struct counterpart of [`load_function_blocks`]; the category is named
/// `<package> types`.
pub fn load_struct_blocks(
    registry: &mut BlockRegistry,
    import_path: &str,
    index: usize,
    descriptors: &[StructDescriptor],
    config: &SessionConfig,
) -> LoadReport {
    let colour = config.struct_colour(index);
    let mut report = LoadReport::default();

    for descriptor in descriptors {
        if descriptor.name.trim().is_empty() {
            continue;
        }
        match StructBlockSpec::from_descriptor(descriptor, import_path, colour) {
            Ok(spec) => {
                let block_type = spec.block_type();
                registry.record_package_name(import_path, &spec.namespace);
                registry.register(spec.descriptor(), StructLiteralGenerator::new(spec));
                report.registered.push(block_type);
            }
            Err(e) => {
                tracing::warn!("[GOBLOCKS] Skipping struct from {}: {}", import_path, e);
                report.skipped.push(e.to_string());
            }
        }
    }

    registry.add_category(ToolboxCategory {
        name: format!("{} types", package_short_name(import_path)),
        colour,
        block_types: report.registered.clone(),
    });
    tracing::info!(
        "[GOBLOCKS] {}: {} struct blocks registered, {} skipped",
        import_path,
        report.registered.len(),
        report.skipped.len()
    );
    report
}
