//! # Visual Program Model
//!
//! The block tree the editor hands to the compiler, and its JSON interchange
//! format. The compiler only ever reads these values.

use crate::error::{GoBlocksError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canvas position of a root block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Scalar value held by an editable block field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Field value as the editor would display it
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Bool(true) => "TRUE".to_string(),
            FieldValue::Bool(false) => "FALSE".to_string(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Render a number the way Go source expects it: whole numbers carry no
/// fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A node of the visual program tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInstance {
    pub id: String,

    #[serde(rename = "type")]
    pub block_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    /// Scalar fields keyed by field name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,

    /// Value inputs, each holding at most one nested value block
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, BlockInstance>,

    /// Statement inputs, each holding an ordered statement sequence
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub statements: BTreeMap<String, Vec<BlockInstance>>,
}

impl BlockInstance {
    pub fn new(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            position: None,
            fields: BTreeMap::new(),
            values: BTreeMap::new(),
            statements: BTreeMap::new(),
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_value(mut self, input: impl Into<String>, block: BlockInstance) -> Self {
        self.values.insert(input.into(), block);
        self
    }

    /// Append a statement to the named statement input
    pub fn with_statement(mut self, input: impl Into<String>, block: BlockInstance) -> Self {
        self.statements.entry(input.into()).or_default().push(block);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Text of a field, failing when the field is absent
    pub fn field_text(&self, name: &str) -> Result<String> {
        self.fields
            .get(name)
            .map(FieldValue::as_text)
            .ok_or_else(|| GoBlocksError::FieldNotFound {
                block: self.id.clone(),
                field: name.to_string(),
            })
    }

    /// Text of a field, falling back to a default when absent
    pub fn field_text_or(&self, name: &str, default: &str) -> String {
        self.fields
            .get(name)
            .map(FieldValue::as_text)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn field_number_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.fields.get(name) {
            None => Ok(default),
            Some(FieldValue::Number(n)) => Ok(*n),
            Some(FieldValue::Text(s)) => s.trim().parse().map_err(|_| GoBlocksError::InvalidField {
                block: self.id.clone(),
                field: name.to_string(),
                reason: format!("'{}' is not a number", s),
            }),
            Some(FieldValue::Bool(_)) => Err(GoBlocksError::InvalidField {
                block: self.id.clone(),
                field: name.to_string(),
                reason: "expected a number, found a checkbox value".to_string(),
            }),
        }
    }

    /// Checkbox fields are stored as booleans or as the editor's
    /// `TRUE`/`FALSE` strings.
    pub fn field_flag_or(&self, name: &str, default: bool) -> bool {
        match self.fields.get(name) {
            None => default,
            Some(FieldValue::Bool(b)) => *b,
            Some(FieldValue::Number(n)) => *n != 0.0,
            Some(FieldValue::Text(s)) => s.eq_ignore_ascii_case("true"),
        }
    }

    pub fn value(&self, input: &str) -> Option<&BlockInstance> {
        self.values.get(input)
    }

    pub fn statements(&self, input: &str) -> &[BlockInstance] {
        self.statements.get(input).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A complete visual program: the editor's root blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub blocks: Vec<BlockInstance>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, block: BlockInstance) {
        self.blocks.push(block);
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| GoBlocksError::MalformedProgram(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Root blocks in generation order: top to bottom, then left to right.
    /// Unpositioned blocks come first and keep their declared order.
    pub fn ordered_roots(&self) -> Vec<&BlockInstance> {
        let mut roots: Vec<&BlockInstance> = self.blocks.iter().collect();
        roots.sort_by(|a, b| match (a.position, b.position) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(pa), Some(pb)) => pa
                .y
                .total_cmp(&pb.y)
                .then_with(|| pa.x.total_cmp(&pb.x)),
        });
        roots
    }
}
