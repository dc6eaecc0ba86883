use serde::{Deserialize, Serialize};
use std::fmt;

use super::field::Field;
use super::Cube;
use crate::error::{ConfigIssue, ConfigurationError};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Time,
    Number,
    String,
    Boolean,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Time => "time",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Boolean => "boolean",
        }
    }

    /// Whether the planner may filter this kind with `<`, `>` and `BETWEEN`.
    /// Every kind supports grouping and equality filters.
    pub fn supports_range_filter(&self) -> bool {
        matches!(self, ValueKind::Time | ValueKind::Number)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
    name: String,
    field: Field,
    kind: ValueKind,
    primary_key: bool,
    title: Option<String>,
    description: Option<String>,
}

/// The raw expression of a dimension plus its kind. Time truncation and
/// other formatting are left to the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionExpr<'a> {
    pub sql: &'a str,
    pub kind: ValueKind,
}

impl Dimension {
    pub fn new(name: impl Into<String>, sql: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            field: Field::tagged(sql, kind),
            kind,
            primary_key: false,
            title: None,
            description: None,
        }
    }

    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn resolve(&self) -> DimensionExpr<'_> {
        DimensionExpr {
            sql: self.field.sql(),
            kind: self.kind(),
        }
    }
}

/// Returns the sole primary-key dimension of `cube`.
///
/// Row identity needs exactly one: zero or several flagged dimensions fail.
pub fn validate_primary_key(cube: &Cube) -> Result<&Dimension, ConfigurationError> {
    let keys: Vec<&Dimension> = cube
        .dimensions()
        .filter(|dimension| dimension.is_primary_key())
        .collect();

    match keys.as_slice() {
        [key] => Ok(key),
        [] => Err(ConfigurationError::single(ConfigIssue::MissingPrimaryKey {
            cube: cube.name().to_string(),
        })),
        _ => Err(ConfigurationError::single(
            ConfigIssue::MultiplePrimaryKeys {
                cube: cube.name().to_string(),
                names: keys.iter().map(|d| d.name().to_string()).collect(),
            },
        )),
    }
}
