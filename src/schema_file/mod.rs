//! Reading cube declarations from schema files.
//!
//! Two formats are understood: `.js` files holding `cube(...)` calls and
//! `.json` files holding one declaration object or an array of them.

mod error;
mod parser;

pub use error::{ParseError, ParseErrorKind};
pub use parser::{parse_cubes, RawCube, MAX_DEPTH};

use log::{debug, warn};
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::cube::{CubeDeclaration, CubeRegistry};
use crate::error::{ConfigIssue, ConfigurationError, SchemaError};

/// A bare identifier found where a quoted name was expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lint {
    pub cube: String,
    /// Keys leading to the identifier, e.g. `["measures", "count", "drillMembers"]`.
    pub path: Vec<String>,
    pub identifier: String,
    pub line: usize,
    pub column: usize,
}

impl Lint {
    /// The measure name when this lint sits inside its `drillMembers` list.
    pub fn drill_member_of(&self) -> Option<&str> {
        match self.path.as_slice() {
            [measures, measure, drill] if measures == "measures" && drill == "drillMembers" => {
                Some(measure.as_str())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Lint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {}: cube `{}` uses bare identifier `{}`",
            self.line, self.column, self.cube, self.identifier
        )?;
        if !self.path.is_empty() {
            write!(f, " in `{}`", self.path.join("."))?;
        }
        write!(f, ", quote it as a string")
    }
}

/// Declarations read from one or more files, in file order.
#[derive(Debug, Default)]
pub struct LoadedSchema {
    pub declarations: Vec<CubeDeclaration>,
    pub lints: Vec<(String, Lint)>,
}

impl LoadedSchema {
    fn append(&mut self, other: LoadedSchema) {
        self.declarations.extend(other.declarations);
        self.lints.extend(other.lints);
    }

    /// Splits the loaded schema into its declarations and the issues its
    /// lints raise.
    ///
    /// Bare drill members are logged as warnings, or reported as
    /// [`ConfigIssue::BareDrillMember`] when `strict_drill_members` is set.
    pub fn into_declarations(
        self,
        strict_drill_members: bool,
    ) -> (Vec<CubeDeclaration>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        for (path, lint) in &self.lints {
            match lint.drill_member_of() {
                Some(measure) if strict_drill_members => {
                    issues.push(ConfigIssue::BareDrillMember {
                        cube: lint.cube.clone(),
                        measure: measure.to_string(),
                        member: lint.identifier.clone(),
                    });
                }
                _ => warn!("{}: {}", path, lint),
            }
        }
        (self.declarations, issues)
    }

    /// Registers every declaration as one batch. Lint issues and validation
    /// issues are reported together.
    pub fn register_into(
        self,
        registry: &CubeRegistry,
        strict_drill_members: bool,
    ) -> Result<(), ConfigurationError> {
        let (declarations, issues) = self.into_declarations(strict_drill_members);
        registry.register_all_with(declarations, issues)
    }
}

/// Parses cube DSL source. `origin` names the source in error messages.
pub fn parse_str(src: &str, origin: &str) -> Result<LoadedSchema, SchemaError> {
    let raw_cubes = parse_cubes(src).map_err(|source| SchemaError::Parse {
        path: origin.to_string(),
        source,
    })?;

    let mut loaded = LoadedSchema::default();
    for raw in raw_cubes {
        let declaration: CubeDeclaration =
            serde_json::from_value(raw.body).map_err(|source| SchemaError::Json {
                path: format!("{} (cube `{}`, line {})", origin, raw.name, raw.line),
                source,
            })?;
        loaded.declarations.push(declaration);
        loaded
            .lints
            .extend(raw.lints.into_iter().map(|lint| (origin.to_string(), lint)));
    }
    Ok(loaded)
}

/// Parses `.json` source holding one declaration object or an array of them.
pub fn parse_json(src: &str, origin: &str) -> Result<LoadedSchema, SchemaError> {
    let json_error = |source| SchemaError::Json {
        path: origin.to_string(),
        source,
    };

    let declarations = match serde_json::from_str::<Value>(src).map_err(json_error)? {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<CubeDeclaration>, _>>()
            .map_err(json_error)?,
        value => vec![serde_json::from_value(value).map_err(json_error)?],
    };
    Ok(LoadedSchema {
        declarations,
        lints: Vec::new(),
    })
}

/// Reads one schema file, picking the format from its extension.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<LoadedSchema, SchemaError> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: origin.clone(),
        source,
    })?;

    debug!("Parsing schema file {}", origin);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&contents, &origin),
        _ => parse_str(&contents, &origin),
    }
}

/// Reads every `.js` and `.json` file in `dir`, sorted by file name.
pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<LoadedSchema, SchemaError> {
    let dir = dir.as_ref();
    let io_error = |source| SchemaError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_schema = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("js") | Some("json")
        );
        if path.is_file() && is_schema {
            paths.push(path);
        } else {
            debug!("Skipping {}", path.display());
        }
    }
    paths.sort();

    let mut loaded = LoadedSchema::default();
    for path in paths {
        loaded.append(parse_file(&path)?);
    }
    debug!(
        "Loaded {} cube declarations from {}",
        loaded.declarations.len(),
        dir.display()
    );
    Ok(loaded)
}
