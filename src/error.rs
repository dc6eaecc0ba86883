use std::fmt;
use thiserror::Error;

use crate::schema_file::ParseError;

/// A single problem found while validating a cube declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    #[error("cube `{cube}`: measure `{measure}` of type `{kind}` requires a sql expression")]
    MissingFieldExpression {
        cube: String,
        measure: String,
        kind: String,
    },

    #[error("cube `{name}` is already registered")]
    DuplicateCube { name: String },

    #[error("cube `{cube}`: measure `{measure}` drills into unknown dimension `{member}`")]
    UnresolvedDrillMember {
        cube: String,
        measure: String,
        member: String,
    },

    #[error("cube `{cube}`: measure `{measure}` references drill member `{member}` as a bare identifier")]
    BareDrillMember {
        cube: String,
        measure: String,
        member: String,
    },

    #[error("cube `{cube}` has no primary key dimension")]
    MissingPrimaryKey { cube: String },

    #[error("cube `{cube}` has more than one primary key dimension: {}", .names.join(", "))]
    MultiplePrimaryKeys { cube: String, names: Vec<String> },

    #[error("cube `{cube}`: `{name}` is declared as both a measure and a dimension")]
    MemberNameCollision { cube: String, name: String },

    #[error("cube `{cube}` has an empty sql source")]
    EmptySource { cube: String },
}

/// Malformed or inconsistent schema. Carries every issue found in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    issues: Vec<ConfigIssue>,
}

impl ConfigurationError {
    pub fn new(issues: Vec<ConfigIssue>) -> Self {
        Self { issues }
    }

    pub fn single(issue: ConfigIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }

    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<ConfigIssue> {
        self.issues
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cube schema ({} issue", self.issues.len())?;
        if self.issues.len() != 1 {
            write!(f, "s")?;
        }
        write!(f, ")")?;
        for issue in &self.issues {
            write!(f, "\n  - {}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigurationError {}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("cube `{0}` not found")]
    Cube(String),

    #[error("measure `{measure}` not found in cube `{cube}`")]
    Measure { cube: String, measure: String },

    #[error("dimension `{dimension}` not found in cube `{cube}`")]
    Dimension { cube: String, dimension: String },
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("Invalid JSON declaration in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn configuration_error_lists_every_issue() {
        let err = ConfigurationError::new(vec![
            ConfigIssue::DuplicateCube {
                name: "VentasHistoricas".to_string(),
            },
            ConfigIssue::MissingPrimaryKey {
                cube: "MlPrediccionVentas".to_string(),
            },
        ]);

        let message = err.to_string();
        assert!(message.starts_with("invalid cube schema (2 issues)"));
        assert!(message.contains("cube `VentasHistoricas` is already registered"));
        assert!(message.contains("cube `MlPrediccionVentas` has no primary key dimension"));
    }

    #[test]
    fn multiple_primary_keys_names_all_dimensions() {
        let issue = ConfigIssue::MultiplePrimaryKeys {
            cube: "Ventas".to_string(),
            names: vec!["id".to_string(), "mes".to_string()],
        };
        assert_eq!(
            issue.to_string(),
            "cube `Ventas` has more than one primary key dimension: id, mes"
        );
    }
}
