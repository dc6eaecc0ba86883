use serde::{Deserialize, Serialize};
use std::fmt;

use super::field::Field;
use crate::error::{ConfigIssue, ConfigurationError};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum MeasureKind {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
}

impl MeasureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureKind::Count => "count",
            MeasureKind::CountDistinct => "countDistinct",
            MeasureKind::Sum => "sum",
            MeasureKind::Avg => "avg",
            MeasureKind::Min => "min",
            MeasureKind::Max => "max",
        }
    }

    /// Only a plain count can be computed without a field expression.
    pub fn requires_field(&self) -> bool {
        !matches!(self, MeasureKind::Count)
    }

    /// Whether partial results of this aggregation can be aggregated again
    /// (e.g. summing per-month counts into a yearly count).
    pub fn is_additive(&self) -> bool {
        matches!(
            self,
            MeasureKind::Count | MeasureKind::Sum | MeasureKind::Min | MeasureKind::Max
        )
    }
}

impl fmt::Display for MeasureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named aggregation over an optional field expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measure {
    cube: String,
    name: String,
    kind: MeasureKind,
    field: Option<Field>,
    drill_members: Vec<String>,
    title: Option<String>,
    description: Option<String>,
}

impl Measure {
    pub fn new(
        cube: impl Into<String>,
        name: impl Into<String>,
        kind: MeasureKind,
        field: Option<Field>,
    ) -> Self {
        Self {
            cube: cube.into(),
            name: name.into(),
            kind,
            field,
            drill_members: Vec::new(),
            title: None,
            description: None,
        }
    }

    pub fn with_drill_members(mut self, drill_members: Vec<String>) -> Self {
        self.drill_members = drill_members;
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

    pub fn cube(&self) -> &str {
        &self.cube
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MeasureKind {
        self.kind
    }

    pub fn field(&self) -> Option<&Field> {
        self.field.as_ref()
    }

    pub fn drill_members(&self) -> &[String] {
        &self.drill_members
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_additive(&self) -> bool {
        self.kind.is_additive()
    }

    /// Returns the SQL aggregation wrapping this measure's field expression.
    ///
    /// `count` without a field resolves to `COUNT(*)`. Every other kind needs
    /// a field and fails with a [`ConfigurationError`] when it is absent.
    pub fn resolve(&self) -> Result<String, ConfigurationError> {
        match (&self.field, self.kind) {
            (None, MeasureKind::Count) => Ok("COUNT(*)".to_string()),
            (None, kind) => Err(ConfigurationError::single(
                ConfigIssue::MissingFieldExpression {
                    cube: self.cube.clone(),
                    measure: self.name.clone(),
                    kind: kind.to_string(),
                },
            )),
            (Some(field), kind) => Ok(aggregate(kind, field.sql())),
        }
    }

    /// Like [`Measure::resolve`], optionally aliased with the measure name for
    /// use in a select list.
    pub fn render(&self, alias: bool) -> Result<String, ConfigurationError> {
        let sql = self.resolve()?;
        Ok(render_sql(&sql, &self.name, alias))
    }
}

fn aggregate(kind: MeasureKind, sql: &str) -> String {
    match kind {
        MeasureKind::Count => format!("COUNT({})", sql),
        MeasureKind::CountDistinct => format!("COUNT(DISTINCT {})", sql),
        MeasureKind::Sum => format!("SUM({})", sql),
        MeasureKind::Avg => format!("AVG({})", sql),
        MeasureKind::Min => format!("MIN({})", sql),
        MeasureKind::Max => format!("MAX({})", sql),
    }
}

fn render_sql(sql: &str, name: &str, alias: bool) -> String {
    if !alias {
        return sql.to_string();
    }

    if is_plain_identifier(name) {
        format!("{} AS {}", sql, name)
    } else {
        format!("{} AS \"{}\"", sql, name.replace('"', "\"\""))
    }
}

/// Whether `name` keeps its spelling as an unquoted PostgreSQL identifier,
/// which folds to lower case.
pub(crate) fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
