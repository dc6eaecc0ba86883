use serde::Serialize;

use super::dimension::ValueKind;

/// A raw SQL fragment bound to a measure or dimension.
///
/// The expression is never parsed or validated; it is emitted verbatim into
/// generated queries. Dimensions tag their field with the value kind so a
/// planner can pick the right formatting, measure fields carry no tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    sql: String,
    kind: Option<ValueKind>,
}

impl Field {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            kind: None,
        }
    }

    pub fn tagged(sql: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            sql: sql.into(),
            kind: Some(kind),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn kind(&self) -> Option<ValueKind> {
        self.kind
    }
}
