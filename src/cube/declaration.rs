use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::dimension::ValueKind;
use super::measure::MeasureKind;

pub const DEFAULT_DATA_SOURCE: &str = "default";

/// Static declaration of a cube, as read from a schema file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CubeDeclaration {
    pub name: String,
    pub sql: String,
    #[serde(default = "default_data_source")]
    pub data_source: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub measures: BTreeMap<String, MeasureDeclaration>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, DimensionDeclaration>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MeasureDeclaration {
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(rename = "type")]
    pub kind: MeasureKind,
    #[serde(default)]
    pub drill_members: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DimensionDeclaration {
    pub sql: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_data_source() -> String {
    DEFAULT_DATA_SOURCE.to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deserializes_camel_case_keys_and_defaults() {
        let json = r#"
        {
            "name": "MlPrediccionVentas",
            "sql": "SELECT * FROM public.ml_prediccion_ventas",
            "measures": {
                "count": { "type": "count", "drillMembers": ["modeloVersion"] },
                "totalPrediccion": { "sql": "prediccion_ventas", "type": "sum" }
            },
            "dimensions": {
                "modeloVersion": { "sql": "modelo_version", "type": "string" },
                "id": { "sql": "mes_simulado", "type": "number", "primaryKey": true }
            }
        }
        "#;

        let decl: CubeDeclaration = serde_json::from_str(json).unwrap();
        assert_eq!(decl.data_source, DEFAULT_DATA_SOURCE);
        assert_eq!(decl.measures["count"].sql, None);
        assert_eq!(decl.measures["count"].drill_members, vec!["modeloVersion"]);
        assert_eq!(decl.measures["totalPrediccion"].kind, MeasureKind::Sum);
        assert!(decl.dimensions["id"].primary_key);
        assert!(!decl.dimensions["modeloVersion"].primary_key);
    }

    #[test]
    fn rejects_unknown_measure_type() {
        let json = r#"{ "name": "C", "sql": "t", "measures": { "m": { "type": "median" } } }"#;
        assert!(serde_json::from_str::<CubeDeclaration>(json).is_err());
    }

    #[test]
    fn rejects_unknown_keys() {
        let json = r#"{ "name": "C", "sql": "t", "preAggregations": {} }"#;
        assert!(serde_json::from_str::<CubeDeclaration>(json).is_err());
    }
}
