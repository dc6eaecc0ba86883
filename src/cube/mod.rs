pub mod declaration;
pub mod dimension;
pub mod field;
pub mod measure;
pub mod registry;

pub use declaration::{CubeDeclaration, DimensionDeclaration, MeasureDeclaration};
pub use dimension::{validate_primary_key, Dimension, DimensionExpr, ValueKind};
pub use field::Field;
pub use measure::{Measure, MeasureKind};
pub use registry::{CubeRegistry, RegistrySnapshot, RegistryState};

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ConfigIssue, ConfigurationError, NotFoundError};

/// A logical analytical entity bound to one source relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cube {
    name: String,
    sql: String,
    data_source: String,
    title: Option<String>,
    description: Option<String>,
    measures: BTreeMap<String, Measure>,
    dimensions: BTreeMap<String, Dimension>,
}

impl Cube {
    /// Builds a cube from its declaration, checking every measure and
    /// dimension. All problems are reported together.
    pub fn from_declaration(declaration: CubeDeclaration) -> Result<Self, ConfigurationError> {
        let cube = Self::unchecked(declaration);
        let issues = cube.validate();
        if issues.is_empty() {
            Ok(cube)
        } else {
            Err(ConfigurationError::new(issues))
        }
    }

    pub(crate) fn unchecked(declaration: CubeDeclaration) -> Self {
        let cube_name = declaration.name;

        let measures = declaration
            .measures
            .into_iter()
            .map(|(name, decl)| {
                let field = decl.sql.map(Field::new);
                let measure = Measure::new(&cube_name, &name, decl.kind, field)
                    .with_drill_members(decl.drill_members)
                    .with_title(decl.title)
                    .with_description(decl.description);
                (name, measure)
            })
            .collect();

        let dimensions = declaration
            .dimensions
            .into_iter()
            .map(|(name, decl)| {
                let dimension = Dimension::new(&name, decl.sql, decl.kind)
                    .primary_key(decl.primary_key)
                    .with_title(decl.title)
                    .with_description(decl.description);
                (name, dimension)
            })
            .collect();

        Self {
            name: cube_name,
            sql: declaration.sql,
            data_source: declaration.data_source,
            title: declaration.title,
            description: declaration.description,
            measures,
            dimensions,
        }
    }

    fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.sql.trim().is_empty() {
            issues.push(ConfigIssue::EmptySource {
                cube: self.name.clone(),
            });
        }

        for name in self.measures.keys() {
            if self.dimensions.contains_key(name) {
                issues.push(ConfigIssue::MemberNameCollision {
                    cube: self.name.clone(),
                    name: name.clone(),
                });
            }
        }

        for measure in self.measures.values() {
            if let Err(e) = measure.resolve() {
                issues.extend(e.into_issues());
            }
            for member in measure.drill_members() {
                if !self.dimensions.contains_key(member) {
                    issues.push(ConfigIssue::UnresolvedDrillMember {
                        cube: self.name.clone(),
                        measure: measure.name().to_string(),
                        member: member.clone(),
                    });
                }
            }
        }

        if let Err(e) = validate_primary_key(self) {
            issues.extend(e.into_issues());
        }

        issues
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source relation: a select statement or a table reference.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn measures(&self) -> impl Iterator<Item = &Measure> {
        self.measures.values()
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.values()
    }

    pub fn measure(&self, name: &str) -> Result<&Measure, NotFoundError> {
        self.measures
            .get(name)
            .ok_or_else(|| NotFoundError::Measure {
                cube: self.name.clone(),
                measure: name.to_string(),
            })
    }

    pub fn dimension(&self, name: &str) -> Result<&Dimension, NotFoundError> {
        self.dimensions
            .get(name)
            .ok_or_else(|| NotFoundError::Dimension {
                cube: self.name.clone(),
                dimension: name.to_string(),
            })
    }

    /// The primary-key dimension. Registered cubes always have exactly one.
    pub fn primary_key(&self) -> Option<&Dimension> {
        self.dimensions().find(|d| d.is_primary_key())
    }

    /// Dimensions a measure can be expanded into, in drill-member order.
    pub fn drill_down(&self, measure: &str) -> Result<Vec<&Dimension>, NotFoundError> {
        self.measure(measure)?
            .drill_members()
            .iter()
            .map(|member| self.dimension(member))
            .collect()
    }
}

/// Read access to registered cubes, as consumed by query planners.
pub trait CubeLookup {
    fn lookup(&self, name: &str) -> Result<Arc<Cube>, NotFoundError>;

    /// Registered cubes in registration order.
    fn list_all(&self) -> Vec<Arc<Cube>>;

    fn measure(&self, cube: &str, measure: &str) -> Result<Measure, NotFoundError> {
        self.lookup(cube)?.measure(measure).cloned()
    }

    fn dimension(&self, cube: &str, dimension: &str) -> Result<Dimension, NotFoundError> {
        self.lookup(cube)?.dimension(dimension).cloned()
    }
}

impl<T> CubeLookup for Arc<T>
where
    T: CubeLookup + ?Sized,
{
    fn lookup(&self, name: &str) -> Result<Arc<Cube>, NotFoundError> {
        (**self).lookup(name)
    }

    fn list_all(&self) -> Vec<Arc<Cube>> {
        (**self).list_all()
    }
}


#[cfg(test)]
mod test {
    use super::fixtures::{ml_prediccion_ventas, ventas_historicas};
    use super::*;

    #[test]
    fn builds_valid_cube() {
        let cube = Cube::from_declaration(ventas_historicas()).unwrap();
        assert_eq!(cube.name(), "VentasHistoricas");
        assert_eq!(cube.data_source(), "default");
        assert_eq!(cube.measures().count(), 3);
        assert_eq!(
            cube.measure("totalVentas").unwrap().resolve().unwrap(),
            "SUM(ventas_reales)"
        );
        assert_eq!(cube.primary_key().unwrap().name(), "historicoMes");
    }

    #[test]
    fn sole_primary_key_is_returned() {
        let cube = Cube::from_declaration(ventas_historicas()).unwrap();
        let key = validate_primary_key(&cube).unwrap();
        assert_eq!(key.name(), "historicoMes");
    }

    #[test]
    fn zero_primary_keys_is_an_error() {
        let mut decl = ventas_historicas();
        decl.dimensions
            .get_mut("historicoMes")
            .unwrap()
            .primary_key = false;

        let cube = Cube::unchecked(decl.clone());
        assert_eq!(
            validate_primary_key(&cube).unwrap_err().issues(),
            &[ConfigIssue::MissingPrimaryKey {
                cube: "VentasHistoricas".to_string()
            }]
        );
        assert!(Cube::from_declaration(decl).is_err());
    }

    #[test]
    fn multiple_primary_keys_is_an_error() {
        let mut decl = ml_prediccion_ventas();
        decl.dimensions
            .get_mut("mesSimulado")
            .unwrap()
            .primary_key = true;

        let err = Cube::from_declaration(decl).unwrap_err();
        assert_eq!(
            err.issues(),
            &[ConfigIssue::MultiplePrimaryKeys {
                cube: "MlPrediccionVentas".to_string(),
                names: vec!["id".to_string(), "mesSimulado".to_string()],
            }]
        );
    }

    #[test]
    fn drill_members_resolve_against_own_dimensions() {
        let cube = Cube::from_declaration(ml_prediccion_ventas()).unwrap();
        let drilled: Vec<&str> = cube
            .drill_down("count")
            .unwrap()
            .into_iter()
            .map(|d| d.name())
            .collect();
        assert_eq!(drilled, vec!["modeloVersion", "fechaPrediccion"]);
    }

    #[test]
    fn unresolved_drill_member_is_an_error() {
        let mut decl = ml_prediccion_ventas();
        decl.dimensions.remove("fechaPrediccion");

        let err = Cube::from_declaration(decl).unwrap_err();
        assert_eq!(
            err.issues(),
            &[ConfigIssue::UnresolvedDrillMember {
                cube: "MlPrediccionVentas".to_string(),
                measure: "count".to_string(),
                member: "fechaPrediccion".to_string(),
            }]
        );
    }

    #[test]
    fn all_issues_are_collected() {
        let mut decl = ml_prediccion_ventas();
        decl.sql = "  ".to_string();
        decl.measures.get_mut("totalPrediccion").unwrap().sql = None;
        decl.dimensions.remove("modeloVersion");
        decl.dimensions.get_mut("id").unwrap().primary_key = false;

        let err = Cube::from_declaration(decl).unwrap_err();
        assert_eq!(err.issues().len(), 4);
        assert!(err.issues().contains(&ConfigIssue::EmptySource {
            cube: "MlPrediccionVentas".to_string()
        }));
        assert!(err.issues().contains(&ConfigIssue::MissingFieldExpression {
            cube: "MlPrediccionVentas".to_string(),
            measure: "totalPrediccion".to_string(),
            kind: "sum".to_string(),
        }));
    }

    #[test]
    fn measure_and_dimension_names_must_differ() {
        let mut decl = ventas_historicas();
        let dimension = decl.dimensions["historicoMes"].clone();
        decl.dimensions.insert(
            "count".to_string(),
            DimensionDeclaration {
                primary_key: false,
                ..dimension
            },
        );

        let err = Cube::from_declaration(decl).unwrap_err();
        assert_eq!(
            err.issues(),
            &[ConfigIssue::MemberNameCollision {
                cube: "VentasHistoricas".to_string(),
                name: "count".to_string(),
            }]
        );
    }

    #[test]
    fn unknown_members_are_not_found() {
        let cube = Cube::from_declaration(ventas_historicas()).unwrap();
        assert_eq!(
            cube.measure("margen").unwrap_err(),
            NotFoundError::Measure {
                cube: "VentasHistoricas".to_string(),
                measure: "margen".to_string(),
            }
        );
        assert!(cube.dimension("fechaPrediccion").is_err());
        assert!(cube.drill_down("margen").is_err());
    }
}
