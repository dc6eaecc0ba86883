use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{Cube, CubeDeclaration, CubeLookup};
use crate::error::{ConfigIssue, ConfigurationError, NotFoundError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    #[default]
    Unloaded,
    Loaded,
}

/// An immutable view of the registered cubes.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    cubes: Vec<Arc<Cube>>,
    index: HashMap<String, usize>,
    state: RegistryState,
}

impl RegistrySnapshot {
    pub fn state(&self) -> RegistryState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.cubes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }

    /// Validates `declarations` on top of `self` and returns the combined
    /// snapshot, or every issue found across the batch after `issues`.
    fn with_declarations(
        &self,
        declarations: Vec<CubeDeclaration>,
        mut issues: Vec<ConfigIssue>,
    ) -> Result<Self, ConfigurationError> {
        let mut cubes = self.cubes.clone();
        let mut index = self.index.clone();

        for declaration in declarations {
            let name = declaration.name.clone();
            if index.contains_key(&name) {
                issues.push(ConfigIssue::DuplicateCube { name });
                continue;
            }

            match Cube::from_declaration(declaration) {
                Ok(cube) => {
                    debug!(
                        "Validated cube {} ({} measures, {} dimensions)",
                        name,
                        cube.measures().count(),
                        cube.dimensions().count()
                    );
                    index.insert(name, cubes.len());
                    cubes.push(Arc::new(cube));
                }
                Err(e) => {
                    // Keep the name reserved so a later duplicate is still reported.
                    index.insert(name, usize::MAX);
                    issues.extend(e.into_issues());
                }
            }
        }

        if issues.is_empty() {
            Ok(Self {
                cubes,
                index,
                state: RegistryState::Loaded,
            })
        } else {
            Err(ConfigurationError::new(issues))
        }
    }
}

impl CubeLookup for RegistrySnapshot {
    fn lookup(&self, name: &str) -> Result<Arc<Cube>, NotFoundError> {
        self.index
            .get(name)
            .and_then(|&i| self.cubes.get(i))
            .cloned()
            .ok_or_else(|| NotFoundError::Cube(name.to_string()))
    }

    fn list_all(&self) -> Vec<Arc<Cube>> {
        self.cubes.clone()
    }
}

/// Process-wide set of cubes.
///
/// Writers validate a whole batch into a new snapshot and swap it in, so
/// readers either see the previous set or the complete new one. The state
/// lives in the snapshot and swaps with it.
#[derive(Debug)]
pub struct CubeRegistry {
    snapshot: RwLock<Arc<RegistrySnapshot>>,
}

impl CubeRegistry {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(RegistrySnapshot::default())),
        }
    }

    pub fn state(&self) -> RegistryState {
        self.snapshot().state()
    }

    /// The current snapshot. Holding it requires no further locking.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn register(&self, declaration: CubeDeclaration) -> Result<(), ConfigurationError> {
        self.register_all(vec![declaration])
    }

    /// Registers a batch atomically: either every cube becomes visible or the
    /// registry is left untouched.
    pub fn register_all(
        &self,
        declarations: Vec<CubeDeclaration>,
    ) -> Result<(), ConfigurationError> {
        self.register_all_with(declarations, Vec::new())
    }

    /// Like [`CubeRegistry::register_all`], failing with `issues` found
    /// earlier (e.g. while reading schema files) in front of the validation
    /// issues of the batch.
    pub fn register_all_with(
        &self,
        declarations: Vec<CubeDeclaration>,
        issues: Vec<ConfigIssue>,
    ) -> Result<(), ConfigurationError> {
        let mut current = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        let next = current.with_declarations(declarations, issues)?;
        info!("Registered {} cubes", next.len() - current.len());
        *current = Arc::new(next);
        Ok(())
    }

    /// Replaces the whole cube set. On failure the previous set stays visible.
    pub fn reload(&self, declarations: Vec<CubeDeclaration>) -> Result<(), ConfigurationError> {
        let next = RegistrySnapshot::default().with_declarations(declarations, Vec::new())?;

        let mut current = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        info!("Reloaded registry with {} cubes", next.len());
        *current = Arc::new(next);
        Ok(())
    }
}

impl Default for CubeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CubeLookup for CubeRegistry {
    fn lookup(&self, name: &str) -> Result<Arc<Cube>, NotFoundError> {
        self.snapshot().lookup(name)
    }

    fn list_all(&self) -> Vec<Arc<Cube>> {
        self.snapshot().list_all()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cube::fixtures::{ml_prediccion_ventas, ventas_historicas};
    use rstest::*;
    use std::thread;

    #[fixture]
    fn registry() -> CubeRegistry {
        let registry = CubeRegistry::new();
        registry
            .register_all(vec![ventas_historicas(), ml_prediccion_ventas()])
            .unwrap();
        registry
    }

    #[test]
    fn starts_unloaded_and_empty() {
        let registry = CubeRegistry::new();
        assert_eq!(registry.state(), RegistryState::Unloaded);
        assert!(registry.list_all().is_empty());
    }

    #[rstest]
    fn lists_in_registration_order(registry: CubeRegistry) {
        assert_eq!(registry.state(), RegistryState::Loaded);
        let names: Vec<String> = registry
            .list_all()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["VentasHistoricas", "MlPrediccionVentas"]);

        // Listing again yields the same sequence.
        assert_eq!(registry.list_all(), registry.list_all());
    }

    #[rstest]
    fn resolves_through_lookup(registry: CubeRegistry) {
        let cube = registry.lookup("VentasHistoricas").unwrap();
        assert_eq!(
            cube.measure("totalVentas").unwrap().resolve().unwrap(),
            "SUM(ventas_reales)"
        );
        let measure = registry.measure("MlPrediccionVentas", "count").unwrap();
        assert_eq!(measure.resolve().unwrap(), "COUNT(*)");
        let dimension = registry.dimension("VentasHistoricas", "historicoMes").unwrap();
        assert_eq!(dimension.resolve().sql, "historico_mes");
    }

    #[rstest]
    fn lookup_of_unknown_cube_fails(registry: CubeRegistry) {
        assert_eq!(
            registry.lookup("Nonexistent").unwrap_err(),
            NotFoundError::Cube("Nonexistent".to_string())
        );
    }

    #[rstest]
    fn duplicate_cube_leaves_registry_unchanged(registry: CubeRegistry) {
        let before = registry.snapshot();

        let err = registry.register(ventas_historicas()).unwrap_err();
        assert_eq!(
            err.issues(),
            &[ConfigIssue::DuplicateCube {
                name: "VentasHistoricas".to_string()
            }]
        );
        assert!(Arc::ptr_eq(&before, &registry.snapshot()));
        assert_eq!(registry.state(), RegistryState::Loaded);
    }

    #[test]
    fn duplicate_within_batch_is_reported() {
        let registry = CubeRegistry::new();
        let err = registry
            .register_all(vec![ventas_historicas(), ventas_historicas()])
            .unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(registry.state(), RegistryState::Unloaded);
        assert!(registry.lookup("VentasHistoricas").is_err());
    }

    #[test]
    fn failed_batch_registers_nothing() {
        let registry = CubeRegistry::new();
        let mut broken = ml_prediccion_ventas();
        broken.dimensions.remove("fechaPrediccion");

        let err = registry
            .register_all(vec![ventas_historicas(), broken])
            .unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert!(registry.list_all().is_empty());
        assert_eq!(registry.state(), RegistryState::Unloaded);
    }

    #[rstest]
    fn reload_replaces_cube_set(registry: CubeRegistry) {
        registry.reload(vec![ml_prediccion_ventas()]).unwrap();
        assert!(registry.lookup("VentasHistoricas").is_err());
        assert_eq!(registry.list_all().len(), 1);
    }

    #[rstest]
    fn failed_reload_keeps_previous_set(registry: CubeRegistry) {
        let mut broken = ventas_historicas();
        broken.measures.get_mut("totalVentas").unwrap().sql = None;

        assert!(registry.reload(vec![broken]).is_err());
        assert_eq!(registry.list_all().len(), 2);
    }

    #[rstest]
    fn snapshot_outlives_reload(registry: CubeRegistry) {
        let old = registry.snapshot();
        registry.reload(vec![]).unwrap();
        assert_eq!(old.len(), 2);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn earlier_issues_fail_the_batch() {
        let registry = CubeRegistry::new();
        let lint = ConfigIssue::BareDrillMember {
            cube: "MlPrediccionVentas".to_string(),
            measure: "count".to_string(),
            member: "modeloVersion".to_string(),
        };
        let mut broken = ventas_historicas();
        broken.sql = " ".to_string();

        let err = registry
            .register_all_with(vec![broken, ml_prediccion_ventas()], vec![lint.clone()])
            .unwrap_err();
        assert_eq!(
            err.issues(),
            &[
                lint,
                ConfigIssue::EmptySource {
                    cube: "VentasHistoricas".to_string()
                }
            ]
        );
        assert_eq!(registry.state(), RegistryState::Unloaded);
    }

    #[rstest]
    fn state_travels_with_snapshot(registry: CubeRegistry) {
        let loaded = registry.snapshot();
        assert_eq!(loaded.state(), RegistryState::Loaded);
        assert_eq!(RegistrySnapshot::default().state(), RegistryState::Unloaded);

        registry.reload(vec![]).unwrap();
        assert_eq!(registry.state(), RegistryState::Loaded);
        assert!(registry.snapshot().is_empty());
    }

    #[rstest]
    fn concurrent_readers_see_whole_snapshots(registry: CubeRegistry) {
        let registry = Arc::new(registry);
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        let snapshot = registry.snapshot();
                        assert!(snapshot.len() == 1 || snapshot.len() == 2);
                        assert_eq!(snapshot.state(), RegistryState::Loaded);
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            registry.reload(vec![ventas_historicas()]).unwrap();
            registry
                .reload(vec![ventas_historicas(), ml_prediccion_ventas()])
                .unwrap();
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
