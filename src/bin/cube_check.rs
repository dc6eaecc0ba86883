use log::{error, info};
use std::process;

use cube_schema::{config::SchemaConfig, schema_file, CubeLookup, CubeRegistry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = SchemaConfig::new().map_err(|e| {
        error!("Failed to initialize config: {}", e);
        e
    })?;

    let loaded = schema_file::load_dir(&config.schema_dir).map_err(|e| {
        error!("Failed to load schema files: {}", e);
        e
    })?;

    let registry = CubeRegistry::new();
    if let Err(e) = loaded.register_into(&registry, config.strict_drill_members) {
        error!("{}", e);
        process::exit(1);
    }

    for cube in registry.list_all() {
        info!(
            "Cube {} on data source `{}` from `{}`",
            cube.name(),
            cube.data_source(),
            cube.sql()
        );
        if let Some(key) = cube.primary_key() {
            info!("  primary key: {} ({})", key.name(), key.field().sql());
        }
        for measure in cube.measures() {
            info!("  measure {}", measure.render(true)?);
        }
        for dimension in cube.dimensions() {
            let expr = dimension.resolve();
            info!("  dimension {}: {} {}", dimension.name(), expr.kind, expr.sql);
        }
    }

    Ok(())
}
