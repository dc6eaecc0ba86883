use envconfig::Envconfig;
use log::debug;

#[derive(Envconfig, Clone)]
pub struct SchemaConfig {
    #[envconfig(from = "CUBE_SCHEMA_DIR", default = "cube_schema")]
    pub schema_dir: String,

    /// Reject drill members written as bare identifiers instead of warning.
    #[envconfig(from = "CUBE_STRICT_DRILL_MEMBERS", default = "false")]
    pub strict_drill_members: bool,
}

impl SchemaConfig {
    pub fn new() -> Result<Self, envconfig::Error> {
        let config = Self::init_from_env()?;
        debug!(
            "SchemaConfig loaded: schema_dir={}, strict_drill_members={}",
            config.schema_dir, config.strict_drill_members
        );
        Ok(config)
    }
}
