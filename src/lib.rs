pub mod config;
pub mod cube;
pub mod error;
pub mod schema_file;
pub mod sql_parser;

pub use cube::{Cube, CubeLookup, CubeRegistry};
pub use error::{ConfigIssue, ConfigurationError, NotFoundError, SchemaError};
