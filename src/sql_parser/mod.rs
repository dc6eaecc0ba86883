mod transformations;

use crate::cube::CubeLookup;
use log::debug;
use sqlparser::ast::*;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqlParserError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("SQL parsing error: {0}")]
    SqlParseError(String),

    #[error("MEASURE function error: {0}")]
    MeasureFunctionError(String),
}

/// Expands `MEASURE(Cube.measure)` calls in read-only queries into the
/// aggregations declared by the registered cubes.
pub struct SqlParser<L> {
    cubes: L,
}

impl<L> SqlParser<L>
where
    L: CubeLookup,
{
    pub fn new(cubes: L) -> Self {
        SqlParser { cubes }
    }

    pub fn parse(&self, query: &str) -> Result<String, SqlParserError> {
        debug!("Initial query: {}", query);
        let ast_list = self.parse_query(query)?;
        let transformed_ast_list = self.transform_ast(ast_list)?;

        let output = transformed_ast_list
            .into_iter()
            .map(|ast| ast.to_string())
            .collect::<Vec<_>>()
            .join(";\n");
        debug!("Transformed query: {}", output);
        Ok(output)
    }

    fn parse_query(&self, query: &str) -> Result<Vec<Statement>, SqlParserError> {
        Parser::parse_sql(&PostgreSqlDialect {}, query)
            .map_err(|e| SqlParserError::SqlParseError(e.to_string()))
    }

    fn transform_ast(&self, ast: Vec<Statement>) -> Result<Vec<Statement>, SqlParserError> {
        ast.into_iter()
            .map(|statement| match statement {
                Statement::Query(mut query) => {
                    transformations::apply_transformations(&mut query, &self.cubes)?;
                    Ok(Statement::Query(query))
                }
                _ => Err(SqlParserError::PermissionDenied(
                    "Only read-only SQL statements are allowed".to_string(),
                )),
            })
            .collect()
    }
}
