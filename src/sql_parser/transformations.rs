use std::ops::ControlFlow;

use crate::cube::measure::is_plain_identifier;
use crate::cube::CubeLookup;
use crate::sql_parser::SqlParserError;
use sqlparser::ast::*;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Rewrites every `MEASURE(Cube.measure)` call in `query`, including CTEs,
/// subqueries and `ORDER BY`.
pub fn apply_transformations<L>(query: &mut Query, cubes: &L) -> Result<(), SqlParserError>
where
    L: CubeLookup,
{
    if let ControlFlow::Break(e) = VisitMut::visit(query, &mut MeasureRewriter { cubes }) {
        return Err(e);
    }

    // MEASURE used as a table function is never an expression.
    let leftover = visit_relations(&*query, |relation| {
        if is_measure_name(relation) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    if leftover.is_break() {
        return Err(SqlParserError::MeasureFunctionError(
            "MEASURE can only be used as an expression".to_string(),
        ));
    }

    Ok(())
}

struct MeasureRewriter<'a, L> {
    cubes: &'a L,
}

impl<L> VisitorMut for MeasureRewriter<'_, L>
where
    L: CubeLookup,
{
    type Break = SqlParserError;

    fn pre_visit_query(&mut self, query: &mut Query) -> ControlFlow<Self::Break> {
        match alias_bare_measures(&mut query.body) {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => ControlFlow::Break(e),
        }
    }

    // Post-order: arguments are visited first, and the replacement is not
    // walked again.
    fn post_visit_expr(&mut self, expr: &mut Expr) -> ControlFlow<Self::Break> {
        if let Expr::Function(func) = expr {
            if is_measure_name(&func.name) {
                match rewrite_measure(func, self.cubes) {
                    Ok(resolved) => *expr = resolved,
                    Err(e) => return ControlFlow::Break(e),
                }
            }
        }
        ControlFlow::Continue(())
    }
}

/// Names an unaliased `MEASURE(...)` select item after its measure.
fn alias_bare_measures(set_expr: &mut SetExpr) -> Result<(), SqlParserError> {
    match set_expr {
        SetExpr::Select(select) => {
            for projection in &mut select.projection {
                if let SelectItem::UnnamedExpr(expr) = projection {
                    if let Some((_, measure_name)) = measure_reference(expr)? {
                        *projection = SelectItem::ExprWithAlias {
                            expr: expr.clone(),
                            alias: alias_ident(measure_name),
                        };
                    }
                }
            }
        }
        SetExpr::SetOperation { left, right, .. } => {
            alias_bare_measures(left)?;
            alias_bare_measures(right)?;
        }
        _ => (),
    }
    Ok(())
}

fn alias_ident(name: String) -> Ident {
    if is_plain_identifier(&name) {
        Ident::new(name)
    } else {
        Ident::with_quote('"', name)
    }
}

fn is_measure_name(name: &ObjectName) -> bool {
    name.to_string().to_uppercase() == "MEASURE"
}

/// Returns `(cube, measure)` when `expr` is a `MEASURE(Cube.measure)` call.
fn measure_reference(expr: &Expr) -> Result<Option<(String, String)>, SqlParserError> {
    match expr {
        Expr::Function(func) if is_measure_name(&func.name) => measure_argument(func).map(Some),
        _ => Ok(None),
    }
}

fn measure_argument(func: &Function) -> Result<(String, String), SqlParserError> {
    let invalid_argument = || {
        SqlParserError::MeasureFunctionError(
            "MEASURE function expects a single `cube.measure` argument".to_string(),
        )
    };

    let args = match &func.args {
        FunctionArguments::List(args) if args.args.len() == 1 => args,
        _ => return Err(invalid_argument()),
    };

    match &args.args[0] {
        FunctionArg::Unnamed(FunctionArgExpr::Expr(Expr::CompoundIdentifier(ident)))
            if ident.len() == 2 =>
        {
            Ok((ident[0].value.clone(), ident[1].value.clone()))
        }
        FunctionArg::Unnamed(FunctionArgExpr::Expr(Expr::Identifier(ident))) => {
            Err(SqlParserError::MeasureFunctionError(format!(
                "measure `{}` must be qualified with its cube name",
                ident.value
            )))
        }
        _ => Err(invalid_argument()),
    }
}

/// Rewrites the custom `MEASURE` function to the aggregation of the measure
/// it references.
///
/// Its usage looks like `MEASURE(Cube.measure)`. The aggregation is resolved
/// from the registered cube and parsed back into an expression, so the field
/// expression is emitted exactly as declared.
fn rewrite_measure<L>(func: &Function, cubes: &L) -> Result<Expr, SqlParserError>
where
    L: CubeLookup,
{
    let (cube_name, measure_name) = measure_argument(func)?;
    let measure = cubes
        .measure(&cube_name, &measure_name)
        .map_err(|e| SqlParserError::MeasureFunctionError(e.to_string()))?;
    let sql = measure
        .resolve()
        .map_err(|e| SqlParserError::MeasureFunctionError(e.to_string()))?;

    let dialect = PostgreSqlDialect {};
    let mut parser = Parser::new(&dialect)
        .try_with_sql(&sql)
        .map_err(|e| SqlParserError::MeasureFunctionError(e.to_string()))?;
    parser
        .parse_expr()
        .map_err(|e| SqlParserError::MeasureFunctionError(e.to_string()))
}
