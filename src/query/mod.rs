//! Procedure-call parsing
//!
//! The driver reaches the two stages through SQL, the way it would call
//! stored functions on a database connection:
//!
//! ```sql
//! SELECT prepare();
//! SELECT measure() AS speedup;
//! ```
//!
//! Supported subset:
//! - exactly one statement
//! - `SELECT <procedure>()` with an optional alias
//! - no arguments and no other clause (`FROM`, `WHERE`, `DISTINCT`,
//!   `ORDER BY`, `LIMIT`, `OVER`, ...)
//! - procedure names are case-insensitive; a schema qualifier is ignored
//!
//! References:
//! - sqlparser-rs: <https://docs.rs/sqlparser>

use std::fmt;

use sqlparser::ast::{
    Expr, Function, FunctionArguments, GroupByExpr, Query, Select, SelectItem, SetExpr, Statement,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Procedures exposed to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Procedure {
    /// Definition stage: build and cache both SUM procedures
    Prepare,
    /// Measurement stage: time both procedures and return the ratio
    Measure,
}

impl Procedure {
    /// SQL name of the procedure
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Measure => "measure",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "prepare" => Some(Self::Prepare),
            "measure" => Some(Self::Measure),
            _ => None,
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}()", self.name())
    }
}

/// Parsed procedure call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPlan {
    /// Procedure to invoke
    pub procedure: Procedure,
    /// Result column alias (optional)
    pub alias: Option<String>,
}

impl CallPlan {
    /// Name of the result column: the alias, or the procedure name
    #[must_use]
    pub fn column_name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.procedure.name())
    }
}

/// Procedure-call parser
pub struct QueryEngine {
    dialect: GenericDialect,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine {
    /// Create a new query engine
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dialect: GenericDialect {},
        }
    }

    /// Parse a `SELECT <procedure>()` statement
    ///
    /// # Errors
    /// - `ParseError` if the SQL is invalid, empty, has several statements,
    ///   or is not a bare argument-less call
    /// - `UnknownProcedure` if the called function is not exposed
    ///
    /// # Example
    /// ```
    /// use jitbench_db::query::{Procedure, QueryEngine};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let engine = QueryEngine::new();
    /// let plan = engine.parse("SELECT measure() AS speedup")?;
    /// assert_eq!(plan.procedure, Procedure::Measure);
    /// assert_eq!(plan.column_name(), "speedup");
    /// # Ok(())
    /// # }
    /// ```
    pub fn parse(&self, sql: &str) -> crate::Result<CallPlan> {
        if sql.trim().trim_end_matches(';').trim().is_empty() {
            return Err(crate::Error::ParseError("Empty statement".to_string()));
        }

        let statements = Parser::parse_sql(&self.dialect, sql)
            .map_err(|e| crate::Error::ParseError(format!("SQL parse error: {e}")))?;

        if statements.len() != 1 {
            return Err(crate::Error::ParseError(
                "Only single statements supported".to_string(),
            ));
        }

        let Statement::Query(query) = &statements[0] else {
            return Err(crate::Error::ParseError(
                "Only SELECT <procedure>() calls supported".to_string(),
            ));
        };

        Self::parse_call(query)
    }

    fn parse_call(query: &Query) -> crate::Result<CallPlan> {
        let SetExpr::Select(select) = query.body.as_ref() else {
            return Err(crate::Error::ParseError(
                "Only SELECT <procedure>() calls supported".to_string(),
            ));
        };

        if let Some(clause) = Self::query_clause(query).or_else(|| Self::select_clause(select)) {
            return Err(crate::Error::ParseError(format!(
                "Procedure calls take no {clause} clause"
            )));
        }

        let [item] = select.projection.as_slice() else {
            return Err(crate::Error::ParseError(format!(
                "Expected exactly one procedure call, got {} select items",
                select.projection.len()
            )));
        };

        let (expr, alias) = match item {
            SelectItem::UnnamedExpr(expr) => (expr, None),
            SelectItem::ExprWithAlias { expr, alias } => (expr, Some(alias.value.clone())),
            _ => {
                return Err(crate::Error::ParseError(
                    "Wildcards are not procedure calls".to_string(),
                ))
            }
        };

        let procedure = Self::extract_procedure(expr)?;
        Ok(CallPlan { procedure, alias })
    }

    /// First query-level clause present around the SELECT body
    fn query_clause(query: &Query) -> Option<&'static str> {
        [
            (query.with.is_some(), "WITH"),
            (query.order_by.is_some(), "ORDER BY"),
            (query.limit.is_some() || !query.limit_by.is_empty(), "LIMIT"),
            (query.offset.is_some(), "OFFSET"),
            (query.fetch.is_some(), "FETCH"),
            (!query.locks.is_empty(), "FOR UPDATE/SHARE"),
            (query.for_clause.is_some(), "FOR"),
            (query.settings.is_some(), "SETTINGS"),
            (query.format_clause.is_some(), "FORMAT"),
        ]
        .into_iter()
        .find_map(|(present, name)| present.then_some(name))
    }

    /// First clause of the SELECT itself beyond its projection
    fn select_clause(select: &Select) -> Option<&'static str> {
        let grouped = match &select.group_by {
            GroupByExpr::Expressions(exprs, modifiers) => {
                !exprs.is_empty() || !modifiers.is_empty()
            }
            GroupByExpr::All(_) => true,
        };
        [
            (select.distinct.is_some(), "DISTINCT"),
            (select.top.is_some(), "TOP"),
            (select.into.is_some(), "INTO"),
            (!select.from.is_empty(), "FROM"),
            (!select.lateral_views.is_empty(), "LATERAL VIEW"),
            (select.prewhere.is_some(), "PREWHERE"),
            (select.selection.is_some(), "WHERE"),
            (grouped, "GROUP BY"),
            (
                !select.cluster_by.is_empty()
                    || !select.distribute_by.is_empty()
                    || !select.sort_by.is_empty(),
                "CLUSTER/DISTRIBUTE/SORT BY",
            ),
            (select.having.is_some(), "HAVING"),
            (!select.named_window.is_empty(), "WINDOW"),
            (select.qualify.is_some(), "QUALIFY"),
            (select.connect_by.is_some(), "CONNECT BY"),
        ]
        .into_iter()
        .find_map(|(present, name)| present.then_some(name))
    }

    /// First call modifier (`OVER`, `FILTER`, ...) attached to the function
    fn call_modifier(func: &Function) -> Option<&'static str> {
        [
            (func.over.is_some(), "OVER"),
            (func.filter.is_some(), "FILTER"),
            (!func.within_group.is_empty(), "WITHIN GROUP"),
            (func.null_treatment.is_some(), "IGNORE/RESPECT NULLS"),
            (!matches!(func.parameters, FunctionArguments::None), "parameter list"),
        ]
        .into_iter()
        .find_map(|(present, name)| present.then_some(name))
    }

    fn extract_procedure(expr: &Expr) -> crate::Result<Procedure> {
        let Expr::Function(func) = expr else {
            return Err(crate::Error::ParseError(format!(
                "Expected a procedure call, got {expr}"
            )));
        };

        if let Some(modifier) = Self::call_modifier(func) {
            return Err(crate::Error::ParseError(format!(
                "Procedure {} takes no {modifier}",
                func.name
            )));
        }

        let no_args = match &func.args {
            FunctionArguments::None => true,
            FunctionArguments::List(list) => list.args.is_empty(),
            _ => false,
        };
        if !no_args {
            return Err(crate::Error::ParseError(format!(
                "Procedure {} takes no arguments",
                func.name
            )));
        }

        func.name
            .0
            .last()
            .and_then(|ident| Procedure::from_name(&ident.value))
            .ok_or_else(|| crate::Error::UnknownProcedure(func.name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_parse_prepare() {
        let plan = QueryEngine::new().parse("SELECT prepare()").unwrap();
        assert_eq!(plan.procedure, Procedure::Prepare);
        assert_eq!(plan.alias, None);
        assert_eq!(plan.column_name(), "prepare");
    }

    #[test]
    fn test_parse_measure_with_alias_and_semicolon() {
        let plan = QueryEngine::new()
            .parse("select MEASURE() as speedup;")
            .unwrap();
        assert_eq!(plan.procedure, Procedure::Measure);
        assert_eq!(plan.column_name(), "speedup");
    }

    #[test]
    fn test_parse_schema_qualified() {
        let plan = QueryEngine::new().parse("SELECT bench.measure()").unwrap();
        assert_eq!(plan.procedure, Procedure::Measure);
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(QueryEngine::new().parse("  ; "), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_parse_unknown_procedure() {
        let err = QueryEngine::new().parse("SELECT compile()").unwrap_err();
        assert!(matches!(err, Error::UnknownProcedure(ref name) if name == "compile"));
    }

    #[test]
    fn test_parse_rejects_arguments() {
        assert!(QueryEngine::new().parse("SELECT measure(10)").is_err());
    }

    #[test]
    fn test_parse_rejects_non_calls() {
        let engine = QueryEngine::new();
        assert!(engine.parse("SELECT 1").is_err());
        assert!(engine.parse("SELECT *").is_err());
        assert!(engine.parse("SELECT prepare(), measure()").is_err());
        assert!(engine.parse("SELECT measure() FROM t").is_err());
        assert!(engine.parse("INSERT INTO t VALUES (1)").is_err());
        assert!(engine.parse("SELECT prepare(); SELECT measure()").is_err());
        assert!(engine.parse("SELEC prepare()").is_err());
    }

    #[test]
    fn test_parse_rejects_clauses_around_call() {
        let engine = QueryEngine::new();
        for sql in [
            "SELECT measure() LIMIT 0",
            "SELECT measure() LIMIT 1 OFFSET 1",
            "SELECT DISTINCT prepare()",
            "SELECT measure() ORDER BY 1",
            "SELECT measure() GROUP BY 1",
            "SELECT measure() HAVING 1 = 1",
            "SELECT measure() OVER ()",
            "SELECT measure() FILTER (WHERE 1 = 1)",
            "WITH t AS (SELECT 1) SELECT measure()",
        ] {
            assert!(
                matches!(engine.parse(sql), Err(Error::ParseError(_))),
                "{sql} should be rejected"
            );
        }
    }

    #[test]
    fn test_procedure_display() {
        assert_eq!(Procedure::Measure.to_string(), "measure()");
    }
}
