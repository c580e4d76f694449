//! Fluent Cypher query builder.
//!
//! Constructs parameterized, injection-safe Cypher queries. The hard
//! invariant: user-supplied values are always bound as named parameters
//! (`$p0`, `$p1`, …) and never interpolated into the query text. Structural
//! fragments (patterns, projections, orderings) are authored by the calling
//! code, not by end users, and are validated against the variables bound by
//! the match clauses.
//!
//! The builder performs no I/O; all failure modes are local
//! ([`QueryBuildError`]) and surface synchronously from [`QueryBuilder::build`].

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// A built query: Cypher text plus its named parameters.
///
/// Parameters use a `BTreeMap` so serialization order is deterministic,
/// which makes (text, params) usable as a cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct CypherQuery {
    pub text: String,
    pub params: BTreeMap<String, Value>,
}

impl CypherQuery {
    /// A query with no parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: BTreeMap::new(),
        }
    }

    /// Attach a named parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Deterministic fingerprint of (text, params), used as the cache key.
    pub fn fingerprint(&self) -> String {
        let params = serde_json::to_string(&self.params).unwrap_or_default();
        format!("{}\u{1f}{}", self.text, params)
    }
}

/// Errors raised while building a query. Local, never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryBuildError {
    /// `build()` was called without any match clause.
    #[error("query has no MATCH clause")]
    NoMatchClause,

    /// `build()` was called without any RETURN item.
    #[error("query has no RETURN clause")]
    NoReturnClause,

    /// A projection or ordering references a variable no pattern binds.
    #[error("undeclared variable `{variable}` in {clause} clause")]
    UndeclaredVariable { variable: String, clause: String },
}

/// Sort direction for `ORDER BY` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryMode {
    Explain,
    Profile,
}

/// Fluent, chainable Cypher builder.
///
/// ```
/// use graph_intelligence::query::builder::QueryBuilder;
///
/// let q = QueryBuilder::new()
///     .match_pattern("(e:Entity)")
///     .where_raw("e.valid_to IS NULL")
///     .where_param("e.name", "=", "alan turing")
///     .return_item("e")
///     .limit(10)
///     .build()
///     .unwrap();
///
/// assert!(!q.text.contains("alan turing"));
/// assert_eq!(q.params["p0"], "alan turing");
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    matches: Vec<String>,
    optional_matches: Vec<String>,
    wheres: Vec<String>,
    withs: Vec<String>,
    returns: Vec<String>,
    order_by: Vec<String>,
    skip: Option<u64>,
    limit: Option<u64>,
    params: BTreeMap<String, Value>,
    bound: BTreeSet<String>,
    param_counter: usize,
    mode: Option<QueryMode>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `MATCH` pattern. Variables bound by the pattern become valid
    /// for use in later clauses.
    pub fn match_pattern(mut self, pattern: &str) -> Self {
        for var in pattern_bindings(pattern) {
            self.bound.insert(var);
        }
        self.matches.push(pattern.to_string());
        self
    }

    /// Add an `OPTIONAL MATCH` pattern.
    pub fn optional_match(mut self, pattern: &str) -> Self {
        for var in pattern_bindings(pattern) {
            self.bound.insert(var);
        }
        self.optional_matches.push(pattern.to_string());
        self
    }

    /// Add a raw predicate (no user value inside — e.g. `e.valid_to IS NULL`).
    pub fn where_raw(mut self, predicate: &str) -> Self {
        self.wheres.push(predicate.to_string());
        self
    }

    /// Add a value predicate. The value is bound as a fresh named parameter;
    /// only `lhs` and `op` (authored by calling code) reach the query text.
    pub fn where_param(mut self, lhs: &str, op: &str, value: impl Into<Value>) -> Self {
        let name = self.next_param(value.into());
        self.wheres.push(format!("{lhs} {op} ${name}"));
        self
    }

    /// Add a `WITH` projection. Items aliased with `AS` rebind; bare
    /// identifiers pass through.
    pub fn with(mut self, items: &str) -> Self {
        for item in items.split(',') {
            let item = item.trim();
            if let Some(alias) = alias_of(item) {
                self.bound.insert(alias);
            }
        }
        self.withs.push(items.to_string());
        self
    }

    /// Add a `RETURN` item (expression, optionally `... AS alias`).
    pub fn return_item(mut self, item: &str) -> Self {
        self.returns.push(item.to_string());
        self
    }

    /// Add several `RETURN` items at once.
    pub fn return_items(mut self, items: &[&str]) -> Self {
        self.returns.extend(items.iter().map(|s| s.to_string()));
        self
    }

    /// Add an `ORDER BY` item.
    pub fn order_by(mut self, expr: &str, order: SortOrder) -> Self {
        self.order_by.push(format!("{expr} {}", order.keyword()));
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Bind an explicitly named parameter (for templates that reference
    /// `$name` in raw fragments).
    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Wrap the built query in `EXPLAIN` for plan inspection.
    pub fn explain(mut self) -> Self {
        self.mode = Some(QueryMode::Explain);
        self
    }

    /// Wrap the built query in `PROFILE` for diagnostic execution.
    pub fn profile(mut self) -> Self {
        self.mode = Some(QueryMode::Profile);
        self
    }

    /// Assemble the final query, validating structure and variable usage.
    pub fn build(self) -> Result<CypherQuery, QueryBuildError> {
        if self.matches.is_empty() {
            return Err(QueryBuildError::NoMatchClause);
        }
        if self.returns.is_empty() {
            return Err(QueryBuildError::NoReturnClause);
        }

        for item in &self.returns {
            self.check_identifiers(item, "RETURN", &self.bound)?;
        }
        // RETURN aliases are in scope for ORDER BY.
        let mut order_scope = self.bound.clone();
        for item in &self.returns {
            if let Some(alias) = alias_of(item) {
                order_scope.insert(alias);
            }
        }
        for item in &self.order_by {
            self.check_identifiers(item, "ORDER BY", &order_scope)?;
        }

        let mut text = String::new();
        match self.mode {
            Some(QueryMode::Explain) => text.push_str("EXPLAIN "),
            Some(QueryMode::Profile) => text.push_str("PROFILE "),
            None => {}
        }

        text.push_str("MATCH ");
        text.push_str(&self.matches.join(", "));
        // WHERE attaches to the main MATCH; a predicate rendered after an
        // OPTIONAL MATCH would only null out the optional part.
        if !self.wheres.is_empty() {
            text.push_str("\nWHERE ");
            text.push_str(&self.wheres.join(" AND "));
        }
        for om in &self.optional_matches {
            text.push_str("\nOPTIONAL MATCH ");
            text.push_str(om);
        }
        for w in &self.withs {
            text.push_str("\nWITH ");
            text.push_str(w);
        }
        text.push_str("\nRETURN ");
        text.push_str(&self.returns.join(", "));
        if !self.order_by.is_empty() {
            text.push_str("\nORDER BY ");
            text.push_str(&self.order_by.join(", "));
        }
        if let Some(n) = self.skip {
            text.push_str(&format!("\nSKIP {n}"));
        }
        if let Some(n) = self.limit {
            text.push_str(&format!("\nLIMIT {n}"));
        }

        Ok(CypherQuery {
            text,
            params: self.params,
        })
    }

    fn next_param(&mut self, value: Value) -> String {
        let name = format!("p{}", self.param_counter);
        self.param_counter += 1;
        self.params.insert(name.clone(), value);
        name
    }

    /// Verify every variable referenced by an expression is in `scope`.
    ///
    /// Aliases introduced by `AS` within `WITH` clauses count as bound;
    /// aliases on the RETURN item itself are output names, not references.
    fn check_identifiers(
        &self,
        item: &str,
        clause: &str,
        scope: &BTreeSet<String>,
    ) -> Result<(), QueryBuildError> {
        let expr = item
            .split(" AS ")
            .next()
            .unwrap_or(item)
            .trim_start_matches("DISTINCT ")
            .trim();
        if expr == "*" {
            return Ok(());
        }
        for var in referenced_identifiers(expr) {
            if !scope.contains(&var) {
                return Err(QueryBuildError::UndeclaredVariable {
                    variable: var,
                    clause: clause.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Extract variable names bound by a Cypher pattern: identifiers directly
/// after `(` or `[` and before `:`, `)`, `]` or whitespace.
fn pattern_bindings(pattern: &str) -> Vec<String> {
    let mut out = Vec::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '(' || chars[i] == '[' {
            let mut j = i + 1;
            let mut ident = String::new();
            while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                ident.push(chars[j]);
                j += 1;
            }
            if !ident.is_empty() && !ident.chars().next().unwrap_or('0').is_ascii_digit() {
                out.push(ident);
            }
            i = j;
        } else {
            i += 1;
        }
    }
    out
}

/// Extract variable references from an expression: identifier tokens not
/// preceded by `.` (property access) and not followed by `(` (function
/// calls), skipping string literals and `$params`.
fn referenced_identifiers(expr: &str) -> Vec<String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        // Skip string literals
        if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            while i < chars.len() && chars[i] != quote {
                i += 1;
            }
            i += 1;
            continue;
        }
        // Skip parameter references
        if c == '$' {
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let preceded_by_dot = i > 0 && chars[i - 1] == '.';
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            let followed_by_paren = i < chars.len() && chars[i] == '(';
            if !preceded_by_dot && !followed_by_paren && !is_cypher_keyword(&ident) {
                out.push(ident);
            }
            continue;
        }
        i += 1;
    }
    out
}

/// The alias introduced by `expr AS alias`, if any.
fn alias_of(item: &str) -> Option<String> {
    item.rsplit(" AS ").next().and_then(|alias| {
        let alias = alias.trim();
        if item.contains(" AS ")
            && alias.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !alias.is_empty()
        {
            Some(alias.to_string())
        } else {
            None
        }
    })
}

fn is_cypher_keyword(ident: &str) -> bool {
    matches!(
        ident.to_ascii_uppercase().as_str(),
        "AND" | "OR" | "NOT" | "NULL" | "TRUE" | "FALSE" | "IS" | "IN" | "AS" | "DISTINCT"
            | "CONTAINS" | "STARTS" | "ENDS" | "WITH" | "CASE" | "WHEN" | "THEN" | "ELSE" | "END"
            | "ASC" | "DESC"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_never_appear_in_text() {
        let hostile = "x' OR '1'='1"; // classic injection shape
        let q = QueryBuilder::new()
            .match_pattern("(e:Entity)")
            .where_param("e.name", "=", hostile)
            .return_item("e")
            .build()
            .unwrap();

        assert!(!q.text.contains(hostile));
        assert!(q.text.contains("e.name = $p0"));
        assert_eq!(q.params["p0"], hostile);
    }

    #[test]
    fn test_no_match_clause_fails() {
        let err = QueryBuilder::new().return_item("e").build().unwrap_err();
        assert_eq!(err, QueryBuildError::NoMatchClause);
    }

    #[test]
    fn test_no_return_clause_fails() {
        let err = QueryBuilder::new()
            .match_pattern("(e:Entity)")
            .build()
            .unwrap_err();
        assert_eq!(err, QueryBuildError::NoReturnClause);
    }

    #[test]
    fn test_undeclared_variable_in_return() {
        let err = QueryBuilder::new()
            .match_pattern("(e:Entity)")
            .return_item("n.name")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            QueryBuildError::UndeclaredVariable {
                variable: "n".into(),
                clause: "RETURN".into()
            }
        );
    }

    #[test]
    fn test_undeclared_variable_in_order_by() {
        let err = QueryBuilder::new()
            .match_pattern("(e:Entity)")
            .return_item("e.name")
            .order_by("m.created", SortOrder::Desc)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            QueryBuildError::UndeclaredVariable { variable, .. } if variable == "m"
        ));
    }

    #[test]
    fn test_pattern_binds_node_and_relationship_vars() {
        let q = QueryBuilder::new()
            .match_pattern("(a:Entity)-[r:LINKS_TO]->(b:Entity)")
            .return_items(&["a.id", "type(r)", "b.id"])
            .build()
            .unwrap();
        assert!(q.text.starts_with("MATCH (a:Entity)-[r:LINKS_TO]->(b:Entity)"));
    }

    #[test]
    fn test_anonymous_pattern_elements_bind_nothing() {
        let vars = pattern_bindings("(:Entity)-[]->(n)");
        assert_eq!(vars, vec!["n".to_string()]);
    }

    #[test]
    fn test_with_alias_rebinds() {
        let q = QueryBuilder::new()
            .match_pattern("(e:Entity)-[r]->()")
            .with("e, count(r) AS degree")
            .return_items(&["e.id", "degree"])
            .order_by("degree", SortOrder::Desc)
            .build()
            .unwrap();
        assert!(q.text.contains("WITH e, count(r) AS degree"));
    }

    #[test]
    fn test_aggregate_over_bound_var_is_valid() {
        let q = QueryBuilder::new()
            .match_pattern("(e:Entity)")
            .return_item("count(e) AS total")
            .build()
            .unwrap();
        assert!(q.text.contains("count(e) AS total"));
    }

    #[test]
    fn test_param_counter_allocates_sequential_names() {
        let q = QueryBuilder::new()
            .match_pattern("(e:Entity)")
            .where_param("e.entity_type", "=", "person")
            .where_param("e.version", ">=", 2)
            .return_item("e")
            .build()
            .unwrap();
        assert_eq!(q.params["p0"], "person");
        assert_eq!(q.params["p1"], 2);
        assert!(q.text.contains("$p0") && q.text.contains("$p1"));
    }

    #[test]
    fn test_explain_and_profile_prefix() {
        let explain = QueryBuilder::new()
            .match_pattern("(e:Entity)")
            .return_item("e")
            .explain()
            .build()
            .unwrap();
        assert!(explain.text.starts_with("EXPLAIN MATCH"));

        let profile = QueryBuilder::new()
            .match_pattern("(e:Entity)")
            .return_item("e")
            .profile()
            .build()
            .unwrap();
        assert!(profile.text.starts_with("PROFILE MATCH"));
    }

    #[test]
    fn test_skip_limit_rendering() {
        let q = QueryBuilder::new()
            .match_pattern("(e:Entity)")
            .return_item("e")
            .skip(20)
            .limit(10)
            .build()
            .unwrap();
        assert!(q.text.contains("SKIP 20"));
        assert!(q.text.ends_with("LIMIT 10"));
    }

    #[test]
    fn test_fingerprint_differs_on_params() {
        let a = CypherQuery::new("RETURN 1").with_param("x", 1);
        let b = CypherQuery::new("RETURN 1").with_param("x", 2);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
    }

    #[test]
    fn test_string_literals_in_expressions_are_not_variables() {
        let q = QueryBuilder::new()
            .match_pattern("(e:Entity)")
            .return_item("coalesce(e.name, 'unnamed') AS name")
            .build();
        assert!(q.is_ok());
    }
}
