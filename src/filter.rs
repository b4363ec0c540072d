//! Filter Expression Compiler
//!
//! Compiles the textual filter DSL accepted on list endpoints into validated
//! query parameters. The grammar is
//!
//! ```text
//! expression := clause [ "," clause ]*
//! clause     := field "=" op "." value
//! op         := "eq" | "ne" | "gt" | "ge" | "lt" | "le" | "like"
//! ```
//!
//! so `name=eq.foo,size=gt.100` compiles to the query parameters
//! `name=eq.foo&size=gt.100`. Compilation is all-or-nothing: one bad clause
//! fails the whole expression, and an empty expression compiles to an empty
//! filter. The compiler is pure and performs no I/O.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Filter Operator
// =============================================================================

/// Comparison operators recognized by the array's list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

impl FilterOperator {
    /// The literal token used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Gt => "gt",
            FilterOperator::Ge => "ge",
            FilterOperator::Lt => "lt",
            FilterOperator::Le => "le",
            FilterOperator::Like => "like",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "eq" => Ok(FilterOperator::Eq),
            "ne" => Ok(FilterOperator::Ne),
            "gt" => Ok(FilterOperator::Gt),
            "ge" => Ok(FilterOperator::Ge),
            "lt" => Ok(FilterOperator::Lt),
            "le" => Ok(FilterOperator::Le),
            "like" => Ok(FilterOperator::Like),
            _ => Err(()),
        }
    }
}

// =============================================================================
// Filter Clause
// =============================================================================

/// A single parsed `field=op.value` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub field: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterClause {
    /// Wire form of the clause value, e.g. `eq.foo`
    pub fn wire_value(&self) -> String {
        format!("{}.{}", self.operator, self.value)
    }
}

// =============================================================================
// Compiled Filter
// =============================================================================

/// A validated filter, mapping field names to `op.value` strings in clause
/// order. Duplicate fields keep the last clause, matching the URL-query
/// semantics of the array API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledFilter {
    params: IndexMap<String, String>,
}

impl CompiledFilter {
    /// Compile a filter expression. Empty input yields an empty filter.
    pub fn compile(expression: &str) -> Result<Self> {
        let mut params = IndexMap::new();
        if expression.is_empty() {
            return Ok(Self { params });
        }

        for (idx, raw) in expression.split(',').enumerate() {
            let clause = parse_clause(idx + 1, raw)?;
            // IndexMap keeps first-insert position on overwrite; shift-remove
            // first so a repeated field moves to its last clause position.
            params.shift_remove(&clause.field);
            params.insert(clause.field.clone(), clause.wire_value());
        }
        Ok(Self { params })
    }

    /// Build a filter from already-typed clauses, bypassing the textual
    /// grammar. This is the path for programmatic lookups whose values may
    /// contain DSL metacharacters (`,`, `=`) that would break compilation
    /// if round-tripped through expression text. Duplicate fields keep the
    /// last clause, as in [`CompiledFilter::compile`].
    pub fn from_clauses(clauses: &[FilterClause]) -> Self {
        let mut params = IndexMap::new();
        for clause in clauses {
            params.shift_remove(&clause.field);
            params.insert(clause.field.clone(), clause.wire_value());
        }
        Self { params }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Lookup the compiled `op.value` string for a field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.params.get(field).map(String::as_str)
    }

    /// Iterate (field, `op.value`) pairs in clause order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render URL-encoded query pairs for a list endpoint
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), urlencoding::encode(v).into_owned()))
            .collect()
    }
}

fn parse_clause(index: usize, raw: &str) -> Result<FilterClause> {
    let fail = |reason: &str| Error::FilterParse {
        clause_index: index,
        raw_clause: raw.to_string(),
        reason: reason.to_string(),
    };

    let (field, rest) = raw.split_once('=').ok_or_else(|| fail("missing '='"))?;
    if field.is_empty() {
        return Err(fail("empty field name"));
    }

    let (op_token, value) = rest
        .split_once('.')
        .ok_or_else(|| fail("missing '.' between operator and value"))?;
    let operator = op_token
        .parse::<FilterOperator>()
        .map_err(|_| fail(&format!("unrecognized operator {:?}", op_token)))?;
    if value.is_empty() {
        return Err(fail("empty value"));
    }

    Ok(FilterClause {
        field: field.to_string(),
        operator,
        value: value.to_string(),
    })
}
