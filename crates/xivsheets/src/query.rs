//! Query builder DSL for the search endpoint.
//!
//! Filters compose through a fluent builder and compile to the service's
//! textual query grammar with [`QueryBuilder::build`]. Nothing here touches
//! the network; a built query is a plain string handed to search.
//!
//! # Example
//!
//! ```rust,ignore
//! use xivsheets::QueryBuilder;
//!
//! let query = QueryBuilder::new()
//!     .contains("Name", "sword")
//!     .gte("LevelItem", 50)
//!     .build()?;
//! assert_eq!(query, r#"Name~"sword" LevelItem>=50"#);
//! ```

use std::fmt;

use crate::error::{Result, XivError};

// ============================================================================
// Values and operators
// ============================================================================

/// A value a clause compares against.
///
/// Strings are double-quoted on the wire for exact and partial matches,
/// bare for range comparisons; numbers and booleans are always bare.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl QueryValue {
    /// Whether this value gets double quotes under the given operator.
    fn quoted_with(&self, op: Operator) -> bool {
        matches!(self, QueryValue::Str(_)) && matches!(op, Operator::Eq | Operator::Contains)
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Str(v) => f.write_str(v),
            QueryValue::Int(v) => write!(f, "{}", v),
            QueryValue::UInt(v) => write!(f, "{}", v),
            QueryValue::Float(v) => write!(f, "{}", v),
            QueryValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::Str(v.to_owned())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::Str(v)
    }
}

impl From<i32> for QueryValue {
    fn from(v: i32) -> Self {
        QueryValue::Int(i64::from(v))
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        QueryValue::Int(v)
    }
}

impl From<u32> for QueryValue {
    fn from(v: u32) -> Self {
        QueryValue::UInt(u64::from(v))
    }
}

impl From<u64> for QueryValue {
    fn from(v: u64) -> Self {
        QueryValue::UInt(v)
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Float(v)
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Bool(v)
    }
}

/// Comparison operator of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Exact match, `=`.
    Eq,
    /// Partial match, `~`.
    Contains,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Contains => "~",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        }
    }
}

// ============================================================================
// Builder nodes
// ============================================================================

#[derive(Debug, Clone)]
struct Clause {
    field: String,
    op: Operator,
    value: QueryValue,
    required: bool,
    excluded: bool,
}

impl Clause {
    fn render(&self, out: &mut String) {
        out.push_str(flag_prefix(self.required, self.excluded));
        out.push_str(&self.field);
        out.push_str(self.op.as_str());
        if self.value.quoted_with(self.op) {
            out.push('"');
            out.push_str(&self.value.to_string());
            out.push('"');
        } else {
            out.push_str(&self.value.to_string());
        }
    }
}

#[derive(Debug, Clone)]
struct Group {
    branches: Vec<QueryBuilder>,
    required: bool,
    excluded: bool,
}

impl Group {
    fn render_inner(&self) -> String {
        let parts: Vec<String> = self.branches.iter().map(QueryBuilder::render).collect();
        parts.join(" ")
    }
}

#[derive(Debug, Clone)]
enum Node {
    Clause(Clause),
    Group(Group),
}

impl Node {
    fn set_required(&mut self) {
        match self {
            Node::Clause(c) => c.required = true,
            Node::Group(g) => g.required = true,
        }
    }

    fn set_excluded(&mut self) {
        match self {
            Node::Clause(c) => c.excluded = true,
            Node::Group(g) => g.excluded = true,
        }
    }

    /// Reject elements flagged both required and excluded, recursively.
    fn check_conflicts(&self) -> Result<()> {
        match self {
            Node::Clause(c) => {
                if c.required && c.excluded {
                    return Err(XivError::QueryBuild {
                        field: c.field.clone(),
                    });
                }
            }
            Node::Group(g) => {
                for branch in &g.branches {
                    branch.check_conflicts()?;
                }
                if g.required && g.excluded {
                    return Err(XivError::QueryBuild {
                        field: format!("({})", g.render_inner()),
                    });
                }
            }
        }
        Ok(())
    }

    fn render(&self, out: &mut String) {
        match self {
            Node::Clause(c) => c.render(out),
            Node::Group(g) => {
                out.push_str(flag_prefix(g.required, g.excluded));
                out.push('(');
                out.push_str(&g.render_inner());
                out.push(')');
            }
        }
    }
}

fn flag_prefix(required: bool, excluded: bool) -> &'static str {
    if required {
        "+"
    } else if excluded {
        "-"
    } else {
        ""
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Fluent builder for search query strings.
///
/// Clauses accumulate in call order; [`QueryBuilder::required`] and
/// [`QueryBuilder::excluded`] flag the most recently added element, and
/// [`QueryBuilder::or_any`] nests whole sub-builders as a parenthesized
/// group. [`QueryBuilder::build`] validates and compiles.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    nodes: Vec<Node>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add an exact-match clause, `field=value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push_clause(field.into(), Operator::Eq, value.into());
        self
    }

    /// Add a partial-match clause, `field~value`.
    pub fn contains(mut self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push_clause(field.into(), Operator::Contains, value.into());
        self
    }

    /// Add a greater-than clause, `field>value`.
    pub fn gt(mut self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push_clause(field.into(), Operator::Gt, value.into());
        self
    }

    /// Add a greater-or-equal clause, `field>=value`.
    pub fn gte(mut self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push_clause(field.into(), Operator::Gte, value.into());
        self
    }

    /// Add a less-than clause, `field<value`.
    pub fn lt(mut self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push_clause(field.into(), Operator::Lt, value.into());
        self
    }

    /// Add a less-or-equal clause, `field<=value`.
    pub fn lte(mut self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push_clause(field.into(), Operator::Lte, value.into());
        self
    }

    /// Mark the most recently added element as required (`+` prefix).
    ///
    /// No-op on an empty builder.
    pub fn required(mut self) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.set_required();
        }
        self
    }

    /// Mark the most recently added element as excluded (`-` prefix).
    ///
    /// No-op on an empty builder.
    pub fn excluded(mut self) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.set_excluded();
        }
        self
    }

    /// Add a parenthesized group whose branches match alternatively.
    pub fn or_any(mut self, branches: impl IntoIterator<Item = QueryBuilder>) -> Self {
        self.nodes.push(Node::Group(Group {
            branches: branches.into_iter().collect(),
            required: false,
            excluded: false,
        }));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Compile to the textual grammar.
    ///
    /// Fails with [`XivError::QueryBuild`] if any element carries both the
    /// required and the excluded flag. An empty builder compiles to `""`.
    pub fn build(&self) -> Result<String> {
        self.check_conflicts()?;
        Ok(self.render())
    }

    fn push_clause(&mut self, field: String, op: Operator, value: QueryValue) {
        self.nodes.push(Node::Clause(Clause {
            field,
            op,
            value,
            required: false,
            excluded: false,
        }));
    }

    fn check_conflicts(&self) -> Result<()> {
        for node in &self.nodes {
            node.check_conflicts()?;
        }
        Ok(())
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            node.render(&mut out);
        }
        out
    }
}
