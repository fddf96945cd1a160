//! The compiled predicate tree (conditions in, execution elsewhere).
//!
//! The compiler produces this tree once per call and never mutates it
//! afterwards; the query-execution layer walks it to build whatever its
//! backend understands. The layer must support conjunction, disjunction,
//! negation, the six comparisons, case-insensitive string matching,
//! closed-interval between, null tests, and existential matching over a
//! collection property.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A property location on the queried entity, possibly nested through
/// entity references (`parent.surname`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyPath(Vec<String>);

impl PropertyPath {
    pub fn root(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Comparison applied to a leaf condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        };
        f.write_str(s)
    }
}

/// String match forms, all case-insensitive. Wildcard markers are stripped
/// before the tree is built; the needle is literal text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StringMatch {
    Exact,
    Prefix,
    Suffix,
    Contains,
}

/// The composite predicate handed to the query layer.
///
/// Composition is structural: the combinators wrap nodes without
/// simplification, so the tree mirrors the left-associative fold order the
/// compiler produced. `All` is the root of an empty compilation and matches
/// every row.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    All,
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    IsNotNull(PropertyPath),
    Compare(PropertyPath, CompareOp, Value),
    Like(PropertyPath, StringMatch, String),
    Between(PropertyPath, Value, Value),
    /// True when at least one element of the collection property satisfies
    /// the inner predicate (correlated existential test).
    AnyMatch(PropertyPath, Box<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::All => f.write_str("ALL"),
            Predicate::And(a, b) => write!(f, "({a} AND {b})"),
            Predicate::Or(a, b) => write!(f, "({a} OR {b})"),
            Predicate::Not(p) => write!(f, "NOT ({p})"),
            Predicate::IsNotNull(path) => write!(f, "{path} IS NOT NULL"),
            Predicate::Compare(path, op, value) => write!(f, "{path} {op} {value}"),
            Predicate::Like(path, m, needle) => {
                let form = match m {
                    StringMatch::Exact => "EQUALSIC",
                    StringMatch::Prefix => "STARTSWITH",
                    StringMatch::Suffix => "ENDSWITH",
                    StringMatch::Contains => "CONTAINS",
                };
                write!(f, "{path} {form} {needle:?}")
            }
            Predicate::Between(path, lo, hi) => write!(f, "{path} BETWEEN {lo} AND {hi}"),
            Predicate::AnyMatch(path, inner) => write!(f, "ANY {path} MATCHES ({inner})"),
        }
    }
}
