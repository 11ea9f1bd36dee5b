//! Clause data model: predicates, joins, ordering, locks.
//!
//! Predicates form a flat ordered list. Each node remembers the connective
//! that precedes it; the compiler suppresses the connective of the first node
//! and renders the rest strictly left to right. There is no grouping tree and
//! no automatic parenthesization.

use crate::builder::ClauseState;
use crate::value::Value;

/// The connective rendered before a predicate (ignored for the first one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Connective {
    And,
    Or,
}

impl Connective {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Connective::And => " AND ",
            Connective::Or => " OR ",
        }
    }
}

/// One WHERE/HAVING condition.
#[derive(Debug, Clone)]
pub(crate) struct Predicate {
    pub(crate) connective: Connective,
    pub(crate) kind: PredicateKind,
}

#[derive(Debug, Clone)]
pub(crate) enum PredicateKind {
    /// `column op $n`
    Compare {
        column: String,
        op: String,
        value: Value,
    },
    /// `column [NOT] BETWEEN $n AND $m`
    Between {
        column: String,
        low: Value,
        high: Value,
        negated: bool,
    },
    /// `column [NOT] IN ($n, ...)`
    InList {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// `column IS [NOT] NULL`
    Null { column: String, negated: bool },
    /// Verbatim SQL fragment, caller-controlled.
    Raw(String),
    /// `[NOT] EXISTS (SELECT ...)` over a captured sub-builder state.
    Exists {
        state: Box<ClauseState>,
        negated: bool,
    },
}

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    FullOuter,
}

impl JoinKind {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
        }
    }
}

/// `KIND table ON left op right`
#[derive(Debug, Clone)]
pub(crate) struct Join {
    pub(crate) kind: JoinKind,
    pub(crate) table: String,
    pub(crate) left: String,
    pub(crate) op: String,
    pub(crate) right: String,
}

/// One ORDER BY entry.
#[derive(Debug, Clone)]
pub(crate) enum OrderItem {
    /// `column direction`, direction passed through verbatim.
    Column { column: String, direction: String },
    /// Verbatim ORDER BY fragment.
    Raw(String),
    /// `RANDOM()`
    Random,
}

/// Row locking suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockMode {
    ForUpdate,
    ForShare,
}

impl LockMode {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            LockMode::ForUpdate => " FOR UPDATE",
            LockMode::ForShare => " FOR SHARE",
        }
    }
}

/// UNION flavor between snapshotted select parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnionKind {
    Distinct,
    All,
}

impl UnionKind {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            UnionKind::Distinct => " UNION ",
            UnionKind::All => " UNION ALL ",
        }
    }
}
