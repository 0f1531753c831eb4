//! Query AST: the pattern-group shapes a SPARQL-like query compiles down to.
//!
//! No textual parser lives in this crate — callers (or an external parser)
//! construct this AST directly. Node names mirror SPARQL's own grammar
//! (`TriplePattern`, `Optional`, `Union`, `Minus`, `Filter`, `Bind`,
//! `Values`, `GroupBy`, `Having`, `OrderBy`) so a parser can target them
//! one-to-one.

use chrono::{DateTime, Utc};

pub type Var = String;

/// One slot of a triple pattern: bound to a variable, a fixed IRI, or a
/// fixed literal.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Var(Var),
    Iri(String),
    Literal(Literal),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Time(DateTime<Utc>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TriplePattern {
    pub s: Term,
    pub p: Term,
    pub o: Term,
}

/// `(?s rdf:type <IRI>)` sugar — kept distinct from a plain triple pattern
/// since source routing for virtual graphs indexes mappings by class.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassPattern {
    pub s: Term,
    pub class: String,
}

/// A filter/bind expression over currently bound variables.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Var(Var),
    Lit(Literal),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Le(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Ge(Box<Expr>, Box<Expr>),
    In(Box<Expr>, Vec<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    Triple(TriplePattern),
    Class(ClassPattern),
    Filter(Expr),
    Bind { var: Var, expr: Expr },
    Optional(Vec<Pattern>),
    Union(Vec<Vec<Pattern>>),
    Minus(Vec<Pattern>),
    Exists(Vec<Pattern>),
    NotExists(Vec<Pattern>),
    Values { vars: Vec<Var>, rows: Vec<Vec<Literal>> },
    SubSelect(Box<Query>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
}

/// `arg = None` is `count(*)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregate {
    pub kind: AggregateKind,
    pub arg: Option<Var>,
    pub alias: Var,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderKey {
    pub var: Var,
    pub direction: SortDirection,
}

/// Which source(s) a query targets: the ledger's native index, one named
/// virtual graph, or several joined together.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum GraphTarget {
    #[default]
    Native,
    Virtual(String),
    Multi(Vec<String>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub select: Vec<Var>,
    pub aggregates: Vec<Aggregate>,
    pub where_: Vec<Pattern>,
    pub group_by: Vec<Var>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderKey>,
    pub distinct: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub from: GraphTarget,
}
