// crates/adapt/src/compile.rs

//! QueryCompiler: one condition set → rows or count statement (PostgreSQL).
//!
//! Both shapes go through [`filtered_select`], so they share the exact same
//! WHERE / ORDER BY / LIMIT and the exact same parameter list. The count shape
//! counts the limited selection, so it never reports more than the rows shape
//! would return.

use crate::condition::ConditionSet;
use crate::schema::{EventCol, ROW_COLUMNS};
use crate::Error;
use sea_query::{Alias, ArrayType, Cond, Expr, Order, PostgresQueryBuilder, Query, SelectStatement, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Rows,
    Count,
}

/// Storage-neutral bind values. No SeaQuery types leak past this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bind {
    Text(String),
    Integer(i64),
    TextArray(Vec<String>),
}

impl fmt::Display for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bind::Text(s) => write!(f, "{s:?}"),
            Bind::Integer(i) => write!(f, "{i}"),
            Bind::TextArray(v) => write!(f, "{v:?}"),
        }
    }
}

impl TryFrom<Value> for Bind {
    type Error = Error;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::String(Some(s)) => Ok(Bind::Text(*s)),
            Value::Int(Some(i)) => Ok(Bind::Integer(i64::from(i))),
            Value::BigInt(Some(i)) => Ok(Bind::Integer(i)),
            Value::Unsigned(Some(u)) => Ok(Bind::Integer(i64::from(u))),
            Value::BigUnsigned(Some(u)) => i64::try_from(u)
                .map(Bind::Integer)
                .map_err(|_| Error::UnsupportedBind(format!("{u} does not fit in i64"))),
            Value::Array(ArrayType::String, Some(items)) => (*items)
                .into_iter()
                .map(|v| match v {
                    Value::String(Some(s)) => Ok(*s),
                    other => Err(Error::UnsupportedBind(format!("{other:?} in text array"))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Bind::TextArray),
            other => Err(Error::UnsupportedBind(format!("{other:?}"))),
        }
    }
}

/// Query text with `$n` placeholders and its parameters in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Bind>,
}

#[tracing::instrument(skip_all, fields(shape = ?shape))]
pub fn compile(set: &ConditionSet, shape: Shape) -> Result<CompiledQuery, Error> {
    let stmt = match shape {
        Shape::Rows => filtered_select(set, Shape::Rows),
        Shape::Count => Query::select()
            .expr(Expr::cust("COUNT(*)"))
            .from_subquery(filtered_select(set, Shape::Count), Alias::new("matched"))
            .to_owned(),
    };

    let (sql, values) = stmt.build(PostgresQueryBuilder);
    let params = values
        .0
        .into_iter()
        .map(Bind::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledQuery { sql, params })
}

/// `SELECT <projection> FROM event WHERE <all conditions> ORDER BY created_at DESC LIMIT $n`
fn filtered_select(set: &ConditionSet, shape: Shape) -> SelectStatement {
    let mut stmt = Query::select();
    match shape {
        Shape::Rows => {
            stmt.columns(ROW_COLUMNS);
        }
        Shape::Count => {
            stmt.expr(Expr::cust("1"));
        }
    }

    let cond = set
        .conditions()
        .iter()
        .cloned()
        .fold(Cond::all(), |all, c| all.add(c));

    stmt.from(EventCol::Table)
        .cond_where(cond)
        .order_by(EventCol::CreatedAt, Order::Desc)
        .limit(set.limit());
    stmt
}
