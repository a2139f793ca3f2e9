// crates/adapt/src/condition.rs

//! ConditionBuilder: sanitized filter → ordered SQL conditions.
//!
//! Values travel inside the expressions, so the bound parameter order is the
//! order conditions are pushed here. The resolved limit rides alongside and is
//! always bound last by the compiler.

use crate::schema::EventCol;
use crate::validate::{resolve_limit, Key32, SanitizedFilter};
use domain::limits::BackendLimits;
use sea_query::{Cond, ConditionExpression, Expr, SimpleExpr, Value};

/// Conditions to AND together, plus the resolved row limit.
#[derive(Debug, Clone)]
pub struct ConditionSet {
    conditions: Vec<ConditionExpression>,
    limit: u64,
}

impl ConditionSet {
    pub fn conditions(&self) -> &[ConditionExpression] {
        &self.conditions
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

pub fn build_conditions(filter: &SanitizedFilter, limits: &BackendLimits) -> ConditionSet {
    let mut conditions: Vec<ConditionExpression> = Vec::new();

    if let Some(ids) = &filter.ids {
        conditions.push(prefix_any(EventCol::Id, ids));
    }
    if let Some(authors) = &filter.authors {
        conditions.push(prefix_any(EventCol::Pubkey, authors));
    }

    if let Some(kinds) = &filter.kinds {
        // Typed integers, inlined.
        let inlined = kinds.iter().map(|k| Expr::cust(k.to_string()));
        conditions.push(Expr::col(EventCol::Kind).is_in(inlined).into());
    }

    if !filter.tag_values.is_empty() {
        conditions.push(tag_overlap(&filter.tag_values).into());
    }

    if let Some(since) = filter.since {
        conditions.push(Expr::col(EventCol::CreatedAt).gte(since).into());
    }
    if let Some(until) = filter.until {
        conditions.push(Expr::col(EventCol::CreatedAt).lte(until).into());
    }

    if conditions.is_empty() {
        conditions.push(Expr::cust("TRUE").into());
    }

    ConditionSet {
        conditions,
        limit: resolve_limit(filter.limit, limits.max_rows),
    }
}

/// `(col LIKE $a OR col LIKE $b ...)` with each pattern bound as `<hex>%`.
fn prefix_any(col: EventCol, keys: &[Key32]) -> ConditionExpression {
    keys.iter()
        .fold(Cond::any(), |cond, key| {
            cond.add(Expr::col(col).like(format!("{}%", hex::encode(key))))
        })
        .into()
}

/// `"tagvalues" && $n`, the flattened values bound as one `text[]`.
///
/// Tag names are not part of the match.
fn tag_overlap(values: &[String]) -> SimpleExpr {
    Expr::cust_with_values(
        format!(r#""{}" && $1"#, EventCol::TagValues.as_str()),
        [Value::from(values.to_vec())],
    )
}
