use serde_json::Value;
use sqlx::{self, postgres::PgArguments, PgPool, Row};

use crate::filter::SqlResult;
use crate::storage::{Record, StorageError};

/// Runs SQL whose rows are projected to JSON objects.
///
/// The inner query is wrapped as `SELECT row_to_json(t) AS row FROM (<query>) t`
/// so every backend column arrives as a JSON value keyed by its name.
pub struct JsonQuery {
    sql: SqlResult,
}

impl JsonQuery {
    pub fn select(inner: SqlResult) -> Self {
        Self {
            sql: SqlResult {
                query: format!("SELECT row_to_json(t) AS row FROM ({}) t", inner.query),
                params: inner.params,
            },
        }
    }

    /// For statements ending in `RETURNING *` wrapped in a CTE named `changed`
    pub fn returning(statement: &str, params: Vec<Value>) -> Self {
        Self {
            sql: SqlResult {
                query: format!("WITH changed AS ({}) SELECT row_to_json(changed) AS row FROM changed", statement),
                params,
            },
        }
    }

    pub fn query(&self) -> &str {
        &self.sql.query
    }

    pub async fn fetch_all(&self, pool: &PgPool) -> Result<Vec<Record>, StorageError> {
        let mut q = sqlx::query(&self.sql.query);
        for p in self.sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    pub async fn fetch_optional(&self, pool: &PgPool) -> Result<Option<Record>, StorageError> {
        let mut q = sqlx::query(&self.sql.query);
        for p in self.sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_optional(pool).await?;
        row.as_ref().map(row_to_record).transpose()
    }
}

pub async fn fetch_count(sql: &SqlResult, pool: &PgPool) -> Result<u64, StorageError> {
    let mut q = sqlx::query(&sql.query);
    for p in sql.params.iter() {
        q = bind_param_query(q, p);
    }
    let row = q.fetch_one(pool).await?;
    let count: i64 = row.try_get("count")?;
    Ok(count.max(0) as u64)
}

/// Runs a statement without a result set and reports the affected row count
pub async fn execute(sql: &SqlResult, pool: &PgPool) -> Result<u64, StorageError> {
    let mut q = sqlx::query(&sql.query);
    for p in sql.params.iter() {
        q = bind_param_query(q, p);
    }
    Ok(q.execute(pool).await?.rows_affected())
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<Record, StorageError> {
    match row.try_get::<Value, _>("row")? {
        Value::Object(record) => Ok(record),
        other => Err(StorageError::MalformedRow(format!("expected object, got {}", other))),
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Record payloads travel as JSONB
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wraps_select_in_row_to_json() {
        let q = JsonQuery::select(SqlResult { query: "SELECT * FROM \"loads\" WHERE 1=1".to_string(), params: vec![] });
        assert_eq!(q.query(), "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"loads\" WHERE 1=1) t");
    }

    #[test]
    fn wraps_returning_statement_in_cte() {
        let q = JsonQuery::returning("DELETE FROM \"trucks\" WHERE \"id\" = $1 RETURNING *", vec![json!("t1")]);
        assert!(q.query().starts_with("WITH changed AS (DELETE FROM"));
        assert!(q.query().ends_with("SELECT row_to_json(changed) AS row FROM changed"));
    }
}
