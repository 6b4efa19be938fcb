use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::{where_filter, Record, Selector, Storage, StorageError};
use crate::database::query_builder::{execute, fetch_count, JsonQuery};
use crate::database::DatabaseManager;
use crate::filter::{Filter, FilterData, SqlResult};
use crate::gateway::ResourceType;

/// Postgres backend.
///
/// Records go in through `jsonb_populate_record`, so column types are taken
/// from the table definition (see `sql/schema.sql`), and come back out through
/// `row_to_json`. Every trait call is a single statement.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect() -> Result<Self, StorageError> {
        Ok(Self::new(DatabaseManager::pool().await?))
    }

    /// `"id" = $n [AND "owner" = $n+1]`, numbering from `first_param`
    fn selector_clause(
        selector: &Selector,
        first_param: usize,
        qualifier: Option<&str>,
    ) -> Result<(String, Vec<Value>), StorageError> {
        let prefix = qualifier.map(|table| format!("\"{}\".", table)).unwrap_or_default();
        let mut clause = format!("{}\"id\" = ${}", prefix, first_param);
        let mut params = vec![Value::String(selector.id.clone())];
        if let Some((column, owner)) = &selector.owner {
            Filter::validate_identifier(column)?;
            clause.push_str(&format!(" AND {}\"{}\" = ${}", prefix, column, first_param + 1));
            params.push(Value::String(owner.clone()));
        }
        Ok((clause, params))
    }

    /// Bulk update keyed through an id subquery so filter columns never collide with `src`
    fn update_where_sql(resource: ResourceType, where_clause: Option<&Value>, changes: Record) -> Result<SqlResult, StorageError> {
        let table = resource.table();
        let mut assignments: Vec<String> = Self::quoted_columns(&changes)?
            .into_iter()
            .map(|column| format!("{column} = src.{column}"))
            .collect();
        assignments.push("\"updated_at\" = now()".to_string());

        let condition = where_filter(resource, where_clause)?.to_where_sql(1)?;
        let mut params = vec![Value::Object(changes)];
        params.extend(condition.params);
        let query = format!(
            "UPDATE \"{table}\" SET {} FROM jsonb_populate_record(NULL::\"{table}\", $1) AS src \
             WHERE \"{table}\".\"id\" IN (SELECT \"id\" FROM \"{table}\" WHERE {})",
            assignments.join(", "),
            condition.query
        );
        Ok(SqlResult { query, params })
    }

    fn quoted_columns(record: &Record) -> Result<Vec<String>, StorageError> {
        record
            .keys()
            .map(|column| {
                Filter::validate_identifier(column)?;
                Ok(format!("\"{}\"", column))
            })
            .collect()
    }
}

#[async_trait]
impl Storage for PgStore {
    async fn list(&self, resource: ResourceType, query: &FilterData) -> Result<Vec<Record>, StorageError> {
        let mut filter = Filter::new(resource.table())?;
        filter.assign(query)?;
        JsonQuery::select(filter.to_sql()?).fetch_all(&self.pool).await
    }

    async fn count(&self, resource: ResourceType, where_clause: Option<&Value>) -> Result<u64, StorageError> {
        let filter = where_filter(resource, where_clause)?;
        fetch_count(&filter.to_count_sql()?, &self.pool).await
    }

    async fn get(&self, resource: ResourceType, selector: &Selector) -> Result<Option<Record>, StorageError> {
        let (clause, params) = Self::selector_clause(selector, 1, None)?;
        let inner = SqlResult {
            query: format!("SELECT * FROM \"{}\" WHERE {}", resource.table(), clause),
            params,
        };
        JsonQuery::select(inner).fetch_optional(&self.pool).await
    }

    async fn create(&self, resource: ResourceType, mut record: Record) -> Result<Record, StorageError> {
        record
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        let id = record.get("id").and_then(Value::as_str).unwrap_or_default().to_string();

        let columns = Self::quoted_columns(&record)?.join(", ");
        let table = resource.table();
        let statement = format!(
            "INSERT INTO \"{table}\" ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::\"{table}\", $1) RETURNING *"
        );

        match JsonQuery::returning(&statement, vec![Value::Object(record)]).fetch_optional(&self.pool).await {
            Ok(Some(created)) => Ok(created),
            Ok(None) => Err(StorageError::MalformedRow("insert returned no row".to_string())),
            Err(StorageError::Sqlx(sqlx::Error::Database(db))) if db.is_unique_violation() => {
                Err(StorageError::Duplicate { resource, id })
            }
            Err(other) => Err(other),
        }
    }

    async fn update(&self, resource: ResourceType, selector: &Selector, changes: Record) -> Result<Record, StorageError> {
        let table = resource.table();
        let mut assignments: Vec<String> = Self::quoted_columns(&changes)?
            .into_iter()
            .map(|column| format!("{column} = src.{column}"))
            .collect();
        assignments.push("\"updated_at\" = now()".to_string());

        let (clause, mut params) = Self::selector_clause(selector, 2, Some(table))?;
        params.insert(0, Value::Object(changes));
        let statement = format!(
            "UPDATE \"{table}\" SET {} FROM jsonb_populate_record(NULL::\"{table}\", $1) AS src WHERE {clause} RETURNING \"{table}\".*",
            assignments.join(", ")
        );

        JsonQuery::returning(&statement, params)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found(resource, selector))
    }

    async fn delete(&self, resource: ResourceType, selector: &Selector) -> Result<Record, StorageError> {
        let (clause, params) = Self::selector_clause(selector, 1, None)?;
        let statement = format!("DELETE FROM \"{}\" WHERE {} RETURNING *", resource.table(), clause);

        JsonQuery::returning(&statement, params)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found(resource, selector))
    }

    async fn update_where(
        &self,
        resource: ResourceType,
        where_clause: Option<&Value>,
        changes: Record,
    ) -> Result<u64, StorageError> {
        execute(&Self::update_where_sql(resource, where_clause, changes)?, &self.pool).await
    }

    async fn delete_where(&self, resource: ResourceType, where_clause: Option<&Value>) -> Result<u64, StorageError> {
        let condition = where_filter(resource, where_clause)?.to_where_sql(0)?;
        let statement = SqlResult {
            query: format!("DELETE FROM \"{}\" WHERE {}", resource.table(), condition.query),
            params: condition.params,
        };
        execute(&statement, &self.pool).await
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
