//! The storage collaborator.
//!
//! The gateway speaks to persistence only through [`Storage`]: one call per
//! gateway command, records as JSON objects keyed by column name.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::database::DatabaseError;
use crate::filter::{Filter, FilterData, FilterError};
use crate::gateway::ResourceType;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type Record = Map<String, Value>;

/// Addresses one record, optionally only when a column names its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub id: String,
    pub owner: Option<(&'static str, String)>,
}

impl Selector {
    pub fn id(id: impl Into<String>) -> Self {
        Self { id: id.into(), owner: None }
    }

    pub fn owned_by(self, column: &'static str, owner: impl Into<String>) -> Self {
        Self { owner: Some((column, owner.into())), ..self }
    }

    /// Whether an in-memory record satisfies this selector
    pub fn matches(&self, record: &Record) -> bool {
        let id_matches = record.get("id").and_then(Value::as_str) == Some(self.id.as_str());
        let owner_matches = match &self.owner {
            Some((column, owner)) => record.get(*column).and_then(Value::as_str) == Some(owner.as_str()),
            None => true,
        };
        id_matches && owner_matches
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{resource} '{id}' not found")]
    NotFound { resource: ResourceType, id: String },

    #[error("duplicate {resource} '{id}'")]
    Duplicate { resource: ResourceType, id: String },

    #[error("invalid query: {0}")]
    Query(#[from] FilterError),

    #[error("malformed row: {0}")]
    MalformedRow(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StorageError {
    pub fn not_found(resource: ResourceType, selector: &Selector) -> Self {
        StorageError::NotFound { resource, id: selector.id.clone() }
    }
}

/// Filter over `resource` limited to the given equality conditions
pub(crate) fn where_filter(resource: ResourceType, where_clause: Option<&Value>) -> Result<Filter, StorageError> {
    let mut filter = Filter::new(resource.table())?;
    if let Some(conditions) = where_clause {
        filter.where_clause(conditions.clone())?;
    }
    Ok(filter)
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn list(&self, resource: ResourceType, query: &FilterData) -> Result<Vec<Record>, StorageError>;

    async fn count(&self, resource: ResourceType, where_clause: Option<&Value>) -> Result<u64, StorageError>;

    async fn get(&self, resource: ResourceType, selector: &Selector) -> Result<Option<Record>, StorageError>;

    /// Inserts a record; storage assigns `id` when absent plus `created_at`/`updated_at`
    async fn create(&self, resource: ResourceType, record: Record) -> Result<Record, StorageError>;

    /// Applies `changes` to the selected record; `NotFound` when nothing matched
    async fn update(&self, resource: ResourceType, selector: &Selector, changes: Record) -> Result<Record, StorageError>;

    /// Removes the selected record and returns it; `NotFound` when nothing matched
    async fn delete(&self, resource: ResourceType, selector: &Selector) -> Result<Record, StorageError>;

    /// Applies `changes` to every record matching `where_clause`; returns how many changed
    async fn update_where(
        &self,
        resource: ResourceType,
        where_clause: Option<&Value>,
        changes: Record,
    ) -> Result<u64, StorageError>;

    /// Removes every record matching `where_clause`; returns how many were removed
    async fn delete_where(&self, resource: ResourceType, where_clause: Option<&Value>) -> Result<u64, StorageError>;

    async fn health_check(&self) -> Result<(), StorageError>;

    fn backend_name(&self) -> &'static str;
}
