use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{where_filter, Record, Selector, Storage, StorageError};
use crate::filter::{Filter, FilterData};
use crate::gateway::ResourceType;

/// In-process storage backend used for development and tests.
///
/// Each table is a `Vec` in insertion order behind one `RwLock`; every call
/// takes the lock once, so each command is atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<ResourceType, Vec<Record>>>,
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts fixture rows verbatim, filling in `id`/timestamps only when missing
    pub async fn seed(&self, resource: ResourceType, rows: impl IntoIterator<Item = Value>) {
        let mut tables = self.tables.write().await;
        let table = tables.entry(resource).or_default();
        for row in rows {
            if let Value::Object(mut record) = row {
                stamp_new(&mut record);
                table.push(record);
            }
        }
    }

    pub async fn snapshot(&self, resource: ResourceType) -> Vec<Record> {
        self.tables.read().await.get(&resource).cloned().unwrap_or_default()
    }
}

fn stamp_new(record: &mut Record) {
    record
        .entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    let created = record.get("created_at").cloned().unwrap_or_else(now);
    record.entry("created_at").or_insert(created.clone());
    record.entry("updated_at").or_insert(created);
}

#[async_trait]
impl Storage for MemoryStore {
    async fn list(&self, resource: ResourceType, query: &FilterData) -> Result<Vec<Record>, StorageError> {
        let mut filter = Filter::new(resource.table())?;
        filter.assign(query)?;

        let tables = self.tables.read().await;
        match tables.get(&resource) {
            Some(rows) => Ok(filter.apply(rows)?),
            None => Ok(Vec::new()),
        }
    }

    async fn count(&self, resource: ResourceType, where_clause: Option<&Value>) -> Result<u64, StorageError> {
        let filter = where_filter(resource, where_clause)?;

        let tables = self.tables.read().await;
        let rows = tables.get(&resource).map(Vec::as_slice).unwrap_or_default();
        Ok(filter.apply(rows)?.len() as u64)
    }

    async fn get(&self, resource: ResourceType, selector: &Selector) -> Result<Option<Record>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&resource)
            .and_then(|rows| rows.iter().find(|row| selector.matches(row)))
            .cloned())
    }

    async fn create(&self, resource: ResourceType, mut record: Record) -> Result<Record, StorageError> {
        record.remove("created_at");
        record.remove("updated_at");
        stamp_new(&mut record);

        let mut tables = self.tables.write().await;
        let table = tables.entry(resource).or_default();
        if table.iter().any(|row| row.get("id") == record.get("id")) {
            let id = record.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            return Err(StorageError::Duplicate { resource, id });
        }
        table.push(record.clone());
        Ok(record)
    }

    async fn update(&self, resource: ResourceType, selector: &Selector, changes: Record) -> Result<Record, StorageError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(&resource)
            .and_then(|rows| rows.iter_mut().find(|row| selector.matches(row)))
            .ok_or_else(|| StorageError::not_found(resource, selector))?;

        for (key, value) in changes {
            row.insert(key, value);
        }
        row.insert("updated_at".to_string(), now());
        Ok(row.clone())
    }

    async fn delete(&self, resource: ResourceType, selector: &Selector) -> Result<Record, StorageError> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(&resource)
            .ok_or_else(|| StorageError::not_found(resource, selector))?;
        let position = rows
            .iter()
            .position(|row| selector.matches(row))
            .ok_or_else(|| StorageError::not_found(resource, selector))?;
        Ok(rows.remove(position))
    }

    async fn update_where(
        &self,
        resource: ResourceType,
        where_clause: Option<&Value>,
        changes: Record,
    ) -> Result<u64, StorageError> {
        let filter = where_filter(resource, where_clause)?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&resource) else {
            return Ok(0);
        };

        let stamp = now();
        let mut changed = 0;
        for row in rows.iter_mut() {
            if filter.matches(row)? {
                for (key, value) in &changes {
                    row.insert(key.clone(), value.clone());
                }
                row.insert("updated_at".to_string(), stamp.clone());
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_where(&self, resource: ResourceType, where_clause: Option<&Value>) -> Result<u64, StorageError> {
        let filter = where_filter(resource, where_clause)?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&resource) else {
            return Ok(0);
        };

        let doomed = rows.iter().map(|row| filter.matches(row)).collect::<Result<Vec<bool>, _>>()?;
        let before = rows.len();
        let mut flags = doomed.into_iter();
        rows.retain(|_| !flags.next().unwrap_or(false));
        Ok((before - rows.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
