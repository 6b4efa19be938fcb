//! The Access Gateway.
//!
//! Every managed-resource request flows through [`Gateway::handle`]:
//! authenticate, authorize against the permission table, apply the scope
//! carve-out, validate the payload against the resource schema, issue exactly
//! one storage command, then project the result for the caller's role.

pub mod error;
pub mod listing;
pub mod policy;
pub mod principal;
pub mod projection;
pub mod resource;
pub mod schema;

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

pub use error::{FieldError, GatewayError, GatewayResult};
pub use listing::ListParams;
pub use policy::{Access, PermissionRule, PolicyTable, Scope, POLICY, ROUTE_OPTIMIZATION, SUGGESTION_CLEARING};
pub use principal::{Principal, Role, RoleSet};
pub use resource::ResourceType;

use crate::config::ListingConfig;
use crate::filter::FilterData;
use crate::services::vroom::RouteOptimizer;
use crate::storage::{Record, Selector, Storage};
use crate::types::Operation;

/// Request body as received by the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Absent,
    Json(Value),
    /// Body that could not be parsed; carries the parser's reason
    Malformed(String),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// One inbound operation, transport-independent
#[derive(Debug, Clone)]
pub struct Envelope {
    pub resource: ResourceType,
    pub operation: Operation,
    pub target: Option<String>,
    pub payload: Payload,
    pub query: HashMap<String, String>,
}

impl Envelope {
    fn new(resource: ResourceType, operation: Operation) -> Self {
        Self {
            resource,
            operation,
            target: None,
            payload: Payload::Absent,
            query: HashMap::new(),
        }
    }

    pub fn list(resource: ResourceType, query: HashMap<String, String>) -> Self {
        Self { query, ..Self::new(resource, Operation::List) }
    }

    pub fn read(resource: ResourceType, id: impl Into<String>) -> Self {
        Self { target: Some(id.into()), ..Self::new(resource, Operation::Read) }
    }

    pub fn create(resource: ResourceType, payload: impl Into<Payload>) -> Self {
        Self { payload: payload.into(), ..Self::new(resource, Operation::Create) }
    }

    pub fn update(resource: ResourceType, id: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            target: Some(id.into()),
            payload: payload.into(),
            ..Self::new(resource, Operation::Update)
        }
    }

    pub fn delete(resource: ResourceType, id: impl Into<String>) -> Self {
        Self { target: Some(id.into()), ..Self::new(resource, Operation::Delete) }
    }
}

/// Output after role-based projection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ShapedResponse {
    Record(Value),
    Records(Vec<Value>),
}

impl ShapedResponse {
    pub fn into_value(self) -> Value {
        match self {
            ShapedResponse::Record(value) => value,
            ShapedResponse::Records(values) => Value::Array(values),
        }
    }
}

/// Outstanding suggestions that can be discarded in one bulk command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suggestions {
    /// Loads parked in `SUGGESTED`; reset to `UNASSIGNED` with assignments cleared
    Loads,
    /// Every route suggestion record
    Routes,
}

impl Suggestions {
    pub fn for_resource(resource: ResourceType) -> Option<Self> {
        match resource {
            ResourceType::Load => Some(Suggestions::Loads),
            ResourceType::Route => Some(Suggestions::Routes),
            _ => None,
        }
    }

    pub fn resource(&self) -> ResourceType {
        match self {
            Suggestions::Loads => ResourceType::Load,
            Suggestions::Routes => ResourceType::Route,
        }
    }
}

#[derive(Clone)]
pub struct Gateway {
    storage: Arc<dyn Storage>,
    optimizer: Arc<dyn RouteOptimizer>,
    policy: &'static PolicyTable,
    listing: ListingConfig,
}

impl Gateway {
    pub fn new(storage: Arc<dyn Storage>, optimizer: Arc<dyn RouteOptimizer>, listing: ListingConfig) -> Self {
        Self {
            storage,
            optimizer,
            policy: &POLICY,
            listing,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub async fn handle(&self, principal: Option<&Principal>, envelope: Envelope) -> GatewayResult<ShapedResponse> {
        let principal = principal.ok_or(GatewayError::Unauthenticated)?;
        let Envelope { resource, operation, target, payload, query } = envelope;

        let access = self.policy.authorize(principal, resource, operation).map_err(|e| {
            warn!(principal = %principal.id, role = %principal.role, %resource, %operation, "access denied");
            e
        })?;
        debug!(principal = %principal.id, role = %principal.role, %resource, %operation, ?access, "access granted");

        let shaped = match (operation, target) {
            (Operation::List, _) => {
                return self.list(principal, access, resource, query).await.map(ShapedResponse::Records);
            }
            (Operation::Create, _) => self.create(principal, access, resource, payload).await?,
            (_, None) => return Err(GatewayError::invalid("id", "is required")),
            (Operation::Read, Some(id)) => self.read(principal, access, resource, id).await?,
            (Operation::Update, Some(id)) => self.update(principal, access, resource, id, payload).await?,
            (Operation::Delete, Some(id)) => self.delete(principal, access, resource, id).await?,
        };
        Ok(ShapedResponse::Record(shaped))
    }

    async fn list(
        &self,
        principal: &Principal,
        access: Access,
        resource: ResourceType,
        query: HashMap<String, String>,
    ) -> GatewayResult<Vec<Value>> {
        let params = ListParams::from_query(query)?;
        let mut conditions = schema::schema_for(resource).equality_filters(&params.filters)?;
        if let Access::Scoped(scope) = access {
            let owner = Value::String(principal.id.clone());
            match conditions.get(scope.owner_field()) {
                Some(requested) if *requested != owner => {
                    debug!(principal = %principal.id, %resource, field = scope.owner_field(), "filter excludes every owned record");
                    return Ok(Vec::new());
                }
                _ => {
                    conditions.insert(scope.owner_field().to_string(), owner);
                }
            }
        }
        let where_clause = (!conditions.is_empty()).then_some(Value::Object(conditions));

        let offset = if params.random {
            let total = self.storage.count(resource, where_clause.as_ref()).await.map_err(storage_failure)?;
            Some(listing::sample_offset(total))
        } else {
            None
        };

        let query = FilterData {
            where_clause,
            order: listing::default_order(resource),
            limit: params.effective_limit(&self.listing),
            offset,
        };
        let records = self.storage.list(resource, &query).await.map_err(storage_failure)?;
        Ok(projection::shape_many(resource, principal.role, records))
    }

    async fn read(&self, principal: &Principal, access: Access, resource: ResourceType, id: String) -> GatewayResult<Value> {
        let selector = self.selector(principal, access, resource, Operation::Read, id)?;
        let record = self
            .storage
            .get(resource, &selector)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| GatewayError::not_found(resource, selector.id.clone()))?;
        Ok(projection::shape(resource, principal.role, record))
    }

    async fn create(
        &self,
        principal: &Principal,
        access: Access,
        resource: ResourceType,
        payload: Payload,
    ) -> GatewayResult<Value> {
        let body = require_body(payload)?;
        let record = schema::schema_for(resource).validate(&body, Operation::Create, principal.role)?;
        check_payload_owner(principal, access, resource, Operation::Create, &record)?;

        let created = self.storage.create(resource, record).await.map_err(storage_failure)?;
        Ok(projection::shape(resource, principal.role, created))
    }

    async fn update(
        &self,
        principal: &Principal,
        access: Access,
        resource: ResourceType,
        id: String,
        payload: Payload,
    ) -> GatewayResult<Value> {
        let selector = self.selector(principal, access, resource, Operation::Update, id)?;
        let body = require_body(payload)?;
        let changes = schema::schema_for(resource).validate(&body, Operation::Update, principal.role)?;
        check_payload_owner(principal, access, resource, Operation::Update, &changes)?;

        let updated = self.storage.update(resource, &selector, changes).await.map_err(storage_failure)?;
        Ok(projection::shape(resource, principal.role, updated))
    }

    async fn delete(&self, principal: &Principal, access: Access, resource: ResourceType, id: String) -> GatewayResult<Value> {
        let selector = self.selector(principal, access, resource, Operation::Delete, id)?;
        let deleted = self.storage.delete(resource, &selector).await.map_err(storage_failure)?;
        Ok(projection::shape(resource, principal.role, deleted))
    }

    /// Applies the scope carve-out to a record-addressed operation.
    ///
    /// Self scope is decided here from the identifier alone; ownership scopes
    /// become a guard on the storage command, so a record owned by someone
    /// else is indistinguishable from a missing one.
    fn selector(
        &self,
        principal: &Principal,
        access: Access,
        resource: ResourceType,
        operation: Operation,
        id: String,
    ) -> GatewayResult<Selector> {
        match access {
            Access::Full => Ok(Selector::id(id)),
            Access::Scoped(Scope::SelfRecord) if id == principal.id => Ok(Selector::id(id)),
            Access::Scoped(Scope::SelfRecord) => {
                warn!(principal = %principal.id, %resource, %operation, target = %id, "self-access mismatch");
                Err(GatewayError::forbidden(principal.role, format!("{} another {}", operation, resource)))
            }
            Access::Scoped(scope) => Ok(Selector::id(id).owned_by(scope.owner_field(), principal.id.clone())),
        }
    }

    /// Discards outstanding suggestions with a single bulk storage command.
    pub async fn clear_suggestions(&self, principal: Option<&Principal>, target: Suggestions) -> GatewayResult<Value> {
        let principal = principal.ok_or(GatewayError::Unauthenticated)?;
        let resource = target.resource();
        if !SUGGESTION_CLEARING.contains(principal.role) {
            warn!(principal = %principal.id, role = %principal.role, %resource, "suggestion clearing denied");
            return Err(GatewayError::forbidden(principal.role, format!("clear {} suggestions", resource)));
        }

        let cleared = match target {
            Suggestions::Loads => {
                let suggested = json!({ "status": "SUGGESTED" });
                self.storage.update_where(resource, Some(&suggested), load_suggestion_reset()).await
            }
            Suggestions::Routes => self.storage.delete_where(resource, None).await,
        }
        .map_err(storage_failure)?;

        debug!(principal = %principal.id, %resource, cleared, "suggestions cleared");
        Ok(json!({ "resource": resource.segment(), "cleared": cleared }))
    }

    /// Forwards a route-optimization request to the upstream solver.
    ///
    /// The body is checked for the minimal VROOM shape (`vehicles` plus `jobs`
    /// or `shipments`) and otherwise passed through unchanged, as is the
    /// solver's answer.
    pub async fn optimize_routes(&self, principal: Option<&Principal>, payload: Payload) -> GatewayResult<Value> {
        let principal = principal.ok_or(GatewayError::Unauthenticated)?;
        if !ROUTE_OPTIMIZATION.contains(principal.role) {
            warn!(principal = %principal.id, role = %principal.role, "route optimization denied");
            return Err(GatewayError::forbidden(principal.role, "request route optimization"));
        }

        let body = require_body(payload)?;
        validate_optimization_request(&body)?;

        let started = Instant::now();
        let solution = self.optimizer.optimize(&body).await.map_err(|e| {
            error!(error = %e, elapsed_ms = started.elapsed().as_millis() as u64, "route optimization failed");
            GatewayError::Upstream(e)
        })?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "route optimization completed");
        Ok(solution)
    }
}

fn storage_failure(err: crate::storage::StorageError) -> GatewayError {
    let mapped = GatewayError::from(err);
    if let GatewayError::Storage(cause) = &mapped {
        error!(error = %cause, "storage command failed");
    }
    mapped
}

fn load_suggestion_reset() -> Record {
    let mut reset = Record::new();
    reset.insert("status".to_string(), json!("UNASSIGNED"));
    for column in ["assigned_driver", "assigned_truck", "assigned_trailer"] {
        reset.insert(column.to_string(), Value::Null);
    }
    reset
}

fn require_body(payload: Payload) -> GatewayResult<Value> {
    match payload {
        Payload::Json(value) => Ok(value),
        Payload::Absent => Err(GatewayError::invalid("body", "is required")),
        Payload::Malformed(reason) => Err(GatewayError::invalid("body", reason)),
    }
}

/// A scoped principal may only write records it owns
fn check_payload_owner(
    principal: &Principal,
    access: Access,
    resource: ResourceType,
    operation: Operation,
    record: &Record,
) -> GatewayResult<()> {
    let Access::Scoped(scope) = access else {
        return Ok(());
    };
    match record.get(scope.owner_field()) {
        None => Ok(()),
        Some(Value::String(owner)) if *owner == principal.id => Ok(()),
        Some(_) => Err(GatewayError::forbidden(
            principal.role,
            format!("{} a {} on behalf of someone else", operation, resource),
        )),
    }
}

fn validate_optimization_request(body: &Value) -> GatewayResult<()> {
    let object = body
        .as_object()
        .ok_or_else(|| GatewayError::invalid("body", "must be a JSON object"))?;

    let non_empty_array = |key: &str| matches!(object.get(key), Some(Value::Array(items)) if !items.is_empty());

    let mut errors = Vec::new();
    if !non_empty_array("vehicles") {
        errors.push(FieldError::new("vehicles", "must be a non-empty array"));
    }
    if !non_empty_array("jobs") && !non_empty_array("shipments") {
        errors.push(FieldError::new("jobs", "jobs or shipments must be a non-empty array"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::InvalidPayload(errors))
    }
}
