//! Per-resource validation schemas.
//!
//! A schema is the only path from a raw request body to a storage write. It
//! checks presence per operation, value shape, closed enumerations and
//! field-level write permissions, and normalizes (trim, primitive coercion,
//! canonical timestamp/date formats) without otherwise changing the payload.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use super::error::{FieldError, GatewayError, GatewayResult};
use super::principal::{Role, RoleSet};
use super::resource::ResourceType;
use crate::storage::Record;
use crate::types::Operation;

pub const ROLE_VALUES: &[&str] = &["ADMIN", "DISPATCHER", "DRIVER"];
pub const LOAD_STATUSES: &[&str] = &[
    "UNASSIGNED",
    "SUGGESTED",
    "PENDING",
    "ASSIGNED",
    "IN_PROGRESS",
    "DELIVERED",
    "TERMINATED",
];
pub const DRIVER_STATUSES: &[&str] = &["AVAILABLE", "UNAVAILABLE", "ASSIGNED", "SECONDARY_DUTY", "HAS_EMERGENCY"];
pub const EMPLOYMENT_STATUSES: &[&str] = &["ACTIVE", "ON_LEAVE", "TERMINATED"];
pub const EQUIPMENT_STATUSES: &[&str] = &["AVAILABLE", "ASSIGNED", "MAINTENANCE", "OUT_OF_SERVICE"];
pub const TIME_OFF_STATUSES: &[&str] = &["PENDING", "APPROVED", "DENIED"];

/// Columns maintained by storage; never accepted from clients
const MANAGED_FIELDS: &[&str] = &["created_at", "updated_at"];

const STAFF: RoleSet = RoleSet::of(&[Role::Admin, Role::Dispatcher]);
const ADMIN: RoleSet = RoleSet::of(&[Role::Admin]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text { max_len: usize },
    Email,
    Integer { min: i64, max: i64 },
    Number { min: f64, max: f64 },
    Boolean,
    /// RFC 3339 instant, stored as UTC with millisecond precision
    Timestamp,
    /// Calendar date, stored as `YYYY-MM-DD`
    Date,
    Choice(&'static [&'static str]),
    /// Identifier of another record
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// May not be supplied at all for this operation
    Absent,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    pub on_create: Presence,
    pub on_update: Presence,
    pub writers: RoleSet,
    pub filterable: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            on_create: Presence::Optional,
            on_update: Presence::Optional,
            writers: RoleSet::ALL,
            filterable: false,
        }
    }

    pub const fn required(self) -> Self {
        Self { on_create: Presence::Required, ..self }
    }

    pub const fn nullable(self) -> Self {
        Self { nullable: true, ..self }
    }

    pub const fn create_only(self) -> Self {
        Self { on_update: Presence::Absent, ..self }
    }

    pub const fn writers(self, writers: RoleSet) -> Self {
        Self { writers, ..self }
    }

    pub const fn filterable(self) -> Self {
        Self { filterable: true, ..self }
    }

    pub fn presence(&self, operation: Operation) -> Presence {
        match operation {
            Operation::Create => self.on_create,
            Operation::Update => self.on_update,
            _ => Presence::Absent,
        }
    }

    /// Checks the value's shape and returns its normalized form, or the reason it was rejected
    pub fn normalize(&self, value: &Value) -> Result<Value, String> {
        if value.is_null() {
            return if self.nullable { Ok(Value::Null) } else { Err("must not be null".to_string()) };
        }

        match self.kind {
            FieldKind::Text { max_len } => {
                let text = non_empty_str(value)?;
                if text.chars().count() > max_len {
                    return Err(format!("must be at most {} characters", max_len));
                }
                Ok(Value::String(text.to_string()))
            }
            FieldKind::Email => {
                let email = non_empty_str(value)?;
                if !is_plausible_email(email) {
                    return Err("must be an email address".to_string());
                }
                Ok(Value::String(email.to_string()))
            }
            FieldKind::Integer { min, max } => {
                let n = coerce_integer(value).ok_or_else(|| "must be an integer".to_string())?;
                if n < min || n > max {
                    return Err(format!("must be between {} and {}", min, max));
                }
                Ok(Value::from(n))
            }
            FieldKind::Number { min, max } => {
                let n = coerce_number(value).ok_or_else(|| "must be a number".to_string())?;
                if n < min || n > max {
                    return Err(format!("must be between {} and {}", min, max));
                }
                Number::from_f64(n)
                    .map(Value::Number)
                    .ok_or_else(|| "must be a finite number".to_string())
            }
            FieldKind::Boolean => match value {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err("must be a boolean".to_string()),
                },
                _ => Err("must be a boolean".to_string()),
            },
            FieldKind::Timestamp => {
                let raw = non_empty_str(value)?;
                DateTime::parse_from_rfc3339(raw)
                    .map(|t| Value::String(t.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true)))
                    .map_err(|_| "must be an RFC 3339 timestamp".to_string())
            }
            FieldKind::Date => {
                let raw = non_empty_str(value)?;
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
                    .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                    .map_err(|_| "must be a date (YYYY-MM-DD)".to_string())
            }
            FieldKind::Choice(options) => {
                let choice = non_empty_str(value)?;
                if options.contains(&choice) {
                    Ok(Value::String(choice.to_string()))
                } else {
                    Err(format!("must be one of {}", options.join(", ")))
                }
            }
            FieldKind::Reference => {
                let id = non_empty_str(value)?;
                if id.len() > 64 || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                    return Err("must be a record identifier".to_string());
                }
                Ok(Value::String(id.to_string()))
            }
        }
    }
}

fn non_empty_str(value: &Value) -> Result<&str, String> {
    let text = value.as_str().ok_or_else(|| "must be a string".to_string())?.trim();
    if text.is_empty() {
        return Err("must not be empty".to_string());
    }
    Ok(text)
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Cross-field rule run after every field passed on its own
pub type CrossCheck = fn(&Record) -> Option<FieldError>;

pub struct ValidationSchema {
    pub resource: ResourceType,
    pub fields: &'static [FieldSpec],
    pub cross_check: Option<CrossCheck>,
}

impl ValidationSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validates a create or update body for `role`.
    ///
    /// Field write permissions are checked first and fail with `Forbidden`;
    /// every other problem is collected and reported together as
    /// `InvalidPayload`, sorted by field name.
    pub fn validate(&self, payload: &Value, operation: Operation, role: Role) -> GatewayResult<Record> {
        let object = payload
            .as_object()
            .ok_or_else(|| GatewayError::invalid("body", "must be a JSON object"))?;

        if let Some(field) = object
            .keys()
            .filter_map(|key| self.field(key))
            .find(|def| !def.writers.contains(role))
        {
            return Err(GatewayError::forbidden(role, format!("write '{}' on {}", field.name, self.resource)));
        }

        let mut errors = Vec::new();
        let mut normalized = Map::new();

        for (key, value) in object {
            let Some(def) = self.field(key) else {
                let reason = if MANAGED_FIELDS.contains(&key.as_str()) || key == "id" {
                    "is read-only"
                } else {
                    "unknown field"
                };
                errors.push(FieldError::new(key.as_str(), reason));
                continue;
            };
            if def.presence(operation) == Presence::Absent {
                errors.push(FieldError::new(key.as_str(), format!("cannot be set on {}", operation)));
                continue;
            }
            match def.normalize(value) {
                Ok(v) => {
                    normalized.insert(key.clone(), v);
                }
                Err(reason) => errors.push(FieldError::new(key.as_str(), reason)),
            }
        }

        match operation {
            Operation::Create => {
                for def in self.fields.iter().filter(|f| f.on_create == Presence::Required) {
                    if !object.contains_key(def.name) {
                        errors.push(FieldError::new(def.name, "is required"));
                    }
                }
            }
            Operation::Update if object.is_empty() => {
                errors.push(FieldError::new("body", "no fields to update"));
            }
            _ => {}
        }

        if errors.is_empty() {
            if let Some(error) = self.cross_check.and_then(|check| check(&normalized)) {
                errors.push(error);
            }
        }

        if errors.is_empty() {
            Ok(normalized)
        } else {
            errors.sort_by(|a, b| a.field.cmp(&b.field));
            Err(GatewayError::InvalidPayload(errors))
        }
    }

    /// Turns `?field=value` listing parameters into equality conditions
    pub fn equality_filters(&self, raw: &BTreeMap<String, String>) -> GatewayResult<Map<String, Value>> {
        let mut errors = Vec::new();
        let mut conditions = Map::new();

        for (key, value) in raw {
            match self.field(key).filter(|def| def.filterable) {
                Some(def) => {
                    let candidate = if value == "null" { Value::Null } else { Value::String(value.clone()) };
                    match def.normalize(&candidate) {
                        Ok(v) => {
                            conditions.insert(key.clone(), v);
                        }
                        Err(reason) => errors.push(FieldError::new(key.as_str(), reason)),
                    }
                }
                None => errors.push(FieldError::new(key.as_str(), "is not a filterable field")),
            }
        }

        if errors.is_empty() {
            Ok(conditions)
        } else {
            Err(GatewayError::InvalidPayload(errors))
        }
    }
}

fn time_off_dates_ordered(record: &Record) -> Option<FieldError> {
    let start = record.get("start_date")?.as_str()?;
    let end = record.get("end_date")?.as_str()?;
    // Both are normalized to YYYY-MM-DD, so string order is date order
    (end < start).then(|| FieldError::new("end_date", "must not be before start_date"))
}

static USER_SCHEMA: ValidationSchema = ValidationSchema {
    resource: ResourceType::User,
    fields: &[
        FieldSpec::new("id", FieldKind::Reference).create_only().writers(ADMIN),
        FieldSpec::new("name", FieldKind::Text { max_len: 120 }).required(),
        FieldSpec::new("email", FieldKind::Email).required(),
        FieldSpec::new("role", FieldKind::Choice(ROLE_VALUES)).required().writers(ADMIN).filterable(),
        FieldSpec::new("image", FieldKind::Text { max_len: 2048 }).nullable(),
        FieldSpec::new("assigned_fleet", FieldKind::Text { max_len: 120 }).nullable().writers(ADMIN),
    ],
    cross_check: None,
};

static DRIVER_SCHEMA: ValidationSchema = ValidationSchema {
    resource: ResourceType::Driver,
    fields: &[
        FieldSpec::new("id", FieldKind::Reference).create_only(),
        FieldSpec::new("first_name", FieldKind::Text { max_len: 80 }).required(),
        FieldSpec::new("last_name", FieldKind::Text { max_len: 80 }).required(),
        FieldSpec::new("phone", FieldKind::Text { max_len: 32 }).nullable(),
        FieldSpec::new("license_number", FieldKind::Text { max_len: 32 }).nullable().writers(STAFF),
        FieldSpec::new("home_base", FieldKind::Text { max_len: 255 }).nullable(),
        FieldSpec::new("current_location", FieldKind::Text { max_len: 255 }).nullable(),
        FieldSpec::new("driver_status", FieldKind::Choice(DRIVER_STATUSES)).filterable(),
        FieldSpec::new("employment_status", FieldKind::Choice(EMPLOYMENT_STATUSES)).writers(STAFF).filterable(),
        FieldSpec::new("on_duty", FieldKind::Boolean).filterable(),
    ],
    cross_check: None,
};

static TRUCK_SCHEMA: ValidationSchema = ValidationSchema {
    resource: ResourceType::Truck,
    fields: &[
        FieldSpec::new("truck_number", FieldKind::Integer { min: 0, max: 999_999 }),
        FieldSpec::new("make", FieldKind::Text { max_len: 80 }).required(),
        FieldSpec::new("model", FieldKind::Text { max_len: 80 }).required(),
        FieldSpec::new("year", FieldKind::Integer { min: 1950, max: 2100 }).required(),
        FieldSpec::new("license_plate", FieldKind::Text { max_len: 16 }).nullable(),
        FieldSpec::new("capacity_tons", FieldKind::Number { min: 0.0, max: 200.0 }).nullable(),
        FieldSpec::new("mileage", FieldKind::Integer { min: 0, max: 10_000_000 }),
        FieldSpec::new("truck_status", FieldKind::Choice(EQUIPMENT_STATUSES)).filterable(),
        FieldSpec::new("current_location", FieldKind::Text { max_len: 255 }).nullable(),
        FieldSpec::new("assigned_driver", FieldKind::Reference).nullable().filterable(),
        FieldSpec::new("next_maintenance_date", FieldKind::Date).nullable(),
        FieldSpec::new("registration_expiry", FieldKind::Date).nullable(),
    ],
    cross_check: None,
};

static TRAILER_SCHEMA: ValidationSchema = ValidationSchema {
    resource: ResourceType::Trailer,
    fields: &[
        FieldSpec::new("trailer_number", FieldKind::Integer { min: 0, max: 999_999 }),
        FieldSpec::new("make", FieldKind::Text { max_len: 80 }).nullable(),
        FieldSpec::new("model", FieldKind::Text { max_len: 80 }).required(),
        FieldSpec::new("year", FieldKind::Integer { min: 1950, max: 2100 }).required(),
        FieldSpec::new("license_plate", FieldKind::Text { max_len: 16 }).nullable(),
        FieldSpec::new("max_cargo_capacity", FieldKind::Number { min: 0.0, max: 200_000.0 }).nullable(),
        FieldSpec::new("trailer_status", FieldKind::Choice(EQUIPMENT_STATUSES)).filterable(),
        FieldSpec::new("trailer_vessel_type", FieldKind::Text { max_len: 80 }).nullable(),
        FieldSpec::new("current_location", FieldKind::Text { max_len: 255 }).nullable(),
        FieldSpec::new("next_maintenance_date", FieldKind::Date).nullable(),
    ],
    cross_check: None,
};

static LOAD_SCHEMA: ValidationSchema = ValidationSchema {
    resource: ResourceType::Load,
    fields: &[
        FieldSpec::new("origin", FieldKind::Text { max_len: 255 }).required().writers(STAFF),
        FieldSpec::new("destination", FieldKind::Text { max_len: 255 }).required().writers(STAFF),
        FieldSpec::new("weight", FieldKind::Number { min: 0.0, max: 1_000_000.0 }).required().writers(STAFF),
        FieldSpec::new("status", FieldKind::Choice(LOAD_STATUSES)).filterable(),
        FieldSpec::new("started_at", FieldKind::Timestamp).nullable(),
        FieldSpec::new("pick_up_by", FieldKind::Timestamp).nullable().writers(STAFF),
        FieldSpec::new("due_by", FieldKind::Timestamp).nullable().writers(STAFF),
        FieldSpec::new("assigned_driver", FieldKind::Reference).nullable().writers(STAFF).filterable(),
        FieldSpec::new("assigned_truck", FieldKind::Reference).nullable().writers(STAFF).filterable(),
        FieldSpec::new("assigned_trailer", FieldKind::Reference).nullable().writers(STAFF).filterable(),
        FieldSpec::new("percent_complete", FieldKind::Integer { min: 0, max: 100 }),
        FieldSpec::new("is_active", FieldKind::Boolean).writers(STAFF).filterable(),
    ],
    cross_check: None,
};

static TIME_OFF_SCHEMA: ValidationSchema = ValidationSchema {
    resource: ResourceType::TimeOff,
    fields: &[
        FieldSpec::new("driver_id", FieldKind::Reference).required().create_only().filterable(),
        FieldSpec::new("reason", FieldKind::Text { max_len: 500 }).nullable(),
        FieldSpec::new("start_date", FieldKind::Date).required(),
        FieldSpec::new("end_date", FieldKind::Date).required(),
        FieldSpec::new("status", FieldKind::Choice(TIME_OFF_STATUSES)).writers(STAFF).filterable(),
    ],
    cross_check: Some(time_off_dates_ordered),
};

static ROUTE_SCHEMA: ValidationSchema = ValidationSchema {
    resource: ResourceType::Route,
    fields: &[
        FieldSpec::new("name", FieldKind::Text { max_len: 80 }).nullable().filterable(),
        FieldSpec::new("status", FieldKind::Choice(LOAD_STATUSES)).required().filterable(),
        FieldSpec::new("total_distance", FieldKind::Number { min: 0.0, max: 10_000_000.0 }).nullable(),
        FieldSpec::new("total_cost", FieldKind::Number { min: 0.0, max: 1_000_000_000.0 }).nullable(),
        FieldSpec::new("assigned_driver", FieldKind::Reference).nullable().filterable(),
        FieldSpec::new("assigned_truck", FieldKind::Reference).nullable().filterable(),
        FieldSpec::new("assigned_trailer", FieldKind::Reference).nullable().filterable(),
    ],
    cross_check: None,
};

pub fn schema_for(resource: ResourceType) -> &'static ValidationSchema {
    match resource {
        ResourceType::User => &USER_SCHEMA,
        ResourceType::Driver => &DRIVER_SCHEMA,
        ResourceType::Truck => &TRUCK_SCHEMA,
        ResourceType::Trailer => &TRAILER_SCHEMA,
        ResourceType::Load => &LOAD_SCHEMA,
        ResourceType::TimeOff => &TIME_OFF_SCHEMA,
        ResourceType::Route => &ROUTE_SCHEMA,
    }
}
