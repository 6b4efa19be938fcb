//! Role-based response projection: the narrower read-side schema keyed by
//! (resource, role).

use serde_json::Value;

use super::principal::Role;
use super::resource::ResourceType;
use crate::storage::Record;

/// Columns that never leave the gateway, whatever the role
const NEVER_EXPOSED: &[&str] = &["password_hash"];

const USER_PUBLIC_FIELDS: &[&str] = &["id", "name", "email", "role", "image", "created_at"];
const DRIVER_SELF_HIDDEN: &[&str] = &["employment_status"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    All,
    Without(&'static [&'static str]),
    Only(&'static [&'static str]),
}

impl Projection {
    pub fn allows(&self, field: &str) -> bool {
        if NEVER_EXPOSED.contains(&field) {
            return false;
        }
        match self {
            Projection::All => true,
            Projection::Without(hidden) => !hidden.contains(&field),
            Projection::Only(visible) => visible.contains(&field),
        }
    }

    pub fn apply(&self, record: Record) -> Value {
        Value::Object(record.into_iter().filter(|(key, _)| self.allows(key)).collect())
    }
}

pub fn projection_for(resource: ResourceType, role: Role) -> Projection {
    match (resource, role) {
        (ResourceType::User, Role::Admin) => Projection::All,
        (ResourceType::User, _) => Projection::Only(USER_PUBLIC_FIELDS),
        (ResourceType::Driver, Role::Driver) => Projection::Without(DRIVER_SELF_HIDDEN),
        _ => Projection::All,
    }
}

pub fn shape(resource: ResourceType, role: Role, record: Record) -> Value {
    projection_for(resource, role).apply(record)
}

pub fn shape_many(resource: ResourceType, role: Role, records: Vec<Record>) -> Vec<Value> {
    let projection = projection_for(resource, role);
    records.into_iter().map(|record| projection.apply(record)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_record() -> Record {
        json!({
            "id": "u1",
            "name": "Dana",
            "email": "dana@fleet.example",
            "role": "DISPATCHER",
            "password_hash": "$argon2id$...",
            "email_verified": "2024-01-01T00:00:00.000Z",
            "assigned_fleet": "north",
            "created_at": "2024-01-01T00:00:00.000Z"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_credentials_never_leave_for_any_role() {
        for role in Role::ALL {
            let shaped = shape(ResourceType::User, role, user_record());
            assert!(shaped.get("password_hash").is_none(), "{} saw password_hash", role);
        }
    }

    #[test]
    fn test_non_admin_sees_public_user_fields_only() {
        let shaped = shape(ResourceType::User, Role::Driver, user_record());
        let mut keys: Vec<&String> = shaped.as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["created_at", "email", "id", "name", "role"]);

        let admin_view = shape(ResourceType::User, Role::Admin, user_record());
        assert!(admin_view.get("email_verified").is_some());
    }

    #[test]
    fn test_other_resources_pass_through() {
        let load = json!({"id": "l1", "origin": "Reno"}).as_object().cloned().unwrap();
        assert_eq!(shape(ResourceType::Load, Role::Driver, load.clone()), Value::Object(load));
    }
}
