//! Declarative permission table.
//!
//! Every (resource, operation) pair has exactly one [`PermissionRule`]; the
//! exhaustive match in [`rule_for`] makes a missing entry a compile error, so
//! there is no implicit default. Rules are static and read-only.

use once_cell::sync::Lazy;
use serde::Serialize;

use super::error::GatewayError;
use super::principal::{Principal, Role, RoleSet};
use super::resource::ResourceType;
use crate::types::Operation;

const ADMIN: RoleSet = RoleSet::of(&[Role::Admin]);
const STAFF: RoleSet = RoleSet::of(&[Role::Admin, Role::Dispatcher]);
const NON_ADMIN: RoleSet = RoleSet::of(&[Role::Dispatcher, Role::Driver]);
const DRIVER: RoleSet = RoleSet::of(&[Role::Driver]);

/// Roles allowed to call the route-optimization proxy
pub const ROUTE_OPTIMIZATION: RoleSet = STAFF;

/// Roles allowed to discard outstanding route and load suggestions in bulk
pub const SUGGESTION_CLEARING: RoleSet = STAFF;

/// Identity predicate narrowing what a scoped role may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The target record is the principal itself (`id == principal.id`)
    SelfRecord,
    /// Loads assigned to the principal
    AssignedDriver,
    /// Time-off requests filed by the principal
    RequestingDriver,
}

impl Scope {
    /// Column holding the owning principal id
    pub fn owner_field(&self) -> &'static str {
        match self {
            Scope::SelfRecord => "id",
            Scope::AssignedDriver => "assigned_driver",
            Scope::RequestingDriver => "driver_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionRule {
    /// Roles with unrestricted access
    pub full: RoleSet,
    /// Roles admitted only through the scope predicate
    pub scoped: Option<(RoleSet, Scope)>,
}

impl PermissionRule {
    pub const fn deny() -> Self {
        Self { full: RoleSet::NONE, scoped: None }
    }

    pub const fn allow(full: RoleSet) -> Self {
        Self { full, scoped: None }
    }

    pub const fn scoped(self, roles: RoleSet, scope: Scope) -> Self {
        Self { full: self.full, scoped: Some((roles, scope)) }
    }

    pub fn is_deny_all(&self) -> bool {
        self.full.is_empty() && self.scoped.map_or(true, |(roles, _)| roles.is_empty())
    }

    pub fn admits(&self, role: Role) -> Option<Access> {
        if self.full.contains(role) {
            return Some(Access::Full);
        }
        match self.scoped {
            Some((roles, scope)) if roles.contains(role) => Some(Access::Scoped(scope)),
            _ => None,
        }
    }
}

/// Outcome of a successful authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Full,
    Scoped(Scope),
}

const fn rule_for(resource: ResourceType, operation: Operation) -> PermissionRule {
    use Operation::*;
    use ResourceType::*;

    match (resource, operation) {
        (User, List) => PermissionRule::allow(ADMIN),
        (User, Read) => PermissionRule::allow(ADMIN).scoped(NON_ADMIN, Scope::SelfRecord),
        (User, Create) => PermissionRule::allow(ADMIN),
        (User, Update) => PermissionRule::allow(ADMIN).scoped(NON_ADMIN, Scope::SelfRecord),
        (User, Delete) => PermissionRule::allow(ADMIN),

        (Driver, List) => PermissionRule::allow(STAFF),
        (Driver, Read) => PermissionRule::allow(STAFF).scoped(DRIVER, Scope::SelfRecord),
        (Driver, Create) => PermissionRule::allow(ADMIN),
        (Driver, Update) => PermissionRule::allow(STAFF).scoped(DRIVER, Scope::SelfRecord),
        (Driver, Delete) => PermissionRule::allow(STAFF),

        (Truck, List) | (Truck, Read) | (Truck, Update) => PermissionRule::allow(STAFF),
        (Truck, Create) => PermissionRule::allow(ADMIN),
        (Truck, Delete) => PermissionRule::deny(),

        (Trailer, List) | (Trailer, Read) | (Trailer, Update) => PermissionRule::allow(STAFF),
        (Trailer, Create) => PermissionRule::allow(ADMIN),
        (Trailer, Delete) => PermissionRule::deny(),

        (Load, List) | (Load, Read) | (Load, Update) => {
            PermissionRule::allow(STAFF).scoped(DRIVER, Scope::AssignedDriver)
        }
        (Load, Create) | (Load, Delete) => PermissionRule::allow(STAFF),

        (TimeOff, List) | (TimeOff, Read) | (TimeOff, Create) | (TimeOff, Update) | (TimeOff, Delete) => {
            PermissionRule::allow(STAFF).scoped(DRIVER, Scope::RequestingDriver)
        }

        (Route, List) | (Route, Read) | (Route, Create) | (Route, Update) | (Route, Delete) => PermissionRule::allow(STAFF),
    }
}

/// Dense lookup table built once from [`rule_for`]
pub struct PolicyTable {
    rules: [[PermissionRule; Operation::COUNT]; ResourceType::COUNT],
}

impl PolicyTable {
    pub fn standard() -> Self {
        let mut rules = [[PermissionRule::deny(); Operation::COUNT]; ResourceType::COUNT];
        for resource in ResourceType::ALL {
            for operation in Operation::ALL {
                rules[resource.index()][operation.index()] = rule_for(resource, operation);
            }
        }
        Self { rules }
    }

    pub fn rule(&self, resource: ResourceType, operation: Operation) -> &PermissionRule {
        &self.rules[resource.index()][operation.index()]
    }

    pub fn authorize(
        &self,
        principal: &Principal,
        resource: ResourceType,
        operation: Operation,
    ) -> Result<Access, GatewayError> {
        self.rule(resource, operation)
            .admits(principal.role)
            .ok_or_else(|| GatewayError::forbidden(principal.role, format!("{} {}", operation, resource)))
    }
}

pub static POLICY: Lazy<PolicyTable> = Lazy::new(PolicyTable::standard);

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal::new("someone", role)
    }

    #[test]
    fn test_every_triple_has_a_decision() {
        let table = PolicyTable::standard();
        for resource in ResourceType::ALL {
            for operation in Operation::ALL {
                for role in Role::ALL {
                    let rule = table.rule(resource, operation);
                    let decision = table.authorize(&principal(role), resource, operation);
                    assert_eq!(decision.is_ok(), rule.admits(role).is_some());
                    assert_eq!(*rule, rule_for(resource, operation));
                }
            }
        }
    }

    #[test]
    fn test_vehicle_delete_is_denied_to_everyone() {
        let table = PolicyTable::standard();
        for resource in [ResourceType::Truck, ResourceType::Trailer] {
            assert!(table.rule(resource, Operation::Delete).is_deny_all());
            for role in Role::ALL {
                let err = table.authorize(&principal(role), resource, Operation::Delete).unwrap_err();
                assert!(matches!(err, GatewayError::Forbidden { .. }));
            }
        }
    }

    #[test]
    fn test_driver_access_is_scoped() {
        let table = PolicyTable::standard();
        let driver = principal(Role::Driver);
        assert_eq!(
            table.authorize(&driver, ResourceType::Load, Operation::List).unwrap(),
            Access::Scoped(Scope::AssignedDriver)
        );
        assert_eq!(
            table.authorize(&driver, ResourceType::TimeOff, Operation::Create).unwrap(),
            Access::Scoped(Scope::RequestingDriver)
        );
        assert_eq!(
            table.authorize(&driver, ResourceType::Driver, Operation::Update).unwrap(),
            Access::Scoped(Scope::SelfRecord)
        );
        assert!(table.authorize(&driver, ResourceType::Truck, Operation::List).is_err());
        assert!(table.authorize(&driver, ResourceType::Load, Operation::Create).is_err());
    }

    #[test]
    fn test_user_administration_is_admin_only() {
        let table = PolicyTable::standard();
        for operation in [Operation::List, Operation::Create, Operation::Delete] {
            assert_eq!(table.authorize(&principal(Role::Admin), ResourceType::User, operation).unwrap(), Access::Full);
            assert!(table.authorize(&principal(Role::Dispatcher), ResourceType::User, operation).is_err());
            assert!(table.authorize(&principal(Role::Driver), ResourceType::User, operation).is_err());
        }
    }

    #[test]
    fn test_route_optimization_roles() {
        assert!(ROUTE_OPTIMIZATION.contains(Role::Admin));
        assert!(ROUTE_OPTIMIZATION.contains(Role::Dispatcher));
        assert!(!ROUTE_OPTIMIZATION.contains(Role::Driver));
    }

    #[test]
    fn test_route_suggestions_are_staff_only() {
        let table = PolicyTable::standard();
        for operation in Operation::ALL {
            assert_eq!(table.authorize(&principal(Role::Dispatcher), ResourceType::Route, operation).unwrap(), Access::Full);
            assert!(table.authorize(&principal(Role::Driver), ResourceType::Route, operation).is_err());
        }
        assert!(SUGGESTION_CLEARING.contains(Role::Admin));
        assert!(!SUGGESTION_CLEARING.contains(Role::Driver));
    }
}
