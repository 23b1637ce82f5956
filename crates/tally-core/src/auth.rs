//! # Roles and Permissions
//!
//! Authentication happens upstream; the engine receives an already
//! authenticated [`Actor`] and only checks that its role may perform the
//! requested operation.
//!
//! ```text
//! ┌──────────────────────────┬─────────┬─────────┬─────────┐
//! │ Permission               │ Cashier │ Manager │  Admin  │
//! ├──────────────────────────┼─────────┼─────────┼─────────┤
//! │ ReadRecords              │    ✓    │    ✓    │    ✓    │
//! │ CreateSale               │    ✓    │    ✓    │    ✓    │
//! │ ValidateCoupon           │    ✓    │    ✓    │    ✓    │
//! │ ManageCustomers          │    ✓    │    ✓    │    ✓    │
//! │ AdjustSale               │         │    ✓    │    ✓    │
//! │ ManagePurchases          │         │    ✓    │    ✓    │
//! │ ManualStock              │         │    ✓    │    ✓    │
//! │ GenerateCoupon           │         │    ✓    │    ✓    │
//! │ ManageCatalog            │         │    ✓    │    ✓    │
//! └──────────────────────────┴─────────┴─────────┴─────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            _ => Err(ValidationError::InvalidFormat {
                field: "role".to_string(),
                reason: "must be admin, manager or cashier".to_string(),
            }),
        }
    }
}

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadRecords,
    CreateSale,
    ValidateCoupon,
    ManageCustomers,
    AdjustSale,
    ManagePurchases,
    ManualStock,
    GenerateCoupon,
    ManageCatalog,
}

impl Permission {
    fn action(&self) -> &'static str {
        match self {
            Permission::ReadRecords => "read records",
            Permission::CreateSale => "create sales",
            Permission::ValidateCoupon => "validate coupons",
            Permission::ManageCustomers => "manage customers",
            Permission::AdjustSale => "update or delete sales",
            Permission::ManagePurchases => "manage purchases",
            Permission::ManualStock => "move stock manually",
            Permission::GenerateCoupon => "generate coupons",
            Permission::ManageCatalog => "manage the catalog",
        }
    }
}

impl Role {
    pub fn allows(&self, permission: Permission) -> bool {
        match self {
            Role::Admin | Role::Manager => true,
            Role::Cashier => matches!(
                permission,
                Permission::ReadRecords
                    | Permission::CreateSale
                    | Permission::ValidateCoupon
                    | Permission::ManageCustomers
            ),
        }
    }
}

/// The authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Actor {
            id: id.into(),
            role,
        }
    }

    /// Fails with `Forbidden` if this actor's role lacks `permission`.
    pub fn authorize(&self, permission: Permission) -> CoreResult<()> {
        if self.role.allows(permission) {
            Ok(())
        } else {
            Err(CoreError::Forbidden {
                role: self.role.to_string(),
                action: permission.action().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cashier_permissions() {
        let cashier = Actor::new("u-1", Role::Cashier);
        assert!(cashier.authorize(Permission::CreateSale).is_ok());
        assert!(cashier.authorize(Permission::ValidateCoupon).is_ok());

        let err = cashier.authorize(Permission::AdjustSale).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Role cashier is not allowed to update or delete sales"
        );
        assert!(cashier.authorize(Permission::ManagePurchases).is_err());
        assert!(cashier.authorize(Permission::GenerateCoupon).is_err());
    }

    #[test]
    fn test_manager_and_admin_allowed_everything() {
        for role in [Role::Manager, Role::Admin] {
            let actor = Actor::new("u-2", role);
            assert!(actor.authorize(Permission::ManualStock).is_ok());
            assert!(actor.authorize(Permission::ManageCatalog).is_ok());
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(" cashier ".parse::<Role>().unwrap(), Role::Cashier);
        assert!("owner".parse::<Role>().is_err());
    }
}
