//! # Access Control
//!
//! The role → permission matrix and the single authorization gate every
//! route calls before doing work.
//!
//! ## Matrix
//! ```text
//! ┌──────────────────────┬───────┬─────────┬─────────┬────────┬──────┐
//! │ Permission           │ ADMIN │ MANAGER │ CASHIER │ WAITER │ CHEF │
//! ├──────────────────────┼───────┼─────────┼─────────┼────────┼──────┤
//! │ ManageStaff          │   ✓   │         │         │        │      │
//! │ ManageSettings       │   ✓   │         │         │        │      │
//! │ ManageCatalog        │   ✓   │    ✓    │         │        │      │
//! │ ManageCustomers      │   ✓   │    ✓    │         │        │      │
//! │ ManageSuppliers      │   ✓   │    ✓    │         │        │      │
//! │ ManageInventory      │   ✓   │    ✓    │         │        │      │
//! │ ViewReports          │   ✓   │    ✓    │         │        │      │
//! │ ManageExpenses       │   ✓   │    ✓    │         │        │      │
//! │ ViewAllSales         │   ✓   │    ✓    │         │        │      │
//! │ Checkout             │   ✓   │    ✓    │    ✓    │        │      │
//! │ SettleBill           │   ✓   │    ✓    │    ✓    │        │      │
//! │ ViewOwnSales         │   ✓   │    ✓    │    ✓    │        │      │
//! │ CreateOrder          │   ✓   │    ✓    │    ✓    │   ✓    │      │
//! │ ServeOrder           │   ✓   │    ✓    │    ✓    │   ✓    │      │
//! │ ManageTables         │   ✓   │    ✓    │         │   ✓    │      │
//! │ ViewKitchen          │   ✓   │    ✓    │         │        │  ✓   │
//! │ StartPreparation     │   ✓   │    ✓    │         │        │  ✓   │
//! │ FinishPreparation    │   ✓   │    ✓    │         │        │  ✓   │
//! │ ViewCatalog          │   ✓   │    ✓    │    ✓    │   ✓    │  ✓   │
//! └──────────────────────┴───────┴─────────┴─────────┴────────┴──────┘
//! ```
//!
//! `ManageSettings` and `ManageTables` are grants only: no route checks them
//! yet. They stay in the matrix so the role rows match the floor plan and
//! settings screens clients already gate on.
//!
//! ## Gate
//! ```text
//! authorize(None, _)                     → Err(Unauthenticated)   401
//! authorize(Some(chef), Some(Checkout))  → Err(Forbidden{..})     403
//! authorize(Some(chef), Some(ViewKitchen)) → Ok(chef)
//! authorize(Some(any), None)             → Ok(any)   (login only)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::AccessError;
use crate::types::Role;

// =============================================================================
// Permission
// =============================================================================

/// Something a role may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    ManageStaff,
    /// Matrix-only; no route requires it yet.
    ManageSettings,
    ManageCatalog,
    ManageCustomers,
    ManageSuppliers,
    ManageInventory,
    ViewReports,
    ManageExpenses,
    CreateOrder,
    Checkout,
    ViewAllSales,
    ViewOwnSales,
    ViewKitchen,
    StartPreparation,
    FinishPreparation,
    ServeOrder,
    SettleBill,
    /// Matrix-only; no route requires it yet.
    ManageTables,
    ViewCatalog,
}

impl Permission {
    pub const ALL: [Permission; 19] = [
        Permission::ManageStaff,
        Permission::ManageSettings,
        Permission::ManageCatalog,
        Permission::ManageCustomers,
        Permission::ManageSuppliers,
        Permission::ManageInventory,
        Permission::ViewReports,
        Permission::ManageExpenses,
        Permission::CreateOrder,
        Permission::Checkout,
        Permission::ViewAllSales,
        Permission::ViewOwnSales,
        Permission::ViewKitchen,
        Permission::StartPreparation,
        Permission::FinishPreparation,
        Permission::ServeOrder,
        Permission::SettleBill,
        Permission::ManageTables,
        Permission::ViewCatalog,
    ];
}

/// Reads as the tail of "ROLE may not ...".
impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phrase = match self {
            Permission::ManageStaff => "manage staff",
            Permission::ManageSettings => "manage settings",
            Permission::ManageCatalog => "manage the catalog",
            Permission::ManageCustomers => "manage customers",
            Permission::ManageSuppliers => "manage suppliers",
            Permission::ManageInventory => "adjust inventory",
            Permission::ViewReports => "view reports",
            Permission::ManageExpenses => "manage expenses",
            Permission::CreateOrder => "create orders",
            Permission::Checkout => "check out sales",
            Permission::ViewAllSales => "view all sales",
            Permission::ViewOwnSales => "view sales",
            Permission::ViewKitchen => "view the kitchen queue",
            Permission::StartPreparation => "start preparing orders",
            Permission::FinishPreparation => "mark orders ready",
            Permission::ServeOrder => "serve orders",
            Permission::SettleBill => "settle bills",
            Permission::ManageTables => "manage tables",
            Permission::ViewCatalog => "view the catalog",
        };
        f.write_str(phrase)
    }
}

// =============================================================================
// Role → Permissions
// =============================================================================

const MANAGER_EXCLUDED: [Permission; 2] = [Permission::ManageStaff, Permission::ManageSettings];

const CASHIER: [Permission; 6] = [
    Permission::Checkout,
    Permission::SettleBill,
    Permission::ViewOwnSales,
    Permission::CreateOrder,
    Permission::ServeOrder,
    Permission::ViewCatalog,
];

const WAITER: [Permission; 4] = [
    Permission::ManageTables,
    Permission::CreateOrder,
    Permission::ServeOrder,
    Permission::ViewCatalog,
];

const CHEF: [Permission; 4] = [
    Permission::ViewKitchen,
    Permission::StartPreparation,
    Permission::FinishPreparation,
    Permission::ViewCatalog,
];

impl Role {
    /// Every permission this role holds.
    pub fn permissions(&self) -> Vec<Permission> {
        match self {
            Role::Admin => Permission::ALL.to_vec(),
            Role::Manager => Permission::ALL
                .into_iter()
                .filter(|p| !MANAGER_EXCLUDED.contains(p))
                .collect(),
            Role::Cashier => CASHIER.to_vec(),
            Role::Waiter => WAITER.to_vec(),
            Role::Chef => CHEF.to_vec(),
        }
    }

    #[inline]
    pub fn can(&self, permission: Permission) -> bool {
        match self {
            Role::Admin => true,
            Role::Manager => !MANAGER_EXCLUDED.contains(&permission),
            Role::Cashier => CASHIER.contains(&permission),
            Role::Waiter => WAITER.contains(&permission),
            Role::Chef => CHEF.contains(&permission),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// An authenticated staff member, as decoded from a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Session {
    #[inline]
    pub fn can(&self, permission: Permission) -> bool {
        self.role.can(permission)
    }
}

// =============================================================================
// Gate
// =============================================================================

/// Checks that a session exists and, when `required` is set, that its role
/// grants the permission.
pub fn authorize(
    session: Option<&Session>,
    required: Option<Permission>,
) -> Result<&Session, AccessError> {
    let session = session.ok_or(AccessError::Unauthenticated)?;

    match required {
        Some(permission) if !session.role.can(permission) => Err(AccessError::Forbidden {
            role: session.role,
            permission,
        }),
        _ => Ok(session),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
