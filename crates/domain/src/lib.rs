//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod role;
mod security;

pub use role::{
    ActionMatrix, EffectivePermissions, LOWEST_ROLE_PRIORITY, OWNER_ROLE_NAME, OWNER_ROLE_PRIORITY,
    PermissionMatrix, Role, RoleAssignment, RoleId,
};
pub use security::Resource;
