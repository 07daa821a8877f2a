//! Pure permission resolution over already-fetched role assignments.
//!
//! Merge contract: active roles are applied in ascending priority order, each
//! overwriting earlier values, so the highest-priority role decides any
//! conflicting resource/action pair. Equal priorities keep input order, which
//! makes the later assignment in the input win.

use std::collections::BTreeSet;

use sanctum_core::UserIdentity;
use sanctum_domain::{EffectivePermissions, PermissionMatrix, RoleAssignment};

/// Resolved access of one caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessContext {
    /// Reserved owner identity; every check passes.
    Owner,
    /// Ordinary caller limited to merged role permissions.
    Scoped(EffectivePermissions),
}

impl AccessContext {
    /// Returns whether the caller bypasses role computation.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }

    /// Returns the merged permissions for scoped callers.
    #[must_use]
    pub fn effective(&self) -> Option<&EffectivePermissions> {
        match self {
            Self::Owner => None,
            Self::Scoped(effective) => Some(effective),
        }
    }
}

/// Merges the matrices of all active assignments.
#[must_use]
pub fn compute_effective_permissions(assignments: &[RoleAssignment]) -> EffectivePermissions {
    let mut roles: Vec<_> = assignments
        .iter()
        .filter(|assignment| assignment.is_active())
        .map(RoleAssignment::role)
        .collect();
    roles.sort_by_key(|role| role.priority());

    let mut matrix = PermissionMatrix::new();
    for role in roles {
        matrix.overlay(role.permissions());
    }

    EffectivePermissions::from(matrix)
}

/// Returns whether the caller may perform `action` on `resource`.
#[must_use]
pub fn has_permission(access: &AccessContext, resource: &str, action: &str) -> bool {
    match access {
        AccessContext::Owner => true,
        AccessContext::Scoped(effective) => effective.allows(resource, action),
    }
}

/// Returns whether at least one `(resource, action)` check passes.
#[must_use]
pub fn has_any_permission(access: &AccessContext, checks: &[(&str, &str)]) -> bool {
    access.is_owner()
        || checks
            .iter()
            .any(|(resource, action)| has_permission(access, resource, action))
}

/// Returns whether every `(resource, action)` check passes.
#[must_use]
pub fn has_all_permissions(access: &AccessContext, checks: &[(&str, &str)]) -> bool {
    access.is_owner()
        || checks
            .iter()
            .all(|(resource, action)| has_permission(access, resource, action))
}

/// Returns the active assignment with the highest role priority.
///
/// The first assignment in input order wins a tie.
#[must_use]
pub fn primary_role(assignments: &[RoleAssignment]) -> Option<&RoleAssignment> {
    assignments
        .iter()
        .filter(|assignment| assignment.is_active())
        .fold(None, |best: Option<&RoleAssignment>, candidate| match best {
            Some(current) if current.role().priority() >= candidate.role().priority() => {
                Some(current)
            }
            _ => Some(candidate),
        })
}

/// Owner-aware resolver turning identities and assignments into access.
#[derive(Debug, Clone, Default)]
pub struct PermissionResolver {
    owner_emails: BTreeSet<String>,
}

impl PermissionResolver {
    /// Creates a resolver recognizing the given owner emails.
    #[must_use]
    pub fn new<I, S>(owner_emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            owner_emails: owner_emails
                .into_iter()
                .map(|email| normalize_email(email.as_ref()))
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    /// Returns whether the identity is the reserved owner.
    ///
    /// Matches a configured owner email, the provider's owner marker, or an
    /// active assignment of the reserved owner role.
    #[must_use]
    pub fn is_owner(&self, identity: &UserIdentity, assignments: &[RoleAssignment]) -> bool {
        identity.carries_owner_marker()
            || identity
                .email()
                .is_some_and(|email| self.owner_emails.contains(&normalize_email(email)))
            || assignments
                .iter()
                .any(|assignment| assignment.is_active() && assignment.role().is_owner_role())
    }

    /// Resolves the caller's access context.
    #[must_use]
    pub fn resolve(&self, identity: &UserIdentity, assignments: &[RoleAssignment]) -> AccessContext {
        if self.is_owner(identity, assignments) {
            return AccessContext::Owner;
        }

        AccessContext::Scoped(compute_effective_permissions(assignments))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
