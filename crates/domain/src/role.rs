use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use sanctum_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::Resource;

/// Machine name of the reserved owner role.
pub const OWNER_ROLE_NAME: &str = "owner";

/// Priority carried by the reserved owner role.
pub const OWNER_ROLE_PRIORITY: i32 = i32::MAX;

/// Priority assumed for role data that does not declare one.
pub const LOWEST_ROLE_PRIORITY: i32 = i32::MIN;

/// Action name to grant flag for a single resource.
pub type ActionMatrix = BTreeMap<String, bool>;

/// Resource name to action matrix, as stored on a role.
///
/// Decoding is lenient: any leaf that is not the JSON literal `true` is read
/// as `false`, and a resource whose matrix is not an object contributes no
/// actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionMatrix(BTreeMap<String, ActionMatrix>);

impl PermissionMatrix {
    /// Creates an empty matrix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a matrix granting every action of the known resource vocabulary.
    #[must_use]
    pub fn full_access() -> Self {
        let mut matrix = Self::new();
        for resource in Resource::all() {
            for action in resource.actions() {
                matrix.set(resource.as_str(), *action, true);
            }
        }

        matrix
    }

    /// Returns the matrix with one more entry set.
    #[must_use]
    pub fn with(mut self, resource: &str, action: &str, allowed: bool) -> Self {
        self.set(resource, action, allowed);
        self
    }

    /// Sets a single resource/action flag.
    pub fn set(&mut self, resource: impl Into<String>, action: impl Into<String>, allowed: bool) {
        self.0
            .entry(resource.into())
            .or_default()
            .insert(action.into(), allowed);
    }

    /// Returns the stored flag for a resource/action pair.
    #[must_use]
    pub fn get(&self, resource: &str, action: &str) -> Option<bool> {
        self.0
            .get(resource)
            .and_then(|actions| actions.get(action))
            .copied()
    }

    /// Returns whether the pair is explicitly granted.
    #[must_use]
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.get(resource, action) == Some(true)
    }

    /// Returns the action matrix of one resource.
    #[must_use]
    pub fn resource(&self, resource: &str) -> Option<&ActionMatrix> {
        self.0.get(resource)
    }

    /// Iterates resources in name order.
    pub fn resources(&self) -> impl Iterator<Item = (&str, &ActionMatrix)> {
        self.0
            .iter()
            .map(|(resource, actions)| (resource.as_str(), actions))
    }

    /// Returns whether the matrix holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Writes every entry of `other` over this matrix.
    ///
    /// Keys present only here are kept; keys present in both take `other`'s
    /// value, including an explicit `false`.
    pub fn overlay(&mut self, other: &Self) {
        for (resource, actions) in &other.0 {
            let target = self.0.entry(resource.clone()).or_default();
            for (action, allowed) in actions {
                target.insert(action.clone(), *allowed);
            }
        }
    }

    /// Decodes a matrix from untrusted JSON, coercing malformed leaves to denial.
    #[must_use]
    pub fn from_json_value(value: &Value) -> Self {
        let Some(resources) = value.as_object() else {
            return Self::new();
        };

        let mut matrix = Self::new();
        for (resource, actions) in resources {
            let entry = matrix.0.entry(resource.clone()).or_default();
            let Some(actions) = actions.as_object() else {
                continue;
            };

            for (action, leaf) in actions {
                entry.insert(action.clone(), leaf.as_bool() == Some(true));
            }
        }

        matrix
    }
}

impl From<BTreeMap<String, ActionMatrix>> for PermissionMatrix {
    fn from(value: BTreeMap<String, ActionMatrix>) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for PermissionMatrix {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json_value(&value))
    }
}

/// Stable integer identifier of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(i64);

impl RoleId {
    /// Wraps a stored identifier.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

fn lowest_priority() -> i32 {
    LOWEST_ROLE_PRIORITY
}

/// Named permission matrix with a conflict priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    id: RoleId,
    name: NonEmptyString,
    display_name: NonEmptyString,
    #[serde(default)]
    permissions: PermissionMatrix,
    #[serde(default = "lowest_priority")]
    priority: i32,
}

impl Role {
    /// Creates a validated role.
    pub fn new(
        id: RoleId,
        name: impl Into<String>,
        display_name: impl Into<String>,
        permissions: PermissionMatrix,
        priority: i32,
    ) -> AppResult<Self> {
        let name: String = name.into();
        let name = NonEmptyString::new(name.trim())?;
        if name.as_str().chars().any(char::is_whitespace) {
            return Err(AppError::Validation(format!(
                "role name '{}' must not contain whitespace",
                name.as_str()
            )));
        }

        Ok(Self {
            id,
            name,
            display_name: NonEmptyString::new(display_name)?,
            permissions,
            priority,
        })
    }

    /// Creates the reserved owner role granting the full vocabulary.
    pub fn owner(id: RoleId) -> AppResult<Self> {
        Self::new(
            id,
            OWNER_ROLE_NAME,
            "Owner",
            PermissionMatrix::full_access(),
            OWNER_ROLE_PRIORITY,
        )
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the unique machine name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the human label.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the role's permission matrix.
    #[must_use]
    pub fn permissions(&self) -> &PermissionMatrix {
        &self.permissions
    }

    /// Returns the conflict priority; higher wins.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns whether this is the reserved owner role.
    #[must_use]
    pub fn is_owner_role(&self) -> bool {
        self.name.as_str() == OWNER_ROLE_NAME
    }
}

/// Link between a user and a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    user_id: String,
    role: Role,
    is_active: bool,
}

impl RoleAssignment {
    /// Creates an assignment.
    #[must_use]
    pub fn new(user_id: impl Into<String>, role: Role, is_active: bool) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            is_active,
        }
    }

    /// Returns the assigned user id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Returns the embedded role.
    #[must_use]
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Returns whether the assignment participates in permission computation.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

/// Merged permissions of all active roles of one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectivePermissions(PermissionMatrix);

impl EffectivePermissions {
    /// Returns whether the pair is granted; missing keys deny.
    #[must_use]
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.0.allows(resource, action)
    }

    /// Returns the merged matrix.
    #[must_use]
    pub fn matrix(&self) -> &PermissionMatrix {
        &self.0
    }

    /// Returns whether nothing was merged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<PermissionMatrix> for EffectivePermissions {
    fn from(value: PermissionMatrix) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;
    use serde_json::json;

    use super::{
        LOWEST_ROLE_PRIORITY, OWNER_ROLE_PRIORITY, PermissionMatrix, Role, RoleId,
    };
    use crate::Resource;

    #[test]
    fn non_boolean_leaves_decode_as_denial() {
        let matrix = PermissionMatrix::from_json_value(&json!({
            "agents": { "view": true, "edit": "true", "delete": 1, "curate": null },
            "chat": true,
        }));

        assert!(matrix.allows("agents", "view"));
        assert_eq!(matrix.get("agents", "edit"), Some(false));
        assert_eq!(matrix.get("agents", "delete"), Some(false));
        assert_eq!(matrix.get("agents", "curate"), Some(false));
        assert!(matrix.resource("chat").is_some_and(BTreeMap::is_empty));
    }

    #[test]
    fn non_object_matrix_decodes_empty() {
        assert!(PermissionMatrix::from_json_value(&json!(["agents"])).is_empty());
    }

    #[test]
    fn role_without_priority_takes_lowest() {
        let role = serde_json::from_value::<Role>(json!({
            "id": 4,
            "name": "wanderer",
            "displayName": "Wanderer",
            "permissions": { "lore": { "view": true } },
        }));

        let role = role.map_err(|error| error.to_string());
        assert!(matches!(&role, Ok(role) if role.priority() == LOWEST_ROLE_PRIORITY));
        assert!(matches!(&role, Ok(role) if role.permissions().allows("lore", "view")));
    }

    #[test]
    fn role_name_rejects_whitespace() {
        let role = Role::new(
            RoleId::new(1),
            "lore keeper",
            "Lore Keeper",
            PermissionMatrix::new(),
            1,
        );
        assert!(role.is_err());
    }

    #[test]
    fn owner_role_grants_full_vocabulary() {
        let Ok(owner) = Role::owner(RoleId::new(1)) else {
            panic!("owner role must be constructible");
        };

        assert!(owner.is_owner_role());
        assert_eq!(owner.priority(), OWNER_ROLE_PRIORITY);
        for resource in Resource::all() {
            for action in resource.actions() {
                assert!(owner.permissions().allows(resource.as_str(), action));
            }
        }
    }

    fn matrix_strategy() -> impl Strategy<Value = PermissionMatrix> {
        proptest::collection::btree_map(
            "[a-d]",
            proptest::collection::btree_map("[a-d]", any::<bool>(), 0..4),
            0..4,
        )
        .prop_map(PermissionMatrix::from)
    }

    proptest! {
        #[test]
        fn overlay_prefers_incoming_values(base in matrix_strategy(), incoming in matrix_strategy()) {
            let mut merged = base.clone();
            merged.overlay(&incoming);

            for (resource, actions) in incoming.resources() {
                for (action, allowed) in actions {
                    prop_assert_eq!(merged.get(resource, action), Some(*allowed));
                }
            }

            for (resource, actions) in base.resources() {
                for (action, allowed) in actions {
                    let expected = incoming.get(resource, action).unwrap_or(*allowed);
                    prop_assert_eq!(merged.get(resource, action), Some(expected));
                }
            }
        }
    }
}
