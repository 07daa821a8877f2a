use std::str::FromStr;

use sanctum_core::AppError;
use serde::{Deserialize, Serialize};

/// Resources recognized by the sanctuary UI and privileged endpoints.
///
/// Role matrices may carry keys outside this vocabulary; they merge like any
/// other key but are never granted implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Landing dashboard.
    Dashboard,
    /// User directory and profiles.
    Users,
    /// Persona-driven chat agents.
    Agents,
    /// Agent-authored poetry, wisdom and stories.
    Creations,
    /// Hidden lore entries.
    Lore,
    /// Live chat with agents.
    Chat,
    /// Direct messaging between members.
    Messaging,
    /// Community events.
    Events,
    /// Audit trail.
    Audit,
    /// Platform settings.
    Settings,
    /// Role administration.
    Roles,
    /// Ceremony scheduling.
    Ceremonies,
    /// Content moderation guardian.
    Guardian,
}

impl Resource {
    /// Returns a stable storage value for this resource.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Users => "users",
            Self::Agents => "agents",
            Self::Creations => "creations",
            Self::Lore => "lore",
            Self::Chat => "chat",
            Self::Messaging => "messaging",
            Self::Events => "events",
            Self::Audit => "audit",
            Self::Settings => "settings",
            Self::Roles => "roles",
            Self::Ceremonies => "ceremonies",
            Self::Guardian => "guardian",
        }
    }

    /// Returns the action keys the UI recognizes for this resource.
    #[must_use]
    pub fn actions(&self) -> &'static [&'static str] {
        match self {
            Self::Dashboard => &["view"],
            Self::Users => &["view", "create", "edit", "delete"],
            Self::Agents => &["view", "create", "edit", "delete", "curate"],
            Self::Creations => &["view", "create", "edit", "delete", "feature"],
            Self::Lore => &["view", "unlock", "edit"],
            Self::Chat => &["access", "moderate"],
            Self::Messaging => &["read", "send", "moderate"],
            Self::Events => &["view", "create", "edit", "delete"],
            Self::Audit => &["view", "export"],
            Self::Settings => &["view", "edit"],
            Self::Roles => &["view", "create", "edit", "delete"],
            Self::Ceremonies => &["view", "conduct"],
            Self::Guardian => &["view", "configure", "override"],
        }
    }

    /// Returns whether `action` belongs to this resource's vocabulary.
    #[must_use]
    pub fn recognizes_action(&self, action: &str) -> bool {
        self.actions().contains(&action)
    }

    /// Returns all known resources.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Resource] = &[
            Resource::Dashboard,
            Resource::Users,
            Resource::Agents,
            Resource::Creations,
            Resource::Lore,
            Resource::Chat,
            Resource::Messaging,
            Resource::Events,
            Resource::Audit,
            Resource::Settings,
            Resource::Roles,
            Resource::Ceremonies,
            Resource::Guardian,
        ];

        ALL
    }
}

impl FromStr for Resource {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|resource| resource.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown resource '{value}'")))
    }
}
