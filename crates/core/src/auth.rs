use serde::{Deserialize, Serialize};

/// Role marker the identity provider sets on the reserved owner account.
pub const OWNER_ROLE_MARKER: &str = "owner";

/// User information supplied by the upstream identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: String,
    display_name: String,
    email: Option<String>,
    role_marker: Option<String>,
}

impl UserIdentity {
    /// Creates a user identity from authentication data.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        display_name: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
            email,
            role_marker: None,
        }
    }

    /// Attaches the coarse role marker reported by the identity provider.
    #[must_use]
    pub fn with_role_marker(mut self, role_marker: impl Into<String>) -> Self {
        self.role_marker = Some(role_marker.into());
        self
    }

    /// Returns the stable subject claim from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the provider role marker, if any.
    #[must_use]
    pub fn role_marker(&self) -> Option<&str> {
        self.role_marker.as_deref()
    }

    /// Returns whether the provider flagged this identity as the owner.
    #[must_use]
    pub fn carries_owner_marker(&self) -> bool {
        self.role_marker() == Some(OWNER_ROLE_MARKER)
    }
}
