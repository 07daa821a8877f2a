//! Application services and ports.

#![forbid(unsafe_code)]

mod assist_service;
mod authorization_service;
mod permission_resolver;
mod rate_limit_service;
mod role_admin_service;

pub use assist_service::{
    AssistReply, AssistRequest, AssistService, AssistantClient, MAX_ASSIST_PROMPT_CHARS,
    rate_limit_key,
};
pub use authorization_service::{AuthorizationService, PermissionSummary, RoleAssignmentRepository};
pub use permission_resolver::{
    AccessContext, PermissionResolver, compute_effective_permissions, has_all_permissions,
    has_any_permission, has_permission, primary_role,
};
pub use rate_limit_service::{
    AttemptInfo, FixedWindowRateLimiter, RateLimitDecision, RateLimitRepository, RateLimitRule,
};
pub use role_admin_service::{CreateRoleInput, RoleAdminService, RoleRepository};
