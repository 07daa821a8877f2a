use std::sync::Arc;

use ipnet::IpNet;
use sanctum_application::{
    AssistService, AssistantClient, AuthorizationService, FixedWindowRateLimiter,
    PermissionResolver, RoleAdminService, RoleAssignmentRepository, RoleRepository,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authorization_service: AuthorizationService,
    pub role_admin_service: RoleAdminService,
    pub assist_service: AssistService,
    pub trusted_proxies: Arc<[IpNet]>,
}

impl AppState {
    pub fn new(
        roles: Arc<dyn RoleRepository>,
        assignments: Arc<dyn RoleAssignmentRepository>,
        owner_emails: &[String],
        assist_limiter: FixedWindowRateLimiter,
        assistant_client: Arc<dyn AssistantClient>,
        trusted_proxies: Vec<IpNet>,
    ) -> Self {
        let authorization_service =
            AuthorizationService::new(assignments.clone(), PermissionResolver::new(owner_emails));

        Self {
            role_admin_service: RoleAdminService::new(
                authorization_service.clone(),
                roles,
                assignments,
            ),
            authorization_service,
            assist_service: AssistService::new(assist_limiter, assistant_client),
            trusted_proxies: trusted_proxies.into(),
        }
    }
}
