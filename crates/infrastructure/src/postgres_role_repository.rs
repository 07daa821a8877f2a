use async_trait::async_trait;
use sanctum_application::{CreateRoleInput, RoleAssignmentRepository, RoleRepository};
use sanctum_core::{AppError, AppResult};
use sanctum_domain::{LOWEST_ROLE_PRIORITY, PermissionMatrix, Role, RoleAssignment, RoleId};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed role and assignment repository.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upserts the reserved owner role with the full vocabulary.
    pub async fn ensure_owner_role(&self) -> AppResult<Role> {
        let template = Role::owner(RoleId::new(0))?;
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            INSERT INTO roles (name, display_name, permissions, priority)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE
            SET permissions = EXCLUDED.permissions,
                priority = EXCLUDED.priority
            RETURNING id, name, display_name, permissions, priority
            "#,
        )
        .bind(template.name())
        .bind(template.display_name())
        .bind(Json(template.permissions()))
        .bind(template.priority())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to ensure owner role: {error}")))?;

        row.into_role()
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    display_name: String,
    permissions: Json<Value>,
    priority: Option<i32>,
}

impl RoleRow {
    fn into_role(self) -> AppResult<Role> {
        Role::new(
            RoleId::new(self.id),
            self.name,
            self.display_name,
            PermissionMatrix::from_json_value(&self.permissions.0),
            self.priority.unwrap_or(LOWEST_ROLE_PRIORITY),
        )
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    user_id: String,
    is_active: bool,
    role_id: i64,
    role_name: String,
    role_display_name: String,
    role_permissions: Json<Value>,
    role_priority: Option<i32>,
}

impl AssignmentRow {
    fn into_assignment(self) -> AppResult<RoleAssignment> {
        let role = RoleRow {
            id: self.role_id,
            name: self.role_name,
            display_name: self.role_display_name,
            permissions: self.role_permissions,
            priority: self.role_priority,
        }
        .into_role()?;

        Ok(RoleAssignment::new(self.user_id, role, self.is_active))
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, display_name, permissions, priority
            FROM roles
            ORDER BY priority DESC NULLS LAST, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        rows.into_iter().map(RoleRow::into_role).collect()
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, display_name, permissions, priority
            FROM roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find role {role_id}: {error}")))?;

        row.map(RoleRow::into_role).transpose()
    }

    async fn create_role(&self, input: CreateRoleInput) -> AppResult<Role> {
        let draft = Role::new(
            RoleId::new(0),
            input.name,
            input.display_name,
            input.permissions,
            input.priority,
        )?;

        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            INSERT INTO roles (name, display_name, permissions, priority)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, display_name, permissions, priority
            "#,
        )
        .bind(draft.name())
        .bind(draft.display_name())
        .bind(Json(draft.permissions()))
        .bind(draft.priority())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_role_conflict(error, draft.name()))?;

        row.into_role()
    }

    async fn assign_role(&self, user_id: &str, role_id: RoleId) -> AppResult<RoleAssignment> {
        let Some(role) = self.find_role(role_id).await? else {
            return Err(AppError::NotFound(format!("role {role_id} does not exist")));
        };

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id, is_active)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (user_id, role_id) DO UPDATE
            SET is_active = TRUE
            "#,
        )
        .bind(user_id)
        .bind(role_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if let sqlx::Error::Database(database_error) = &error
                && database_error.code().as_deref() == Some("23503")
            {
                return AppError::NotFound(format!("role {role_id} does not exist"));
            }

            AppError::Internal(format!("failed to assign role {role_id}: {error}"))
        })?;

        Ok(RoleAssignment::new(user_id, role, true))
    }

    async fn deactivate_assignment(&self, user_id: &str, role_id: RoleId) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE user_roles
            SET is_active = FALSE
            WHERE user_id = $1 AND role_id = $2
            "#,
        )
        .bind(user_id)
        .bind(role_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to deactivate role assignment: {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' has no assignment of role {role_id}"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl RoleAssignmentRepository for PostgresRoleRepository {
    async fn list_assignments_for_user(&self, user_id: &str) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                ur.user_id,
                ur.is_active,
                r.id AS role_id,
                r.name AS role_name,
                r.display_name AS role_display_name,
                r.permissions AS role_permissions,
                r.priority AS role_priority
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY ur.assigned_at, r.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role assignments: {error}"))
        })?;

        rows.into_iter().map(AssignmentRow::into_assignment).collect()
    }
}

fn map_role_conflict(error: sqlx::Error, role_name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    AppError::Internal(format!("failed to create role: {error}"))
}
