//! User administration, available in the admin role

use super::DeptrackApplication;
use crate::auth::{Role, RoleRequirement, SessionContext, UserForm, UserSummary};
use crate::ApplicationResult;
use tracing::info;

const ADMIN: RoleRequirement = RoleRequirement::One(Role::Admin);

impl DeptrackApplication {
    pub async fn list_users(&self, ctx: &SessionContext) -> ApplicationResult<Vec<UserSummary>> {
        self.require_role(ctx, &ADMIN).await?;
        let users = self.users.list().await?;
        Ok(users.iter().map(|u| u.to_summary()).collect())
    }

    pub async fn create_user(
        &self,
        ctx: &SessionContext,
        form: UserForm,
    ) -> ApplicationResult<UserSummary> {
        let admin = self.require_role(ctx, &ADMIN).await?;
        let created = self.users.insert(form.into_new_user()?).await?;

        info!(by = admin.user.id, user_id = created.id, "Admin created user");
        Ok(created.to_summary())
    }

    /// Edit a user; a blank password keeps the current one
    pub async fn update_user(
        &self,
        ctx: &SessionContext,
        id: i64,
        form: UserForm,
    ) -> ApplicationResult<UserSummary> {
        let admin = self.require_role(ctx, &ADMIN).await?;
        let updated = self.users.update(id, form.into_changes()?).await?;

        info!(by = admin.user.id, user_id = id, "Admin updated user");
        Ok(updated.to_summary())
    }

    /// Delete a user. The last administrator cannot be deleted; log entries
    /// that mention the user are kept.
    pub async fn delete_user(&self, ctx: &SessionContext, id: i64) -> ApplicationResult<()> {
        let admin = self.require_role(ctx, &ADMIN).await?;
        self.users.delete_unless_last_admin(id).await?;

        info!(by = admin.user.id, user_id = id, "Admin deleted user");
        Ok(())
    }
}
