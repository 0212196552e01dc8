use tracing::info;

use crate::api::types::PasswordUpdateRequest;
use crate::error::ApiResult;
use crate::validation;

use super::TaskStore;

impl TaskStore {
  /// Change the caller's password. Confirmation is checked before sending.
  pub async fn change_password(&self, request: PasswordUpdateRequest) -> ApiResult<()> {
    validation::validate_password_change(&request)?;
    self.guard(self.gateway.change_password(&request).await)?;
    info!("password changed");
    Ok(())
  }

  /// Delete the caller's own account and end the session.
  pub async fn delete_account(&self) -> ApiResult<()> {
    self.guard(self.gateway.delete_account().await)?;
    info!("account deleted");
    self.session.logout();
    Ok(())
  }
}
