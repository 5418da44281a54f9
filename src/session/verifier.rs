use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::models::RowId;

/// Identity of the signed-in admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminIdentity {
    pub id: RowId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
}

/// Remote credential check and the post-login side effect.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(None)` means the credentials were rejected.
    async fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AdminIdentity>, GatewayError>;

    async fn record_login(&self, admin_id: &RowId) -> Result<(), GatewayError>;
}

#[async_trait]
impl CredentialVerifier for Gateway {
    async fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AdminIdentity>, GatewayError> {
        let rows = self.verify_admin_login(username, password).await?;
        Ok(rows.into_iter().next().and_then(|row| {
            if !row.success {
                return None;
            }
            Some(AdminIdentity {
                id: row.admin_id?,
                username: row.username.unwrap_or_default(),
                email: row.email.unwrap_or_default(),
                full_name: row.full_name.unwrap_or_default(),
            })
        }))
    }

    async fn record_login(&self, admin_id: &RowId) -> Result<(), GatewayError> {
        self.update_admin_last_login(admin_id).await
    }
}
