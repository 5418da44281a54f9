//! Remote data gateway.
//!
//! `RowStore` is the generic per-table interface of the hosted store; `Gateway`
//! is the typed facade the views and the session manager talk to. Every method
//! is a single round trip: no retries, no caching. Mutations report only
//! success or failure, and the caller reloads whatever list it shows.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::GatewayError;
use crate::models::{
    sort_comments, tables, AdminLoginRow, Certificate, CertificateInput, Comment, CommentInput,
    ContactMessage, ContactMessageInput, MessageStatus, Project, ProjectInput, RowId,
};

pub use memory::MemoryStore;
pub use rest::RestStore;

/// RPC verifying admin credentials.
pub const VERIFY_ADMIN_LOGIN: &str = "verify_admin_login";
/// RPC stamping the admin's last login time.
pub const UPDATE_ADMIN_LAST_LOGIN: &str = "update_admin_last_login";

/// One ordering key of a list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

impl Order {
    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            ascending: false,
        }
    }

    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            ascending: true,
        }
    }
}

pub const PROJECT_ORDER: &[Order] = &[Order::desc("created_at")];
pub const CERTIFICATE_ORDER: &[Order] = &[Order::desc("issue_date")];
pub const MESSAGE_ORDER: &[Order] = &[Order::desc("created_at")];
pub const COMMENT_ORDER: &[Order] = &[Order::desc("is_pinned"), Order::desc("created_at")];

/// Per-table CRUD plus named procedures on the hosted store.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// All rows of `table`, sorted by `order`.
    async fn select(&self, table: &str, order: &[Order]) -> Result<Vec<Value>, GatewayError>;

    async fn select_one(&self, table: &str, id: &RowId) -> Result<Option<Value>, GatewayError>;

    async fn insert(&self, table: &str, record: Value) -> Result<(), GatewayError>;

    /// Merge `patch` into the row with `id`.
    async fn update(&self, table: &str, id: &RowId, patch: Value) -> Result<(), GatewayError>;

    async fn delete(&self, table: &str, id: &RowId) -> Result<(), GatewayError>;

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, GatewayError>;

    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<(), GatewayError>;
}

/// Typed access to the portfolio tables.
#[derive(Clone)]
pub struct Gateway {
    store: Option<Arc<dyn RowStore>>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("configured", &self.store.is_some())
            .finish()
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, GatewayError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(GatewayError::from))
        .collect()
}

fn to_record<T: serde::Serialize>(input: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(input).map_err(GatewayError::from)
}

impl Gateway {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A gateway with database features disabled; every call fails with
    /// `GatewayError::NotConfigured`.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    fn store(&self) -> Result<&Arc<dyn RowStore>, GatewayError> {
        self.store.as_ref().ok_or(GatewayError::NotConfigured)
    }

    async fn list<T: DeserializeOwned>(
        &self,
        table: &str,
        order: &[Order],
    ) -> Result<Vec<T>, GatewayError> {
        let rows = self.store()?.select(table, order).await.map_err(|e| {
            tracing::error!(table = %table, error = %e, "list query failed");
            e
        })?;
        decode_rows(rows)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &RowId,
    ) -> Result<Option<T>, GatewayError> {
        match self.store()?.select_one(table, id).await? {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, table: &str, record: Value) -> Result<(), GatewayError> {
        self.store()?.insert(table, record).await.map_err(|e| {
            tracing::error!(table = %table, error = %e, "insert failed");
            e
        })
    }

    async fn update(&self, table: &str, id: &RowId, patch: Value) -> Result<(), GatewayError> {
        self.store()?.update(table, id, patch).await.map_err(|e| {
            tracing::error!(table = %table, id = %id, error = %e, "update failed");
            e
        })
    }

    async fn delete(&self, table: &str, id: &RowId) -> Result<(), GatewayError> {
        self.store()?.delete(table, id).await.map_err(|e| {
            tracing::error!(table = %table, id = %id, error = %e, "delete failed");
            e
        })
    }

    // Projects

    pub async fn list_projects(&self) -> Result<Vec<Project>, GatewayError> {
        self.list(tables::PROJECTS, PROJECT_ORDER).await
    }

    pub async fn get_project(&self, id: &RowId) -> Result<Option<Project>, GatewayError> {
        self.get(tables::PROJECTS, id).await
    }

    pub async fn create_project(&self, input: &ProjectInput) -> Result<(), GatewayError> {
        self.insert(tables::PROJECTS, to_record(input)?).await
    }

    pub async fn update_project(
        &self,
        id: &RowId,
        input: &ProjectInput,
    ) -> Result<(), GatewayError> {
        self.update(tables::PROJECTS, id, to_record(input)?).await
    }

    pub async fn delete_project(&self, id: &RowId) -> Result<(), GatewayError> {
        self.delete(tables::PROJECTS, id).await
    }

    // Certificates

    pub async fn list_certificates(&self) -> Result<Vec<Certificate>, GatewayError> {
        self.list(tables::CERTIFICATES, CERTIFICATE_ORDER).await
    }

    pub async fn get_certificate(&self, id: &RowId) -> Result<Option<Certificate>, GatewayError> {
        self.get(tables::CERTIFICATES, id).await
    }

    pub async fn create_certificate(&self, input: &CertificateInput) -> Result<(), GatewayError> {
        self.insert(tables::CERTIFICATES, to_record(input)?).await
    }

    pub async fn update_certificate(
        &self,
        id: &RowId,
        input: &CertificateInput,
    ) -> Result<(), GatewayError> {
        self.update(tables::CERTIFICATES, id, to_record(input)?).await
    }

    pub async fn delete_certificate(&self, id: &RowId) -> Result<(), GatewayError> {
        self.delete(tables::CERTIFICATES, id).await
    }

    // Contact messages

    pub async fn list_messages(&self) -> Result<Vec<ContactMessage>, GatewayError> {
        self.list(tables::CONTACT_MESSAGES, MESSAGE_ORDER).await
    }

    pub async fn get_message(&self, id: &RowId) -> Result<Option<ContactMessage>, GatewayError> {
        self.get(tables::CONTACT_MESSAGES, id).await
    }

    /// New messages always start out unread.
    pub async fn create_message(&self, input: &ContactMessageInput) -> Result<(), GatewayError> {
        let mut record = to_record(input)?;
        record["status"] = json!(MessageStatus::Unread);
        self.insert(tables::CONTACT_MESSAGES, record).await
    }

    pub async fn set_message_status(
        &self,
        id: &RowId,
        status: MessageStatus,
    ) -> Result<(), GatewayError> {
        self.update(tables::CONTACT_MESSAGES, id, json!({ "status": status }))
            .await
    }

    pub async fn delete_message(&self, id: &RowId) -> Result<(), GatewayError> {
        self.delete(tables::CONTACT_MESSAGES, id).await
    }

    // Comments

    /// Pinned comments first, then newest first. The order is re-applied
    /// locally so a store that ignores the ordering still yields it.
    pub async fn list_comments(&self) -> Result<Vec<Comment>, GatewayError> {
        let mut comments: Vec<Comment> = self.list(tables::COMMENTS, COMMENT_ORDER).await?;
        sort_comments(&mut comments);
        Ok(comments)
    }

    pub async fn get_comment(&self, id: &RowId) -> Result<Option<Comment>, GatewayError> {
        self.get(tables::COMMENTS, id).await
    }

    pub async fn create_comment(&self, input: &CommentInput) -> Result<(), GatewayError> {
        let mut record = to_record(input)?;
        record["likes"] = json!(0);
        record["is_pinned"] = json!(false);
        self.insert(tables::COMMENTS, record).await
    }

    pub async fn set_comment_pinned(&self, id: &RowId, pinned: bool) -> Result<(), GatewayError> {
        self.update(tables::COMMENTS, id, json!({ "is_pinned": pinned }))
            .await
    }

    pub async fn delete_comment(&self, id: &RowId) -> Result<(), GatewayError> {
        self.delete(tables::COMMENTS, id).await
    }

    // Admin RPCs

    pub async fn verify_admin_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Vec<AdminLoginRow>, GatewayError> {
        let value = self
            .store()?
            .rpc(
                VERIFY_ADMIN_LOGIN,
                json!({ "p_username": username, "p_password": password }),
            )
            .await?;

        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(rows) => decode_rows(rows),
            row @ Value::Object(_) => Ok(vec![serde_json::from_value(row)?]),
            other => Err(GatewayError::Decode(format!(
                "{VERIFY_ADMIN_LOGIN} returned {other}"
            ))),
        }
    }

    pub async fn update_admin_last_login(&self, admin_id: &RowId) -> Result<(), GatewayError> {
        self.store()?
            .rpc(UPDATE_ADMIN_LAST_LOGIN, json!({ "p_admin_id": admin_id }))
            .await
            .map(|_| ())
    }

    /// Round trip to the store; `Ok(elapsed)` when reachable.
    pub async fn check_connection(&self) -> Result<std::time::Duration, GatewayError> {
        let start = std::time::Instant::now();
        self.store()?.ping().await?;
        Ok(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn gateway() -> (Gateway, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Gateway::new(store.clone()), store)
    }

    fn project(title: &str, tags: &[&str]) -> ProjectInput {
        ProjectInput {
            title: title.to_string(),
            description: "desc".to_string(),
            image_url: Some("https://img.example.com/p.png".to_string()),
            demo_url: None,
            github_url: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            featured: false,
        }
    }

    #[tokio::test]
    async fn test_disabled_gateway_reports_not_configured() {
        let gateway = Gateway::disabled();
        assert!(!gateway.is_configured());
        assert!(matches!(
            gateway.list_projects().await,
            Err(GatewayError::NotConfigured)
        ));
        assert!(matches!(
            gateway.check_connection().await,
            Err(GatewayError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_project_crud_round_trip_keeps_tag_order() {
        let (gateway, _) = gateway();
        gateway
            .create_project(&project("Site", &["React", "Node", "SQL"]))
            .await
            .unwrap();

        let projects = gateway.list_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].tags, vec!["React", "Node", "SQL"]);

        let id = projects[0].id.clone();
        gateway
            .update_project(&id, &project("Site v2", &["Rust"]))
            .await
            .unwrap();
        let fetched = gateway.get_project(&id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Site v2");

        gateway.delete_project(&id).await.unwrap();
        assert!(gateway.list_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_certificates_newest_issue_first() {
        let (gateway, _) = gateway();
        for (title, day) in [("old", 1), ("new", 20), ("mid", 10)] {
            gateway
                .create_certificate(&CertificateInput {
                    title: title.to_string(),
                    issuer: "Issuer".to_string(),
                    issue_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
                    credential_url: None,
                    image_url: None,
                })
                .await
                .unwrap();
        }

        let titles: Vec<_> = gateway
            .list_certificates()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_new_message_is_unread_and_can_be_marked_read() {
        let (gateway, _) = gateway();
        gateway
            .create_message(&ContactMessageInput {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                subject: None,
                message: "Hi".to_string(),
            })
            .await
            .unwrap();

        let messages = gateway.list_messages().await.unwrap();
        assert_eq!(messages[0].status, MessageStatus::Unread);

        gateway
            .set_message_status(&messages[0].id, MessageStatus::Read)
            .await
            .unwrap();
        let msg = gateway.get_message(&messages[0].id).await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Read);
    }

    #[tokio::test]
    async fn test_verify_admin_login_against_memory_store() {
        let store = Arc::new(MemoryStore::new().with_admin("admin", "s3cret", "Site Admin"));
        let gateway = Gateway::new(store.clone());

        let rows = gateway.verify_admin_login("admin", "s3cret").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].success);
        assert_eq!(rows[0].username.as_deref(), Some("admin"));

        let rows = gateway.verify_admin_login("admin", "nope").await.unwrap();
        assert!(rows.iter().all(|r| !r.success));
    }
}
