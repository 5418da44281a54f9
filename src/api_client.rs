//! Client for the portfolio REST API (`API_URL`).
//!
//! Every call resolves to an `ApiResponse`; transport and decode failures
//! are logged and turned into `{ success: false, error }` instead of errors.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::config::AppConfig;
use crate::models::{Certificate, Comment, Project, RowId};
use crate::routes::ApiResponse;
use crate::views::{CommentForm, ContactForm};

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Client pointed at the configured `API_URL`.
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.api_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch<T: DeserializeOwned>(
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, reqwest::Error> {
        request.send().await?.json::<ApiResponse<T>>().await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, what: &str) -> ApiResponse<T> {
        settle(Self::fetch(self.http.get(self.url(path))).await, what)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> ApiResponse<T> {
        settle(
            Self::fetch(self.http.post(self.url(path)).json(body)).await,
            what,
        )
    }

    pub async fn get_projects(&self) -> ApiResponse<Vec<Project>> {
        self.get("/api/projects", "fetching projects").await
    }

    pub async fn get_project(&self, id: &RowId) -> ApiResponse<Project> {
        self.get(&format!("/api/projects/{id}"), "fetching project")
            .await
    }

    pub async fn get_certificates(&self) -> ApiResponse<Vec<Certificate>> {
        self.get("/api/certificates", "fetching certificates").await
    }

    pub async fn send_contact_message(&self, message: &ContactForm) -> ApiResponse<()> {
        self.post("/api/contact", message, "sending message").await
    }

    pub async fn get_comments(&self) -> ApiResponse<Vec<Comment>> {
        self.get("/api/comments", "fetching comments").await
    }

    pub async fn create_comment(&self, comment: &CommentForm) -> ApiResponse<Vec<Comment>> {
        self.post("/api/comments", comment, "creating comment")
            .await
    }
}

fn settle<T>(result: Result<ApiResponse<T>, reqwest::Error>, what: &str) -> ApiResponse<T> {
    match result {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "error {what}");
            ApiResponse::failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tables;
    use crate::routes::test_support::test_app;
    use serde_json::json;

    async fn serve(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
            )
            .await
            .unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_client_talks_to_public_api() {
        let app = test_app().await;
        app.store.seed(
            tables::PROJECTS,
            json!({"id": 1, "title": "Site", "tags": ["Rust"], "created_at": "2024-01-01T00:00:00Z"}),
        );
        let base = serve(crate::create_app(app.state.clone())).await;
        let client = ApiClient::new(format!("{base}/")).unwrap();
        assert_eq!(client.base_url(), base);

        let projects = client.get_projects().await;
        assert!(projects.success);
        assert_eq!(projects.data.unwrap()[0].tags, vec!["Rust"]);

        let project = client.get_project(&RowId::from("1")).await;
        assert_eq!(project.data.unwrap().title, "Site");

        let missing = client.get_project(&RowId::from("2")).await;
        assert!(!missing.success);
        assert_eq!(missing.error.as_deref(), Some("project not found"));

        let sent = client
            .send_contact_message(&ContactForm {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                subject: None,
                message: "Hello".to_string(),
            })
            .await;
        assert!(sent.success);

        let posted = client
            .create_comment(&CommentForm {
                name: "Budi".to_string(),
                photo_url: None,
                message: "Mantap".to_string(),
            })
            .await;
        assert!(posted.success);
        assert_eq!(client.get_comments().await.data.unwrap().len(), 1);
        assert!(client.get_certificates().await.data.unwrap().is_empty());
    }

    #[test]
    fn test_client_uses_configured_api_url() {
        let config = AppConfig {
            environment: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            remote: None,
            api_url: "http://localhost:3001/".to_string(),
            session_file: std::path::PathBuf::from("session.json"),
            session: crate::config::SessionPolicy::default(),
        };
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001");
        assert_eq!(client.url("/api/projects"), "http://localhost:3001/api/projects");
    }

    #[tokio::test]
    async fn test_unreachable_api_yields_failed_response() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(format!("http://{addr}")).unwrap();
        let response = client.get_projects().await;
        assert!(!response.success);
        assert!(response.data.is_none());
        assert!(response.error.is_some());
    }
}
