//! Admin dashboard state: one list view per tab, plus the mutations that
//! reload the list they touch.

pub mod forms;
pub mod list;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use crate::error::{AppError, GatewayError};
use crate::gateway::Gateway;
use crate::models::{Certificate, Comment, ContactMessage, MessageStatus, Project, RowId};

pub use forms::{
    join_tags, parse_tags, CertificateForm, CommentForm, ContactForm, ProjectForm, TagsField,
};
pub use list::{FetchTicket, ListSnapshot, ListView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Projects,
    Certificates,
    Messages,
    Comments,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Projects, Tab::Certificates, Tab::Messages, Tab::Comments];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Projects => "projects",
            Tab::Certificates => "certificates",
            Tab::Messages => "messages",
            Tab::Comments => "comments",
        }
    }
}

impl FromStr for Tab {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tab::ALL
            .into_iter()
            .find(|tab| tab.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// The rendered list of one tab.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tab", content = "list", rename_all = "lowercase")]
pub enum TabSnapshot {
    Projects(ListSnapshot<Project>),
    Certificates(ListSnapshot<Certificate>),
    Messages(ListSnapshot<ContactMessage>),
    Comments(ListSnapshot<Comment>),
}

/// Result of a successful mutation: the confirmation text and the reloaded list.
#[derive(Debug, Clone, Serialize)]
pub struct MutationOutcome<T> {
    pub message: String,
    pub snapshot: ListSnapshot<T>,
}

fn mutation_error(action: &str, source: GatewayError) -> AppError {
    AppError::Mutation {
        message: format!("Failed to {action}: {source}"),
        source,
    }
}

/// Run one fetch into `view` under a fresh ticket. The caller always gets
/// the list this fetch loaded, even if a tab switch made it stale for the view.
async fn load<T, F>(view: &ListView<T>, fetch: F) -> ListSnapshot<T>
where
    T: Clone,
    F: Future<Output = Result<Vec<T>, GatewayError>>,
{
    let ticket = view.begin();
    let result = fetch.await;
    view.settle(ticket, result)
}

#[derive(Debug)]
pub struct Dashboard {
    gateway: Gateway,
    active: Mutex<Option<Tab>>,
    projects: ListView<Project>,
    certificates: ListView<Certificate>,
    messages: ListView<ContactMessage>,
    comments: ListView<Comment>,
}

impl Dashboard {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            active: Mutex::new(None),
            projects: ListView::new("projects"),
            certificates: ListView::new("certificates"),
            messages: ListView::new("messages"),
            comments: ListView::new("comments"),
        }
    }

    pub fn active_tab(&self) -> Option<Tab> {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_mounted(&self, tab: Tab, mounted: bool) {
        match (tab, mounted) {
            (Tab::Projects, true) => self.projects.mount(),
            (Tab::Projects, false) => self.projects.unmount(),
            (Tab::Certificates, true) => self.certificates.mount(),
            (Tab::Certificates, false) => self.certificates.unmount(),
            (Tab::Messages, true) => self.messages.mount(),
            (Tab::Messages, false) => self.messages.unmount(),
            (Tab::Comments, true) => self.comments.mount(),
            (Tab::Comments, false) => self.comments.unmount(),
        }
    }

    /// Make `tab` the mounted one without fetching. Fetches still in flight
    /// for the previous tab are discarded when they land.
    fn activate(&self, tab: Tab) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *active == Some(tab) {
            return;
        }
        if let Some(previous) = active.replace(tab) {
            self.set_mounted(previous, false);
        }
        self.set_mounted(tab, true);
        tracing::debug!(tab = %tab.as_str(), "dashboard tab mounted");
    }

    /// Open the dashboard on `tab` and fetch its list.
    pub async fn open(&self, tab: Tab) -> TabSnapshot {
        self.switch_tab(tab).await
    }

    pub async fn switch_tab(&self, tab: Tab) -> TabSnapshot {
        self.activate(tab);
        self.refresh(tab).await
    }

    /// Unmount every view.
    pub fn close(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = active.take() {
            self.set_mounted(previous, false);
        }
    }

    /// Re-fetch the list of `tab`.
    pub async fn refresh(&self, tab: Tab) -> TabSnapshot {
        match tab {
            Tab::Projects => TabSnapshot::Projects(self.reload_projects().await),
            Tab::Certificates => TabSnapshot::Certificates(self.reload_certificates().await),
            Tab::Messages => TabSnapshot::Messages(self.reload_messages().await),
            Tab::Comments => TabSnapshot::Comments(self.reload_comments().await),
        }
    }

    async fn reload_projects(&self) -> ListSnapshot<Project> {
        load(&self.projects, self.gateway.list_projects()).await
    }

    async fn reload_certificates(&self) -> ListSnapshot<Certificate> {
        load(&self.certificates, self.gateway.list_certificates()).await
    }

    async fn reload_messages(&self) -> ListSnapshot<ContactMessage> {
        load(&self.messages, self.gateway.list_messages()).await
    }

    async fn reload_comments(&self) -> ListSnapshot<Comment> {
        load(&self.comments, self.gateway.list_comments()).await
    }

    // Projects

    pub async fn create_project(
        &self,
        form: &ProjectForm,
    ) -> Result<MutationOutcome<Project>, AppError> {
        let input = form.validate()?;
        self.activate(Tab::Projects);
        self.gateway
            .create_project(&input)
            .await
            .map_err(|e| mutation_error("create project", e))?;
        tracing::info!(title = %input.title, "project created");
        Ok(MutationOutcome {
            message: "Project created successfully!".to_string(),
            snapshot: self.reload_projects().await,
        })
    }

    pub async fn update_project(
        &self,
        id: &RowId,
        form: &ProjectForm,
    ) -> Result<MutationOutcome<Project>, AppError> {
        let input = form.validate()?;
        self.activate(Tab::Projects);
        self.gateway
            .update_project(id, &input)
            .await
            .map_err(|e| mutation_error("update project", e))?;
        tracing::info!(id = %id, "project updated");
        Ok(MutationOutcome {
            message: "Project updated successfully!".to_string(),
            snapshot: self.reload_projects().await,
        })
    }

    pub async fn delete_project(&self, id: &RowId) -> Result<MutationOutcome<Project>, AppError> {
        self.activate(Tab::Projects);
        self.gateway
            .delete_project(id)
            .await
            .map_err(|e| mutation_error("delete project", e))?;
        tracing::info!(id = %id, "project deleted");
        Ok(MutationOutcome {
            message: "Project deleted successfully!".to_string(),
            snapshot: self.reload_projects().await,
        })
    }

    // Certificates

    pub async fn create_certificate(
        &self,
        form: &CertificateForm,
    ) -> Result<MutationOutcome<Certificate>, AppError> {
        let input = form.validate()?;
        self.activate(Tab::Certificates);
        self.gateway
            .create_certificate(&input)
            .await
            .map_err(|e| mutation_error("create certificate", e))?;
        tracing::info!(title = %input.title, "certificate created");
        Ok(MutationOutcome {
            message: "Certificate created successfully!".to_string(),
            snapshot: self.reload_certificates().await,
        })
    }

    pub async fn update_certificate(
        &self,
        id: &RowId,
        form: &CertificateForm,
    ) -> Result<MutationOutcome<Certificate>, AppError> {
        let input = form.validate()?;
        self.activate(Tab::Certificates);
        self.gateway
            .update_certificate(id, &input)
            .await
            .map_err(|e| mutation_error("update certificate", e))?;
        tracing::info!(id = %id, "certificate updated");
        Ok(MutationOutcome {
            message: "Certificate updated successfully!".to_string(),
            snapshot: self.reload_certificates().await,
        })
    }

    pub async fn delete_certificate(
        &self,
        id: &RowId,
    ) -> Result<MutationOutcome<Certificate>, AppError> {
        self.activate(Tab::Certificates);
        self.gateway
            .delete_certificate(id)
            .await
            .map_err(|e| mutation_error("delete certificate", e))?;
        tracing::info!(id = %id, "certificate deleted");
        Ok(MutationOutcome {
            message: "Certificate deleted successfully!".to_string(),
            snapshot: self.reload_certificates().await,
        })
    }

    // Messages

    pub async fn set_message_status(
        &self,
        id: &RowId,
        status: MessageStatus,
    ) -> Result<MutationOutcome<ContactMessage>, AppError> {
        self.activate(Tab::Messages);
        self.gateway
            .set_message_status(id, status)
            .await
            .map_err(|e| mutation_error("update message status", e))?;
        tracing::info!(id = %id, status = ?status, "message status updated");
        Ok(MutationOutcome {
            message: "Message status updated successfully!".to_string(),
            snapshot: self.reload_messages().await,
        })
    }

    pub async fn mark_message_read(
        &self,
        id: &RowId,
    ) -> Result<MutationOutcome<ContactMessage>, AppError> {
        self.set_message_status(id, MessageStatus::Read).await
    }

    pub async fn delete_message(
        &self,
        id: &RowId,
    ) -> Result<MutationOutcome<ContactMessage>, AppError> {
        self.activate(Tab::Messages);
        self.gateway
            .delete_message(id)
            .await
            .map_err(|e| mutation_error("delete message", e))?;
        tracing::info!(id = %id, "message deleted");
        Ok(MutationOutcome {
            message: "Message deleted successfully!".to_string(),
            snapshot: self.reload_messages().await,
        })
    }

    // Comments

    /// Flip the pinned flag of a comment, based on its current stored value.
    pub async fn toggle_comment_pin(
        &self,
        id: &RowId,
    ) -> Result<MutationOutcome<Comment>, AppError> {
        self.activate(Tab::Comments);
        let current = self
            .gateway
            .get_comment(id)
            .await
            .map_err(|e| mutation_error("toggle pin status", e))?
            .ok_or(AppError::NotFound("comment"))?;

        let pinned = !current.is_pinned;
        self.gateway
            .set_comment_pinned(id, pinned)
            .await
            .map_err(|e| mutation_error("toggle pin status", e))?;

        let action = if pinned { "pinned" } else { "unpinned" };
        tracing::info!(id = %id, action, "comment pin toggled");
        Ok(MutationOutcome {
            message: format!("Comment {action} successfully! 📌"),
            snapshot: self.reload_comments().await,
        })
    }

    pub async fn delete_comment(&self, id: &RowId) -> Result<MutationOutcome<Comment>, AppError> {
        self.activate(Tab::Comments);
        self.gateway
            .delete_comment(id)
            .await
            .map_err(|e| mutation_error("delete comment", e))?;
        tracing::info!(id = %id, "comment deleted");
        Ok(MutationOutcome {
            message: "Comment deleted successfully!".to_string(),
            snapshot: self.reload_comments().await,
        })
    }
}
