//! In-process row store with the same contract as the hosted one.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::Duration;

use super::{Order, RowStore, UPDATE_ADMIN_LAST_LOGIN, VERIFY_ADMIN_LOGIN};
use crate::error::GatewayError;
use crate::models::RowId;

#[derive(Debug, Clone)]
struct AdminAccount {
    id: String,
    username: String,
    password: String,
    email: String,
    full_name: String,
    last_login_at: Option<String>,
}

/// Rows kept in memory, ordered like PostgREST orders them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    admins: Mutex<Vec<AdminAccount>>,
    offline: AtomicBool,
    rpc_calls: AtomicUsize,
    read_latency_ms: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an admin account answered by `verify_admin_login`.
    pub fn with_admin(self, username: &str, password: &str, full_name: &str) -> Self {
        if let Ok(mut admins) = self.admins.lock() {
            let id = admins.len() + 1;
            admins.push(AdminAccount {
                id: id.to_string(),
                username: username.to_string(),
                password: password.to_string(),
                email: format!("{username}@example.com"),
                full_name: full_name.to_string(),
                last_login_at: None,
            });
        }
        self
    }

    /// While offline every call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Delay every table read, to hold fetches in flight.
    pub fn set_read_latency(&self, latency: Duration) {
        self.read_latency_ms
            .store(latency.as_millis() as u64, AtomicOrdering::SeqCst);
    }

    /// Number of RPCs served so far.
    pub fn rpc_calls(&self) -> usize {
        self.rpc_calls.load(AtomicOrdering::SeqCst)
    }

    /// Last login stamp recorded for `username`, if any.
    pub fn last_login_of(&self, username: &str) -> Option<String> {
        let admins = self.admins.lock().ok()?;
        admins
            .iter()
            .find(|a| a.username == username)
            .and_then(|a| a.last_login_at.clone())
    }

    /// Insert a fully formed row, bypassing defaults.
    pub fn seed(&self, table: &str, row: Value) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.entry(table.to_string()).or_default().push(row);
        }
    }

    fn check_online(&self) -> Result<(), GatewayError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            Err(GatewayError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn lock_tables(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Value>>>, GatewayError> {
        self.tables
            .lock()
            .map_err(|_| GatewayError::Transport("memory store poisoned".to_string()))
    }

    fn verify(&self, args: &Value) -> Result<Value, GatewayError> {
        let username = args["p_username"].as_str().unwrap_or_default();
        let password = args["p_password"].as_str().unwrap_or_default();
        let admins = self
            .admins
            .lock()
            .map_err(|_| GatewayError::Transport("memory store poisoned".to_string()))?;

        let rows = admins
            .iter()
            .find(|a| a.username == username && a.password == password)
            .map(|a| {
                vec![json!({
                    "success": true,
                    "admin_id": a.id,
                    "username": a.username,
                    "email": a.email,
                    "full_name": a.full_name,
                })]
            })
            .unwrap_or_default();
        Ok(Value::Array(rows))
    }

    fn stamp_last_login(&self, args: &Value) -> Result<Value, GatewayError> {
        let admin_id = match &args["p_admin_id"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let mut admins = self
            .admins
            .lock()
            .map_err(|_| GatewayError::Transport("memory store poisoned".to_string()))?;
        if let Some(admin) = admins.iter_mut().find(|a| a.id == admin_id) {
            admin.last_login_at = Some(Utc::now().to_rfc3339());
        }
        Ok(Value::Null)
    }
}

fn row_matches(row: &Value, id: &RowId) -> bool {
    match &row["id"] {
        Value::String(s) => s == id.as_str(),
        Value::Number(n) => n.to_string() == id.as_str(),
        _ => false,
    }
}

/// Null sorts last in both directions, as PostgREST does by default for desc.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn sort_rows(rows: &mut [Value], order: &[Order]) {
    rows.sort_by(|a, b| {
        for key in order {
            let (x, y) = (&a[key.column], &b[key.column]);
            let ord = match (x.is_null(), y.is_null(), key.ascending) {
                (false, false, false) => compare_values(y, x),
                _ => compare_values(x, y),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn select(&self, table: &str, order: &[Order]) -> Result<Vec<Value>, GatewayError> {
        let latency = self.read_latency_ms.load(AtomicOrdering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        self.check_online()?;
        let tables = self.lock_tables()?;
        let mut rows = tables.get(table).cloned().unwrap_or_default();
        sort_rows(&mut rows, order);
        Ok(rows)
    }

    async fn select_one(&self, table: &str, id: &RowId) -> Result<Option<Value>, GatewayError> {
        self.check_online()?;
        let tables = self.lock_tables()?;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| row_matches(row, id)).cloned()))
    }

    async fn insert(&self, table: &str, record: Value) -> Result<(), GatewayError> {
        self.check_online()?;
        let Value::Object(mut fields) = record else {
            return Err(GatewayError::Server {
                status: 400,
                message: "insert expects a JSON object".to_string(),
            });
        };
        fields
            .entry("id")
            .or_insert_with(|| json!(uuid::Uuid::new_v4().to_string()));
        fields
            .entry("created_at")
            .or_insert_with(|| json!(Utc::now().to_rfc3339()));

        let mut tables = self.lock_tables()?;
        tables
            .entry(table.to_string())
            .or_default()
            .push(Value::Object(fields));
        Ok(())
    }

    async fn update(&self, table: &str, id: &RowId, patch: Value) -> Result<(), GatewayError> {
        self.check_online()?;
        let patch: Map<String, Value> = match patch {
            Value::Object(map) => map,
            _ => {
                return Err(GatewayError::Server {
                    status: 400,
                    message: "update expects a JSON object".to_string(),
                })
            }
        };

        let mut tables = self.lock_tables()?;
        if let Some(row) = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row_matches(row, id)))
        {
            if let Value::Object(fields) = row {
                fields.extend(patch);
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, id: &RowId) -> Result<(), GatewayError> {
        self.check_online()?;
        let mut tables = self.lock_tables()?;
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| !row_matches(row, id));
        }
        Ok(())
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, GatewayError> {
        self.check_online()?;
        self.rpc_calls.fetch_add(1, AtomicOrdering::SeqCst);
        match function {
            VERIFY_ADMIN_LOGIN => self.verify(&args),
            UPDATE_ADMIN_LAST_LOGIN => self.stamp_last_login(&args),
            other => Err(GatewayError::Server {
                status: 404,
                message: format!("function {other} does not exist"),
            }),
        }
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        self.check_online()
    }
}
