use std::sync::Arc;

use anyhow::{ensure, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use chrono::{DateTime, FixedOffset, Utc};
use crm_backend::common::error::AppError;
use crm_backend::config::{AppState, Config};
use crm_backend::db::{ActivityRepository, FollowUpWindow, LeadRepository, UserRepository};
use crm_backend::models::auth::{Role, User};
use crm_backend::models::crm::{Activity, Lead, LeadFilter, NewActivity, NewLead};
use crm_backend::routes;
use http_body_util::BodyExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    leads: Vec<Lead>,
    activities: Vec<Activity>,
}

/// Banco em memória: os três repositórios sobre um único lock, como uma transação.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<User>, AppError> {
        let tables = self.tables.lock().await;
        let mut users = tables.users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, AppError> {
        let tables = self.tables.lock().await;
        let mut users: Vec<User> = tables.users.iter().filter(|u| u.role == role).cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Result<User, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|u| u.email == email) {
            return Err(AppError::EmailAlreadyExists);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.role = role;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        Ok(tables.users.len() != before)
    }
}

#[async_trait]
impl LeadRepository for MemoryStore {
    async fn insert(&self, lead: &NewLead) -> Result<Lead, AppError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            name: lead.name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            status: lead.status,
            source: lead.source.clone(),
            created_by: lead.created_by,
            assigned_to: lead.assigned_to,
            next_follow_up_date: None,
            created_at: now,
            updated_at: now,
        };
        tables.leads.push(lead.clone());
        Ok(lead)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.leads.iter().find(|l| l.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lead>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.leads.iter().filter(|l| ids.contains(&l.id)).cloned().collect())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.leads.iter().any(|l| l.email == email))
    }

    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.leads.iter().filter(|l| filter.allows(l)).cloned().collect())
    }

    async fn update(&self, lead: &Lead) -> Result<Option<Lead>, AppError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.leads.iter_mut().find(|l| l.id == lead.id).map(|stored| {
            stored.name = lead.name.clone();
            stored.email = lead.email.clone();
            stored.phone = lead.phone.clone();
            stored.status = lead.status;
            stored.source = lead.source.clone();
            stored.assigned_to = lead.assigned_to;
            stored.updated_at = Utc::now();
            stored.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        let before = tables.leads.len();
        tables.leads.retain(|l| l.id != id);
        Ok(tables.leads.len() != before)
    }
}

#[async_trait]
impl ActivityRepository for MemoryStore {
    async fn record(&self, activity: &NewActivity) -> Result<Activity, AppError> {
        let mut tables = self.tables.lock().await;
        let stored = Activity {
            id: Uuid::new_v4(),
            lead_id: activity.lead_id,
            activity_type: activity.activity_type,
            activity_date_time: activity.activity_date_time,
            outcome: activity.outcome.clone(),
            notes: activity.notes.clone(),
            next_follow_up_date: activity.next_follow_up_date,
            created_by: activity.created_by,
            created_at: Utc::now(),
        };
        if let Some(date) = activity.next_follow_up_date {
            if let Some(lead) = tables.leads.iter_mut().find(|l| l.id == activity.lead_id) {
                lead.next_follow_up_date = Some(date);
                lead.updated_at = Utc::now();
            }
        }
        tables.activities.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_lead(&self, lead_id: Uuid) -> Result<Vec<Activity>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.activities.iter().filter(|a| a.lead_id == lead_id).cloned().collect())
    }

    async fn list_follow_ups(
        &self,
        created_by: Option<Uuid>,
        window: FollowUpWindow,
    ) -> Result<Vec<Activity>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .activities
            .iter()
            .filter(|a| created_by.is_none_or(|id| a.created_by == id))
            .filter(|a| {
                a.next_follow_up_date
                    .is_some_and(|d| window.from.is_none_or(|from| d >= from) && d <= window.to)
            })
            .cloned()
            .collect())
    }
}

impl MemoryStore {
    /// Reescreve o `created_at` de um lead (relatório mensal).
    #[allow(dead_code)]
    pub async fn set_lead_created_at(&self, id: Uuid, created_at: DateTime<Utc>) {
        let mut tables = self.tables.lock().await;
        if let Some(lead) = tables.leads.iter_mut().find(|l| l.id == id) {
            lead.created_at = created_at;
        }
    }

    #[allow(dead_code)]
    pub async fn lead(&self, id: Uuid) -> Option<Lead> {
        let tables = self.tables.lock().await;
        tables.leads.iter().find(|l| l.id == id).cloned()
    }

    #[allow(dead_code)]
    pub async fn activity_count(&self) -> usize {
        let tables = self.tables.lock().await;
        tables.activities.len()
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        bind_addr: "127.0.0.1:0".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_expiry_hours: 1,
        bcrypt_cost: 4,
        utc_offset: FixedOffset::east_opt(0).expect("zero offset"),
        allow_registration: true,
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::default());
        let state = AppState::from_repositories(config, store.clone(), store.clone(), store.clone());
        let router = routes::create_router(state.clone());
        Self { state, store, router }
    }

    pub async fn insert_user(&self, email: &str, password: &str, role: Role) -> Result<User> {
        let hash = self.state.auth_service.hash_password(password).await?;
        Ok(self.store.create_user(email, &hash, role).await?)
    }

    /// Usuário + token, sem passar pelo login.
    pub async fn user_with_token(&self, email: &str, role: Role) -> Result<(User, String)> {
        let user = self.insert_user(email, "secret123", role).await?;
        let token = self.state.auth_service.create_token(&user)?;
        Ok((user, token))
    }

    #[allow(dead_code)]
    pub async fn login_token(&self, email: &str, password: &str) -> Result<String> {
        let response = self
            .post_json(
                "/api/auth/login",
                &serde_json::json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );
        let body = body_json(response).await?;
        Ok(body["token"].as_str().unwrap_or_default().to_string())
    }

    /// Cria um lead pela API e devolve o id.
    #[allow(dead_code)]
    pub async fn create_lead(&self, token: &str, payload: Value) -> Result<Uuid> {
        let response = self.post_json("/api/leads", &payload, Some(token)).await?;
        ensure!(
            response.status() == StatusCode::CREATED,
            "create lead failed with status {}",
            response.status()
        );
        let body = body_json(response).await?;
        Ok(serde_json::from_value(body["id"].clone())?)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<Response<Body>> {
        self.send(Method::GET, path, None, token).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<Response<Body>> {
        self.send(Method::DELETE, path, None, token).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<Response<Body>> {
        self.send(Method::POST, path, Some(serde_json::to_vec(payload)?), token).await
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<Response<Body>> {
        self.send(Method::PUT, path, Some(serde_json::to_vec(payload)?), token).await
    }

    #[allow(dead_code)]
    pub async fn post_raw(&self, path: &str, body: &str, token: Option<&str>) -> Result<Response<Body>> {
        self.send(Method::POST, path, Some(body.as_bytes().to_vec()), token).await
    }

    #[allow(dead_code)]
    pub async fn upload_csv(&self, data: &[u8], token: &str) -> Result<Response<Body>> {
        self.upload_field("file", data, token).await
    }

    /// Multipart com um único campo, para o upload em massa.
    #[allow(dead_code)]
    pub async fn upload_field(&self, field: &str, data: &[u8], token: &str) -> Result<Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"leads.csv\"\r\n")
                .as_bytes(),
        );
        body.extend(b"Content-Type: text/csv\r\n\r\n");
        body.extend(data);
        body.extend(b"\r\n");
        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/leads/bulk-upload")
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(body))?;
        Ok(self.router.clone().oneshot(request).await?)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        token: Option<&str>,
    ) -> Result<Response<Body>> {
        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(body.map(Body::from).unwrap_or_else(Body::empty))?;
        Ok(self.router.clone().oneshot(request).await?)
    }
}

pub async fn body_json(response: Response<Body>) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
